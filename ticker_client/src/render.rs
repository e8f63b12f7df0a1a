//! Marquee rendering and display sinks.
//!
//! [`render`] is a pure function from a quote list to a [`TickerFrame`]: the list is
//! emitted twice in a row so a scrolling animation can wrap without a visible seam,
//! and the animation lasts [`SECONDS_PER_SYMBOL`] per configured symbol. A
//! [`TickerDisplay`] receives every frame and replaces its content wholesale.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ticker_common::{Quote, Result};

/// Id of the container element the ticker owns.
pub const CONTAINER_ID: &str = "stock-ticker";
/// Animation time per configured symbol.
pub const SECONDS_PER_SYMBOL: u64 = 5;

const UP_ARROW: &str = "\u{25B2}";
const DOWN_ARROW: &str = "\u{25BC}";

/// One rendered state of the ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerFrame {
    /// Inner HTML of the container.
    pub inner_html: String,
    /// Value for the container's `animation-duration`.
    pub animation_duration: Duration,
    /// Number of rendered items (twice the quote count).
    pub item_count: usize,
}

impl TickerFrame {
    /// The complete container element.
    pub fn to_container_html(&self) -> String {
        format!(
            "<div id=\"{}\" class=\"ticker-content\" style=\"animation-duration: {}s\">{}</div>\n",
            CONTAINER_ID,
            self.animation_duration.as_secs(),
            self.inner_html
        )
    }
}

/// Renders `quotes` for a ticker configured with `symbol_count` symbols.
pub fn render(quotes: &[Quote], symbol_count: usize) -> TickerFrame {
    let mut inner_html = String::new();
    for quote in quotes.iter().chain(quotes.iter()) {
        render_item(&mut inner_html, quote);
    }

    TickerFrame {
        inner_html,
        animation_duration: Duration::from_secs(symbol_count as u64 * SECONDS_PER_SYMBOL),
        item_count: quotes.len() * 2,
    }
}

/// Price with a currency prefix and exactly two decimals.
pub fn display_price(quote: &Quote) -> String {
    match quote.price_value() {
        Some(price) => format!("${:.2}", price),
        None => format!("${}", quote.price.trim()),
    }
}

fn render_item(out: &mut String, quote: &Quote) {
    let (class, arrow) = if quote.is_positive() {
        ("positive", UP_ARROW)
    } else {
        ("negative", DOWN_ARROW)
    };
    // writing into a String cannot fail
    let _ = write!(
        out,
        "<div class=\"ticker-item\">\
         <span class=\"ticker-symbol\">{}</span>\
         <span class=\"ticker-price\">{}</span>\
         <span class=\"ticker-change {}\">{} {} ({})</span>\
         </div>",
        escape(&quote.symbol),
        escape(&display_price(quote)),
        class,
        arrow,
        escape(&quote.change),
        escape(&quote.change_percent),
    );
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Destination of rendered frames.
pub trait TickerDisplay {
    /// Replaces the displayed content with `frame`.
    fn show(&mut self, frame: &TickerFrame) -> Result<()>;
}

/// Writes the container element to a file, replacing it atomically.
pub struct HtmlFileDisplay {
    path: PathBuf,
}

impl HtmlFileDisplay {
    /// Display writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        HtmlFileDisplay {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TickerDisplay for HtmlFileDisplay {
    fn show(&mut self, frame: &TickerFrame) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, frame.to_container_html())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    frames: Vec<TickerFrame>,
}

impl MemoryDisplay {
    /// Empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames in the order they were shown.
    pub fn frames(&self) -> &[TickerFrame] {
        &self.frames
    }

    /// Most recent frame.
    pub fn last(&self) -> Option<&TickerFrame> {
        self.frames.last()
    }
}

impl TickerDisplay for MemoryDisplay {
    fn show(&mut self, frame: &TickerFrame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotes() -> Vec<Quote> {
        vec![
            Quote::new("AAPL", "175.3", "+1.23", "+0.71%"),
            Quote::new("DOGE", "0.1523", "-0.0041", "-2.62%"),
        ]
    }

    #[test]
    fn duplicates_items_and_scales_duration() {
        let frame = render(&quotes(), 2);
        assert_eq!(frame.item_count, 4);
        assert_eq!(frame.inner_html.matches("class=\"ticker-item\"").count(), 4);
        assert_eq!(frame.animation_duration, Duration::from_secs(10));
    }

    #[test]
    fn prices_always_have_two_decimals() {
        let frame = render(&quotes(), 2);
        assert!(frame.inner_html.contains("$175.30"));
        assert!(frame.inner_html.contains("$0.15<"));
    }

    #[test]
    fn direction_follows_change_sign() {
        let frame = render(&quotes(), 2);
        assert!(frame.inner_html.contains("ticker-change positive\">\u{25B2} +1.23 (+0.71%)"));
        assert!(frame.inner_html.contains("ticker-change negative\">\u{25BC} -0.0041 (-2.62%)"));
    }

    #[test]
    fn rendering_is_idempotent() {
        assert_eq!(render(&quotes(), 2), render(&quotes(), 2));
    }

    #[test]
    fn escapes_markup() {
        let frame = render(&[Quote::new("<b>", "1.00", "+0", "+0%")], 1);
        assert!(frame.inner_html.contains("&lt;b&gt;"));
    }

    #[test]
    fn container_carries_id_and_duration() {
        let html = render(&quotes(), 9).to_container_html();
        assert!(html.starts_with("<div id=\"stock-ticker\""));
        assert!(html.contains("animation-duration: 45s"));
    }

    #[test]
    fn file_display_replaces_content() {
        let path = std::env::temp_dir().join(format!("ticker-{}.html", std::process::id()));
        let mut display = HtmlFileDisplay::new(&path);
        display.show(&render(&quotes(), 2)).unwrap();
        display.show(&render(&quotes()[..1], 1)).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("ticker-item").count(), 2);
        fs::remove_file(&path).unwrap();
    }
}
