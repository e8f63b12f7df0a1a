use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ticker_client::source::{
    CoinGeckoSource, ProxySource, QuoteSource, REQUEST_TIMEOUT, YahooSource, http_client,
};
use ticker_common::TickerError;

/// Local HTTP server answering each accepted connection with the next scripted reply.
struct Stub {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn serve(replies: Vec<String>) -> Self {
        Stub::serve_after(Duration::ZERO, replies)
    }

    fn serve_after(delay: Duration, replies: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        thread::spawn(move || {
            for reply in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request_line = read_request_line(&mut stream);
                seen.lock().unwrap().push(request_line);
                thread::sleep(delay);
                let _ = stream.write_all(reply.as_bytes());
            }
        });
        Stub { url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request_line(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn reply(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn chart(symbol: &str, price: f64, previous_close: f64) -> String {
    let body = format!(
        r#"{{"chart":{{"result":[{{"meta":{{"symbol":"{}","regularMarketPrice":{},"chartPreviousClose":{}}}}}],"error":null}}}}"#,
        symbol, price, previous_close
    );
    reply("200 OK", &[], &body)
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn yahoo(stub: &Stub) -> YahooSource {
    YahooSource::new(http_client(REQUEST_TIMEOUT).unwrap())
        .with_base_url(&stub.url)
        .with_delay(Duration::ZERO)
}

#[test]
fn yahoo_rate_limit_aborts_the_batch() {
    let stub = Stub::serve(vec![
        reply("429 Too Many Requests", &[("Retry-After", "42")], "{}"),
        chart("MSFT", 378.85, 377.0),
    ]);

    let err = yahoo(&stub).fetch(&symbols(&["AAPL", "MSFT"])).unwrap_err();

    assert!(matches!(
        err,
        TickerError::RateLimited {
            retry_after: Some(42),
            ..
        }
    ));
    assert_eq!(stub.requests().len(), 1);
}

#[test]
fn yahoo_skips_a_failing_symbol_and_keeps_the_next() {
    let stub = Stub::serve(vec![
        reply("500 Internal Server Error", &[], "{}"),
        chart("BTC-USD", 60_000.0, 61_000.0),
    ]);

    let batch = yahoo(&stub).fetch(&symbols(&["IBM", "BTC"])).unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch["BTC"].price, "60000.00");
    let requests = stub.requests();
    assert!(requests[0].starts_with("GET /IBM?"), "{}", requests[0]);
    assert!(requests[1].starts_with("GET /BTC-USD?"), "{}", requests[1]);
}

#[test]
fn proxy_error_status_fails_the_call() {
    let stub = Stub::serve(vec![reply("503 Service Unavailable", &[], "{}")]);
    let source = ProxySource::new(http_client(REQUEST_TIMEOUT).unwrap(), &stub.url);

    let err = source.fetch(&symbols(&["AAPL"])).unwrap_err();

    assert!(matches!(err, TickerError::Status { status: 503, .. }));
    assert!(stub.requests()[0].starts_with("GET /api/quotes?symbols="));
}

#[test]
fn proxy_rate_limit_without_retry_after() {
    let stub = Stub::serve(vec![reply("429 Too Many Requests", &[], "{}")]);
    let source = ProxySource::new(http_client(REQUEST_TIMEOUT).unwrap(), &stub.url);

    let err = source.fetch(&symbols(&["AAPL"])).unwrap_err();

    assert!(matches!(
        err,
        TickerError::RateLimited {
            retry_after: None,
            ..
        }
    ));
}

#[test]
fn coingecko_rate_limit_carries_retry_after() {
    let stub = Stub::serve(vec![reply(
        "429 Too Many Requests",
        &[("Retry-After", "7")],
        r#"{"status":{"error_code":429}}"#,
    )]);
    let source =
        CoinGeckoSource::new(http_client(REQUEST_TIMEOUT).unwrap()).with_base_url(&stub.url);

    let err = source.fetch(&symbols(&["BTC", "AAPL"])).unwrap_err();

    assert!(matches!(
        err,
        TickerError::RateLimited {
            retry_after: Some(7),
            ..
        }
    ));
    assert!(stub.requests()[0].starts_with("GET /simple/price?"));
}

#[test]
fn slow_answer_times_out() {
    let stub = Stub::serve_after(Duration::from_secs(2), vec![reply("200 OK", &[], "[]")]);
    let source = ProxySource::new(http_client(Duration::from_millis(200)).unwrap(), &stub.url);

    let started = Instant::now();
    let err = source.fetch(&symbols(&["AAPL"])).unwrap_err();

    assert!(matches!(err, TickerError::Http(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}
