//! Refresh timers.
//!
//! A [`Scheduler`] hands out refresh ticks one at a time; the aggregator blocks on
//! [`Scheduler::wait_tick`] between cycles. Every scheduler owns a cancellation channel
//! and gives out [`TickHandle`]s for it, so a Ctrl+C handler (or a test) can stop the
//! loop from another thread.
//!
//! Ticks never pile up: `IntervalScheduler` is built on `crossbeam_channel::tick`,
//! whose single-slot buffer drops ticks that come due while a refresh is still
//! running. A slow cycle therefore delays the next one instead of queueing a burst.
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use log::debug;

/// Source of refresh ticks.
pub trait Scheduler {
    /// Blocks until the next tick; `false` once the scheduler is cancelled or exhausted.
    fn wait_tick(&mut self) -> bool;

    /// Handle that cancels this scheduler.
    fn handle(&self) -> TickHandle;
}

/// Cancels the scheduler it came from.
#[derive(Debug, Clone)]
pub struct TickHandle {
    stop_tx: Sender<()>,
}

impl TickHandle {
    /// Stops the scheduler; the pending or next `wait_tick` returns `false`.
    pub fn cancel(&self) {
        // receiver gone means the scheduler is already dropped
        let _ = self.stop_tx.send(());
    }
}

/// Wall-clock ticks at a fixed interval.
pub struct IntervalScheduler {
    ticks: Receiver<Instant>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    interval: Duration,
}

impl IntervalScheduler {
    /// Scheduler whose first tick is due one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        let (stop_tx, stop_rx) = unbounded::<()>();
        IntervalScheduler {
            ticks: crossbeam_channel::tick(interval),
            stop_tx,
            stop_rx,
            interval,
        }
    }

    /// Tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Scheduler for IntervalScheduler {
    fn wait_tick(&mut self) -> bool {
        select! {
            recv(self.stop_rx) -> _ => {
                debug!("Scheduler cancelled");
                false
            },
            recv(self.ticks) -> msg => msg.is_ok(),
        }
    }

    fn handle(&self) -> TickHandle {
        TickHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// A fixed number of immediate ticks, for driving the aggregator without a clock.
pub struct ManualScheduler {
    remaining: usize,
    delivered: usize,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl ManualScheduler {
    /// Scheduler that delivers `ticks` ticks and then reports exhaustion.
    pub fn new(ticks: usize) -> Self {
        let (stop_tx, stop_rx) = unbounded::<()>();
        ManualScheduler {
            remaining: ticks,
            delivered: 0,
            stop_tx,
            stop_rx,
        }
    }

    /// Queues `ticks` more ticks.
    pub fn advance(&mut self, ticks: usize) {
        self.remaining += ticks;
    }

    /// Ticks delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl Scheduler for ManualScheduler {
    fn wait_tick(&mut self) -> bool {
        if self.stop_rx.try_recv().is_ok() || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.delivered += 1;
        true
    }

    fn handle(&self) -> TickHandle {
        TickHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn manual_scheduler_delivers_queued_ticks() {
        let mut scheduler = ManualScheduler::new(2);
        assert!(scheduler.wait_tick());
        assert!(scheduler.wait_tick());
        assert!(!scheduler.wait_tick());
        scheduler.advance(1);
        assert!(scheduler.wait_tick());
        assert_eq!(scheduler.delivered(), 3);
    }

    #[test]
    fn manual_scheduler_stops_when_cancelled() {
        let mut scheduler = ManualScheduler::new(10);
        scheduler.handle().cancel();
        assert!(!scheduler.wait_tick());
        assert_eq!(scheduler.delivered(), 0);
    }

    #[test]
    fn interval_scheduler_ticks_and_cancels() {
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(10));
        assert!(scheduler.wait_tick());

        let handle = scheduler.handle();
        let canceller = thread::spawn(move || handle.cancel());
        canceller.join().unwrap();
        // a tick may already be buffered; cancellation wins within a few ticks
        let mut stopped = false;
        for _ in 0..3 {
            if !scheduler.wait_tick() {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
    }
}
