//! Match clock for a live fixture.
//!
//! Elapsed seconds are published through a `watch` channel so readers never
//! need the session lock. While running, a ticker task bumps the value once per
//! tick; the task is aborted on pause, reset and drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub fn number(self) -> u8 {
        match self {
            Half::First => 1,
            Half::Second => 2,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Half::First => Half::Second,
            Half::Second => Half::First,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}H", self.number())
    }
}

/// `m:ss`, minutes unpadded.
pub fn format_elapsed(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Label stamped on match events, e.g. `1H 23:04`.
pub fn clock_label(half: Half, seconds: u32) -> String {
    format!("{} {}", half, format_elapsed(seconds))
}

struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(elapsed: Arc<watch::Sender<u32>>, tick: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                elapsed.send_modify(|secs| *secs = secs.saturating_add(1));
            }
        });
        Self { handle }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct MatchClock {
    elapsed: Arc<watch::Sender<u32>>,
    half: Half,
    tick: Duration,
    ticker: Option<Ticker>,
}

impl MatchClock {
    pub fn new(tick: Duration) -> Self {
        let (elapsed, _) = watch::channel(0);
        Self {
            elapsed: Arc::new(elapsed),
            half: Half::First,
            tick,
            ticker: None,
        }
    }

    pub fn elapsed(&self) -> u32 {
        *self.elapsed.borrow()
    }

    pub fn half(&self) -> Half {
        self.half
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn label(&self) -> String {
        clock_label(self.half, self.elapsed())
    }

    /// Receiver that observes every change of the elapsed seconds.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.elapsed.subscribe()
    }

    /// Starts ticking. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.ticker.is_none() {
            self.ticker = Some(Ticker::spawn(self.elapsed.clone(), self.tick));
            debug!(half = %self.half, elapsed = self.elapsed(), "clock started");
        }
    }

    pub fn pause(&mut self) {
        if self.ticker.take().is_some() {
            debug!(half = %self.half, elapsed = self.elapsed(), "clock paused");
        }
    }

    /// Flips between running and paused and returns whether it now runs.
    pub fn toggle(&mut self) -> bool {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
        self.is_running()
    }

    /// Zeroes the current half. A running clock keeps running from zero with
    /// a fresh tick phase.
    pub fn reset(&mut self) {
        let was_running = self.ticker.take().is_some();
        self.elapsed.send_replace(0);
        if was_running {
            self.start();
        }
    }

    /// Moves to the other half and zeroes the elapsed time.
    pub fn switch_half(&mut self) {
        self.half = self.half.toggled();
        self.reset();
    }
}

impl Default for MatchClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl fmt::Debug for MatchClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchClock")
            .field("elapsed", &self.elapsed())
            .field("half", &self.half)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(5), "0:05");
        assert_eq!(format_elapsed(1384), "23:04");
        assert_eq!(format_elapsed(3600), "60:00");
    }

    #[test]
    fn test_clock_label() {
        assert_eq!(clock_label(Half::First, 1384), "1H 23:04");
        assert_eq!(clock_label(Half::Second, 61), "2H 1:01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ticks_while_running() {
        let mut clock = MatchClock::default();
        clock.start();
        sleep(Duration::from_secs(10)).await;
        settle().await;

        let elapsed = clock.elapsed();
        assert!((9..=11).contains(&elapsed), "elapsed was {}", elapsed);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_pause() {
        let mut clock = MatchClock::default();
        clock.start();
        sleep(Duration::from_secs(3)).await;
        settle().await;
        clock.pause();
        let frozen = clock.elapsed();

        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(clock.elapsed(), frozen);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_drop() {
        let mut clock = MatchClock::default();
        let rx = clock.subscribe();
        clock.start();
        sleep(Duration::from_secs(2)).await;
        settle().await;
        drop(clock);
        let frozen = *rx.borrow();

        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(*rx.borrow(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let mut clock = MatchClock::default();
        assert!(clock.toggle());
        assert!(!clock.toggle());
        assert!(clock.toggle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_keeps_half_and_running_state() {
        let mut clock = MatchClock::default();
        clock.switch_half();
        clock.start();
        sleep(Duration::from_secs(5)).await;
        settle().await;

        clock.reset();
        assert_eq!(clock.elapsed(), 0);
        assert_eq!(clock.half(), Half::Second);
        assert!(clock.is_running());

        sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!((1..=3).contains(&clock.elapsed()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_half_alternates_and_zeroes() {
        let mut clock = MatchClock::default();
        clock.start();
        sleep(Duration::from_secs(4)).await;
        settle().await;

        clock.switch_half();
        assert_eq!(clock.half(), Half::Second);
        assert_eq!(clock.elapsed(), 0);

        clock.switch_half();
        assert_eq!(clock.half(), Half::First);
        assert_eq!(clock.elapsed(), 0);
    }
}
