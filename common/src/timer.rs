//! Elapsed-time measurement for individual operations
//!
//! A [`Timer`] is a plain value: a monotonic start instant and an optional end instant. While
//! the end is unset, [`Timer::elapsed`] keeps growing; once [`Timer::stop`] sets it, every query
//! returns the same frozen duration. Dropping a running timer stops it, so a timer bound to a
//! scope reports how long that scope took.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Timer {
    name: String,
    precision: usize,
    start: Instant,
    end: Option<Instant>,
}

impl Timer {
    pub const DEFAULT_PRECISION: usize = 3;

    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self::with_precision(name, Self::DEFAULT_PRECISION)
    }

    /// Start a timer that formats seconds with `precision` fractional digits in its log lines.
    #[must_use]
    pub fn with_precision(name: impl Into<String>, precision: usize) -> Self {
        Self {
            name: name.into(),
            precision,
            start: Instant::now(),
            end: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    pub fn elapsed(&self) -> Duration {
        match self.end {
            Some(end) => end - self.start,
            None => self.start.elapsed(),
        }
    }

    /// Freeze the elapsed time and log it at INFO level.
    ///
    /// Calling `stop` on an already stopped timer returns the originally frozen value and does
    /// not log again.
    pub fn stop(&mut self) -> Duration {
        if self.end.is_none() {
            self.end = Some(Instant::now());
            tracing::info!(
                "{}: {:.*} seconds",
                self.name,
                self.precision,
                self.elapsed().as_secs_f64()
            );
        }
        self.elapsed()
    }

    /// Stop without logging, for operations that did not complete.
    pub fn discard(mut self) {
        self.end = Some(Instant::now());
    }

    pub fn log_elapsed(&self) {
        tracing::info!(
            "{}: {:.*} seconds elapsed",
            self.name,
            self.precision,
            self.elapsed().as_secs_f64()
        );
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}
