//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, FixedOffset, Local};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get the current wall-clock time in the host's offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        DateTime::<FixedOffset>::from(Local::now())
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<FixedOffset>,
}

impl FixedClock {
    /// Create a new fixed clock with the given instant
    pub fn new(fixed_time: DateTime<FixedOffset>) -> Self {
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.fixed_time
    }
}

/// Format an instant as a 12-hour clock time, e.g. `02:05 PM`.
pub fn format_clock_time(at: &DateTime<FixedOffset>) -> String {
    at.format("%I:%M %p").to_string()
}
