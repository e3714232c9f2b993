// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rate-limited versions of the [`tracing`] warning and error macros.
//!
//! Use these for events a guest can trigger at will, such as accesses to
//! reserved registers, so that a misbehaving guest cannot flood the host log.
//!
//! Each call site gets its own limiter. Once a site has logged
//! [`EVENTS_PER_PERIOD`] events within [`PERIOD`], further events are dropped
//! until the period rolls over. The next event that gets through reports how
//! many were dropped in its `dropped_ratelimited` field.

#![forbid(unsafe_code)]

use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
#[doc(hidden)]
pub use tracing;

/// The length of a rate limiting window.
pub const PERIOD: Duration = Duration::from_secs(5);
/// The number of events a call site may log per window.
pub const EVENTS_PER_PERIOD: u32 = 10;

static DISABLE_RATE_LIMITING: AtomicBool = AtomicBool::new(false);

/// Disables or reenables rate limiting globally.
///
/// Rate limiting defaults to enabled.
pub fn disable_rate_limiting(disabled: bool) {
    DISABLE_RATE_LIMITING.store(disabled, Ordering::Relaxed);
}

#[derive(Debug)]
struct Window {
    start: Option<Instant>,
    events: u32,
    missed: u64,
}

impl Window {
    const fn new() -> Self {
        Self {
            start: None,
            events: 0,
            missed: 0,
        }
    }

    /// Returns `None` if the event should be dropped, otherwise the number of
    /// events dropped since the last logged one. The count is reported as
    /// `Some` when it is nonzero or when this is the last event of the window.
    fn admit(&mut self, now: Instant) -> Option<Option<u64>> {
        let start = self.start.get_or_insert(now);
        if now.duration_since(*start) > PERIOD {
            *start = now;
            self.events = 0;
        }
        if self.events >= EVENTS_PER_PERIOD {
            self.missed += 1;
            return None;
        }
        self.events += 1;
        let missed = std::mem::take(&mut self.missed);
        Some((missed != 0 || self.events == EVENTS_PER_PERIOD).then_some(missed))
    }
}

#[doc(hidden)]
pub struct RateLimiter {
    window: Mutex<Window>,
}

impl RateLimiter {
    #[expect(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            window: Mutex::new(Window::new()),
        }
    }

    /// Returns `Some(missed_events)` if this event should be logged.
    pub fn event(&self) -> Option<Option<u64>> {
        if DISABLE_RATE_LIMITING.load(Ordering::Relaxed) {
            return Some(None);
        }
        // Contention means another thread is logging from this site right now,
        // so dropping this event is fine.
        self.window.try_lock()?.admit(Instant::now())
    }
}

/// As [`tracing::error!`], but rate limited.
#[macro_export]
macro_rules! error_ratelimited {
    ($($rest:tt)*) => {
        {
            static RATE_LIMITER: $crate::RateLimiter = $crate::RateLimiter::new();
            if let Some(missed_events) = RATE_LIMITER.event() {
                $crate::tracing::error!(dropped_ratelimited = missed_events, $($rest)*);
            }
        }
    };
}

/// As [`tracing::warn!`], but rate limited.
#[macro_export]
macro_rules! warn_ratelimited {
    ($($rest:tt)*) => {
        {
            static RATE_LIMITER: $crate::RateLimiter = $crate::RateLimiter::new();
            if let Some(missed_events) = RATE_LIMITER.event() {
                $crate::tracing::warn!(dropped_ratelimited = missed_events, $($rest)*);
            }
        }
    };
}
