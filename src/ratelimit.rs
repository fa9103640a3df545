//! # Guest usage limiter
//! Per-feature usage counters over a rolling window measured from the most
//! recent use. This is a soft UX nudge carried over from the client-side
//! original: callers that want past it can trivially go around it, and
//! nothing here should ever be treated as a security control.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::now_ms;

/// Default allowance: 2 uses per feature per rolling 2 hours.
pub const DEFAULT_MAX_USES: u32 = 2;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct FeatureUsage {
    count: u32,
    last_used_ms: u64,
}

/// Thread-safe per-feature usage tracker.
///
/// The window is anchored at the most recent use: once it elapses the count
/// resets, so a new use starts a fresh window at 1 rather than accumulating.
/// `*_at` variants take an explicit clock for tests.
#[derive(Debug)]
pub struct GuestLimiter {
    inner: Mutex<HashMap<String, FeatureUsage>>,
    max_uses: u32,
    window: Duration,
}

impl Default for GuestLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_USES, DEFAULT_WINDOW)
    }
}

impl GuestLimiter {
    pub fn new(max_uses: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_uses,
            window,
        }
    }

    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True unless the feature has already been used `max_uses` times within
    /// the current window.
    pub fn can_use(&self, feature: &str) -> bool {
        self.can_use_at(feature, now_ms())
    }

    pub fn can_use_at(&self, feature: &str, now_ms: u64) -> bool {
        let map = self.inner.lock().expect("limiter mutex poisoned");
        match map.get(feature) {
            Some(usage) => self.effective_count(usage, now_ms) < self.max_uses,
            None => true,
        }
    }

    /// Record one use. If the window had elapsed since the previous use the
    /// count restarts at 1 (first use of a new window).
    pub fn record_use(&self, feature: &str) {
        self.record_use_at(feature, now_ms());
    }

    pub fn record_use_at(&self, feature: &str, now_ms: u64) {
        let mut map = self.inner.lock().expect("limiter mutex poisoned");
        let usage = map.entry(feature.to_string()).or_default();
        let count = if self.window_elapsed(usage, now_ms) {
            0
        } else {
            usage.count
        };
        usage.count = count.saturating_add(1);
        usage.last_used_ms = now_ms;
    }

    /// `max(0, max_uses - count)` with the same window-reset accounting.
    pub fn remaining_uses(&self, feature: &str) -> u32 {
        self.remaining_uses_at(feature, now_ms())
    }

    pub fn remaining_uses_at(&self, feature: &str, now_ms: u64) -> u32 {
        let map = self.inner.lock().expect("limiter mutex poisoned");
        match map.get(feature) {
            Some(usage) => self
                .max_uses
                .saturating_sub(self.effective_count(usage, now_ms)),
            None => self.max_uses,
        }
    }

    /// Time until the rolling window anchored at the last use elapses.
    /// Zero for a feature that was never used or whose window already passed.
    pub fn time_until_reset(&self, feature: &str) -> Duration {
        self.time_until_reset_at(feature, now_ms())
    }

    pub fn time_until_reset_at(&self, feature: &str, now_ms: u64) -> Duration {
        let map = self.inner.lock().expect("limiter mutex poisoned");
        match map.get(feature) {
            Some(usage) => {
                let reset_at = usage.last_used_ms + self.window.as_millis() as u64;
                Duration::from_millis(reset_at.saturating_sub(now_ms))
            }
            None => Duration::ZERO,
        }
    }

    /// Drop all recorded usage (session exit in the original).
    pub fn clear(&self) {
        self.inner.lock().expect("limiter mutex poisoned").clear();
    }

    fn window_elapsed(&self, usage: &FeatureUsage, now_ms: u64) -> bool {
        now_ms.saturating_sub(usage.last_used_ms) > self.window.as_millis() as u64
    }

    fn effective_count(&self, usage: &FeatureUsage, now_ms: u64) -> u32 {
        if self.window_elapsed(usage, now_ms) {
            0
        } else {
            usage.count
        }
    }
}

/// Human-readable countdown: "now", "45 minutes", "1 hour and 5 minutes".
pub fn format_time_until_reset(d: Duration) -> String {
    if d.is_zero() {
        return "now".to_string();
    }
    let minutes = d.as_millis().div_ceil(60_000) as u64;
    if minutes < 60 {
        return format!("{} minute{}", minutes, plural(minutes));
    }
    let hours = minutes / 60;
    let rem = minutes % 60;
    if rem == 0 {
        format!("{} hour{}", hours, plural(hours))
    } else {
        format!(
            "{} hour{} and {} minute{}",
            hours,
            plural(hours),
            rem,
            plural(rem)
        )
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
