//! Repeat-alarm suppression.
//!
//! A pool stuck over a threshold raises the same alarm on every check. The
//! gate lets one alarm per platform, pool and alarm type through each
//! interval.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::events::AlarmType;

type GateKey = (String, String, AlarmType);

/// When an alarm was let through, and for how long repeats are held back.
#[derive(Debug, Clone, Copy)]
struct Window {
    sent_at: Instant,
    interval: Duration,
}

impl Window {
    fn is_open(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.sent_at) < self.interval
    }
}

/// Tracks the suppression window of each alarm that was let through.
///
/// Expired windows are pruned whenever a new alarm passes, so the map only
/// holds keys still inside their interval.
#[derive(Debug, Default)]
pub struct AlarmGate {
    windows: Mutex<HashMap<GateKey, Window>>,
}

impl AlarmGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the send when no identical alarm passed
    /// within `interval_minutes`. An interval of zero always passes.
    pub fn try_pass(
        &self,
        platform: &str,
        thread_pool_id: &str,
        alarm_type: AlarmType,
        interval_minutes: u64,
    ) -> bool {
        self.try_pass_at(
            platform,
            thread_pool_id,
            alarm_type,
            Duration::from_secs(interval_minutes.saturating_mul(60)),
            Instant::now(),
        )
    }

    fn try_pass_at(
        &self,
        platform: &str,
        thread_pool_id: &str,
        alarm_type: AlarmType,
        interval: Duration,
        now: Instant,
    ) -> bool {
        if interval.is_zero() {
            return true;
        }

        let key = (platform.to_string(), thread_pool_id.to_string(), alarm_type);
        // A poisoned lock only means another dispatch panicked mid-insert.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if windows.get(&key).is_some_and(|window| window.is_open(now)) {
            return false;
        }

        windows.retain(|_, window| window.is_open(now));
        windows.insert(key, Window { sent_at: now, interval });
        true
    }
}
