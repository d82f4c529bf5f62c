use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::time::Instant;

/// Millisecond time source shared by every periodic task.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Monotonic clock anchored at construction.
///
/// Built on tokio's `Instant`, so a runtime with paused time drives it too.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Timing of one session. `duration_ms` is fixed when the session starts.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClock {
    pub started_at_ms: u64,
    pub duration_ms: u64,
}

impl SessionClock {
    pub fn new(started_at_ms: u64, duration_ms: u64) -> Self {
        Self {
            started_at_ms,
            duration_ms: duration_ms.max(1),
        }
    }

    /// Elapsed time clamped to `[0, duration_ms]`. A clock reading before the
    /// start (clock adjustment) counts as zero.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms
            .saturating_sub(self.started_at_ms)
            .min(self.duration_ms)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.duration_ms - self.elapsed_ms(now_ms)
    }

    pub fn progress(&self, now_ms: u64) -> f64 {
        progress(self.elapsed_ms(now_ms), self.duration_ms)
    }

    pub fn is_exhausted(&self, now_ms: u64) -> bool {
        self.elapsed_ms(now_ms) >= self.duration_ms
    }
}

/// `clamp(elapsed / duration, 0, 1)`. A zero duration counts as already done.
pub fn progress(elapsed_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 1.0;
    }
    (elapsed_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}

/// Countdown text, `MM:SS`, rounding partial seconds up so the display only
/// reads `00:00` once time is actually exhausted.
pub fn format_countdown(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{:02}:{:02}", (secs / 60).min(99), secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_and_monotonic() {
        for duration in [1, 7, 1000, 60_000] {
            let mut last = 0.0;
            for elapsed in (0..=duration * 2).step_by((duration as usize / 10).max(1)) {
                let t = progress(elapsed, duration);
                assert!((0.0..=1.0).contains(&t));
                assert!(t >= last);
                last = t;
            }
            assert_eq!(progress(duration * 3, duration), 1.0);
        }
    }

    #[test]
    fn session_clock_clamps_elapsed() {
        let clock = SessionClock::new(500, 1000);
        assert_eq!(clock.elapsed_ms(100), 0);
        assert_eq!(clock.elapsed_ms(900), 400);
        assert_eq!(clock.elapsed_ms(5000), 1000);
        assert_eq!(clock.remaining_ms(900), 600);
        assert!(clock.is_exhausted(1500));
        assert!(!clock.is_exhausted(1499));
    }

    #[test]
    fn countdown_rounds_up() {
        assert_eq!(format_countdown(60_000), "01:00");
        assert_eq!(format_countdown(59_001), "01:00");
        assert_eq!(format_countdown(59_000), "00:59");
        assert_eq!(format_countdown(1), "00:01");
        assert_eq!(format_countdown(0), "00:00");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        other.advance(50);
        assert_eq!(clock.now_ms(), 300);
    }
}
