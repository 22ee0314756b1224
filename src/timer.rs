//! Tick arithmetic — conversions and drift-free wake computation
//!
//! Ticks are a wrapping 32-bit counter, as on most RTOS ports. All
//! comparisons go through [`wake_after`], which handles the counter
//! rolling over between two cycles.

use core::time::Duration;

/// Kernel tick count
pub type Tick = u32;

/// Tick rate used when none is given (1 tick = 1 ms)
pub const DEFAULT_TICK_RATE_HZ: u32 = 1000;

/// Longest period representable without breaking wrap-around comparisons
pub const MAX_PERIOD_TICKS: Tick = Tick::MAX / 2;

/// Milliseconds to ticks, rounding down
pub fn ms_to_ticks(ms: u64, tick_rate_hz: u32) -> Tick {
    let ticks = ms.saturating_mul(tick_rate_hz as u64) / 1000;
    ticks.min(Tick::MAX as u64) as Tick
}

/// Ticks to wall-clock duration
pub fn ticks_to_duration(ticks: Tick, tick_rate_hz: u32) -> Duration {
    if tick_rate_hz == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(ticks as u64 * 1_000_000_000 / tick_rate_hz as u64)
}

/// Cycle period in ticks, clamped to `1..=MAX_PERIOD_TICKS`
///
/// A period shorter than one tick runs once per tick.
pub fn period_ticks(period: Duration, tick_rate_hz: u32) -> Tick {
    let ticks = period.as_micros().saturating_mul(tick_rate_hz as u128) / 1_000_000;
    ticks.clamp(1, MAX_PERIOD_TICKS as u128) as Tick
}

/// Outcome of one delay-until call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Target not yet passed; the caller slept until it
    OnTime,
    /// Target had already passed by `overrun` ticks; no sleep
    Late { overrun: Tick },
}

impl Wake {
    pub fn is_late(&self) -> bool {
        matches!(self, Wake::Late { .. })
    }
}

/// Next wake target after `previous` and whether it is still ahead of `now`
///
/// Returns `(target, wake, ticks_to_sleep)`. Reaching the target tick
/// exactly counts as on time. The target is always
/// `previous + increment`, never derived from `now`, so lateness in one
/// cycle does not shift later ones.
pub fn wake_after(previous: Tick, increment: Tick, now: Tick) -> (Tick, Wake, Tick) {
    let target = previous.wrapping_add(increment);

    let ahead = if now < previous {
        // Tick count wrapped since `previous`: the target is ahead only if it
        // wrapped too and is still past `now`
        target < previous && target >= now
    } else {
        target < previous || target >= now
    };

    if ahead {
        (target, Wake::OnTime, target.wrapping_sub(now))
    } else {
        (target, Wake::Late { overrun: now.wrapping_sub(target) }, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_ticks() {
        assert_eq!(ms_to_ticks(10, 1000), 10);
        assert_eq!(ms_to_ticks(10, 100), 1);
        assert_eq!(ms_to_ticks(5, 100), 0);
        assert_eq!(ms_to_ticks(u64::MAX, 1000), Tick::MAX);
    }

    #[test]
    fn test_ticks_to_duration() {
        assert_eq!(ticks_to_duration(10, 1000), Duration::from_millis(10));
        assert_eq!(ticks_to_duration(3, 100), Duration::from_millis(30));
        assert_eq!(ticks_to_duration(3, 0), Duration::ZERO);
    }

    #[test]
    fn test_period_clamped_to_one_tick() {
        assert_eq!(period_ticks(Duration::ZERO, 1000), 1);
        assert_eq!(period_ticks(Duration::from_micros(300), 1000), 1);
        assert_eq!(period_ticks(Duration::from_millis(20), 1000), 20);
    }

    #[test]
    fn test_period_clamped_to_max() {
        assert_eq!(period_ticks(Duration::from_secs(u64::MAX), 1000), MAX_PERIOD_TICKS);
    }

    #[test]
    fn test_wake_on_time() {
        let (target, wake, sleep) = wake_after(100, 10, 103);
        assert_eq!(target, 110);
        assert_eq!(wake, Wake::OnTime);
        assert_eq!(sleep, 7);
    }

    #[test]
    fn test_wake_exactly_at_target_is_not_late() {
        let (target, wake, sleep) = wake_after(100, 10, 110);
        assert_eq!(target, 110);
        assert_eq!(wake, Wake::OnTime);
        assert_eq!(sleep, 0);
    }

    #[test]
    fn test_wake_late() {
        let (target, wake, sleep) = wake_after(100, 10, 115);
        assert_eq!(target, 110);
        assert_eq!(wake, Wake::Late { overrun: 5 });
        assert!(wake.is_late());
        assert_eq!(sleep, 0);
    }

    #[test]
    fn test_target_wraps_now_has_not() {
        let prev = Tick::MAX - 5;
        let (target, wake, sleep) = wake_after(prev, 10, Tick::MAX - 2);
        assert_eq!(target, 4);
        assert_eq!(wake, Wake::OnTime);
        assert_eq!(sleep, 7);
    }

    #[test]
    fn test_both_wrapped_on_time() {
        let prev = Tick::MAX - 5;
        let (target, wake, sleep) = wake_after(prev, 10, 1);
        assert_eq!(target, 4);
        assert_eq!(wake, Wake::OnTime);
        assert_eq!(sleep, 3);
    }

    #[test]
    fn test_both_wrapped_late() {
        let prev = Tick::MAX - 5;
        let (target, wake, _) = wake_after(prev, 10, 8);
        assert_eq!(target, 4);
        assert_eq!(wake, Wake::Late { overrun: 4 });
    }
}
