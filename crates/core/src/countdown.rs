use std::time::Duration;

const UNIT: Duration = Duration::from_secs(1);

/// A drift-corrected countdown over whole seconds.
///
/// The countdown is driven by elapsed wall-clock time, never by the number of
/// times it is polled: jittery or dropped ticks accumulate in a drift bucket
/// and whole seconds are consumed from the remaining budget as the bucket
/// crosses one-second boundaries. This keeps the display honest no matter how
/// irregular the periodic callback cadence is.
///
/// The warning threshold fires at most once per instance; expiry fires at most
/// once, after which the countdown is inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    drift: Duration,
    warning_at: Option<u64>,
    warning_fired: bool,
    finished: bool,
}

/// Outcome of advancing a [`Countdown`] by some elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Remaining whole seconds, clamped at zero.
    pub remaining: u64,
    /// True exactly once, when the remaining budget first crosses the
    /// warning threshold.
    pub warning: bool,
    /// True exactly once, when the remaining budget reaches zero.
    pub expired: bool,
}

impl Countdown {
    /// Creates a countdown with a budget of `seconds` and an optional warning
    /// threshold (`None` means no warning will ever fire).
    #[must_use]
    pub fn new(seconds: u64, warning_at: Option<u64>) -> Self {
        Self {
            remaining: seconds,
            drift: Duration::ZERO,
            warning_at,
            warning_fired: false,
            finished: false,
        }
    }

    /// Remaining whole seconds.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// True once the countdown has expired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances the countdown by `elapsed` real time and reports what
    /// happened. Calling `advance` on a finished countdown is a no-op.
    pub fn advance(&mut self, elapsed: Duration) -> CountdownTick {
        if self.finished {
            return CountdownTick {
                remaining: 0,
                warning: false,
                expired: false,
            };
        }

        self.drift += elapsed;
        while self.drift >= UNIT && self.remaining > 0 {
            self.remaining -= 1;
            self.drift -= UNIT;
        }

        if self.remaining == 0 {
            self.finished = true;
            return CountdownTick {
                remaining: 0,
                warning: false,
                expired: true,
            };
        }

        let mut warning = false;
        if let Some(at) = self.warning_at {
            if self.remaining <= at && !self.warning_fired {
                self.warning_fired = true;
                warning = true;
            }
        }

        CountdownTick {
            remaining: self.remaining,
            warning,
            expired: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal_counts(ticks: &[CountdownTick]) -> (usize, usize) {
        let warnings = ticks.iter().filter(|t| t.warning).count();
        let expiries = ticks.iter().filter(|t| t.expired).count();
        (warnings, expiries)
    }

    #[test]
    fn counts_down_one_second_per_elapsed_second() {
        let mut cd = Countdown::new(5, None);
        assert_eq!(cd.advance(Duration::from_secs(1)).remaining, 4);
        assert_eq!(cd.advance(Duration::from_secs(1)).remaining, 3);
        assert_eq!(cd.remaining(), 3);
    }

    #[test]
    fn sub_second_ticks_accumulate_as_drift() {
        let mut cd = Countdown::new(5, None);
        assert_eq!(cd.advance(Duration::from_millis(400)).remaining, 5);
        assert_eq!(cd.advance(Duration::from_millis(400)).remaining, 5);
        // 1.2s total elapsed, one whole second consumed
        assert_eq!(cd.advance(Duration::from_millis(400)).remaining, 4);
    }

    #[test]
    fn warning_and_expiry_fire_exactly_once() {
        let mut cd = Countdown::new(5, Some(3));
        let mut ticks = Vec::new();
        for _ in 0..8 {
            ticks.push(cd.advance(Duration::from_secs(1)));
        }
        let (warnings, expiries) = signal_counts(&ticks);
        assert_eq!(warnings, 1);
        assert_eq!(expiries, 1);
        assert!(ticks[1].warning, "warning fires when remaining reaches 3");
        assert!(ticks[4].expired, "expiry fires when remaining reaches 0");
        assert!(cd.is_finished());
    }

    #[test]
    fn signals_are_identical_under_tick_jitter() {
        // Regular 1s cadence vs. an irregular cadence summing to the same
        // elapsed wall time must produce the same signal counts.
        let mut regular = Countdown::new(5, Some(3));
        let mut jittery = Countdown::new(5, Some(3));

        let mut regular_ticks = Vec::new();
        for _ in 0..6 {
            regular_ticks.push(regular.advance(Duration::from_secs(1)));
        }

        let mut jittery_ticks = Vec::new();
        for ms in [250_u64, 1_750, 400, 600, 1_000, 2_000] {
            jittery_ticks.push(jittery.advance(Duration::from_millis(ms)));
        }

        assert_eq!(signal_counts(&regular_ticks), (1, 1));
        assert_eq!(signal_counts(&jittery_ticks), (1, 1));
        assert_eq!(regular.remaining(), jittery.remaining());
    }

    #[test]
    fn remaining_clamps_at_zero_on_a_large_jump() {
        let mut cd = Countdown::new(3, None);
        let tick = cd.advance(Duration::from_secs(60));
        assert_eq!(tick.remaining, 0);
        assert!(tick.expired);
    }

    #[test]
    fn finished_countdown_is_inert() {
        let mut cd = Countdown::new(1, Some(1));
        assert!(cd.advance(Duration::from_secs(2)).expired);
        let after = cd.advance(Duration::from_secs(10));
        assert!(!after.expired);
        assert!(!after.warning);
        assert_eq!(after.remaining, 0);
    }

    #[test]
    fn zero_budget_expires_on_first_advance() {
        let mut cd = Countdown::new(0, Some(3));
        let tick = cd.advance(Duration::from_millis(1));
        assert!(tick.expired);
        assert!(!tick.warning);
    }

    #[test]
    fn no_warning_without_a_threshold() {
        let mut cd = Countdown::new(3, None);
        for _ in 0..3 {
            assert!(!cd.advance(Duration::from_secs(1)).warning);
        }
    }
}
