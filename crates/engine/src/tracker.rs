//! Concurrent countdowns for the active context's time constraints.

use chrono::{DateTime, Utc};
use tracing::debug;

use runner_core::countdown::Countdown;
use runner_core::model::{ItemSessionState, QtiClass, TestContext, TimeConstraint};
use runner_core::time::Clock;

/// Discrete outcome of one tracker tick, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerSignal {
    /// Remaining seconds for display; one per active countdown, every tick.
    Display {
        qti_class: QtiClass,
        source: String,
        remaining: u64,
    },
    /// Warning threshold crossed; at most once per constraint instance.
    Warning {
        qti_class: QtiClass,
        source: String,
        remaining: u64,
    },
    /// Budget exhausted. The first expiry stops the whole tracker: the
    /// session is about to transition, so sibling countdowns are cancelled.
    Expired { qti_class: QtiClass, source: String },
}

struct ActiveConstraint {
    constraint: TimeConstraint,
    countdown: Countdown,
}

/// Runs one wall-clock-accurate countdown per active constraint of the
/// current context.
///
/// Rebuilt from scratch on every context replacement: `rebuild` tears down
/// every existing countdown unconditionally before starting the new set, so
/// no countdown ever leaks across a session transition.
pub struct TimeConstraintTracker {
    clock: Clock,
    last_tick: Option<DateTime<Utc>>,
    active: Vec<ActiveConstraint>,
}

impl TimeConstraintTracker {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            last_tick: None,
            active: Vec::new(),
        }
    }

    /// Cancels every countdown.
    pub fn clear(&mut self) {
        self.active.clear();
        self.last_tick = None;
    }

    /// Number of running countdowns.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Tears down all countdowns and starts a fresh set from the context.
    ///
    /// Constraints with `allow_late_submission` are informational only and
    /// never start a countdown. A context that is already timed out, or
    /// whose item session is not interacting, starts none at all.
    pub fn rebuild(&mut self, context: &TestContext) {
        self.clear();

        if context.is_timeout || context.item_session_state != ItemSessionState::Interacting {
            return;
        }

        for constraint in &context.time_constraints {
            if constraint.allow_late_submission {
                continue;
            }
            let warning = constraint.effective_warning(&context.timer_warning);
            self.active.push(ActiveConstraint {
                countdown: Countdown::new(constraint.seconds, warning),
                constraint: constraint.clone(),
            });
        }

        if !self.active.is_empty() {
            self.last_tick = Some(self.clock.now());
        }
    }

    /// Advances every countdown by the wall-clock time elapsed since the
    /// previous tick and reports what happened, in constraint order.
    ///
    /// The elapsed time is measured from the clock, not assumed from the
    /// tick cadence, so jittery or dropped ticks do not skew the countdowns.
    pub fn tick(&mut self) -> Vec<TimerSignal> {
        if self.active.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let elapsed = match self.last_tick {
            Some(last) => self.clock.elapsed_since(last),
            None => std::time::Duration::ZERO,
        };
        self.last_tick = Some(now);

        let mut signals = Vec::new();
        let mut expired = false;
        for active in &mut self.active {
            let tick = active.countdown.advance(elapsed);
            signals.push(TimerSignal::Display {
                qti_class: active.constraint.qti_class,
                source: active.constraint.source.clone(),
                remaining: tick.remaining,
            });
            if tick.warning {
                signals.push(TimerSignal::Warning {
                    qti_class: active.constraint.qti_class,
                    source: active.constraint.source.clone(),
                    remaining: tick.remaining,
                });
            }
            if tick.expired {
                signals.push(TimerSignal::Expired {
                    qti_class: active.constraint.qti_class,
                    source: active.constraint.source.clone(),
                });
                expired = true;
                break;
            }
        }

        if expired {
            debug!("time constraint expired, stopping all countdowns");
            self.clear();
        }

        signals
    }

    #[cfg(test)]
    pub(crate) fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}
