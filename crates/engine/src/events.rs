//! Events emitted by the session engine for the presentation adapter.

use runner_core::model::{QtiClass, TestContext};
use tokio::sync::mpsc;

/// What the presentation adapter consumes: context replacements, per-tick
/// timer displays, discrete timer signals and failure surfacing.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A successful transition replaced the context.
    Updated(Box<TestContext>),
    /// Remaining seconds for one active constraint, every tick.
    TimerDisplay {
        qti_class: QtiClass,
        source: String,
        remaining: u64,
    },
    /// A constraint crossed its warning threshold (at most once each).
    TimerWarning {
        qti_class: QtiClass,
        source: String,
        remaining: u64,
    },
    /// A constraint ran out; the session is about to transition.
    TimerExpired { qti_class: QtiClass, source: String },
    /// An action call failed; the previous screen is intact and the same
    /// transition may be retried by the candidate.
    ActionFailed {
        action: &'static str,
        reason: String,
    },
    /// The remote authority closed the session.
    Closed,
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub(crate) fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
