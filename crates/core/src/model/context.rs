use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::model::constraint::{QtiClass, TimeConstraint};

//
// ─── SESSION STATES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown test state {0}")]
pub struct UnknownTestState(pub u8);

/// Lifecycle state of the whole test session, as issued by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum TestState {
    Initial = 0,
    Interacting = 1,
    ModalFeedback = 2,
    Suspended = 3,
    /// Terminal.
    Closed = 4,
}

impl TryFrom<u8> for TestState {
    type Error = UnknownTestState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TestState::Initial),
            1 => Ok(TestState::Interacting),
            2 => Ok(TestState::ModalFeedback),
            3 => Ok(TestState::Suspended),
            4 => Ok(TestState::Closed),
            other => Err(UnknownTestState(other)),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown navigation mode {0}")]
pub struct UnknownNavigationMode(pub u8);

/// Whether the candidate may move freely or only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum NavigationMode {
    Linear = 0,
    Nonlinear = 1,
}

impl TryFrom<u8> for NavigationMode {
    type Error = UnknownNavigationMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NavigationMode::Linear),
            1 => Ok(NavigationMode::Nonlinear),
            other => Err(UnknownNavigationMode(other)),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown item session state {0}")]
pub struct UnknownItemSessionState(pub u8);

/// State of the current item's own session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ItemSessionState {
    Initial = 0,
    Interacting = 1,
    ModalFeedback = 2,
    Suspended = 3,
    Closed = 4,
    Solution = 5,
    Review = 6,
}

impl TryFrom<u8> for ItemSessionState {
    type Error = UnknownItemSessionState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ItemSessionState::Initial),
            1 => Ok(ItemSessionState::Interacting),
            2 => Ok(ItemSessionState::ModalFeedback),
            3 => Ok(ItemSessionState::Suspended),
            4 => Ok(ItemSessionState::Closed),
            5 => Ok(ItemSessionState::Solution),
            6 => Ok(ItemSessionState::Review),
            other => Err(UnknownItemSessionState(other)),
        }
    }
}

//
// ─── ACTIONS & ENDPOINTS ───────────────────────────────────────────────────────
//

/// The transition requests a session can issue against the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    Skip,
    Jump,
    Timeout,
    EndTestSession,
    Comment,
}

impl Action {
    /// Wire name of the action, matching the server's `<action>Url` fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Action::MoveForward => "moveForward",
            Action::MoveBackward => "moveBackward",
            Action::Skip => "skip",
            Action::Jump => "jump",
            Action::Timeout => "timeout",
            Action::EndTestSession => "endTestSession",
            Action::Comment => "comment",
        }
    }
}

/// Per-context endpoint set. The server supplies one URL per action it is
/// willing to accept from the current state; a missing field means the
/// action is not legal right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionEndpoints {
    #[serde(default, rename = "moveForwardUrl")]
    pub move_forward: Option<String>,
    #[serde(default, rename = "moveBackwardUrl")]
    pub move_backward: Option<String>,
    #[serde(default, rename = "skipUrl")]
    pub skip: Option<String>,
    #[serde(default, rename = "jumpUrl")]
    pub jump: Option<String>,
    #[serde(default, rename = "timeoutUrl")]
    pub timeout: Option<String>,
    #[serde(default, rename = "endTestSessionUrl")]
    pub end_test_session: Option<String>,
    #[serde(default, rename = "commentUrl")]
    pub comment: Option<String>,
}

impl ActionEndpoints {
    /// Endpoint for the given action, if the server offers it.
    #[must_use]
    pub fn url_for(&self, action: Action) -> Option<&str> {
        let url = match action {
            Action::MoveForward => &self.move_forward,
            Action::MoveBackward => &self.move_backward,
            Action::Skip => &self.skip,
            Action::Jump => &self.jump,
            Action::Timeout => &self.timeout,
            Action::EndTestSession => &self.end_test_session,
            Action::Comment => &self.comment,
        };
        url.as_deref()
    }
}

//
// ─── TEST CONTEXT ──────────────────────────────────────────────────────────────
//

/// Aggregated view of session progress, useful for adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextProgress {
    pub total: u32,
    pub completed: u32,
    pub remaining: u32,
}

/// The full server-issued snapshot of session state.
///
/// A context is a value object: it is replaced wholesale on every successful
/// transition and never mutated in place (the engine's defensive `is_timeout`
/// flip before a timeout round trip being the single documented exception).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestContext {
    pub state: TestState,
    pub navigation_mode: NavigationMode,
    pub item_session_state: ItemSessionState,
    /// Identifier of the current item.
    pub item_identifier: String,
    /// Section of the current item.
    #[serde(default)]
    pub section_id: String,
    /// Global position of the current item.
    #[serde(default)]
    pub item_position: usize,
    #[serde(default)]
    pub is_timeout: bool,
    pub is_last: bool,
    #[serde(default)]
    pub can_move_backward: bool,
    #[serde(default)]
    pub allow_skipping: bool,
    pub number_items: u32,
    pub number_completed: u32,
    #[serde(default)]
    pub time_constraints: Vec<TimeConstraint>,
    /// Fallback warning thresholds per constraint class, in seconds.
    #[serde(default)]
    pub timer_warning: BTreeMap<QtiClass, u64>,
    /// Rubric blocks to present alongside the item, as opaque markup.
    #[serde(default)]
    pub rubrics: Vec<String>,
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub test_title: String,
    /// Capability key selecting the item interaction surface for this
    /// context; `None` means the item is not interactive.
    #[serde(default)]
    pub item_service_kind: Option<String>,
    #[serde(flatten)]
    pub endpoints: ActionEndpoints,
}

impl TestContext {
    /// True when backward movement is offered: never in `Linear` mode, and
    /// in `Nonlinear` mode only when the server allows it from here.
    #[must_use]
    pub fn offers_backward(&self) -> bool {
        self.navigation_mode == NavigationMode::Nonlinear && self.can_move_backward
    }

    /// Progress counters for display.
    #[must_use]
    pub fn progress(&self) -> ContextProgress {
        ContextProgress {
            total: self.number_items,
            completed: self.number_completed,
            remaining: self.number_items.saturating_sub(self.number_completed),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_states_from_integers() {
        assert_eq!(TestState::try_from(4), Ok(TestState::Closed));
        assert_eq!(TestState::try_from(9), Err(UnknownTestState(9)));
        assert_eq!(NavigationMode::try_from(0), Ok(NavigationMode::Linear));
        assert_eq!(
            ItemSessionState::try_from(1),
            Ok(ItemSessionState::Interacting)
        );
    }

    #[test]
    fn deserializes_a_server_context() {
        let context: TestContext = serde_json::from_str(
            r#"{
                "state": 1,
                "navigationMode": 1,
                "itemSessionState": 1,
                "itemIdentifier": "item-2",
                "sectionId": "assessmentSection-1",
                "itemPosition": 1,
                "isTimeout": false,
                "isLast": false,
                "canMoveBackward": true,
                "allowSkipping": true,
                "numberItems": 10,
                "numberCompleted": 1,
                "timeConstraints": [
                    {
                        "qtiClassName": "assessmentItemRef",
                        "source": "item-2",
                        "seconds": 90
                    }
                ],
                "timerWarning": { "assessmentItemRef": 30 },
                "rubrics": ["<p>Read carefully.</p>"],
                "sectionTitle": "Section one",
                "testTitle": "Demo test",
                "moveForwardUrl": "https://authority.example/session/1/moveForward",
                "skipUrl": "https://authority.example/session/1/skip"
            }"#,
        )
        .unwrap();

        assert_eq!(context.state, TestState::Interacting);
        assert!(context.offers_backward());
        assert_eq!(context.time_constraints.len(), 1);
        assert_eq!(context.timer_warning.get(&QtiClass::Item), Some(&30));
        assert_eq!(
            context.endpoints.url_for(Action::MoveForward),
            Some("https://authority.example/session/1/moveForward")
        );
        assert_eq!(context.endpoints.url_for(Action::MoveBackward), None);
        assert_eq!(context.progress().remaining, 9);
    }

    #[test]
    fn linear_mode_never_offers_backward() {
        let context: TestContext = serde_json::from_str(
            r#"{
                "state": 1,
                "navigationMode": 0,
                "itemSessionState": 1,
                "itemIdentifier": "item-1",
                "isLast": false,
                "canMoveBackward": true,
                "numberItems": 3,
                "numberCompleted": 0
            }"#,
        )
        .unwrap();
        assert!(!context.offers_backward());
    }
}
