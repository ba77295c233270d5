use serde::Serialize;

/// Exit codes recorded against the current item when a session leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u16")]
pub enum ItemExitCode {
    CompletedNormally = 700,
    Quit = 701,
    CompleteTimeout = 703,
    Timeout = 704,
    ForceQuit = 705,
    InProgress = 706,
    Error = 300,
}

impl From<ItemExitCode> for u16 {
    fn from(code: ItemExitCode) -> Self {
        code as u16
    }
}

/// Exit codes recorded against the whole test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestExitCode {
    #[serde(rename = "C")]
    Complete,
    #[serde(rename = "T")]
    Terminated,
    #[serde(rename = "IC")]
    Incomplete,
    #[serde(rename = "IQ")]
    IncompleteQuit,
    #[serde(rename = "IA")]
    Inactive,
    #[serde(rename = "DA")]
    CandidateDisagreedWithNda,
}

/// Structured exit-code payload carried by an action call, stored by the
/// remote authority as trace variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetaData {
    #[serde(rename = "TEST", skip_serializing_if = "Option::is_none")]
    test: Option<TestMeta>,
    #[serde(rename = "ITEM", skip_serializing_if = "Option::is_none")]
    item: Option<ItemMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct TestMeta {
    #[serde(rename = "TEST_EXIT_CODE")]
    exit_code: TestExitCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct ItemMeta {
    #[serde(rename = "ITEM_EXIT_CODE")]
    exit_code: ItemExitCode,
}

impl MetaData {
    /// Metadata carrying an item exit code, e.g. `{ITEM: {ITEM_EXIT_CODE: 704}}`.
    #[must_use]
    pub fn item_exit(code: ItemExitCode) -> Self {
        Self {
            test: None,
            item: Some(ItemMeta { exit_code: code }),
        }
    }

    /// Metadata carrying a test exit code, e.g. `{TEST: {TEST_EXIT_CODE: "IC"}}`.
    #[must_use]
    pub fn test_exit(code: TestExitCode) -> Self {
        Self {
            test: Some(TestMeta { exit_code: code }),
            item: None,
        }
    }

    /// The item exit code carried by this payload, if any.
    #[must_use]
    pub fn item_exit_code(&self) -> Option<ItemExitCode> {
        self.item.map(|meta| meta.exit_code)
    }

    /// The test exit code carried by this payload, if any.
    #[must_use]
    pub fn test_exit_code(&self) -> Option<TestExitCode> {
        self.test.map(|meta| meta.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_exit_serializes_as_numeric_code() {
        let meta = MetaData::item_exit(ItemExitCode::Timeout);
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json, serde_json::json!({"ITEM": {"ITEM_EXIT_CODE": 704}}));
    }

    #[test]
    fn test_exit_serializes_as_short_code() {
        let meta = MetaData::test_exit(TestExitCode::Incomplete);
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json, serde_json::json!({"TEST": {"TEST_EXIT_CODE": "IC"}}));
    }

    #[test]
    fn accessors_expose_the_carried_codes() {
        let meta = MetaData::item_exit(ItemExitCode::Quit);
        assert_eq!(meta.item_exit_code(), Some(ItemExitCode::Quit));
        assert_eq!(meta.test_exit_code(), None);
    }
}
