use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// The kind of map node a time constraint is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum QtiClass {
    #[serde(rename = "assessmentItemRef")]
    Item,
    #[serde(rename = "assessmentSection")]
    Section,
    #[serde(rename = "testPart")]
    TestPart,
}

impl fmt::Display for QtiClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QtiClass::Item => "assessmentItemRef",
            QtiClass::Section => "assessmentSection",
            QtiClass::TestPart => "testPart",
        };
        write!(f, "{name}")
    }
}

/// A countdown budget attached to an item, section or test part.
///
/// Instances are issued fresh by the server inside every `TestContext`;
/// `seconds` is the remaining budget at issue time, not the original limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConstraint {
    #[serde(rename = "qtiClassName")]
    pub qti_class: QtiClass,
    /// Label of the node the constraint applies to, for display.
    pub source: String,
    /// Remaining budget in whole seconds.
    pub seconds: u64,
    /// When true, the constraint is informational only: the candidate may
    /// submit after the budget runs out and no countdown is started.
    #[serde(default)]
    pub allow_late_submission: bool,
    /// Warning threshold in seconds; `None` means never warn.
    #[serde(default)]
    pub warning_time: Option<u64>,
}

impl TimeConstraint {
    /// Warning threshold for this constraint, falling back to the
    /// context-level per-class table when the constraint carries none.
    #[must_use]
    pub fn effective_warning(&self, table: &BTreeMap<QtiClass, u64>) -> Option<u64> {
        self.warning_time
            .or_else(|| table.get(&self.qti_class).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_warning_wins_over_the_table() {
        let constraint = TimeConstraint {
            qti_class: QtiClass::Item,
            source: "item-1".to_string(),
            seconds: 30,
            allow_late_submission: false,
            warning_time: Some(10),
        };
        let table = BTreeMap::from([(QtiClass::Item, 5)]);
        assert_eq!(constraint.effective_warning(&table), Some(10));
    }

    #[test]
    fn falls_back_to_the_per_class_table() {
        let constraint = TimeConstraint {
            qti_class: QtiClass::Section,
            source: "section-1".to_string(),
            seconds: 120,
            allow_late_submission: false,
            warning_time: None,
        };
        let table = BTreeMap::from([(QtiClass::Section, 60)]);
        assert_eq!(constraint.effective_warning(&table), Some(60));
        assert_eq!(constraint.effective_warning(&BTreeMap::new()), None);
    }

    #[test]
    fn deserializes_the_server_shape() {
        let constraint: TimeConstraint = serde_json::from_str(
            r#"{
                "qtiClassName": "testPart",
                "source": "Part one",
                "seconds": 600,
                "allowLateSubmission": true
            }"#,
        )
        .unwrap();
        assert_eq!(constraint.qti_class, QtiClass::TestPart);
        assert!(constraint.allow_late_submission);
        assert_eq!(constraint.warning_time, None);
    }
}
