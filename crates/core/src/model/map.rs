use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

//
// ─── MAP ERRORS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestMapError {
    #[error("two items share the position {position}")]
    DuplicatePosition { position: usize },

    #[error("item positions are not contiguous from 0: nothing at position {position}")]
    NonContiguousPositions { position: usize },

    #[error("two items share the identifier {identifier}")]
    DuplicateIdentifier { identifier: String },
}

//
// ─── LOCATOR ───────────────────────────────────────────────────────────────────
//

/// Addresses an item in a [`TestMap`], either by its global linear position
/// or by its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Position(usize),
    Identifier(String),
}

impl From<usize> for Locator {
    fn from(position: usize) -> Self {
        Locator::Position(position)
    }
}

impl From<&str> for Locator {
    fn from(identifier: &str) -> Self {
        Locator::Identifier(identifier.to_string())
    }
}

impl From<String> for Locator {
    fn from(identifier: String) -> Self {
        Locator::Identifier(identifier)
    }
}

//
// ─── MAP STRUCTURE ─────────────────────────────────────────────────────────────
//

/// A single deliverable item and its place in the test structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub identifier: String,
    /// Global linear position, 0-based, unique across the whole map.
    pub position: usize,
    pub section_id: String,
    pub part_id: String,
}

/// A run of consecutive items belonging to one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: String,
    /// Positions of the items in this section, in document order.
    pub positions: Vec<usize>,
}

/// A test part grouping consecutive sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub id: String,
    pub sections: Vec<Section>,
}

/// Immutable hierarchical index of parts, sections and items.
///
/// Built wholesale from a server-issued document and never mutated in place;
/// a structural change on the server side produces a brand new map.
/// Construction validates that item positions are contiguous 0-based
/// integers with no duplicates and that identifiers are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMap {
    parts: Vec<Part>,
    /// Items indexed by position.
    items: Vec<Item>,
    by_identifier: BTreeMap<String, usize>,
}

impl TestMap {
    /// Builds a map from a flat list of items carrying their own section and
    /// part membership. Items may arrive in any order; they are indexed by
    /// their `position` field.
    ///
    /// # Errors
    ///
    /// Returns `TestMapError` when positions are duplicated or leave gaps, or
    /// when identifiers collide.
    pub fn new(mut items: Vec<Item>) -> Result<Self, TestMapError> {
        items.sort_by_key(|item| item.position);

        let mut by_identifier = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            if item.position != index {
                if items.iter().filter(|i| i.position == item.position).count() > 1 {
                    return Err(TestMapError::DuplicatePosition {
                        position: item.position,
                    });
                }
                return Err(TestMapError::NonContiguousPositions { position: index });
            }
            if by_identifier
                .insert(item.identifier.clone(), item.position)
                .is_some()
            {
                return Err(TestMapError::DuplicateIdentifier {
                    identifier: item.identifier.clone(),
                });
            }
        }

        let parts = group_parts(&items);

        Ok(Self {
            parts,
            items,
            by_identifier,
        })
    }

    /// Number of items in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parts in document order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// All items in document order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Item at the given global position, if any.
    #[must_use]
    pub fn item(&self, position: usize) -> Option<&Item> {
        self.items.get(position)
    }

    /// Item with the given identifier, if any.
    #[must_use]
    pub fn item_by_identifier(&self, identifier: &str) -> Option<&Item> {
        self.by_identifier
            .get(identifier)
            .and_then(|&position| self.items.get(position))
    }

    /// Resolves a locator to an item. Unresolvable locators yield `None`,
    /// never an error; callers decide what that means.
    #[must_use]
    pub fn find(&self, locator: &Locator) -> Option<&Item> {
        match locator {
            Locator::Position(position) => self.item(*position),
            Locator::Identifier(identifier) => self.item_by_identifier(identifier),
        }
    }
}

fn group_parts(items: &[Item]) -> Vec<Part> {
    let mut parts: Vec<Part> = Vec::new();
    for item in items {
        if !matches!(parts.last(), Some(part) if part.id == item.part_id) {
            parts.push(Part {
                id: item.part_id.clone(),
                sections: Vec::new(),
            });
        }
        if let Some(part) = parts.last_mut() {
            if !matches!(part.sections.last(), Some(section) if section.id == item.section_id) {
                part.sections.push(Section {
                    id: item.section_id.clone(),
                    positions: Vec::new(),
                });
            }
            if let Some(section) = part.sections.last_mut() {
                section.positions.push(item.position);
            }
        }
    }
    parts
}

//
// ─── SERVER DOCUMENT SHAPE ─────────────────────────────────────────────────────
//

// The remote authority ships the map as nested objects keyed by identifier:
// parts[partId].sections[sectionId].items[itemId] = { position }. Key order
// is irrelevant; the position field alone defines document order.

#[derive(Debug, Deserialize)]
struct RawTestMap {
    parts: BTreeMap<String, RawPart>,
}

#[derive(Debug, Deserialize)]
struct RawPart {
    sections: BTreeMap<String, RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    items: BTreeMap<String, RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    position: usize,
}

impl TryFrom<RawTestMap> for TestMap {
    type Error = TestMapError;

    fn try_from(raw: RawTestMap) -> Result<Self, Self::Error> {
        let mut items = Vec::new();
        for (part_id, part) in raw.parts {
            for (section_id, section) in part.sections {
                for (identifier, item) in section.items {
                    items.push(Item {
                        identifier,
                        position: item.position,
                        section_id: section_id.clone(),
                        part_id: part_id.clone(),
                    });
                }
            }
        }
        TestMap::new(items)
    }
}

impl<'de> Deserialize<'de> for TestMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTestMap::deserialize(deserializer)?;
        TestMap::try_from(raw).map_err(serde::de::Error::custom)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn item(identifier: &str, position: usize, section: &str, part: &str) -> Item {
        Item {
            identifier: identifier.to_string(),
            position,
            section_id: section.to_string(),
            part_id: part.to_string(),
        }
    }

    #[test]
    fn builds_and_indexes_a_valid_map() {
        let map = TestMap::new(vec![
            item("item-2", 1, "section-1", "part-1"),
            item("item-1", 0, "section-1", "part-1"),
            item("item-3", 2, "section-2", "part-1"),
        ])
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.item(0).unwrap().identifier, "item-1");
        assert_eq!(map.item_by_identifier("item-3").unwrap().position, 2);
        assert_eq!(map.find(&Locator::from(1)).unwrap().identifier, "item-2");
        assert_eq!(map.find(&Locator::from("item-1")).unwrap().position, 0);
        assert!(map.find(&Locator::from("item-9")).is_none());
        assert!(map.find(&Locator::from(9)).is_none());
    }

    #[test]
    fn groups_consecutive_sections_and_parts() {
        let map = TestMap::new(vec![
            item("item-1", 0, "section-1", "part-1"),
            item("item-2", 1, "section-1", "part-1"),
            item("item-3", 2, "section-2", "part-1"),
            item("item-4", 3, "section-3", "part-2"),
        ])
        .unwrap();

        assert_eq!(map.parts().len(), 2);
        assert_eq!(map.parts()[0].sections.len(), 2);
        assert_eq!(map.parts()[0].sections[0].positions, vec![0, 1]);
        assert_eq!(map.parts()[1].sections[0].id, "section-3");
    }

    #[test]
    fn rejects_duplicate_positions() {
        let err = TestMap::new(vec![
            item("item-1", 0, "s", "p"),
            item("item-2", 0, "s", "p"),
        ])
        .unwrap_err();
        assert_eq!(err, TestMapError::DuplicatePosition { position: 0 });
    }

    #[test]
    fn rejects_position_gaps() {
        let err = TestMap::new(vec![
            item("item-1", 0, "s", "p"),
            item("item-2", 2, "s", "p"),
        ])
        .unwrap_err();
        assert_eq!(err, TestMapError::NonContiguousPositions { position: 1 });
    }

    #[test]
    fn rejects_maps_not_starting_at_zero() {
        let err = TestMap::new(vec![item("item-1", 1, "s", "p")]).unwrap_err();
        assert_eq!(err, TestMapError::NonContiguousPositions { position: 0 });
    }

    #[test]
    fn rejects_duplicate_identifiers() {
        let err = TestMap::new(vec![
            item("item-1", 0, "s", "p"),
            item("item-1", 1, "s", "p"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TestMapError::DuplicateIdentifier {
                identifier: "item-1".to_string()
            }
        );
    }

    #[test]
    fn empty_map_is_valid() {
        let map = TestMap::new(Vec::new()).unwrap();
        assert!(map.is_empty());
        assert!(map.item(0).is_none());
    }

    #[test]
    fn deserializes_the_server_document_shape() {
        let map: TestMap = serde_json::from_str(
            r#"{
                "parts": {
                    "testPart-1": {
                        "sections": {
                            "assessmentSection-1": {
                                "items": {
                                    "item-1": { "position": 0 },
                                    "item-2": { "position": 1 }
                                }
                            },
                            "assessmentSection-2": {
                                "items": {
                                    "item-3": { "position": 2 }
                                }
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(map.len(), 3);
        let third = map.item(2).unwrap();
        assert_eq!(third.identifier, "item-3");
        assert_eq!(third.section_id, "assessmentSection-2");
        assert_eq!(third.part_id, "testPart-1");
    }

    #[test]
    fn deserialization_rejects_invalid_positions() {
        let result: Result<TestMap, _> = serde_json::from_str(
            r#"{
                "parts": {
                    "p": {
                        "sections": {
                            "s": {
                                "items": {
                                    "a": { "position": 0 },
                                    "b": { "position": 0 }
                                }
                            }
                        }
                    }
                }
            }"#,
        );
        assert!(result.is_err());
    }
}
