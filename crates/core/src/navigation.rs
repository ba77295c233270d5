//! Pure structural and positional queries over a [`TestMap`].
//!
//! Nothing here talks to the remote authority: these helpers let callers
//! answer "what is adjacent to here" and "does this move cross a section
//! boundary" without a server round trip.

use thiserror::Error;

use crate::model::{Item, Locator, TestMap};

/// Direction of a navigation move being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    Jump,
}

/// Granularity of a navigation check: a single item or a whole section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Item,
    Section,
}

/// Which neighbours to collect when scanning for sibling items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingScan {
    Next,
    Previous,
    Both,
}

/// Where the candidate currently is, as reported by the test context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentLocation<'a> {
    pub section_id: &'a str,
    pub item_identifier: &'a str,
}

/// Argument errors. These fail fast and synchronously; they are never
/// silently defaulted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("the current location must carry a section id and an item identifier")]
    MalformedLocation,

    #[error("the current location names an unknown item {identifier}")]
    UnknownItem { identifier: String },

    #[error("a jump requires a target position")]
    MissingJumpTarget,
}

/// Returns true when moving from `current` in `direction` crosses a section
/// boundary.
///
/// An explicit section-level `next`/`previous` move always counts as leaving.
/// Reaching the boundary of the whole test (no adjacent item) also counts as
/// leaving, as does a jump to a position outside the map.
///
/// # Errors
///
/// Returns [`NavigationError`] when the current location is malformed or
/// unknown, or when a jump is requested without a target position.
pub fn is_leaving_section(
    current: CurrentLocation<'_>,
    map: &TestMap,
    direction: Direction,
    scope: Scope,
    target_position: Option<usize>,
) -> Result<bool, NavigationError> {
    if current.section_id.is_empty() || current.item_identifier.is_empty() {
        return Err(NavigationError::MalformedLocation);
    }

    if scope == Scope::Section && direction != Direction::Jump {
        return Ok(true);
    }

    let here = map
        .item_by_identifier(current.item_identifier)
        .ok_or_else(|| NavigationError::UnknownItem {
            identifier: current.item_identifier.to_string(),
        })?;

    let target = match direction {
        Direction::Next => next_item(map, &Locator::Position(here.position)),
        Direction::Previous => previous_item(map, &Locator::Position(here.position)),
        Direction::Jump => {
            let position = target_position.ok_or(NavigationError::MissingJumpTarget)?;
            map.item(position)
        }
    };

    match target {
        Some(item) => Ok(item.section_id != current.section_id),
        // Boundary of the test: treated as leaving.
        None => Ok(true),
    }
}

/// The item immediately after the locator in global order, or `None` at the
/// end of the map or for an unresolved locator.
#[must_use]
pub fn next_item<'a>(map: &'a TestMap, locator: &Locator) -> Option<&'a Item> {
    let item = map.find(locator)?;
    map.item(item.position.checked_add(1)?)
}

/// The item immediately before the locator in global order, or `None` at the
/// start of the map or for an unresolved locator.
#[must_use]
pub fn previous_item<'a>(map: &'a TestMap, locator: &Locator) -> Option<&'a Item> {
    let item = map.find(locator)?;
    map.item(item.position.checked_sub(1)?)
}

/// Collects up to `amount` sibling items on each requested side of the
/// locator.
///
/// - `Next`: the following items, in forward order, truncated at the map end.
/// - `Previous`: the preceding items, in forward document order, truncated at
///   the map start.
/// - `Both`: the preceding items nearest-first, then the following items in
///   forward order — the "ripple outward" order consumers expect when
///   prefetching around the current position.
///
/// An unresolved locator yields an empty vec; this never fails.
#[must_use]
pub fn sibling_items<'a>(
    map: &'a TestMap,
    locator: &Locator,
    scan: SiblingScan,
    amount: usize,
) -> Vec<&'a Item> {
    let Some(here) = map.find(locator) else {
        return Vec::new();
    };
    let position = here.position;

    let previous_nearest_first = || {
        (1..=amount)
            .filter_map(|offset| position.checked_sub(offset))
            .filter_map(|p| map.item(p))
            .collect::<Vec<_>>()
    };
    let next_forward = || {
        (1..=amount)
            .filter_map(|offset| position.checked_add(offset))
            .filter_map(|p| map.item(p))
            .collect::<Vec<_>>()
    };

    match scan {
        SiblingScan::Next => next_forward(),
        SiblingScan::Previous => {
            let mut items = previous_nearest_first();
            items.reverse();
            items
        }
        SiblingScan::Both => {
            let mut items = previous_nearest_first();
            items.extend(next_forward());
            items
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
