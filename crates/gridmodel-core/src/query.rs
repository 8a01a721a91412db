//! # Query Module
//!
//! Query shapes and the paging cursor returned by extent and relationship
//! queries.
//!
//! - A cursor captures the requested values when the query runs
//! - Later commits are not visible through an open cursor
//! - Closing drops the captured values

use crate::delta::ResourceDescription;
use crate::primitives::MAX_ITERATOR_BATCH;
use crate::types::{Gid, GridError, ModelCode};
use serde::{Deserialize, Serialize};

// =============================================================================
// ASSOCIATION
// =============================================================================

/// A relationship to follow: a reference property of the source entity plus
/// an optional class filter on the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Reference or reference-vector property of the source.
    pub property_id: ModelCode,
    /// Class code; targets must be of that class or derive from it.
    pub type_filter: Option<ModelCode>,
}

impl Association {
    /// Follow `property_id` without filtering targets.
    #[must_use]
    pub const fn new(property_id: ModelCode) -> Self {
        Self {
            property_id,
            type_filter: None,
        }
    }

    /// Follow `property_id`, keeping targets of class `type_filter`.
    #[must_use]
    pub const fn with_type(property_id: ModelCode, type_filter: ModelCode) -> Self {
        Self {
            property_id,
            type_filter: Some(type_filter),
        }
    }
}

// =============================================================================
// RESOURCE CURSOR
// =============================================================================

/// Forward-only pager over descriptions captured at query time.
#[derive(Debug, Clone)]
pub struct ResourceCursor {
    items: Vec<ResourceDescription>,
    position: usize,
    closed: bool,
}

impl ResourceCursor {
    /// A cursor over `items`, served in the given order.
    #[must_use]
    pub fn new(items: Vec<ResourceDescription>) -> Self {
        Self {
            items,
            position: 0,
            closed: false,
        }
    }

    /// Snapshot entries not yet consumed.
    #[must_use]
    pub fn resources_left(&self) -> usize {
        self.items.len().saturating_sub(self.position)
    }

    #[must_use]
    pub fn resources_total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// GIDs of the snapshot, in cursor order.
    #[must_use]
    pub fn ids(&self) -> Vec<Gid> {
        self.items.iter().map(|rd| rd.id).collect()
    }

    /// Up to `n` descriptions (capped at `MAX_ITERATOR_BATCH`).
    pub fn next(&mut self, n: usize) -> Result<Vec<ResourceDescription>, GridError> {
        if self.closed {
            return Err(GridError::CursorClosed);
        }
        let take = n.min(MAX_ITERATOR_BATCH).min(self.resources_left());
        let end = self.position + take;
        let batch = self.items[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    /// Restart from the first snapshot entry.
    pub fn rewind(&mut self) -> Result<(), GridError> {
        if self.closed {
            return Err(GridError::CursorClosed);
        }
        self.position = 0;
        Ok(())
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.items.clear();
        self.position = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::types::DmsType;

    fn named(index: i32, name: &str) -> ResourceDescription {
        ResourceDescription::with_properties(
            Gid::of(DmsType::Switch, index),
            vec![Property::with_value(ModelCode::IDOBJ_NAME, name).expect("name")],
        )
    }

    #[test]
    fn association_helpers() {
        let a = Association::new(ModelCode::CONDEQ_TERMINALS);
        assert_eq!(a.type_filter, None);
        let b = Association::with_type(ModelCode::CONDEQ_TERMINALS, ModelCode::TERMINAL);
        assert_eq!(b.type_filter, Some(ModelCode::TERMINAL));
    }

    #[test]
    fn empty_cursor() {
        let mut cursor = ResourceCursor::new(Vec::new());
        assert_eq!(cursor.resources_total(), 0);
        assert!(cursor.next(10).expect("next").is_empty());
    }

    #[test]
    fn pages_in_order() {
        let mut cursor = ResourceCursor::new(vec![named(1, "a"), named(2, "b"), named(3, "c")]);
        let first = cursor.next(2).expect("next");
        assert_eq!(first, vec![named(1, "a"), named(2, "b")]);
        assert_eq!(cursor.resources_left(), 1);
        assert_eq!(cursor.next(5).expect("next"), vec![named(3, "c")]);
        assert!(cursor.next(5).expect("drained").is_empty());
        assert_eq!(cursor.resources_total(), 3);

        cursor.rewind().expect("rewind");
        assert_eq!(cursor.ids(), vec![
            Gid::of(DmsType::Switch, 1),
            Gid::of(DmsType::Switch, 2),
            Gid::of(DmsType::Switch, 3),
        ]);
        assert_eq!(cursor.resources_left(), 3);
    }

    #[test]
    fn closed_cursor_rejects_next() {
        let mut cursor = ResourceCursor::new(vec![named(1, "a")]);
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(cursor.resources_total(), 0);
        assert!(matches!(cursor.next(1), Err(GridError::CursorClosed)));
        assert!(matches!(cursor.rewind(), Err(GridError::CursorClosed)));
    }
}
