//! # GDA Session
//!
//! The exposed query/update boundary. A `GdaSession` owns the model and hands
//! out integer handles for open cursors, so callers never hold a borrow into
//! the store between calls.
//!
//! - Handles are never reused within a session
//! - A cursor lives until it is closed or the session is dropped

use crate::delta::{Delta, ResourceDescription, UpdateResult};
use crate::network_model::{NetworkModel, ReplayReport};
use crate::query::{Association, ResourceCursor};
use crate::types::{DmsType, Gid, GridError, ModelCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle of an open cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorId(pub u32);

/// A network model plus its open cursors.
#[derive(Debug, Default)]
pub struct GdaSession {
    model: NetworkModel,
    cursors: BTreeMap<CursorId, ResourceCursor>,
    next_cursor: u32,
}

impl GdaSession {
    #[must_use]
    pub fn new(model: NetworkModel) -> Self {
        Self {
            model,
            cursors: BTreeMap::new(),
            next_cursor: 1,
        }
    }

    /// Replay the model's log. Call once before serving requests.
    pub fn initialize(&mut self) -> ReplayReport {
        self.model.initialize()
    }

    #[must_use]
    pub const fn model(&self) -> &NetworkModel {
        &self.model
    }

    /// Number of cursors not yet closed.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.cursors.len()
    }

    /// Store `cursor` under a fresh handle. The last `u32` is never issued.
    fn register(&mut self, cursor: ResourceCursor) -> Result<CursorId, GridError> {
        let id = CursorId(self.next_cursor.max(1));
        self.next_cursor = id.0.checked_add(1).ok_or(GridError::CursorsExhausted)?;
        self.cursors.insert(id, cursor);
        Ok(id)
    }

    fn cursor(&self, id: CursorId) -> Result<&ResourceCursor, GridError> {
        self.cursors.get(&id).ok_or(GridError::CursorNotFound(id.0))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get_values(
        &self,
        gid: Gid,
        codes: &[ModelCode],
    ) -> Result<ResourceDescription, GridError> {
        self.model.get_values(gid, codes)
    }

    pub fn get_extent_values(
        &mut self,
        kind: DmsType,
        codes: &[ModelCode],
    ) -> Result<CursorId, GridError> {
        let cursor = self.model.get_extent_values(kind, codes)?;
        self.register(cursor)
    }

    pub fn get_related_values(
        &mut self,
        source: Gid,
        codes: &[ModelCode],
        association: &Association,
    ) -> Result<CursorId, GridError> {
        let cursor = self.model.get_related_values(source, codes, association)?;
        self.register(cursor)
    }

    // =========================================================================
    // CURSORS
    // =========================================================================

    /// Next batch of up to `n` descriptions; `n == 0` yields an empty batch.
    pub fn iterator_next(
        &mut self,
        n: usize,
        id: CursorId,
    ) -> Result<Vec<ResourceDescription>, GridError> {
        self.cursors
            .get_mut(&id)
            .ok_or(GridError::CursorNotFound(id.0))?
            .next(n)
    }

    pub fn iterator_resources_left(&self, id: CursorId) -> Result<usize, GridError> {
        Ok(self.cursor(id)?.resources_left())
    }

    pub fn iterator_resources_total(&self, id: CursorId) -> Result<usize, GridError> {
        Ok(self.cursor(id)?.resources_total())
    }

    pub fn iterator_rewind(&mut self, id: CursorId) -> Result<(), GridError> {
        self.cursors
            .get_mut(&id)
            .ok_or(GridError::CursorNotFound(id.0))?
            .rewind()
    }

    /// Close and forget a cursor.
    pub fn iterator_close(&mut self, id: CursorId) -> Result<(), GridError> {
        let mut cursor = self
            .cursors
            .remove(&id)
            .ok_or(GridError::CursorNotFound(id.0))?;
        cursor.close();
        Ok(())
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    pub fn apply_update(&mut self, delta: Delta) -> UpdateResult {
        self.model.apply_delta(delta)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    fn session_with_switches(count: i32) -> GdaSession {
        let mut session = GdaSession::new(NetworkModel::new());
        let mut delta = Delta::new();
        for i in 1..=count {
            let mut rd = ResourceDescription::new(Gid::of(DmsType::Switch, -i));
            rd.add_property(
                Property::with_value(ModelCode::IDOBJ_NAME, format!("Q{}", i)).expect("name"),
            );
            delta.add_insert(rd);
        }
        assert!(session.apply_update(delta).is_success());
        session
    }

    #[test]
    fn paging_through_extent() {
        let mut session = session_with_switches(5);
        let id = session
            .get_extent_values(DmsType::Switch, &[ModelCode::IDOBJ_NAME])
            .expect("extent");
        assert_eq!(session.iterator_resources_total(id).expect("total"), 5);

        let first = session.iterator_next(2, id).expect("next");
        let rest = session.iterator_next(10, id).expect("next");
        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 3);
        assert_eq!(session.iterator_resources_left(id).expect("left"), 0);
        assert!(session.iterator_next(1, id).expect("drained").is_empty());

        session.iterator_rewind(id).expect("rewind");
        assert_eq!(session.iterator_resources_left(id).expect("left"), 5);
    }

    #[test]
    fn zero_batch_is_empty() {
        let mut session = session_with_switches(1);
        let id = session
            .get_extent_values(DmsType::Switch, &[])
            .expect("extent");
        assert!(session.iterator_next(0, id).expect("next").is_empty());
        assert_eq!(session.iterator_resources_left(id).expect("left"), 1);
    }

    #[test]
    fn unknown_and_closed_handles() {
        let mut session = session_with_switches(1);
        assert!(matches!(
            session.iterator_next(1, CursorId(99)),
            Err(GridError::CursorNotFound(99))
        ));
        let id = session
            .get_extent_values(DmsType::Switch, &[])
            .expect("extent");
        assert_eq!(session.open_cursors(), 1);
        session.iterator_close(id).expect("close");
        assert_eq!(session.open_cursors(), 0);
        assert!(matches!(
            session.iterator_close(id),
            Err(GridError::CursorNotFound(_))
        ));
    }

    #[test]
    fn handles_are_not_reused() {
        let mut session = session_with_switches(1);
        let a = session.get_extent_values(DmsType::Switch, &[]).expect("a");
        session.iterator_close(a).expect("close");
        let b = session.get_extent_values(DmsType::Switch, &[]).expect("b");
        assert_ne!(a, b);
    }

    #[test]
    fn exhausted_handles_never_overwrite() {
        let mut session = session_with_switches(1);
        session.next_cursor = u32::MAX - 1;
        let last = session.get_extent_values(DmsType::Switch, &[]).expect("last");
        assert_eq!(last, CursorId(u32::MAX - 1));

        assert!(matches!(
            session.get_extent_values(DmsType::Switch, &[]),
            Err(GridError::CursorsExhausted)
        ));
        assert!(matches!(
            session.get_extent_values(DmsType::Switch, &[]),
            Err(GridError::CursorsExhausted)
        ));
        assert_eq!(session.open_cursors(), 1);
        assert_eq!(session.iterator_resources_total(last).expect("total"), 1);
    }

    #[test]
    fn open_cursor_keeps_values_from_query_time() {
        let mut session = session_with_switches(2);
        let id = session
            .get_extent_values(DmsType::Switch, &[ModelCode::IDOBJ_NAME])
            .expect("extent");

        let mut rename = Delta::new();
        let mut rd = ResourceDescription::new(Gid::of(DmsType::Switch, 1));
        rd.add_property(Property::with_value(ModelCode::IDOBJ_NAME, "renamed").expect("name"));
        rename.add_update(rd);
        let mut delete = Delta::new();
        delete.add_delete(ResourceDescription::new(Gid::of(DmsType::Switch, 2)));
        assert!(session.apply_update(rename).is_success());
        assert!(session.apply_update(delete).is_success());

        let batch = session.iterator_next(10, id).expect("next");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].properties[0].as_string().expect("name"), "Q1");
        assert_eq!(batch[1].id, Gid::of(DmsType::Switch, 2));
        assert_eq!(batch[1].properties[0].as_string().expect("name"), "Q2");
    }
}
