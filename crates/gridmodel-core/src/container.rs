//! # Container
//!
//! Type-homogeneous entity index: one per concrete kind, keyed by GID.
//!
//! Indices come from a high-water mark that never decreases, so a removed
//! entity's index is never handed out again.

use crate::entity::Entity;
use crate::types::{DmsType, Gid, GridError};
use std::collections::BTreeMap;

/// All entities of one concrete kind.
#[derive(Debug, Clone)]
pub struct Container {
    kind: DmsType,
    entities: BTreeMap<Gid, Entity>,
    max_index: i32,
}

impl Container {
    #[must_use]
    pub fn new(kind: DmsType) -> Self {
        Self {
            kind,
            entities: BTreeMap::new(),
            max_index: 0,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DmsType {
        self.kind
    }

    /// Create and index a default entity for `gid`.
    pub fn create(&mut self, gid: Gid) -> Result<&mut Entity, GridError> {
        if gid.type_code() != self.kind.code() {
            return Err(GridError::UnsupportedType(gid.type_code()));
        }
        if self.entities.contains_key(&gid) {
            return Err(GridError::DuplicateEntity(gid));
        }
        let entity = Entity::new(gid)?;
        self.max_index = self.max_index.max(gid.index());
        Ok(self.entities.entry(gid).or_insert(entity))
    }

    #[must_use]
    pub fn exists(&self, gid: Gid) -> bool {
        self.entities.contains_key(&gid)
    }

    pub fn get(&self, gid: Gid) -> Result<&Entity, GridError> {
        self.entities.get(&gid).ok_or(GridError::NotFound(gid))
    }

    pub fn get_mut(&mut self, gid: Gid) -> Result<&mut Entity, GridError> {
        self.entities.get_mut(&gid).ok_or(GridError::NotFound(gid))
    }

    /// Unindex an entity. Its index stays consumed.
    pub fn remove(&mut self, gid: Gid) -> Result<Entity, GridError> {
        self.entities.remove(&gid).ok_or(GridError::NotFound(gid))
    }

    /// Snapshot of every GID, ascending.
    #[must_use]
    pub fn all_ids(&self) -> Vec<Gid> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Highest index ever created; 0 for a fresh container.
    #[must_use]
    pub const fn max_index(&self) -> i32 {
        self.max_index
    }

    /// The next index to allocate: one past the highest ever created.
    /// `None` once `i32::MAX` has been used.
    #[must_use]
    pub const fn next_index(&self) -> Option<i32> {
        self.max_index.checked_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup() {
        let mut c = Container::new(DmsType::Terminal);
        let gid = Gid::of(DmsType::Terminal, 1);
        c.create(gid).expect("create");
        assert!(c.exists(gid));
        assert_eq!(c.get(gid).expect("get").gid(), gid);
        assert_eq!(c.len(), 1);
        assert!(matches!(c.create(gid), Err(GridError::DuplicateEntity(_))));
    }

    #[test]
    fn wrong_kind_rejected() {
        let mut c = Container::new(DmsType::Terminal);
        assert!(matches!(
            c.create(Gid::of(DmsType::Switch, 1)),
            Err(GridError::UnsupportedType(2))
        ));
    }

    #[test]
    fn indices_not_reused_after_remove() {
        let mut c = Container::new(DmsType::BaseVoltage);
        c.create(Gid::of(DmsType::BaseVoltage, 1)).expect("1");
        c.create(Gid::of(DmsType::BaseVoltage, 2)).expect("2");
        c.remove(Gid::of(DmsType::BaseVoltage, 2)).expect("remove");
        assert_eq!(c.len(), 1);
        assert_eq!(c.next_index(), Some(3));
    }

    #[test]
    fn next_index_stops_at_max() {
        let mut c = Container::new(DmsType::Switch);
        c.create(Gid::of(DmsType::Switch, i32::MAX)).expect("max");
        assert_eq!(c.max_index(), i32::MAX);
        assert_eq!(c.next_index(), None);
    }

    #[test]
    fn remove_missing() {
        let mut c = Container::new(DmsType::BaseVoltage);
        assert!(matches!(
            c.remove(Gid::of(DmsType::BaseVoltage, 9)),
            Err(GridError::NotFound(_))
        ));
        assert!(c.is_empty());
        assert_eq!(c.next_index(), Some(1));
    }

    #[test]
    fn ids_sorted() {
        let mut c = Container::new(DmsType::Switch);
        for i in [5, 1, 3] {
            c.create(Gid::of(DmsType::Switch, i)).expect("create");
        }
        let idx: Vec<i32> = c.all_ids().into_iter().map(Gid::index).collect();
        assert_eq!(idx, vec![1, 3, 5]);
        assert_eq!(c.iter().count(), 3);
    }
}
