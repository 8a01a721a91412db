//! # Delta
//!
//! The unit of transport and persistence: an ordered batch of Insert, Update
//! and Delete operations, each carrying a `ResourceDescription`.
//!
//! Inserts may use temporary GIDs (negative index). They are rewritten to
//! real GIDs by [`Delta::fix_negative_to_positive_ids`] before anything is
//! applied, together with every reference that points at them.

use crate::property::Property;
use crate::types::{Gid, GridError, ModelCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// RESOURCE DESCRIPTION
// =============================================================================

/// A GID plus a set of typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub id: Gid,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ResourceDescription {
    #[must_use]
    pub fn new(id: Gid) -> Self {
        Self {
            id,
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_properties(id: Gid, properties: Vec<Property>) -> Self {
        Self { id, properties }
    }

    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// First property with this code.
    #[must_use]
    pub fn property(&self, code: ModelCode) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == code)
    }

    #[must_use]
    pub fn contains(&self, code: ModelCode) -> bool {
        self.property(code).is_some()
    }
}

// =============================================================================
// DELTA OPERATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeltaOpType {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaOperation {
    pub op: DeltaOpType,
    pub description: ResourceDescription,
}

// =============================================================================
// DELTA
// =============================================================================

/// Ordered change set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Log sequence id, assigned when the delta is persisted.
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub operations: Vec<DeltaOperation>,
}

impl Delta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operation(&mut self, op: DeltaOpType, description: ResourceDescription) {
        self.operations.push(DeltaOperation { op, description });
    }

    pub fn add_insert(&mut self, description: ResourceDescription) {
        self.add_operation(DeltaOpType::Insert, description);
    }

    pub fn add_update(&mut self, description: ResourceDescription) {
        self.add_operation(DeltaOpType::Update, description);
    }

    pub fn add_delete(&mut self, description: ResourceDescription) {
        self.add_operation(DeltaOpType::Delete, description);
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Descriptions of the operations of one type, in delta order.
    pub fn operations_of(&self, op: DeltaOpType) -> impl Iterator<Item = &ResourceDescription> {
        self.operations
            .iter()
            .filter(move |o| o.op == op)
            .map(|o| &o.description)
    }

    #[must_use]
    pub fn count_of(&self, op: DeltaOpType) -> usize {
        self.operations_of(op).count()
    }

    /// Stable grouping: inserts, then updates, then deletes.
    pub fn sort_operations(&mut self) {
        self.operations.sort_by_key(|o| o.op);
    }

    /// Replace temporary GIDs with real ones.
    ///
    /// `counters` maps a type code to the highest index already used by that
    /// type and is advanced for every allocation; a type missing from the map
    /// starts at 0, so its first index is 1. Past `i32::MAX` allocation fails
    /// with `IndexExhausted`.
    /// Every allocation is recorded in `pairs` as it happens, so the caller
    /// keeps the partial mapping even when resolution fails.
    pub fn fix_negative_to_positive_ids(
        &mut self,
        counters: &mut BTreeMap<u16, i32>,
        pairs: &mut BTreeMap<Gid, Gid>,
    ) -> Result<(), GridError> {
        for operation in &self.operations {
            let old = operation.description.id;
            if operation.op != DeltaOpType::Insert || !old.is_temporary() {
                continue;
            }
            if pairs.contains_key(&old) {
                return Err(GridError::DuplicateEntity(old));
            }
            let last = counters.entry(old.type_code()).or_insert(0);
            let index = last
                .checked_add(1)
                .ok_or(GridError::IndexExhausted(old.type_code()))?;
            *last = index;
            pairs.insert(old, old.with_index(index));
        }

        let resolve = |gid: Gid| pairs.get(&gid).copied().unwrap_or(gid);
        for operation in &mut self.operations {
            let description = &mut operation.description;
            if description.id.is_temporary() {
                description.id = pairs
                    .get(&description.id)
                    .copied()
                    .ok_or(GridError::UnresolvedTemporaryId(description.id))?;
            }
            for property in &mut description.properties {
                property.map_references(resolve);
                if let Some(dangling) = property
                    .referenced_gids()
                    .into_iter()
                    .find(|g| g.is_temporary())
                {
                    return Err(GridError::UnresolvedTemporaryId(dangling));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// UPDATE RESULT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    Succeeded,
    Failed,
}

/// Outcome of one `apply_delta` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub result: ResultType,
    pub message: String,
    /// Temporary GID → assigned GID.
    pub global_id_pairs: BTreeMap<Gid, Gid>,
}

impl UpdateResult {
    #[must_use]
    pub fn succeeded(message: impl Into<String>, global_id_pairs: BTreeMap<Gid, Gid>) -> Self {
        Self {
            result: ResultType::Succeeded,
            message: message.into(),
            global_id_pairs,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>, global_id_pairs: BTreeMap<Gid, Gid>) -> Self {
        Self {
            result: ResultType::Failed,
            message: message.into(),
            global_id_pairs,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == ResultType::Succeeded
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DmsType;

    fn rd(gid: Gid) -> ResourceDescription {
        ResourceDescription::new(gid)
    }

    #[test]
    fn sort_is_stable_grouping() {
        let mut delta = Delta::new();
        let a = Gid::of(DmsType::Switch, 1);
        let b = Gid::of(DmsType::Switch, 2);
        let c = Gid::of(DmsType::Switch, 3);
        delta.add_delete(rd(a));
        delta.add_update(rd(b));
        delta.add_insert(rd(c));
        delta.add_update(rd(a));
        delta.add_insert(rd(b));
        delta.sort_operations();

        let order: Vec<(DeltaOpType, Gid)> = delta
            .operations
            .iter()
            .map(|o| (o.op, o.description.id))
            .collect();
        assert_eq!(
            order,
            vec![
                (DeltaOpType::Insert, c),
                (DeltaOpType::Insert, b),
                (DeltaOpType::Update, b),
                (DeltaOpType::Update, a),
                (DeltaOpType::Delete, a),
            ]
        );
    }

    #[test]
    fn temporary_ids_resolved_with_references() {
        let bv_tmp = Gid::of(DmsType::BaseVoltage, -1);
        let sw_tmp = Gid::of(DmsType::Switch, -1);

        let mut delta = Delta::new();
        let mut sw = rd(sw_tmp);
        sw.add_property(
            Property::with_value(ModelCode::CONDEQ_BASVOLTAGE, bv_tmp).expect("ref"),
        );
        delta.add_insert(sw);
        delta.add_insert(rd(bv_tmp));

        let mut counters = BTreeMap::from([(DmsType::BaseVoltage.code(), 3)]);
        let mut pairs = BTreeMap::new();
        delta
            .fix_negative_to_positive_ids(&mut counters, &mut pairs)
            .expect("resolve");

        let bv = Gid::of(DmsType::BaseVoltage, 4);
        let switch = Gid::of(DmsType::Switch, 1);
        assert_eq!(pairs.get(&bv_tmp), Some(&bv));
        assert_eq!(pairs.get(&sw_tmp), Some(&switch));
        assert_eq!(delta.operations[0].description.id, switch);
        assert_eq!(
            delta.operations[0]
                .description
                .property(ModelCode::CONDEQ_BASVOLTAGE)
                .expect("prop")
                .as_reference()
                .expect("ref"),
            bv
        );
        assert_eq!(counters.get(&DmsType::BaseVoltage.code()), Some(&4));
        assert_eq!(counters.get(&DmsType::Switch.code()), Some(&1));
    }

    #[test]
    fn exhausted_index_space_is_an_error() {
        let tmp = Gid::of(DmsType::Switch, -1);
        let mut delta = Delta::new();
        delta.add_insert(rd(tmp));
        let mut counters = BTreeMap::from([(DmsType::Switch.code(), i32::MAX)]);
        let mut pairs = BTreeMap::new();
        let err = delta.fix_negative_to_positive_ids(&mut counters, &mut pairs);
        assert!(matches!(err, Err(GridError::IndexExhausted(code)) if code == DmsType::Switch.code()));
        assert!(pairs.is_empty());
        assert_eq!(counters.get(&DmsType::Switch.code()), Some(&i32::MAX));
    }

    #[test]
    fn duplicate_temporary_insert() {
        let tmp = Gid::of(DmsType::Terminal, -1);
        let mut delta = Delta::new();
        delta.add_insert(rd(tmp));
        delta.add_insert(rd(tmp));
        let mut pairs = BTreeMap::new();
        let err = delta.fix_negative_to_positive_ids(&mut BTreeMap::new(), &mut pairs);
        assert!(matches!(err, Err(GridError::DuplicateEntity(g)) if g == tmp));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn dangling_temporary_reference() {
        let mut delta = Delta::new();
        let mut t = rd(Gid::of(DmsType::Terminal, 1));
        t.add_property(
            Property::with_value(
                ModelCode::TERMINAL_CONNNODE,
                Gid::of(DmsType::ConnectivityNode, -3),
            )
            .expect("ref"),
        );
        delta.add_update(t);
        let err = delta.fix_negative_to_positive_ids(&mut BTreeMap::new(), &mut BTreeMap::new());
        assert!(matches!(err, Err(GridError::UnresolvedTemporaryId(_))));
    }

    #[test]
    fn update_of_unknown_temporary_id() {
        let mut delta = Delta::new();
        delta.add_update(rd(Gid::of(DmsType::Switch, -2)));
        let err = delta.fix_negative_to_positive_ids(&mut BTreeMap::new(), &mut BTreeMap::new());
        assert!(matches!(err, Err(GridError::UnresolvedTemporaryId(_))));
    }

    #[test]
    fn counts_by_type() {
        let mut delta = Delta::new();
        delta.add_insert(rd(Gid::of(DmsType::Switch, -1)));
        delta.add_insert(rd(Gid::of(DmsType::Switch, -2)));
        delta.add_delete(rd(Gid::of(DmsType::Switch, 7)));
        assert_eq!(delta.count_of(DeltaOpType::Insert), 2);
        assert_eq!(delta.count_of(DeltaOpType::Update), 0);
        assert_eq!(delta.len(), 3);
        delta.clear();
        assert!(delta.is_empty());
    }
}
