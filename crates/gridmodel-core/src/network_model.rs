//! # Network Model
//!
//! The store: one `Container` per concrete kind, the query engine over them,
//! transactional delta application and startup replay from the delta log.
//!
//! All data structures use `BTreeMap`, so every scan is in GID order.
//!
//! ## Applying a delta
//!
//! 1. Temporary GIDs are resolved; on failure nothing is applied or logged.
//! 2. Operations are grouped: inserts, then updates, then deletes.
//! 3. Inserted entities are all created before any payload is applied, so a
//!    reference may target anything inserted by the same delta.
//! 4. Each property is validated before its references are rewired.
//! 5. The delta is appended to the log once application has started,
//!    whether it succeeded or not. A failed delta is not rolled back.

use crate::container::Container;
use crate::delta::{Delta, DeltaOpType, ResourceDescription, UpdateResult};
use crate::entity::{Entity, ReferenceDirection};
use crate::formats::{DeltaLog, delta_from_bytes, delta_to_bytes};
use crate::property::Property;
use crate::query::{Association, ResourceCursor};
use crate::schema;
use crate::types::{DmsType, Gid, GridError, ModelCode, PropertyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// REPORTS
// =============================================================================

/// One log record that could not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFailure {
    /// Zero-based record position; `None` when the log itself was unreadable.
    pub record: Option<usize>,
    pub reason: String,
}

/// Outcome of [`NetworkModel::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub records: usize,
    pub applied: usize,
    pub failures: Vec<ReplayFailure>,
}

impl ReplayReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entity counts per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub total_entities: usize,
    pub per_kind: BTreeMap<DmsType, usize>,
    pub next_indices: BTreeMap<DmsType, i32>,
}

// =============================================================================
// NETWORK MODEL
// =============================================================================

/// In-process network model store.
#[derive(Debug, Default)]
pub struct NetworkModel {
    containers: BTreeMap<DmsType, Container>,
    log: Option<DeltaLog>,
}

impl NetworkModel {
    /// An empty in-memory model that persists nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty model that appends committed deltas to `log`.
    #[must_use]
    pub fn with_log(log: DeltaLog) -> Self {
        Self {
            containers: BTreeMap::new(),
            log: Some(log),
        }
    }

    /// Shorthand for a model backed by the log file at `path`.
    #[must_use]
    pub fn open(path: impl AsRef<Path>, sync_on_commit: bool) -> Self {
        Self::with_log(DeltaLog::new(path, sync_on_commit))
    }

    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(DeltaLog::path)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[must_use]
    pub fn entity_exists(&self, gid: Gid) -> bool {
        self.get_entity(gid).is_ok()
    }

    pub fn get_entity(&self, gid: Gid) -> Result<&Entity, GridError> {
        gid.dms_type()
            .and_then(|kind| self.containers.get(&kind))
            .ok_or(GridError::NotFound(gid))?
            .get(gid)
    }

    fn get_entity_mut(&mut self, gid: Gid) -> Result<&mut Entity, GridError> {
        gid.dms_type()
            .and_then(|kind| self.containers.get_mut(&kind))
            .ok_or(GridError::NotFound(gid))?
            .get_mut(gid)
    }

    /// Number of entities of one concrete kind.
    #[must_use]
    pub fn entity_count(&self, kind: DmsType) -> usize {
        self.containers.get(&kind).map_or(0, Container::len)
    }

    /// Next index each existing container would allocate. Kinds whose index
    /// space is used up are left out.
    #[must_use]
    pub fn counters(&self) -> BTreeMap<DmsType, i32> {
        self.containers
            .iter()
            .filter_map(|(kind, container)| Some((*kind, container.next_index()?)))
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        let per_kind: BTreeMap<DmsType, usize> = self
            .containers
            .iter()
            .map(|(kind, container)| (*kind, container.len()))
            .collect();
        ModelSummary {
            total_entities: per_kind.values().sum(),
            per_kind,
            next_indices: self.counters(),
        }
    }

    /// Every entity as a full description, in GID order.
    #[must_use]
    pub fn dump(&self) -> Vec<ResourceDescription> {
        let mut all: Vec<ResourceDescription> = self
            .containers
            .values()
            .flat_map(Container::iter)
            .map(Entity::to_resource_description)
            .collect();
        all.sort_by_key(|rd| rd.id);
        all
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// The requested properties of one entity.
    pub fn get_values(
        &self,
        gid: Gid,
        codes: &[ModelCode],
    ) -> Result<ResourceDescription, GridError> {
        let entity = self.get_entity(gid)?;
        let properties = codes
            .iter()
            .map(|code| entity.get_property(*code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResourceDescription::with_properties(gid, properties))
    }

    /// Cursor over every entity of `kind`.
    ///
    /// Codes must apply to `kind`. An abstract kind or a kind with no
    /// entities yet yields an empty cursor.
    pub fn get_extent_values(
        &self,
        kind: DmsType,
        codes: &[ModelCode],
    ) -> Result<ResourceCursor, GridError> {
        if let Some(code) = codes.iter().find(|code| !schema::applies_to(kind, **code)) {
            return Err(GridError::UnknownSchemaElement(format!(
                "property {} of {}",
                code, kind
            )));
        }
        let gids = self
            .containers
            .get(&kind)
            .map(Container::all_ids)
            .unwrap_or_default();
        tracing::debug!(kind = %kind, count = gids.len(), "Extent cursor opened");
        Ok(ResourceCursor::new(self.snapshot(&gids, codes)?))
    }

    /// Cursor over the entities `source` reaches through `association`.
    pub fn get_related_values(
        &self,
        source: Gid,
        codes: &[ModelCode],
        association: &Association,
    ) -> Result<ResourceCursor, GridError> {
        let property = self.get_entity(source)?.get_property(association.property_id)?;
        if !property.is_reference() {
            return Err(GridError::TypeMismatch {
                code: association.property_id,
                expected: PropertyType::Reference,
                found: property.kind(),
            });
        }
        let filter = association
            .type_filter
            .map(schema::type_from_model_code)
            .transpose()?;

        let mut gids: Vec<Gid> = property
            .referenced_gids()
            .into_iter()
            .filter(|gid| match (filter, gid.dms_type()) {
                (None, _) => true,
                (Some(wanted), Some(kind)) => schema::is_a(kind, wanted),
                (Some(_), None) => false,
            })
            .collect();
        gids.sort();
        gids.dedup();
        Ok(ResourceCursor::new(self.snapshot(&gids, codes)?))
    }

    /// Current values of `codes` for each GID, skipping codes that do not
    /// apply to an entity's kind. Missing entities are left out.
    fn snapshot(
        &self,
        gids: &[Gid],
        codes: &[ModelCode],
    ) -> Result<Vec<ResourceDescription>, GridError> {
        let mut items = Vec::with_capacity(gids.len());
        for gid in gids {
            let Ok(entity) = self.get_entity(*gid) else {
                tracing::warn!(gid = %gid, "Referenced entity does not exist, leaving it out");
                continue;
            };
            let properties = codes
                .iter()
                .filter(|code| entity.has_property(**code))
                .map(|code| entity.get_property(*code))
                .collect::<Result<Vec<_>, _>>()?;
            items.push(ResourceDescription::with_properties(*gid, properties));
        }
        Ok(items)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Resolve, sort, apply and persist one delta.
    ///
    /// Never returns an error: failures are reported in the result.
    pub fn apply_delta(&mut self, delta: Delta) -> UpdateResult {
        self.apply(delta, true)
    }

    fn apply(&mut self, mut delta: Delta, persist: bool) -> UpdateResult {
        let mut pairs = BTreeMap::new();
        let mut counters: BTreeMap<u16, i32> = self
            .containers
            .iter()
            .map(|(kind, container)| (kind.code(), container.max_index()))
            .collect();

        if let Err(e) = delta.fix_negative_to_positive_ids(&mut counters, &mut pairs) {
            tracing::warn!(error = %e, "Delta rejected during id resolution");
            return UpdateResult::failed(e.to_string(), pairs);
        }
        delta.sort_operations();

        let mut result = match self.apply_operations(&delta) {
            Ok(()) => UpdateResult::succeeded(
                format!("Applied {} operations", delta.len()),
                pairs.clone(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Delta application failed, changes are not rolled back");
                UpdateResult::failed(e.to_string(), pairs.clone())
            }
        };

        if persist {
            if let Err(e) = self.persist(&mut delta) {
                tracing::error!(error = %e, "Failed to persist delta");
                result = UpdateResult::failed(format!("Persisting delta failed: {}", e), pairs);
            }
        }

        tracing::info!(
            id = delta.id,
            inserts = delta.count_of(DeltaOpType::Insert),
            updates = delta.count_of(DeltaOpType::Update),
            deletes = delta.count_of(DeltaOpType::Delete),
            success = result.is_success(),
            "Delta processed"
        );
        result
    }

    fn apply_operations(&mut self, delta: &Delta) -> Result<(), GridError> {
        for description in delta.operations_of(DeltaOpType::Insert) {
            self.create_entity(description.id)?;
        }
        for operation in &delta.operations {
            let description = &operation.description;
            tracing::debug!(op = ?operation.op, gid = %description.id, "Applying operation");
            match operation.op {
                DeltaOpType::Insert | DeltaOpType::Update => {
                    self.assign_properties(description)?;
                }
                DeltaOpType::Delete => self.delete_entity(description.id)?,
            }
        }
        Ok(())
    }

    fn create_entity(&mut self, gid: Gid) -> Result<(), GridError> {
        let kind = gid
            .dms_type()
            .filter(|kind| kind.is_concrete())
            .ok_or(GridError::UnsupportedType(gid.type_code()))?;
        self.containers
            .entry(kind)
            .or_insert_with(|| Container::new(kind))
            .create(gid)?;
        Ok(())
    }

    fn assign_properties(&mut self, description: &ResourceDescription) -> Result<(), GridError> {
        let gid = description.id;
        for property in &description.properties {
            let old = self.validate_assignment(gid, property)?;
            if property.is_reference() {
                self.rewire(gid, property.id, &old, &property.referenced_gids())?;
            }
            self.get_entity_mut(gid)?.set_property(property)?;
        }
        Ok(())
    }

    /// Check one property against the entity and return its current targets.
    fn validate_assignment(&self, gid: Gid, property: &Property) -> Result<Vec<Gid>, GridError> {
        let entity = self.get_entity(gid)?;
        let code = property.id;
        if !entity.has_property(code) {
            return Err(GridError::UnknownProperty { gid, code });
        }
        if !schema::is_settable(code) {
            return Err(GridError::NotSettable(code));
        }
        let expected = schema::kind_of(code)?;
        if property.kind() != expected {
            return Err(GridError::TypeMismatch {
                code,
                expected,
                found: property.kind(),
            });
        }
        Ok(entity.get_property(code)?.referenced_gids())
    }

    fn delete_entity(&mut self, gid: Gid) -> Result<(), GridError> {
        let entity = self.get_entity(gid)?;
        if entity.is_referenced() {
            return Err(GridError::EntityInUse(gid));
        }
        let forward = entity.get_references(ReferenceDirection::Target);
        for (code, targets) in forward {
            self.rewire(gid, code, &targets, &[])?;
        }
        let kind = entity_kind(gid)?;
        self.containers
            .get_mut(&kind)
            .ok_or(GridError::NotFound(gid))?
            .remove(gid)?;
        Ok(())
    }

    /// Move the inverse entries of `source`'s `code` from `old` targets to `new`.
    ///
    /// Targets that do not exist are skipped on both sides; the forward value
    /// is still stored by the caller. Every new target is checked before any
    /// entry is touched, so an error leaves both sides unchanged.
    fn rewire(
        &mut self,
        source: Gid,
        code: ModelCode,
        old: &[Gid],
        new: &[Gid],
    ) -> Result<(), GridError> {
        let mut live = Vec::with_capacity(new.len());
        for target in new {
            match self.get_entity(*target) {
                Ok(entity) if entity.accepts_reference(code) => live.push(*target),
                Ok(_) => {
                    return Err(GridError::UnknownProperty {
                        gid: *target,
                        code,
                    });
                }
                Err(_) => tracing::warn!(
                    source = %source,
                    target = %target,
                    "Reference target does not exist, no inverse entry recorded"
                ),
            }
        }

        for target in old {
            match self.get_entity_mut(*target) {
                Ok(entity) if entity.accepts_reference(code) => {
                    entity.remove_reference(code, source)?;
                }
                Ok(_) => tracing::warn!(
                    source = %source,
                    target = %target,
                    "Previous reference target keeps no inverse entry"
                ),
                Err(_) => tracing::warn!(
                    source = %source,
                    target = %target,
                    "Previous reference target no longer exists"
                ),
            }
        }
        for target in live {
            self.get_entity_mut(target)?.add_reference(code, source)?;
        }
        Ok(())
    }

    fn persist(&mut self, delta: &mut Delta) -> Result<(), GridError> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        delta.id = u64::from(log.record_count()?) + 1;
        let bytes = delta_to_bytes(delta)?;
        log.append(&bytes)?;
        Ok(())
    }

    // =========================================================================
    // REPLAY
    // =========================================================================

    /// Rebuild state by replaying every logged delta in order.
    ///
    /// Best effort: undecodable or failing records are reported and skipped.
    pub fn initialize(&mut self) -> ReplayReport {
        let mut report = ReplayReport::default();
        let records = match self.log.as_mut().map(DeltaLog::read_records) {
            None => return report,
            Some(Ok(records)) => records,
            Some(Err(e)) => {
                tracing::error!(error = %e, "Delta log unreadable, starting empty");
                report.failures.push(ReplayFailure {
                    record: None,
                    reason: e.to_string(),
                });
                return report;
            }
        };
        report.records = records.len();

        for (index, bytes) in records.iter().enumerate() {
            let delta = match delta_from_bytes(bytes) {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::warn!(record = index, error = %e, "Skipping undecodable delta");
                    report.failures.push(ReplayFailure {
                        record: Some(index),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let result = self.apply(delta, false);
            if result.is_success() {
                report.applied += 1;
            } else {
                tracing::warn!(record = index, reason = %result.message, "Replayed delta failed");
                report.failures.push(ReplayFailure {
                    record: Some(index),
                    reason: result.message,
                });
            }
        }

        tracing::info!(
            records = report.records,
            applied = report.applied,
            failed = report.failures.len(),
            entities = self.summary().total_entities,
            "Delta log replayed"
        );
        report
    }
}

fn entity_kind(gid: Gid) -> Result<DmsType, GridError> {
    gid.dms_type().ok_or(GridError::NotFound(gid))
}

// =============================================================================
// TESTS
// =============================================================================
