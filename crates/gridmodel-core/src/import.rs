//! # Import Context
//!
//! Turns externally identified records (e.g. parsed CIM objects) into one
//! insert delta with temporary GIDs.
//!
//! Records are converted kind by kind in `DmsType::CONCRETE_IN_INSERT_ORDER`,
//! so a relationship can name any record of an earlier kind. A record that
//! fails conversion is reported and left out; the rest still go through.

use crate::delta::{Delta, ResourceDescription};
use crate::property::Property;
use crate::schema;
use crate::types::{DmsType, Gid, GridError, ModelCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// INPUT
// =============================================================================

/// A forward reference to another record, by its external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub property: ModelCode,
    pub target: String,
}

/// One object to import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub kind: DmsType,
    pub external_id: String,
    /// Non-reference settable properties.
    #[serde(default)]
    pub attributes: Vec<Property>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportOutcome {
    /// Converted; holds the temporary GID.
    Converted(Gid),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub kind: DmsType,
    pub external_id: String,
    pub outcome: ImportOutcome,
}

/// Per-record result of [`ImportContext::import_records`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub entries: Vec<ImportEntry>,
}

impl ImportReport {
    #[must_use]
    pub fn converted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ImportOutcome::Converted(_)))
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries.len() - self.converted()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Temporary-GID allocator, external id map and the delta under construction.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    last_index: BTreeMap<DmsType, i32>,
    mapping: BTreeMap<String, Gid>,
    delta: Delta,
}

impl ImportContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next temporary GID of `kind`: indices -1, -2, ... per kind.
    pub fn allocate_gid(&mut self, kind: DmsType) -> Result<Gid, GridError> {
        if !kind.is_concrete() {
            return Err(GridError::UnsupportedType(kind.code()));
        }
        let last = self.last_index.entry(kind).or_insert(0);
        let index = last
            .checked_sub(1)
            .ok_or(GridError::IndexExhausted(kind.code()))?;
        *last = index;
        Ok(Gid::of(kind, index))
    }

    pub fn record_id_mapping(&mut self, external_id: &str, gid: Gid) -> Result<(), GridError> {
        if self.mapping.contains_key(external_id) {
            return Err(GridError::DuplicateExternalId(external_id.to_string()));
        }
        self.mapping.insert(external_id.to_string(), gid);
        Ok(())
    }

    #[must_use]
    pub fn mapped_gid(&self, external_id: &str) -> Option<Gid> {
        self.mapping.get(external_id).copied()
    }

    /// The delta built so far.
    #[must_use]
    pub const fn delta(&self) -> &Delta {
        &self.delta
    }

    /// Hand the built delta to the caller, typically for `apply_delta`.
    #[must_use]
    pub fn into_delta(self) -> Delta {
        self.delta
    }

    /// Convert records into insert operations.
    pub fn import_records(&mut self, records: Vec<ImportRecord>) -> ImportReport {
        tracing::info!(records = records.len(), "Importing records");
        let mut report = ImportReport::default();

        let mut ordered = records;
        ordered.sort_by_key(|r| r.kind.insert_rank());

        for record in ordered {
            let outcome = match self.convert(&record) {
                Ok(gid) => ImportOutcome::Converted(gid),
                Err(e) => {
                    tracing::warn!(
                        external_id = %record.external_id,
                        kind = %record.kind,
                        error = %e,
                        "Record not converted"
                    );
                    ImportOutcome::Failed(e.to_string())
                }
            };
            report.entries.push(ImportEntry {
                kind: record.kind,
                external_id: record.external_id,
                outcome,
            });
        }

        tracing::info!(
            converted = report.converted(),
            failed = report.failed(),
            "Import finished"
        );
        report
    }

    fn convert(&mut self, record: &ImportRecord) -> Result<Gid, GridError> {
        if !record.kind.is_concrete() {
            return Err(GridError::UnsupportedType(record.kind.code()));
        }
        if self.mapping.contains_key(&record.external_id) {
            return Err(GridError::DuplicateExternalId(record.external_id.clone()));
        }

        let mut properties = Vec::with_capacity(record.attributes.len() + record.relationships.len());
        for attribute in &record.attributes {
            check_attribute(record.kind, attribute)?;
            properties.push(attribute.clone());
        }
        for relationship in &record.relationships {
            let code = relationship.property;
            if !schema::applies_to(record.kind, code) || schema::inverse_of(code).is_none() {
                return Err(GridError::UnknownSchemaElement(format!(
                    "relationship {} of {}",
                    code, record.kind
                )));
            }
            let target = self.mapped_gid(&relationship.target).ok_or_else(|| {
                GridError::UnknownSchemaElement(format!(
                    "unmapped external id '{}'",
                    relationship.target
                ))
            })?;
            properties.push(Property::with_value(code, target)?);
        }

        let gid = self.allocate_gid(record.kind)?;
        self.record_id_mapping(&record.external_id, gid)?;
        self.delta
            .add_insert(ResourceDescription::with_properties(gid, properties));
        Ok(gid)
    }
}

/// Attributes must be settable, non-reference properties of the kind.
fn check_attribute(kind: DmsType, property: &Property) -> Result<(), GridError> {
    let code = property.id;
    if !schema::applies_to(kind, code) {
        return Err(GridError::UnknownSchemaElement(format!(
            "property {} of {}",
            code, kind
        )));
    }
    if !schema::is_settable(code) || property.is_reference() {
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
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: DmsType, id: &str) -> ImportRecord {
        ImportRecord {
            kind,
            external_id: id.to_string(),
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    #[test]
    fn allocation_is_per_kind() {
        let mut ctx = ImportContext::new();
        assert_eq!(ctx.allocate_gid(DmsType::Switch).expect("gid").index(), -1);
        assert_eq!(ctx.allocate_gid(DmsType::Switch).expect("gid").index(), -2);
        assert_eq!(ctx.allocate_gid(DmsType::Terminal).expect("gid").index(), -1);
        assert!(ctx.allocate_gid(DmsType::Equipment).is_err());
    }

    #[test]
    fn allocation_stops_at_min() {
        let mut ctx = ImportContext::new();
        ctx.last_index.insert(DmsType::Switch, i32::MIN);
        assert!(matches!(
            ctx.allocate_gid(DmsType::Switch),
            Err(GridError::IndexExhausted(code)) if code == DmsType::Switch.code()
        ));
        assert_eq!(ctx.allocate_gid(DmsType::Terminal).expect("gid").index(), -1);
    }

    #[test]
    fn duplicate_mapping() {
        let mut ctx = ImportContext::new();
        let gid = ctx.allocate_gid(DmsType::BaseVoltage).expect("gid");
        ctx.record_id_mapping("BV_1", gid).expect("map");
        assert_eq!(ctx.mapped_gid("BV_1"), Some(gid));
        assert!(matches!(
            ctx.record_id_mapping("BV_1", gid),
            Err(GridError::DuplicateExternalId(_))
        ));
    }

    #[test]
    fn records_converted_in_insert_order() {
        let mut ctx = ImportContext::new();
        let mut sw = record(DmsType::Switch, "SW_1");
        sw.relationships.push(Relationship {
            property: ModelCode::CONDEQ_BASVOLTAGE,
            target: "BV_1".to_string(),
        });
        sw.attributes
            .push(Property::with_value(ModelCode::SWITCH_NORMALOPEN, true).expect("p"));
        // Switch listed first, still resolved after the base voltage.
        let report = ctx.import_records(vec![sw, record(DmsType::BaseVoltage, "BV_1")]);

        assert!(report.is_success());
        assert_eq!(report.entries[0].external_id, "BV_1");
        let delta = ctx.into_delta();
        assert_eq!(delta.len(), 2);
        let switch_rd = &delta.operations[1].description;
        assert_eq!(
            switch_rd
                .property(ModelCode::CONDEQ_BASVOLTAGE)
                .expect("ref")
                .as_reference()
                .expect("gid"),
            Gid::of(DmsType::BaseVoltage, -1)
        );
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let mut ctx = ImportContext::new();
        let mut dangling = record(DmsType::Terminal, "T_1");
        dangling.relationships.push(Relationship {
            property: ModelCode::TERMINAL_CONNNODE,
            target: "CN_missing".to_string(),
        });
        let mut inverse = record(DmsType::BaseVoltage, "BV_2");
        inverse
            .attributes
            .push(Property::new(ModelCode::BASEVOLTAGE_CONDEQ).expect("p"));

        let report = ctx.import_records(vec![
            dangling,
            inverse,
            record(DmsType::TopologicalNode, "TN_1"),
            record(DmsType::TopologicalNode, "TN_1"),
        ]);
        assert_eq!(report.converted(), 1);
        assert_eq!(report.failed(), 3);
        assert_eq!(ctx.delta().len(), 1);
        // Failed records consume no index.
        assert_eq!(
            ctx.allocate_gid(DmsType::Terminal).expect("gid").index(),
            -1
        );
    }
}
