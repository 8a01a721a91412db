//! # gridmodel-core
//!
//! The network model store for gridmodel - THE LOGIC.
//!
//! This crate implements a schema-driven object graph of power-network
//! entities (switches, terminals, nodes, base voltages, containers) linked by
//! bidirectional references and addressed by 64-bit GIDs that encode their
//! type.
//!
//! ## Layers
//!
//! - `types`, `schema`, `primitives` → identifiers, property codes, class lattice
//! - `property`, `entity`, `container` → typed values and entity storage
//! - `delta`, `formats` → change sets and their on-disk log
//! - `network_model`, `query`, `session` → store, cursors, exposed boundary
//! - `import` → external records to insert deltas
//!
//! ## Architectural Constraints
//!
//! - Single writer: every mutation goes through `NetworkModel::apply_delta`
//! - Deterministic: `BTreeMap` everywhere, scans are in GID order
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod container;
pub mod delta;
pub mod entity;
pub mod formats;
pub mod import;
pub mod network_model;
pub mod primitives;
pub mod property;
pub mod query;
pub mod schema;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{DmsType, Gid, GridError, ModelCode, PropertyType};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use container::Container;
pub use delta::{
    Delta, DeltaOpType, DeltaOperation, ResourceDescription, ResultType, UpdateResult,
};
pub use entity::{Entity, ReferenceDirection};
pub use import::{ImportContext, ImportOutcome, ImportRecord, ImportReport, Relationship};
pub use network_model::{ModelSummary, NetworkModel, ReplayFailure, ReplayReport};
pub use property::{Property, PropertyValue};
pub use query::{Association, ResourceCursor};
pub use session::{CursorId, GdaSession};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{DeltaHeader, DeltaLog, delta_from_bytes, delta_to_bytes};
