//! # Core Type Definitions
//!
//! This module contains the identity types of the network model:
//! - Global identifiers (`Gid`) and DMS type codes (`DmsType`)
//! - Property metadata (`ModelCode`, `PropertyType`), see [`model_code`]
//! - Error types (`GridError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types:
//! - Are plain integers with a fixed bit layout (see `primitives`)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Decompose with pure, total functions (no failure mode)

pub mod model_code;

pub use model_code::{ModelCode, PropertyType};

use crate::primitives::{GID_INDEX_MASK, GID_SYSTEM_SHIFT, GID_TYPE_MASK, GID_TYPE_SHIFT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// DMS TYPE
// =============================================================================

/// The concrete or abstract class of an entity, as encoded in bits 32..48 of its GID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DmsType {
    BaseVoltage = 0x0001,
    Switch = 0x0002,
    Terminal = 0x0003,
    ConnectivityNode = 0x0004,
    ConnectivityNodeContainer = 0x0005,
    TopologicalNode = 0x0006,
    IdentifiedObject = 0x0007,
    PowerSystemResource = 0x0008,
    Equipment = 0x0009,
    ConductingEquipment = 0x000A,
}

impl DmsType {
    /// Every known type, concrete first.
    pub const ALL: [DmsType; 10] = [
        Self::BaseVoltage,
        Self::Switch,
        Self::Terminal,
        Self::ConnectivityNode,
        Self::ConnectivityNodeContainer,
        Self::TopologicalNode,
        Self::IdentifiedObject,
        Self::PowerSystemResource,
        Self::Equipment,
        Self::ConductingEquipment,
    ];

    /// Concrete types ordered so that referenced kinds come before the kinds
    /// that point at them.
    pub const CONCRETE_IN_INSERT_ORDER: [DmsType; 6] = [
        Self::BaseVoltage,
        Self::ConnectivityNodeContainer,
        Self::TopologicalNode,
        Self::ConnectivityNode,
        Self::Switch,
        Self::Terminal,
    ];

    /// Resolve a raw type code.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The raw 16-bit type code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// True for kinds that can be instantiated.
    #[must_use]
    pub const fn is_concrete(self) -> bool {
        matches!(
            self,
            Self::BaseVoltage
                | Self::Switch
                | Self::Terminal
                | Self::ConnectivityNode
                | Self::ConnectivityNodeContainer
                | Self::TopologicalNode
        )
    }

    /// Position in [`Self::CONCRETE_IN_INSERT_ORDER`]; abstract kinds sort last.
    #[must_use]
    pub fn insert_rank(self) -> usize {
        Self::CONCRETE_IN_INSERT_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or(Self::CONCRETE_IN_INSERT_ORDER.len())
    }

    /// Upper-case schema name, e.g. `CONNECTIVITYNODE`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseVoltage => "BASEVOLTAGE",
            Self::Switch => "SWITCH",
            Self::Terminal => "TERMINAL",
            Self::ConnectivityNode => "CONNECTIVITYNODE",
            Self::ConnectivityNodeContainer => "CONNECTIVITYNODECONTAINER",
            Self::TopologicalNode => "TOPOLOGICALNODE",
            Self::IdentifiedObject => "IDOBJ",
            Self::PowerSystemResource => "PSR",
            Self::Equipment => "EQUIPMENT",
            Self::ConductingEquipment => "CONDEQ",
        }
    }
}

impl fmt::Display for DmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DmsType {
    type Err = GridError;

    /// Accepts the schema name (`SWITCH`) or the variant name (`Switch`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == wanted || format!("{t:?}").to_ascii_uppercase() == wanted)
            .ok_or_else(|| GridError::UnknownSchemaElement(format!("type '{}'", s)))
    }
}

// =============================================================================
// GLOBAL IDENTIFIER
// =============================================================================

/// Global identifier of an entity.
///
/// Layout: `[system: 16][type: 16][index: 32 (signed)]`.
/// A zero GID is the null reference. Negative indices are temporary ids
/// that only live inside an uncommitted delta.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Gid(pub u64);

impl Gid {
    /// The null reference.
    pub const NONE: Gid = Gid(0);

    /// Pack the three GID segments.
    #[must_use]
    pub const fn new(system: u16, type_code: u16, index: i32) -> Self {
        Self(
            ((system as u64) << GID_SYSTEM_SHIFT)
                | ((type_code as u64) << GID_TYPE_SHIFT)
                | (index as u32 as u64),
        )
    }

    /// GID of the given kind in system 0.
    #[must_use]
    pub const fn of(kind: DmsType, index: i32) -> Self {
        Self::new(0, kind.code(), index)
    }

    /// The type code, recoverable by masking regardless of the other segments.
    #[must_use]
    pub const fn type_code(self) -> u16 {
        ((self.0 >> GID_TYPE_SHIFT) & GID_TYPE_MASK) as u16
    }

    /// The signed per-type index.
    #[must_use]
    pub const fn index(self) -> i32 {
        (self.0 & GID_INDEX_MASK) as u32 as i32
    }

    /// The reserved system segment.
    #[must_use]
    pub const fn system(self) -> u16 {
        (self.0 >> GID_SYSTEM_SHIFT) as u16
    }

    /// The DMS type, if the type code is known.
    #[must_use]
    pub fn dms_type(self) -> Option<DmsType> {
        DmsType::from_code(self.type_code())
    }

    /// Same system and type, different index.
    #[must_use]
    pub const fn with_index(self, index: i32) -> Self {
        Self::new(self.system(), self.type_code(), index)
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True for client-chosen ids awaiting resolution at commit.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        self.index() < 0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl FromStr for Gid {
    type Err = GridError;

    /// Parses `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(Gid)
            .map_err(|e| GridError::DeserializationError(format!("invalid GID '{}': {}", s, e)))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the network model.
///
/// - No silent failures
/// - Use `Result<T, GridError>` for fallible operations
/// - The CORE should never panic; all errors must be recoverable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// A type or property code is not part of the schema.
    #[error("Unknown schema element: {0}")]
    UnknownSchemaElement(String),

    /// A value's kind disagrees with the kind tag of its property code.
    #[error("Type mismatch for {code}: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        code: ModelCode,
        expected: PropertyType,
        found: PropertyType,
    },

    /// A typed accessor was used on a value of another kind.
    #[error("Wrong accessor: value holds {held:?}, requested {requested:?}")]
    WrongAccessor {
        held: PropertyType,
        requested: PropertyType,
    },

    /// The GID names an abstract or unregistered type.
    #[error("Unsupported entity type: 0x{0:04x}")]
    UnsupportedType(u16),

    /// The GID is already in use.
    #[error("Entity {0} already exists")]
    DuplicateEntity(Gid),

    /// The GID is unknown to the store.
    #[error("Entity {0} does not exist")]
    NotFound(Gid),

    /// The property does not apply to the entity's kind.
    #[error("Entity {gid} has no property {code}")]
    UnknownProperty { gid: Gid, code: ModelCode },

    /// The property is an inverse or derived slot.
    #[error("Property {0} is not settable")]
    NotSettable(ModelCode),

    /// Delete refused because other entities still point at this one.
    #[error("Entity {0} is referenced and cannot be deleted")]
    EntityInUse(Gid),

    /// A temporary id is used without an insert operation that defines it.
    #[error("Temporary id {0} has no matching insert operation")]
    UnresolvedTemporaryId(Gid),

    /// An external (import) id was mapped twice.
    #[error("External id '{0}' is already mapped")]
    DuplicateExternalId(String),

    /// No open cursor has this handle.
    #[error("Cursor {0} not found")]
    CursorNotFound(u32),

    /// The cursor was closed.
    #[error("Cursor is closed")]
    CursorClosed,

    /// Every positive index of the type has been handed out.
    #[error("Index space exhausted for type 0x{0:04x}")]
    IndexExhausted(u16),

    /// Every cursor handle of the session has been handed out.
    #[error("Cursor handles exhausted")]
    CursorsExhausted,

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The delta log does not follow the record layout.
    #[error("Corrupt delta log: {0}")]
    CorruptLog(String),
}

// =============================================================================
// TESTS
// =============================================================================
