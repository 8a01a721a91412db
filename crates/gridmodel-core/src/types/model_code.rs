//! # Model Codes
//!
//! A `ModelCode` is the 64-bit metadata key of one class or one attribute slot.
//!
//! ```text
//! [inheritance path: 32][dms type: 16][attribute index: 8][attribute kind: 8]
//! ```
//!
//! The kind tag is derivable from the code alone, so a code is sufficient to
//! decode or default its value without a side lookup.

use super::GridError;
use crate::primitives::{
    MODEL_CODE_ATTRIBUTE_INDEX_MASK, MODEL_CODE_ATTRIBUTE_TYPE_MASK, MODEL_CODE_INHERITANCE_MASK,
    MODEL_CODE_TYPE_MASK, VECTOR_KIND_FLAG,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// PROPERTY TYPE
// =============================================================================

/// The attribute kind tag stored in the low byte of a property code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PropertyType {
    Empty = 0x00,
    Bool = 0x01,
    Byte = 0x02,
    Int32 = 0x03,
    Int64 = 0x04,
    Float = 0x05,
    Double = 0x06,
    String = 0x07,
    DateTime = 0x08,
    Reference = 0x09,
    Enum = 0x0A,
    BoolVector = 0x11,
    ByteVector = 0x12,
    Int32Vector = 0x13,
    Int64Vector = 0x14,
    FloatVector = 0x15,
    DoubleVector = 0x16,
    StringVector = 0x17,
    DateTimeVector = 0x18,
    ReferenceVector = 0x19,
    EnumVector = 0x1A,
}

impl PropertyType {
    const ALL: [PropertyType; 21] = [
        Self::Empty,
        Self::Bool,
        Self::Byte,
        Self::Int32,
        Self::Int64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::DateTime,
        Self::Reference,
        Self::Enum,
        Self::BoolVector,
        Self::ByteVector,
        Self::Int32Vector,
        Self::Int64Vector,
        Self::FloatVector,
        Self::DoubleVector,
        Self::StringVector,
        Self::DateTimeVector,
        Self::ReferenceVector,
        Self::EnumVector,
    ];

    /// Resolve a raw kind tag.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| *t as u8 == tag)
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_vector(self) -> bool {
        self.tag() & VECTOR_KIND_FLAG != 0
    }

    /// True for `Reference` and `ReferenceVector`.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Reference | Self::ReferenceVector)
    }
}

// =============================================================================
// MODEL CODE
// =============================================================================

/// Metadata key identifying one class or one attribute slot of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCode(pub u64);

impl ModelCode {
    // --- IdentifiedObject -----------------------------------------------------
    pub const IDOBJ: ModelCode = ModelCode(0x1000_0000_0000_0000);
    pub const IDOBJ_GID: ModelCode = ModelCode(0x1000_0000_0000_0104);
    pub const IDOBJ_ALIASNAME: ModelCode = ModelCode(0x1000_0000_0000_0207);
    pub const IDOBJ_MRID: ModelCode = ModelCode(0x1000_0000_0000_0307);
    pub const IDOBJ_NAME: ModelCode = ModelCode(0x1000_0000_0000_0407);

    // --- PowerSystemResource --------------------------------------------------
    pub const PSR: ModelCode = ModelCode(0x1100_0000_0000_0000);

    // --- Equipment ------------------------------------------------------------
    pub const EQUIPMENT: ModelCode = ModelCode(0x1110_0000_0000_0000);
    pub const EQUIPMENT_AGGREGATE: ModelCode = ModelCode(0x1110_0000_0000_0101);
    pub const EQUIPMENT_NORMALLYINSERVICE: ModelCode = ModelCode(0x1110_0000_0000_0201);

    // --- ConductingEquipment --------------------------------------------------
    pub const CONDEQ: ModelCode = ModelCode(0x1111_0000_0000_0000);
    pub const CONDEQ_BASVOLTAGE: ModelCode = ModelCode(0x1111_0000_0000_0109);
    pub const CONDEQ_TERMINALS: ModelCode = ModelCode(0x1111_0000_0000_0219);

    // --- BaseVoltage ----------------------------------------------------------
    pub const BASEVOLTAGE: ModelCode = ModelCode(0x1200_0000_0001_0000);
    pub const BASEVOLTAGE_CONDEQ: ModelCode = ModelCode(0x1200_0000_0001_0119);

    // --- Switch ---------------------------------------------------------------
    pub const SWITCH: ModelCode = ModelCode(0x1111_1000_0002_0000);
    pub const SWITCH_NORMALOPEN: ModelCode = ModelCode(0x1111_1000_0002_0101);
    pub const SWITCH_RATEDCURRENT: ModelCode = ModelCode(0x1111_1000_0002_0205);
    pub const SWITCH_RETAINED: ModelCode = ModelCode(0x1111_1000_0002_0301);
    pub const SWITCH_SWITCHONCOUNT: ModelCode = ModelCode(0x1111_1000_0002_0403);
    pub const SWITCH_SWITCHONDATE: ModelCode = ModelCode(0x1111_1000_0002_0508);

    // --- Terminal -------------------------------------------------------------
    pub const TERMINAL: ModelCode = ModelCode(0x1300_0000_0003_0000);
    pub const TERMINAL_CONDEQ: ModelCode = ModelCode(0x1300_0000_0003_0109);
    pub const TERMINAL_CONNNODE: ModelCode = ModelCode(0x1300_0000_0003_0209);

    // --- ConnectivityNode -----------------------------------------------------
    pub const CONNECTIVITYNODE: ModelCode = ModelCode(0x1400_0000_0004_0000);
    pub const CONNECTIVITYNODE_CONTAINER: ModelCode = ModelCode(0x1400_0000_0004_0109);
    pub const CONNECTIVITYNODE_TERMINALS: ModelCode = ModelCode(0x1400_0000_0004_0219);
    pub const CONNECTIVITYNODE_TOPONODE: ModelCode = ModelCode(0x1400_0000_0004_0309);

    // --- ConnectivityNodeContainer --------------------------------------------
    pub const CONNECTIVITYNODECONTAINER: ModelCode = ModelCode(0x1120_0000_0005_0000);
    pub const CONNNODECONTAINER_NODES: ModelCode = ModelCode(0x1120_0000_0005_0119);

    // --- TopologicalNode ------------------------------------------------------
    pub const TOPOLOGICALNODE: ModelCode = ModelCode(0x1500_0000_0006_0000);
    pub const TOPOLOGICALNODE_CONNNODES: ModelCode = ModelCode(0x1500_0000_0006_0119);

    /// Every named code with its schema name.
    pub const NAMED: [(ModelCode, &'static str); 35] = [
        (Self::IDOBJ, "IDOBJ"),
        (Self::IDOBJ_GID, "IDOBJ_GID"),
        (Self::IDOBJ_ALIASNAME, "IDOBJ_ALIASNAME"),
        (Self::IDOBJ_MRID, "IDOBJ_MRID"),
        (Self::IDOBJ_NAME, "IDOBJ_NAME"),
        (Self::PSR, "PSR"),
        (Self::EQUIPMENT, "EQUIPMENT"),
        (Self::EQUIPMENT_AGGREGATE, "EQUIPMENT_AGGREGATE"),
        (Self::EQUIPMENT_NORMALLYINSERVICE, "EQUIPMENT_NORMALLYINSERVICE"),
        (Self::CONDEQ, "CONDEQ"),
        (Self::CONDEQ_BASVOLTAGE, "CONDEQ_BASVOLTAGE"),
        (Self::CONDEQ_TERMINALS, "CONDEQ_TERMINALS"),
        (Self::BASEVOLTAGE, "BASEVOLTAGE"),
        (Self::BASEVOLTAGE_CONDEQ, "BASEVOLTAGE_CONDEQ"),
        (Self::SWITCH, "SWITCH"),
        (Self::SWITCH_NORMALOPEN, "SWITCH_NORMALOPEN"),
        (Self::SWITCH_RATEDCURRENT, "SWITCH_RATEDCURRENT"),
        (Self::SWITCH_RETAINED, "SWITCH_RETAINED"),
        (Self::SWITCH_SWITCHONCOUNT, "SWITCH_SWITCHONCOUNT"),
        (Self::SWITCH_SWITCHONDATE, "SWITCH_SWITCHONDATE"),
        (Self::TERMINAL, "TERMINAL"),
        (Self::TERMINAL_CONDEQ, "TERMINAL_CONDEQ"),
        (Self::TERMINAL_CONNNODE, "TERMINAL_CONNNODE"),
        (Self::CONNECTIVITYNODE, "CONNECTIVITYNODE"),
        (Self::CONNECTIVITYNODE_CONTAINER, "CONNECTIVITYNODE_CONTAINER"),
        (Self::CONNECTIVITYNODE_TERMINALS, "CONNECTIVITYNODE_TERMINALS"),
        (Self::CONNECTIVITYNODE_TOPONODE, "CONNECTIVITYNODE_TOPONODE"),
        (Self::CONNECTIVITYNODECONTAINER, "CONNECTIVITYNODECONTAINER"),
        (Self::CONNNODECONTAINER_NODES, "CONNNODECONTAINER_NODES"),
        (Self::TOPOLOGICALNODE, "TOPOLOGICALNODE"),
        (Self::TOPOLOGICALNODE_CONNNODES, "TOPOLOGICALNODE_CONNNODES"),
        (Self::IDOBJ_NAME, "NAME"),
        (Self::IDOBJ_MRID, "MRID"),
        (Self::IDOBJ_ALIASNAME, "ALIASNAME"),
        (Self::IDOBJ_GID, "GID"),
    ];

    /// The attribute kind encoded in the low byte, if the tag is known.
    #[must_use]
    pub fn property_type(self) -> Option<PropertyType> {
        PropertyType::from_tag((self.0 & MODEL_CODE_ATTRIBUTE_TYPE_MASK) as u8)
    }

    #[must_use]
    pub const fn attribute_index(self) -> u8 {
        ((self.0 & MODEL_CODE_ATTRIBUTE_INDEX_MASK) >> 8) as u8
    }

    /// DMS type of the defining concrete class; 0 for abstract classes.
    #[must_use]
    pub const fn type_code(self) -> u16 {
        ((self.0 & MODEL_CODE_TYPE_MASK) >> 16) as u16
    }

    #[must_use]
    pub const fn inheritance(self) -> u32 {
        ((self.0 & MODEL_CODE_INHERITANCE_MASK) >> 32) as u32
    }

    /// Class codes carry no attribute index and no kind tag.
    #[must_use]
    pub const fn is_class(self) -> bool {
        self.0 & (MODEL_CODE_ATTRIBUTE_INDEX_MASK | MODEL_CODE_ATTRIBUTE_TYPE_MASK) == 0
    }

    /// Schema name of a known code.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for ModelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:016x}", self.0),
        }
    }
}

impl FromStr for ModelCode {
    type Err = GridError;

    /// Accepts a schema name (`SWITCH_NORMALOPEN`) or a `0x`-prefixed code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u64::from_str_radix(hex, 16)
                .map(ModelCode)
                .map_err(|e| GridError::UnknownSchemaElement(format!("code '{}': {}", s, e)));
        }
        let wanted = s.to_ascii_uppercase();
        Self::NAMED
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(code, _)| *code)
            .ok_or_else(|| GridError::UnknownSchemaElement(format!("code '{}'", s)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
