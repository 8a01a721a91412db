//! # Typed Property
//!
//! A `(ModelCode, PropertyValue)` pair. The value's kind always equals the
//! kind tag of the code; constructors enforce it and accessors check it.

use crate::types::{Gid, GridError, ModelCode, PropertyType};
use serde::{Deserialize, Serialize};

// =============================================================================
// PROPERTY VALUE
// =============================================================================

/// A tagged value; exactly one kind is populated.
///
/// `DateTime` holds milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(i64),
    Reference(Gid),
    Enum(i16),
    BoolVector(Vec<bool>),
    ByteVector(Vec<u8>),
    Int32Vector(Vec<i32>),
    Int64Vector(Vec<i64>),
    FloatVector(Vec<f32>),
    DoubleVector(Vec<f64>),
    StringVector(Vec<String>),
    DateTimeVector(Vec<i64>),
    ReferenceVector(Vec<Gid>),
    EnumVector(Vec<i16>),
}

impl PropertyValue {
    /// Default value of a kind: false, zero, empty string, epoch, null
    /// reference or empty vector. `Empty` has no value.
    #[must_use]
    pub fn default_for(kind: PropertyType) -> Option<Self> {
        let value = match kind {
            PropertyType::Empty => return None,
            PropertyType::Bool => Self::Bool(false),
            PropertyType::Byte => Self::Byte(0),
            PropertyType::Int32 => Self::Int32(0),
            PropertyType::Int64 => Self::Int64(0),
            PropertyType::Float => Self::Float(0.0),
            PropertyType::Double => Self::Double(0.0),
            PropertyType::String => Self::String(String::new()),
            PropertyType::DateTime => Self::DateTime(0),
            PropertyType::Reference => Self::Reference(Gid::NONE),
            PropertyType::Enum => Self::Enum(0),
            PropertyType::BoolVector => Self::BoolVector(Vec::new()),
            PropertyType::ByteVector => Self::ByteVector(Vec::new()),
            PropertyType::Int32Vector => Self::Int32Vector(Vec::new()),
            PropertyType::Int64Vector => Self::Int64Vector(Vec::new()),
            PropertyType::FloatVector => Self::FloatVector(Vec::new()),
            PropertyType::DoubleVector => Self::DoubleVector(Vec::new()),
            PropertyType::StringVector => Self::StringVector(Vec::new()),
            PropertyType::DateTimeVector => Self::DateTimeVector(Vec::new()),
            PropertyType::ReferenceVector => Self::ReferenceVector(Vec::new()),
            PropertyType::EnumVector => Self::EnumVector(Vec::new()),
        };
        Some(value)
    }

    /// The kind tag of the held value.
    #[must_use]
    pub const fn kind(&self) -> PropertyType {
        match self {
            Self::Bool(_) => PropertyType::Bool,
            Self::Byte(_) => PropertyType::Byte,
            Self::Int32(_) => PropertyType::Int32,
            Self::Int64(_) => PropertyType::Int64,
            Self::Float(_) => PropertyType::Float,
            Self::Double(_) => PropertyType::Double,
            Self::String(_) => PropertyType::String,
            Self::DateTime(_) => PropertyType::DateTime,
            Self::Reference(_) => PropertyType::Reference,
            Self::Enum(_) => PropertyType::Enum,
            Self::BoolVector(_) => PropertyType::BoolVector,
            Self::ByteVector(_) => PropertyType::ByteVector,
            Self::Int32Vector(_) => PropertyType::Int32Vector,
            Self::Int64Vector(_) => PropertyType::Int64Vector,
            Self::FloatVector(_) => PropertyType::FloatVector,
            Self::DoubleVector(_) => PropertyType::DoubleVector,
            Self::StringVector(_) => PropertyType::StringVector,
            Self::DateTimeVector(_) => PropertyType::DateTimeVector,
            Self::ReferenceVector(_) => PropertyType::ReferenceVector,
            Self::EnumVector(_) => PropertyType::EnumVector,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Gid> for PropertyValue {
    fn from(v: Gid) -> Self {
        Self::Reference(v)
    }
}

impl From<Vec<Gid>> for PropertyValue {
    fn from(v: Vec<Gid>) -> Self {
        Self::ReferenceVector(v)
    }
}

// =============================================================================
// PROPERTY
// =============================================================================

/// One attribute slot of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: ModelCode,
    pub value: PropertyValue,
}

macro_rules! copy_accessor {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<$ty, GridError> {
            match &self.value {
                PropertyValue::$variant(v) => Ok(*v),
                other => Err(GridError::WrongAccessor {
                    held: other.kind(),
                    requested: PropertyType::$variant,
                }),
            }
        }
    };
}

macro_rules! slice_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<&[$ty], GridError> {
            match &self.value {
                PropertyValue::$variant(v) => Ok(v.as_slice()),
                other => Err(GridError::WrongAccessor {
                    held: other.kind(),
                    requested: PropertyType::$variant,
                }),
            }
        }
    };
}

impl Property {
    /// A property holding the default value of its code's kind.
    pub fn new(id: ModelCode) -> Result<Self, GridError> {
        let value = id
            .property_type()
            .and_then(PropertyValue::default_for)
            .ok_or_else(|| GridError::UnknownSchemaElement(format!("kind tag of {}", id)))?;
        Ok(Self { id, value })
    }

    /// A property holding `value`; the value's kind must match the code.
    pub fn with_value(id: ModelCode, value: impl Into<PropertyValue>) -> Result<Self, GridError> {
        let value = value.into();
        let expected = id
            .property_type()
            .ok_or_else(|| GridError::UnknownSchemaElement(format!("kind tag of {}", id)))?;
        if value.kind() != expected {
            return Err(GridError::TypeMismatch {
                code: id,
                expected,
                found: value.kind(),
            });
        }
        Ok(Self { id, value })
    }

    #[must_use]
    pub const fn kind(&self) -> PropertyType {
        self.value.kind()
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.kind().is_reference()
    }

    copy_accessor!(as_bool, Bool, bool);
    copy_accessor!(as_byte, Byte, u8);
    copy_accessor!(as_int32, Int32, i32);
    copy_accessor!(as_int64, Int64, i64);
    copy_accessor!(as_float, Float, f32);
    copy_accessor!(as_double, Double, f64);
    copy_accessor!(
        /// Milliseconds since the Unix epoch.
        as_date_time,
        DateTime,
        i64
    );
    copy_accessor!(as_reference, Reference, Gid);
    copy_accessor!(as_enum, Enum, i16);

    pub fn as_string(&self) -> Result<&str, GridError> {
        match &self.value {
            PropertyValue::String(v) => Ok(v.as_str()),
            other => Err(GridError::WrongAccessor {
                held: other.kind(),
                requested: PropertyType::String,
            }),
        }
    }

    slice_accessor!(as_bools, BoolVector, bool);
    slice_accessor!(as_bytes, ByteVector, u8);
    slice_accessor!(as_int32s, Int32Vector, i32);
    slice_accessor!(as_int64s, Int64Vector, i64);
    slice_accessor!(as_floats, FloatVector, f32);
    slice_accessor!(as_doubles, DoubleVector, f64);
    slice_accessor!(as_strings, StringVector, String);
    slice_accessor!(as_date_times, DateTimeVector, i64);
    slice_accessor!(as_references, ReferenceVector, Gid);
    slice_accessor!(as_enums, EnumVector, i16);

    /// Non-null GIDs held by a reference kind; empty for every other kind.
    #[must_use]
    pub fn referenced_gids(&self) -> Vec<Gid> {
        match &self.value {
            PropertyValue::Reference(gid) if !gid.is_none() => vec![*gid],
            PropertyValue::ReferenceVector(gids) => {
                gids.iter().copied().filter(|g| !g.is_none()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Rewrite every GID held by a reference kind.
    pub fn map_references(&mut self, mut f: impl FnMut(Gid) -> Gid) {
        match &mut self.value {
            PropertyValue::Reference(gid) => *gid = f(*gid),
            PropertyValue::ReferenceVector(gids) => {
                for gid in gids.iter_mut() {
                    *gid = f(*gid);
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DmsType;

    #[test]
    fn new_holds_default_of_kind() {
        let name = Property::new(ModelCode::IDOBJ_NAME).expect("name");
        assert_eq!(name.as_string().expect("string"), "");

        let count = Property::new(ModelCode::SWITCH_SWITCHONCOUNT).expect("count");
        assert_eq!(count.as_int32().expect("i32"), 0);

        let bv = Property::new(ModelCode::CONDEQ_BASVOLTAGE).expect("ref");
        assert_eq!(bv.as_reference().expect("ref"), Gid::NONE);

        let terminals = Property::new(ModelCode::CONDEQ_TERMINALS).expect("refs");
        assert!(terminals.as_references().expect("refs").is_empty());
    }

    #[test]
    fn unknown_kind_tag_rejected() {
        assert!(matches!(
            Property::new(ModelCode(0x1000_0000_0000_00EE)),
            Err(GridError::UnknownSchemaElement(_))
        ));
        // Class codes carry the Empty tag.
        assert!(Property::new(ModelCode::SWITCH).is_err());
    }

    #[test]
    fn with_value_checks_kind() {
        let ok = Property::with_value(ModelCode::SWITCH_NORMALOPEN, true).expect("bool");
        assert!(ok.as_bool().expect("bool"));

        let err = Property::with_value(ModelCode::SWITCH_NORMALOPEN, 5_i32);
        assert!(matches!(
            err,
            Err(GridError::TypeMismatch {
                expected: PropertyType::Bool,
                found: PropertyType::Int32,
                ..
            })
        ));
    }

    #[test]
    fn wrong_accessor_fails() {
        let p = Property::with_value(ModelCode::IDOBJ_MRID, "SW_1").expect("string");
        assert!(matches!(
            p.as_int64(),
            Err(GridError::WrongAccessor {
                held: PropertyType::String,
                requested: PropertyType::Int64
            })
        ));
        assert!(p.as_references().is_err());
    }

    #[test]
    fn referenced_gids_skip_null() {
        let a = Gid::of(DmsType::Terminal, 1);
        let b = Gid::of(DmsType::Terminal, 2);
        let p = Property::with_value(ModelCode::CONDEQ_TERMINALS, vec![a, Gid::NONE, b])
            .expect("refs");
        assert_eq!(p.referenced_gids(), vec![a, b]);

        let null = Property::new(ModelCode::TERMINAL_CONDEQ).expect("ref");
        assert!(null.referenced_gids().is_empty());

        let scalar = Property::new(ModelCode::IDOBJ_NAME).expect("name");
        assert!(scalar.referenced_gids().is_empty());
    }

    #[test]
    fn map_references_rewrites() {
        let tmp = Gid::of(DmsType::BaseVoltage, -1);
        let real = Gid::of(DmsType::BaseVoltage, 1);
        let mut p = Property::with_value(ModelCode::CONDEQ_BASVOLTAGE, tmp).expect("ref");
        p.map_references(|g| if g == tmp { real } else { g });
        assert_eq!(p.as_reference().expect("ref"), real);
    }
}
