//! # Schema Registry
//!
//! The fixed class lattice of the network model and the property codes each
//! class owns.
//!
//! ```text
//! IdentifiedObject
//!   PowerSystemResource
//!     Equipment
//!       ConductingEquipment
//!         Switch
//!     ConnectivityNodeContainer
//!   BaseVoltage
//!   Terminal
//!   ConnectivityNode
//!   TopologicalNode
//! ```
//!
//! Every lookup is a pure function over static tables.

use crate::types::{DmsType, GridError, ModelCode, PropertyType};

// =============================================================================
// STATIC TABLES
// =============================================================================

/// Forward reference code and the inverse collection it maintains on the target.
const INVERSE_PAIRS: [(ModelCode, ModelCode); 5] = [
    (ModelCode::CONDEQ_BASVOLTAGE, ModelCode::BASEVOLTAGE_CONDEQ),
    (ModelCode::TERMINAL_CONDEQ, ModelCode::CONDEQ_TERMINALS),
    (
        ModelCode::TERMINAL_CONNNODE,
        ModelCode::CONNECTIVITYNODE_TERMINALS,
    ),
    (
        ModelCode::CONNECTIVITYNODE_CONTAINER,
        ModelCode::CONNNODECONTAINER_NODES,
    ),
    (
        ModelCode::CONNECTIVITYNODE_TOPONODE,
        ModelCode::TOPOLOGICALNODE_CONNNODES,
    ),
];

/// Properties declared directly on a class, in attribute-index order.
fn own_properties(kind: DmsType) -> &'static [ModelCode] {
    match kind {
        DmsType::IdentifiedObject => &[
            ModelCode::IDOBJ_GID,
            ModelCode::IDOBJ_ALIASNAME,
            ModelCode::IDOBJ_MRID,
            ModelCode::IDOBJ_NAME,
        ],
        DmsType::PowerSystemResource => &[],
        DmsType::Equipment => &[
            ModelCode::EQUIPMENT_AGGREGATE,
            ModelCode::EQUIPMENT_NORMALLYINSERVICE,
        ],
        DmsType::ConductingEquipment => &[ModelCode::CONDEQ_BASVOLTAGE, ModelCode::CONDEQ_TERMINALS],
        DmsType::Switch => &[
            ModelCode::SWITCH_NORMALOPEN,
            ModelCode::SWITCH_RATEDCURRENT,
            ModelCode::SWITCH_RETAINED,
            ModelCode::SWITCH_SWITCHONCOUNT,
            ModelCode::SWITCH_SWITCHONDATE,
        ],
        DmsType::ConnectivityNodeContainer => &[ModelCode::CONNNODECONTAINER_NODES],
        DmsType::BaseVoltage => &[ModelCode::BASEVOLTAGE_CONDEQ],
        DmsType::Terminal => &[ModelCode::TERMINAL_CONDEQ, ModelCode::TERMINAL_CONNNODE],
        DmsType::ConnectivityNode => &[
            ModelCode::CONNECTIVITYNODE_CONTAINER,
            ModelCode::CONNECTIVITYNODE_TERMINALS,
            ModelCode::CONNECTIVITYNODE_TOPONODE,
        ],
        DmsType::TopologicalNode => &[ModelCode::TOPOLOGICALNODE_CONNNODES],
    }
}

// =============================================================================
// CLASS LATTICE
// =============================================================================

/// Direct superclass; `None` only for IdentifiedObject.
#[must_use]
pub fn parent_of(kind: DmsType) -> Option<DmsType> {
    match kind {
        DmsType::IdentifiedObject => None,
        DmsType::PowerSystemResource
        | DmsType::BaseVoltage
        | DmsType::Terminal
        | DmsType::ConnectivityNode
        | DmsType::TopologicalNode => Some(DmsType::IdentifiedObject),
        DmsType::Equipment | DmsType::ConnectivityNodeContainer => {
            Some(DmsType::PowerSystemResource)
        }
        DmsType::ConductingEquipment => Some(DmsType::Equipment),
        DmsType::Switch => Some(DmsType::ConductingEquipment),
    }
}

/// The chain from IdentifiedObject down to `kind`, inclusive.
#[must_use]
pub fn lineage(kind: DmsType) -> Vec<DmsType> {
    let mut chain = vec![kind];
    let mut current = kind;
    while let Some(parent) = parent_of(current) {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    chain
}

/// True when `kind` is `ancestor` or derives from it.
#[must_use]
pub fn is_a(kind: DmsType, ancestor: DmsType) -> bool {
    lineage(kind).contains(&ancestor)
}

/// The class code of a kind.
#[must_use]
pub const fn model_code_of(kind: DmsType) -> ModelCode {
    match kind {
        DmsType::IdentifiedObject => ModelCode::IDOBJ,
        DmsType::PowerSystemResource => ModelCode::PSR,
        DmsType::Equipment => ModelCode::EQUIPMENT,
        DmsType::ConductingEquipment => ModelCode::CONDEQ,
        DmsType::Switch => ModelCode::SWITCH,
        DmsType::ConnectivityNodeContainer => ModelCode::CONNECTIVITYNODECONTAINER,
        DmsType::BaseVoltage => ModelCode::BASEVOLTAGE,
        DmsType::Terminal => ModelCode::TERMINAL,
        DmsType::ConnectivityNode => ModelCode::CONNECTIVITYNODE,
        DmsType::TopologicalNode => ModelCode::TOPOLOGICALNODE,
    }
}

/// Inverse of [`model_code_of`]: the kind named by a class code.
pub fn type_from_model_code(code: ModelCode) -> Result<DmsType, GridError> {
    DmsType::ALL
        .into_iter()
        .find(|kind| model_code_of(*kind) == code)
        .ok_or_else(|| GridError::UnknownSchemaElement(format!("class code {}", code)))
}

// =============================================================================
// PROPERTIES
// =============================================================================

/// Own and inherited property codes of a kind, ancestors first.
#[must_use]
pub fn properties_of(kind: DmsType) -> Vec<ModelCode> {
    lineage(kind)
        .into_iter()
        .flat_map(|level| own_properties(level).iter().copied())
        .collect()
}

/// The subset of [`properties_of`] a client may assign.
#[must_use]
pub fn settable_properties_of(kind: DmsType) -> Vec<ModelCode> {
    properties_of(kind)
        .into_iter()
        .filter(|code| is_settable(*code))
        .collect()
}

/// True when `code` is a property of `kind` or one of its ancestors.
#[must_use]
pub fn applies_to(kind: DmsType, code: ModelCode) -> bool {
    lineage(kind)
        .into_iter()
        .any(|level| own_properties(level).contains(&code))
}

/// The class that declares a property code.
pub fn class_of(code: ModelCode) -> Result<DmsType, GridError> {
    DmsType::ALL
        .into_iter()
        .find(|kind| own_properties(*kind).contains(&code))
        .ok_or_else(|| GridError::UnknownSchemaElement(format!("property {}", code)))
}

/// The value kind of a known property code.
pub fn kind_of(code: ModelCode) -> Result<PropertyType, GridError> {
    class_of(code)?;
    code.property_type()
        .ok_or_else(|| GridError::UnknownSchemaElement(format!("kind tag of {}", code)))
}

/// GID and inverse collections are maintained by the store.
#[must_use]
pub fn is_settable(code: ModelCode) -> bool {
    class_of(code).is_ok() && code != ModelCode::IDOBJ_GID && !is_inverse(code)
}

/// True for inverse reference collections.
#[must_use]
pub fn is_inverse(code: ModelCode) -> bool {
    INVERSE_PAIRS.iter().any(|(_, inverse)| *inverse == code)
}

/// The inverse collection a forward reference code maintains.
#[must_use]
pub fn inverse_of(forward: ModelCode) -> Option<ModelCode> {
    INVERSE_PAIRS
        .iter()
        .find(|(fwd, _)| *fwd == forward)
        .map(|(_, inverse)| *inverse)
}

/// Forward reference codes of a kind (settable references only).
#[must_use]
pub fn forward_references_of(kind: DmsType) -> Vec<ModelCode> {
    properties_of(kind)
        .into_iter()
        .filter(|code| inverse_of(*code).is_some())
        .collect()
}

/// Kind that a forward reference is allowed to point at.
#[must_use]
pub fn target_of(forward: ModelCode) -> Option<DmsType> {
    inverse_of(forward).and_then(|inverse| class_of(inverse).ok())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_inherits_every_level() {
        let props = properties_of(DmsType::Switch);
        assert_eq!(props.first(), Some(&ModelCode::IDOBJ_GID));
        assert!(props.contains(&ModelCode::EQUIPMENT_AGGREGATE));
        assert!(props.contains(&ModelCode::CONDEQ_BASVOLTAGE));
        assert_eq!(props.last(), Some(&ModelCode::SWITCH_SWITCHONDATE));
        assert_eq!(props.len(), 4 + 2 + 2 + 5);
    }

    #[test]
    fn settable_excludes_gid_and_inverse() {
        let props = settable_properties_of(DmsType::ConnectivityNode);
        assert!(!props.contains(&ModelCode::IDOBJ_GID));
        assert!(!props.contains(&ModelCode::CONNECTIVITYNODE_TERMINALS));
        assert!(props.contains(&ModelCode::CONNECTIVITYNODE_CONTAINER));
        assert!(props.contains(&ModelCode::IDOBJ_NAME));
    }

    #[test]
    fn inverse_pairs() {
        assert_eq!(
            inverse_of(ModelCode::CONDEQ_BASVOLTAGE),
            Some(ModelCode::BASEVOLTAGE_CONDEQ)
        );
        assert_eq!(inverse_of(ModelCode::IDOBJ_NAME), None);
        assert_eq!(
            target_of(ModelCode::TERMINAL_CONDEQ),
            Some(DmsType::ConductingEquipment)
        );
        assert!(is_inverse(ModelCode::TOPOLOGICALNODE_CONNNODES));
    }

    #[test]
    fn class_lookup() {
        assert_eq!(
            class_of(ModelCode::SWITCH_RETAINED).expect("class"),
            DmsType::Switch
        );
        assert_eq!(
            class_of(ModelCode::IDOBJ_MRID).expect("class"),
            DmsType::IdentifiedObject
        );
        assert!(matches!(
            class_of(ModelCode(0x1234)),
            Err(GridError::UnknownSchemaElement(_))
        ));
        assert_eq!(
            type_from_model_code(ModelCode::TERMINAL).expect("type"),
            DmsType::Terminal
        );
        assert!(type_from_model_code(ModelCode::TERMINAL_CONDEQ).is_err());
    }

    #[test]
    fn lattice() {
        assert_eq!(parent_of(DmsType::Switch), Some(DmsType::ConductingEquipment));
        assert!(is_a(DmsType::Switch, DmsType::PowerSystemResource));
        assert!(!is_a(DmsType::Terminal, DmsType::Equipment));
        assert!(applies_to(DmsType::Switch, ModelCode::IDOBJ_NAME));
        assert!(!applies_to(DmsType::Terminal, ModelCode::SWITCH_NORMALOPEN));
    }

    #[test]
    fn kind_of_known_code() {
        assert_eq!(
            kind_of(ModelCode::SWITCH_SWITCHONCOUNT).expect("kind"),
            PropertyType::Int32
        );
        assert!(kind_of(ModelCode::SWITCH).is_err());
    }
}
