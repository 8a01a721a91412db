//! # Entity Model
//!
//! An `Entity` is an `IdentifiedObject` level plus a `Body` holding one struct
//! per remaining level of its concrete kind. Every access goes through the
//! levels most-derived first, so a property is served by the class that
//! declares it.
//!
//! ## Contract
//!
//! | Operation | Failure |
//! |-----------|---------|
//! | `get_property` | `UnknownProperty` |
//! | `set_property` | `UnknownProperty`, `NotSettable`, `TypeMismatch` |
//! | `add_reference` | `UnknownProperty` when no level keeps that inverse |
//! | `remove_reference` | same; an absent entry only logs a warning |
//!
//! `set_property` is a local assignment. Keeping the opposite side of a
//! reference in sync is the store's job.
//!
//! PowerSystemResource declares no properties and has no level struct.

use crate::delta::ResourceDescription;
use crate::property::{Property, PropertyValue};
use crate::schema;
use crate::types::{DmsType, Gid, GridError, ModelCode};
use std::collections::BTreeMap;

// =============================================================================
// LEVEL DISPATCH
// =============================================================================

/// One level of the class lattice.
trait Level {
    /// Value of an own property; `None` when this level does not declare it.
    fn read(&self, code: ModelCode) -> Option<PropertyValue>;

    /// Assign an own settable property; `false` when not handled here.
    fn write(&mut self, property: &Property) -> bool;

    /// Inverse collection maintained for a forward code held by other entities.
    fn inverse_mut(&mut self, _source: ModelCode) -> Option<&mut Vec<Gid>> {
        None
    }
}

/// Which side of the reference bookkeeping to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDirection {
    /// Entities this one points at (forward references).
    Target,
    /// Entities that point at this one (inverse collections).
    Reference,
    Both,
}

impl ReferenceDirection {
    const fn includes_forward(self) -> bool {
        matches!(self, Self::Target | Self::Both)
    }

    const fn includes_inverse(self) -> bool {
        matches!(self, Self::Reference | Self::Both)
    }
}

// =============================================================================
// LEVELS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedObject {
    gid: Gid,
    alias_name: String,
    mrid: String,
    name: String,
}

impl Level for IdentifiedObject {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        let value = match code {
            ModelCode::IDOBJ_GID => PropertyValue::Int64(self.gid.0 as i64),
            ModelCode::IDOBJ_ALIASNAME => PropertyValue::String(self.alias_name.clone()),
            ModelCode::IDOBJ_MRID => PropertyValue::String(self.mrid.clone()),
            ModelCode::IDOBJ_NAME => PropertyValue::String(self.name.clone()),
            _ => return None,
        };
        Some(value)
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::IDOBJ_ALIASNAME, PropertyValue::String(v)) => self.alias_name.clone_from(v),
            (ModelCode::IDOBJ_MRID, PropertyValue::String(v)) => self.mrid.clone_from(v),
            (ModelCode::IDOBJ_NAME, PropertyValue::String(v)) => self.name.clone_from(v),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Equipment {
    aggregate: bool,
    normally_in_service: bool,
}

impl Level for Equipment {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        match code {
            ModelCode::EQUIPMENT_AGGREGATE => Some(PropertyValue::Bool(self.aggregate)),
            ModelCode::EQUIPMENT_NORMALLYINSERVICE => {
                Some(PropertyValue::Bool(self.normally_in_service))
            }
            _ => None,
        }
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::EQUIPMENT_AGGREGATE, PropertyValue::Bool(v)) => self.aggregate = *v,
            (ModelCode::EQUIPMENT_NORMALLYINSERVICE, PropertyValue::Bool(v)) => {
                self.normally_in_service = *v;
            }
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConductingEquipment {
    base_voltage: Gid,
    terminals: Vec<Gid>,
}

impl Level for ConductingEquipment {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        match code {
            ModelCode::CONDEQ_BASVOLTAGE => Some(PropertyValue::Reference(self.base_voltage)),
            ModelCode::CONDEQ_TERMINALS => Some(PropertyValue::ReferenceVector(self.terminals.clone())),
            _ => None,
        }
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::CONDEQ_BASVOLTAGE, PropertyValue::Reference(v)) => {
                self.base_voltage = *v;
                true
            }
            _ => false,
        }
    }

    fn inverse_mut(&mut self, source: ModelCode) -> Option<&mut Vec<Gid>> {
        (source == ModelCode::TERMINAL_CONDEQ).then_some(&mut self.terminals)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Switch {
    normal_open: bool,
    rated_current: f32,
    retained: bool,
    switch_on_count: i32,
    switch_on_date: i64,
}

impl Level for Switch {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        let value = match code {
            ModelCode::SWITCH_NORMALOPEN => PropertyValue::Bool(self.normal_open),
            ModelCode::SWITCH_RATEDCURRENT => PropertyValue::Float(self.rated_current),
            ModelCode::SWITCH_RETAINED => PropertyValue::Bool(self.retained),
            ModelCode::SWITCH_SWITCHONCOUNT => PropertyValue::Int32(self.switch_on_count),
            ModelCode::SWITCH_SWITCHONDATE => PropertyValue::DateTime(self.switch_on_date),
            _ => return None,
        };
        Some(value)
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::SWITCH_NORMALOPEN, PropertyValue::Bool(v)) => self.normal_open = *v,
            (ModelCode::SWITCH_RATEDCURRENT, PropertyValue::Float(v)) => self.rated_current = *v,
            (ModelCode::SWITCH_RETAINED, PropertyValue::Bool(v)) => self.retained = *v,
            (ModelCode::SWITCH_SWITCHONCOUNT, PropertyValue::Int32(v)) => {
                self.switch_on_count = *v;
            }
            (ModelCode::SWITCH_SWITCHONDATE, PropertyValue::DateTime(v)) => {
                self.switch_on_date = *v;
            }
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseVoltage {
    conducting_equipments: Vec<Gid>,
}

impl Level for BaseVoltage {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        (code == ModelCode::BASEVOLTAGE_CONDEQ)
            .then(|| PropertyValue::ReferenceVector(self.conducting_equipments.clone()))
    }

    fn write(&mut self, _property: &Property) -> bool {
        false
    }

    fn inverse_mut(&mut self, source: ModelCode) -> Option<&mut Vec<Gid>> {
        (source == ModelCode::CONDEQ_BASVOLTAGE).then_some(&mut self.conducting_equipments)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Terminal {
    conducting_equipment: Gid,
    connectivity_node: Gid,
}

impl Level for Terminal {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        match code {
            ModelCode::TERMINAL_CONDEQ => Some(PropertyValue::Reference(self.conducting_equipment)),
            ModelCode::TERMINAL_CONNNODE => Some(PropertyValue::Reference(self.connectivity_node)),
            _ => None,
        }
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::TERMINAL_CONDEQ, PropertyValue::Reference(v)) => {
                self.conducting_equipment = *v;
            }
            (ModelCode::TERMINAL_CONNNODE, PropertyValue::Reference(v)) => {
                self.connectivity_node = *v;
            }
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityNode {
    container: Gid,
    terminals: Vec<Gid>,
    topological_node: Gid,
}

impl Level for ConnectivityNode {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        let value = match code {
            ModelCode::CONNECTIVITYNODE_CONTAINER => PropertyValue::Reference(self.container),
            ModelCode::CONNECTIVITYNODE_TERMINALS => {
                PropertyValue::ReferenceVector(self.terminals.clone())
            }
            ModelCode::CONNECTIVITYNODE_TOPONODE => PropertyValue::Reference(self.topological_node),
            _ => return None,
        };
        Some(value)
    }

    fn write(&mut self, property: &Property) -> bool {
        match (property.id, &property.value) {
            (ModelCode::CONNECTIVITYNODE_CONTAINER, PropertyValue::Reference(v)) => {
                self.container = *v;
            }
            (ModelCode::CONNECTIVITYNODE_TOPONODE, PropertyValue::Reference(v)) => {
                self.topological_node = *v;
            }
            _ => return false,
        }
        true
    }

    fn inverse_mut(&mut self, source: ModelCode) -> Option<&mut Vec<Gid>> {
        (source == ModelCode::TERMINAL_CONNNODE).then_some(&mut self.terminals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityNodeContainer {
    nodes: Vec<Gid>,
}

impl Level for ConnectivityNodeContainer {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        (code == ModelCode::CONNNODECONTAINER_NODES)
            .then(|| PropertyValue::ReferenceVector(self.nodes.clone()))
    }

    fn write(&mut self, _property: &Property) -> bool {
        false
    }

    fn inverse_mut(&mut self, source: ModelCode) -> Option<&mut Vec<Gid>> {
        (source == ModelCode::CONNECTIVITYNODE_CONTAINER).then_some(&mut self.nodes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalNode {
    connectivity_nodes: Vec<Gid>,
}

impl Level for TopologicalNode {
    fn read(&self, code: ModelCode) -> Option<PropertyValue> {
        (code == ModelCode::TOPOLOGICALNODE_CONNNODES)
            .then(|| PropertyValue::ReferenceVector(self.connectivity_nodes.clone()))
    }

    fn write(&mut self, _property: &Property) -> bool {
        false
    }

    fn inverse_mut(&mut self, source: ModelCode) -> Option<&mut Vec<Gid>> {
        (source == ModelCode::CONNECTIVITYNODE_TOPONODE).then_some(&mut self.connectivity_nodes)
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Levels below IdentifiedObject, per concrete kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    BaseVoltage(BaseVoltage),
    Switch {
        equipment: Equipment,
        conducting: ConductingEquipment,
        switch: Switch,
    },
    Terminal(Terminal),
    ConnectivityNode(ConnectivityNode),
    ConnectivityNodeContainer(ConnectivityNodeContainer),
    TopologicalNode(TopologicalNode),
}

/// A stored network object.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    identified: IdentifiedObject,
    body: Body,
}

impl Entity {
    /// A fresh entity with every property at its default.
    pub fn new(gid: Gid) -> Result<Self, GridError> {
        let body = match gid.dms_type() {
            Some(DmsType::BaseVoltage) => Body::BaseVoltage(BaseVoltage::default()),
            Some(DmsType::Switch) => Body::Switch {
                equipment: Equipment::default(),
                conducting: ConductingEquipment::default(),
                switch: Switch::default(),
            },
            Some(DmsType::Terminal) => Body::Terminal(Terminal::default()),
            Some(DmsType::ConnectivityNode) => Body::ConnectivityNode(ConnectivityNode::default()),
            Some(DmsType::ConnectivityNodeContainer) => {
                Body::ConnectivityNodeContainer(ConnectivityNodeContainer::default())
            }
            Some(DmsType::TopologicalNode) => Body::TopologicalNode(TopologicalNode::default()),
            _ => return Err(GridError::UnsupportedType(gid.type_code())),
        };
        Ok(Self {
            identified: IdentifiedObject {
                gid,
                alias_name: String::new(),
                mrid: String::new(),
                name: String::new(),
            },
            body,
        })
    }

    #[must_use]
    pub const fn gid(&self) -> Gid {
        self.identified.gid
    }

    /// Concrete kind.
    #[must_use]
    pub const fn kind(&self) -> DmsType {
        match self.body {
            Body::BaseVoltage(_) => DmsType::BaseVoltage,
            Body::Switch { .. } => DmsType::Switch,
            Body::Terminal(_) => DmsType::Terminal,
            Body::ConnectivityNode(_) => DmsType::ConnectivityNode,
            Body::ConnectivityNodeContainer(_) => DmsType::ConnectivityNodeContainer,
            Body::TopologicalNode(_) => DmsType::TopologicalNode,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identified.name
    }

    #[must_use]
    pub fn mrid(&self) -> &str {
        &self.identified.mrid
    }

    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    fn levels(&self) -> Vec<&dyn Level> {
        let mut levels: Vec<&dyn Level> = Vec::with_capacity(4);
        match &self.body {
            Body::BaseVoltage(l) => levels.push(l),
            Body::Switch {
                equipment,
                conducting,
                switch,
            } => {
                levels.push(switch);
                levels.push(conducting);
                levels.push(equipment);
            }
            Body::Terminal(l) => levels.push(l),
            Body::ConnectivityNode(l) => levels.push(l),
            Body::ConnectivityNodeContainer(l) => levels.push(l),
            Body::TopologicalNode(l) => levels.push(l),
        }
        levels.push(&self.identified);
        levels
    }

    fn levels_mut(&mut self) -> Vec<&mut dyn Level> {
        let mut levels: Vec<&mut dyn Level> = Vec::with_capacity(4);
        match &mut self.body {
            Body::BaseVoltage(l) => levels.push(l),
            Body::Switch {
                equipment,
                conducting,
                switch,
            } => {
                levels.push(switch);
                levels.push(conducting);
                levels.push(equipment);
            }
            Body::Terminal(l) => levels.push(l),
            Body::ConnectivityNode(l) => levels.push(l),
            Body::ConnectivityNodeContainer(l) => levels.push(l),
            Body::TopologicalNode(l) => levels.push(l),
        }
        levels.push(&mut self.identified);
        levels
    }

    // =========================================================================
    // PROPERTY ACCESS
    // =========================================================================

    /// True when the property applies to this entity's kind.
    #[must_use]
    pub fn has_property(&self, code: ModelCode) -> bool {
        schema::applies_to(self.kind(), code)
    }

    pub fn get_property(&self, code: ModelCode) -> Result<Property, GridError> {
        let unknown = || GridError::UnknownProperty {
            gid: self.gid(),
            code,
        };
        if !self.has_property(code) {
            return Err(unknown());
        }
        self.levels()
            .into_iter()
            .find_map(|level| level.read(code))
            .map(|value| Property { id: code, value })
            .ok_or_else(unknown)
    }

    /// Assign one settable property on this entity only.
    pub fn set_property(&mut self, property: &Property) -> Result<(), GridError> {
        let code = property.id;
        if !self.has_property(code) {
            return Err(GridError::UnknownProperty {
                gid: self.gid(),
                code,
            });
        }
        if !schema::is_settable(code) {
            return Err(GridError::NotSettable(code));
        }
        let expected = schema::kind_of(code)?;
        let mismatch = GridError::TypeMismatch {
            code,
            expected,
            found: property.kind(),
        };
        if property.kind() != expected {
            return Err(mismatch);
        }
        if self.levels_mut().into_iter().any(|level| level.write(property)) {
            Ok(())
        } else {
            Err(mismatch)
        }
    }

    // =========================================================================
    // REFERENCE BOOKKEEPING
    // =========================================================================

    /// Record that `gid` points at this entity through its `source` property.
    pub fn add_reference(&mut self, source: ModelCode, gid: Gid) -> Result<(), GridError> {
        let owner = self.gid();
        let list = self
            .levels_mut()
            .into_iter()
            .find_map(|level| level.inverse_mut(source))
            .ok_or(GridError::UnknownProperty {
                gid: owner,
                code: source,
            })?;
        list.push(gid);
        Ok(())
    }

    /// True when this entity keeps an inverse collection for `source`.
    #[must_use]
    pub fn accepts_reference(&self, source: ModelCode) -> bool {
        schema::inverse_of(source).is_some_and(|inverse| self.has_property(inverse))
    }

    /// Drop one entry recorded by [`Self::add_reference`].
    pub fn remove_reference(&mut self, source: ModelCode, gid: Gid) -> Result<(), GridError> {
        let owner = self.gid();
        let list = self
            .levels_mut()
            .into_iter()
            .find_map(|level| level.inverse_mut(source))
            .ok_or(GridError::UnknownProperty {
                gid: owner,
                code: source,
            })?;
        match list.iter().position(|g| *g == gid) {
            Some(pos) => {
                list.remove(pos);
            }
            None => tracing::warn!(
                entity = %owner,
                source = %source,
                referrer = %gid,
                "Removing reference that was never recorded"
            ),
        }
        Ok(())
    }

    /// True when any inverse collection at any level is non-empty.
    #[must_use]
    pub fn is_referenced(&self) -> bool {
        !self.get_references(ReferenceDirection::Reference).is_empty()
    }

    /// Non-empty reference properties, keyed by code.
    #[must_use]
    pub fn get_references(&self, direction: ReferenceDirection) -> BTreeMap<ModelCode, Vec<Gid>> {
        let mut out = BTreeMap::new();
        for code in schema::properties_of(self.kind()) {
            let inverse = schema::is_inverse(code);
            let forward = schema::inverse_of(code).is_some();
            let wanted = (inverse && direction.includes_inverse())
                || (forward && direction.includes_forward());
            if !wanted {
                continue;
            }
            if let Ok(property) = self.get_property(code) {
                let gids = property.referenced_gids();
                if !gids.is_empty() {
                    out.insert(code, gids);
                }
            }
        }
        out
    }

    /// Snapshot of every property, in schema order.
    #[must_use]
    pub fn to_resource_description(&self) -> ResourceDescription {
        let properties = schema::properties_of(self.kind())
            .into_iter()
            .filter_map(|code| self.get_property(code).ok())
            .collect();
        ResourceDescription::with_properties(self.gid(), properties)
    }
}

// =============================================================================
// TESTS
// =============================================================================
