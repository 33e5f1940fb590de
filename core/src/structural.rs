//! Structural types: entity types, complex types, row types and their members

use serde_json::Value;

use crate::annotations::{Annotations, impl_annotatable};
use crate::data_type::DataType;
use crate::ids::{
    AssociationEndId, AssociationTypeId, ComplexTypeId, EntityTypeId, MemberPropertyId,
    NavigationPropertyId, SchemaId,
};
use crate::names::{ItemRef, NamedItem, QualifiedName, impl_name_identity};

/// A property declared on a structural type
#[derive(Clone, Debug)]
pub struct MemberProperty {
    pub name: String,
    pub data_type: DataType,
    pub is_primary_key: bool,
    pub default_value: Option<Value>,
    pub annotations: Annotations,
}

impl MemberProperty {
    /// Create a non-key property
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary_key: false,
            default_value: None,
            annotations: Annotations::new(),
        }
    }

    /// Mark the property as part of the primary key
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Set the default value
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

impl NamedItem for MemberProperty {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Named structural type with keys, navigation properties and single inheritance
#[derive(Clone, Debug)]
pub struct EntityType {
    name: QualifiedName,
    pub base_type: Option<ItemRef<EntityTypeId>>,
    pub is_abstract: bool,
    pub is_open: bool,
    pub(crate) properties: Vec<MemberPropertyId>,
    pub(crate) navigation_properties: Vec<NavigationPropertyId>,
    pub(crate) unique_constraints: Vec<EdmUniqueConstraint>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl EntityType {
    /// Detached entity type without namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            base_type: None,
            is_abstract: false,
            is_open: false,
            properties: Vec::new(),
            navigation_properties: Vec::new(),
            unique_constraints: Vec::new(),
            model: None,
            annotations: Annotations::new(),
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    /// Set the base type
    #[must_use]
    pub fn with_base_type(mut self, base: impl Into<ItemRef<EntityTypeId>>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    /// Mark abstract
    #[must_use]
    pub const fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark open
    #[must_use]
    pub const fn open_type(mut self) -> Self {
        self.is_open = true;
        self
    }

    /// Own properties, in declaration order
    #[must_use]
    pub fn properties(&self) -> &[MemberPropertyId] {
        &self.properties
    }

    /// Own navigation properties
    #[must_use]
    pub fn navigation_properties(&self) -> &[NavigationPropertyId] {
        &self.navigation_properties
    }

    /// Own unique constraints
    #[must_use]
    pub fn edm_unique_constraints(&self) -> &[EdmUniqueConstraint] {
        &self.unique_constraints
    }

    pub fn edm_unique_constraints_mut(&mut self) -> &mut [EdmUniqueConstraint] {
        &mut self.unique_constraints
    }

    /// Append a unique constraint
    pub fn add_edm_unique_constraint(&mut self, constraint: EdmUniqueConstraint) {
        self.unique_constraints.push(constraint);
    }

    /// Schema this type is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }
}

impl NamedItem for EntityType {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

/// Named structural type without identity
#[derive(Clone, Debug)]
pub struct ComplexType {
    name: QualifiedName,
    pub base_type: Option<ItemRef<ComplexTypeId>>,
    pub is_abstract: bool,
    pub is_open: bool,
    pub(crate) properties: Vec<MemberPropertyId>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl ComplexType {
    /// Detached complex type without namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            base_type: None,
            is_abstract: false,
            is_open: false,
            properties: Vec::new(),
            model: None,
            annotations: Annotations::new(),
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    /// Set the base type
    #[must_use]
    pub fn with_base_type(mut self, base: impl Into<ItemRef<ComplexTypeId>>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    /// Own properties, in declaration order
    #[must_use]
    pub fn properties(&self) -> &[MemberPropertyId] {
        &self.properties
    }

    /// Schema this type is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }
}

impl NamedItem for ComplexType {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

/// Traverses `association` from `from_end` to `to_end`
#[derive(Clone, Debug)]
pub struct NavigationProperty {
    pub name: String,
    pub association: ItemRef<AssociationTypeId>,
    pub from_end: ItemRef<AssociationEndId>,
    pub to_end: ItemRef<AssociationEndId>,
    pub annotations: Annotations,
}

impl NavigationProperty {
    pub fn new(
        name: impl Into<String>,
        association: impl Into<ItemRef<AssociationTypeId>>,
        from_end: impl Into<ItemRef<AssociationEndId>>,
        to_end: impl Into<ItemRef<AssociationEndId>>,
    ) -> Self {
        Self {
            name: name.into(),
            association: association.into(),
            from_end: from_end.into(),
            to_end: to_end.into(),
            annotations: Annotations::new(),
        }
    }
}

impl NamedItem for NavigationProperty {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Unique constraint over a set of own or inherited properties
#[derive(Clone, Debug)]
pub struct EdmUniqueConstraint {
    pub name: String,
    pub properties: Vec<ItemRef<MemberPropertyId>>,
    pub annotations: Annotations,
}

impl EdmUniqueConstraint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    /// Append a property to the constraint
    #[must_use]
    pub fn with_property(mut self, property: impl Into<ItemRef<MemberPropertyId>>) -> Self {
        self.properties.push(property.into());
        self
    }
}

impl NamedItem for EdmUniqueConstraint {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Anonymous structural shape; two rows are equal when their property types
/// match position by position, whatever the property names
#[derive(Clone, Debug, Default)]
pub struct RowType {
    properties: Vec<MemberProperty>,
}

impl RowType {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a property
    pub fn add(&mut self, property: MemberProperty) {
        self.properties.push(property);
    }

    /// Builder-style [`RowType::add`]
    #[must_use]
    pub fn with_property(mut self, property: MemberProperty) -> Self {
        self.add(property);
        self
    }

    #[must_use]
    pub fn properties(&self) -> &[MemberProperty] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut [MemberProperty] {
        &mut self.properties
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .zip(&other.properties)
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl_name_identity!(
    MemberProperty,
    EntityType,
    ComplexType,
    NavigationProperty,
    EdmUniqueConstraint
);
impl_annotatable!(
    MemberProperty,
    EntityType,
    ComplexType,
    NavigationProperty,
    EdmUniqueConstraint
);
