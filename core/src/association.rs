//! Association types, their ends and referential constraints

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::annotations::{Annotations, impl_annotatable};
use crate::error::{Result, expect_single};
use crate::ids::{AssociationEndId, AssociationTypeId, EntityTypeId, MemberPropertyId, SchemaId};
use crate::names::{ItemRef, NamedItem, QualifiedName, impl_name_identity};

/// Cardinality of an association end
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndMultiplicity {
    /// Exactly one
    One,
    /// Zero or one
    ZeroOne,
    /// Any number
    Many,
}

impl fmt::Display for EndMultiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::ZeroOne => "0..1",
            Self::Many => "*",
        })
    }
}

/// What happens to this end when the other end is deleted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationAction {
    #[default]
    None,
    Cascade,
    Restrict,
    SetNull,
}

/// One participant role of an association type
#[derive(Clone, Debug)]
pub struct AssociationEnd {
    pub role_name: String,
    pub entity_type: ItemRef<EntityTypeId>,
    pub multiplicity: EndMultiplicity,
    pub delete_behavior: OperationAction,
    pub(crate) association: Option<AssociationTypeId>,
    pub annotations: Annotations,
}

impl AssociationEnd {
    pub fn new(
        role_name: impl Into<String>,
        entity_type: impl Into<ItemRef<EntityTypeId>>,
        multiplicity: EndMultiplicity,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            entity_type: entity_type.into(),
            multiplicity,
            delete_behavior: OperationAction::None,
            association: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub const fn on_delete(mut self, action: OperationAction) -> Self {
        self.delete_behavior = action;
        self
    }

    /// Association type that owns this end
    #[must_use]
    pub const fn association(&self) -> Option<AssociationTypeId> {
        self.association
    }
}

impl NamedItem for AssociationEnd {
    fn name(&self) -> &str {
        &self.role_name
    }
}

/// Type-level definition of a relationship between two ends
#[derive(Clone, Debug)]
pub struct AssociationType {
    name: QualifiedName,
    pub(crate) ends: Vec<AssociationEndId>,
    pub(crate) referential_constraint: Option<ReferentialConstraint>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl AssociationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            ends: Vec::new(),
            referential_constraint: None,
            model: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    /// Ends in declaration order
    #[must_use]
    pub fn ends(&self) -> &[AssociationEndId] {
        &self.ends
    }

    #[must_use]
    pub const fn referential_constraint(&self) -> Option<&ReferentialConstraint> {
        self.referential_constraint.as_ref()
    }

    pub const fn referential_constraint_mut(&mut self) -> Option<&mut ReferentialConstraint> {
        self.referential_constraint.as_mut()
    }

    /// Schema this association is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }

    /// The end that is not `end`.
    ///
    /// # Errors
    ///
    /// Fails unless removing `end` leaves exactly one end.
    pub fn other_end(&self, end: AssociationEndId) -> Result<AssociationEndId> {
        expect_single(self.ends.iter().copied().filter(|e| *e != end), || {
            format!("other end of association '{}'", self.full_name())
        })
    }
}

impl NamedItem for AssociationType {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

/// Dependent end properties that must match the principal end's key
#[derive(Clone, Debug, Default)]
pub struct ReferentialConstraint {
    pub principal_end: Option<ItemRef<AssociationEndId>>,
    pub principal_properties: Vec<ItemRef<MemberPropertyId>>,
    pub dependent_end: Option<ItemRef<AssociationEndId>>,
    pub dependent_properties: Vec<ItemRef<MemberPropertyId>>,
    pub annotations: Annotations,
}

impl ReferentialConstraint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the principal end and append to the principal properties
    #[must_use]
    pub fn with_principal<P>(
        mut self,
        end: impl Into<ItemRef<AssociationEndId>>,
        properties: impl IntoIterator<Item = P>,
    ) -> Self
    where
        P: Into<ItemRef<MemberPropertyId>>,
    {
        self.principal_end = Some(end.into());
        self.principal_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// Set the dependent end and append to the dependent properties
    #[must_use]
    pub fn with_dependent<P>(
        mut self,
        end: impl Into<ItemRef<AssociationEndId>>,
        properties: impl IntoIterator<Item = P>,
    ) -> Self
    where
        P: Into<ItemRef<MemberPropertyId>>,
    {
        self.dependent_end = Some(end.into());
        self.dependent_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }
}

impl_name_identity!(AssociationEnd, AssociationType);
impl_annotatable!(AssociationEnd, AssociationType, ReferentialConstraint);
