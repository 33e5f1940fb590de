//! Entity containers and the instance-level sets they own
//!
//! Membership is two-way: a set's `container` back-reference is `Some(c)`
//! exactly when `c` lists the set. Only the schema arena mutates either
//! side, and always both in the same call.

use std::sync::{Arc, OnceLock};

use crate::annotations::{Annotations, impl_annotatable};
use crate::data_type::DataType;
use crate::error::{EdmError, Result, expect_single};
use crate::function::FunctionParameter;
use crate::ids::{
    AssociationEndId, AssociationSetId, AssociationTypeId, EntityContainerId, EntitySetId,
    EntityTypeId, FunctionImportId, SchemaId,
};
use crate::names::{ItemRef, NamedItem, QualifiedName, impl_name_identity};
use crate::relationship::RelationshipType;

/// Named catalog of entity sets, association sets and function imports
#[derive(Clone, Debug)]
pub struct EntityContainer {
    name: QualifiedName,
    pub(crate) entity_sets: Vec<EntitySetId>,
    pub(crate) association_sets: Vec<AssociationSetId>,
    pub(crate) function_imports: Vec<FunctionImportId>,
    pub(crate) model: Option<SchemaId>,
    pub annotations: Annotations,
}

impl EntityContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(name),
            entity_sets: Vec::new(),
            association_sets: Vec::new(),
            function_imports: Vec::new(),
            model: None,
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.name = self.name.in_namespace(namespace);
        self
    }

    #[must_use]
    pub fn entity_sets(&self) -> &[EntitySetId] {
        &self.entity_sets
    }

    #[must_use]
    pub fn association_sets(&self) -> &[AssociationSetId] {
        &self.association_sets
    }

    #[must_use]
    pub fn function_imports(&self) -> &[FunctionImportId] {
        &self.function_imports
    }

    /// Schema this container is registered in
    #[must_use]
    pub const fn model(&self) -> Option<SchemaId> {
        self.model
    }
}

impl NamedItem for EntityContainer {
    fn name(&self) -> &str {
        self.name.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }
}

/// Instance-level collection of one entity type
#[derive(Clone, Debug)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: ItemRef<EntityTypeId>,
    pub(crate) container: Option<EntityContainerId>,
    pub annotations: Annotations,
}

impl EntitySet {
    pub fn new(name: impl Into<String>, entity_type: impl Into<ItemRef<EntityTypeId>>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            container: None,
            annotations: Annotations::new(),
        }
    }

    /// Container that currently owns this set
    #[must_use]
    pub const fn container(&self) -> Option<EntityContainerId> {
        self.container
    }
}

impl NamedItem for EntitySet {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Binding of an association type to two entity sets
#[derive(Clone, Debug)]
pub struct AssociationSet {
    pub name: String,
    pub association_type: ItemRef<AssociationTypeId>,
    pub ends: Vec<AssociationSetEnd>,
    pub(crate) container: Option<EntityContainerId>,
    relationship: OnceLock<Arc<RelationshipType>>,
    pub annotations: Annotations,
}

impl AssociationSet {
    pub fn new(
        name: impl Into<String>,
        association_type: impl Into<ItemRef<AssociationTypeId>>,
    ) -> Self {
        Self {
            name: name.into(),
            association_type: association_type.into(),
            ends: Vec::new(),
            container: None,
            relationship: OnceLock::new(),
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: AssociationSetEnd) -> Self {
        self.ends.push(end);
        self
    }

    /// Container that currently owns this set
    #[must_use]
    pub const fn container(&self) -> Option<EntityContainerId> {
        self.container
    }

    /// The end that is not `end`.
    ///
    /// # Errors
    ///
    /// Fails unless removing `end` leaves exactly one end.
    pub fn other_end(&self, end: &AssociationSetEnd) -> Result<&AssociationSetEnd> {
        expect_single(self.ends.iter().filter(|e| *e != end), || {
            format!("other end of association set '{}'", self.name)
        })
    }

    /// Memoized relationship view, if one was derived already
    #[must_use]
    pub fn cached_relationship(&self) -> Option<&Arc<RelationshipType>> {
        self.relationship.get()
    }

    /// Store a derived relationship view; the first stored view wins
    pub fn cache_relationship(&self, view: RelationshipType) -> Arc<RelationshipType> {
        Arc::clone(self.relationship.get_or_init(|| Arc::new(view)))
    }

    /// Drop the memoized view so the next read derives it again
    pub fn invalidate_relationship(&mut self) {
        self.relationship.take();
    }
}

impl NamedItem for AssociationSet {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Binds one association end to the entity set that holds its instances
#[derive(Clone, Debug)]
pub struct AssociationSetEnd {
    pub association_end: ItemRef<AssociationEndId>,
    pub entity_set: ItemRef<EntitySetId>,
    pub annotations: Annotations,
}

impl AssociationSetEnd {
    pub fn new(
        association_end: impl Into<ItemRef<AssociationEndId>>,
        entity_set: impl Into<ItemRef<EntitySetId>>,
    ) -> Self {
        Self {
            association_end: association_end.into(),
            entity_set: entity_set.into(),
            annotations: Annotations::new(),
        }
    }
}

impl PartialEq for AssociationSetEnd {
    fn eq(&self, other: &Self) -> bool {
        self.association_end == other.association_end && self.entity_set == other.entity_set
    }
}

/// Function exposed through a container
///
/// Only non-composable imports may declare more than one return type.
#[derive(Clone, Debug)]
pub struct FunctionImport {
    pub name: String,
    return_types: Vec<FunctionImportReturnType>,
    pub parameters: Vec<FunctionParameter>,
    is_composable: bool,
    pub is_side_effecting: bool,
    pub is_bindable: bool,
    pub(crate) container: Option<EntityContainerId>,
    pub annotations: Annotations,
}

impl FunctionImport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_types: Vec::new(),
            parameters: Vec::new(),
            is_composable: false,
            is_side_effecting: true,
            is_bindable: false,
            container: None,
            annotations: Annotations::new(),
        }
    }

    /// Builder-style [`FunctionImport::add_return_type`]
    ///
    /// # Errors
    ///
    /// See [`FunctionImport::add_return_type`].
    pub fn returning(mut self, return_type: FunctionImportReturnType) -> Result<Self> {
        self.add_return_type(return_type)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: FunctionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a return type.
    ///
    /// # Errors
    ///
    /// Composable imports accept a single return type.
    pub fn add_return_type(&mut self, return_type: FunctionImportReturnType) -> Result<()> {
        if self.is_composable && !self.return_types.is_empty() {
            return Err(EdmError::invariant(format!(
                "composable function import '{}' cannot have more than one return type",
                self.name
            )));
        }
        self.return_types.push(return_type);
        Ok(())
    }

    #[must_use]
    pub fn return_types(&self) -> &[FunctionImportReturnType] {
        &self.return_types
    }

    pub fn return_types_mut(&mut self) -> &mut [FunctionImportReturnType] {
        &mut self.return_types
    }

    #[must_use]
    pub const fn is_composable(&self) -> bool {
        self.is_composable
    }

    /// Set composability.
    ///
    /// # Errors
    ///
    /// An import with several return types cannot become composable.
    pub fn set_composable(&mut self, composable: bool) -> Result<()> {
        if composable && self.return_types.len() > 1 {
            return Err(EdmError::invariant(format!(
                "function import '{}' has {} return types and cannot be composable",
                self.name,
                self.return_types.len()
            )));
        }
        self.is_composable = composable;
        Ok(())
    }

    /// Container that currently owns this import
    #[must_use]
    pub const fn container(&self) -> Option<EntityContainerId> {
        self.container
    }
}

impl NamedItem for FunctionImport {
    fn name(&self) -> &str {
        &self.name
    }
}

/// One return type of a function import, optionally bound to an entity set
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionImportReturnType {
    pub data_type: DataType,
    pub entity_set: Option<ItemRef<EntitySetId>>,
}

impl FunctionImportReturnType {
    #[must_use]
    pub const fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            entity_set: None,
        }
    }

    #[must_use]
    pub fn from_entity_set(mut self, entity_set: impl Into<ItemRef<EntitySetId>>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }
}

impl_name_identity!(EntityContainer, EntitySet, AssociationSet, FunctionImport);
impl_annotatable!(
    EntityContainer,
    EntitySet,
    AssociationSet,
    AssociationSetEnd,
    FunctionImport
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::PrimitiveKind;

    #[test]
    fn other_set_end_requires_exactly_one_remaining() {
        let a = AssociationSetEnd::new(ItemRef::named("Customer"), ItemRef::named("Customers"));
        let b = AssociationSetEnd::new(ItemRef::named("Orders"), ItemRef::named("Orders"));
        let set = AssociationSet::new("CustomerOrders", ItemRef::named("NS.CustomerOrders"))
            .with_end(a.clone())
            .with_end(b.clone());

        assert_eq!(set.other_end(&a).ok(), Some(&b));
        assert_eq!(set.other_end(&b).ok(), Some(&a));

        let lonely = AssociationSet::new("Lonely", ItemRef::named("NS.X")).with_end(a.clone());
        assert!(lonely.other_end(&a).is_err());
    }

    #[test]
    fn composable_imports_take_one_return_type() -> Result<()> {
        let int = || FunctionImportReturnType::new(DataType::primitive(PrimitiveKind::Int32));

        let mut import = FunctionImport::new("GetCount");
        import.set_composable(true)?;
        import.add_return_type(int())?;
        assert!(import.add_return_type(int()).is_err());

        let mut proc = FunctionImport::new("MultiResult").returning(int())?.returning(int())?;
        assert_eq!(proc.return_types().len(), 2);
        assert!(proc.set_composable(true).is_err());
        assert!(!proc.is_composable());
        Ok(())
    }
}
