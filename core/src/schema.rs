//! The schema root and the arena that stores every model item
//!
//! Items are constructed detached, moved into the arena with
//! [`EntityModelSchema::insert`] and addressed by typed ids from then on.
//! Membership of the six top-level kinds and of the three container-owned
//! kinds is tracked twice: by the owner's collection and by the item's
//! back-reference. Both sides change together inside one call, and every
//! check runs before the first write.

use indexmap::IndexSet;

use crate::association::{AssociationEnd, AssociationType, ReferentialConstraint};
use crate::container::{AssociationSet, EntityContainer, EntitySet, FunctionImport};
use crate::enum_type::EnumType;
use crate::error::{EdmError, Result};
use crate::function::Function;
use crate::ids::{
    AssociationEndId, AssociationSetId, AssociationTypeId, ComplexTypeId, EntityContainerId,
    EntitySetId, EntityTypeId, EnumTypeId, FunctionId, FunctionImportId, ItemId, ItemKind,
    MemberPropertyId, NavigationPropertyId, SchemaId, StructuralTypeId,
};
use crate::names::{ItemRef, NamedItem, QualifiedName, require_name};
use crate::structural::{ComplexType, EntityType, MemberProperty, NavigationProperty};

/// Slot storage behind an [`EntityModelSchema`]
///
/// Slots are never freed; removing an item from its owner leaves it
/// detached in place so its id stays valid.
#[derive(Clone, Debug, Default)]
pub struct ItemArena {
    entity_types: Vec<EntityType>,
    complex_types: Vec<ComplexType>,
    enum_types: Vec<EnumType>,
    association_types: Vec<AssociationType>,
    association_ends: Vec<AssociationEnd>,
    functions: Vec<Function>,
    entity_containers: Vec<EntityContainer>,
    entity_sets: Vec<EntitySet>,
    association_sets: Vec<AssociationSet>,
    function_imports: Vec<FunctionImport>,
    member_properties: Vec<MemberProperty>,
    navigation_properties: Vec<NavigationProperty>,
}

/// An item kind stored in the arena
pub trait ArenaItem: NamedItem + Sized + 'static {
    type Id: ArenaId<Item = Self>;

    fn slots(arena: &ItemArena) -> &Vec<Self>;

    fn slots_mut(arena: &mut ItemArena) -> &mut Vec<Self>;

    fn make_id(schema: SchemaId, index: usize) -> Self::Id;

    /// Clear back-references and arena-owned children before insertion
    fn reset_links(&mut self);
}

/// An id that addresses an [`ArenaItem`]
pub trait ArenaId: ItemId + 'static {
    type Item: ArenaItem<Id = Self>;
}

macro_rules! arena_item {
    ($item:ty, $id:ty, $slots:ident, |$this:ident| $reset:block) => {
        impl ArenaItem for $item {
            type Id = $id;

            fn slots(arena: &ItemArena) -> &Vec<Self> {
                &arena.$slots
            }

            fn slots_mut(arena: &mut ItemArena) -> &mut Vec<Self> {
                &mut arena.$slots
            }

            fn make_id(schema: SchemaId, index: usize) -> Self::Id {
                <$id>::new(schema, index)
            }

            fn reset_links(&mut self) {
                let $this = self;
                $reset
            }
        }

        impl ArenaId for $id {
            type Item = $item;
        }
    };
}

arena_item!(EntityType, EntityTypeId, entity_types, |t| {
    t.model = None;
    t.properties.clear();
    t.navigation_properties.clear();
});
arena_item!(ComplexType, ComplexTypeId, complex_types, |t| {
    t.model = None;
    t.properties.clear();
});
arena_item!(EnumType, EnumTypeId, enum_types, |t| {
    t.model = None;
});
arena_item!(AssociationType, AssociationTypeId, association_types, |t| {
    t.model = None;
    t.ends.clear();
    t.referential_constraint = None;
});
arena_item!(AssociationEnd, AssociationEndId, association_ends, |e| {
    e.association = None;
});
arena_item!(Function, FunctionId, functions, |f| {
    f.model = None;
});
arena_item!(EntityContainer, EntityContainerId, entity_containers, |c| {
    c.model = None;
    c.entity_sets.clear();
    c.association_sets.clear();
    c.function_imports.clear();
});
arena_item!(EntitySet, EntitySetId, entity_sets, |s| {
    s.container = None;
});
arena_item!(AssociationSet, AssociationSetId, association_sets, |s| {
    s.container = None;
    s.invalidate_relationship();
});
arena_item!(FunctionImport, FunctionImportId, function_imports, |f| {
    f.container = None;
});
arena_item!(MemberProperty, MemberPropertyId, member_properties, |_p| {});
arena_item!(NavigationProperty, NavigationPropertyId, navigation_properties, |_n| {});

/// A kind registered directly in the schema root
pub trait ModelMember: ArenaItem {
    fn model_mut(&mut self) -> &mut Option<SchemaId>;

    fn registry(schema: &EntityModelSchema) -> &IndexSet<Self::Id>;

    fn registry_mut(schema: &mut EntityModelSchema) -> &mut IndexSet<Self::Id>;
}

macro_rules! model_member {
    ($item:ty, $registry:ident) => {
        impl ModelMember for $item {
            fn model_mut(&mut self) -> &mut Option<SchemaId> {
                &mut self.model
            }

            fn registry(schema: &EntityModelSchema) -> &IndexSet<Self::Id> {
                &schema.$registry
            }

            fn registry_mut(schema: &mut EntityModelSchema) -> &mut IndexSet<Self::Id> {
                &mut schema.$registry
            }
        }
    };
}

model_member!(EntityType, entity_types);
model_member!(ComplexType, complex_types);
model_member!(EnumType, enum_types);
model_member!(AssociationType, association_types);
model_member!(Function, functions);
model_member!(EntityContainer, entity_containers);

/// A kind owned by an entity container
pub trait ContainerMember: ArenaItem {
    fn container_mut(&mut self) -> &mut Option<EntityContainerId>;

    fn members(container: &EntityContainer) -> &Vec<Self::Id>;

    fn members_mut(container: &mut EntityContainer) -> &mut Vec<Self::Id>;
}

macro_rules! container_member {
    ($item:ty, $members:ident) => {
        impl ContainerMember for $item {
            fn container_mut(&mut self) -> &mut Option<EntityContainerId> {
                &mut self.container
            }

            fn members(container: &EntityContainer) -> &Vec<Self::Id> {
                &container.$members
            }

            fn members_mut(container: &mut EntityContainer) -> &mut Vec<Self::Id> {
                &mut container.$members
            }
        }
    };
}

container_member!(EntitySet, entity_sets);
container_member!(AssociationSet, association_sets);
container_member!(FunctionImport, function_imports);

/// Saved state of one schema, taken with [`EntityModelSchema::checkpoint`]
#[derive(Debug, Clone)]
pub struct SchemaCheckpoint {
    schema: SchemaId,
    arena: ItemArena,
    entity_containers: IndexSet<EntityContainerId>,
    entity_types: IndexSet<EntityTypeId>,
    complex_types: IndexSet<ComplexTypeId>,
    association_types: IndexSet<AssociationTypeId>,
    functions: IndexSet<FunctionId>,
    enum_types: IndexSet<EnumTypeId>,
}

/// Top-level registry of a conceptual model
///
/// Not `Clone`: a copy would share the [`SchemaId`] of its source. Copies go
/// through the service crate's deep clone, which allocates a new id.
#[derive(Debug)]
pub struct EntityModelSchema {
    id: SchemaId,
    arena: ItemArena,
    entity_containers: IndexSet<EntityContainerId>,
    entity_types: IndexSet<EntityTypeId>,
    complex_types: IndexSet<ComplexTypeId>,
    association_types: IndexSet<AssociationTypeId>,
    functions: IndexSet<FunctionId>,
    enum_types: IndexSet<EnumTypeId>,
}

impl Default for EntityModelSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityModelSchema {
    /// Empty schema with a fresh [`SchemaId`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SchemaId::next(),
            arena: ItemArena::default(),
            entity_containers: IndexSet::new(),
            entity_types: IndexSet::new(),
            complex_types: IndexSet::new(),
            association_types: IndexSet::new(),
            functions: IndexSet::new(),
            enum_types: IndexSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SchemaId {
        self.id
    }

    /// Copy of every item and registry, for [`EntityModelSchema::restore`]
    #[must_use]
    pub fn checkpoint(&self) -> SchemaCheckpoint {
        SchemaCheckpoint {
            schema: self.id,
            arena: self.arena.clone(),
            entity_containers: self.entity_containers.clone(),
            entity_types: self.entity_types.clone(),
            complex_types: self.complex_types.clone(),
            association_types: self.association_types.clone(),
            functions: self.functions.clone(),
            enum_types: self.enum_types.clone(),
        }
    }

    /// Put the schema back into the state captured by `checkpoint`.
    ///
    /// Ids issued after the checkpoint no longer address an item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `checkpoint` was taken from another
    /// schema.
    pub fn restore(&mut self, checkpoint: SchemaCheckpoint) -> Result<()> {
        if checkpoint.schema != self.id {
            return Err(EdmError::invalid_argument(format!(
                "checkpoint of {} cannot restore {}",
                checkpoint.schema, self.id
            )));
        }
        self.arena = checkpoint.arena;
        self.entity_containers = checkpoint.entity_containers;
        self.entity_types = checkpoint.entity_types;
        self.complex_types = checkpoint.complex_types;
        self.association_types = checkpoint.association_types;
        self.functions = checkpoint.functions;
        self.enum_types = checkpoint.enum_types;
        tracing::debug!("Restored {} from checkpoint", self.id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // arena access
    // ------------------------------------------------------------------

    /// Move a detached item into the arena.
    ///
    /// Back-references and arena-owned children of `item` are cleared; the
    /// returned id addresses a detached item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the item has an empty name.
    pub fn insert<T: ArenaItem>(&mut self, mut item: T) -> Result<T::Id> {
        require_name(item.name(), &T::Id::KIND.to_string())?;
        item.reset_links();
        let slots = T::slots_mut(&mut self.arena);
        let id = T::make_id(self.id, slots.len());
        slots.push(item);
        Ok(id)
    }

    /// Borrow an item.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` when `id` was issued by another schema.
    pub fn get<I: ArenaId>(&self, id: I) -> Result<&I::Item> {
        if id.schema() != self.id {
            return Err(EdmError::unknown_item(I::KIND, id));
        }
        <I::Item as ArenaItem>::slots(&self.arena)
            .get(id.index())
            .ok_or_else(|| EdmError::unknown_item(I::KIND, id))
    }

    /// Mutably borrow an item.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` when `id` was issued by another schema.
    pub fn get_mut<I: ArenaId>(&mut self, id: I) -> Result<&mut I::Item> {
        if id.schema() != self.id {
            return Err(EdmError::unknown_item(I::KIND, id));
        }
        <I::Item as ArenaItem>::slots_mut(&mut self.arena)
            .get_mut(id.index())
            .ok_or_else(|| EdmError::unknown_item(I::KIND, id))
    }

    /// Every slot of a kind, attached or not, with its id
    pub fn slots<T: ArenaItem>(&self) -> impl Iterator<Item = (T::Id, &T)> + '_ {
        let schema = self.id;
        T::slots(&self.arena)
            .iter()
            .enumerate()
            .map(move |(index, item)| (T::make_id(schema, index), item))
    }

    /// Resolved id of `reference`, checked against this arena.
    ///
    /// # Errors
    ///
    /// `UnresolvedReference` for a placeholder, `UnknownItem` for a foreign id.
    pub fn deref<I: ArenaId>(&self, reference: &ItemRef<I>) -> Result<(I, &I::Item)> {
        let id = reference.require()?;
        Ok((id, self.get(id)?))
    }

    /// Qualified name a reference points at, resolved or not
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` when a resolved id was issued by another schema.
    pub fn ref_name<I: ArenaId>(&self, reference: &ItemRef<I>) -> Result<QualifiedName> {
        match reference {
            ItemRef::Resolved(id) => Ok(self.get(*id)?.qualified_name()),
            ItemRef::Unresolved(name) => Ok(name.clone()),
        }
    }

    /// Whether `reference` designates the item `id`, by identity when
    /// resolved and by name otherwise
    #[must_use]
    pub fn refers_to<I: ArenaId>(&self, reference: &ItemRef<I>, id: I) -> bool {
        match reference {
            ItemRef::Resolved(target) => *target == id,
            ItemRef::Unresolved(name) => self
                .get(id)
                .is_ok_and(|item| item.has_same_name(name as &dyn NamedItem)),
        }
    }

    // ------------------------------------------------------------------
    // schema membership
    // ------------------------------------------------------------------

    /// Attach a detached item to this schema.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the item already belongs to a schema.
    pub fn add<T: ModelMember>(&mut self, id: T::Id) -> Result<()> {
        let schema = self.id;
        let item = self.get_mut(id)?;
        if let Some(owner) = *item.model_mut() {
            return Err(EdmError::invariant(format!(
                "{} '{}' is already registered in {owner}",
                T::Id::KIND,
                item.full_name()
            )));
        }
        *item.model_mut() = Some(schema);
        T::registry_mut(self).insert(id);
        tracing::debug!("Attached {} {} to {}", T::Id::KIND, id, schema);
        Ok(())
    }

    /// Detach an item from this schema; its slot stays addressable.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the item is not registered here.
    pub fn remove<T: ModelMember>(&mut self, id: T::Id) -> Result<()> {
        let schema = self.id;
        let registered = T::registry(self).contains(&id);
        let item = self.get_mut(id)?;
        if *item.model_mut() != Some(schema) || !registered {
            return Err(EdmError::invariant(format!(
                "{} '{}' is not registered in {schema}",
                T::Id::KIND,
                item.full_name()
            )));
        }
        *item.model_mut() = None;
        T::registry_mut(self).shift_remove(&id);
        tracing::debug!("Detached {} {} from {}", T::Id::KIND, id, schema);
        Ok(())
    }

    /// [`insert`](Self::insert) followed by [`add`](Self::add)
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn create<T: ModelMember>(&mut self, item: T) -> Result<T::Id> {
        let id = self.insert(item)?;
        self.add::<T>(id)?;
        Ok(id)
    }

    /// Registered items of a kind, in insertion order
    pub fn members<T: ModelMember>(&self) -> impl Iterator<Item = (T::Id, &T)> + '_ {
        T::registry(self)
            .iter()
            .filter_map(|id| self.get(*id).ok().map(|item| (*id, item)))
    }

    pub fn add_entity_type(&mut self, id: EntityTypeId) -> Result<()> {
        self.add::<EntityType>(id)
    }

    pub fn remove_entity_type(&mut self, id: EntityTypeId) -> Result<()> {
        self.remove::<EntityType>(id)
    }

    pub fn add_complex_type(&mut self, id: ComplexTypeId) -> Result<()> {
        self.add::<ComplexType>(id)
    }

    pub fn remove_complex_type(&mut self, id: ComplexTypeId) -> Result<()> {
        self.remove::<ComplexType>(id)
    }

    pub fn add_enum_type(&mut self, id: EnumTypeId) -> Result<()> {
        self.add::<EnumType>(id)
    }

    pub fn remove_enum_type(&mut self, id: EnumTypeId) -> Result<()> {
        self.remove::<EnumType>(id)
    }

    pub fn add_association_type(&mut self, id: AssociationTypeId) -> Result<()> {
        self.add::<AssociationType>(id)
    }

    pub fn remove_association_type(&mut self, id: AssociationTypeId) -> Result<()> {
        self.remove::<AssociationType>(id)
    }

    pub fn add_function(&mut self, id: FunctionId) -> Result<()> {
        self.add::<Function>(id)
    }

    pub fn remove_function(&mut self, id: FunctionId) -> Result<()> {
        self.remove::<Function>(id)
    }

    pub fn add_entity_container(&mut self, id: EntityContainerId) -> Result<()> {
        self.add::<EntityContainer>(id)
    }

    pub fn remove_entity_container(&mut self, id: EntityContainerId) -> Result<()> {
        self.remove::<EntityContainer>(id)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = (EntityTypeId, &EntityType)> + '_ {
        self.members::<EntityType>()
    }

    pub fn complex_types(&self) -> impl Iterator<Item = (ComplexTypeId, &ComplexType)> + '_ {
        self.members::<ComplexType>()
    }

    pub fn enum_types(&self) -> impl Iterator<Item = (EnumTypeId, &EnumType)> + '_ {
        self.members::<EnumType>()
    }

    pub fn association_types(
        &self,
    ) -> impl Iterator<Item = (AssociationTypeId, &AssociationType)> + '_ {
        self.members::<AssociationType>()
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> + '_ {
        self.members::<Function>()
    }

    pub fn entity_containers(
        &self,
    ) -> impl Iterator<Item = (EntityContainerId, &EntityContainer)> + '_ {
        self.members::<EntityContainer>()
    }

    /// Every registered top-level item as one closed sum type
    pub fn named_items(&self) -> impl Iterator<Item = NamedItemRef<'_>> + '_ {
        self.entity_containers()
            .map(|(_, c)| NamedItemRef::EntityContainer(c))
            .chain(self.entity_types().map(|(_, t)| NamedItemRef::EntityType(t)))
            .chain(self.complex_types().map(|(_, t)| NamedItemRef::ComplexType(t)))
            .chain(
                self.association_types()
                    .map(|(_, t)| NamedItemRef::AssociationType(t)),
            )
            .chain(self.functions().map(|(_, f)| NamedItemRef::Function(f)))
            .chain(self.enum_types().map(|(_, t)| NamedItemRef::EnumType(t)))
    }

    // ------------------------------------------------------------------
    // container membership
    // ------------------------------------------------------------------

    /// Attach a detached set or import to `container`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the member already has a container.
    pub fn add_to_container<T: ContainerMember>(
        &mut self,
        container: EntityContainerId,
        id: T::Id,
    ) -> Result<()> {
        self.get(container)?;
        let item = self.get_mut(id)?;
        if let Some(owner) = *item.container_mut() {
            return Err(EdmError::invariant(format!(
                "{} '{}' already belongs to container {owner}",
                T::Id::KIND,
                item.name()
            )));
        }
        *item.container_mut() = Some(container);
        T::members_mut(self.get_mut(container)?).push(id);
        tracing::debug!("Attached {} {} to {}", T::Id::KIND, id, container);
        Ok(())
    }

    /// Detach a set or import from `container`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the member does not belong to `container`.
    pub fn remove_from_container<T: ContainerMember>(
        &mut self,
        container: EntityContainerId,
        id: T::Id,
    ) -> Result<()> {
        let position = T::members(self.get(container)?)
            .iter()
            .position(|member| *member == id);
        let item = self.get_mut(id)?;
        let owned = *item.container_mut() == Some(container);
        let Some(position) = position.filter(|_| owned) else {
            return Err(EdmError::invariant(format!(
                "{} '{}' does not belong to container {container}",
                T::Id::KIND,
                item.name()
            )));
        };
        *item.container_mut() = None;
        T::members_mut(self.get_mut(container)?).remove(position);
        tracing::debug!("Detached {} {} from {}", T::Id::KIND, id, container);
        Ok(())
    }

    /// [`insert`](Self::insert) followed by [`add_to_container`](Self::add_to_container)
    ///
    /// # Errors
    ///
    /// Fails when the container is unknown or the item has no name.
    pub fn create_in<T: ContainerMember>(
        &mut self,
        container: EntityContainerId,
        item: T,
    ) -> Result<T::Id> {
        self.get(container)?;
        let id = self.insert(item)?;
        self.add_to_container::<T>(container, id)?;
        Ok(id)
    }

    pub fn add_entity_set(&mut self, container: EntityContainerId, id: EntitySetId) -> Result<()> {
        self.add_to_container::<EntitySet>(container, id)
    }

    pub fn remove_entity_set(
        &mut self,
        container: EntityContainerId,
        id: EntitySetId,
    ) -> Result<()> {
        self.remove_from_container::<EntitySet>(container, id)
    }

    pub fn add_association_set(
        &mut self,
        container: EntityContainerId,
        id: AssociationSetId,
    ) -> Result<()> {
        self.add_to_container::<AssociationSet>(container, id)
    }

    pub fn remove_association_set(
        &mut self,
        container: EntityContainerId,
        id: AssociationSetId,
    ) -> Result<()> {
        self.remove_from_container::<AssociationSet>(container, id)
    }

    pub fn add_function_import(
        &mut self,
        container: EntityContainerId,
        id: FunctionImportId,
    ) -> Result<()> {
        self.add_to_container::<FunctionImport>(container, id)
    }

    pub fn remove_function_import(
        &mut self,
        container: EntityContainerId,
        id: FunctionImportId,
    ) -> Result<()> {
        self.remove_from_container::<FunctionImport>(container, id)
    }

    /// Drop every memoized relationship view
    pub fn invalidate_relationships(&mut self) {
        for set in &mut self.arena.association_sets {
            set.invalidate_relationship();
        }
    }

    // ------------------------------------------------------------------
    // owned children
    // ------------------------------------------------------------------

    /// Append a property to an entity or complex type.
    ///
    /// # Errors
    ///
    /// Fails when the owner is unknown or the property has no name.
    pub fn add_property(
        &mut self,
        owner: impl Into<StructuralTypeId>,
        property: MemberProperty,
    ) -> Result<MemberPropertyId> {
        let owner = owner.into();
        self.own_properties(owner)?;
        let id = self.insert(property)?;
        match owner {
            StructuralTypeId::Entity(t) => self.get_mut(t)?.properties.push(id),
            StructuralTypeId::Complex(t) => self.get_mut(t)?.properties.push(id),
        }
        Ok(id)
    }

    /// Remove one of the owner's own properties.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when `owner` does not declare `property`.
    pub fn remove_property(
        &mut self,
        owner: impl Into<StructuralTypeId>,
        property: MemberPropertyId,
    ) -> Result<()> {
        let owner = owner.into();
        let properties = match owner {
            StructuralTypeId::Entity(t) => &mut self.get_mut(t)?.properties,
            StructuralTypeId::Complex(t) => &mut self.get_mut(t)?.properties,
        };
        let position = properties
            .iter()
            .position(|p| *p == property)
            .ok_or_else(|| {
                EdmError::invariant(format!("{property} is not declared by {owner}"))
            })?;
        properties.remove(position);
        Ok(())
    }

    /// Own property ids of an entity or complex type
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` for a foreign id.
    pub fn own_properties(&self, owner: impl Into<StructuralTypeId>) -> Result<&[MemberPropertyId]> {
        match owner.into() {
            StructuralTypeId::Entity(t) => Ok(self.get(t)?.properties()),
            StructuralTypeId::Complex(t) => Ok(self.get(t)?.properties()),
        }
    }

    /// Append a navigation property to an entity type.
    ///
    /// # Errors
    ///
    /// Fails when the owner is unknown or the property has no name.
    pub fn add_navigation_property(
        &mut self,
        owner: EntityTypeId,
        navigation: NavigationProperty,
    ) -> Result<NavigationPropertyId> {
        self.get(owner)?;
        let id = self.insert(navigation)?;
        self.get_mut(owner)?.navigation_properties.push(id);
        Ok(id)
    }

    /// Remove one of the owner's own navigation properties.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when `owner` does not declare `navigation`.
    pub fn remove_navigation_property(
        &mut self,
        owner: EntityTypeId,
        navigation: NavigationPropertyId,
    ) -> Result<()> {
        let list = &mut self.get_mut(owner)?.navigation_properties;
        let position = list
            .iter()
            .position(|n| *n == navigation)
            .ok_or_else(|| {
                EdmError::invariant(format!("{navigation} is not declared by {owner}"))
            })?;
        list.remove(position);
        Ok(())
    }

    /// Append an end to an association type and set its back-reference.
    ///
    /// # Errors
    ///
    /// Fails when the association is unknown or the role name is empty.
    pub fn add_association_end(
        &mut self,
        association: AssociationTypeId,
        end: AssociationEnd,
    ) -> Result<AssociationEndId> {
        self.get(association)?;
        let id = self.insert(end)?;
        self.get_mut(id)?.association = Some(association);
        self.get_mut(association)?.ends.push(id);
        tracing::debug!("Attached {} to {}", id, association);
        Ok(id)
    }

    /// Detach an end from its association type.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the end does not belong to `association`.
    pub fn remove_association_end(
        &mut self,
        association: AssociationTypeId,
        end: AssociationEndId,
    ) -> Result<()> {
        let position = self
            .get(association)?
            .ends
            .iter()
            .position(|e| *e == end)
            .filter(|_| {
                self.get(end)
                    .is_ok_and(|e| e.association == Some(association))
            })
            .ok_or_else(|| {
                EdmError::invariant(format!("{end} does not belong to {association}"))
            })?;
        self.get_mut(end)?.association = None;
        self.get_mut(association)?.ends.remove(position);
        tracing::debug!("Detached {} from {}", end, association);
        Ok(())
    }

    /// Install the referential constraint of an association type.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when one is already set, `InvalidArgument` when
    /// either end is missing.
    pub fn set_referential_constraint(
        &mut self,
        association: AssociationTypeId,
        constraint: ReferentialConstraint,
    ) -> Result<()> {
        if constraint.principal_end.is_none() || constraint.dependent_end.is_none() {
            return Err(EdmError::invalid_argument(
                "referential constraint requires a principal and a dependent end",
            ));
        }
        let target = self.get_mut(association)?;
        if target.referential_constraint.is_some() {
            return Err(EdmError::invariant(format!(
                "association '{}' already has a referential constraint",
                target.full_name()
            )));
        }
        target.referential_constraint = Some(constraint);
        Ok(())
    }

    /// Take the referential constraint off an association type
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` for a foreign id.
    pub fn remove_referential_constraint(
        &mut self,
        association: AssociationTypeId,
    ) -> Result<Option<ReferentialConstraint>> {
        Ok(self.get_mut(association)?.referential_constraint.take())
    }
}

/// Borrowed view of any top-level item, equal only to the same kind with the
/// same qualified name
#[derive(Clone, Copy, Debug)]
pub enum NamedItemRef<'a> {
    EntityContainer(&'a EntityContainer),
    EntityType(&'a EntityType),
    ComplexType(&'a ComplexType),
    AssociationType(&'a AssociationType),
    Function(&'a Function),
    EnumType(&'a EnumType),
}

impl NamedItemRef<'_> {
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::EntityContainer(_) => ItemKind::EntityContainer,
            Self::EntityType(_) => ItemKind::EntityType,
            Self::ComplexType(_) => ItemKind::ComplexType,
            Self::AssociationType(_) => ItemKind::AssociationType,
            Self::Function(_) => ItemKind::Function,
            Self::EnumType(_) => ItemKind::EnumType,
        }
    }

    fn inner(&self) -> &dyn NamedItem {
        match *self {
            Self::EntityContainer(item) => item,
            Self::EntityType(item) => item,
            Self::ComplexType(item) => item,
            Self::AssociationType(item) => item,
            Self::Function(item) => item,
            Self::EnumType(item) => item,
        }
    }
}

impl NamedItem for NamedItemRef<'_> {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn namespace(&self) -> Option<&str> {
        self.inner().namespace()
    }
}

impl PartialEq for NamedItemRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.inner().has_same_name(other.inner())
    }
}

impl Eq for NamedItemRef<'_> {}

impl std::hash::Hash for NamedItemRef<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        state.write_u64(self.name_hash());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::EndMultiplicity;
    use crate::data_type::{DataType, PrimitiveKind};
    use pretty_assertions::assert_eq;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn schema_add_and_remove_maintain_back_reference() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let customer = schema.insert(EntityType::new("Customer").with_namespace("NS"))?;
        assert_eq!(schema.get(customer)?.model(), None);

        schema.add_entity_type(customer)?;
        assert_eq!(schema.get(customer)?.model(), Some(schema.id()));
        assert_eq!(schema.entity_types().count(), 1);

        let err = schema.add_entity_type(customer).unwrap_err();
        assert!(err.is_invariant_violation());

        schema.remove_entity_type(customer)?;
        assert_eq!(schema.get(customer)?.model(), None);
        assert_eq!(schema.entity_types().count(), 0);
        assert!(schema.remove_entity_type(customer).is_err());
        Ok(())
    }

    #[test]
    fn container_add_then_remove_leaves_set_detached() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let container = schema.create(EntityContainer::new("Db"))?;
        let set = schema.insert(EntitySet::new("Customers", ItemRef::named("NS.Customer")))?;

        schema.add_entity_set(container, set)?;
        assert_eq!(schema.get(set)?.container(), Some(container));
        assert_eq!(schema.get(container)?.entity_sets(), &[set]);

        schema.remove_entity_set(container, set)?;
        assert_eq!(schema.get(set)?.container(), None);
        assert!(schema.get(container)?.entity_sets().is_empty());
        Ok(())
    }

    #[test]
    fn second_container_rejects_owned_set() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let first = schema.create(EntityContainer::new("First"))?;
        let second = schema.create(EntityContainer::new("Second"))?;
        let set = schema.create_in(first, EntitySet::new("Orders", ItemRef::named("NS.Order")))?;

        let err = schema.add_entity_set(second, set).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(schema.get(second)?.entity_sets().is_empty());
        assert_eq!(schema.get(set)?.container(), Some(first));

        assert!(schema.remove_entity_set(second, set).is_err());
        Ok(())
    }

    #[test]
    fn ids_are_scoped_to_their_schema() -> TestResult {
        let mut a = EntityModelSchema::new();
        let b = EntityModelSchema::new();
        let id = a.insert(ComplexType::new("Address"))?;
        assert!(a.get(id).is_ok());
        assert!(matches!(b.get(id), Err(EdmError::UnknownItem { .. })));
        Ok(())
    }

    #[test]
    fn empty_names_are_rejected_before_insertion() {
        let mut schema = EntityModelSchema::new();
        assert!(schema.insert(EntityType::new("")).is_err());
        assert_eq!(schema.slots::<EntityType>().count(), 0);
    }

    #[test]
    fn association_end_back_reference_and_other_end() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let assoc = schema.create(AssociationType::new("CustomerOrders").with_namespace("NS"))?;
        let c = schema.add_association_end(
            assoc,
            AssociationEnd::new("Customer", ItemRef::named("NS.Customer"), EndMultiplicity::One),
        )?;
        let o = schema.add_association_end(
            assoc,
            AssociationEnd::new("Orders", ItemRef::named("NS.Order"), EndMultiplicity::Many),
        )?;

        assert_eq!(schema.get(c)?.association(), Some(assoc));
        assert_eq!(schema.get(assoc)?.other_end(c)?, o);

        schema.remove_association_end(assoc, o)?;
        assert_eq!(schema.get(o)?.association(), None);
        assert!(schema.get(assoc)?.other_end(c).is_err());

        let empty = schema.create(AssociationType::new("Empty"))?;
        let err = schema.get(empty)?.other_end(c).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("found none"));

        let triple = schema.create(AssociationType::new("Triple"))?;
        let mut ends = Vec::new();
        for role in ["A", "B", "C"] {
            ends.push(schema.add_association_end(
                triple,
                AssociationEnd::new(role, ItemRef::named("NS.Customer"), EndMultiplicity::Many),
            )?);
        }
        let err = schema.get(triple)?.other_end(ends[0]).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("found 2"));
        Ok(())
    }

    #[test]
    fn restore_returns_to_checkpoint() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let customer = schema.create(EntityType::new("Customer"))?;
        let checkpoint = schema.checkpoint();

        schema.remove_entity_type(customer)?;
        let order = schema.create(EntityType::new("Order"))?;
        schema.restore(checkpoint)?;

        assert_eq!(schema.get(customer)?.model(), Some(schema.id()));
        assert_eq!(schema.entity_types().count(), 1);
        assert!(matches!(schema.get(order), Err(EdmError::UnknownItem { .. })));

        let other = EntityModelSchema::new();
        assert!(schema.restore(other.checkpoint()).is_err());
        Ok(())
    }

    #[test]
    fn second_referential_constraint_is_rejected() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let assoc = schema.create(AssociationType::new("A"))?;
        let rc = || {
            ReferentialConstraint::new()
                .with_principal(ItemRef::named("P"), [ItemRef::named("Id")])
                .with_dependent(ItemRef::named("D"), [ItemRef::named("PId")])
        };
        schema.set_referential_constraint(assoc, rc())?;
        assert!(
            schema
                .set_referential_constraint(assoc, rc())
                .unwrap_err()
                .is_invariant_violation()
        );
        assert!(
            schema
                .set_referential_constraint(assoc, ReferentialConstraint::new())
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn properties_are_owned_in_order() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let t = schema.create(EntityType::new("T"))?;
        let id = schema.add_property(
            t,
            MemberProperty::new("Id", DataType::primitive(PrimitiveKind::Int32)).primary_key(),
        )?;
        let name = schema.add_property(
            t,
            MemberProperty::new("Name", DataType::primitive(PrimitiveKind::String)),
        )?;
        assert_eq!(schema.own_properties(t)?, &[id, name]);

        schema.remove_property(t, id)?;
        assert_eq!(schema.own_properties(t)?, &[name]);
        assert!(schema.remove_property(t, id).is_err());
        Ok(())
    }

    #[test]
    fn named_item_refs_compare_kind_and_name() -> TestResult {
        let mut schema = EntityModelSchema::new();
        schema.create(EntityType::new("Thing").with_namespace("NS"))?;
        schema.create(ComplexType::new("Thing").with_namespace("NS"))?;

        let items: Vec<_> = schema.named_items().collect();
        assert_eq!(items.len(), 2);
        assert_ne!(items[0], items[1]);
        assert_eq!(items[0].full_name(), items[1].full_name());

        let other = EntityType::new("Thing").with_namespace("NS");
        assert_eq!(items[0], NamedItemRef::EntityType(&other));
        Ok(())
    }

    #[test]
    fn refers_to_matches_placeholders_by_name() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let t = schema.create(EntityType::new("Customer").with_namespace("NS"))?;
        assert!(schema.refers_to(&ItemRef::named("NS.Customer"), t));
        assert!(!schema.refers_to(&ItemRef::named("Customer"), t));
        assert!(schema.refers_to(&ItemRef::Resolved(t), t));
        assert_eq!(
            schema.ref_name(&ItemRef::Resolved(t))?.full_name(),
            "NS.Customer"
        );
        Ok(())
    }
}
