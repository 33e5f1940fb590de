//! Typed identifiers for items stored in a schema arena
//!
//! Every id remembers the [`SchemaId`] of the arena that issued it, so an id
//! handed to the wrong schema is rejected instead of silently aliasing an
//! unrelated item.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`EntityModelSchema`](crate::schema::EntityModelSchema) arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(u64);

impl SchemaId {
    /// Allocate a process-unique schema id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema-{}", self.0)
    }
}

/// Closed set of item kinds stored in the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Entity type
    EntityType,
    /// Complex type
    ComplexType,
    /// Enum type
    EnumType,
    /// Association type
    AssociationType,
    /// One end of an association type
    AssociationEnd,
    /// Function
    Function,
    /// Entity container
    EntityContainer,
    /// Entity set
    EntitySet,
    /// Association set
    AssociationSet,
    /// Function import
    FunctionImport,
    /// Member property of a structural type
    MemberProperty,
    /// Navigation property of an entity type
    NavigationProperty,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EntityType => "entity type",
            Self::ComplexType => "complex type",
            Self::EnumType => "enum type",
            Self::AssociationType => "association type",
            Self::AssociationEnd => "association end",
            Self::Function => "function",
            Self::EntityContainer => "entity container",
            Self::EntitySet => "entity set",
            Self::AssociationSet => "association set",
            Self::FunctionImport => "function import",
            Self::MemberProperty => "member property",
            Self::NavigationProperty => "navigation property",
        };
        f.write_str(label)
    }
}

/// Common behaviour of every typed id
pub trait ItemId: Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display {
    /// Kind of the item this id addresses
    const KIND: ItemKind;

    /// Arena that issued the id
    fn schema(self) -> SchemaId;

    /// Slot index inside the arena
    fn index(self) -> usize;
}

macro_rules! item_id {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            schema: SchemaId,
            index: usize,
        }

        impl $name {
            pub(crate) const fn new(schema: SchemaId, index: usize) -> Self {
                Self { schema, index }
            }
        }

        impl ItemId for $name {
            const KIND: ItemKind = ItemKind::$kind;

            fn schema(self) -> SchemaId {
                self.schema
            }

            fn index(self) -> usize {
                self.index
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}@{}", stringify!($kind), self.index, self.schema)
            }
        }
    };
}

item_id!(
    /// Id of an [`EntityType`](crate::structural::EntityType)
    EntityTypeId => EntityType
);
item_id!(
    /// Id of a [`ComplexType`](crate::structural::ComplexType)
    ComplexTypeId => ComplexType
);
item_id!(
    /// Id of an [`EnumType`](crate::enum_type::EnumType)
    EnumTypeId => EnumType
);
item_id!(
    /// Id of an [`AssociationType`](crate::association::AssociationType)
    AssociationTypeId => AssociationType
);
item_id!(
    /// Id of an [`AssociationEnd`](crate::association::AssociationEnd)
    AssociationEndId => AssociationEnd
);
item_id!(
    /// Id of a [`Function`](crate::function::Function)
    FunctionId => Function
);
item_id!(
    /// Id of an [`EntityContainer`](crate::container::EntityContainer)
    EntityContainerId => EntityContainer
);
item_id!(
    /// Id of an [`EntitySet`](crate::container::EntitySet)
    EntitySetId => EntitySet
);
item_id!(
    /// Id of an [`AssociationSet`](crate::container::AssociationSet)
    AssociationSetId => AssociationSet
);
item_id!(
    /// Id of a [`FunctionImport`](crate::container::FunctionImport)
    FunctionImportId => FunctionImport
);
item_id!(
    /// Id of a [`MemberProperty`](crate::structural::MemberProperty)
    MemberPropertyId => MemberProperty
);
item_id!(
    /// Id of a [`NavigationProperty`](crate::structural::NavigationProperty)
    NavigationPropertyId => NavigationProperty
);

/// Either kind of named structural type, used wherever properties are owned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructuralTypeId {
    /// An entity type
    Entity(EntityTypeId),
    /// A complex type
    Complex(ComplexTypeId),
}

impl From<EntityTypeId> for StructuralTypeId {
    fn from(id: EntityTypeId) -> Self {
        Self::Entity(id)
    }
}

impl From<ComplexTypeId> for StructuralTypeId {
    fn from(id: ComplexTypeId) -> Self {
        Self::Complex(id)
    }
}

impl fmt::Display for StructuralTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => id.fmt(f),
            Self::Complex(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_ids_are_unique() {
        let a = SchemaId::next();
        let b = SchemaId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_from_different_schemas_differ() {
        let a = EntityTypeId::new(SchemaId::next(), 0);
        let b = EntityTypeId::new(SchemaId::next(), 0);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
        assert!(a.to_string().starts_with("EntityType#0@schema-"));
    }
}
