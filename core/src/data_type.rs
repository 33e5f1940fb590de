//! Data types of properties, parameters and return values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ComplexTypeId, EntityTypeId, EnumTypeId};
use crate::names::ItemRef;
use crate::structural::RowType;

/// Built-in scalar kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    Time,
    Geography,
    Geometry,
    Stream,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edm.{self:?}")
    }
}

/// A primitive type with its facets
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimitiveDataType {
    pub kind: PrimitiveKind,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_unicode: Option<bool>,
}

impl PrimitiveDataType {
    /// Nullable primitive without facets
    #[must_use]
    pub const fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            nullable: true,
            max_length: None,
            precision: None,
            scale: None,
            is_unicode: None,
        }
    }
}

/// Type of a property, parameter or return value
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    /// Scalar value
    Primitive(PrimitiveDataType),
    /// Instance of a complex type
    Complex {
        complex_type: ItemRef<ComplexTypeId>,
        nullable: bool,
    },
    /// Member of an enum type
    Enum {
        enum_type: ItemRef<EnumTypeId>,
        nullable: bool,
    },
    /// Entity instance
    Entity(ItemRef<EntityTypeId>),
    /// Reference to an entity instance
    Reference(ItemRef<EntityTypeId>),
    /// Collection of another data type
    Collection(Box<DataType>),
    /// Anonymous structural shape
    Row(RowType),
}

impl DataType {
    /// Nullable primitive of `kind`
    #[must_use]
    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(PrimitiveDataType::new(kind))
    }

    /// Nullable complex type value
    #[must_use]
    pub fn complex(complex_type: impl Into<ItemRef<ComplexTypeId>>) -> Self {
        Self::Complex {
            complex_type: complex_type.into(),
            nullable: true,
        }
    }

    /// Nullable enum value
    #[must_use]
    pub fn enumeration(enum_type: impl Into<ItemRef<EnumTypeId>>) -> Self {
        Self::Enum {
            enum_type: enum_type.into(),
            nullable: true,
        }
    }

    /// Entity value
    #[must_use]
    pub fn entity(entity_type: impl Into<ItemRef<EntityTypeId>>) -> Self {
        Self::Entity(entity_type.into())
    }

    /// Entity reference
    #[must_use]
    pub fn reference(entity_type: impl Into<ItemRef<EntityTypeId>>) -> Self {
        Self::Reference(entity_type.into())
    }

    /// Collection of `element`
    #[must_use]
    pub fn collection(element: Self) -> Self {
        Self::Collection(Box::new(element))
    }

    /// Set nullability where the type has it; other types are returned unchanged
    #[must_use]
    pub fn with_nullable(mut self, value: bool) -> Self {
        match &mut self {
            Self::Primitive(p) => p.nullable = value,
            Self::Complex { nullable, .. } | Self::Enum { nullable, .. } => *nullable = value,
            Self::Entity(_) | Self::Reference(_) | Self::Collection(_) | Self::Row(_) => {}
        }
        self
    }

    /// Whether values may be null; only primitives, complex and enum values carry the facet
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        match self {
            Self::Primitive(p) => p.nullable,
            Self::Complex { nullable, .. } | Self::Enum { nullable, .. } => *nullable,
            Self::Entity(_) | Self::Reference(_) | Self::Collection(_) | Self::Row(_) => false,
        }
    }

    /// Whether any name-only placeholder remains anywhere inside this type
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        match self {
            Self::Primitive(_) => false,
            Self::Complex { complex_type, .. } => !complex_type.is_resolved(),
            Self::Enum { enum_type, .. } => !enum_type.is_resolved(),
            Self::Entity(r) | Self::Reference(r) => !r.is_resolved(),
            Self::Collection(element) => element.has_placeholders(),
            Self::Row(row) => row
                .properties()
                .iter()
                .any(|p| p.data_type.has_placeholders()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullability_applies_to_faceted_types_only() {
        let dt = DataType::primitive(PrimitiveKind::Int32).with_nullable(false);
        assert!(!dt.is_nullable());

        let dt = DataType::enumeration(ItemRef::named("NS.Color")).with_nullable(false);
        assert!(!dt.is_nullable());

        let dt = DataType::collection(DataType::primitive(PrimitiveKind::String)).with_nullable(true);
        assert!(!dt.is_nullable());
    }

    #[test]
    fn placeholders_are_found_through_collections() {
        let dt = DataType::collection(DataType::complex(ItemRef::named("NS.Address")));
        assert!(dt.has_placeholders());
        assert!(!DataType::primitive(PrimitiveKind::Guid).has_placeholders());
    }

    #[test]
    fn primitive_display_uses_edm_prefix() {
        assert_eq!(PrimitiveKind::DateTimeOffset.to_string(), "Edm.DateTimeOffset");
    }
}
