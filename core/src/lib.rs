//! # EDM Core
//!
//! Object model of a conceptual Entity Data Model schema.
//!
//! This crate provides the mutable schema graph: named structural types,
//! enums, associations, containers and functions, stored in an arena owned
//! by [`EntityModelSchema`] and addressed through typed ids.
//!
//! ## Design Principles
//!
//! - **Arena ownership**: back-references are ids checked by the arena, never
//!   shared mutable pointers
//! - **Two-phase authoring**: links start as name-only placeholders and are
//!   resolved by an explicit pass
//! - **Name identity**: items compare and hash by kind, name and namespace
//! - **Layering**: derivation, clone and resolution live in `edm-service`

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)] // Documentation is covered by module-level docs

/// Core error types for schema operations
pub mod error;

/// Typed arena identifiers
pub mod ids;

/// Names, name hashing and placeholder references
pub mod names;

/// Annotation support for model items
pub mod annotations;

/// Primitive and composite data types
pub mod data_type;

/// Entity, complex and row types with their members
pub mod structural;

/// Enumeration types
pub mod enum_type;

/// Association types, ends and referential constraints
pub mod association;

/// Functions and parameters
pub mod function;

/// Entity containers, entity sets, association sets and function imports
pub mod container;

/// Relationship view data types
pub mod relationship;

/// Schema root and item arena
pub mod schema;

/// Inheritance-derived views
pub mod inheritance;

/// Configuration types for schema services
pub mod config;

/// Validation report types
pub mod validation;

// Re-export commonly used types
pub use config::EdmConfig;
pub use error::{EdmError, Result};
pub use ids::{ItemId, ItemKind, SchemaId};
pub use names::{ItemRef, NamedItem, QualifiedName};
pub use schema::{EntityModelSchema, NamedItemRef, SchemaCheckpoint};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotations::{
        Annotatable, Annotation, AnnotationValue, Annotations, CustomAnnotationSerializer,
        KeyValueAnnotation, TagAnnotation,
    };
    pub use crate::association::{
        AssociationEnd, AssociationType, EndMultiplicity, OperationAction, ReferentialConstraint,
    };
    pub use crate::config::EdmConfig;
    pub use crate::container::{
        AssociationSet, AssociationSetEnd, EntityContainer, EntitySet, FunctionImport,
        FunctionImportReturnType,
    };
    pub use crate::data_type::{DataType, PrimitiveDataType, PrimitiveKind};
    pub use crate::enum_type::{EnumMember, EnumType};
    pub use crate::error::{EdmError, Result};
    pub use crate::function::{Function, FunctionParameter, FunctionParameterMode};
    pub use crate::ids::*;
    pub use crate::names::{ItemRef, NamedItem, QualifiedName};
    pub use crate::relationship::{
        MultiplicityPattern, RelationshipSideView, RelationshipType, SideIndex,
    };
    pub use crate::schema::{ArenaId, ArenaItem, EntityModelSchema, NamedItemRef, SchemaCheckpoint};
    pub use crate::structural::{
        ComplexType, EdmUniqueConstraint, EntityType, MemberProperty, NavigationProperty, RowType,
    };
    pub use crate::validation::{
        ValidationMessage, ValidationReport, ValidationSeverity, ValidationSummary,
    };
}
