//! # EDM Service
//!
//! Operations over an [`edm_core`] schema graph that the model types do not
//! carry in their own interface.
//!
//! ## Overview
//!
//! - **Reference resolution**: a [`SchemaFixup`](fixup::SchemaFixup) that
//!   replaces name-only placeholders with ids, full name first and unique
//!   short name second
//! - **Fixup pipeline**: fixups ordered by their declared dependencies
//! - **Relationship views**: two-sided views of association sets, derived
//!   once and memoized on the set
//! - **Deep clone**: an independent copy whose links are placeholders again
//! - **Validation**: structural checks collected into a report
//!
//! ## Quick Start
//!
//! ```rust
//! use edm_core::prelude::*;
//! use edm_service::EdmService;
//!
//! fn main() -> Result<()> {
//!     let service = EdmService::new(EdmConfig::default())?;
//!     let mut schema = EntityModelSchema::new();
//!
//!     let customer = schema.create(EntityType::new("Customer").with_namespace("Sales"))?;
//!     schema.add_property(
//!         customer,
//!         MemberProperty::new("Id", DataType::primitive(PrimitiveKind::Int32)).primary_key(),
//!     )?;
//!     schema.create(EntityType::new("Vip").with_base_type(ItemRef::named("Sales.Customer")))?;
//!
//!     service.resolve(&mut schema)?;
//!     assert!(service.validate(&schema)?.is_valid);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)] // static regex patterns are known to compile

/// Schema fixups and their dependency-ordered pipeline
pub mod fixup;

/// Full-name and short-name lookup of registered items
pub mod lookup;

/// Placeholder resolution fixup
pub mod resolve;

/// Relationship view derivation and memoization
pub mod relationship;

/// Deep clone of a schema graph
pub mod clone;

/// Structural schema validation
pub mod validation;

/// Configured facade over the operations above
pub mod service;

pub use clone::deep_clone;
pub use fixup::{FixupPipeline, SchemaFixup, apply_fixups};
pub use lookup::NameIndex;
pub use relationship::{container_relationships, relationship_type};
pub use resolve::ResolveReferencesFixup;
pub use service::EdmService;
pub use validation::SchemaValidator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clone::deep_clone;
    pub use crate::fixup::{FixupPipeline, SchemaFixup, apply_fixups};
    pub use crate::lookup::{KindIndex, NameIndex};
    pub use crate::relationship::{container_relationships, relationship_type};
    pub use crate::resolve::ResolveReferencesFixup;
    pub use crate::service::EdmService;
    pub use crate::validation::SchemaValidator;
    pub use edm_core::prelude::*;
}
