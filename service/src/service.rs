//! Service facade over a schema graph
//!
//! [`EdmService`] bundles the configured fixups, relationship derivation,
//! deep clone and validation behind one configuration value.

use std::sync::Arc;

use edm_core::config::EdmConfig;
use edm_core::ids::{AssociationSetId, EntityContainerId};
use edm_core::relationship::RelationshipType;
use edm_core::schema::EntityModelSchema;
use edm_core::validation::ValidationReport;
use edm_core::Result;

use crate::clone::deep_clone;
use crate::fixup::{FixupPipeline, SchemaFixup};
use crate::relationship::{container_relationships, relationship_type};
use crate::resolve::ResolveReferencesFixup;
use crate::validation::SchemaValidator;

/// Schema operations driven by an [`EdmConfig`]
#[derive(Debug)]
pub struct EdmService {
    config: EdmConfig,
    pipeline: FixupPipeline,
}

impl EdmService {
    /// Service with the reference-resolution fixup registered.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` does not validate.
    pub fn new(config: EdmConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = FixupPipeline::new()
            .with(ResolveReferencesFixup::new(config.resolution.clone()))?;
        Ok(Self { config, pipeline })
    }

    #[must_use]
    pub const fn config(&self) -> &EdmConfig {
        &self.config
    }

    /// Register an extra fixup to run with the resolution fixup.
    ///
    /// # Errors
    ///
    /// Fails when a fixup with the same name is registered.
    pub fn register_fixup(&mut self, fixup: impl SchemaFixup + 'static) -> Result<()> {
        self.pipeline.register(Box::new(fixup))
    }

    /// Run every registered fixup, resolution included.
    ///
    /// # Errors
    ///
    /// Stops at the first failing fixup.
    pub fn resolve(&self, schema: &mut EntityModelSchema) -> Result<()> {
        self.pipeline.run(schema)
    }

    /// Independent copy of `schema` whose links are placeholders.
    ///
    /// # Errors
    ///
    /// See [`deep_clone`].
    pub fn deep_clone(&self, schema: &EntityModelSchema) -> Result<EntityModelSchema> {
        deep_clone(schema, &self.config.clone)
    }

    /// Deep clone followed by the fixup pipeline
    ///
    /// # Errors
    ///
    /// See [`EdmService::deep_clone`] and [`EdmService::resolve`].
    pub fn clone_and_resolve(&self, schema: &EntityModelSchema) -> Result<EntityModelSchema> {
        let mut copy = self.deep_clone(schema)?;
        self.resolve(&mut copy)?;
        Ok(copy)
    }

    /// Memoized relationship view of an association set.
    ///
    /// # Errors
    ///
    /// See [`relationship_type`].
    pub fn relationship_type(
        &self,
        schema: &EntityModelSchema,
        set: AssociationSetId,
    ) -> Result<Arc<RelationshipType>> {
        relationship_type(schema, set, &self.config.relationship)
    }

    /// Relationship views of every association set in a container.
    ///
    /// # Errors
    ///
    /// See [`relationship_type`].
    pub fn container_relationships(
        &self,
        schema: &EntityModelSchema,
        container: EntityContainerId,
    ) -> Result<Vec<Arc<RelationshipType>>> {
        container_relationships(schema, container, &self.config.relationship)
    }

    /// Validation report for `schema`.
    ///
    /// # Errors
    ///
    /// See [`SchemaValidator::validate`].
    pub fn validate(&self, schema: &EntityModelSchema) -> Result<ValidationReport> {
        SchemaValidator::new(self.config.validation.clone()).validate(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_core::config::ValidationConfig;
    use edm_core::EdmError;

    #[test]
    fn invalid_config_is_rejected() {
        let config = EdmConfig {
            validation: ValidationConfig {
                max_messages: 0,
                ..ValidationConfig::default()
            },
            ..EdmConfig::default()
        };
        assert!(matches!(EdmService::new(config), Err(EdmError::Config(_))));
    }

    #[test]
    fn extra_fixups_must_have_unique_names() -> Result<()> {
        let mut service = EdmService::new(EdmConfig::default())?;
        let duplicate = service.register_fixup(ResolveReferencesFixup::default());
        assert!(duplicate.is_err());
        Ok(())
    }
}
