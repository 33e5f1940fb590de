//! Configuration types for schema services

use serde::{Deserialize, Serialize};

use crate::error::{EdmError, Result};

/// Main configuration for schema services
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdmConfig {
    /// Reference resolution
    pub resolution: ResolutionConfig,

    /// Deep clone
    pub clone: CloneConfig,

    /// Relationship view derivation
    pub relationship: RelationshipConfig,

    /// Schema validation
    pub validation: ValidationConfig,
}

impl EdmConfig {
    /// Parse and validate a YAML document
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed YAML and a configuration
    /// error when a value is out of range.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and a configuration
    /// error when a value is out of range.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`EdmError::Config`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_messages == 0 {
            return Err(EdmError::config(
                "validation.max_messages must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Reference resolution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Fall back to a unique short name when no full name matches
    pub short_name_fallback: bool,

    /// Fail when a placeholder matches nothing; otherwise leave it in place
    pub fail_on_unresolved: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            short_name_fallback: true,
            fail_on_unresolved: true,
        }
    }
}

/// Deep clone configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneConfig {
    /// Ask annotations for a deep copy instead of sharing them
    pub deep_clone_annotations: bool,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            deep_clone_annotations: true,
        }
    }
}

/// Relationship view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Fail when two navigation properties start at the same end
    pub reject_ambiguous_navigation: bool,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            reject_ambiguous_navigation: true,
        }
    }
}

/// Schema validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Check names against the identifier pattern
    pub check_identifiers: bool,

    /// Warn about root entity types without key properties
    pub require_keys_on_root_types: bool,

    /// Maximum messages to collect
    pub max_messages: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_identifiers: true,
            require_keys_on_root_types: true,
            max_messages: 1000,
        }
    }
}
