use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Mapping configuration
///
/// Shared by the metadata builder, the entity converter and the in-memory
/// store. Every field has a default, so a JSON document only needs the keys
/// it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Native key of id attributes declared without an explicit name
    pub default_id_column: String,

    /// Discriminator key of polymorphic parents declared without a column
    pub default_discriminator_column: String,

    /// Emit null attributes as explicit `Null` elements instead of skipping them
    pub materialize_nulls: bool,

    /// Whether LIKE conditions compare text case-sensitively
    pub case_sensitive_like: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            default_id_column: "_id".to_string(),
            default_discriminator_column: "dtype".to_string(),
            materialize_nulls: false,
            case_sensitive_like: true,
        }
    }
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default id column
    pub fn default_id_column(mut self, column: &str) -> Self {
        self.default_id_column = column.to_string();
        self
    }

    /// Set the default discriminator column
    pub fn default_discriminator_column(mut self, column: &str) -> Self {
        self.default_discriminator_column = column.to_string();
        self
    }

    pub fn materialize_nulls(mut self, materialize: bool) -> Self {
        self.materialize_nulls = materialize;
        self
    }

    pub fn case_sensitive_like(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_like = case_sensitive;
        self
    }

    /// Parse from a JSON document
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = MappingConfig::from_json(r#"{"default_id_column": "id"}"#)?;
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MappingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_id_column.trim().is_empty() {
            return Err(crate::core::MapperError::Configuration(
                "default_id_column cannot be empty".to_string(),
            ));
        }

        if self.default_discriminator_column.trim().is_empty() {
            return Err(crate::core::MapperError::Configuration(
                "default_discriminator_column cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
