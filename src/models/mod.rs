//! Typed repository documents and resolver output records.
//!
//! Every YAML document is parsed straight into one of these structures. Unknown
//! keys are rejected so that a typo such as `parameter:` surfaces as a
//! `StructureError` instead of silently dropping data.
//!
//! | File | Type |
//! |---|---|
//! | `constellation.yaml` | [`ConstellationDocument`] |
//! | `cluster.yaml` | [`ClusterDocument`] |
//! | `applications/<app>.yaml` | [`ApplicationDocument`] |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::variables::VariableScope;

/// Raw YAML value as found in parameters and variables.
pub type Value = serde_yaml::Value;

/// Parameter name to value, sorted by name.
pub type Parameters = BTreeMap<String, Value>;

/// `constellation.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstellationDocument {
    /// Variables shared by every member cluster.
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: VariableScope,
}

/// `cluster.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterDocument {
    /// Declared parent constellation; absent for standalone clusters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constellation: Option<String>,

    /// Cluster variables; these override constellation variables.
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: VariableScope,
}

/// `applications/<app>.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationDocument {
    /// Application name, unique within its declaring scope.
    pub name: String,

    /// Template path relative to `templates/`.
    pub template: String,

    /// Raw parameter values, possibly containing interpolation tokens.
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Parameters,
}

impl ApplicationDocument {
    /// Check field contents that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("field 'name' must not be empty".to_string());
        }
        if self.template.trim().is_empty() {
            return Err("field 'template' must not be empty".to_string());
        }
        Ok(())
    }

    /// Template reference with surrounding slashes removed.
    #[must_use]
    pub fn template_ref(&self) -> &str {
        self.template.trim().trim_matches('/')
    }
}

/// A fully-resolved application bound to one cluster.
///
/// Produced by the materializer; `parameters` contains no interpolation tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedApplication {
    /// Cluster identifier
    pub cluster: String,
    /// Application name
    pub name: String,
    /// Template reference, relative to `templates/`
    pub template: String,
    /// Fully-interpolated parameters
    pub parameters: Parameters,
}

/// Parse a YAML document, treating an empty file as an empty mapping.
///
/// # Errors
///
/// Returns the YAML error, which carries line and column information.
pub fn parse_document<T>(content: &str) -> Result<T, serde_yaml::Error>
where
    T: DeserializeOwned,
{
    if content.trim().is_empty() {
        serde_yaml::from_str("{}")
    } else {
        serde_yaml::from_str(content)
    }
}

// `variables:` with no value parses as null
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
