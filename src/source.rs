//! JSON source description
//!
//! The human-editable input for [`DatasetBuilder`]:
//!
//! ```json
//! {
//!   "name": "Sample",
//!   "published": "2026-01-01",
//!   "components": [{"name": "HardwarePlatform", "headers": ["User-Agent"],
//!                   "min_length": 0, "max_length": 512, "default_profile": 100}],
//!   "properties": [{"name": "IsMobile", "component": "HardwarePlatform",
//!                   "type": "bool", "default": "False"}],
//!   "profiles": [{"id": 101, "component": "HardwarePlatform",
//!                 "values": {"IsMobile": true, "Bearers": ["Wifi", "LTE"]}}],
//!   "signatures": [{"user_agent": "Mozilla/5.0 (iPhone; ...)", "rank": 10,
//!                   "profiles": [101], "patterns": {"HardwarePlatform": ["iPhone"]}}]
//! }
//! ```

use crate::builder::{DatasetBuilder, PropertyDef};
use crate::dataset::ValueType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_headers() -> Vec<String> {
    vec!["User-Agent".to_string()]
}

fn default_max_length() -> u32 {
    512
}

fn default_value_type() -> ValueType {
    ValueType::String
}

/// Component entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceComponent {
    /// Unique component name
    pub name: String,
    /// Headers read, highest priority first
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
    /// Pad shorter inputs to this length
    #[serde(default)]
    pub min_length: u32,
    /// Truncate longer inputs to this length
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    /// Profile id used when nothing matches
    #[serde(default)]
    pub default_profile: Option<u32>,
}

/// Property entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProperty {
    /// Unique property name
    pub name: String,
    /// Owning component
    pub component: String,
    /// Value type
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: ValueType,
    /// List-valued flag
    #[serde(default)]
    pub list: bool,
    /// Default value
    #[serde(default)]
    pub default: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
}

/// A property value as written in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceValue {
    /// `"Apple"`
    Text(String),
    /// `true`
    Bool(bool),
    /// `640` or `2.5`
    Number(serde_json::Number),
    /// `["Wifi", "LTE"]`
    List(Vec<String>),
}

impl SourceValue {
    /// Canonical string form(s) stored in the dataset
    fn strings(&self) -> Vec<String> {
        match self {
            SourceValue::Text(s) => vec![s.clone()],
            SourceValue::Bool(true) => vec!["True".to_string()],
            SourceValue::Bool(false) => vec!["False".to_string()],
            SourceValue::Number(n) => vec![n.to_string()],
            SourceValue::List(items) => items.clone(),
        }
    }
}

/// Profile entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    /// External profile id, unique and non-zero
    pub id: u32,
    /// Owning component
    pub component: String,
    /// Property assignments
    #[serde(default)]
    pub values: BTreeMap<String, SourceValue>,
}

/// Signature entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSignature {
    /// Training user agent
    pub user_agent: String,
    /// Specificity rank
    #[serde(default)]
    pub rank: u32,
    /// Profile ids, at most one per component
    #[serde(default)]
    pub profiles: Vec<u32>,
    /// Identifying substrings per component
    pub patterns: BTreeMap<String, Vec<String>>,
}

/// Complete source description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Dataset name
    pub name: String,
    /// Publication date
    #[serde(default)]
    pub published: String,
    /// Components in dataset order
    pub components: Vec<SourceComponent>,
    /// Properties
    #[serde(default)]
    pub properties: Vec<SourceProperty>,
    /// Profiles
    #[serde(default)]
    pub profiles: Vec<SourceProfile>,
    /// Signatures
    #[serde(default)]
    pub signatures: Vec<SourceSignature>,
}

impl Source {
    /// Parse a JSON description
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {}", path.display(), e),
            ))
        })?;
        Self::from_json(&json)
    }

    /// Feed every entry into a builder
    pub fn to_builder(&self) -> Result<DatasetBuilder> {
        let mut builder = DatasetBuilder::new(&self.name).with_published(&self.published);

        for component in &self.components {
            let headers: Vec<&str> = component.headers.iter().map(String::as_str).collect();
            builder.add_component(
                &component.name,
                &headers,
                component.min_length,
                component.max_length,
            )?;
        }

        for property in &self.properties {
            let mut def = PropertyDef::new(&property.name, &property.component, property.value_type);
            def.is_list = property.list;
            def.default_value = property.default.clone();
            def.description = property.description.clone();
            builder.add_property(def)?;
        }

        for profile in &self.profiles {
            let owned: Vec<(&str, String)> = profile
                .values
                .iter()
                .flat_map(|(name, value)| {
                    value
                        .strings()
                        .into_iter()
                        .map(move |v| (name.as_str(), v))
                })
                .collect();
            let pairs: Vec<(&str, &str)> = owned.iter().map(|(n, v)| (*n, v.as_str())).collect();
            builder.add_profile(&profile.component, profile.id, &pairs)?;
        }

        for component in &self.components {
            if let Some(id) = component.default_profile {
                builder.set_default_profile(&component.name, id)?;
            }
        }

        for signature in &self.signatures {
            let substrings: Vec<(&str, Vec<&str>)> = signature
                .patterns
                .iter()
                .map(|(component, subs)| {
                    (component.as_str(), subs.iter().map(String::as_str).collect())
                })
                .collect();
            let patterns: Vec<(&str, &[&str])> = substrings
                .iter()
                .map(|(component, subs)| (*component, subs.as_slice()))
                .collect();
            builder.add_signature(
                &signature.user_agent,
                signature.rank,
                &signature.profiles,
                &patterns,
            )?;
        }

        Ok(builder)
    }

    /// Compile straight to snapshot bytes
    pub fn build(&self) -> Result<Vec<u8>> {
        self.to_builder()?.build()
    }
}
