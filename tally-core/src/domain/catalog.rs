//! Reference catalog
//!
//! Sources, styles and parsing modes published by the backend. A launch
//! descriptor is only valid relative to a catalog fetched beforehand.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{DescriptorError, OptionValue};

/// A site or feed the backend knows how to parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingSource {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// A parsing profile (how deep to go, whether to fetch images)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingStyle {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub deep_details: bool,
}

/// A parsing mode with its parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingMode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

impl ParsingMode {
    /// Default value of every parameter that declares one
    pub fn defaults(&self) -> BTreeMap<String, OptionValue> {
        self.params
            .iter()
            .filter_map(|(name, spec)| spec.default.clone().map(|value| (name.clone(), value)))
            .collect()
    }
}

/// Declared type of a mode parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    String,
    #[serde(alias = "bool")]
    Boolean,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Number => "number",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Schema entry for one mode parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(default)]
    pub default: Option<OptionValue>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    /// Checks a submitted value against this entry
    ///
    /// Numeric bounds are inclusive. Values outside them are rejected, not
    /// clamped.
    pub fn check(&self, name: &str, value: &OptionValue) -> Result<(), DescriptorError> {
        if value.kind() != self.kind {
            return Err(DescriptorError::TypeMismatch {
                option: name.to_string(),
                expected: self.kind,
                found: value.kind(),
            });
        }

        if let OptionValue::Number(number) = value {
            if !number.is_finite() {
                return Err(DescriptorError::NotFinite(name.to_string()));
            }

            let below = self.min.is_some_and(|min| *number < min);
            let above = self.max.is_some_and(|max| *number > max);
            if below || above {
                return Err(DescriptorError::OutOfRange {
                    option: name.to_string(),
                    value: *number,
                    min: self.min,
                    max: self.max,
                });
            }
        }

        Ok(())
    }
}

/// Sources, styles and modes fetched together from the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    pub sources: Vec<ParsingSource>,
    pub styles: Vec<ParsingStyle>,
    pub modes: Vec<ParsingMode>,
}

impl ReferenceCatalog {
    pub fn source(&self, id: i64) -> Option<&ParsingSource> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn style(&self, id: i64) -> Option<&ParsingStyle> {
        self.styles.iter().find(|style| style.id == id)
    }

    pub fn mode(&self, id: &str) -> Option<&ParsingMode> {
        self.modes.iter().find(|mode| mode.id == id)
    }
}
