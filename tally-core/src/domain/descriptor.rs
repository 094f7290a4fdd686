//! Launch descriptors
//!
//! A [`JobDescriptor`] is what the general launch form submits: a source, a
//! style, an optional mode and a bag of typed options. It is validated
//! locally against a [`ReferenceCatalog`] before any request leaves the
//! console.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::domain::catalog::{ParamKind, ReferenceCatalog};

/// A single typed option value
///
/// Whole numbers go out as JSON integers (`7`, not `7.0`); the backend
/// declares integer parameters such as `days`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Largest magnitude an `f64` holds without losing integer precision
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Bool(value) => serializer.serialize_bool(*value),
            OptionValue::Number(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT => {
                serializer.serialize_i64(*value as i64)
            }
            OptionValue::Number(value) => serializer.serialize_f64(*value),
            OptionValue::Text(value) => serializer.serialize_str(value),
        }
    }
}

impl OptionValue {
    /// Interprets a raw `key=value` right-hand side
    ///
    /// `true`/`false` become booleans, anything that parses as a number
    /// becomes a number, the rest stays text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => raw
                .parse::<f64>()
                .map(OptionValue::Number)
                .unwrap_or_else(|_| OptionValue::Text(raw.to_string())),
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            OptionValue::Bool(_) => ParamKind::Boolean,
            OptionValue::Number(_) => ParamKind::Number,
            OptionValue::Text(_) => ParamKind::String,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", value),
            OptionValue::Number(value) => write!(f, "{}", value),
            OptionValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(value.into())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Number(value as f64)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// Input to a general launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub source_id: i64,
    pub style_id: i64,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl JobDescriptor {
    pub fn new(source_id: i64, style_id: i64) -> Self {
        Self {
            source_id,
            style_id,
            mode: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Checks the descriptor against a previously fetched catalog
    ///
    /// With a mode selected, every option must be declared by that mode.
    /// Without one, every option must be declared by at least one mode of
    /// the catalog and satisfy one of those declarations.
    pub fn validate(&self, catalog: &ReferenceCatalog) -> Result<(), DescriptorError> {
        let source = catalog
            .source(self.source_id)
            .ok_or(DescriptorError::UnknownSource(self.source_id))?;
        if !source.enabled {
            return Err(DescriptorError::SourceDisabled(self.source_id));
        }

        catalog
            .style(self.style_id)
            .ok_or(DescriptorError::UnknownStyle(self.style_id))?;

        match &self.mode {
            Some(mode_id) => {
                let mode = catalog
                    .mode(mode_id)
                    .ok_or_else(|| DescriptorError::UnknownMode(mode_id.clone()))?;

                for (name, value) in &self.options {
                    let spec = mode.params.get(name).ok_or_else(|| DescriptorError::UnknownOption {
                        option: name.clone(),
                        mode: Some(mode_id.clone()),
                    })?;
                    spec.check(name, value)?;
                }
            }
            None => {
                for (name, value) in &self.options {
                    let mut declarations = catalog.modes.iter().filter_map(|mode| mode.params.get(name));

                    let Some(first) = declarations.next() else {
                        return Err(DescriptorError::UnknownOption {
                            option: name.clone(),
                            mode: None,
                        });
                    };

                    if let Err(err) = first.check(name, value) {
                        if !declarations.any(|spec| spec.check(name, value).is_ok()) {
                            return Err(err);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reasons a descriptor is rejected before launch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("reference catalog has not been fetched yet")]
    CatalogMissing,

    #[error("unknown parsing source {0}")]
    UnknownSource(i64),

    #[error("parsing source {0} is disabled")]
    SourceDisabled(i64),

    #[error("unknown parsing style {0}")]
    UnknownStyle(i64),

    #[error("unknown parsing mode '{0}'")]
    UnknownMode(String),

    #[error("option '{option}' is not declared{}", mode_suffix(.mode))]
    UnknownOption {
        option: String,
        mode: Option<String>,
    },

    #[error("option '{option}' expects a {expected}, got a {found}")]
    TypeMismatch {
        option: String,
        expected: ParamKind,
        found: ParamKind,
    },

    #[error("option '{option}' = {value} is outside the allowed range{}", format_bounds(.min, .max))]
    OutOfRange {
        option: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("option '{0}' must be a finite number")]
    NotFinite(String),
}

fn mode_suffix(mode: &Option<String>) -> String {
    mode.as_ref()
        .map(|mode| format!(" by mode '{}'", mode))
        .unwrap_or_default()
}

fn format_bounds(min: &Option<f64>, max: &Option<f64>) -> String {
    match (*min, *max) {
        (Some(min), Some(max)) => format!(" [{}, {}]", min, max),
        (Some(min), None) => format!(" (>= {})", min),
        (None, Some(max)) => format!(" (<= {})", max),
        (None, None) => String::new(),
    }
}
