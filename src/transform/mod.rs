//! Transform registry - per-file-type text rewriting before extraction
//!
//! A transform neutralizes source-language syntax that would otherwise glue
//! class names to markers the extractor cannot split on, e.g. Leptos'
//! `class:hidden=move || ...` attribute form.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::ConfigurationError;
use crate::core::model::FileType;

/// A pure, total text-to-text rewrite.
///
/// Implementations must return the same output for the same input and must
/// not panic on any valid UTF-8 input.
pub trait TextTransform: Send + Sync {
    fn apply(&self, text: &str) -> String;
}

/// Returns the text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TextTransform for Identity {
    fn apply(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Regex substitution over the whole text
#[derive(Debug, Clone)]
pub struct ReplacePattern {
    regex: Regex,
    replacement: String,
}

impl ReplacePattern {
    pub fn new(regex: Regex, replacement: impl Into<String>) -> Self {
        Self {
            regex,
            replacement: replacement.into(),
        }
    }
}

impl TextTransform for ReplacePattern {
    fn apply(&self, text: &str) -> String {
        // NoExpand: the replacement is literal, `$` has no meaning
        self.regex
            .replace_all(text, regex::NoExpand(&self.replacement))
            .into_owned()
    }
}

/// Replaces each literal marker with a single space
#[derive(Debug, Clone)]
pub struct StripMarkers {
    markers: Vec<String>,
}

impl StripMarkers {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl TextTransform for StripMarkers {
    fn apply(&self, text: &str) -> String {
        self.markers
            .iter()
            .fold(text.to_string(), |acc, marker| acc.replace(marker.as_str(), " "))
    }
}

/// Declarative transform description as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformSpec {
    Identity,
    Replace {
        pattern: String,
        #[serde(default = "default_replacement")]
        replacement: String,
    },
    Strip {
        markers: Vec<String>,
    },
}

fn default_replacement() -> String {
    " ".to_string()
}

impl TransformSpec {
    /// Build the transform, validating it for `file_type`
    pub fn build(&self, file_type: &str) -> Result<Box<dyn TextTransform>, ConfigurationError> {
        match self {
            TransformSpec::Identity => Ok(Box::new(Identity)),
            TransformSpec::Replace {
                pattern,
                replacement,
            } => {
                let regex = Regex::new(pattern).map_err(|source| {
                    ConfigurationError::InvalidTransformPattern {
                        file_type: file_type.to_string(),
                        source,
                    }
                })?;
                Ok(Box::new(ReplacePattern::new(regex, replacement.clone())))
            }
            TransformSpec::Strip { markers } => {
                if markers.is_empty() || markers.iter().any(|m| m.is_empty()) {
                    return Err(ConfigurationError::InvalidTransform {
                        file_type: file_type.to_string(),
                        reason: "strip transform needs non-empty markers".to_string(),
                    });
                }
                Ok(Box::new(StripMarkers::new(markers.clone())))
            }
        }
    }
}

/// Maps file types to transforms; unregistered types get [`Identity`].
#[derive(Default)]
pub struct TransformRegistry {
    transforms: BTreeMap<FileType, Box<dyn TextTransform>>,
}

static IDENTITY: Identity = Identity;

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration.
    ///
    /// Values are raw TOML so that a non-table entry (e.g. a bare string)
    /// is reported against its file type instead of as a generic parse
    /// failure.
    pub fn from_config(
        entries: &BTreeMap<String, toml::Value>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for (file_type, value) in entries {
            let key = file_type.trim_start_matches('.');
            if key.is_empty() {
                return Err(ConfigurationError::InvalidTransform {
                    file_type: file_type.clone(),
                    reason: "file type key is empty".to_string(),
                });
            }
            if !value.is_table() {
                return Err(ConfigurationError::InvalidTransform {
                    file_type: key.to_string(),
                    reason: format!("expected a transform table, found {}", value.type_str()),
                });
            }
            let spec: TransformSpec =
                value
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| ConfigurationError::InvalidTransform {
                        file_type: key.to_string(),
                        reason: e.message().to_string(),
                    })?;
            registry.register(FileType::named(key), spec.build(key)?);
        }
        Ok(registry)
    }

    /// Register a transform; a later registration for the same type wins
    pub fn register(&mut self, file_type: FileType, transform: Box<dyn TextTransform>) {
        self.transforms.insert(file_type, transform);
    }

    /// Transform for `file_type`, or identity
    pub fn resolve(&self, file_type: &FileType) -> &dyn TextTransform {
        match self.transforms.get(file_type) {
            Some(transform) => transform.as_ref(),
            None => &IDENTITY,
        }
    }

    pub fn contains(&self, file_type: &FileType) -> bool {
        self.transforms.contains_key(file_type)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("file_types", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}
