use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::columns::SemanticField;

/// One row of a source file, or one scraped page: an ordered header -> value
/// mapping. Headers are untrusted (arbitrary casing, language, punctuation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.fields.push((header.into(), value.into()));
    }

    /// Exact-header lookup. Semantic lookup goes through the column resolver.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Provenance of one technical spec value. The merge resolver relies on this
/// ordering: structured beats text-extracted beats generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecSource {
    Structured,
    TextExtracted,
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecValue {
    pub value: String,
    pub source: SpecSource,
}

impl SpecValue {
    pub fn structured(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: SpecSource::Structured,
        }
    }

    pub fn extracted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: SpecSource::TextExtracted,
        }
    }
}

/// Canonical output of normalization. Immutable after the normalization stage
/// except for the late merge of `technical_specs` once generation completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub sku: String,
    pub title: String,
    /// HTML-free plain text.
    pub description: String,
    pub brand: String,
    pub marketplace_title_v1: String,
    pub marketplace_title_v2: String,
    pub technical_specs: BTreeMap<SemanticField, SpecValue>,
    pub category: String,
    pub is_duplicate: bool,
    /// Model/article codes retained for title synthesis and prompts, at most three.
    pub model_codes: Vec<String>,
}

/// Assembled generation output for one record. Consumed by the merge resolver
/// and the renderer, then discarded once the HTML fragment exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCopy {
    pub narrative: String,
    /// Exactly five after template padding.
    pub usp_bullets: Vec<String>,
    /// Generated half of the tech specs, pre-merge, keyed by label.
    pub technical_specs: BTreeMap<String, String>,
    pub safety_notice: Option<String>,
    pub package_contents: Option<String>,
    pub product_highlights: Vec<String>,
}
