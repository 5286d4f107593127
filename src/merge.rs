//! Priority merge of deterministic and generated technical specs.
//!
//! Per field: structured source data wins over values pattern-matched out of
//! free text, which win over generated values. The merge is field-local: one
//! field may resolve at tier 1 while its sibling resolves at tier 3.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::categorize::CategoryConfig;
use crate::columns::{SemanticField, normalize_key};
use crate::model::{NormalizedRecord, ProductCopy, SpecSource, SpecValue};

/// Folded forms of values that mean "no value" at every tier, so a
/// lower-priority tier can still fill the slot.
const NON_ANSWERS: [&str; 8] = [
    "na",
    "ka",
    "unknown",
    "unbekannt",
    "notspecified",
    "keineangabe",
    "nichtangegeben",
    "nichtspezifiziert",
];

pub fn is_non_answer(value: &str) -> bool {
    let folded = normalize_key(value);
    folded.is_empty() || NON_ANSWERS.contains(&folded.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeTier {
    Structured,
    TextExtracted,
    Generated,
    /// Category fallback string for a required field nothing could fill.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergedSpec {
    pub field: SemanticField,
    pub label: String,
    pub value: String,
    pub tier: MergeTier,
}

/// Resolves the spec table for one record against its category's field list.
pub fn merge_tech_specs(
    record: &NormalizedRecord,
    copy: &ProductCopy,
    category: &CategoryConfig,
) -> Vec<MergedSpec> {
    // Generated keys arrive with arbitrary labeling; fold them once with the
    // same normalization the column resolver uses.
    let generated: BTreeMap<String, &str> = copy
        .technical_specs
        .iter()
        .filter(|(_, value)| !is_non_answer(value))
        .map(|(key, value)| (normalize_key(key), value.as_str()))
        .collect();

    let mut merged = Vec::new();
    for spec in &category.tech_fields {
        let field = spec.field;

        if let Some(value) = deterministic_value(record, field, SpecSource::Structured) {
            merged.push(entry(field, value, MergeTier::Structured));
            continue;
        }
        if let Some(value) = deterministic_value(record, field, SpecSource::TextExtracted) {
            merged.push(entry(field, value, MergeTier::TextExtracted));
            continue;
        }
        if let Some(value) = generated_value(&generated, field) {
            merged.push(entry(field, value, MergeTier::Generated));
            continue;
        }
        if spec.required {
            if let Some(fallback) = spec.fallback.as_deref() {
                merged.push(entry(field, fallback, MergeTier::Fallback));
            }
        }
    }
    merged
}

fn deterministic_value(
    record: &NormalizedRecord,
    field: SemanticField,
    source: SpecSource,
) -> Option<&str> {
    record
        .technical_specs
        .get(&field)
        .filter(|spec| spec.source == source)
        .map(|spec| spec.value.as_str())
        .filter(|value| !is_non_answer(value))
}

fn generated_value<'a>(generated: &BTreeMap<String, &'a str>, field: SemanticField) -> Option<&'a str> {
    let label_key = normalize_key(field.label());
    if let Some(value) = generated.get(&label_key) {
        return Some(value);
    }
    field
        .candidates()
        .iter()
        .find_map(|candidate| generated.get(&normalize_key(candidate)).copied())
}

fn entry(field: SemanticField, value: &str, tier: MergeTier) -> MergedSpec {
    MergedSpec {
        field,
        label: field.label().to_string(),
        value: value.to_string(),
        tier,
    }
}

/// Late merge back onto the record, the one mutation a normalized record
/// sees after creation. Fallback entries are presentation-only and are not
/// written back.
pub fn apply_to_record(record: &mut NormalizedRecord, merged: &[MergedSpec]) {
    for spec in merged {
        let source = match spec.tier {
            MergeTier::Structured => SpecSource::Structured,
            MergeTier::TextExtracted => SpecSource::TextExtracted,
            MergeTier::Generated => SpecSource::Generated,
            MergeTier::Fallback => continue,
        };
        record.technical_specs.insert(
            spec.field,
            SpecValue {
                value: spec.value.clone(),
                source,
            },
        );
    }
}
