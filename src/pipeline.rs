//! End-to-end normalization: raw bytes or scraped records in, normalized
//! records out. Pure per-record computation; the only shared state is the
//! injected read-only category catalog.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::categorize::CategoryCatalog;
use crate::columns::{self, ColumnMap, SemanticField};
use crate::dedupe::mark_duplicates;
use crate::delimiter::detect_delimiter;
use crate::encoding::resolve_encoding;
use crate::extract::AttributeExtractor;
use crate::generate::postprocess::{collapse_whitespace, strip_html};
use crate::merge::is_non_answer;
use crate::model::{NormalizedRecord, RawRecord, SpecValue};
use crate::tabular::{self, NormalizeError};
use crate::titles::{self, KNOWN_BRANDS, TitleInputs};

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeCounts {
    pub rows_parsed: usize,
    pub records_normalized: usize,
    pub records_dropped_missing_sku: usize,
    pub duplicate_records: usize,
    pub columns_resolved: usize,
    pub structured_specs: usize,
    pub extracted_specs: usize,
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<NormalizedRecord>,
    pub warnings: Vec<String>,
    pub counts: NormalizeCounts,
    pub encoding: Option<&'static str>,
    pub delimiter: Option<char>,
}

pub struct Normalizer {
    extractor: AttributeExtractor,
    catalog: CategoryCatalog,
}

impl Normalizer {
    pub fn new(catalog: CategoryCatalog) -> Result<Self> {
        Ok(Self {
            extractor: AttributeExtractor::new()?,
            catalog,
        })
    }

    pub fn with_builtin_catalog() -> Result<Self> {
        Self::new(CategoryCatalog::builtin())
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Normalizes an uploaded tabular file: decode, detect the delimiter,
    /// parse, then run the per-record stages.
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<NormalizeOutcome, NormalizeError> {
        let decoded = resolve_encoding(bytes);
        let delimiter = detect_delimiter(&decoded.text);
        info!(
            encoding = decoded.encoding_name,
            delimiter = %delimiter,
            "decoded upload"
        );

        let table = tabular::parse_table(&decoded.text, delimiter)?;

        let mut outcome = self.normalize_records(&table.records)?;
        if decoded.degraded {
            outcome.warnings.insert(
                0,
                format!(
                    "decode degraded: no candidate encoding was clean, kept {}",
                    decoded.encoding_name
                ),
            );
        }
        let mut warnings = table.warnings;
        warnings.append(&mut outcome.warnings);
        outcome.warnings = warnings;
        outcome.encoding = Some(decoded.encoding_name);
        outcome.delimiter = Some(delimiter);
        Ok(outcome)
    }

    /// Normalizes pre-shaped records (scraped pages share the raw-record
    /// shape with parsed file rows).
    pub fn normalize_records(
        &self,
        records: &[RawRecord],
    ) -> Result<NormalizeOutcome, NormalizeError> {
        let Some(sample) = records.first() else {
            return Err(NormalizeError::EmptyDataset);
        };

        // Header shape is file-wide; resolve once per schema, not per row.
        let columns = columns::resolve_columns(sample);

        let mut outcome = NormalizeOutcome {
            counts: NormalizeCounts {
                rows_parsed: records.len(),
                columns_resolved: columns.resolved_count(),
                ..NormalizeCounts::default()
            },
            ..NormalizeOutcome::default()
        };
        for field in columns::ALL_FIELDS {
            if field.required() && columns.header_for(field).is_none() {
                outcome.warnings.push(format!(
                    "required column '{}' not resolved in source schema",
                    field.label()
                ));
            }
        }

        for (index, record) in records.iter().enumerate() {
            match self.build_record(record, &columns, &mut outcome.counts) {
                Some(normalized) => outcome.records.push(normalized),
                None => {
                    outcome.counts.records_dropped_missing_sku += 1;
                    outcome
                        .warnings
                        .push(format!("record {}: no derivable SKU, dropped", index + 1));
                }
            }
        }

        mark_duplicates(&mut outcome.records);
        outcome.counts.records_normalized = outcome.records.len();
        outcome.counts.duplicate_records = outcome
            .records
            .iter()
            .filter(|record| record.is_duplicate)
            .count();

        if outcome.counts.records_dropped_missing_sku > 0 {
            warn!(
                dropped = outcome.counts.records_dropped_missing_sku,
                "records without SKU were dropped"
            );
        }
        Ok(outcome)
    }

    fn build_record(
        &self,
        raw: &RawRecord,
        columns: &ColumnMap,
        counts: &mut NormalizeCounts,
    ) -> Option<NormalizedRecord> {
        // Never partially valid: without a SKU there is no record.
        let sku = columns.value(raw, SemanticField::Sku)?.trim().to_string();
        if sku.is_empty() {
            return None;
        }

        let title = columns
            .value(raw, SemanticField::Title)
            .map(|value| collapse_whitespace(&strip_html(value)))
            .unwrap_or_default();
        let description = columns
            .value(raw, SemanticField::Description)
            .map(|value| collapse_whitespace(&strip_html(value)))
            .unwrap_or_default();
        let brand = columns
            .value(raw, SemanticField::Brand)
            .map(str::to_string)
            .unwrap_or_else(|| guess_brand(&title));

        let free_text = format!("{title} {description}");

        let mut technical_specs = std::collections::BTreeMap::new();
        for field in columns::ALL_FIELDS {
            if !field.is_technical() {
                continue;
            }
            let Some(raw_value) = columns.value(raw, field) else {
                continue;
            };
            if is_non_answer(raw_value) {
                continue;
            }
            let cleaned = if field.unit().is_some() {
                self.extractor.clean_numeric_value(raw_value, field)
            } else {
                Some(raw_value.to_string())
            };
            if let Some(value) = cleaned {
                technical_specs.insert(field, SpecValue::structured(value));
                counts.structured_specs += 1;
            }
        }

        for (field, value) in self.extractor.extract(&free_text) {
            if !technical_specs.contains_key(&field) {
                technical_specs.insert(field, SpecValue::extracted(value));
                counts.extracted_specs += 1;
            }
        }

        let model_codes = self.extractor.model_codes(&free_text);
        let category = self.catalog.categorize(&free_text).id.clone();

        let title_inputs = TitleInputs {
            title: &title,
            description: &description,
            brand: &brand,
            model_codes: &model_codes,
        };

        Some(NormalizedRecord {
            marketplace_title_v1: titles::marketplace_title_v1(title_inputs),
            marketplace_title_v2: titles::marketplace_title_v2(title_inputs),
            sku,
            title,
            description,
            brand,
            technical_specs,
            category,
            is_duplicate: false,
            model_codes,
        })
    }
}

fn guess_brand(title: &str) -> String {
    title
        .split_whitespace()
        .find(|word| {
            KNOWN_BRANDS
                .iter()
                .any(|brand| brand.eq_ignore_ascii_case(word))
        })
        .map(str::to_string)
        .unwrap_or_default()
}
