//! SKU collision tagging across a normalized batch.

use std::collections::HashMap;

use crate::model::NormalizedRecord;

/// Tags every record whose cleaned SKU occurs more than once in the batch.
/// An empty SKU is not a colliding identity and is never tagged. Must run
/// after SKU cleaning, not before.
pub fn mark_duplicates(records: &mut [NormalizedRecord]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records.iter() {
        if !record.sku.is_empty() {
            *counts.entry(record.sku.as_str()).or_insert(0) += 1;
        }
    }

    let duplicated: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(sku, _)| sku.to_string())
        .collect();

    for record in records.iter_mut() {
        record.is_duplicate = !record.sku.is_empty() && duplicated.contains(&record.sku);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(sku: &str) -> NormalizedRecord {
        NormalizedRecord {
            sku: sku.to_string(),
            title: String::new(),
            description: String::new(),
            brand: String::new(),
            marketplace_title_v1: String::new(),
            marketplace_title_v2: String::new(),
            technical_specs: BTreeMap::new(),
            category: String::new(),
            is_duplicate: false,
            model_codes: Vec::new(),
        }
    }

    #[test]
    fn colliding_skus_are_flagged_on_every_occurrence() {
        let mut records = vec![record("ABC123"), record("XYZ999"), record("ABC123")];
        mark_duplicates(&mut records);
        assert!(records[0].is_duplicate);
        assert!(!records[1].is_duplicate);
        assert!(records[2].is_duplicate);
    }

    #[test]
    fn empty_skus_never_collide() {
        let mut records = vec![record(""), record(""), record("A1")];
        mark_duplicates(&mut records);
        assert!(records.iter().take(2).all(|r| !r.is_duplicate));
        assert!(!records[2].is_duplicate);
    }
}
