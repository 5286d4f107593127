//! Semantic field catalog and fuzzy header resolution.
//!
//! A raw record says what the data *is*; a [`SemanticField`] says what we
//! *think it means*. The two are joined only here, once per source schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Sku,
    Title,
    Description,
    Brand,
    Voltage,
    Capacity,
    Wattage,
    Current,
    Energy,
    Weight,
    Length,
    Width,
    Height,
    Diameter,
    Chemistry,
}

pub const ALL_FIELDS: [SemanticField; 15] = [
    SemanticField::Sku,
    SemanticField::Title,
    SemanticField::Description,
    SemanticField::Brand,
    SemanticField::Voltage,
    SemanticField::Capacity,
    SemanticField::Wattage,
    SemanticField::Current,
    SemanticField::Energy,
    SemanticField::Weight,
    SemanticField::Length,
    SemanticField::Width,
    SemanticField::Height,
    SemanticField::Diameter,
    SemanticField::Chemistry,
];

impl SemanticField {
    /// Candidate header names in priority order. Extended per onboarded
    /// supplier; German names first since most feeds are German.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Sku => &[
                "sku",
                "artikelnummer",
                "artikelnr",
                "art.-nr",
                "artnr",
                "item number",
                "produktnummer",
            ],
            Self::Title => &["titel", "title", "name", "bezeichnung", "produktname"],
            Self::Description => &[
                "beschreibung",
                "description",
                "produktbeschreibung",
                "langtext",
            ],
            Self::Brand => &["marke", "brand", "hersteller", "manufacturer"],
            Self::Voltage => &["spannung", "voltage", "nennspannung"],
            Self::Capacity => &["kapazität", "kapazitaet", "capacity", "nennkapazität"],
            Self::Wattage => &["leistung", "wattage", "watt"],
            Self::Current => &["entladestrom", "strom", "current", "dauerstrom"],
            Self::Energy => &["energie", "energy", "wattstunden"],
            Self::Weight => &["gewicht", "weight"],
            Self::Length => &["länge", "laenge", "length"],
            Self::Width => &["breite", "width"],
            Self::Height => &["höhe", "hoehe", "height"],
            Self::Diameter => &["durchmesser", "diameter"],
            Self::Chemistry => &["zellchemie", "chemie", "chemistry", "zelltyp"],
        }
    }

    /// Canonical output unit, where the field carries one.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::Voltage => Some("V"),
            Self::Capacity => Some("mAh"),
            Self::Wattage => Some("W"),
            Self::Current => Some("A"),
            Self::Energy => Some("Wh"),
            Self::Weight => Some("g"),
            Self::Length | Self::Width | Self::Height | Self::Diameter => Some("mm"),
            _ => None,
        }
    }

    pub fn required(self) -> bool {
        matches!(self, Self::Sku | Self::Title)
    }

    /// Display label used in spec tables and merge keys.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sku => "Artikelnummer",
            Self::Title => "Titel",
            Self::Description => "Beschreibung",
            Self::Brand => "Marke",
            Self::Voltage => "Spannung",
            Self::Capacity => "Kapazität",
            Self::Wattage => "Leistung",
            Self::Current => "Entladestrom",
            Self::Energy => "Energie",
            Self::Weight => "Gewicht",
            Self::Length => "Länge",
            Self::Width => "Breite",
            Self::Height => "Höhe",
            Self::Diameter => "Durchmesser",
            Self::Chemistry => "Zellchemie",
        }
    }

    pub fn is_technical(self) -> bool {
        !matches!(self, Self::Sku | Self::Title | Self::Description | Self::Brand)
    }
}

/// Header mapping for one source schema, resolved once per file rather than
/// once per row.
#[derive(Debug, Default, Clone)]
pub struct ColumnMap {
    resolved: BTreeMap<SemanticField, String>,
}

impl ColumnMap {
    pub fn header_for(&self, field: SemanticField) -> Option<&str> {
        self.resolved.get(&field).map(String::as_str)
    }

    pub fn value<'a>(&self, record: &'a RawRecord, field: SemanticField) -> Option<&'a str> {
        self.header_for(field)
            .and_then(|header| record.get(header))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

/// Maps semantic fields to the actual headers of a sample record.
///
/// Per field: first a case-insensitive exact match, then a case-insensitive
/// substring match in either direction, first candidate in priority order
/// winning. Unresolved fields stay unmapped; absence is by design, never a
/// placeholder.
pub fn resolve_columns(sample: &RawRecord) -> ColumnMap {
    let headers: Vec<(String, &str)> = sample
        .headers()
        .map(|header| (header.to_lowercase(), header))
        .collect();

    let mut map = ColumnMap::default();
    for field in ALL_FIELDS {
        if let Some(header) = resolve_field(&headers, field) {
            map.resolved.insert(field, header.to_string());
        }
    }
    map
}

fn resolve_field<'a>(headers: &[(String, &'a str)], field: SemanticField) -> Option<&'a str> {
    for candidate in field.candidates() {
        let lowered = candidate.to_lowercase();
        if let Some((_, header)) = headers.iter().find(|(low, _)| *low == lowered) {
            return Some(header);
        }
    }
    for candidate in field.candidates() {
        let lowered = candidate.to_lowercase();
        if let Some((_, header)) = headers
            .iter()
            .find(|(low, _)| low.contains(&lowered) || lowered.contains(low.as_str()))
        {
            return Some(header);
        }
    }
    None
}

/// Shared key fold used by both column resolution helpers and the tech-spec
/// merge: diacritics folded, non-alphanumerics stripped, lowercase.
pub fn normalize_key(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            'ä' | 'Ä' => out.push('a'),
            'ö' | 'Ö' => out.push('o'),
            'ü' | 'Ü' => out.push('u'),
            'ß' => out.push_str("ss"),
            'é' | 'è' | 'ê' | 'É' => out.push('e'),
            'à' | 'á' | 'â' => out.push('a'),
            c if c.is_alphanumeric() => out.extend(c.to_lowercase()),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(headers: &[&str]) -> RawRecord {
        let mut record = RawRecord::new();
        for header in headers {
            record.push(*header, "x");
        }
        record
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let map = resolve_columns(&sample(&["SKU", "Titel", "Beschreibung"]));
        assert_eq!(map.header_for(SemanticField::Sku), Some("SKU"));
        assert_eq!(map.header_for(SemanticField::Title), Some("Titel"));
    }

    #[test]
    fn substring_match_works_in_both_directions() {
        // Header contains candidate, and candidate contains header.
        let map = resolve_columns(&sample(&["Lieferanten-Artikelnummer", "Beschreib"]));
        assert_eq!(
            map.header_for(SemanticField::Sku),
            Some("Lieferanten-Artikelnummer")
        );
        assert_eq!(map.header_for(SemanticField::Description), Some("Beschreib"));
    }

    #[test]
    fn exact_match_beats_substring_match() {
        let map = resolve_columns(&sample(&["Produktname lang", "Name"]));
        assert_eq!(map.header_for(SemanticField::Title), Some("Name"));
    }

    #[test]
    fn unresolved_fields_stay_unmapped() {
        let map = resolve_columns(&sample(&["sku", "name"]));
        assert_eq!(map.header_for(SemanticField::Voltage), None);
    }

    #[test]
    fn value_lookup_filters_empty_cells() {
        let mut record = RawRecord::new();
        record.push("sku", "  ");
        let map = resolve_columns(&record);
        assert_eq!(map.value(&record, SemanticField::Sku), None);
    }

    #[test]
    fn key_fold_matches_umlaut_spellings() {
        assert_eq!(normalize_key("Kapazität"), "kapazitat");
        assert_eq!(normalize_key("kapazitat"), "kapazitat");
        assert_eq!(normalize_key("Max. Entlade-Strom"), "maxentladestrom");
        assert_eq!(normalize_key("Größe"), "grosse");
    }
}
