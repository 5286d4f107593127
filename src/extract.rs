//! Heuristic extraction of technical values and identifiers from free text.
//!
//! The pattern families are hand-tuned against observed supplier formats
//! (German battery/charger feeds); they are a starting set to be extended
//! per onboarded supplier, not an exhaustive grammar.

use std::collections::BTreeMap;

use anyhow::Result;
use regex::Regex;

use crate::columns::SemanticField;
use crate::titles::KNOWN_BRANDS;

pub struct AttributeExtractor {
    voltage_range: Regex,
    voltage: Regex,
    capacity_mah: Regex,
    capacity_ah: Regex,
    wattage: Regex,
    current: Regex,
    energy: Regex,
    weight_kg: Regex,
    weight_g: Regex,
    dimensions: Regex,
    chemistry: Regex,
    model_token: Regex,
    qualifier: Regex,
    tolerance: Regex,
    number: Regex,
}

const NUM: &str = r"\d+(?:[.,]\d+)?";

/// Pure connector/size tokens that look like model codes but are not.
const TOKEN_EXCLUSIONS: [&str; 10] = [
    "usb", "usb-c", "usb-a", "type-c", "typ-c", "micro-usb", "aaa", "aa", "nimh", "li-ion",
];

/// Cylindrical cell size designations are legitimate identifiers even though
/// they are pure digits.
const CELL_SIZES: [&str; 5] = ["14500", "18650", "20700", "21700", "26650"];

impl AttributeExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            voltage_range: Regex::new(&format!(
                r"(?i)({NUM}\s*V?\s*[-–]\s*{NUM}\s*V)\b"
            ))?,
            voltage: Regex::new(&format!(r"(?i)({NUM})\s*V\b"))?,
            capacity_mah: Regex::new(&format!(r"(?i)({NUM})\s*mAh\b"))?,
            capacity_ah: Regex::new(&format!(r"(?i)({NUM})\s*Ah\b"))?,
            wattage: Regex::new(&format!(r"(?i)({NUM})\s*W\b"))?,
            current: Regex::new(&format!(r"(?i)({NUM})\s*A\b"))?,
            energy: Regex::new(&format!(r"(?i)({NUM})\s*Wh\b"))?,
            weight_kg: Regex::new(&format!(r"(?i)({NUM})\s*kg\b"))?,
            weight_g: Regex::new(&format!(r"(?i)({NUM})\s*g\b"))?,
            dimensions: Regex::new(&format!(
                r"(?i)({NUM})\s*[x×*]\s*({NUM})(?:\s*[x×*]\s*({NUM}))?\s*(mm|cm)\b"
            ))?,
            chemistry: Regex::new(
                r"(?i)\b(li-?ion|li-?po(?:lymer)?|lifepo4|nimh|nicd|imr|inr|icr)\b",
            )?,
            model_token: Regex::new(r"[A-Za-z0-9][A-Za-z0-9\-_/]{2,19}")?,
            qualifier: Regex::new(r"(?i)\b(ca\.?|approx\.?|typ\.?|typical|nominal|min\.?|max\.?)\s*")?,
            tolerance: Regex::new(&format!(r"±\s*{NUM}\s*%?"))?,
            number: Regex::new(&format!(r"({NUM})"))?,
        })
    }

    /// Extracts unit-qualified values from free text (typically title plus
    /// description). Fields without a pattern match are absent, never
    /// empty-string placeholders.
    pub fn extract(&self, text: &str) -> BTreeMap<SemanticField, String> {
        let mut specs = BTreeMap::new();

        // A voltage range is semantically different from a point value and
        // must be preserved verbatim, never collapsed to one number.
        if let Some(range) = self.voltage_range.captures(text) {
            specs.insert(SemanticField::Voltage, range[1].trim().to_string());
        } else if let Some(cap) = self.voltage.captures(text) {
            specs.insert(
                SemanticField::Voltage,
                format!("{} V", format_number(&cap[1])),
            );
        }

        if let Some(cap) = self.capacity_mah.captures(text) {
            specs.insert(
                SemanticField::Capacity,
                format!("{} mAh", format_number(&cap[1])),
            );
        } else if let Some(cap) = self.capacity_ah.captures(text) {
            if let Some(mah) = parse_number(&cap[1]).map(|ah| ah * 1000.0) {
                specs.insert(SemanticField::Capacity, format!("{} mAh", format_float(mah)));
            }
        }

        if let Some(cap) = self.energy.captures(text) {
            specs.insert(SemanticField::Energy, format!("{} Wh", format_number(&cap[1])));
        }
        if let Some(cap) = self.wattage.captures(text) {
            specs.insert(SemanticField::Wattage, format!("{} W", format_number(&cap[1])));
        }
        // Discharge ratings are written compactly on cell markings ("25A").
        if let Some(cap) = self.current.captures(text) {
            specs.insert(SemanticField::Current, format!("{}A", format_number(&cap[1])));
        }

        if let Some(cap) = self.weight_kg.captures(text) {
            if let Some(grams) = parse_number(&cap[1]).map(|kg| kg * 1000.0) {
                specs.insert(SemanticField::Weight, format!("{} g", format_float(grams)));
            }
        } else if let Some(cap) = self.weight_g.captures(text) {
            specs.insert(SemanticField::Weight, format!("{} g", format_number(&cap[1])));
        }

        self.extract_dimensions(text, &mut specs);

        if let Some(cap) = self.chemistry.captures(text) {
            specs.insert(SemanticField::Chemistry, canonical_chemistry(&cap[1]));
        }

        specs
    }

    /// Dimension triples map positionally to length/width/height, pairs to
    /// diameter/length. Source cm values are converted to mm first.
    fn extract_dimensions(&self, text: &str, specs: &mut BTreeMap<SemanticField, String>) {
        let Some(cap) = self.dimensions.captures(text) else {
            return;
        };

        let unit = cap[4].to_lowercase();
        let factor = if unit == "cm" { 10.0 } else { 1.0 };
        let mm = |raw: &str| parse_number(raw).map(|n| format!("{} mm", format_float(n * factor)));

        let first = mm(&cap[1]);
        let second = mm(&cap[2]);
        let third = cap.get(3).and_then(|m| mm(m.as_str()));

        match (first, second, third) {
            (Some(l), Some(w), Some(h)) => {
                specs.insert(SemanticField::Length, l);
                specs.insert(SemanticField::Width, w);
                specs.insert(SemanticField::Height, h);
            }
            (Some(d), Some(l), None) => {
                specs.insert(SemanticField::Diameter, d);
                specs.insert(SemanticField::Length, l);
            }
            _ => {}
        }
    }

    /// Cleans a structured cell value down to its nominal reading: strips
    /// qualifiers ("ca.", "typ.") and tolerance expressions ("±0,3"), then
    /// takes the first remaining number and reattaches the canonical unit.
    /// Voltage ranges pass through verbatim.
    pub fn clean_numeric_value(&self, raw: &str, field: SemanticField) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if field == SemanticField::Voltage {
            if let Some(range) = self.voltage_range.captures(trimmed) {
                return Some(range[1].trim().to_string());
            }
        }

        let unit = field.unit()?;
        let stripped = self.qualifier.replace_all(trimmed, "");
        let stripped = self.tolerance.replace_all(&stripped, "");
        let number = self.number.captures(&stripped)?;

        if field == SemanticField::Current {
            return Some(format!("{}A", format_number(&number[1])));
        }
        Some(format!("{} {}", format_number(&number[1]), unit))
    }

    /// Alphanumeric model/article codes: 3-20 chars, must contain a digit or
    /// be an all-caps technical token; locale codes, connector tokens, bare
    /// years and unit-suffixed readings are excluded. Deduplicated, first
    /// three kept.
    pub fn model_codes(&self, text: &str) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for token in self.model_token.find_iter(text) {
            let token = token.as_str();
            if !self.is_model_code(token) {
                continue;
            }
            if codes.iter().any(|seen| seen.eq_ignore_ascii_case(token)) {
                continue;
            }
            codes.push(token.to_string());
            if codes.len() == 3 {
                break;
            }
        }
        codes
    }

    fn is_model_code(&self, token: &str) -> bool {
        let lowered = token.to_lowercase();
        if TOKEN_EXCLUSIONS.contains(&lowered.as_str()) {
            return false;
        }
        if KNOWN_BRANDS
            .iter()
            .any(|brand| brand.eq_ignore_ascii_case(token))
        {
            return false;
        }

        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        let all_caps = token.len() >= 3 && token.chars().all(|c| c.is_ascii_uppercase());
        if !has_digit && !all_caps {
            return false;
        }

        // Bare four-digit tokens are almost always years.
        if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
            let year: u32 = token.parse().unwrap_or(0);
            if (1900..2100).contains(&year) {
                return false;
            }
        }

        // Pure digit runs are readings, not codes, except known cell sizes.
        if token.chars().all(|c| c.is_ascii_digit()) && !CELL_SIZES.contains(&token) {
            return false;
        }

        // Unit-suffixed readings like "12V" or "500mAh".
        if let Some(rest) = strip_leading_number(token) {
            let suffix = rest.to_lowercase();
            if matches!(
                suffix.as_str(),
                "v" | "w" | "a" | "ah" | "mah" | "wh" | "g" | "kg" | "mm" | "cm" | "m" | "h" | "x"
            ) {
                return false;
            }
        }

        true
    }
}

fn strip_leading_number(token: &str) -> Option<&str> {
    let end = token
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .filter(|end| *end > 0)?;
    Some(&token[end..])
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

/// Normalizes the localized decimal comma to a dot without reformatting the
/// digits themselves.
fn format_number(raw: &str) -> String {
    raw.replace(',', ".")
}

fn format_float(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let formatted = format!("{value:.2}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn canonical_chemistry(raw: &str) -> String {
    match raw.to_lowercase().replace('-', "").as_str() {
        "liion" | "imr" | "inr" | "icr" => "Li-Ion".to_string(),
        "lipo" | "lipolymer" => "LiPo".to_string(),
        "lifepo4" => "LiFePO4".to_string(),
        "nimh" => "NiMH".to_string(),
        "nicd" => "NiCd".to_string(),
        other => other.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> AttributeExtractor {
        AttributeExtractor::new().unwrap()
    }

    #[test]
    fn voltage_range_is_preserved_verbatim() {
        let specs = extractor().extract("Spannung: 3,6V - 3,7V");
        assert_eq!(specs[&SemanticField::Voltage], "3,6V - 3,7V");
    }

    #[test]
    fn point_voltage_uses_canonical_decimal() {
        let specs = extractor().extract("Nennspannung 3,7 V");
        assert_eq!(specs[&SemanticField::Voltage], "3.7 V");
    }

    #[test]
    fn capacity_current_and_model_code_from_cell_title() {
        let ex = extractor();
        let title = "XTAR 21700-HP 25A 5000mAh Li-Ion Akku";
        let specs = ex.extract(title);
        assert_eq!(specs[&SemanticField::Capacity], "5000 mAh");
        assert_eq!(specs[&SemanticField::Current], "25A");
        assert_eq!(specs[&SemanticField::Chemistry], "Li-Ion");

        let codes = ex.model_codes(title);
        assert_eq!(codes, vec!["21700-HP".to_string()]);
    }

    #[test]
    fn capacity_in_ah_converts_to_mah() {
        let specs = extractor().extract("Kapazität 2,5 Ah");
        assert_eq!(specs[&SemanticField::Capacity], "2500 mAh");
    }

    #[test]
    fn dimension_triple_maps_to_length_width_height() {
        let specs = extractor().extract("Maße: 7 x 3,5 x 1,9 cm");
        assert_eq!(specs[&SemanticField::Length], "70 mm");
        assert_eq!(specs[&SemanticField::Width], "35 mm");
        assert_eq!(specs[&SemanticField::Height], "19 mm");
    }

    #[test]
    fn dimension_pair_maps_to_diameter_and_length() {
        let specs = extractor().extract("21,2 x 70,3 mm");
        assert_eq!(specs[&SemanticField::Diameter], "21.2 mm");
        assert_eq!(specs[&SemanticField::Length], "70.3 mm");
        assert_eq!(specs.get(&SemanticField::Height), None);
    }

    #[test]
    fn weight_in_kg_converts_to_grams() {
        let specs = extractor().extract("Gewicht: 0,07 kg");
        assert_eq!(specs[&SemanticField::Weight], "70 g");
    }

    #[test]
    fn no_match_means_no_entry() {
        let specs = extractor().extract("Ein Produkt ohne technische Angaben");
        assert!(specs.is_empty());
    }

    #[test]
    fn qualifier_and_tolerance_stripping_finds_nominal_value() {
        let ex = extractor();
        assert_eq!(
            ex.clean_numeric_value("ca. 3,6 V ±0,1", SemanticField::Voltage),
            Some("3.6 V".to_string())
        );
        assert_eq!(
            ex.clean_numeric_value("typ. 5000 mAh", SemanticField::Capacity),
            Some("5000 mAh".to_string())
        );
        assert_eq!(ex.clean_numeric_value("  ", SemanticField::Voltage), None);
    }

    #[test]
    fn range_cell_value_passes_through_verbatim() {
        assert_eq!(
            extractor().clean_numeric_value("3,6V - 3,7V", SemanticField::Voltage),
            Some("3,6V - 3,7V".to_string())
        );
    }

    #[test]
    fn model_code_exclusions() {
        let ex = extractor();
        assert!(ex.model_codes("Baujahr 2023 USB-C Anschluss").is_empty());
        assert!(ex.model_codes("12V 500mAh 25A").is_empty());
        assert_eq!(ex.model_codes("Zelle 18650 Schutz"), vec!["18650".to_string()]);
    }

    #[test]
    fn model_codes_dedup_and_cap_at_three() {
        let ex = extractor();
        let codes = ex.model_codes("NT-500 nt-500 MX2 BR-77 QQ-9 extra");
        assert_eq!(codes, vec!["NT-500", "MX2", "BR-77"]);
    }
}
