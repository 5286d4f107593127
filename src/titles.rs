//! Deterministic marketplace title synthesis.
//!
//! Two bounded variants per record: V1 leads with a resolved product type,
//! V2 carries model codes only. Both degrade cleanly when a record has no
//! extractable model code and never truncate mid-word.

pub const V1_MAX_CHARS: usize = 100;
pub const V2_MAX_CHARS: usize = 80;

/// Brand tokens excluded from product-type resolution and model codes.
pub const KNOWN_BRANDS: [&str; 14] = [
    "XTAR", "Samsung", "Panasonic", "Sanyo", "Sony", "Murata", "Molicel", "Ansmann", "Varta",
    "Duracell", "Energizer", "Nitecore", "Fenix", "Keeppower",
];

/// Words too generic to carry a V2 title on their own.
const GENERIC_WORDS: [&str; 12] = [
    "akku", "batterie", "zelle", "ladegerät", "netzteil", "für", "mit", "und", "inkl", "der",
    "die", "das",
];

struct TypeRule {
    /// Every group must match via at least one of its keywords. Two-group
    /// rules are listed first so composite products beat their parts.
    groups: &'static [&'static [&'static str]],
    label: &'static str,
}

const TYPE_RULES: [TypeRule; 8] = [
    TypeRule {
        groups: &[
            &["notebook", "laptop"],
            &["netzteil", "ladegerät", "charger", "power supply"],
        ],
        label: "Notebook-Netzteil",
    },
    TypeRule {
        groups: &[&["kfz", "auto", "zigarettenanzünder"], &["ladegerät", "charger"]],
        label: "KFZ-Ladegerät",
    },
    TypeRule {
        groups: &[&["ladegerät", "charger", "ladeschacht"]],
        label: "Ladegerät",
    },
    TypeRule {
        groups: &[&["netzteil", "power supply", "steckernetzteil"]],
        label: "Netzteil",
    },
    TypeRule {
        groups: &[&["powerbank"]],
        label: "Powerbank",
    },
    TypeRule {
        groups: &[&["akkupack", "akku-pack"]],
        label: "Akkupack",
    },
    TypeRule {
        groups: &[&["akku", "akkuzelle", "li-ion", "18650", "21700", "26650"]],
        label: "Akku",
    },
    TypeRule {
        groups: &[&["batterie", "alkaline", "knopfzelle"]],
        label: "Batterie",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct TitleInputs<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub brand: &'a str,
    pub model_codes: &'a [String],
}

/// `<ProductType> <ModelCodes>`, at most 100 characters.
pub fn marketplace_title_v1(inputs: TitleInputs<'_>) -> String {
    let lead = resolve_product_type(inputs)
        .map(str::to_string)
        .unwrap_or_else(|| non_brand_words(inputs, 2, false).join(" "));

    let codes = usable_codes(inputs);
    let mut parts: Vec<String> = Vec::new();
    if !lead.is_empty() {
        parts.push(lead);
    }
    parts.extend(codes);

    truncate_at_word(&parts.join(" "), V1_MAX_CHARS)
}

/// Model codes only, at most 80 characters; no product type, no brand.
pub fn marketplace_title_v2(inputs: TitleInputs<'_>) -> String {
    let codes = usable_codes(inputs);
    let joined = if codes.is_empty() {
        non_brand_words(inputs, 3, true).join(" ")
    } else {
        codes.join(" ")
    };
    truncate_at_word(&joined, V2_MAX_CHARS)
}

fn resolve_product_type(inputs: TitleInputs<'_>) -> Option<&'static str> {
    let haystack = format!("{} {}", inputs.title, inputs.description).to_lowercase();
    TYPE_RULES
        .iter()
        .find(|rule| {
            rule.groups.iter().all(|group| {
                group
                    .iter()
                    .any(|keyword| haystack.contains(keyword))
            })
        })
        .map(|rule| rule.label)
}

fn usable_codes(inputs: TitleInputs<'_>) -> Vec<String> {
    inputs
        .model_codes
        .iter()
        .filter(|code| !is_brand_word(code, inputs.brand))
        .take(3)
        .cloned()
        .collect()
}

fn non_brand_words(inputs: TitleInputs<'_>, limit: usize, skip_generic: bool) -> Vec<String> {
    inputs
        .title
        .split_whitespace()
        .filter(|word| !is_brand_word(word, inputs.brand))
        .filter(|word| !skip_generic || !GENERIC_WORDS.contains(&word.to_lowercase().as_str()))
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn is_brand_word(word: &str, brand: &str) -> bool {
    let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
    (!brand.is_empty() && trimmed.eq_ignore_ascii_case(brand))
        || KNOWN_BRANDS
            .iter()
            .any(|known| trimmed.eq_ignore_ascii_case(known))
}

/// Truncates to `max` characters at a word boundary, never mid-word. A
/// single token longer than the limit is dropped entirely rather than split.
fn truncate_at_word(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.trim().to_string();
    }

    let cut: String = text.chars().take(max + 1).collect();
    match cut.rfind(char::is_whitespace) {
        Some(boundary) => cut[..boundary].trim_end().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(title: &'a str, brand: &'a str, codes: &'a [String]) -> TitleInputs<'a> {
        TitleInputs {
            title,
            description: "",
            brand,
            model_codes: codes,
        }
    }

    #[test]
    fn pair_rule_beats_single_keyword_rule() {
        let codes = vec!["PA-1650".to_string()];
        let v1 = marketplace_title_v1(inputs(
            "Original Netzteil für Lenovo Notebook 65W",
            "Lenovo",
            &codes,
        ));
        assert_eq!(v1, "Notebook-Netzteil PA-1650");
    }

    #[test]
    fn v1_resolves_type_and_appends_codes() {
        let codes = vec!["21700-HP".to_string()];
        let v1 = marketplace_title_v1(inputs(
            "XTAR 21700-HP 25A 5000mAh Li-Ion Akku",
            "XTAR",
            &codes,
        ));
        assert_eq!(v1, "Akku 21700-HP");
    }

    #[test]
    fn v1_falls_back_to_first_two_non_brand_words() {
        let v1 = marketplace_title_v1(inputs("XTAR Schutzhülle Silikon blau", "XTAR", &[]));
        assert_eq!(v1, "Schutzhülle Silikon");
    }

    #[test]
    fn v2_is_codes_only_without_brand() {
        let codes = vec!["NT-500".to_string(), "MX2".to_string()];
        let v2 = marketplace_title_v2(inputs("Ansmann NT-500 Ladegerät", "Ansmann", &codes));
        assert_eq!(v2, "NT-500 MX2");
    }

    #[test]
    fn v2_fallback_skips_brand_and_generic_words() {
        let v2 = marketplace_title_v2(inputs("Varta Akku Longlife Power AA", "Varta", &[]));
        assert_eq!(v2, "Longlife Power AA");
    }

    #[test]
    fn zero_model_codes_never_panics() {
        let v1 = marketplace_title_v1(inputs("Ladegerät", "", &[]));
        let v2 = marketplace_title_v2(inputs("Ladegerät", "", &[]));
        assert_eq!(v1, "Ladegerät");
        assert!(v2.is_empty());
    }

    #[test]
    fn oversized_single_token_is_dropped_rather_than_split() {
        let token = "X".repeat(V1_MAX_CHARS + 20);
        assert_eq!(truncate_at_word(&token, V1_MAX_CHARS), "");
        assert_eq!(truncate_at_word(&token, V2_MAX_CHARS), "");
    }

    #[test]
    fn titles_respect_length_bounds_at_word_boundaries() {
        let long_word = "Wort".repeat(10);
        let title = std::iter::repeat(long_word.as_str())
            .take(8)
            .collect::<Vec<_>>()
            .join(" ");
        let v1 = truncate_at_word(&title, V1_MAX_CHARS);
        let v2 = truncate_at_word(&title, V2_MAX_CHARS);
        assert!(v1.chars().count() <= V1_MAX_CHARS);
        assert!(v2.chars().count() <= V2_MAX_CHARS);
        assert!(!v1.ends_with(|c: char| c.is_alphanumeric()) || title.starts_with(&v1));
        // A cut never splits a word: the result must be a prefix of the
        // original ending exactly at a space.
        assert_eq!(&title[v1.len()..v1.len() + 1], " ");
        assert_eq!(&title[v2.len()..v2.len() + 1], " ");
    }
}
