//! Cleanup and validation of generated text.
//!
//! Checks here are quality signals, not gates: issues are surfaced to the
//! caller while the cleaned text stays usable.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

/// Exactly this many selling points go out per record.
pub const USP_COUNT: usize = 5;

const MIN_SENTENCES: usize = 2;
const MAX_SENTENCES: usize = 6;
const MIN_BULLET_CHARS: usize = 8;
const MAX_BULLET_CHARS: usize = 120;

/// Generic filler the generator likes to produce; removed outright.
const BOILERPLATE: [&str; 5] = [
    "in höchster qualität",
    "für höchste ansprüche",
    "modernste technologie",
    "perfekt für jeden anlass",
    "state of the art",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum ValidationIssue {
    BoilerplateRemoved(String),
    SentenceCountOutOfRange(usize),
    /// No unit-qualified number anywhere in the narrative.
    NotProductSpecific,
    UspCountMismatch(usize),
    UspTooShort(String),
    UspTooLong(String),
}

/// Strips leading list-bullet/bold markup artifacts and collapses repeated
/// whitespace. Applied to every generated field and re-applied by the
/// renderer before insertion.
pub fn clean_markup(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let mut line = line.trim();
        loop {
            let stripped = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .or_else(|| line.strip_prefix("– "))
                .or_else(|| line.strip_prefix("#"));
            match stripped {
                Some(rest) => line = rest.trim_start(),
                None => break,
            }
        }
        if !line.is_empty() {
            lines.push(line.replace("**", ""));
        }
    }
    collapse_whitespace(&lines.join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes tags and decodes the handful of entities supplier HTML actually
/// uses. Good enough for product descriptions; not a general HTML parser.
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                if in_tag {
                    in_tag = false;
                    out.push(' ');
                } else {
                    out.push('>');
                }
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

pub fn remove_boilerplate(text: &str) -> (String, Vec<ValidationIssue>) {
    let mut cleaned = text.to_string();
    let mut issues = Vec::new();
    for phrase in BOILERPLATE {
        while let Some((start, end)) = find_ignore_case(&cleaned, phrase) {
            cleaned.replace_range(start..end, "");
            issues.push(ValidationIssue::BoilerplateRemoved(phrase.to_string()));
        }
    }
    (collapse_whitespace(&cleaned), issues)
}

/// Case-insensitive substring search returning byte offsets into `haystack`
/// itself. Offsets found in a lowercased copy must not be reused on the
/// original: lowercasing can change byte lengths (U+0130 and friends).
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    for (start, _) in haystack.char_indices() {
        let mut end = start;
        let mut matched = 0;
        for ch in haystack[start..].chars() {
            end += ch.len_utf8();
            let mut aligned = true;
            for low in ch.to_lowercase() {
                if matched >= needle.len() || needle[matched] != low {
                    aligned = false;
                    break;
                }
                matched += 1;
            }
            if !aligned {
                break;
            }
            if matched == needle.len() {
                return Some((start, end));
            }
        }
    }
    None
}

pub struct Validator {
    sentence_end: Regex,
    unit_number: Regex,
}

impl Validator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sentence_end: Regex::new(r"[.!?](\s|$)")?,
            unit_number: Regex::new(r"(?i)\d+(?:[.,]\d+)?\s*(V|mAh|Ah|Wh|W|A|g|kg|mm|cm)\b")?,
        })
    }

    /// Cleans a narrative and reports quality flags. None of the flags is
    /// fatal; a narrative without numeric content is still usable, just not
    /// product-specific.
    pub fn validate_narrative(&self, text: &str) -> (String, Vec<ValidationIssue>) {
        let (cleaned, mut issues) = remove_boilerplate(&clean_markup(text));

        let sentences = self.sentence_end.find_iter(&cleaned).count().max(
            // A narrative without terminal punctuation is one sentence.
            usize::from(!cleaned.is_empty()),
        );
        if !(MIN_SENTENCES..=MAX_SENTENCES).contains(&sentences) {
            issues.push(ValidationIssue::SentenceCountOutOfRange(sentences));
        }
        if !self.unit_number.is_match(&cleaned) {
            issues.push(ValidationIssue::NotProductSpecific);
        }
        (cleaned, issues)
    }

    /// Cleans generated bullets and pads or trims to exactly [`USP_COUNT`],
    /// drawing unused category templates in order and never repeating one
    /// that is already present.
    pub fn validate_usps(
        &self,
        bullets: Vec<String>,
        templates: &[String],
    ) -> (Vec<String>, Vec<ValidationIssue>) {
        let mut issues = Vec::new();

        let mut cleaned: Vec<String> = bullets
            .iter()
            .map(|bullet| remove_boilerplate(&clean_markup(bullet)).0)
            .filter(|bullet| !bullet.is_empty())
            .collect();

        if cleaned.len() != USP_COUNT {
            issues.push(ValidationIssue::UspCountMismatch(cleaned.len()));
        }
        for bullet in &cleaned {
            if bullet.chars().count() < MIN_BULLET_CHARS {
                issues.push(ValidationIssue::UspTooShort(bullet.clone()));
            } else if bullet.chars().count() > MAX_BULLET_CHARS {
                issues.push(ValidationIssue::UspTooLong(bullet.clone()));
            }
        }

        cleaned.truncate(USP_COUNT);
        for template in templates {
            if cleaned.len() == USP_COUNT {
                break;
            }
            let used = cleaned
                .iter()
                .any(|bullet| bullet.eq_ignore_ascii_case(template));
            if !used {
                cleaned.push(template.clone());
            }
        }
        (cleaned, issues)
    }
}
