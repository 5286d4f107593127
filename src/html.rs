//! Deterministic assembly of the marketplace description fragment.
//!
//! Presentation only: the single piece of logic is omitting the spec table
//! when the merge produced nothing. Generation output is never trusted
//! verbatim; every string passes back through markup cleanup and is escaped
//! on insertion.

use crate::categorize::CategoryConfig;
use crate::generate::postprocess::clean_markup;
use crate::merge::{MergedSpec, merge_tech_specs};
use crate::model::{NormalizedRecord, ProductCopy};

const CHECK_MARK: &str = "✔";

/// Renders the final HTML fragment for one record.
pub fn render(record: &NormalizedRecord, copy: &ProductCopy, category: &CategoryConfig) -> String {
    let specs = merge_tech_specs(record, copy, category);
    render_with_specs(record, copy, &specs)
}

pub fn render_with_specs(
    record: &NormalizedRecord,
    copy: &ProductCopy,
    specs: &[MergedSpec],
) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"product-description\">\n");
    out.push_str(&format!("<h2>{}</h2>\n", clean(&record.title)));

    if !copy.narrative.is_empty() {
        out.push_str(&format!("<p>{}</p>\n", clean(&copy.narrative)));
    }

    out.push_str("<ul class=\"usp-list\">\n");
    for bullet in &copy.usp_bullets {
        out.push_str(&format!("<li>{CHECK_MARK} {}</li>\n", clean(bullet)));
    }
    out.push_str("</ul>\n");

    if !copy.product_highlights.is_empty() {
        out.push_str("<ul class=\"highlights\">\n");
        for highlight in &copy.product_highlights {
            out.push_str(&format!("<li>{}</li>\n", clean(highlight)));
        }
        out.push_str("</ul>\n");
    }

    if !specs.is_empty() {
        out.push_str("<h3>Technische Daten</h3>\n<table class=\"tech-specs\">\n");
        for spec in specs {
            out.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                clean(&spec.label),
                clean(&spec.value)
            ));
        }
        out.push_str("</table>\n");
    }

    if let Some(safety) = copy.safety_notice.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!(
            "<p class=\"safety-notice\"><strong>Sicherheitshinweis:</strong> {}</p>\n",
            clean(safety)
        ));
    }
    if let Some(contents) = copy.package_contents.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!(
            "<p class=\"package-contents\"><strong>Lieferumfang:</strong> {}</p>\n",
            clean(contents)
        ));
    }

    out.push_str("</div>\n");
    out
}

fn clean(text: &str) -> String {
    escape_html(&clean_markup(text))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::CategoryCatalog;
    use crate::columns::SemanticField;
    use crate::model::{SpecSource, SpecValue};
    use std::collections::BTreeMap;

    fn record() -> NormalizedRecord {
        let mut specs = BTreeMap::new();
        specs.insert(
            SemanticField::Voltage,
            SpecValue {
                value: "3.6 V".to_string(),
                source: SpecSource::Structured,
            },
        );
        NormalizedRecord {
            sku: "A1".to_string(),
            title: "XTAR 21700-HP Akku".to_string(),
            description: String::new(),
            brand: "XTAR".to_string(),
            marketplace_title_v1: String::new(),
            marketplace_title_v2: String::new(),
            technical_specs: specs,
            category: "lithium-zellen".to_string(),
            is_duplicate: false,
            model_codes: Vec::new(),
        }
    }

    fn copy() -> ProductCopy {
        ProductCopy {
            narrative: "Starke Zelle mit 5000 mAh.".to_string(),
            usp_bullets: (1..=5).map(|n| format!("Punkt {n}")).collect(),
            technical_specs: BTreeMap::new(),
            safety_notice: Some("Nicht kurzschließen.".to_string()),
            package_contents: Some("1x Zelle".to_string()),
            product_highlights: vec!["Markenqualität".to_string()],
        }
    }

    #[test]
    fn fragment_contains_all_sections() {
        let catalog = CategoryCatalog::builtin();
        let category = catalog.get("lithium-zellen").unwrap();
        let html = render(&record(), &copy(), category);

        assert!(html.contains("<h2>XTAR 21700-HP Akku</h2>"));
        assert!(html.contains("Starke Zelle mit 5000 mAh."));
        assert_eq!(html.matches("<li>✔").count(), 5);
        assert!(html.contains("<tr><th>Spannung</th><td>3.6 V</td></tr>"));
        assert!(html.contains("Sicherheitshinweis:"));
        assert!(html.contains("Lieferumfang:"));
    }

    #[test]
    fn spec_table_is_omitted_when_merge_is_empty() {
        let mut record = record();
        record.technical_specs.clear();
        let mut copy = copy();
        copy.safety_notice = None;
        copy.package_contents = None;

        // A category without required fields produces no fallback rows.
        let catalog = CategoryCatalog::builtin();
        let category = catalog.get("zubehoer").unwrap();
        let html = render(&record, &copy, category);
        assert!(!html.contains("<table"));
    }

    #[test]
    fn generated_text_is_escaped_and_cleaned_on_insertion() {
        let mut copy = copy();
        copy.narrative = "- **Toller** Text <script>alert(1)</script>".to_string();
        let catalog = CategoryCatalog::builtin();
        let category = catalog.get("zubehoer").unwrap();
        let html = render(&record(), &copy, category);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("**"));
    }
}
