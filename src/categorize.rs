//! Category configuration and keyword-scored category assignment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::columns::SemanticField;

/// One technical field a category cares about. Label and unit come from the
/// semantic field itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalFieldSpec {
    pub field: SemanticField,
    #[serde(default)]
    pub required: bool,
    /// Shown when no tier of the merge produced a value for a required field.
    #[serde(default)]
    pub fallback: Option<String>,
}

impl TechnicalFieldSpec {
    fn new(field: SemanticField) -> Self {
        Self {
            field,
            required: false,
            fallback: None,
        }
    }

    fn required(field: SemanticField, fallback: &str) -> Self {
        Self {
            field,
            required: true,
            fallback: Some(fallback.to_string()),
        }
    }
}

/// Static, versioned per-category vocabulary. Read-only at runtime; selected
/// once per record and referenced by every downstream stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub tech_fields: Vec<TechnicalFieldSpec>,
    pub usp_templates: Vec<String>,
    pub default_safety_notice: String,
    pub default_highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCatalog {
    pub version: u32,
    pub default_category: String,
    pub categories: Vec<CategoryConfig>,
}

impl CategoryCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self =
            serde_json::from_str(json).context("failed to parse category catalog json")?;
        catalog
            .get(&catalog.default_category)
            .context("default category missing from catalog")?;
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|category| category.id == id)
    }

    fn default_config(&self) -> &CategoryConfig {
        self.get(&self.default_category)
            .unwrap_or_else(|| &self.categories[0])
    }

    /// Keyword-scored assignment over lower-cased concatenated record text.
    /// The strictly highest count wins; ties keep the first-seen category;
    /// an all-zero score falls back to the default category.
    pub fn categorize(&self, text: &str) -> &CategoryConfig {
        let lowered = text.to_lowercase();

        let mut best: Option<(&CategoryConfig, usize)> = None;
        for category in &self.categories {
            let hits = category
                .keywords
                .iter()
                .filter(|keyword| lowered.contains(keyword.as_str()))
                .count();
            if hits == 0 {
                continue;
            }
            match best {
                Some((_, top)) if hits <= top => {}
                _ => best = Some((category, hits)),
            }
        }

        best.map(|(category, _)| category)
            .unwrap_or_else(|| self.default_config())
    }

    /// Built-in catalog tuned for battery and charger assortments.
    pub fn builtin() -> Self {
        let cells = CategoryConfig {
            id: "lithium-zellen".to_string(),
            name: "Lithium-Ionen Zellen".to_string(),
            keywords: vec_of(&[
                "li-ion", "lithium", "18650", "21700", "26650", "akkuzelle", "zelle", "mah",
                "wiederaufladbar", "entladestrom",
            ]),
            tech_fields: vec![
                TechnicalFieldSpec::required(SemanticField::Voltage, "3.6 V"),
                TechnicalFieldSpec::required(SemanticField::Capacity, "siehe Zellaufdruck"),
                TechnicalFieldSpec::new(SemanticField::Current),
                TechnicalFieldSpec::new(SemanticField::Chemistry),
                TechnicalFieldSpec::new(SemanticField::Diameter),
                TechnicalFieldSpec::new(SemanticField::Length),
                TechnicalFieldSpec::new(SemanticField::Weight),
            ],
            usp_templates: vec_of(&[
                "Hohe Zyklenfestigkeit für den Dauereinsatz",
                "Geprüfte Markenzelle mit stabiler Spannungslage",
                "Geringe Selbstentladung bei Lagerung",
                "Belastbar bis zum angegebenen Dauerstrom",
                "Frische Ware direkt aus klimatisierter Lagerung",
                "Passend für Taschenlampen, E-Bikes und Powertools",
            ]),
            default_safety_notice: "Lithium-Zellen nur mit geeignetem Ladegerät laden, \
                nicht kurzschließen und von Kindern fernhalten. Beschädigte Zellen \
                nicht weiterverwenden."
                .to_string(),
            default_highlights: vec_of(&[
                "Markenqualität",
                "Schneller Versand aus Deutschland",
                "Fachgerechte Lagerung",
            ]),
        };

        let chargers = CategoryConfig {
            id: "ladegeraete".to_string(),
            name: "Ladegeräte".to_string(),
            keywords: vec_of(&[
                "ladegerät", "charger", "ladeschacht", "ladestrom", "schnellladung", "laden",
            ]),
            tech_fields: vec![
                TechnicalFieldSpec::required(SemanticField::Voltage, "siehe Typenschild"),
                TechnicalFieldSpec::new(SemanticField::Current),
                TechnicalFieldSpec::new(SemanticField::Wattage),
                TechnicalFieldSpec::new(SemanticField::Weight),
            ],
            usp_templates: vec_of(&[
                "Intelligente Ladeüberwachung je Schacht",
                "Schutz vor Überladung und Verpolung",
                "Kompaktes Gehäuse für unterwegs",
                "Für gängige Rundzellenformate geeignet",
                "Automatische Ladeschlusserkennung",
            ]),
            default_safety_notice: "Ladegerät nur unter Aufsicht betreiben und ausschließlich \
                für die angegebenen Akkutypen verwenden."
                .to_string(),
            default_highlights: vec_of(&["Einfache Bedienung", "Sicherer Betrieb"]),
        };

        let power_supplies = CategoryConfig {
            id: "netzteile".to_string(),
            name: "Netzteile".to_string(),
            keywords: vec_of(&[
                "netzteil", "power supply", "steckernetzteil", "notebook", "adapter", "ac/dc",
            ]),
            tech_fields: vec![
                TechnicalFieldSpec::required(SemanticField::Voltage, "siehe Typenschild"),
                TechnicalFieldSpec::new(SemanticField::Current),
                TechnicalFieldSpec::new(SemanticField::Wattage),
                TechnicalFieldSpec::new(SemanticField::Weight),
            ],
            usp_templates: vec_of(&[
                "Stabile Ausgangsspannung auch unter Last",
                "Schutz gegen Kurzschluss und Überhitzung",
                "Energieeffiziente Schaltnetzteiltechnik",
                "Breiter Eingangsspannungsbereich",
                "Leiser Betrieb ohne Lüfter",
            ]),
            default_safety_notice: "Netzteil nur in trockenen Innenräumen verwenden und bei \
                sichtbaren Schäden sofort vom Netz trennen."
                .to_string(),
            default_highlights: vec_of(&["Zuverlässige Stromversorgung", "Geprüfte Sicherheit"]),
        };

        let batteries = CategoryConfig {
            id: "batterien".to_string(),
            name: "Batterien".to_string(),
            keywords: vec_of(&["batterie", "alkaline", "knopfzelle", "einwegbatterie"]),
            tech_fields: vec![
                TechnicalFieldSpec::required(SemanticField::Voltage, "1.5 V"),
                TechnicalFieldSpec::new(SemanticField::Capacity),
                TechnicalFieldSpec::new(SemanticField::Chemistry),
                TechnicalFieldSpec::new(SemanticField::Weight),
            ],
            usp_templates: vec_of(&[
                "Lange Lagerfähigkeit durch auslaufsichere Fertigung",
                "Konstante Leistungsabgabe bis zur Entladung",
                "Ideal für Alltagsgeräte mit geringem Strombedarf",
                "Einzeln entnehmbar dank wiederverschließbarer Verpackung",
                "Quecksilber- und cadmiumfrei",
            ]),
            default_safety_notice: "Batterien nicht aufladen, nicht öffnen und nicht ins Feuer \
                werfen. Leere Batterien der Sammelstelle zuführen."
                .to_string(),
            default_highlights: vec_of(&["Frische Markenware", "Lange Haltbarkeit"]),
        };

        let accessories = CategoryConfig {
            id: "zubehoer".to_string(),
            name: "Zubehör".to_string(),
            keywords: vec_of(&["halter", "box", "etui", "adapter", "kabel"]),
            tech_fields: vec![
                TechnicalFieldSpec::new(SemanticField::Length),
                TechnicalFieldSpec::new(SemanticField::Width),
                TechnicalFieldSpec::new(SemanticField::Height),
                TechnicalFieldSpec::new(SemanticField::Weight),
            ],
            usp_templates: vec_of(&[
                "Passgenaue Verarbeitung",
                "Robustes Material für den täglichen Einsatz",
                "Einfache Handhabung ohne Werkzeug",
                "Platzsparend zu verstauen",
                "Vielseitig einsetzbar",
            ]),
            default_safety_notice: "Produkt von Kindern fernhalten und nur bestimmungsgemäß \
                verwenden."
                .to_string(),
            default_highlights: vec_of(&["Praktisches Zubehör", "Gutes Preis-Leistungs-Verhältnis"]),
        };

        Self {
            version: 1,
            default_category: "zubehoer".to_string(),
            categories: vec![cells, chargers, power_supplies, batteries, accessories],
        }
    }
}

fn vec_of(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_keyword_count_wins() {
        let catalog = CategoryCatalog::builtin();
        let config =
            catalog.categorize("XTAR 21700 Li-Ion Akkuzelle 5000 mAh wiederaufladbar");
        assert_eq!(config.id, "lithium-zellen");
    }

    #[test]
    fn zero_hits_fall_back_to_default() {
        let catalog = CategoryCatalog::builtin();
        assert_eq!(catalog.categorize("Gartenschlauch 20m").id, "zubehoer");
    }

    #[test]
    fn ties_keep_first_seen_category() {
        let catalog = CategoryCatalog::builtin();
        // "laden" hits chargers once, "netzteil" hits power supplies once;
        // chargers come first in the catalog.
        let config = catalog.categorize("netzteil zum laden");
        assert_eq!(config.id, "ladegeraete");
    }

    #[test]
    fn catalog_round_trips_through_json() {
        let catalog = CategoryCatalog::builtin();
        let json = serde_json::to_string(&catalog).unwrap();
        let parsed = CategoryCatalog::from_json(&json).unwrap();
        assert_eq!(parsed.categories.len(), catalog.categories.len());
        assert_eq!(parsed.default_category, "zubehoer");
    }
}
