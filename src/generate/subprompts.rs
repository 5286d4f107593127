//! The fixed set of generation subtasks and their prompt templates.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::categorize::CategoryConfig;
use crate::model::NormalizedRecord;

/// Shared instruction block prepended to every subprompt's system prompt.
pub const BASE_INSTRUCTIONS: &str = "Du schreibst Produkttexte für einen deutschen \
Online-Fachhandel für Akkus, Batterien und Ladetechnik. Bleibe sachlich, erfinde \
keine technischen Werte und verwende ausschließlich die gelieferten Produktdaten. \
Antworte auf Deutsch.";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SubpromptKind {
    Narrative,
    UspGeneration,
    TechExtraction,
    SafetyWarnings,
    PackageContents,
}

pub const ALL_SUBPROMPTS: [SubpromptKind; 5] = [
    SubpromptKind::Narrative,
    SubpromptKind::UspGeneration,
    SubpromptKind::TechExtraction,
    SubpromptKind::SafetyWarnings,
    SubpromptKind::PackageContents,
];

impl SubpromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::UspGeneration => "usp-generation",
            Self::TechExtraction => "tech-extraction",
            Self::SafetyWarnings => "safety-warnings",
            Self::PackageContents => "package-contents",
        }
    }

    /// Structured subprompts must return well-formed JSON; anything else is a
    /// failed result, never a guessed object.
    pub fn structured(self) -> bool {
        matches!(self, Self::UspGeneration | Self::TechExtraction)
    }

    pub fn temperature(self) -> f32 {
        match self {
            Self::Narrative => 0.7,
            Self::UspGeneration => 0.8,
            Self::TechExtraction => 0.2,
            Self::SafetyWarnings => 0.3,
            Self::PackageContents => 0.4,
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Narrative => 400,
            Self::UspGeneration => 300,
            Self::TechExtraction => 300,
            Self::SafetyWarnings => 200,
            Self::PackageContents => 150,
        }
    }

    pub fn system_prompt(self, category: &CategoryConfig) -> String {
        let task = match self {
            Self::Narrative => {
                "Schreibe eine Produktbeschreibung mit zwei bis sechs Sätzen. \
                 Nenne mindestens einen technischen Wert mit Einheit."
                    .to_string()
            }
            Self::UspGeneration => {
                "Nenne genau fünf Verkaufsargumente als JSON-Array aus Strings. \
                 Keine Einleitung, nur das Array."
                    .to_string()
            }
            Self::TechExtraction => {
                "Extrahiere technische Daten als flaches JSON-Objekt \
                 {\"Merkmal\": \"Wert\"}. Nimm nur Werte auf, die in den \
                 Produktdaten belegt sind."
                    .to_string()
            }
            Self::SafetyWarnings => format!(
                "Formuliere einen kurzen Sicherheitshinweis für die Kategorie {}.",
                category.name
            ),
            Self::PackageContents => {
                "Beschreibe den Lieferumfang in einem Satz.".to_string()
            }
        };
        format!("{BASE_INSTRUCTIONS}\n\n{task}")
    }

    pub fn user_prompt(self, record: &NormalizedRecord) -> String {
        let mut prompt = String::new();
        prompt.push_str("Produktdaten:\n");
        prompt.push_str(&format!("Titel: {}\n", record.title));
        if !record.brand.is_empty() {
            prompt.push_str(&format!("Marke: {}\n", record.brand));
        }
        if !record.model_codes.is_empty() {
            prompt.push_str(&format!("Modellcodes: {}\n", record.model_codes.join(", ")));
        }
        for (field, spec) in &record.technical_specs {
            prompt.push_str(&format!("{}: {}\n", field.label(), spec.value));
        }
        if !record.description.is_empty() {
            prompt.push_str(&format!("Beschreibung: {}\n", record.description));
        }
        prompt
    }
}
