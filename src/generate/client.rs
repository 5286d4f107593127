//! Port to the text-generation service.
//!
//! Only the call contract matters here; transport and authentication live
//! outside this crate. An offline deterministic implementation ships in-tree
//! so the CLI and tests work without a backend.

use async_trait::async_trait;

use super::subprompts::SubpromptKind;

#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub kind: SubpromptKind,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub structured: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("rate limited by generation backend")]
    RateLimited,
    #[error("generation call timed out")]
    TimedOut,
    #[error("generation backend failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, call: &GenerationCall) -> Result<String, GenerateError>;
}

/// Deterministic stand-in for the remote service: category-agnostic stock
/// copy for text subprompts, empty-but-valid JSON for structured ones. The
/// validator flags its narrative as not product-specific, which is exactly
/// the quality signal callers should see for canned text.
pub struct TemplateGenerator;

#[async_trait]
impl TextGenerator for TemplateGenerator {
    async fn generate(&self, call: &GenerationCall) -> Result<String, GenerateError> {
        let response = match call.kind {
            SubpromptKind::Narrative => {
                "Dieser Artikel überzeugt mit solider Leistung im Alltag. \
                 Alle Kennwerte entnehmen Sie den technischen Daten."
            }
            SubpromptKind::UspGeneration => "[]",
            SubpromptKind::TechExtraction => "{}",
            SubpromptKind::SafetyWarnings => {
                "Bitte beachten Sie die Sicherheitshinweise des Herstellers."
            }
            SubpromptKind::PackageContents => "1x Artikel wie in der Beschreibung angegeben.",
        };
        Ok(response.to_string())
    }
}
