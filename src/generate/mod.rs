//! AI-text orchestration: subprompt templates, the generator port, the
//! concurrent orchestrator and post-generation validation.

pub mod client;
pub mod orchestrator;
pub mod postprocess;
pub mod subprompts;

pub use client::{GenerateError, GenerationCall, TemplateGenerator, TextGenerator};
pub use orchestrator::{
    ENRICH_CONCURRENCY, EnrichOutcome, GenerationResult, PromptOrchestrator, RetryPolicy,
    SubpromptOutcome,
};
pub use postprocess::{USP_COUNT, ValidationIssue, Validator};
pub use subprompts::{ALL_SUBPROMPTS, BASE_INSTRUCTIONS, SubpromptKind};
