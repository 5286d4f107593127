//! warelift: normalization and AI-copy pipeline for low-trust supplier
//! product data.
//!
//! The library half exposes three operations: [`pipeline::Normalizer`] turns
//! raw bytes or scraped records into normalized records,
//! [`generate::PromptOrchestrator::enrich`] produces validated product copy
//! with category fallbacks, and [`html::render`] assembles the final
//! marketplace fragment.

pub mod categorize;
pub mod columns;
pub mod dedupe;
pub mod delimiter;
pub mod encoding;
pub mod extract;
pub mod generate;
pub mod html;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod tabular;
pub mod titles;
pub mod util;

pub use categorize::{CategoryCatalog, CategoryConfig};
pub use columns::SemanticField;
pub use generate::{
    ENRICH_CONCURRENCY, EnrichOutcome, PromptOrchestrator, SubpromptKind, TemplateGenerator,
    TextGenerator,
};
pub use model::{NormalizedRecord, ProductCopy, RawRecord, SpecSource};
pub use pipeline::{NormalizeOutcome, Normalizer};
pub use tabular::NormalizeError;
