//! Concurrent subprompt execution with retry, timeout and fallback merge.
//!
//! Fire all requested subprompts for a record, collect every result whether
//! it succeeded or not, and assemble a shape-complete [`ProductCopy`]:
//! category fallback content stands in for anything that failed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::categorize::CategoryConfig;
use crate::model::{NormalizedRecord, ProductCopy};

use super::client::{GenerateError, GenerationCall, TextGenerator};
use super::postprocess::{ValidationIssue, Validator, clean_markup};
use super::subprompts::SubpromptKind;

/// Batch window: how many records are enriched concurrently. Third-party
/// rate limits make unbounded fan-out an explicit non-goal.
pub const ENRICH_CONCURRENCY: usize = 5;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        // Base delay doubles with each attempt.
        self.base_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Payload of one successful subprompt: parsed structured data or raw text,
/// never both.
#[derive(Debug, Clone)]
pub enum SubpromptOutcome {
    Text(String),
    Structured(Value),
}

/// Uniform result of one subprompt execution.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub outcome: Option<SubpromptOutcome>,
    pub error: Option<String>,
}

impl GenerationResult {
    fn ok(outcome: SubpromptOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            outcome: None,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Copy assembly result with the quality signals surfaced to the caller.
#[derive(Debug)]
pub struct EnrichOutcome {
    pub copy: ProductCopy,
    pub issues: Vec<ValidationIssue>,
    /// Subprompts that ended failed, with their captured error.
    pub failed: Vec<(SubpromptKind, String)>,
}

pub struct PromptOrchestrator {
    generator: Arc<dyn TextGenerator>,
    validator: Validator,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl PromptOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self> {
        Ok(Self {
            generator,
            validator: Validator::new()?,
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Runs the requested subprompts concurrently and returns every result;
    /// one failure never blocks the siblings.
    pub async fn run_subprompts(
        &self,
        record: &NormalizedRecord,
        category: &CategoryConfig,
        requested: &[SubpromptKind],
    ) -> BTreeMap<SubpromptKind, GenerationResult> {
        let calls = requested.iter().map(|kind| async move {
            (*kind, self.run_one(*kind, record, category).await)
        });
        join_all(calls).await.into_iter().collect()
    }

    async fn run_one(
        &self,
        kind: SubpromptKind,
        record: &NormalizedRecord,
        category: &CategoryConfig,
    ) -> GenerationResult {
        let call = GenerationCall {
            kind,
            system_prompt: kind.system_prompt(category),
            user_prompt: kind.user_prompt(record),
            temperature: kind.temperature(),
            max_tokens: kind.max_tokens(),
            structured: kind.structured(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = match timeout(self.call_timeout, self.generator.generate(&call)).await {
                // A stalled call must not block the batch; a timeout is a failure.
                Err(_) => {
                    warn!(subprompt = kind.as_str(), "generation call timed out");
                    return GenerationResult::failed(GenerateError::TimedOut.to_string());
                }
                Ok(Err(GenerateError::RateLimited)) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        subprompt = kind.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                    continue;
                }
                Ok(Err(err)) => {
                    warn!(subprompt = kind.as_str(), error = %err, "generation failed");
                    return GenerationResult::failed(err.to_string());
                }
                Ok(Ok(response)) => response,
            };

            if !call.structured {
                return GenerationResult::ok(SubpromptOutcome::Text(response));
            }
            return match serde_json::from_str::<Value>(&response) {
                Ok(value) => GenerationResult::ok(SubpromptOutcome::Structured(value)),
                Err(err) => {
                    warn!(subprompt = kind.as_str(), error = %err, "invalid structured response");
                    GenerationResult::failed(format!("invalid structured response: {err}"))
                }
            };
        }
    }

    /// Generates and assembles the copy for one record. Failed subprompts
    /// are substituted with category-level fallback content; the returned
    /// copy is always shape-complete.
    pub async fn enrich(
        &self,
        record: &NormalizedRecord,
        category: &CategoryConfig,
        requested: &[SubpromptKind],
    ) -> EnrichOutcome {
        let results = self.run_subprompts(record, category, requested).await;
        self.assemble(record, category, results)
    }

    /// Enriches a batch with at most `concurrency` records in flight.
    pub async fn enrich_batch(
        &self,
        records: &[NormalizedRecord],
        categories: &[&CategoryConfig],
        requested: &[SubpromptKind],
        concurrency: usize,
    ) -> Vec<EnrichOutcome> {
        let window = Arc::new(Semaphore::new(concurrency.max(1)));
        let tasks = records.iter().zip(categories).map(|(record, category)| {
            let window = Arc::clone(&window);
            async move {
                // The semaphore lives for the whole batch and is never closed.
                let _permit = window.acquire().await.expect("batch window closed");
                self.enrich(record, category, requested).await
            }
        });
        join_all(tasks).await
    }

    fn assemble(
        &self,
        record: &NormalizedRecord,
        category: &CategoryConfig,
        mut results: BTreeMap<SubpromptKind, GenerationResult>,
    ) -> EnrichOutcome {
        let mut issues = Vec::new();
        let mut failed = Vec::new();
        let mut take = |kind: SubpromptKind| -> Option<SubpromptOutcome> {
            let result = results.remove(&kind)?;
            match result.outcome {
                Some(outcome) => Some(outcome),
                None => {
                    failed.push((kind, result.error.unwrap_or_default()));
                    None
                }
            }
        };

        let narrative = match take(SubpromptKind::Narrative) {
            Some(SubpromptOutcome::Text(text)) => {
                let (cleaned, narrative_issues) = self.validator.validate_narrative(&text);
                issues.extend(narrative_issues);
                cleaned
            }
            _ => fallback_narrative(record, category),
        };

        let bullets = match take(SubpromptKind::UspGeneration) {
            Some(SubpromptOutcome::Structured(value)) => string_array(&value),
            _ => Vec::new(),
        };
        let (usp_bullets, usp_issues) =
            self.validator.validate_usps(bullets, &category.usp_templates);
        issues.extend(usp_issues);

        let technical_specs = match take(SubpromptKind::TechExtraction) {
            Some(SubpromptOutcome::Structured(value)) => string_map(&value),
            _ => BTreeMap::new(),
        };

        let safety_notice = match take(SubpromptKind::SafetyWarnings) {
            Some(SubpromptOutcome::Text(text)) => Some(clean_markup(&text)),
            _ => Some(category.default_safety_notice.clone()),
        };

        let package_contents = match take(SubpromptKind::PackageContents) {
            Some(SubpromptOutcome::Text(text)) => Some(clean_markup(&text)),
            _ => None,
        };

        if !failed.is_empty() {
            info!(
                sku = %record.sku,
                failed = failed.len(),
                "subprompts substituted with category fallbacks"
            );
        }

        EnrichOutcome {
            copy: ProductCopy {
                narrative,
                usp_bullets,
                technical_specs,
                safety_notice,
                package_contents,
                product_highlights: category.default_highlights.clone(),
            },
            issues,
            failed,
        }
    }
}

fn fallback_narrative(record: &NormalizedRecord, category: &CategoryConfig) -> String {
    if !record.description.is_empty() {
        record.description.clone()
    } else {
        format!("{} aus der Kategorie {}.", record.title, category.name)
    }
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, item)| {
                    let rendered = match item {
                        Value::String(text) => Some(text.clone()),
                        Value::Number(number) => Some(number.to_string()),
                        _ => None,
                    };
                    rendered.map(|text| (key.clone(), text))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::CategoryCatalog;
    use crate::columns::SemanticField;
    use crate::generate::subprompts::ALL_SUBPROMPTS;
    use crate::model::SpecValue;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record() -> NormalizedRecord {
        let mut specs = BTreeMap::new();
        specs.insert(SemanticField::Capacity, SpecValue::extracted("5000 mAh"));
        NormalizedRecord {
            sku: "A1".to_string(),
            title: "XTAR 21700-HP Akku".to_string(),
            description: "Hochstromzelle mit 25A Dauerstrom.".to_string(),
            brand: "XTAR".to_string(),
            marketplace_title_v1: String::new(),
            marketplace_title_v2: String::new(),
            technical_specs: specs,
            category: "lithium-zellen".to_string(),
            is_duplicate: false,
            model_codes: vec!["21700-HP".to_string()],
        }
    }

    fn category() -> CategoryConfig {
        CategoryCatalog::builtin()
            .get("lithium-zellen")
            .unwrap()
            .clone()
    }

    /// Scripted backend: per-kind canned responses or failures.
    struct Scripted<F: Fn(&GenerationCall) -> Result<String, GenerateError> + Send + Sync>(F);

    #[async_trait::async_trait]
    impl<F> TextGenerator for Scripted<F>
    where
        F: Fn(&GenerationCall) -> Result<String, GenerateError> + Send + Sync,
    {
        async fn generate(&self, call: &GenerationCall) -> Result<String, GenerateError> {
            (self.0)(call)
        }
    }

    fn orchestrator(
        generator: impl TextGenerator + 'static,
    ) -> PromptOrchestrator {
        PromptOrchestrator::new(Arc::new(generator))
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            })
            .with_call_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn failed_safety_subprompt_falls_back_while_narrative_survives() {
        let orchestrator = orchestrator(Scripted(|call: &GenerationCall| match call.kind {
            SubpromptKind::SafetyWarnings => Err(GenerateError::TimedOut),
            SubpromptKind::Narrative => Ok(
                "Die Zelle liefert 5000 mAh. Sie verkraftet 25A Dauerstrom.".to_string(),
            ),
            SubpromptKind::UspGeneration => Ok("[\"Starke Leistung im Dauereinsatz\"]".to_string()),
            SubpromptKind::TechExtraction => Ok("{}".to_string()),
            SubpromptKind::PackageContents => Ok("1x Zelle".to_string()),
        }));

        let outcome = orchestrator
            .enrich(&record(), &category(), &ALL_SUBPROMPTS)
            .await;

        assert!(outcome.copy.narrative.contains("5000 mAh"));
        assert_eq!(
            outcome.copy.safety_notice.as_deref(),
            Some(category().default_safety_notice.as_str())
        );
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, SubpromptKind::SafetyWarnings);
        assert_eq!(outcome.copy.usp_bullets.len(), 5);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_with_backoff_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&attempts);
        let orchestrator = orchestrator(Scripted(move |call: &GenerationCall| {
            if call.kind == SubpromptKind::Narrative
                && seen.fetch_add(1, Ordering::SeqCst) < 2
            {
                Err(GenerateError::RateLimited)
            } else {
                Ok("Erster Satz mit 5000 mAh. Zweiter Satz.".to_string())
            }
        }));

        let results = orchestrator
            .run_subprompts(&record(), &category(), &[SubpromptKind::Narrative])
            .await;
        assert!(results[&SubpromptKind::Narrative].success());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_single_subprompt() {
        let orchestrator = orchestrator(Scripted(|_: &GenerationCall| {
            Err(GenerateError::RateLimited)
        }));
        let results = orchestrator
            .run_subprompts(&record(), &category(), &[SubpromptKind::Narrative])
            .await;
        assert!(!results[&SubpromptKind::Narrative].success());
    }

    #[tokio::test]
    async fn malformed_structured_response_is_a_failed_result() {
        let orchestrator = orchestrator(Scripted(|call: &GenerationCall| match call.kind {
            SubpromptKind::UspGeneration => Ok("five great points, trust me".to_string()),
            _ => Ok("ok".to_string()),
        }));
        let results = orchestrator
            .run_subprompts(&record(), &category(), &[SubpromptKind::UspGeneration])
            .await;
        let result = &results[&SubpromptKind::UspGeneration];
        assert!(!result.success());
        assert!(result.error.as_deref().unwrap().contains("invalid structured"));
    }

    #[tokio::test]
    async fn usp_fallback_pads_from_templates_on_total_failure() {
        let orchestrator = orchestrator(Scripted(|_: &GenerationCall| {
            Err(GenerateError::Backend("down".to_string()))
        }));
        let outcome = orchestrator
            .enrich(&record(), &category(), &ALL_SUBPROMPTS)
            .await;
        assert_eq!(outcome.copy.usp_bullets.len(), 5);
        assert_eq!(outcome.copy.usp_bullets, category().usp_templates[..5].to_vec());
        assert!(!outcome.copy.narrative.is_empty());
    }

    #[tokio::test]
    async fn batch_enrichment_respects_the_window_and_never_aborts() {
        let orchestrator = orchestrator(Scripted(|call: &GenerationCall| match call.kind {
            SubpromptKind::TechExtraction => Err(GenerateError::Backend("down".to_string())),
            SubpromptKind::UspGeneration => Ok("[]".to_string()),
            _ => Ok("Text mit 5000 mAh. Noch ein Satz.".to_string()),
        }));

        let records = vec![record(); 8];
        let catalog = CategoryCatalog::builtin();
        let config = catalog.get("lithium-zellen").unwrap();
        let categories: Vec<&CategoryConfig> = records.iter().map(|_| config).collect();

        let outcomes = orchestrator
            .enrich_batch(&records, &categories, &ALL_SUBPROMPTS, ENRICH_CONCURRENCY)
            .await;
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.copy.usp_bullets.len() == 5));
    }
}
