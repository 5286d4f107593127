use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use warelift::generate::{ALL_SUBPROMPTS, ValidationIssue};
use warelift::merge::{self, MergedSpec};
use warelift::util::write_json_pretty;
use warelift::{NormalizedRecord, ProductCopy, PromptOrchestrator, TemplateGenerator};

use crate::cli::EnrichArgs;
use crate::commands::{config_for, load_catalog};

#[derive(Debug, Serialize)]
struct EnrichedRecord {
    sku: String,
    /// Record with merged specs written back, ready for rendering.
    record: NormalizedRecord,
    copy: ProductCopy,
    issues: Vec<ValidationIssue>,
    failed_subprompts: Vec<String>,
    merged_specs: Vec<MergedSpec>,
}

pub fn run(args: EnrichArgs) -> Result<()> {
    let json = fs::read_to_string(&args.records)
        .with_context(|| format!("failed to read records: {}", args.records.display()))?;
    let records: Vec<NormalizedRecord> =
        serde_json::from_str(&json).context("failed to parse normalized records")?;
    let catalog = load_catalog(args.catalog.as_deref())?;

    let subprompts = if args.subprompts.is_empty() {
        ALL_SUBPROMPTS.to_vec()
    } else {
        args.subprompts.clone()
    };

    let orchestrator = PromptOrchestrator::new(Arc::new(TemplateGenerator))?
        .with_call_timeout(Duration::from_millis(args.timeout_ms));

    let categories: Vec<_> = records
        .iter()
        .map(|record| config_for(&catalog, &record.category))
        .collect();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcomes = runtime.block_on(orchestrator.enrich_batch(
        &records,
        &categories,
        &subprompts,
        args.concurrency,
    ));

    let mut failed_total = 0;
    let enriched: Vec<EnrichedRecord> = records
        .iter()
        .zip(categories.iter())
        .zip(outcomes)
        .map(|((record, category), outcome)| {
            failed_total += outcome.failed.len();
            let merged_specs = merge::merge_tech_specs(record, &outcome.copy, category);
            let mut updated = record.clone();
            merge::apply_to_record(&mut updated, &merged_specs);
            EnrichedRecord {
                sku: record.sku.clone(),
                record: updated,
                copy: outcome.copy,
                issues: outcome.issues,
                failed_subprompts: outcome
                    .failed
                    .into_iter()
                    .map(|(kind, error)| format!("{}: {error}", kind.as_str()))
                    .collect(),
                merged_specs,
            }
        })
        .collect();

    write_json_pretty(&args.output, &enriched)?;
    info!(
        records = enriched.len(),
        failed_subprompts = failed_total,
        output = %args.output.display(),
        "enrichment complete"
    );
    Ok(())
}
