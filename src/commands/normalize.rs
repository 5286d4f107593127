use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use warelift::Normalizer;
use warelift::pipeline::NormalizeCounts;
use warelift::util::{now_utc_string, utc_compact_string, write_json_pretty};

use crate::cli::NormalizeArgs;
use crate::commands::load_catalog;

#[derive(Debug, Serialize)]
struct NormalizeRunManifest {
    manifest_version: u32,
    run_id: String,
    generated_at: String,
    input: String,
    encoding: Option<String>,
    delimiter: Option<String>,
    counts: NormalizeCounts,
    warnings: Vec<String>,
}

pub fn run(args: NormalizeArgs) -> Result<()> {
    let run_id = format!("normalize-{}", utc_compact_string(Utc::now()));
    info!(input = %args.input.display(), run_id = %run_id, "starting normalization");

    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read input: {}", args.input.display()))?;

    let catalog = load_catalog(args.catalog.as_deref())?;
    let normalizer = Normalizer::new(catalog)?;
    let outcome = normalizer
        .normalize_bytes(&bytes)
        .with_context(|| format!("normalization failed for {}", args.input.display()))?;

    for warning in &outcome.warnings {
        tracing::warn!(warning = %warning, "normalization warning");
    }

    write_json_pretty(&args.output, &outcome.records)?;

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.output
            .with_file_name(format!("{run_id}_manifest.json"))
    });
    let manifest = NormalizeRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        input: args.input.display().to_string(),
        encoding: outcome.encoding.map(str::to_string),
        delimiter: outcome.delimiter.map(|d| d.to_string()),
        counts: outcome.counts.clone(),
        warnings: outcome.warnings.clone(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        records = outcome.counts.records_normalized,
        duplicates = outcome.counts.duplicate_records,
        dropped = outcome.counts.records_dropped_missing_sku,
        output = %args.output.display(),
        "normalization complete"
    );
    Ok(())
}
