use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use warelift::util::ensure_directory;
use warelift::{NormalizedRecord, ProductCopy, html};

use crate::cli::RenderArgs;
use crate::commands::{config_for, load_catalog};

/// Only the fields render needs; the enriched file carries more.
#[derive(Debug, Deserialize)]
struct EnrichedIn {
    sku: String,
    copy: ProductCopy,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let records: Vec<NormalizedRecord> = serde_json::from_str(
        &fs::read_to_string(&args.records)
            .with_context(|| format!("failed to read records: {}", args.records.display()))?,
    )
    .context("failed to parse normalized records")?;
    let enriched: Vec<EnrichedIn> = serde_json::from_str(
        &fs::read_to_string(&args.enriched)
            .with_context(|| format!("failed to read enriched copy: {}", args.enriched.display()))?,
    )
    .context("failed to parse enriched copy")?;
    let catalog = load_catalog(args.catalog.as_deref())?;

    ensure_directory(&args.output_dir)?;

    let mut rendered = 0;
    for record in &records {
        let Some(entry) = enriched.iter().find(|entry| entry.sku == record.sku) else {
            warn!(sku = %record.sku, "no enriched copy for record, skipped");
            continue;
        };
        let category = config_for(&catalog, &record.category);
        let fragment = html::render(record, &entry.copy, category);

        let path = args.output_dir.join(format!("{}.html", safe_name(&record.sku)));
        fs::write(&path, fragment)
            .with_context(|| format!("failed to write fragment: {}", path.display()))?;
        rendered += 1;
    }

    info!(rendered, output_dir = %args.output_dir.display(), "render complete");
    Ok(())
}

fn safe_name(sku: &str) -> String {
    sku.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
