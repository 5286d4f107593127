use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use warelift::SubpromptKind;

#[derive(Parser, Debug)]
#[command(
    name = "warelift",
    version,
    about = "Normalize supplier product data and generate marketplace copy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode, parse and normalize a supplier file into product records.
    Normalize(NormalizeArgs),
    /// Generate and validate product copy for normalized records.
    Enrich(EnrichArgs),
    /// Render marketplace HTML fragments from records and their copy.
    Render(RenderArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Supplier file (CSV/TSV in UTF-8, Windows-1252 or ISO-8859-15).
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "normalized.json")]
    pub output: PathBuf,

    /// Run manifest with counts and warnings; defaults next to the output.
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Category catalog JSON; the built-in catalog is used when omitted.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EnrichArgs {
    /// Normalized records JSON produced by `normalize`.
    #[arg(long)]
    pub records: PathBuf,

    #[arg(long, default_value = "enriched.json")]
    pub output: PathBuf,

    /// Subprompts to run; all of them when omitted.
    #[arg(long = "subprompt", value_enum)]
    pub subprompts: Vec<SubpromptKind>,

    /// Records in flight at once.
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Normalized records JSON produced by `normalize`.
    #[arg(long)]
    pub records: PathBuf,

    /// Enriched copy JSON produced by `enrich`.
    #[arg(long)]
    pub enriched: PathBuf,

    /// Directory receiving one HTML fragment per record.
    #[arg(long, default_value = "fragments")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub catalog: Option<PathBuf>,
}
