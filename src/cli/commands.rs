use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "itin",
    about = concat!("itin v", env!("CARGO_PKG_VERSION"), " - free-form trip notes in, canonical itinerary out"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./itinera.toml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a commented itinera.toml in the current directory
    Init(InitArgs),
    /// Check markdown against the canonical v2 grammar
    Validate(InputArgs),
    /// Print canonical markdown as an aligned agenda
    Show(InputArgs),
    /// Extract a canonical document from free-form text
    Extract(InputArgs),
    /// Render a JSON document as canonical markdown
    Render(InputArgs),
    /// Make a valid document plausible on the clock
    Rationalize(ReferenceArgs),
    /// List the POIs a text names, by day
    Pois(InputArgs),
    /// Append POIs from a reference text that a document is missing
    Guard(GuardArgs),
    /// Clear impossible or out-of-window times
    Sanitize(InputArgs),
    /// Validate, repair through the fix command, or fall back
    Enforce(EnforceArgs),
    /// Run the whole pipeline on free-form text
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing itinera.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct InputArgs {
    /// Input file (default: stdin)
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReferenceArgs {
    /// Canonical markdown to rationalize (default: stdin)
    pub file: Option<PathBuf>,
    /// Source text that may corroborate inter-city travel
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

#[derive(Args)]
pub struct GuardArgs {
    /// Canonical markdown to complete (default: stdin)
    pub file: Option<PathBuf>,
    /// Text whose POIs must all appear
    #[arg(long)]
    pub reference: PathBuf,
}

#[derive(Args)]
pub struct EnforceArgs {
    /// Candidate markdown (default: stdin)
    pub file: Option<PathBuf>,
    /// Text the fallback is extracted from (default: the candidate itself)
    #[arg(long)]
    pub source: Option<PathBuf>,
    /// Override enforcer.max_attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Never call the fix command
    #[arg(long)]
    pub no_fix: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Free-form source text (default: stdin)
    pub file: Option<PathBuf>,
    /// A drafted plan to enforce instead of the extraction
    #[arg(long)]
    pub draft: Option<PathBuf>,
    /// Never call the fix command
    #[arg(long)]
    pub no_fix: bool,
}
