//! CLI surface (§5.1), adapted from the donor's `engine::arg_parser::Cli`/`Commands` shape.

use crate::types::AdminFilters;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Clone, Parser)]
#[command(name = "nefax-tier")]
#[command(about = "Hierarchical storage tiering engine: scores shares, plans archive/restore moves, and executes them.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the JSON configuration file (§6).
    #[arg(long, global = true, default_value = ".nefax-tier.json")]
    pub config: PathBuf,

    /// Path to the journal database. Default: `.nefax-tier.db` alongside the config file.
    #[arg(long, global = true)]
    pub journal: Option<PathBuf>,

    /// Verbose (debug-level) logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Run the scheduler. Without `--once`, loops on the configured interval until interrupted.
    Run {
        #[arg(long)]
        once: bool,
        /// Per-share worker pool size.
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Tick interval in hours when not `--once`.
        #[arg(long, default_value_t = 24)]
        interval_hours: u64,
    },
    /// Evaluate one share and, if above threshold, show the plan without executing it.
    Preview {
        #[arg(long)]
        share: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Run the full pipeline for one share immediately.
    Scan {
        #[arg(long)]
        share: String,
        /// Bypass the cooldown check.
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

/// Admin filters (§4.5 step 3, §6) exposed on `preview`/`scan` as `[filters...]` (§5.1).
#[derive(Clone, Debug, Default, Args)]
pub struct FilterArgs {
    /// Restrict to these extensions, e.g. `--file-type .pdf --file-type .docx`. Unset matches any.
    #[arg(long = "file-type")]
    pub file_types: Vec<String>,
    #[arg(long)]
    pub created_after: Option<DateTime<Utc>>,
    #[arg(long)]
    pub created_before: Option<DateTime<Utc>>,
    #[arg(long)]
    pub accessed_after: Option<DateTime<Utc>>,
    #[arg(long)]
    pub accessed_before: Option<DateTime<Utc>>,
    #[arg(long)]
    pub modified_after: Option<DateTime<Utc>>,
    #[arg(long)]
    pub modified_before: Option<DateTime<Utc>>,
    #[arg(long)]
    pub min_size: Option<u64>,
    #[arg(long)]
    pub max_size: Option<u64>,
}

impl From<FilterArgs> for AdminFilters {
    fn from(f: FilterArgs) -> Self {
        AdminFilters {
            file_types: f.file_types,
            created_after: f.created_after,
            created_before: f.created_before,
            accessed_after: f.accessed_after,
            accessed_before: f.accessed_before,
            modified_after: f.modified_after,
            modified_before: f.modified_before,
            min_size: f.min_size,
            max_size: f.max_size,
        }
    }
}

impl Cli {
    pub fn journal_path(&self) -> PathBuf {
        self.journal.clone().unwrap_or_else(|| {
            self.config
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."))
                .join(".nefax-tier.db")
        })
    }
}
