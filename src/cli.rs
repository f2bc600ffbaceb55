use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "guji",
    version,
    about = "Local classical-text structure extraction and chunking tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Ingest(IngestArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/guji")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/guji")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub chunk_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    #[arg(long, default_value_t = false)]
    pub emit_chunk_manifest: bool,

    #[arg(long = "target-doc")]
    pub target_docs: Vec<String>,

    #[arg(long, default_value = "增删卜易")]
    pub book_title: String,

    /// Preface heading to watch for; defaults to "<book-title>序".
    #[arg(long)]
    pub preface_title: Option<String>,

    #[arg(long, default_value = "文言文")]
    pub language_style: String,

    #[arg(long, default_value = "清代")]
    pub era: String,

    /// Bracketed annotation tags; defaults to the editorial tags of the
    /// source work when none are given.
    #[arg(long = "annotation-tag")]
    pub annotation_tags: Vec<String>,

    #[arg(long, default_value_t = 1500)]
    pub chapter_split_threshold: usize,

    #[arg(long, default_value_t = 50)]
    pub min_paragraph_chars: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/guji")]
    pub cache_root: PathBuf,
}
