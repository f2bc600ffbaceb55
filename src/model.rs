use serde::{Deserialize, Serialize};

/// One page of text produced by the external PDF extraction step.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedPage {
    pub page_number: i64,
    pub text: String,
}

/// A per-document page export file (`*.pages.json`), the input boundary of
/// the pipeline. The extraction collaborator writes these; this tool never
/// touches PDF bytes itself.
#[derive(Debug, Clone, Deserialize)]
pub struct PageExport {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub pages: Vec<ExtractedPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocEntry {
    pub filename: String,
    pub title: String,
    pub page_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<PageDocEntry>,
}

/// Fixed attributes of the work being ingested, attached to chapter-level
/// chunk metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookProfile {
    pub title: String,
    pub preface_title: String,
    pub language_style: String,
    pub era: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub inventory_manifest_path: String,
    pub db_path: String,
    pub chunk_manifest_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestCounts {
    pub document_count: usize,
    pub processed_document_count: usize,
    pub page_count: usize,
    pub empty_page_count: usize,
    pub page_number_lines_dropped: usize,
    pub docs_upserted: usize,
    pub docs_total: i64,
    pub chunks_total: i64,
    pub volumes_parsed: usize,
    pub chapters_parsed: usize,
    pub annotations_parsed: usize,
    pub prefaces_found: usize,
    pub tocs_found: usize,
    pub preface_chunks_inserted: usize,
    pub toc_chunks_inserted: usize,
    pub volume_title_chunks_inserted: usize,
    pub chapter_chunks_inserted: usize,
    pub chapter_paragraph_chunks_inserted: usize,
    pub short_paragraphs_filtered: usize,
    pub zero_chunk_documents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub book: BookProfile,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub source_hashes: Vec<PageDocEntry>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

/// Flattened form of one emitted chunk, for the optional chunk manifest. The
/// metadata keys mirror what the sqlite `chunks` table stores and what the
/// downstream indexing collaborator consumes.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub doc_id: String,
    pub chunk_seq: i64,
    pub content_type: String,
    pub block_type: String,
    pub volume_title: String,
    pub volume_index: String,
    pub chapter_title: String,
    pub chapter_index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub chunk_count: usize,
    pub chunks: Vec<ChunkRecord>,
}
