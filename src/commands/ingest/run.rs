use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::inventory;
use crate::model::{
    BookProfile, ChunkManifest, ChunkRecord, IngestCounts, IngestPaths, IngestRunManifest,
    PageInventoryManifest,
};
use crate::util::{
    ensure_directory, now_utc_string, read_json, utc_compact_string, write_json_pretty,
};

use super::chunk_insert::{chunk_records_for, insert_document_chunks};
use super::db_setup::{
    DB_SCHEMA_VERSION, configure_connection, count_rows, ensure_schema, sync_fts_index,
    upsert_docs,
};
use super::page_clean::PageTextCleaner;
use super::page_source::{doc_id_for, load_page_export};
use super::semantic_chunks::{ChunkLimits, SemanticChunker};
use super::structure_parse::StructureParser;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let inventory_manifest_path = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("page_inventory.json"));
    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });
    let chunk_manifest_path = if args.emit_chunk_manifest {
        Some(args.chunk_manifest_path.clone().unwrap_or_else(|| {
            manifest_dir.join(format!("chunks_{}.json", utc_compact_string(started_ts)))
        }))
    } else {
        None
    };
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("guji_index.sqlite"));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting ingest");

    let inventory = load_or_refresh_inventory(
        &cache_root,
        &inventory_manifest_path,
        args.refresh_inventory,
    )?;

    let book = book_profile(&args);

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let docs_upserted = upsert_docs(&mut connection, &inventory)?;

    let cleaner = PageTextCleaner::new()?;
    let parser = StructureParser::new(&book.preface_title, &args.annotation_tags)?;
    let limits = ChunkLimits {
        chapter_split_threshold: args.chapter_split_threshold,
        min_paragraph_chars: args.min_paragraph_chars,
    };
    let chunker = SemanticChunker::new(book.clone(), limits)?;

    let outcome = ingest_documents(
        &mut connection,
        &cache_root,
        &inventory,
        &args.target_docs,
        args.emit_chunk_manifest,
        &cleaner,
        &parser,
        &chunker,
    )?;

    sync_fts_index(&connection)?;

    let docs_total = count_rows(&connection, "SELECT COUNT(*) FROM docs")?;
    let chunks_total = count_rows(&connection, "SELECT COUNT(*) FROM chunks")?;
    let updated_at = now_utc_string();

    if let Some(path) = &chunk_manifest_path {
        let manifest = ChunkManifest {
            manifest_version: 1,
            run_id: run_id.clone(),
            generated_at: updated_at.clone(),
            chunk_count: outcome.chunk_records.len(),
            chunks: outcome.chunk_records,
        };
        write_json_pretty(path, &manifest)?;
        info!(path = %path.display(), chunk_count = manifest.chunk_count, "wrote chunk manifest");
    }

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at,
        command: render_ingest_command(&args),
        book,
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            inventory_manifest_path: inventory_manifest_path.display().to_string(),
            db_path: db_path.display().to_string(),
            chunk_manifest_path: chunk_manifest_path
                .as_ref()
                .map(|path| path.display().to_string()),
        },
        counts: IngestCounts {
            document_count: inventory.document_count,
            docs_upserted,
            docs_total,
            chunks_total,
            ..outcome.counts
        },
        source_hashes: inventory.documents,
        warnings: outcome.warnings,
        notes: vec![
            "Ingest command completed using local manifests and sqlite store.".to_string(),
            "Structure recovery uses volume/chapter/annotation line heuristics over cleaned page text."
                .to_string(),
        ],
    };

    write_json_pretty(&ingest_manifest_path, &manifest)?;

    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");
    info!(docs = docs_total, chunks = chunks_total, "ingest completed");

    Ok(())
}

#[derive(Debug, Default)]
struct IngestOutcome {
    counts: IngestCounts,
    warnings: Vec<String>,
    chunk_records: Vec<ChunkRecord>,
}

#[allow(clippy::too_many_arguments)]
fn ingest_documents(
    connection: &mut Connection,
    cache_root: &Path,
    inventory: &PageInventoryManifest,
    target_docs: &[String],
    collect_records: bool,
    cleaner: &PageTextCleaner,
    parser: &StructureParser,
    chunker: &SemanticChunker,
) -> Result<IngestOutcome> {
    let target_set: HashSet<&str> = target_docs.iter().map(String::as_str).collect();
    let mut outcome = IngestOutcome::default();
    let tx = connection.transaction()?;

    for entry in &inventory.documents {
        let doc_id = doc_id_for(entry);
        if !target_set.is_empty() && !target_set.contains(doc_id.as_str()) {
            continue;
        }

        outcome.counts.processed_document_count += 1;
        tx.execute("DELETE FROM chunks WHERE doc_id = ?1", [&doc_id])?;

        let export_path = cache_root.join(&entry.filename);
        let export = match load_page_export(&export_path) {
            Ok(export) => export,
            Err(error) => {
                // Extraction failure: the document keeps zero rows rather
                // than a partial structure, and the run moves on.
                let warning = format!(
                    "failed to obtain page text for {}: {error:#}",
                    export_path.display()
                );
                warn!(warning = %warning, "page export unavailable");
                outcome.warnings.push(warning);
                continue;
            }
        };

        info!(
            doc_id = %doc_id,
            source = %export.source.as_deref().unwrap_or("unknown"),
            pages = export.pages.len(),
            "loaded page export"
        );

        let mut lines = Vec::new();
        let mut full_text = String::new();
        let mut had_text = false;
        for page in &export.pages {
            outcome.counts.page_count += 1;
            let cleaned = cleaner.clean(&page.text, page.page_number);
            outcome.counts.page_number_lines_dropped += cleaned.page_number_lines_dropped;
            if cleaned.lines.is_empty() {
                outcome.counts.empty_page_count += 1;
                continue;
            }

            had_text = true;
            for line in &cleaned.lines {
                full_text.push_str(line);
                full_text.push('\n');
            }
            lines.extend(cleaned.lines);
        }

        let structure = parser.parse(&lines);
        let chapters_parsed: usize = structure
            .volumes
            .iter()
            .map(|volume| volume.chapters.len())
            .sum();
        let annotations_parsed: usize = structure
            .volumes
            .iter()
            .flat_map(|volume| &volume.chapters)
            .map(|chapter| chapter.annotations.len())
            .sum();
        outcome.counts.volumes_parsed += structure.volumes.len();
        outcome.counts.chapters_parsed += chapters_parsed;
        outcome.counts.annotations_parsed += annotations_parsed;
        if structure.preface.is_some() {
            outcome.counts.prefaces_found += 1;
        }
        if structure.has_toc {
            outcome.counts.tocs_found += 1;
        }

        let chunk_output = chunker.chunk(&structure, &full_text);
        outcome.counts.short_paragraphs_filtered += chunk_output.short_paragraphs_filtered;

        if chunk_output.chunks.is_empty() {
            if had_text {
                let warning = format!(
                    "no chunks produced for {} despite non-empty page text",
                    entry.filename
                );
                warn!(doc_id = %doc_id, "zero-chunk document");
                outcome.warnings.push(warning);
                outcome.counts.zero_chunk_documents += 1;
            }
            continue;
        }

        let stats = insert_document_chunks(&tx, &doc_id, &entry.sha256, &chunk_output.chunks)?;
        outcome.counts.preface_chunks_inserted += stats.preface_chunks_inserted;
        outcome.counts.toc_chunks_inserted += stats.toc_chunks_inserted;
        outcome.counts.volume_title_chunks_inserted += stats.volume_title_chunks_inserted;
        outcome.counts.chapter_chunks_inserted += stats.chapter_chunks_inserted;
        outcome.counts.chapter_paragraph_chunks_inserted += stats.chapter_paragraph_chunks_inserted;

        if collect_records {
            outcome
                .chunk_records
                .extend(chunk_records_for(&doc_id, &chunk_output.chunks));
        }

        info!(
            doc_id = %doc_id,
            volumes = structure.volumes.len(),
            chapters = chapters_parsed,
            annotations = annotations_parsed,
            chunks = chunk_output.chunks.len(),
            "ingested document"
        );
    }

    tx.commit()?;
    Ok(outcome)
}

fn load_or_refresh_inventory(
    cache_root: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<PageInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(cache_root)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            document_count = manifest.document_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: PageInventoryManifest = read_json(inventory_manifest_path)?;

    info!(
        path = %inventory_manifest_path.display(),
        document_count = manifest.document_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}

pub(crate) fn book_profile(args: &IngestArgs) -> BookProfile {
    BookProfile {
        title: args.book_title.clone(),
        preface_title: args
            .preface_title
            .clone()
            .unwrap_or_else(|| format!("{}序", args.book_title)),
        language_style: args.language_style.clone(),
        era: args.era.clone(),
    }
}

pub(crate) fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "guji".to_string(),
        "ingest".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.ingest_manifest_path {
        command.push("--ingest-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    if args.emit_chunk_manifest {
        command.push("--emit-chunk-manifest".to_string());
        if let Some(path) = &args.chunk_manifest_path {
            command.push("--chunk-manifest-path".to_string());
            command.push(path.display().to_string());
        }
    }
    for doc in &args.target_docs {
        command.push("--target-doc".to_string());
        command.push(doc.clone());
    }

    command.push("--book-title".to_string());
    command.push(args.book_title.clone());
    if let Some(title) = &args.preface_title {
        command.push("--preface-title".to_string());
        command.push(title.clone());
    }
    command.push("--language-style".to_string());
    command.push(args.language_style.clone());
    command.push("--era".to_string());
    command.push(args.era.clone());
    for tag in &args.annotation_tags {
        command.push("--annotation-tag".to_string());
        command.push(tag.clone());
    }
    command.push("--chapter-split-threshold".to_string());
    command.push(args.chapter_split_threshold.to_string());
    command.push("--min-paragraph-chars".to_string());
    command.push(args.min_paragraph_chars.to_string());

    command.join(" ")
}
