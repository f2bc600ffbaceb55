use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{IngestRunManifest, PageInventoryManifest};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = manifest_dir.join("page_inventory.json");
    let db_path = args.cache_root.join("guji_index.sqlite");

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: PageInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            document_count = inventory.document_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_run_manifest(&manifest_dir)? {
        Some((path, manifest)) => {
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                book = %manifest.book.title,
                chunks_total = manifest.counts.chunks_total,
                zero_chunk_documents = manifest.counts.zero_chunk_documents,
                warnings = manifest.warnings.len(),
                "loaded latest ingest run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no ingest run manifest found"),
    }

    if db_path.exists() {
        let connection = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let docs_count = query_count(&connection, "SELECT COUNT(*) FROM docs").unwrap_or(0);
        let chunks_count = query_count(&connection, "SELECT COUNT(*) FROM chunks").unwrap_or(0);

        info!(
            path = %db_path.display(),
            docs = docs_count,
            chunks = chunks_count,
            "database status"
        );

        report_block_type_counts(&connection)?;
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<(PathBuf, IngestRunManifest)>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    // Run manifests carry a compact UTC stamp, so the lexicographically
    // greatest name is the most recent run.
    let mut newest: Option<PathBuf> = None;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read directory entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.starts_with("ingest_run_") || !name.ends_with(".json") {
            continue;
        }

        let is_newer = newest
            .as_ref()
            .and_then(|existing| existing.file_name())
            .and_then(|existing| existing.to_str())
            .map(|existing| name > existing)
            .unwrap_or(true);
        if is_newer {
            newest = Some(path);
        }
    }

    match newest {
        Some(path) => {
            let manifest: IngestRunManifest = read_json(&path)?;
            Ok(Some((path, manifest)))
        }
        None => Ok(None),
    }
}

fn report_block_type_counts(connection: &Connection) -> Result<()> {
    let mut statement = connection
        .prepare("SELECT block_type, COUNT(*) FROM chunks GROUP BY block_type ORDER BY block_type")?;
    let mut rows = statement.query([])?;

    while let Some(row) = rows.next()? {
        let block_type: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        info!(block_type = %block_type, count, "chunk block type");
    }

    Ok(())
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
