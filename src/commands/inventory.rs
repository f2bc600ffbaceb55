use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::commands::ingest::page_source::{PAGE_EXPORT_SUFFIX, load_page_export};
use crate::model::{PageDocEntry, PageInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.cache_root)?;

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.cache_root.join("manifests").join("page_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(document_count = manifest.document_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(cache_root: &Path) -> Result<PageInventoryManifest> {
    let mut export_paths = discover_page_exports(cache_root)?;
    export_paths.sort();

    if export_paths.is_empty() {
        bail!("no page exports found in {}", cache_root.display());
    }

    let mut documents = Vec::with_capacity(export_paths.len());
    for path in export_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let export = load_page_export(&path)?;
        let title = export.title.clone().unwrap_or_else(|| {
            filename
                .strip_suffix(PAGE_EXPORT_SUFFIX)
                .unwrap_or(&filename)
                .to_string()
        });
        let sha256 = sha256_file(&path)?;

        documents.push(PageDocEntry {
            filename,
            title,
            page_count: export.pages.len(),
            sha256,
        });
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(PageInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: cache_root.display().to_string(),
        document_count: documents.len(),
        documents,
    })
}

fn discover_page_exports(cache_root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(cache_root)
        .with_context(|| format!("failed to read {}", cache_root.display()))?;

    let mut exports = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read directory entry in {}", cache_root.display()))?;
        let path = entry.path();
        let is_export = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(PAGE_EXPORT_SUFFIX));

        if path.is_file() && is_export {
            exports.push(path);
        }
    }

    Ok(exports)
}
