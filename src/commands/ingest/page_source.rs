use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{PageDocEntry, PageExport};
use crate::util::read_json;

pub(crate) const PAGE_EXPORT_SUFFIX: &str = ".pages.json";

/// Loads a page export written by the external extraction step. An error here
/// is the extraction-failure boundary: the document gets no structural output
/// at all, and the caller decides whether the run continues.
pub(crate) fn load_page_export(path: &Path) -> Result<PageExport> {
    read_json(path).with_context(|| format!("failed to load page export {}", path.display()))
}

/// Derives a stable document id from the export filename. CJK letters are
/// kept as-is; runs of anything else collapse to a single dash.
pub(crate) fn doc_id_for(entry: &PageDocEntry) -> String {
    let stem = entry
        .filename
        .strip_suffix(PAGE_EXPORT_SUFFIX)
        .unwrap_or(&entry.filename);

    let mut id = String::with_capacity(stem.len());
    for character in stem.chars() {
        if character.is_alphanumeric() {
            id.extend(character.to_lowercase());
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }

    let id = id.trim_matches('-').to_string();
    if id.is_empty() { "doc".to_string() } else { id }
}
