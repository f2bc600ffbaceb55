use anyhow::Result;
use rusqlite::{Transaction, params};

use crate::model::ChunkRecord;

use super::semantic_chunks::{Chunk, ChunkKind};

#[derive(Debug, Default)]
pub(crate) struct ChunkInsertStats {
    pub preface_chunks_inserted: usize,
    pub toc_chunks_inserted: usize,
    pub volume_title_chunks_inserted: usize,
    pub chapter_chunks_inserted: usize,
    pub chapter_paragraph_chunks_inserted: usize,
}

pub(crate) fn chunk_id_for(doc_id: &str, block_type: &str, chunk_seq: i64) -> String {
    format!("{}:{}:{:04}", doc_id, block_type, chunk_seq)
}

/// Inserts a document's chunk stream in emission order. The caller has
/// already deleted the document's previous rows, so plain inserts suffice
/// and `chunk_seq` keeps ids unique within the document.
pub(crate) fn insert_document_chunks(
    tx: &Transaction<'_>,
    doc_id: &str,
    source_hash: &str,
    chunks: &[Chunk],
) -> Result<ChunkInsertStats> {
    let mut statement = tx.prepare(
        "
        INSERT INTO chunks(
          chunk_id, doc_id, chunk_seq, content_type, block_type,
          volume_title, volume_index, chapter_title, chapter_index,
          paragraph_index, language_style, era, text, source_hash
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ",
    )?;

    let mut stats = ChunkInsertStats::default();
    for (position, chunk) in chunks.iter().enumerate() {
        let chunk_seq = (position + 1) as i64;
        let chunk_id = chunk_id_for(doc_id, chunk.kind.block_type(), chunk_seq);

        statement.execute(params![
            chunk_id,
            doc_id,
            chunk_seq,
            chunk.kind.content_type(),
            chunk.kind.block_type(),
            chunk.kind.volume_title(),
            chunk.kind.volume_index(),
            chunk.kind.chapter_title(),
            chunk.kind.chapter_index(),
            chunk.kind.paragraph_index(),
            chunk.kind.language_style(),
            chunk.kind.era(),
            &chunk.content,
            source_hash
        ])?;

        match chunk.kind {
            ChunkKind::Preface { .. } => stats.preface_chunks_inserted += 1,
            ChunkKind::TableOfContents => stats.toc_chunks_inserted += 1,
            ChunkKind::VolumeTitle { .. } => stats.volume_title_chunks_inserted += 1,
            ChunkKind::Chapter { .. } => stats.chapter_chunks_inserted += 1,
            ChunkKind::ChapterParagraph { .. } => stats.chapter_paragraph_chunks_inserted += 1,
        }
    }

    Ok(stats)
}

pub(crate) fn chunk_records_for(doc_id: &str, chunks: &[Chunk]) -> Vec<ChunkRecord> {
    chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| {
            let chunk_seq = (position + 1) as i64;
            ChunkRecord {
                chunk_id: chunk_id_for(doc_id, chunk.kind.block_type(), chunk_seq),
                doc_id: doc_id.to_string(),
                chunk_seq,
                content_type: chunk.kind.content_type().to_string(),
                block_type: chunk.kind.block_type().to_string(),
                volume_title: chunk.kind.volume_title().to_string(),
                volume_index: chunk.kind.volume_index().to_string(),
                chapter_title: chunk.kind.chapter_title().to_string(),
                chapter_index: chunk.kind.chapter_index().to_string(),
                paragraph_index: chunk.kind.paragraph_index(),
                language_style: chunk.kind.language_style().map(ToOwned::to_owned),
                era: chunk.kind.era().map(ToOwned::to_owned),
                text: chunk.content.clone(),
            }
        })
        .collect()
}
