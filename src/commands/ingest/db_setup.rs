use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::PageInventoryManifest;
use crate::util::now_utc_string;

use super::page_source::doc_id_for;

pub(crate) const DB_SCHEMA_VERSION: &str = "0.1.0";

pub(crate) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS docs (
          doc_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          title TEXT,
          page_count INTEGER
        );

        CREATE TABLE IF NOT EXISTS chunks (
          chunk_id TEXT PRIMARY KEY,
          doc_id TEXT NOT NULL,
          chunk_seq INTEGER DEFAULT 0,
          content_type TEXT NOT NULL,
          block_type TEXT NOT NULL,
          volume_title TEXT,
          volume_index TEXT,
          chapter_title TEXT,
          chapter_index TEXT,
          paragraph_index INTEGER,
          language_style TEXT,
          era TEXT,
          text TEXT,
          source_hash TEXT,
          FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
        );
        ",
    )?;

    connection
        .execute(
            "
            CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts
            USING fts5(chunk_id, doc_id, chapter_title, text, content='chunks', content_rowid='rowid')
            ",
            [],
        )
        .context("failed to initialize FTS5 table chunks_fts")?;

    connection.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_chunks_doc_block ON chunks(doc_id, block_type);
        CREATE INDEX IF NOT EXISTS idx_chunks_doc_seq ON chunks(doc_id, chunk_seq);
        ",
    )?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub(crate) fn sync_fts_index(connection: &Connection) -> Result<()> {
    connection
        .execute("INSERT INTO chunks_fts(chunks_fts) VALUES('rebuild')", [])
        .context("failed to rebuild FTS index")?;
    Ok(())
}

pub(crate) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

pub(crate) fn upsert_docs(
    connection: &mut Connection,
    inventory: &PageInventoryManifest,
) -> Result<usize> {
    let tx = connection.transaction()?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO docs(doc_id, filename, sha256, title, page_count)
            VALUES(?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(doc_id) DO UPDATE SET
              filename=excluded.filename,
              sha256=excluded.sha256,
              title=excluded.title,
              page_count=excluded.page_count
            ",
        )?;

        for document in &inventory.documents {
            statement.execute(params![
                doc_id_for(document),
                &document.filename,
                &document.sha256,
                &document.title,
                document.page_count as i64
            ])?;
        }
    }

    tx.commit()?;
    Ok(inventory.documents.len())
}
