//! SQLite persistence for vector indexes.
//!
//! One index lives in one SQLite file at
//! `<index_dir>/index_<sanitized model>/index.sqlite`. Writes go to a temporary
//! file in the same directory that is renamed over the destination once the
//! transaction commits.

use crate::types::{Chunk, IndexMetadata};
use crate::vector_index::{IndexEntry, LoadOutcome, VectorIndex};
use chrono::{DateTime, Utc};
use ragent_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// Bumped when the table layout changes.
const FORMAT_VERSION: &str = "1";

/// File name of a persisted index inside its model directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// Location of the persisted index for `model` under `index_dir`.
pub fn index_path(index_dir: &Path, model: &str) -> PathBuf {
    index_dir
        .join(format!("index_{}", sanitize_model_name(model)))
        .join(INDEX_FILE_NAME)
}

/// Replace every character that is not ASCII alphanumeric, `-` or `.` with `_`.
pub fn sanitize_model_name(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `index` to `destination` atomically.
pub fn write_index(index: &VectorIndex, destination: &Path) -> AppResult<()> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;

    let temp = tempfile::Builder::new()
        .prefix(".index-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| AppError::Knowledge(format!("Failed to create temporary index file: {}", e)))?;

    {
        let mut conn = Connection::open(temp.path())
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        write_tables(&mut conn, index)
            .map_err(|e| AppError::Knowledge(format!("Failed to write index: {}", e)))?;
        conn.close()
            .map_err(|(_, e)| AppError::Knowledge(format!("Failed to close index: {}", e)))?;
    }

    temp.persist(destination)
        .map_err(|e| AppError::Knowledge(format!("Failed to move index into place: {}", e)))?;

    tracing::info!(
        "Persisted index ({} chunks, model {}) to {:?}",
        index.len(),
        index.model(),
        destination
    );
    Ok(())
}

fn write_tables(conn: &mut Connection, index: &VectorIndex) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE chunks (
            seq INTEGER PRIMARY KEY,
            chunk_id TEXT NOT NULL,
            document TEXT NOT NULL,
            position INTEGER NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );
        "#,
    )?;

    let meta = index.metadata();
    let tx = conn.transaction()?;
    {
        let mut insert_meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
        for (key, value) in [
            ("format_version", FORMAT_VERSION.to_string()),
            ("model", meta.model.clone()),
            ("dimensions", meta.dimensions.to_string()),
            ("built_at", meta.built_at.to_rfc3339()),
            ("chunk_count", meta.chunk_count.to_string()),
            ("document_count", meta.document_count.to_string()),
            ("source_fingerprint", meta.source_fingerprint.clone()),
        ] {
            insert_meta.execute(params![key, value])?;
        }

        let mut insert_chunk = tx.prepare(
            "INSERT INTO chunks (seq, chunk_id, document, position, start_offset, end_offset, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for (seq, entry) in index.entries().iter().enumerate() {
            let chunk = &entry.chunk;
            insert_chunk.execute(params![
                seq as i64,
                chunk.id,
                chunk.document,
                chunk.position as i64,
                chunk.start as i64,
                chunk.end as i64,
                chunk.text,
                embedding_to_bytes(&entry.embedding),
            ])?;
        }
    }
    tx.commit()
}

/// Read the index at `source`, checking it was built with `expected_model`.
pub fn read_index(source: &Path, expected_model: &str) -> AppResult<LoadOutcome> {
    if !source.exists() {
        return Ok(LoadOutcome::NotFound);
    }

    let corrupt = |e: rusqlite::Error| {
        AppError::IndexCorrupt(format!("Cannot read index {:?}: {}", source, e))
    };

    let conn = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(corrupt)?;

    let format_version = read_meta(&conn, "format_version").map_err(corrupt)?;
    if format_version.as_deref() != Some(FORMAT_VERSION) {
        return Err(AppError::IndexCorrupt(format!(
            "Index {:?} has unsupported format version {:?}",
            source, format_version
        )));
    }

    let stored_model = required_meta(&conn, source, "model")?;
    if stored_model != expected_model {
        return Ok(LoadOutcome::Incompatible {
            stored: stored_model,
            requested: expected_model.to_string(),
        });
    }

    let metadata = IndexMetadata {
        model: stored_model,
        dimensions: parse_meta(source, "dimensions", &required_meta(&conn, source, "dimensions")?)?,
        built_at: DateTime::parse_from_rfc3339(&required_meta(&conn, source, "built_at")?)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::IndexCorrupt(format!("Index {:?} has a bad timestamp: {}", source, e)))?,
        chunk_count: parse_meta(source, "chunk_count", &required_meta(&conn, source, "chunk_count")?)?,
        document_count: parse_meta(
            source,
            "document_count",
            &required_meta(&conn, source, "document_count")?,
        )?,
        source_fingerprint: read_meta(&conn, "source_fingerprint")
            .map_err(corrupt)?
            .unwrap_or_default(),
    };

    let entries = read_entries(&conn).map_err(corrupt)?;

    if entries.len() != metadata.chunk_count {
        return Err(AppError::IndexCorrupt(format!(
            "Index {:?} declares {} chunks but holds {}",
            source,
            metadata.chunk_count,
            entries.len()
        )));
    }
    if entries
        .iter()
        .any(|e| e.embedding.len() != metadata.dimensions)
    {
        return Err(AppError::IndexCorrupt(format!(
            "Index {:?} holds vectors that are not {}-dimensional",
            source, metadata.dimensions
        )));
    }

    tracing::info!(
        "Loaded index ({} chunks, model {}) from {:?}",
        entries.len(),
        metadata.model,
        source
    );
    Ok(LoadOutcome::Loaded(VectorIndex::from_parts(metadata, entries)))
}

fn read_entries(conn: &Connection) -> rusqlite::Result<Vec<IndexEntry>> {
    let mut stmt = conn.prepare(
        "SELECT chunk_id, document, position, start_offset, end_offset, text, embedding
         FROM chunks ORDER BY seq",
    )?;

    let rows = stmt.query_map([], |row| {
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let embedding = bytes_to_embedding(&embedding_bytes).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Blob,
                "embedding length is not a multiple of 4".into(),
            )
        })?;

        Ok(IndexEntry {
            chunk: Chunk {
                id: row.get(0)?,
                document: row.get(1)?,
                position: row.get::<_, i64>(2)? as u32,
                start: row.get::<_, i64>(3)? as usize,
                end: row.get::<_, i64>(4)? as usize,
                text: row.get(5)?,
            },
            embedding,
        })
    })?;

    rows.collect()
}

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

fn required_meta(conn: &Connection, source: &Path, key: &str) -> AppResult<String> {
    read_meta(conn, key)
        .map_err(|e| AppError::IndexCorrupt(format!("Cannot read index {:?}: {}", source, e)))?
        .ok_or_else(|| AppError::IndexCorrupt(format!("Index {:?} is missing '{}'", source, key)))
}

fn parse_meta(source: &Path, key: &str, value: &str) -> AppResult<usize> {
    value.parse().map_err(|_| {
        AppError::IndexCorrupt(format!(
            "Index {:?} has a non-numeric '{}': {}",
            source, key, value
        ))
    })
}

/// Delete a persisted index. Missing files are not an error.
pub fn remove_index(path: &Path) -> AppResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed persisted index {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Knowledge(format!(
            "Failed to remove index {:?}: {}",
            path, e
        ))),
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
