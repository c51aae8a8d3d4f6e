//! SQLite FTS5 implementation of [`SearchIndex`].

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use dgm_core::model::ShowId;

use crate::document::{SearchDocument, SEARCH_FIELDS, SEARCH_SCHEMA_VERSION};
use crate::error::SearchResult;
use crate::index::{RankedIds, SearchIndex};

const TABLE: &str = "show_search";

/// A BM25-ranked full-text index over [`SEARCH_FIELDS`].
///
/// Lives in its own SQLite file, separate from the catalog: the two are
/// not kept transactionally consistent, and the index can always be
/// rebuilt from the catalog with [`rebuild_index`](crate::rebuild_index).
#[derive(Debug)]
pub struct FtsIndex {
    conn: Connection,
}

impl FtsIndex {
    /// Open (or create) an index at the given path.
    pub fn open(path: impl AsRef<Path>) -> SearchResult<Self> {
        let conn = Connection::open(path)?;
        let index = Self { conn };
        index.ensure_schema()?;
        Ok(index)
    }

    /// Open an in-memory index (for tests).
    pub fn open_in_memory() -> SearchResult<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn };
        index.ensure_schema()?;
        Ok(index)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> SearchResult<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> SearchResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Create the FTS table, dropping it first when it was built from a
    /// different field list.
    fn ensure_schema(&self) -> SearchResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS search_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM search_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let current = SEARCH_SCHEMA_VERSION.to_string();
        if stored.as_deref() != Some(current.as_str()) {
            if let Some(old) = &stored {
                log::info!(
                    "Search fields changed (version {} -> {}), rebuilding index table",
                    old,
                    current
                );
            }
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {TABLE};"))?;
        }

        let columns = SEARCH_FIELDS
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {TABLE} USING fts5(
                {columns},
                tokenize = 'unicode61 remove_diacritics 2'
            );"
        ))?;

        self.conn.execute(
            "INSERT INTO search_meta (key, value) VALUES ('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [current],
        )?;

        Ok(())
    }

    fn insert(conn: &Connection, doc: &SearchDocument) -> SearchResult<()> {
        let columns = SEARCH_FIELDS
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (2..=SEARCH_FIELDS.len() + 1)
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute(&format!("DELETE FROM {TABLE} WHERE rowid = ?1"), [doc.id])?;

        let fields = doc.values();
        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&doc.id];
        for value in &fields {
            values.push(value);
        }
        conn.execute(
            &format!("INSERT INTO {TABLE} (rowid, {columns}) VALUES (?1, {placeholders})"),
            values.as_slice(),
        )?;
        Ok(())
    }
}

impl SearchIndex for FtsIndex {
    fn index(&self, doc: &SearchDocument) -> SearchResult<()> {
        Self::insert(&self.conn, doc)
    }

    fn delete(&self, id: ShowId) -> SearchResult<()> {
        self.conn
            .execute(&format!("DELETE FROM {TABLE} WHERE rowid = ?1"), [id])?;
        Ok(())
    }

    fn clear(&self) -> SearchResult<()> {
        self.conn.execute(&format!("DELETE FROM {TABLE}"), [])?;
        Ok(())
    }

    fn query(&self, text: &str, from: usize, size: usize) -> SearchResult<RankedIds> {
        let Some(expr) = match_expression(text) else {
            return Ok(RankedIds::default());
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {TABLE} WHERE {TABLE} MATCH ?1"),
            [&expr],
            |row| row.get(0),
        )?;

        let weights = SEARCH_FIELDS
            .iter()
            .map(|f| format!("{:.1}", f.weight))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT rowid FROM {TABLE}
             WHERE {TABLE} MATCH ?1
             ORDER BY bm25({TABLE}, {weights}), rowid
             LIMIT ?2 OFFSET ?3"
        ))?;

        let ids = stmt
            .query_map(params![expr, size as i64, from as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<ShowId>>>()?;

        Ok(RankedIds {
            ids,
            total: total as usize,
        })
    }

    fn index_batch(&self, docs: &[SearchDocument]) -> SearchResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for doc in docs {
            Self::insert(&tx, doc)?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Turn free text into an FTS5 match expression.
///
/// Every word becomes a quoted term so user punctuation can never be read
/// as query syntax; terms are OR-ed and BM25 ranks documents matching more
/// of them first. A trailing `*` on a word keeps prefix matching. Returns
/// `None` when the text holds no searchable word.
pub(crate) fn match_expression(text: &str) -> Option<String> {
    let mut terms = Vec::new();

    for word in text.split_whitespace() {
        let prefix = word.ends_with('*');
        let parts: Vec<&str> = word
            .split(|c: char| !c.is_alphanumeric())
            .filter(|p| !p.is_empty())
            .collect();
        let last = parts.len().saturating_sub(1);
        for (i, part) in parts.iter().enumerate() {
            if prefix && i == last {
                terms.push(format!("\"{part}\"*"));
            } else {
                terms.push(format!("\"{part}\""));
            }
        }
    }

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
