use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::model::{
    DgmId, Instrument, InstrumentId, Member, MemberId, NewShow, Show, ShowId, Track, TrackId,
};

use super::migrations::MIGRATIONS;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SHOW_COLUMNS: &str = "id, dgm_id, venue, location, date, date_friendly, quality_rating,
     description, source, cover, has_download";

/// A database connection with CRUD methods for catalog entities.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        // Foreign keys are per-connection in SQLite
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Show writes
impl Database {
    /// Write a scraped show with its lineup and setlist in one transaction.
    ///
    /// A show whose external id is already stored is replaced in place: the
    /// row keeps its store id, and its members and tracks are rewritten.
    /// Instruments are looked up or created by exact name.
    pub fn upsert_show(&self, show: &NewShow) -> Result<ShowId> {
        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<ShowId> = tx
            .query_row(
                "SELECT id FROM shows WHERE dgm_id = ?1",
                [show.dgm_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        let show_id = if let Some(id) = existing {
            log::debug!("Replacing show {} (dgm id {})", id, show.dgm_id);
            tx.execute(
                "UPDATE shows SET
                    venue = ?2, location = ?3, date = ?4, date_friendly = ?5,
                    quality_rating = ?6, description = ?7, source = ?8, cover = ?9,
                    has_download = ?10
                 WHERE id = ?1",
                params![
                    id,
                    show.venue,
                    show.location,
                    show.date.format(DATE_FORMAT).to_string(),
                    show.date_friendly,
                    show.quality_rating.map(i64::from),
                    show.description,
                    show.source,
                    show.cover,
                    show.has_download,
                ],
            )?;
            tx.execute("DELETE FROM members WHERE show_id = ?1", [id])?;
            tx.execute("DELETE FROM tracks WHERE show_id = ?1", [id])?;
            id
        } else {
            tx.execute(
                "INSERT INTO shows (
                    dgm_id, venue, location, date, date_friendly, quality_rating,
                    description, source, cover, has_download
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    show.dgm_id.get(),
                    show.venue,
                    show.location,
                    show.date.format(DATE_FORMAT).to_string(),
                    show.date_friendly,
                    show.quality_rating.map(i64::from),
                    show.description,
                    show.source,
                    show.cover,
                    show.has_download,
                ],
            )?;
            ShowId::from_raw(tx.last_insert_rowid())
        };

        for member in &show.members {
            tx.execute(
                "INSERT INTO members (show_id, name) VALUES (?1, ?2)",
                params![show_id, member.name],
            )?;
            let member_id = tx.last_insert_rowid();

            for name in &member.instruments {
                // Lookup-or-create is atomic on the UNIQUE name
                tx.execute(
                    "INSERT OR IGNORE INTO instruments (name) VALUES (?1)",
                    [name],
                )?;
                let instrument_id: i64 = tx.query_row(
                    "SELECT id FROM instruments WHERE name = ?1",
                    [name],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO member_instruments (member_id, instrument_id)
                     VALUES (?1, ?2)",
                    params![member_id, instrument_id],
                )?;
            }
        }

        for (index, track) in show.tracks.iter().enumerate() {
            tx.execute(
                "INSERT INTO tracks (show_id, position, number, name, length_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    show_id,
                    index as u32 + 1,
                    track.number,
                    track.name,
                    track.length_secs,
                ],
            )?;
        }

        tx.commit()?;
        Ok(show_id)
    }
}

// Show reads
impl Database {
    /// Get a show by its store id.
    pub fn get_show(&self, id: ShowId) -> Result<Option<Show>> {
        let show = self
            .conn
            .query_row(
                &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = ?1"),
                [id],
                Self::row_to_show,
            )
            .optional()?;
        Ok(show)
    }

    /// Get a show by the site's page number.
    pub fn get_show_by_dgm_id(&self, dgm_id: DgmId) -> Result<Option<Show>> {
        let show = self
            .conn
            .query_row(
                &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE dgm_id = ?1"),
                [dgm_id.get()],
                Self::row_to_show,
            )
            .optional()?;
        Ok(show)
    }

    /// Fetch every show whose id is in `ids`, in no particular order.
    ///
    /// Ids with no row are skipped.
    pub fn shows_by_ids(&self, ids: &[ShowId]) -> Result<Vec<Show>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE id IN ({placeholders})"
        ))?;

        let shows = stmt
            .query_map(params_from_iter(ids.iter()), Self::row_to_show)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(shows)
    }

    /// List all shows ordered by external id.
    pub fn list_shows(&self) -> Result<Vec<Show>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows ORDER BY dgm_id"
        ))?;

        let shows = stmt
            .query_map([], Self::row_to_show)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(shows)
    }

    /// List shows in which someone played the named instrument, ordered by
    /// external id.
    pub fn shows_with_instrument(&self, instrument: &str) -> Result<Vec<Show>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE id IN (
                SELECT m.show_id FROM members m
                JOIN member_instruments mi ON mi.member_id = m.id
                JOIN instruments i ON i.id = mi.instrument_id
                WHERE i.name = ?1
             )
             ORDER BY dgm_id"
        ))?;

        let shows = stmt
            .query_map([instrument], Self::row_to_show)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(shows)
    }

    /// The highest external id stored so far.
    pub fn max_dgm_id(&self) -> Result<Option<DgmId>> {
        let max: Option<u32> = self
            .conn
            .query_row("SELECT MAX(dgm_id) FROM shows", [], |row| row.get(0))?;
        Ok(max.map(DgmId::new))
    }

    pub fn count_shows(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM shows", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_show(row: &rusqlite::Row) -> rusqlite::Result<Show> {
        let date_str: String = row.get(4)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Show {
            id: row.get(0)?,
            dgm_id: DgmId::new(row.get(1)?),
            venue: row.get(2)?,
            location: row.get(3)?,
            date,
            date_friendly: row.get(5)?,
            quality_rating: row.get::<_, Option<i64>>(6)?.map(|v| v as u8),
            description: row.get(7)?,
            source: row.get(8)?,
            cover: row.get(9)?,
            has_download: row.get(10)?,
        })
    }
}

// Lineup and setlist reads
impl Database {
    /// Tracks of a show in position order.
    pub fn tracks_for_show(&self, show_id: ShowId) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, show_id, position, number, name, length_secs
             FROM tracks
             WHERE show_id = ?1
             ORDER BY position",
        )?;

        let tracks = stmt
            .query_map([show_id], |row| {
                Ok(Track {
                    id: TrackId::from_raw(row.get(0)?),
                    show_id: row.get(1)?,
                    position: row.get(2)?,
                    number: row.get(3)?,
                    name: row.get(4)?,
                    length_secs: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tracks)
    }

    /// Lineup of a show in page order, each member with its instruments.
    pub fn members_for_show(&self, show_id: ShowId) -> Result<Vec<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, show_id, name FROM members WHERE show_id = ?1 ORDER BY id",
        )?;

        let mut members = stmt
            .query_map([show_id], |row| {
                Ok(Member {
                    id: MemberId::from_raw(row.get(0)?),
                    show_id: row.get(1)?,
                    name: row.get(2)?,
                    instruments: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for member in &mut members {
            member.instruments = self.instruments_for_member(member.id)?;
        }

        Ok(members)
    }

    fn instruments_for_member(&self, member_id: MemberId) -> Result<Vec<Instrument>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.name
             FROM instruments i
             JOIN member_instruments mi ON mi.instrument_id = i.id
             WHERE mi.member_id = ?1
             ORDER BY mi.rowid",
        )?;

        let instruments = stmt
            .query_map([member_id.as_i64()], |row| {
                Ok(Instrument {
                    id: InstrumentId::from_raw(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(instruments)
    }

    /// Look up an instrument by exact name.
    pub fn find_instrument(&self, name: &str) -> Result<Option<Instrument>> {
        let instrument = self
            .conn
            .query_row(
                "SELECT id, name FROM instruments WHERE name = ?1",
                [name],
                |row| {
                    Ok(Instrument {
                        id: InstrumentId::from_raw(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(instrument)
    }

    pub fn count_instruments(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM instruments", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
