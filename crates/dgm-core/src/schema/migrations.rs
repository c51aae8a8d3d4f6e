/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Shows (one per successfully parsed tour page)
CREATE TABLE IF NOT EXISTS shows (
    id INTEGER PRIMARY KEY,
    dgm_id INTEGER NOT NULL UNIQUE,
    venue TEXT NOT NULL,
    location TEXT NOT NULL,
    date TEXT NOT NULL,
    date_friendly TEXT NOT NULL,
    quality_rating INTEGER,
    description TEXT,
    source TEXT,
    cover TEXT,
    has_download INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_shows_date ON shows(date);

-- Lineup members (belong to exactly one show)
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY,
    show_id INTEGER NOT NULL REFERENCES shows(id) ON DELETE CASCADE,
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_show_id ON members(show_id);

-- Instruments (one row per distinct name across the catalog)
CREATE TABLE IF NOT EXISTS instruments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Member-instrument junction (many-to-many)
CREATE TABLE IF NOT EXISTS member_instruments (
    member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
    instrument_id INTEGER NOT NULL REFERENCES instruments(id),
    PRIMARY KEY (member_id, instrument_id)
);

CREATE INDEX IF NOT EXISTS idx_member_instruments_instrument_id
    ON member_instruments(instrument_id);

-- Setlist tracks (ordered by position within a show)
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY,
    show_id INTEGER NOT NULL REFERENCES shows(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    number TEXT NOT NULL,
    name TEXT NOT NULL,
    length_secs INTEGER,
    UNIQUE (show_id, position)
);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
