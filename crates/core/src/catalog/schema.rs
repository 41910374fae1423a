use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS folders (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            path        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS classifications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            label       TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS images (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_id            INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
            file_name            TEXT NOT NULL,
            file_size_bytes      INTEGER NOT NULL,
            file_creation_date   INTEGER NOT NULL,
            file_last_mod_date   INTEGER NOT NULL,
            sort_date            INTEGER NOT NULL,
            last_updated         INTEGER NOT NULL,
            classification_id    INTEGER REFERENCES classifications(id) ON DELETE SET NULL,
            classification_score REAL NOT NULL DEFAULT 0.0,
            UNIQUE (folder_id, file_name)
        );

        CREATE INDEX IF NOT EXISTS idx_images_folder ON images(folder_id);
        CREATE INDEX IF NOT EXISTS idx_images_sort_date ON images(sort_date);

        CREATE TABLE IF NOT EXISTS image_hashes (
            image_id    INTEGER PRIMARY KEY REFERENCES images(id) ON DELETE CASCADE,
            sha256      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS image_metadata (
            image_id     INTEGER PRIMARY KEY REFERENCES images(id) ON DELETE CASCADE,
            width        INTEGER,
            height       INTEGER,
            date_taken   INTEGER,
            camera_make  TEXT,
            camera_model TEXT,
            caption      TEXT
        );

        CREATE TABLE IF NOT EXISTS tags (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            keyword     TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS image_tags (
            image_id    INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            tag_id      INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (image_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS baskets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            user_id     INTEGER,
            is_default  INTEGER NOT NULL DEFAULT 0,
            date_added  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_baskets_user ON baskets(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_baskets_default_user
            ON baskets(user_id) WHERE is_default = 1;

        CREATE TABLE IF NOT EXISTS basket_entries (
            basket_id   INTEGER NOT NULL REFERENCES baskets(id) ON DELETE CASCADE,
            image_id    INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            date_added  INTEGER NOT NULL,
            PRIMARY KEY (basket_id, image_id)
        );

        CREATE INDEX IF NOT EXISTS idx_basket_entries_image ON basket_entries(image_id);

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Stamp or check the schema version stored in `config`.
///
/// A database without a version key is treated as version 1. A database written
/// by a newer build is rejected rather than silently downgraded, and a stored
/// value that is not a version number is reported instead of overwritten.
pub fn migrate(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let Some(stored) = stored else {
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        return Ok(());
    };

    let db: u32 = stored
        .trim()
        .parse()
        .map_err(|_| Error::SchemaVersionInvalid(stored.clone()))?;
    if db > SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            db,
            code: SCHEMA_VERSION,
        });
    }
    Ok(())
}
