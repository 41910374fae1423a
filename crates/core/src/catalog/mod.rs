pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::domain::*;
use crate::error::{Error, Result};

/// Connection settings for a catalog.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed entity store for images, folders, tags and baskets.
///
/// A `Catalog` owns one connection. Threads or processes that share a catalog
/// each open their own `Catalog` on the same file; the database is the only
/// synchronization point between them.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &CatalogOptions::default())
    }

    pub fn open_with(path: &Path, options: &CatalogOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        debug!(path = %path.display(), "catalog opened");
        Ok(Self { conn })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ── Folders ──────────────────────────────────────────────────────

    /// Register a folder, returning the existing record if the path is already known.
    pub fn add_folder(&self, path: &Path) -> Result<Folder> {
        let path_str = path.to_string_lossy();
        self.conn.execute(
            "INSERT INTO folders (path) VALUES (?1) ON CONFLICT(path) DO NOTHING",
            params![path_str.as_ref()],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM folders WHERE path = ?1",
            params![path_str.as_ref()],
            |row| row.get(0),
        )?;
        Ok(Folder {
            id,
            path: path.to_path_buf(),
        })
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder> {
        self.conn
            .query_row(
                "SELECT id, path FROM folders WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Folder {
                        id: row.get(0)?,
                        path: PathBuf::from(row.get::<_, String>(1)?),
                    })
                },
            )
            .optional()?
            .ok_or(Error::FolderNotFound(id))
    }

    // ── Images ───────────────────────────────────────────────────────

    pub fn add_image(&self, image: &NewImage) -> Result<Image> {
        if image.file_name.is_empty() {
            return Err(Error::Validation("image file name is empty".into()));
        }
        if !folder_exists(&self.conn, image.folder_id)? {
            return Err(Error::FolderNotFound(image.folder_id));
        }
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO images (folder_id, file_name, file_size_bytes, file_creation_date,
             file_last_mod_date, sort_date, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image.folder_id,
                image.file_name,
                image.file_size_bytes as i64,
                to_millis(image.file_creation_date),
                to_millis(image.file_last_mod_date),
                to_millis(image.sort_date),
                to_millis(now),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_image(id)
    }

    pub fn get_image(&self, id: ImageId) -> Result<Image> {
        self.conn
            .query_row(
                "SELECT id, folder_id, file_name, file_size_bytes, file_creation_date,
                 file_last_mod_date, sort_date, last_updated, classification_id, classification_score
                 FROM images WHERE id = ?1",
                params![id],
                image_from_row,
            )
            .optional()?
            .ok_or(Error::ImageNotFound(id))
    }

    /// All images ordered by sort date, newest first.
    pub fn list_images(&self) -> Result<Vec<Image>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, folder_id, file_name, file_size_bytes, file_creation_date,
             file_last_mod_date, sort_date, last_updated, classification_id, classification_score
             FROM images ORDER BY sort_date DESC, id",
        )?;
        let images = stmt
            .query_map([], image_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(images)
    }

    pub fn count_images(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Full on-disk path of an image, resolved through its folder.
    pub fn image_full_path(&self, id: ImageId) -> Result<PathBuf> {
        let (folder_path, file_name) = self
            .conn
            .query_row(
                "SELECT f.path, i.file_name FROM images i
                 JOIN folders f ON f.id = i.folder_id
                 WHERE i.id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or(Error::ImageNotFound(id))?;
        Ok(full_path(Path::new(&folder_path), &file_name))
    }

    pub fn set_image_hash(&self, id: ImageId, sha256: &str) -> Result<()> {
        ensure_image(&self.conn, id)?;
        self.conn.execute(
            "INSERT INTO image_hashes (image_id, sha256) VALUES (?1, ?2)
             ON CONFLICT(image_id) DO UPDATE SET sha256 = excluded.sha256",
            params![id, sha256],
        )?;
        Ok(())
    }

    pub fn get_image_hash(&self, id: ImageId) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT sha256 FROM image_hashes WHERE image_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    pub fn set_image_metadata(&self, id: ImageId, meta: &ImageMetaData) -> Result<()> {
        ensure_image(&self.conn, id)?;
        self.conn.execute(
            "INSERT INTO image_metadata (image_id, width, height, date_taken, camera_make, camera_model, caption)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(image_id) DO UPDATE SET
                width = excluded.width, height = excluded.height, date_taken = excluded.date_taken,
                camera_make = excluded.camera_make, camera_model = excluded.camera_model,
                caption = excluded.caption",
            params![
                id,
                meta.width,
                meta.height,
                meta.date_taken.map(to_millis),
                meta.camera_make,
                meta.camera_model,
                meta.caption,
            ],
        )?;
        Ok(())
    }

    pub fn get_image_metadata(&self, id: ImageId) -> Result<Option<ImageMetaData>> {
        let meta = self
            .conn
            .query_row(
                "SELECT width, height, date_taken, camera_make, camera_model, caption
                 FROM image_metadata WHERE image_id = ?1",
                params![id],
                |row| {
                    Ok(ImageMetaData {
                        width: row.get(0)?,
                        height: row.get(1)?,
                        date_taken: row.get::<_, Option<i64>>(2)?.map(from_millis),
                        camera_make: row.get(3)?,
                        camera_model: row.get(4)?,
                        caption: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(meta)
    }

    // ── Tags & classification ────────────────────────────────────────

    /// Look up a keyword, creating it if it is new.
    pub fn add_tag(&self, keyword: &str) -> Result<Tag> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::Validation("tag keyword is empty".into()));
        }
        self.conn.execute(
            "INSERT INTO tags (keyword) VALUES (?1) ON CONFLICT(keyword) DO NOTHING",
            params![keyword],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM tags WHERE keyword = ?1",
            params![keyword],
            |row| row.get(0),
        )?;
        Ok(Tag {
            id,
            keyword: keyword.to_string(),
        })
    }

    /// Returns true if the tag was newly applied.
    pub fn tag_image(&self, image_id: ImageId, tag_id: TagId) -> Result<bool> {
        ensure_image(&self.conn, image_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            params![image_id, tag_id],
        )?;
        Ok(inserted > 0)
    }

    /// Returns true if the tag was present and removed.
    pub fn untag_image(&self, image_id: ImageId, tag_id: TagId) -> Result<bool> {
        ensure_image(&self.conn, image_id)?;
        let deleted = self.conn.execute(
            "DELETE FROM image_tags WHERE image_id = ?1 AND tag_id = ?2",
            params![image_id, tag_id],
        )?;
        Ok(deleted > 0)
    }

    pub fn image_tags(&self, image_id: ImageId) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.keyword FROM tags t
             JOIN image_tags it ON it.tag_id = t.id
             WHERE it.image_id = ?1 ORDER BY t.keyword",
        )?;
        let tags = stmt
            .query_map(params![image_id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    keyword: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn add_classification(&self, label: &str) -> Result<Classification> {
        if label.is_empty() {
            return Err(Error::Validation("classification label is empty".into()));
        }
        self.conn.execute(
            "INSERT INTO classifications (label) VALUES (?1) ON CONFLICT(label) DO NOTHING",
            params![label],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM classifications WHERE label = ?1",
            params![label],
            |row| row.get(0),
        )?;
        Ok(Classification {
            id,
            label: label.to_string(),
        })
    }

    pub fn set_classification(&self, image_id: ImageId, classification_id: Option<i64>, score: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(Error::Validation(format!(
                "classification score {score} is outside 0.0-1.0"
            )));
        }
        let updated = self.conn.execute(
            "UPDATE images SET classification_id = ?1, classification_score = ?2 WHERE id = ?3",
            params![classification_id, score, image_id],
        )?;
        if updated == 0 {
            return Err(Error::ImageNotFound(image_id));
        }
        Ok(())
    }

    // ── Baskets ──────────────────────────────────────────────────────

    pub fn insert_basket(&self, name: &str, user_id: Option<UserId>, is_default: bool) -> Result<Basket> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO baskets (name, user_id, is_default, date_added) VALUES (?1, ?2, ?3, ?4)",
            params![name, user_id, is_default, to_millis(now)],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(basket_id = id, name, ?user_id, is_default, "basket row inserted");
        Ok(Basket {
            id,
            name: name.to_string(),
            user_id,
            is_default,
            date_added: from_millis(to_millis(now)),
        })
    }

    pub fn get_basket(&self, id: BasketId) -> Result<Basket> {
        self.conn
            .query_row(
                "SELECT id, name, user_id, is_default, date_added FROM baskets WHERE id = ?1",
                params![id],
                basket_from_row,
            )
            .optional()?
            .ok_or(Error::BasketNotFound(id))
    }

    pub fn find_default_basket(&self, user_id: UserId) -> Result<Option<Basket>> {
        let basket = self
            .conn
            .query_row(
                "SELECT id, name, user_id, is_default, date_added FROM baskets
                 WHERE user_id = ?1 AND is_default = 1",
                params![user_id],
                basket_from_row,
            )
            .optional()?;
        Ok(basket)
    }

    /// Baskets owned by `user_id` plus unscoped baskets, or every basket when
    /// `user_id` is `None`. Ordered by id.
    pub fn list_baskets(&self, user_id: Option<UserId>) -> Result<Vec<Basket>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, user_id, is_default, date_added FROM baskets
             WHERE ?1 IS NULL OR user_id = ?1 OR user_id IS NULL
             ORDER BY id",
        )?;
        let baskets = stmt
            .query_map(params![user_id], basket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(baskets)
    }

    pub fn rename_basket(&self, id: BasketId, name: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE baskets SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if updated == 0 {
            return Err(Error::BasketNotFound(id));
        }
        Ok(())
    }

    pub fn count_baskets(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM baskets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Basket entries ───────────────────────────────────────────────

    /// Image ids in a basket, in the order they were added.
    pub fn basket_image_ids(&self, basket_id: BasketId) -> Result<Vec<ImageId>> {
        entry_image_ids(&self.conn, basket_id)
    }

    pub fn list_entries(&self, basket_id: BasketId) -> Result<Vec<BasketEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT basket_id, image_id, date_added FROM basket_entries
             WHERE basket_id = ?1 ORDER BY date_added, rowid",
        )?;
        let entries = stmt
            .query_map(params![basket_id], |row| {
                Ok(BasketEntry {
                    basket_id: row.get(0)?,
                    image_id: row.get(1)?,
                    date_added: from_millis(row.get(2)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn contains_entry(&self, basket_id: BasketId, image_id: ImageId) -> Result<bool> {
        entry_exists(&self.conn, basket_id, image_id)
    }

    pub fn count_entries(&self, basket_id: BasketId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM basket_entries WHERE basket_id = ?1",
            params![basket_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn baskets_for_image(&self, image_id: ImageId) -> Result<Vec<Basket>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.name, b.user_id, b.is_default, b.date_added FROM baskets b
             JOIN basket_entries e ON e.basket_id = b.id
             WHERE e.image_id = ?1 ORDER BY b.id",
        )?;
        let baskets = stmt
            .query_map(params![image_id], basket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(baskets)
    }

    // ── Config ───────────────────────────────────────────────────

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

// ── Row-level helpers shared with transactional callers ─────────────

pub(crate) fn basket_exists(conn: &Connection, id: BasketId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM baskets WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn image_exists(conn: &Connection, id: ImageId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM images WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn folder_exists(conn: &Connection, id: FolderId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM folders WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn ensure_image(conn: &Connection, id: ImageId) -> Result<()> {
    if image_exists(conn, id)? {
        Ok(())
    } else {
        Err(Error::ImageNotFound(id))
    }
}

pub(crate) fn entry_exists(conn: &Connection, basket_id: BasketId, image_id: ImageId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM basket_entries WHERE basket_id = ?1 AND image_id = ?2",
            params![basket_id, image_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert a membership row. Returns false if the pair was already present.
pub(crate) fn insert_entry(conn: &Connection, basket_id: BasketId, image_id: ImageId, at: DateTime<Utc>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO basket_entries (basket_id, image_id, date_added) VALUES (?1, ?2, ?3)
         ON CONFLICT(basket_id, image_id) DO NOTHING",
        params![basket_id, image_id, to_millis(at)],
    )?;
    Ok(inserted > 0)
}

/// Delete a membership row. Returns false if the pair was absent.
pub(crate) fn delete_entry(conn: &Connection, basket_id: BasketId, image_id: ImageId) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM basket_entries WHERE basket_id = ?1 AND image_id = ?2",
        params![basket_id, image_id],
    )?;
    Ok(deleted > 0)
}

pub(crate) fn entry_image_ids(conn: &Connection, basket_id: BasketId) -> Result<Vec<ImageId>> {
    let mut stmt = conn.prepare(
        "SELECT image_id FROM basket_entries WHERE basket_id = ?1 ORDER BY date_added, rowid",
    )?;
    let ids = stmt
        .query_map(params![basket_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        file_name: row.get(2)?,
        file_size_bytes: row.get::<_, i64>(3)? as u64,
        file_creation_date: from_millis(row.get(4)?),
        file_last_mod_date: from_millis(row.get(5)?),
        sort_date: from_millis(row.get(6)?),
        last_updated: from_millis(row.get(7)?),
        classification_id: row.get(8)?,
        classification_score: row.get(9)?,
    })
}

fn basket_from_row(row: &Row<'_>) -> rusqlite::Result<Basket> {
    Ok(Basket {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        is_default: row.get(3)?,
        date_added: from_millis(row.get(4)?),
    })
}
