#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("basket not found: {0}")]
    BasketNotFound(i64),

    #[error("image not found: {0}")]
    ImageNotFound(i64),

    #[error("folder not found: {0}")]
    FolderNotFound(i64),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("catalog schema version {db} is newer than supported version {code}")]
    SchemaTooNew { db: u32, code: u32 },

    #[error("catalog schema version is unreadable: {0:?}")]
    SchemaVersionInvalid(String),
}

impl Error {
    /// True for any of the "referenced record does not exist" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::BasketNotFound(_) | Error::ImageNotFound(_) | Error::FolderNotFound(_)
        )
    }

    /// True when the underlying error is a SQLite constraint violation
    /// (unique index, primary key or foreign key).
    pub(crate) fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
