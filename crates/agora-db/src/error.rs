use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse failure class, used by callers to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced post, comment or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Input that should have been rejected at the boundary.
    #[error("{0}")]
    InvalidInput(String),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("connection lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Sqlite(_) | Self::LockPoisoned(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }
}

/// Constraint failures are classified by SQLite's extended result code so a
/// duplicate row is never reported as a generic failure.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict(
                        msg.clone()
                            .unwrap_or_else(|| "unique constraint violated".to_string()),
                    );
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::NotFound("referenced row does not exist".to_string());
                }
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}
