use rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::models::{UserRow, user_from_row};
use crate::{Result, StoreError};

/// Insert a user and return its generated id. A taken username surfaces as
/// [`StoreError::Conflict`] through the unique index.
pub fn create_user(tx: &Transaction<'_>, username: &str, password_hash: &str) -> Result<String> {
    if username.trim().is_empty() {
        return Err(StoreError::InvalidInput("username must not be empty".into()));
    }

    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
        (&id, username, password_hash),
    )?;
    Ok(id)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
            [username],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::{Database, ErrorKind};

    #[test]
    fn duplicate_username_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "hash").unwrap();

        let err = db.create_user("alice", "other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn lookup_by_name_and_id() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("bob", "hash").unwrap();

        let by_name = db.get_user_by_username("bob").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.password_hash, "hash");

        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_id.username, "bob");

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn empty_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_user("  ", "hash").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
