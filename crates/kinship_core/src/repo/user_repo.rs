//! Account owner persistence.

use super::{uuid_column, RepoResult, SqliteRepository};
use crate::model::user::{User, UserId};
use rusqlite::{params, Row};

/// Repository interface for account owners.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
}

impl UserRepository for SqliteRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        self.conn.execute(
            "INSERT INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3);",
            params![user.id.to_string(), user.display_name.as_str(), user.created_at],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, display_name, created_at FROM users WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: uuid_column(row, "id")?,
        display_name: row.get("display_name")?,
        created_at: row.get("created_at")?,
    })
}
