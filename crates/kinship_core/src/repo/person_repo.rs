//! Person persistence.
//!
//! # Invariants
//! - Every query is scoped to one owner.
//! - Active listings are ordered by insertion (`created_at ASC, rowid ASC`).

use super::{optional_uuid_column, placeholders, uuid_column, RepoError, RepoResult, SqliteRepository};
use crate::model::now_epoch_ms;
use crate::model::person::{Person, PersonId};
use crate::model::relationship::RelationshipTypeId;
use crate::model::user::UserId;
use crate::model::validation::require_text;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    first_name,
    last_name,
    nickname,
    relationship_to_user_id,
    created_at,
    deleted_at
FROM people";

/// Repository interface for people.
pub trait PersonRepository {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId>;
    /// Loads one person owned by `owner_id`, optionally including tombstones.
    fn get_person(
        &self,
        id: PersonId,
        owner_id: UserId,
        include_deleted: bool,
    ) -> RepoResult<Option<Person>>;
    /// Active people of one owner in creation order.
    fn list_people(&self, owner_id: UserId) -> RepoResult<Vec<Person>>;
    /// Tombstoned people of one owner, most recently deleted first.
    fn list_deleted_people(&self, owner_id: UserId) -> RepoResult<Vec<Person>>;
    fn set_relationship_to_user(
        &self,
        id: PersonId,
        owner_id: UserId,
        relationship_type_id: Option<RelationshipTypeId>,
    ) -> RepoResult<()>;
    /// Tombstones the given active people; returns how many rows changed.
    fn soft_delete_many(&self, owner_id: UserId, ids: &[PersonId]) -> RepoResult<usize>;
    /// Clears the tombstone of one deleted person.
    fn restore_person(&self, id: PersonId, owner_id: UserId) -> RepoResult<()>;

    /// Active person lookup.
    fn find_person(&self, id: PersonId, owner_id: UserId) -> RepoResult<Option<Person>> {
        self.get_person(id, owner_id, false)
    }
}

impl PersonRepository for SqliteRepository<'_> {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        require_text("first_name", &person.first_name)?;

        self.conn.execute(
            "INSERT INTO people (
                id,
                owner_id,
                first_name,
                last_name,
                nickname,
                relationship_to_user_id,
                created_at,
                updated_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8);",
            params![
                person.id.to_string(),
                person.owner_id.to_string(),
                person.first_name.as_str(),
                person.last_name.as_deref(),
                person.nickname.as_deref(),
                person.relationship_to_user_id.map(|id| id.to_string()),
                person.created_at,
                person.deleted_at,
            ],
        )?;
        Ok(person.id)
    }

    fn get_person(
        &self,
        id: PersonId,
        owner_id: UserId,
        include_deleted: bool,
    ) -> RepoResult<Option<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL}
             WHERE id = ?1
               AND owner_id = ?2
               AND (?3 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![
            id.to_string(),
            owner_id.to_string(),
            i64::from(include_deleted)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }
        Ok(None)
    }

    fn list_people(&self, owner_id: UserId) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL}
             WHERE owner_id = ?1
               AND deleted_at IS NULL
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }

    fn list_deleted_people(&self, owner_id: UserId) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL}
             WHERE owner_id = ?1
               AND deleted_at IS NOT NULL
             ORDER BY deleted_at DESC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }

    fn set_relationship_to_user(
        &self,
        id: PersonId,
        owner_id: UserId,
        relationship_type_id: Option<RelationshipTypeId>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE people
             SET relationship_to_user_id = ?3,
                 updated_at = ?4
             WHERE id = ?1
               AND owner_id = ?2
               AND deleted_at IS NULL;",
            params![
                id.to_string(),
                owner_id.to_string(),
                relationship_type_id.map(|value| value.to_string()),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "person", id });
        }
        Ok(())
    }

    fn soft_delete_many(&self, owner_id: UserId, ids: &[PersonId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE people
             SET deleted_at = ?,
                 updated_at = ?
             WHERE owner_id = ?
               AND deleted_at IS NULL
               AND id IN ({});",
            placeholders(ids.len())
        );
        let deleted_at = now_epoch_ms();
        let mut bind_values = vec![
            Value::Integer(deleted_at),
            Value::Integer(deleted_at),
            Value::Text(owner_id.to_string()),
        ];
        bind_values.extend(ids.iter().map(|id| Value::Text(id.to_string())));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn restore_person(&self, id: PersonId, owner_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE people
             SET deleted_at = NULL,
                 updated_at = ?3
             WHERE id = ?1
               AND owner_id = ?2
               AND deleted_at IS NOT NULL;",
            params![id.to_string(), owner_id.to_string(), now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "person", id });
        }
        Ok(())
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    Ok(Person {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        nickname: row.get("nickname")?,
        relationship_to_user_id: optional_uuid_column(row, "relationship_to_user_id")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
