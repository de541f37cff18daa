//! Relationship type registry persistence.
//!
//! # Invariants
//! - Inverse links are written in both directions inside one transaction.
//! - Tombstoning a type unlinks every type that used it as inverse.

use super::{optional_uuid_column, uuid_column, RepoError, RepoResult, SqliteRepository};
use crate::model::now_epoch_ms;
use crate::model::relationship::{RelationshipType, RelationshipTypeId};
use crate::model::user::UserId;
use crate::model::validation::require_text;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const TYPE_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    color,
    inverse_id,
    created_at,
    deleted_at
FROM relationship_types";

/// Repository interface for relationship types.
pub trait RelationshipTypeRepository {
    /// Inserts one type. When `inverse_id` names another type, that type is
    /// pointed back at the new one.
    fn create_type(&self, relationship_type: &RelationshipType) -> RepoResult<RelationshipTypeId>;
    /// Inserts two types that are each other's inverse.
    fn create_type_pair(
        &self,
        first: &RelationshipType,
        second: &RelationshipType,
    ) -> RepoResult<(RelationshipTypeId, RelationshipTypeId)>;
    fn find_relationship_type(
        &self,
        id: RelationshipTypeId,
        owner_id: UserId,
    ) -> RepoResult<Option<RelationshipType>>;
    /// Active types of one owner in creation order.
    fn list_types(&self, owner_id: UserId) -> RepoResult<Vec<RelationshipType>>;
    /// Replaces name and color.
    fn update_type(&self, relationship_type: &RelationshipType) -> RepoResult<()>;
    fn soft_delete_type(&self, id: RelationshipTypeId, owner_id: UserId) -> RepoResult<()>;
}

impl RelationshipTypeRepository for SqliteRepository<'_> {
    fn create_type(&self, relationship_type: &RelationshipType) -> RepoResult<RelationshipTypeId> {
        require_text("name", &relationship_type.name)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_type(&tx, relationship_type, relationship_type.inverse_id)?;
        if let Some(inverse_id) = relationship_type.inverse_id {
            if inverse_id != relationship_type.id {
                point_inverse(
                    &tx,
                    inverse_id,
                    relationship_type.owner_id,
                    relationship_type.id,
                )?;
            }
        }
        tx.commit()?;
        Ok(relationship_type.id)
    }

    fn create_type_pair(
        &self,
        first: &RelationshipType,
        second: &RelationshipType,
    ) -> RepoResult<(RelationshipTypeId, RelationshipTypeId)> {
        require_text("name", &first.name)?;
        require_text("name", &second.name)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_type(&tx, first, Some(second.id))?;
        insert_type(&tx, second, Some(first.id))?;
        tx.commit()?;
        Ok((first.id, second.id))
    }

    fn find_relationship_type(
        &self,
        id: RelationshipTypeId,
        owner_id: UserId,
    ) -> RepoResult<Option<RelationshipType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TYPE_SELECT_SQL}
             WHERE id = ?1
               AND owner_id = ?2
               AND deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query([id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_type_row(row)?));
        }
        Ok(None)
    }

    fn list_types(&self, owner_id: UserId) -> RepoResult<Vec<RelationshipType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TYPE_SELECT_SQL}
             WHERE owner_id = ?1
               AND deleted_at IS NULL
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut types = Vec::new();
        while let Some(row) = rows.next()? {
            types.push(parse_type_row(row)?);
        }
        Ok(types)
    }

    fn update_type(&self, relationship_type: &RelationshipType) -> RepoResult<()> {
        require_text("name", &relationship_type.name)?;

        let changed = self.conn.execute(
            "UPDATE relationship_types
             SET name = ?3,
                 color = ?4,
                 updated_at = ?5
             WHERE id = ?1
               AND owner_id = ?2
               AND deleted_at IS NULL;",
            params![
                relationship_type.id.to_string(),
                relationship_type.owner_id.to_string(),
                relationship_type.name.as_str(),
                relationship_type.color.as_deref(),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "relationship type",
                id: relationship_type.id,
            });
        }
        Ok(())
    }

    fn soft_delete_type(&self, id: RelationshipTypeId, owner_id: UserId) -> RepoResult<()> {
        let deleted_at = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE relationship_types
             SET deleted_at = ?3,
                 updated_at = ?3
             WHERE id = ?1
               AND owner_id = ?2
               AND deleted_at IS NULL;",
            params![id.to_string(), owner_id.to_string(), deleted_at],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "relationship type",
                id,
            });
        }

        tx.execute(
            "UPDATE relationship_types
             SET inverse_id = NULL,
                 updated_at = ?3
             WHERE inverse_id = ?1
               AND id <> ?1
               AND owner_id = ?2;",
            params![id.to_string(), owner_id.to_string(), deleted_at],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn insert_type(
    conn: &Connection,
    relationship_type: &RelationshipType,
    inverse_id: Option<RelationshipTypeId>,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO relationship_types (
            id,
            owner_id,
            name,
            color,
            inverse_id,
            created_at,
            updated_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, NULL);",
        params![
            relationship_type.id.to_string(),
            relationship_type.owner_id.to_string(),
            relationship_type.name.as_str(),
            relationship_type.color.as_deref(),
            inverse_id.map(|value| value.to_string()),
            relationship_type.created_at,
        ],
    )?;
    Ok(())
}

fn point_inverse(
    conn: &Connection,
    id: RelationshipTypeId,
    owner_id: UserId,
    inverse_id: RelationshipTypeId,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE relationship_types
         SET inverse_id = ?3,
             updated_at = ?4
         WHERE id = ?1
           AND owner_id = ?2
           AND deleted_at IS NULL;",
        params![
            id.to_string(),
            owner_id.to_string(),
            inverse_id.to_string(),
            now_epoch_ms(),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "relationship type",
            id,
        });
    }
    Ok(())
}

fn parse_type_row(row: &Row<'_>) -> RepoResult<RelationshipType> {
    Ok(RelationshipType {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        inverse_id: optional_uuid_column(row, "inverse_id")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
