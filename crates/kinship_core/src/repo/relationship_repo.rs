//! Relationship edge persistence.
//!
//! # Responsibility
//! - Store directed edges and read adjacency lists for one person.
//! - Write forward/reverse pairs atomically.
//!
//! # Invariants
//! - Adjacency reads (`list_edges_from`, `list_edges_to`) skip edges whose
//!   endpoints or type are tombstoned.
//! - At most one active edge per `(person_id, related_person_id, type)`,
//!   enforced by `idx_relationships_active_triple`.
//! - Soft delete only; rows are never removed.

use super::{map_unique_violation, uuid_column, RepoError, RepoResult, SqliteRepository};
use crate::model::now_epoch_ms;
use crate::model::person::PersonId;
use crate::model::relationship::{Relationship, RelationshipId, RelationshipTypeId};
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const EDGE_COLUMNS_SQL: &str = "SELECT
    r.id AS id,
    r.person_id AS person_id,
    r.related_person_id AS related_person_id,
    r.relationship_type_id AS relationship_type_id,
    r.notes AS notes,
    r.created_at AS created_at,
    r.deleted_at AS deleted_at";

const ACTIVE_EDGE_JOINS_SQL: &str = "FROM relationships r
    INNER JOIN people p ON p.id = r.person_id AND p.deleted_at IS NULL
    INNER JOIN people q ON q.id = r.related_person_id AND q.deleted_at IS NULL
    INNER JOIN relationship_types t ON t.id = r.relationship_type_id AND t.deleted_at IS NULL
    WHERE r.deleted_at IS NULL";

/// Edge together with the account that owns its source person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRelationship {
    pub relationship: Relationship,
    pub owner_id: UserId,
}

/// Type (and optional notes) rewrite for one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRetype {
    pub id: RelationshipId,
    pub relationship_type_id: RelationshipTypeId,
    /// `None` keeps the stored notes.
    pub notes: Option<String>,
}

/// Repository interface for relationship edges.
pub trait RelationshipRepository {
    /// Loads one non-deleted edge with its owner, regardless of caller.
    fn find_relationship(&self, id: RelationshipId) -> RepoResult<Option<OwnedRelationship>>;
    /// Non-deleted edge with exactly this `(person, related, type)` triple.
    fn find_edge(
        &self,
        person_id: PersonId,
        related_person_id: PersonId,
        relationship_type_id: RelationshipTypeId,
    ) -> RepoResult<Option<Relationship>>;
    /// Non-deleted edge `related_person_id -> person_id` of any type.
    ///
    /// An edge of `preferred_type_id` wins when several exist; otherwise the
    /// oldest edge is returned.
    fn find_counterpart(
        &self,
        person_id: PersonId,
        related_person_id: PersonId,
        preferred_type_id: Option<RelationshipTypeId>,
    ) -> RepoResult<Option<Relationship>>;
    /// Active outgoing edges of one person in creation order.
    fn list_edges_from(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>>;
    /// Active incoming edges of one person in creation order.
    fn list_edges_to(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>>;
    /// Inserts the forward edge and, when given, its reverse in one
    /// transaction.
    ///
    /// # Errors
    /// - `RepoError::Duplicate` when either row collides with an active edge.
    fn create_pair(&self, forward: &Relationship, reverse: Option<&Relationship>)
        -> RepoResult<()>;
    /// Retypes an edge and, when given, its counterpart in one transaction.
    fn update_pair(&self, forward: &EdgeRetype, counterpart: Option<&EdgeRetype>)
        -> RepoResult<()>;
    /// Tombstones an edge and, when given, its counterpart in one transaction.
    fn soft_delete_pair(
        &self,
        id: RelationshipId,
        counterpart_id: Option<RelationshipId>,
    ) -> RepoResult<()>;
}

impl RelationshipRepository for SqliteRepository<'_> {
    fn find_relationship(&self, id: RelationshipId) -> RepoResult<Option<OwnedRelationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EDGE_COLUMNS_SQL},
                p.owner_id AS owner_id
             FROM relationships r
             INNER JOIN people p ON p.id = r.person_id
             WHERE r.id = ?1
               AND r.deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(OwnedRelationship {
                relationship: parse_edge_row(row)?,
                owner_id: uuid_column(row, "owner_id")?,
            }));
        }
        Ok(None)
    }

    fn find_edge(
        &self,
        person_id: PersonId,
        related_person_id: PersonId,
        relationship_type_id: RelationshipTypeId,
    ) -> RepoResult<Option<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EDGE_COLUMNS_SQL}
             FROM relationships r
             WHERE r.person_id = ?1
               AND r.related_person_id = ?2
               AND r.relationship_type_id = ?3
               AND r.deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query([
            person_id.to_string(),
            related_person_id.to_string(),
            relationship_type_id.to_string(),
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_edge_row(row)?));
        }
        Ok(None)
    }

    fn find_counterpart(
        &self,
        person_id: PersonId,
        related_person_id: PersonId,
        preferred_type_id: Option<RelationshipTypeId>,
    ) -> RepoResult<Option<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EDGE_COLUMNS_SQL}
             FROM relationships r
             WHERE r.person_id = ?1
               AND r.related_person_id = ?2
               AND r.deleted_at IS NULL
             ORDER BY (r.relationship_type_id = ?3) DESC, r.created_at ASC, r.rowid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![
            related_person_id.to_string(),
            person_id.to_string(),
            preferred_type_id.map(|value| value.to_string()),
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_edge_row(row)?));
        }
        Ok(None)
    }

    fn list_edges_from(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>> {
        list_active_edges(self.conn, "r.person_id", person_id)
    }

    fn list_edges_to(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>> {
        list_active_edges(self.conn, "r.related_person_id", person_id)
    }

    fn create_pair(
        &self,
        forward: &Relationship,
        reverse: Option<&Relationship>,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_edge(&tx, forward)?;
        if let Some(reverse) = reverse {
            insert_edge(&tx, reverse)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_pair(
        &self,
        forward: &EdgeRetype,
        counterpart: Option<&EdgeRetype>,
    ) -> RepoResult<()> {
        let updated_at = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        retype_edge(&tx, forward, updated_at)?;
        if let Some(counterpart) = counterpart {
            retype_edge(&tx, counterpart, updated_at)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn soft_delete_pair(
        &self,
        id: RelationshipId,
        counterpart_id: Option<RelationshipId>,
    ) -> RepoResult<()> {
        let deleted_at = now_epoch_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tombstone_edge(&tx, id, deleted_at)?;
        if let Some(counterpart_id) = counterpart_id {
            tombstone_edge(&tx, counterpart_id, deleted_at)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn list_active_edges(
    conn: &Connection,
    anchor_column: &'static str,
    person_id: PersonId,
) -> RepoResult<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "{EDGE_COLUMNS_SQL}
         {ACTIVE_EDGE_JOINS_SQL}
           AND {anchor_column} = ?1
         ORDER BY r.created_at ASC, r.rowid ASC;"
    ))?;
    let mut rows = stmt.query([person_id.to_string()])?;
    let mut edges = Vec::new();
    while let Some(row) = rows.next()? {
        edges.push(parse_edge_row(row)?);
    }
    Ok(edges)
}

fn insert_edge(conn: &Connection, edge: &Relationship) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO relationships (
            id,
            person_id,
            related_person_id,
            relationship_type_id,
            notes,
            created_at,
            updated_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, NULL);",
        params![
            edge.id.to_string(),
            edge.person_id.to_string(),
            edge.related_person_id.to_string(),
            edge.relationship_type_id.to_string(),
            edge.notes.as_deref(),
            edge.created_at,
        ],
    )
    .map_err(|err| map_unique_violation(err, "relationship"))?;
    Ok(())
}

fn retype_edge(conn: &Connection, retype: &EdgeRetype, updated_at: i64) -> RepoResult<()> {
    let changed = conn
        .execute(
            "UPDATE relationships
             SET relationship_type_id = ?2,
                 notes = COALESCE(?3, notes),
                 updated_at = ?4
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![
                retype.id.to_string(),
                retype.relationship_type_id.to_string(),
                retype.notes.as_deref(),
                updated_at,
            ],
        )
        .map_err(|err| map_unique_violation(err, "relationship"))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "relationship",
            id: retype.id,
        });
    }
    Ok(())
}

fn tombstone_edge(conn: &Connection, id: RelationshipId, deleted_at: i64) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE relationships
         SET deleted_at = ?2,
             updated_at = ?2
         WHERE id = ?1
           AND deleted_at IS NULL;",
        params![id.to_string(), deleted_at],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "relationship",
            id,
        });
    }
    Ok(())
}

fn parse_edge_row(row: &Row<'_>) -> RepoResult<Relationship> {
    Ok(Relationship {
        id: uuid_column(row, "id")?,
        person_id: uuid_column(row, "person_id")?,
        related_person_id: uuid_column(row, "related_person_id")?,
        relationship_type_id: uuid_column(row, "relationship_type_id")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
