//! Relationship types and directed relationship edges.
//!
//! # Invariants
//! - Every active forward edge `(A -> B, T)` has an active reverse edge
//!   `(B -> A, inverse(T))`. Kept by the relationship service, not by SQL.
//! - No two active edges share `(person_id, related_person_id, type)`.
//! - `person_id != related_person_id`.
//! - A symmetric type has `inverse_id == Some(id)`.

use super::person::PersonId;
use super::user::UserId;
use super::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RelationshipTypeId = Uuid;
pub type RelationshipId = Uuid;

/// Named, colored relationship label with its designated inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: RelationshipTypeId,
    pub owner_id: UserId,
    pub name: String,
    pub color: Option<String>,
    /// Type used for the reverse direction. `None` until linked.
    pub inverse_id: Option<RelationshipTypeId>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl RelationshipType {
    pub fn new(owner_id: UserId, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            color,
            inverse_id: None,
            created_at: super::now_epoch_ms(),
            deleted_at: None,
        }
    }

    /// Marks this type as its own inverse ("Friend", "Sibling").
    pub fn symmetric(mut self) -> Self {
        self.inverse_id = Some(self.id);
        self
    }

    pub fn is_symmetric(&self) -> bool {
        self.inverse_id == Some(self.id)
    }

    /// Inverse used when writing reverse edges; unlinked types invert to
    /// themselves.
    pub fn resolved_inverse_id(&self) -> RelationshipTypeId {
        self.inverse_id.unwrap_or(self.id)
    }
}

/// Directed relationship edge `person -> related_person` of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub person_id: PersonId,
    pub related_person_id: PersonId,
    pub relationship_type_id: RelationshipTypeId,
    pub notes: Option<String>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl Relationship {
    /// Builds a new active edge, rejecting self-edges.
    pub fn new(
        person_id: PersonId,
        related_person_id: PersonId,
        relationship_type_id: RelationshipTypeId,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        if person_id == related_person_id {
            return Err(ValidationError::SelfRelationship);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            person_id,
            related_person_id,
            relationship_type_id,
            notes,
            created_at: super::now_epoch_ms(),
            deleted_at: None,
        })
    }

    /// Reverse edge `related_person -> person` under `inverse_type_id`.
    pub fn reversed(&self, inverse_type_id: RelationshipTypeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            person_id: self.related_person_id,
            related_person_id: self.person_id,
            relationship_type_id: inverse_type_id,
            notes: self.notes.clone(),
            created_at: self.created_at,
            deleted_at: None,
        }
    }

    /// The endpoint that is not `person`.
    pub fn other_end(&self, person: PersonId) -> PersonId {
        if self.person_id == person {
            self.related_person_id
        } else {
            self.person_id
        }
    }
}
