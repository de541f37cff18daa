//! Person: a node in the account owner's network.
//!
//! # Invariants
//! - `first_name` is never blank.
//! - `relationship_to_user_id` describes the direct link to the account owner
//!   and is unrelated to any `Relationship` edge.
//! - `deleted_at` is the source of truth for tombstone state.

use super::relationship::RelationshipTypeId;
use super::user::UserId;
use super::validation::{optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable person identifier.
pub type PersonId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub owner_id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    /// Present when the account owner knows this person directly.
    pub relationship_to_user_id: Option<RelationshipTypeId>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl Person {
    /// Creates an active person with a generated id.
    ///
    /// Name parts are trimmed; a blank first name is rejected.
    pub fn new(
        owner_id: UserId,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            first_name: require_text("first_name", first_name)?,
            last_name: optional_text(last_name),
            nickname: None,
            relationship_to_user_id: None,
            created_at: super::now_epoch_ms(),
            deleted_at: None,
        })
    }

    /// First and last name joined by one space.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether the account owner has a direct relationship to this person.
    pub fn knows_user(&self) -> bool {
        self.relationship_to_user_id.is_some()
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            full_name: self.full_name(),
        }
    }
}

/// `{id, fullName}` pair used by orphan reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: PersonId,
    pub full_name: String,
}
