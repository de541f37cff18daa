//! Person groups. Group colors tint graph nodes.

use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = Uuid;

/// Named, optionally colored set of people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    /// Lowercase `#rrggbb` / `#rgb`.
    pub color: Option<String>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl Group {
    pub fn new(owner_id: UserId, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            color,
            created_at: super::now_epoch_ms(),
            deleted_at: None,
        }
    }
}
