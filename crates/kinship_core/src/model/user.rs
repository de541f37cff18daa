//! Account owner record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable account identifier. Every person, type and group is owned by one.
pub type UserId = Uuid;

/// Account owner. Rendered as the synthetic "user" node of a person graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub created_at: i64,
}

impl User {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            created_at: super::now_epoch_ms(),
        }
    }
}
