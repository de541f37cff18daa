//! Domain model for people, relationship types and relationship edges.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Define the ephemeral graph projection returned to renderers.
//!
//! # Invariants
//! - Every persisted record is identified by a stable UUID.
//! - Deletion is represented by a `deleted_at` tombstone, never a hard delete.

pub mod graph;
pub mod group;
pub mod person;
pub mod relationship;
pub mod user;
pub mod validation;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
