//! Core use-case services.
//!
//! # Responsibility
//! - Enforce relationship graph invariants above the repository layer.
//! - Keep callers (CLI, host transports) decoupled from storage details.

pub mod graph_service;
pub mod orphan_service;
pub mod person_service;
pub mod relationship_service;
pub mod relationship_type_service;
