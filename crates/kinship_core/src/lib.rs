//! Core domain logic for the kinship contact graph.
//! Relationship pairs, orphan detection and graph projection live here;
//! hosts only wire storage, config and presentation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, KinshipConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::graph::{GraphEdge, GraphNode, PersonGraph};
pub use model::group::{Group, GroupId};
pub use model::person::{Person, PersonId, PersonSummary};
pub use model::relationship::{
    Relationship, RelationshipId, RelationshipType, RelationshipTypeId,
};
pub use model::user::{User, UserId};
pub use model::validation::ValidationError;
pub use repo::group_repo::GroupRepository;
pub use repo::person_repo::PersonRepository;
pub use repo::relationship_repo::RelationshipRepository;
pub use repo::relationship_type_repo::RelationshipTypeRepository;
pub use repo::user_repo::UserRepository;
pub use repo::{RepoError, RepoResult, SqliteRepository};
pub use service::graph_service::{GraphService, USER_NODE_ID};
pub use service::orphan_service::{BulkSelection, GraphQueryError, OrphanService};
pub use service::person_service::{
    CreatePersonRequest, DeletePeopleOutcome, PersonService, PersonServiceError,
};
pub use service::relationship_service::{
    CreateRelationshipRequest, MissingEntity, RelationshipError, RelationshipService,
    UpdateRelationshipRequest,
};
pub use service::relationship_type_service::{
    CreateRelationshipTypeRequest, InverseLink, RelationshipTypeError, RelationshipTypeService,
    UpdateRelationshipTypeRequest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
