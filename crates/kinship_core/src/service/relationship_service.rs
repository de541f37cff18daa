//! Relationship pair manager.
//!
//! # Responsibility
//! - Create, retype and delete relationship edges for one account owner.
//! - Keep every forward edge paired with a reverse edge under the inverse
//!   type.
//!
//! # Invariants
//! - Self-edges are rejected before any lookup.
//! - Re-creating an existing reverse edge is skipped, never duplicated.
//! - Forward and reverse writes commit together or not at all.

use crate::model::person::PersonId;
use crate::model::relationship::{Relationship, RelationshipId, RelationshipTypeId};
use crate::model::user::UserId;
use crate::model::validation::{optional_text, ValidationError};
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::{EdgeRetype, RelationshipRepository};
use crate::repo::relationship_type_repo::RelationshipTypeRepository;
use crate::repo::RepoError;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    Person(PersonId),
    RelationshipType(RelationshipTypeId),
    Relationship(RelationshipId),
}

impl Display for MissingEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Person(id) => write!(f, "person {id}"),
            Self::RelationshipType(id) => write!(f, "relationship type {id}"),
            Self::Relationship(id) => write!(f, "relationship {id}"),
        }
    }
}

/// Errors from relationship pair operations.
#[derive(Debug)]
pub enum RelationshipError {
    /// Self-relationship or missing relationship type.
    Validation(ValidationError),
    /// An active edge with the same `(person, related, type)` exists.
    Duplicate {
        person_id: PersonId,
        related_person_id: PersonId,
        relationship_type_id: RelationshipTypeId,
    },
    /// Person, type or edge is missing, deleted or owned by someone else.
    NotFound(MissingEntity),
    /// Edge belongs to another account.
    Unauthorized(RelationshipId),
    Repo(RepoError),
}

impl RelationshipError {
    /// Stable machine-readable code for host transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Repo(_) => "INTERNAL",
        }
    }
}

impl Display for RelationshipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Duplicate {
                person_id,
                related_person_id,
                relationship_type_id,
            } => write!(
                f,
                "relationship already exists: {person_id} -> {related_person_id} ({relationship_type_id})"
            ),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Unauthorized(id) => write!(f, "relationship {id} belongs to another user"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationshipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RelationshipError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for RelationshipError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "relationship",
                id,
            } => Self::NotFound(MissingEntity::Relationship(id)),
            other => Self::Repo(other),
        }
    }
}

/// Input for `RelationshipService::create_relationship`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRelationshipRequest {
    pub person_id: PersonId,
    pub related_person_id: PersonId,
    pub relationship_type_id: RelationshipTypeId,
    pub notes: Option<String>,
}

/// Input for `RelationshipService::update_relationship`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRelationshipRequest {
    /// Required; `None` is rejected as a validation error.
    pub relationship_type_id: Option<RelationshipTypeId>,
    /// Replaces notes on both directions when present.
    pub notes: Option<String>,
}

/// Relationship pair manager over a storage implementation.
pub struct RelationshipService<S> {
    store: S,
}

impl<S> RelationshipService<S>
where
    S: PersonRepository + RelationshipTypeRepository + RelationshipRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a forward edge and, unless it already exists, its reverse.
    ///
    /// The reverse edge uses `type.inverse_id`, falling back to the type
    /// itself. Only the forward edge is returned.
    ///
    /// # Errors
    /// - `Validation` for a self-relationship.
    /// - `NotFound` when either person or the type is missing or foreign.
    /// - `Duplicate` when the forward edge already exists.
    pub fn create_relationship(
        &self,
        owner_id: UserId,
        request: &CreateRelationshipRequest,
    ) -> Result<Relationship, RelationshipError> {
        if request.person_id == request.related_person_id {
            return Err(ValidationError::SelfRelationship.into());
        }

        self.require_person(request.person_id, owner_id)?;
        self.require_person(request.related_person_id, owner_id)?;
        let relationship_type = self
            .store
            .find_relationship_type(request.relationship_type_id, owner_id)?
            .ok_or(RelationshipError::NotFound(MissingEntity::RelationshipType(
                request.relationship_type_id,
            )))?;

        let duplicate = || RelationshipError::Duplicate {
            person_id: request.person_id,
            related_person_id: request.related_person_id,
            relationship_type_id: request.relationship_type_id,
        };

        if self
            .store
            .find_edge(
                request.person_id,
                request.related_person_id,
                request.relationship_type_id,
            )?
            .is_some()
        {
            return Err(duplicate());
        }

        let forward = Relationship::new(
            request.person_id,
            request.related_person_id,
            relationship_type.id,
            optional_text(request.notes.as_deref()),
        )?;

        let inverse_type_id = relationship_type.resolved_inverse_id();
        let reverse = match self.store.find_edge(
            request.related_person_id,
            request.person_id,
            inverse_type_id,
        )? {
            Some(existing) => {
                debug!(
                    "event=relationship_create module=relationship status=reverse_exists relationship_id={}",
                    existing.id
                );
                None
            }
            None => Some(forward.reversed(inverse_type_id)),
        };

        match self.store.create_pair(&forward, reverse.as_ref()) {
            Ok(()) => {}
            Err(RepoError::Duplicate(_)) => {
                warn!(
                    "event=relationship_create module=relationship status=error error_code=duplicate_race person_id={}",
                    request.person_id
                );
                return Err(duplicate());
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "event=relationship_create module=relationship status=ok relationship_id={} reverse_created={}",
            forward.id,
            reverse.is_some()
        );
        Ok(forward)
    }

    /// Retypes an edge and moves its counterpart to the new inverse type.
    ///
    /// A missing counterpart is not created.
    ///
    /// # Errors
    /// - `Validation` when no type is supplied.
    /// - `NotFound` when the edge or the new type does not exist.
    /// - `Unauthorized` when the edge belongs to another account.
    /// - `Duplicate` when the retyped edge collides with an existing one.
    pub fn update_relationship(
        &self,
        owner_id: UserId,
        relationship_id: RelationshipId,
        request: &UpdateRelationshipRequest,
    ) -> Result<Relationship, RelationshipError> {
        let new_type_id = request
            .relationship_type_id
            .ok_or(ValidationError::MissingField("relationship_type_id"))?;
        let mut edge = self.require_owned_edge(owner_id, relationship_id)?;
        let new_type = self
            .store
            .find_relationship_type(new_type_id, owner_id)?
            .ok_or(RelationshipError::NotFound(MissingEntity::RelationshipType(
                new_type_id,
            )))?;

        let notes = optional_text(request.notes.as_deref());
        let counterpart = self.find_counterpart(owner_id, &edge)?;
        let forward_retype = EdgeRetype {
            id: edge.id,
            relationship_type_id: new_type.id,
            notes: notes.clone(),
        };
        let counterpart_retype = counterpart.map(|counterpart| EdgeRetype {
            id: counterpart.id,
            relationship_type_id: new_type.resolved_inverse_id(),
            notes: notes.clone(),
        });

        match self
            .store
            .update_pair(&forward_retype, counterpart_retype.as_ref())
        {
            Ok(()) => {}
            Err(RepoError::Duplicate(_)) => {
                return Err(RelationshipError::Duplicate {
                    person_id: edge.person_id,
                    related_person_id: edge.related_person_id,
                    relationship_type_id: new_type.id,
                });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "event=relationship_update module=relationship status=ok relationship_id={} counterpart_updated={}",
            edge.id,
            counterpart_retype.is_some()
        );

        edge.relationship_type_id = new_type.id;
        if notes.is_some() {
            edge.notes = notes;
        }
        Ok(edge)
    }

    /// Soft-deletes an edge and the counterpart between the same two people.
    ///
    /// # Errors
    /// - `NotFound` when the edge does not exist or is already deleted.
    /// - `Unauthorized` when the edge belongs to another account.
    pub fn delete_relationship(
        &self,
        owner_id: UserId,
        relationship_id: RelationshipId,
    ) -> Result<(), RelationshipError> {
        let edge = self.require_owned_edge(owner_id, relationship_id)?;
        let counterpart = self.find_counterpart(owner_id, &edge)?;

        self.store
            .soft_delete_pair(edge.id, counterpart.as_ref().map(|value| value.id))?;

        info!(
            "event=relationship_delete module=relationship status=ok relationship_id={} counterpart_deleted={}",
            edge.id,
            counterpart.is_some()
        );
        Ok(())
    }

    /// Active outgoing edges of one person.
    pub fn list_relationships(
        &self,
        owner_id: UserId,
        person_id: PersonId,
    ) -> Result<Vec<Relationship>, RelationshipError> {
        self.require_person(person_id, owner_id)?;
        Ok(self.store.list_edges_from(person_id)?)
    }

    fn require_person(&self, id: PersonId, owner_id: UserId) -> Result<(), RelationshipError> {
        self.store
            .find_person(id, owner_id)?
            .map(|_| ())
            .ok_or(RelationshipError::NotFound(MissingEntity::Person(id)))
    }

    fn require_owned_edge(
        &self,
        owner_id: UserId,
        relationship_id: RelationshipId,
    ) -> Result<Relationship, RelationshipError> {
        let owned = self
            .store
            .find_relationship(relationship_id)?
            .ok_or(RelationshipError::NotFound(MissingEntity::Relationship(
                relationship_id,
            )))?;
        if owned.owner_id != owner_id {
            warn!(
                "event=relationship_access module=relationship status=denied relationship_id={relationship_id}"
            );
            return Err(RelationshipError::Unauthorized(relationship_id));
        }
        Ok(owned.relationship)
    }

    /// Reverse edge between the same people, preferring the current inverse
    /// type when several exist.
    fn find_counterpart(
        &self,
        owner_id: UserId,
        edge: &Relationship,
    ) -> Result<Option<Relationship>, RelationshipError> {
        let preferred_type_id = self
            .store
            .find_relationship_type(edge.relationship_type_id, owner_id)?
            .map(|current| current.resolved_inverse_id());
        Ok(self.store.find_counterpart(
            edge.person_id,
            edge.related_person_id,
            preferred_type_id,
        )?)
    }
}
