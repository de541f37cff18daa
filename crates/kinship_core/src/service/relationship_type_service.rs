//! Relationship type registry.
//!
//! # Responsibility
//! - Create, rename, recolor and retire relationship types.
//! - Keep inverse links consistent: linking `A -> B` also links `B -> A`.
//! - Seed a starter vocabulary for new accounts.

use crate::model::relationship::{RelationshipType, RelationshipTypeId};
use crate::model::user::UserId;
use crate::model::validation::{normalize_color, require_text, ValidationError};
use crate::repo::relationship_type_repo::RelationshipTypeRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a new type relates to its reverse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InverseLink {
    /// Not linked yet; reverse edges reuse the type itself.
    None,
    /// Symmetric type ("Friend").
    SelfInverse,
    /// Existing type, which is pointed back at the new one.
    Existing(RelationshipTypeId),
}

/// Errors from the relationship type registry.
#[derive(Debug)]
pub enum RelationshipTypeError {
    Validation(ValidationError),
    TypeNotFound(RelationshipTypeId),
    InverseNotFound(RelationshipTypeId),
    Repo(RepoError),
}

impl Display for RelationshipTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TypeNotFound(id) => write!(f, "relationship type not found: {id}"),
            Self::InverseNotFound(id) => write!(f, "inverse relationship type not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationshipTypeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RelationshipTypeError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for RelationshipTypeError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "relationship type",
                id,
            } => Self::TypeNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for `RelationshipTypeService::create_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRelationshipTypeRequest {
    pub name: String,
    pub color: Option<String>,
    pub inverse: InverseLink,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRelationshipTypeRequest {
    pub name: Option<String>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<String>>,
}

/// One entry of the starter vocabulary.
enum DefaultType {
    Pair(&'static str, &'static str, &'static str),
    Symmetric(&'static str, &'static str),
}

const DEFAULT_TYPES: &[DefaultType] = &[
    DefaultType::Pair("Parent", "Child", "#f59e0b"),
    DefaultType::Pair("Grandparent", "Grandchild", "#d97706"),
    DefaultType::Symmetric("Sibling", "#8b5cf6"),
    DefaultType::Symmetric("Partner", "#ec4899"),
    DefaultType::Symmetric("Friend", "#10b981"),
    DefaultType::Symmetric("Colleague", "#3b82f6"),
];

/// Relationship type registry over a storage implementation.
pub struct RelationshipTypeService<S> {
    store: S,
}

impl<S: RelationshipTypeRepository> RelationshipTypeService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates one type with the requested inverse link.
    ///
    /// # Errors
    /// - `Validation` for a blank name or malformed color.
    /// - `InverseNotFound` when `InverseLink::Existing` names no active type
    ///   of this owner.
    pub fn create_type(
        &self,
        owner_id: UserId,
        request: &CreateRelationshipTypeRequest,
    ) -> Result<RelationshipType, RelationshipTypeError> {
        let name = require_text("name", &request.name)?;
        let color = normalize_color(request.color.as_deref())?;
        let mut relationship_type = RelationshipType::new(owner_id, name, color);

        match request.inverse {
            InverseLink::None => {}
            InverseLink::SelfInverse => relationship_type = relationship_type.symmetric(),
            InverseLink::Existing(inverse_id) => {
                self.store
                    .find_relationship_type(inverse_id, owner_id)?
                    .ok_or(RelationshipTypeError::InverseNotFound(inverse_id))?;
                relationship_type.inverse_id = Some(inverse_id);
            }
        }

        self.store.create_type(&relationship_type)?;
        info!(
            "event=relationship_type_create module=relationship_type status=ok type_id={} symmetric={}",
            relationship_type.id,
            relationship_type.is_symmetric()
        );
        Ok(relationship_type)
    }

    /// Creates two types that are each other's inverse ("Parent"/"Child").
    pub fn create_type_pair(
        &self,
        owner_id: UserId,
        name: &str,
        inverse_name: &str,
        color: Option<&str>,
    ) -> Result<(RelationshipType, RelationshipType), RelationshipTypeError> {
        let color = normalize_color(color)?;
        let mut first = RelationshipType::new(owner_id, require_text("name", name)?, color.clone());
        let mut second =
            RelationshipType::new(owner_id, require_text("inverse_name", inverse_name)?, color);
        first.inverse_id = Some(second.id);
        second.inverse_id = Some(first.id);

        self.store.create_type_pair(&first, &second)?;
        Ok((first, second))
    }

    pub fn get_type(
        &self,
        owner_id: UserId,
        id: RelationshipTypeId,
    ) -> Result<RelationshipType, RelationshipTypeError> {
        self.store
            .find_relationship_type(id, owner_id)?
            .ok_or(RelationshipTypeError::TypeNotFound(id))
    }

    pub fn list_types(&self, owner_id: UserId) -> Result<Vec<RelationshipType>, RelationshipTypeError> {
        Ok(self.store.list_types(owner_id)?)
    }

    pub fn update_type(
        &self,
        owner_id: UserId,
        id: RelationshipTypeId,
        request: &UpdateRelationshipTypeRequest,
    ) -> Result<RelationshipType, RelationshipTypeError> {
        let mut relationship_type = self.get_type(owner_id, id)?;
        if let Some(name) = request.name.as_deref() {
            relationship_type.name = require_text("name", name)?;
        }
        if let Some(color) = request.color.as_ref() {
            relationship_type.color = normalize_color(color.as_deref())?;
        }
        self.store.update_type(&relationship_type)?;
        Ok(relationship_type)
    }

    /// Tombstones a type; types that used it as inverse become unlinked.
    pub fn delete_type(
        &self,
        owner_id: UserId,
        id: RelationshipTypeId,
    ) -> Result<(), RelationshipTypeError> {
        self.store.soft_delete_type(id, owner_id)?;
        info!("event=relationship_type_delete module=relationship_type status=ok type_id={id}");
        Ok(())
    }

    /// Creates the starter vocabulary unless the owner already has types.
    ///
    /// Returns the owner's active types either way.
    pub fn seed_default_types(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<RelationshipType>, RelationshipTypeError> {
        let existing = self.store.list_types(owner_id)?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        for default in DEFAULT_TYPES {
            match default {
                DefaultType::Pair(name, inverse_name, color) => {
                    self.create_type_pair(owner_id, name, inverse_name, Some(color))?;
                }
                DefaultType::Symmetric(name, color) => {
                    self.create_type(
                        owner_id,
                        &CreateRelationshipTypeRequest {
                            name: (*name).to_string(),
                            color: Some((*color).to_string()),
                            inverse: InverseLink::SelfInverse,
                        },
                    )?;
                }
            }
        }

        let seeded = self.store.list_types(owner_id)?;
        info!(
            "event=relationship_type_seed module=relationship_type status=ok count={}",
            seeded.len()
        );
        Ok(seeded)
    }
}
