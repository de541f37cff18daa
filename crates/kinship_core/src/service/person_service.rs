//! Person lifecycle use-cases.
//!
//! # Responsibility
//! - Create people and manage their direct relationship to the account owner.
//! - Soft-delete people one at a time or in bulk, optionally sweeping the
//!   orphans the deletion would leave behind.
//! - Restore tombstoned people inside the retention window.
//! - Manage group membership used to tint graph nodes.
//!
//! # Invariants
//! - Deletion only sets tombstones; edges of deleted people disappear from
//!   reads because edge queries require active endpoints.
//! - Orphans are computed before anything is written.

use super::orphan_service::{self, BulkSelection, GraphQueryError};
use crate::model::group::{Group, GroupId};
use crate::model::now_epoch_ms;
use crate::model::person::{Person, PersonId, PersonSummary};
use crate::model::relationship::RelationshipTypeId;
use crate::model::user::UserId;
use crate::model::validation::{normalize_color, optional_text, require_text, ValidationError};
use crate::repo::group_repo::GroupRepository;
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::relationship_type_repo::RelationshipTypeRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of days a deleted person stays restorable.
pub const DEFAULT_RESTORE_WINDOW_DAYS: u32 = 30;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Errors from person use-cases.
#[derive(Debug)]
pub enum PersonServiceError {
    Validation(ValidationError),
    PersonNotFound(PersonId),
    RelationshipTypeNotFound(RelationshipTypeId),
    GroupNotFound(GroupId),
    /// Person was deleted longer ago than the retention window allows.
    RestoreWindowExpired {
        person_id: PersonId,
        deleted_at: i64,
        window_days: u32,
    },
    Repo(RepoError),
}

impl Display for PersonServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::RelationshipTypeNotFound(id) => write!(f, "relationship type not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::RestoreWindowExpired {
                person_id,
                window_days,
                ..
            } => write!(
                f,
                "person {person_id} was deleted more than {window_days} days ago and can no longer be restored"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersonServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for PersonServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for PersonServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "person",
                id,
            } => Self::PersonNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<GraphQueryError> for PersonServiceError {
    fn from(value: GraphQueryError) -> Self {
        match value {
            GraphQueryError::PersonNotFound(id) => Self::PersonNotFound(id),
            GraphQueryError::Repo(err) => Self::Repo(err),
        }
    }
}

/// Input for `PersonService::create_person`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePersonRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub relationship_to_user_id: Option<RelationshipTypeId>,
}

/// What a delete call tombstoned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletePeopleOutcome {
    /// Requested people that were deleted.
    pub deleted: Vec<PersonId>,
    /// Orphans deleted alongside them (empty unless requested).
    pub orphans_deleted: Vec<PersonSummary>,
}

/// Person use-case service over a storage implementation.
pub struct PersonService<S> {
    store: S,
    restore_window_days: u32,
}

impl<S> PersonService<S>
where
    S: PersonRepository + RelationshipTypeRepository + RelationshipRepository + GroupRepository,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            restore_window_days: DEFAULT_RESTORE_WINDOW_DAYS,
        }
    }

    pub fn with_restore_window_days(mut self, days: u32) -> Self {
        self.restore_window_days = days;
        self
    }

    pub fn create_person(
        &self,
        owner_id: UserId,
        request: &CreatePersonRequest,
    ) -> Result<Person, PersonServiceError> {
        let mut person = Person::new(
            owner_id,
            &request.first_name,
            request.last_name.as_deref(),
        )?;
        person.nickname = optional_text(request.nickname.as_deref());
        if let Some(type_id) = request.relationship_to_user_id {
            self.require_type(owner_id, type_id)?;
            person.relationship_to_user_id = Some(type_id);
        }

        self.store.create_person(&person)?;
        info!(
            "event=person_create module=person status=ok person_id={} knows_user={}",
            person.id,
            person.knows_user()
        );
        Ok(person)
    }

    pub fn get_person(
        &self,
        owner_id: UserId,
        person_id: PersonId,
    ) -> Result<Person, PersonServiceError> {
        self.store
            .find_person(person_id, owner_id)?
            .ok_or(PersonServiceError::PersonNotFound(person_id))
    }

    pub fn list_people(&self, owner_id: UserId) -> Result<Vec<Person>, PersonServiceError> {
        Ok(self.store.list_people(owner_id)?)
    }

    pub fn list_deleted_people(&self, owner_id: UserId) -> Result<Vec<Person>, PersonServiceError> {
        Ok(self.store.list_deleted_people(owner_id)?)
    }

    /// Sets or clears the person's direct relationship to the account owner.
    pub fn set_relationship_to_user(
        &self,
        owner_id: UserId,
        person_id: PersonId,
        relationship_type_id: Option<RelationshipTypeId>,
    ) -> Result<Person, PersonServiceError> {
        if let Some(type_id) = relationship_type_id {
            self.require_type(owner_id, type_id)?;
        }
        self.store
            .set_relationship_to_user(person_id, owner_id, relationship_type_id)?;
        self.get_person(owner_id, person_id)
    }

    /// Soft-deletes one person, plus the people it would orphan when
    /// `delete_orphans` is set.
    pub fn delete_person(
        &self,
        owner_id: UserId,
        person_id: PersonId,
        delete_orphans: bool,
    ) -> Result<DeletePeopleOutcome, PersonServiceError> {
        let orphans = if delete_orphans {
            orphan_service::orphans_for_person(&self.store, owner_id, person_id)?
        } else {
            self.get_person(owner_id, person_id)?;
            Vec::new()
        };

        self.tombstone(owner_id, vec![person_id], orphans)
    }

    /// Soft-deletes a selection of people, plus the people the selection
    /// would orphan when `delete_orphans` is set.
    pub fn delete_people(
        &self,
        owner_id: UserId,
        selection: &BulkSelection,
        delete_orphans: bool,
    ) -> Result<DeletePeopleOutcome, PersonServiceError> {
        let resolved = orphan_service::orphans_for_bulk_delete(&self.store, owner_id, selection)?;
        let orphans = if delete_orphans {
            resolved.orphans
        } else {
            Vec::new()
        };
        self.tombstone(owner_id, resolved.targets, orphans)
    }

    /// Clears the tombstone of a person deleted within the retention window.
    ///
    /// Restoring an active person returns it unchanged.
    pub fn restore_person(
        &self,
        owner_id: UserId,
        person_id: PersonId,
    ) -> Result<Person, PersonServiceError> {
        let person = self
            .store
            .get_person(person_id, owner_id, true)?
            .ok_or(PersonServiceError::PersonNotFound(person_id))?;
        let Some(deleted_at) = person.deleted_at else {
            return Ok(person);
        };

        let window_ms = i64::from(self.restore_window_days) * MILLIS_PER_DAY;
        if now_epoch_ms() - deleted_at > window_ms {
            return Err(PersonServiceError::RestoreWindowExpired {
                person_id,
                deleted_at,
                window_days: self.restore_window_days,
            });
        }

        self.store.restore_person(person_id, owner_id)?;
        info!("event=person_restore module=person status=ok person_id={person_id}");
        self.get_person(owner_id, person_id)
    }

    pub fn create_group(
        &self,
        owner_id: UserId,
        name: &str,
        color: Option<&str>,
    ) -> Result<Group, PersonServiceError> {
        let group = Group::new(owner_id, require_text("name", name)?, normalize_color(color)?);
        self.store.create_group(&group)?;
        Ok(group)
    }

    pub fn add_to_group(
        &self,
        owner_id: UserId,
        group_id: GroupId,
        person_id: PersonId,
    ) -> Result<(), PersonServiceError> {
        self.require_group(owner_id, group_id)?;
        self.get_person(owner_id, person_id)?;
        Ok(self.store.add_member(group_id, person_id)?)
    }

    pub fn remove_from_group(
        &self,
        owner_id: UserId,
        group_id: GroupId,
        person_id: PersonId,
    ) -> Result<(), PersonServiceError> {
        self.require_group(owner_id, group_id)?;
        self.get_person(owner_id, person_id)?;
        Ok(self.store.remove_member(group_id, person_id)?)
    }

    pub fn list_groups_for_person(
        &self,
        owner_id: UserId,
        person_id: PersonId,
    ) -> Result<Vec<Group>, PersonServiceError> {
        self.get_person(owner_id, person_id)?;
        Ok(self.store.list_groups_for_person(person_id)?)
    }

    fn tombstone(
        &self,
        owner_id: UserId,
        targets: Vec<PersonId>,
        orphans: Vec<PersonSummary>,
    ) -> Result<DeletePeopleOutcome, PersonServiceError> {
        let mut ids = targets.clone();
        ids.extend(orphans.iter().map(|orphan| orphan.id));
        let changed = self.store.soft_delete_many(owner_id, &ids)?;

        info!(
            "event=person_delete module=person status=ok requested={} orphans={} changed={}",
            targets.len(),
            orphans.len(),
            changed
        );
        Ok(DeletePeopleOutcome {
            deleted: targets,
            orphans_deleted: orphans,
        })
    }

    fn require_type(
        &self,
        owner_id: UserId,
        type_id: RelationshipTypeId,
    ) -> Result<(), PersonServiceError> {
        self.store
            .find_relationship_type(type_id, owner_id)?
            .map(|_| ())
            .ok_or(PersonServiceError::RelationshipTypeNotFound(type_id))
    }

    fn require_group(&self, owner_id: UserId, group_id: GroupId) -> Result<(), PersonServiceError> {
        self.store
            .find_group(group_id, owner_id)?
            .map(|_| ())
            .ok_or(PersonServiceError::GroupNotFound(group_id))
    }
}
