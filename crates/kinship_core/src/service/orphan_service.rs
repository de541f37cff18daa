//! Orphan detection ahead of destructive person deletes.
//!
//! A person is an orphan of a deletion when they are not known to the account
//! owner directly and every one of their relationships leads into the set of
//! people being deleted. Detection is a single pass: people orphaned by the
//! deletion are not re-checked for further orphans.

use crate::model::person::{Person, PersonId, PersonSummary};
use crate::model::relationship::RelationshipTypeId;
use crate::model::user::UserId;
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::relationship_type_repo::RelationshipTypeRepository;
use crate::repo::{RepoError, RepoResult};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which people a bulk delete targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkSelection {
    /// Explicit ids; ids that are unknown, deleted or foreign are ignored.
    People(Vec<PersonId>),
    /// Every active person of the owner.
    All,
}

/// Errors from read-only graph queries (orphans, projections).
#[derive(Debug)]
pub enum GraphQueryError {
    PersonNotFound(PersonId),
    Repo(RepoError),
}

impl Display for GraphQueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphQueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersonNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for GraphQueryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Orphan detector over a storage implementation.
pub struct OrphanService<S> {
    store: S,
}

impl<S> OrphanService<S>
where
    S: PersonRepository + RelationshipTypeRepository + RelationshipRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// People left without relationships if `person_id` is deleted.
    pub fn orphans_for_person(
        &self,
        owner_id: UserId,
        person_id: PersonId,
    ) -> Result<Vec<PersonSummary>, GraphQueryError> {
        orphans_for_person(&self.store, owner_id, person_id)
    }

    /// People left without relationships if the selection is deleted.
    pub fn orphans_for_bulk_delete(
        &self,
        owner_id: UserId,
        selection: &BulkSelection,
    ) -> Result<Vec<PersonSummary>, GraphQueryError> {
        Ok(orphans_for_bulk_delete(&self.store, owner_id, selection)?.orphans)
    }
}

/// Resolved bulk selection plus the orphans it would create.
pub(crate) struct BulkOrphans {
    pub targets: Vec<PersonId>,
    pub orphans: Vec<PersonSummary>,
}

pub(crate) fn orphans_for_person<S>(
    store: &S,
    owner_id: UserId,
    person_id: PersonId,
) -> Result<Vec<PersonSummary>, GraphQueryError>
where
    S: PersonRepository + RelationshipTypeRepository + RelationshipRepository,
{
    store
        .find_person(person_id, owner_id)?
        .ok_or(GraphQueryError::PersonNotFound(person_id))?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let neighbor_ids = store
        .list_edges_from(person_id)?
        .into_iter()
        .map(|edge| edge.related_person_id)
        .chain(
            store
                .list_edges_to(person_id)?
                .into_iter()
                .map(|edge| edge.person_id),
        );
    for neighbor_id in neighbor_ids {
        if neighbor_id == person_id || !seen.insert(neighbor_id) {
            continue;
        }
        if let Some(neighbor) = store.find_person(neighbor_id, owner_id)? {
            candidates.push(neighbor);
        }
    }

    let targets = HashSet::from([person_id]);
    let orphans = find_orphans(store, owner_id, &candidates, &targets, false)?;
    debug!(
        "event=orphans_single module=orphan status=ok candidates={} orphans={}",
        candidates.len(),
        orphans.len()
    );
    Ok(orphans)
}

pub(crate) fn orphans_for_bulk_delete<S>(
    store: &S,
    owner_id: UserId,
    selection: &BulkSelection,
) -> RepoResult<BulkOrphans>
where
    S: PersonRepository + RelationshipTypeRepository + RelationshipRepository,
{
    let people = store.list_people(owner_id)?;
    let targets: Vec<PersonId> = match selection {
        BulkSelection::All => people.iter().map(|person| person.id).collect(),
        BulkSelection::People(ids) => {
            let requested: HashSet<PersonId> = ids.iter().copied().collect();
            people
                .iter()
                .map(|person| person.id)
                .filter(|id| requested.contains(id))
                .collect()
        }
    };
    if targets.is_empty() {
        return Ok(BulkOrphans {
            targets,
            orphans: Vec::new(),
        });
    }

    let target_set: HashSet<PersonId> = targets.iter().copied().collect();
    let candidates: Vec<Person> = people
        .into_iter()
        .filter(|person| !target_set.contains(&person.id))
        .collect();
    let orphans = find_orphans(store, owner_id, &candidates, &target_set, true)?;
    debug!(
        "event=orphans_bulk module=orphan status=ok targets={} candidates={} orphans={}",
        targets.len(),
        candidates.len(),
        orphans.len()
    );
    Ok(BulkOrphans { targets, orphans })
}

/// Shared orphan predicate for single and bulk deletes.
///
/// A candidate `Q` is reported when `Q` is not a target, has no direct
/// relationship to the account owner through an active type, (when `require_target_link`) has at
/// least one edge into `targets`, and has no edge left once edges into
/// `targets` are discarded. Each candidate's full adjacency is fetched.
pub(crate) fn find_orphans<S>(
    store: &S,
    owner_id: UserId,
    candidates: &[Person],
    targets: &HashSet<PersonId>,
    require_target_link: bool,
) -> RepoResult<Vec<PersonSummary>>
where
    S: RelationshipTypeRepository + RelationshipRepository,
{
    let mut active_types: HashMap<RelationshipTypeId, bool> = HashMap::new();
    let mut orphans = Vec::new();
    for candidate in candidates {
        if targets.contains(&candidate.id) {
            continue;
        }
        if let Some(type_id) = candidate.relationship_to_user_id {
            let active = match active_types.get(&type_id) {
                Some(active) => *active,
                None => {
                    let active = store.find_relationship_type(type_id, owner_id)?.is_some();
                    active_types.insert(type_id, active);
                    active
                }
            };
            if active {
                continue;
            }
        }

        let mut edges = store.list_edges_from(candidate.id)?;
        edges.extend(store.list_edges_to(candidate.id)?);

        let mut linked_to_target = false;
        let mut remaining = 0usize;
        for edge in &edges {
            if targets.contains(&edge.other_end(candidate.id)) {
                linked_to_target = true;
            } else {
                remaining += 1;
            }
        }

        if require_target_link && !linked_to_target {
            continue;
        }
        if remaining == 0 {
            orphans.push(candidate.summary());
        }
    }
    Ok(orphans)
}
