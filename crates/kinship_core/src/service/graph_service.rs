//! Person-centric graph projection.
//!
//! # Responsibility
//! - Turn one person's relationship edges into a `{nodes, edges}` model for
//!   force-directed rendering.
//!
//! # Invariants
//! - Read-only: building a graph never writes.
//! - Nodes are unique by id; edges are unique by `"source-target"` with
//!   last-write-wins and the first insertion position kept.
//! - Only the center, the account owner node and the center's direct
//!   relations become nodes; edges leaving that set are dropped.

use super::orphan_service::GraphQueryError;
use crate::model::graph::{GraphEdge, GraphNode, PersonGraph};
use crate::model::person::{Person, PersonId};
use crate::model::relationship::{RelationshipType, RelationshipTypeId};
use crate::model::user::UserId;
use crate::repo::group_repo::GroupRepository;
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::relationship_type_repo::RelationshipTypeRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

/// Node id of the synthetic account-owner node.
pub const USER_NODE_ID: &str = "user";
const USER_NODE_FALLBACK_LABEL: &str = "You";

/// Graph projector over a storage implementation.
pub struct GraphService<S> {
    store: S,
}

impl<S> GraphService<S>
where
    S: PersonRepository
        + RelationshipTypeRepository
        + RelationshipRepository
        + GroupRepository
        + UserRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Builds the 1.5-hop graph around `center_id` as seen by `viewer_id`.
    ///
    /// # Errors
    /// - `PersonNotFound` when the center is missing, deleted or foreign.
    pub fn person_graph(
        &self,
        viewer_id: UserId,
        center_id: PersonId,
    ) -> Result<PersonGraph, GraphQueryError> {
        let center = self
            .store
            .find_person(center_id, viewer_id)?
            .ok_or(GraphQueryError::PersonNotFound(center_id))?;

        let mut builder = GraphBuilder::new(&self.store, viewer_id);
        builder.add_person_node(&center, true)?;
        let user_label = self
            .store
            .get_user(viewer_id)?
            .map_or_else(|| USER_NODE_FALLBACK_LABEL.to_string(), |user| user.display_name);
        builder.add_user_node(user_label);
        builder.link_to_user(&center)?;

        let center_edges = self.store.list_edges_from(center.id)?;
        let mut related_people = Vec::new();
        for edge in &center_edges {
            let related_key = edge.related_person_id.to_string();
            if builder.has_node(&related_key) {
                continue;
            }
            let Some(related) = self.store.find_person(edge.related_person_id, viewer_id)? else {
                continue;
            };
            builder.add_person_node(&related, false)?;
            builder.link_to_user(&related)?;
            related_people.push(related);
        }

        let center_key = center.id.to_string();
        for edge in &center_edges {
            let related_key = edge.related_person_id.to_string();
            if !builder.has_node(&related_key) {
                continue;
            }
            let Some(relationship_type) = builder.relationship_type(edge.relationship_type_id)?
            else {
                continue;
            };
            builder.add_edge(&center_key, &related_key, &relationship_type);
            if let Some(inverse_id) = relationship_type.inverse_id {
                if let Some(inverse) = builder.relationship_type(inverse_id)? {
                    builder.add_edge(&related_key, &center_key, &inverse);
                }
            }
        }

        for related in &related_people {
            let source_key = related.id.to_string();
            for edge in self.store.list_edges_from(related.id)? {
                if edge.related_person_id == center.id {
                    continue;
                }
                let target_key = edge.related_person_id.to_string();
                if !builder.has_node(&target_key) {
                    continue;
                }
                if let Some(relationship_type) =
                    builder.relationship_type(edge.relationship_type_id)?
                {
                    builder.add_edge(&source_key, &target_key, &relationship_type);
                }
            }
        }

        let graph = builder.finish();
        debug!(
            "event=person_graph module=graph status=ok nodes={} edges={}",
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(graph)
    }
}

struct GraphBuilder<'a, S> {
    store: &'a S,
    owner_id: UserId,
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<String, GraphEdge>,
    types: HashMap<RelationshipTypeId, Option<RelationshipType>>,
}

impl<'a, S> GraphBuilder<'a, S>
where
    S: RelationshipTypeRepository + GroupRepository,
{
    fn new(store: &'a S, owner_id: UserId) -> Self {
        Self {
            store,
            owner_id,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            types: HashMap::new(),
        }
    }

    fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn add_person_node(&mut self, person: &Person, is_center: bool) -> RepoResult<()> {
        let groups = self.store.list_groups_for_person(person.id)?;
        let node = GraphNode {
            id: person.id.to_string(),
            label: person.full_name(),
            colors: groups.iter().filter_map(|group| group.color.clone()).collect(),
            groups: groups.into_iter().map(|group| group.name).collect(),
            is_center,
        };
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn add_user_node(&mut self, label: String) {
        self.nodes.insert(
            USER_NODE_ID.to_string(),
            GraphNode {
                id: USER_NODE_ID.to_string(),
                label,
                groups: Vec::new(),
                colors: Vec::new(),
                is_center: false,
            },
        );
    }

    /// Emits `user -> person` with the person's relationship to the user and
    /// `person -> user` with its inverse, when each type resolves.
    fn link_to_user(&mut self, person: &Person) -> RepoResult<()> {
        let Some(type_id) = person.relationship_to_user_id else {
            return Ok(());
        };
        let Some(relationship_type) = self.relationship_type(type_id)? else {
            return Ok(());
        };
        let person_key = person.id.to_string();
        self.add_edge(USER_NODE_ID, &person_key, &relationship_type);
        if let Some(inverse_id) = relationship_type.inverse_id {
            if let Some(inverse) = self.relationship_type(inverse_id)? {
                self.add_edge(&person_key, USER_NODE_ID, &inverse);
            }
        }
        Ok(())
    }

    fn add_edge(&mut self, source: &str, target: &str, relationship_type: &RelationshipType) {
        let edge = GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind: relationship_type.name.clone(),
            color: relationship_type.color.clone(),
        };
        self.edges.insert(edge.key(), edge);
    }

    /// Active type lookup, cached for the lifetime of one projection.
    fn relationship_type(&mut self, id: RelationshipTypeId) -> RepoResult<Option<RelationshipType>> {
        if let Some(cached) = self.types.get(&id) {
            return Ok(cached.clone());
        }
        let found = self.store.find_relationship_type(id, self.owner_id)?;
        self.types.insert(id, found.clone());
        Ok(found)
    }

    fn finish(self) -> PersonGraph {
        PersonGraph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::graph::GraphEdge;
    use indexmap::IndexMap;

    #[test]
    fn edge_map_keeps_first_position_and_last_value() {
        let mut edges: IndexMap<String, GraphEdge> = IndexMap::new();
        for (source, target, kind) in [("a", "b", "Friend"), ("b", "a", "Friend"), ("a", "b", "Colleague")] {
            let edge = GraphEdge {
                source: source.into(),
                target: target.into(),
                kind: kind.into(),
                color: None,
            };
            edges.insert(edge.key(), edge);
        }

        let kinds: Vec<_> = edges.values().map(|edge| edge.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Colleague", "Friend"]);
        assert_eq!(edges.get_index(0).unwrap().0, "a-b");
    }
}
