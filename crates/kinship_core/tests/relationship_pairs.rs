use kinship_core::db::open_db_in_memory;
use kinship_core::{
    CreatePersonRequest, CreateRelationshipRequest, CreateRelationshipTypeRequest, InverseLink,
    MissingEntity, Person, PersonService, Relationship, RelationshipError, RelationshipService,
    RelationshipType, RelationshipTypeService, SqliteRepository, UpdateRelationshipRequest,
    User, UserId, UserRepository, ValidationError,
};
use rusqlite::Connection;

fn setup() -> (Connection, UserId) {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "Ada");
    (conn, owner)
}

fn create_user(conn: &Connection, name: &str) -> UserId {
    let store = SqliteRepository::try_new(conn).unwrap();
    store.create_user(&User::new(name)).unwrap()
}

fn create_person(conn: &Connection, owner: UserId, first_name: &str) -> Person {
    let service = PersonService::new(SqliteRepository::try_new(conn).unwrap());
    service
        .create_person(
            owner,
            &CreatePersonRequest {
                first_name: first_name.to_string(),
                ..CreatePersonRequest::default()
            },
        )
        .unwrap()
}

fn create_type(
    conn: &Connection,
    owner: UserId,
    name: &str,
    inverse: InverseLink,
) -> RelationshipType {
    let service = RelationshipTypeService::new(SqliteRepository::try_new(conn).unwrap());
    service
        .create_type(
            owner,
            &CreateRelationshipTypeRequest {
                name: name.to_string(),
                color: Some("#10b981".to_string()),
                inverse,
            },
        )
        .unwrap()
}

fn create_pair(
    conn: &Connection,
    owner: UserId,
    name: &str,
    inverse_name: &str,
) -> (RelationshipType, RelationshipType) {
    let service = RelationshipTypeService::new(SqliteRepository::try_new(conn).unwrap());
    service
        .create_type_pair(owner, name, inverse_name, Some("#f59e0b"))
        .unwrap()
}

fn request(
    person: &Person,
    related: &Person,
    relationship_type: &RelationshipType,
) -> CreateRelationshipRequest {
    CreateRelationshipRequest {
        person_id: person.id,
        related_person_id: related.id,
        relationship_type_id: relationship_type.id,
        notes: None,
    }
}

fn active_edge_count(conn: &Connection, person: &Person, related: &Person) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM relationships
         WHERE person_id = ?1 AND related_person_id = ?2 AND deleted_at IS NULL;",
        [person.id.to_string(), related.id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn create_writes_reverse_edge_with_inverse_type() {
    let (conn, owner) = setup();
    let (parent, child) = create_pair(&conn, owner, "Parent", "Child");
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    let forward = service
        .create_relationship(
            owner,
            &CreateRelationshipRequest {
                notes: Some("  met at school ".to_string()),
                ..request(&alice, &bob, &parent)
            },
        )
        .unwrap();

    assert_eq!(forward.person_id, alice.id);
    assert_eq!(forward.relationship_type_id, parent.id);
    assert_eq!(forward.notes.as_deref(), Some("met at school"));

    let reverse = service.list_relationships(owner, bob.id).unwrap();
    assert_eq!(reverse.len(), 1);
    assert_eq!(reverse[0].related_person_id, alice.id);
    assert_eq!(reverse[0].relationship_type_id, child.id);
    assert_eq!(reverse[0].notes.as_deref(), Some("met at school"));
}

#[test]
fn symmetric_type_yields_exactly_one_reverse_edge() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();

    assert_eq!(active_edge_count(&conn, &alice, &bob), 1);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 1);
    let reverse = service.list_relationships(owner, bob.id).unwrap();
    assert_eq!(reverse[0].relationship_type_id, friend.id);
}

#[test]
fn unlinked_type_reuses_itself_for_reverse_edge() {
    let (conn, owner) = setup();
    let mentor = create_type(&conn, owner, "Mentor", InverseLink::None);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    service
        .create_relationship(owner, &request(&alice, &bob, &mentor))
        .unwrap();

    let reverse = service.list_relationships(owner, bob.id).unwrap();
    assert_eq!(reverse.len(), 1);
    assert_eq!(reverse[0].relationship_type_id, mentor.id);
}

#[test]
fn existing_reverse_edge_is_not_duplicated() {
    let (conn, owner) = setup();
    let mentor = create_type(&conn, owner, "Mentor", InverseLink::None);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    service
        .create_relationship(owner, &request(&alice, &bob, &mentor))
        .unwrap();

    // Linking Mentee back to Mentor makes the existing alice -> bob edge the
    // reverse of a new bob -> alice Mentee edge.
    let mentee = create_type(&conn, owner, "Mentee", InverseLink::Existing(mentor.id));
    service
        .create_relationship(owner, &request(&bob, &alice, &mentee))
        .unwrap();

    assert_eq!(active_edge_count(&conn, &alice, &bob), 1);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 2);
}

#[test]
fn self_relationship_is_validation_error() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    let err = service
        .create_relationship(owner, &request(&alice, &alice, &friend))
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(matches!(
        err,
        RelationshipError::Validation(ValidationError::SelfRelationship)
    ));
    assert_eq!(active_edge_count(&conn, &alice, &alice), 0);
}

#[test]
fn second_identical_create_is_duplicate() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();
    let err = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap_err();

    assert_eq!(err.code(), "DUPLICATE");
    assert_eq!(active_edge_count(&conn, &alice, &bob), 1);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 1);
}

#[test]
fn create_rejects_foreign_or_deleted_endpoints() {
    let (conn, owner) = setup();
    let other_owner = create_user(&conn, "Grace");
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let stranger = create_person(&conn, other_owner, "Stranger");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    let err = service
        .create_relationship(owner, &request(&alice, &stranger, &friend))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(matches!(
        err,
        RelationshipError::NotFound(MissingEntity::Person(id)) if id == stranger.id
    ));

    let people = PersonService::new(SqliteRepository::try_new(&conn).unwrap());
    let bob = create_person(&conn, owner, "Bob");
    people.delete_person(owner, bob.id, false).unwrap();
    let err = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn create_rejects_deleted_type() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    RelationshipTypeService::new(SqliteRepository::try_new(&conn).unwrap())
        .delete_type(owner, friend.id)
        .unwrap();
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    let err = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap_err();

    assert!(matches!(
        err,
        RelationshipError::NotFound(MissingEntity::RelationshipType(id)) if id == friend.id
    ));
}

#[test]
fn update_retypes_counterpart_to_new_inverse() {
    let (conn, owner) = setup();
    let (parent, child) = create_pair(&conn, owner, "Parent", "Child");
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    let forward = service
        .create_relationship(owner, &request(&alice, &bob, &parent))
        .unwrap();

    let updated = service
        .update_relationship(
            owner,
            forward.id,
            &UpdateRelationshipRequest {
                relationship_type_id: Some(child.id),
                notes: Some("swapped".to_string()),
            },
        )
        .unwrap();

    assert_eq!(updated.relationship_type_id, child.id);
    let outgoing = service.list_relationships(owner, alice.id).unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].relationship_type_id, child.id);
    assert_eq!(outgoing[0].notes.as_deref(), Some("swapped"));
    let incoming = service.list_relationships(owner, bob.id).unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].relationship_type_id, parent.id);
    assert_eq!(incoming[0].notes.as_deref(), Some("swapped"));
}

#[test]
fn update_without_type_is_validation_error() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    let forward = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();

    let err = service
        .update_relationship(owner, forward.id, &UpdateRelationshipRequest::default())
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn edges_of_another_account_are_unauthorized() {
    let (conn, owner) = setup();
    let intruder = create_user(&conn, "Mallory");
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let intruder_type = create_type(&conn, intruder, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    let forward = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();

    let err = service
        .update_relationship(
            intruder,
            forward.id,
            &UpdateRelationshipRequest {
                relationship_type_id: Some(intruder_type.id),
                notes: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED");

    let err = service.delete_relationship(intruder, forward.id).unwrap_err();
    assert!(matches!(err, RelationshipError::Unauthorized(id) if id == forward.id));
    assert_eq!(active_edge_count(&conn, &alice, &bob), 1);
}

#[test]
fn delete_tombstones_both_directions() {
    let (conn, owner) = setup();
    let (parent, _child) = create_pair(&conn, owner, "Parent", "Child");
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    let forward = service
        .create_relationship(owner, &request(&alice, &bob, &parent))
        .unwrap();

    service.delete_relationship(owner, forward.id).unwrap();

    assert_eq!(active_edge_count(&conn, &alice, &bob), 0);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 0);
    let total_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM relationships;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total_rows, 2);

    let mut stmt = conn
        .prepare("SELECT deleted_at, updated_at FROM relationships;")
        .unwrap();
    let stamps: Vec<(i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stamps[0], stamps[1]);
    assert_eq!(stamps[0].0, stamps[0].1);

    let err = service.delete_relationship(owner, forward.id).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn deleted_pair_can_be_created_again() {
    let (conn, owner) = setup();
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    let forward = service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();
    service.delete_relationship(owner, forward.id).unwrap();

    service
        .create_relationship(owner, &request(&alice, &bob, &friend))
        .unwrap();

    assert_eq!(active_edge_count(&conn, &alice, &bob), 1);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 1);
}

/// `alice -> bob` Mentor created while Mentor had no inverse, then Mentee
/// linked back to Mentor. Returns both types and the `alice -> bob` edge.
fn mentorship_relinked_later(
    conn: &Connection,
    owner: UserId,
    alice: &Person,
    bob: &Person,
) -> (RelationshipType, RelationshipType, Relationship) {
    let mentor = create_type(conn, owner, "Mentor", InverseLink::None);
    let service = RelationshipService::new(SqliteRepository::try_new(conn).unwrap());
    let mentoring = service
        .create_relationship(owner, &request(alice, bob, &mentor))
        .unwrap();
    let mentee = create_type(conn, owner, "Mentee", InverseLink::Existing(mentor.id));
    (mentor, mentee, mentoring)
}

#[test]
fn delete_removes_counterpart_typed_with_stale_inverse() {
    let (conn, owner) = setup();
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    // The bob -> alice reverse edge is typed Mentor, not Mentor's current
    // inverse Mentee.
    let (_mentor, _mentee, mentoring) = mentorship_relinked_later(&conn, owner, &alice, &bob);
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());

    service.delete_relationship(owner, mentoring.id).unwrap();

    assert_eq!(active_edge_count(&conn, &alice, &bob), 0);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 0);
}

#[test]
fn delete_prefers_counterpart_typed_with_current_inverse() {
    let (conn, owner) = setup();
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let (mentor, mentee, mentoring) = mentorship_relinked_later(&conn, owner, &alice, &bob);
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    service
        .create_relationship(owner, &request(&bob, &alice, &mentee))
        .unwrap();
    assert_eq!(active_edge_count(&conn, &bob, &alice), 2);

    service.delete_relationship(owner, mentoring.id).unwrap();

    // The older Mentor edge survives; the Mentee edge was the counterpart.
    let remaining = service.list_relationships(owner, bob.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].relationship_type_id, mentor.id);
    assert_eq!(active_edge_count(&conn, &alice, &bob), 0);
}

#[test]
fn update_without_counterpart_does_not_create_one() {
    let (conn, owner) = setup();
    let alice = create_person(&conn, owner, "Alice");
    let bob = create_person(&conn, owner, "Bob");
    let (_mentor, mentee, mentoring) = mentorship_relinked_later(&conn, owner, &alice, &bob);
    let service = RelationshipService::new(SqliteRepository::try_new(&conn).unwrap());
    service
        .create_relationship(owner, &request(&bob, &alice, &mentee))
        .unwrap();
    service.delete_relationship(owner, mentoring.id).unwrap();
    let orphaned = service.list_relationships(owner, bob.id).unwrap().remove(0);
    let friend = create_type(&conn, owner, "Friend", InverseLink::SelfInverse);

    let updated = service
        .update_relationship(
            owner,
            orphaned.id,
            &UpdateRelationshipRequest {
                relationship_type_id: Some(friend.id),
                notes: None,
            },
        )
        .unwrap();

    assert_eq!(updated.relationship_type_id, friend.id);
    assert_eq!(active_edge_count(&conn, &bob, &alice), 1);
    assert_eq!(active_edge_count(&conn, &alice, &bob), 0);
}
