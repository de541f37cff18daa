use kinship_core::db::open_db_in_memory;
use kinship_core::{
    CreateRelationshipTypeRequest, InverseLink, RelationshipType, RelationshipTypeError,
    RelationshipTypeService, SqliteRepository, UpdateRelationshipTypeRequest, User, UserId,
    UserRepository, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> (Connection, UserId) {
    let conn = open_db_in_memory().unwrap();
    let owner = SqliteRepository::try_new(&conn)
        .unwrap()
        .create_user(&User::new("Ada"))
        .unwrap();
    (conn, owner)
}

fn service(conn: &Connection) -> RelationshipTypeService<SqliteRepository<'_>> {
    RelationshipTypeService::new(SqliteRepository::try_new(conn).unwrap())
}

fn named<'a>(types: &'a [RelationshipType], name: &str) -> &'a RelationshipType {
    types.iter().find(|kind| kind.name == name).unwrap()
}

fn create(
    service: &RelationshipTypeService<SqliteRepository<'_>>,
    owner: UserId,
    name: &str,
    inverse: InverseLink,
) -> Result<RelationshipType, RelationshipTypeError> {
    service.create_type(
        owner,
        &CreateRelationshipTypeRequest {
            name: name.to_string(),
            color: None,
            inverse,
        },
    )
}

#[test]
fn seed_creates_linked_starter_vocabulary_once() {
    let (conn, owner) = setup();
    let service = service(&conn);

    let seeded = service.seed_default_types(owner).unwrap();

    let names: Vec<_> = seeded.iter().map(|kind| kind.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Parent",
            "Child",
            "Grandparent",
            "Grandchild",
            "Sibling",
            "Partner",
            "Friend",
            "Colleague"
        ]
    );
    let parent = named(&seeded, "Parent");
    let child = named(&seeded, "Child");
    assert_eq!(parent.inverse_id, Some(child.id));
    assert_eq!(child.inverse_id, Some(parent.id));
    assert!(named(&seeded, "Friend").is_symmetric());
    assert_eq!(named(&seeded, "Sibling").color.as_deref(), Some("#8b5cf6"));

    let again = service.seed_default_types(owner).unwrap();
    assert_eq!(again, seeded);
}

#[test]
fn existing_inverse_is_linked_both_ways() {
    let (conn, owner) = setup();
    let service = service(&conn);
    let mentor = create(&service, owner, "Mentor", InverseLink::None).unwrap();
    assert!(mentor.inverse_id.is_none());
    assert_eq!(mentor.resolved_inverse_id(), mentor.id);

    let mentee = create(&service, owner, "Mentee", InverseLink::Existing(mentor.id)).unwrap();

    assert_eq!(mentee.inverse_id, Some(mentor.id));
    assert_eq!(
        service.get_type(owner, mentor.id).unwrap().inverse_id,
        Some(mentee.id)
    );
}

#[test]
fn unknown_or_foreign_inverse_is_rejected() {
    let (conn, owner) = setup();
    let other = SqliteRepository::try_new(&conn)
        .unwrap()
        .create_user(&User::new("Grace"))
        .unwrap();
    let service = service(&conn);
    let foreign = create(&service, other, "Mentor", InverseLink::None).unwrap();

    let err = create(&service, owner, "Mentee", InverseLink::Existing(foreign.id)).unwrap_err();

    assert!(matches!(err, RelationshipTypeError::InverseNotFound(id) if id == foreign.id));
    assert!(service.list_types(owner).unwrap().is_empty());
}

#[test]
fn create_validates_name_and_color() {
    let (conn, owner) = setup();
    let service = service(&conn);

    let err = create(&service, owner, "   ", InverseLink::None).unwrap_err();
    assert!(matches!(
        err,
        RelationshipTypeError::Validation(ValidationError::BlankField("name"))
    ));

    let err = service
        .create_type(
            owner,
            &CreateRelationshipTypeRequest {
                name: "Friend".to_string(),
                color: Some("green".to_string()),
                inverse: InverseLink::SelfInverse,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RelationshipTypeError::Validation(ValidationError::InvalidColor(_))
    ));
}

#[test]
fn update_changes_name_and_color() {
    let (conn, owner) = setup();
    let service = service(&conn);
    let (parent, _) = service
        .create_type_pair(owner, "Parent", "Child", Some("#F59E0B"))
        .unwrap();
    assert_eq!(parent.color.as_deref(), Some("#f59e0b"));

    let renamed = service
        .update_type(
            owner,
            parent.id,
            &UpdateRelationshipTypeRequest {
                name: Some("Mother".to_string()),
                color: None,
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Mother");
    assert_eq!(renamed.color.as_deref(), Some("#f59e0b"));

    let cleared = service
        .update_type(
            owner,
            parent.id,
            &UpdateRelationshipTypeRequest {
                name: None,
                color: Some(None),
            },
        )
        .unwrap();
    assert!(cleared.color.is_none());
    assert_eq!(service.get_type(owner, parent.id).unwrap(), cleared);
}

#[test]
fn delete_unlinks_partner_and_hides_type() {
    let (conn, owner) = setup();
    let service = service(&conn);
    let (parent, child) = service
        .create_type_pair(owner, "Parent", "Child", None)
        .unwrap();

    service.delete_type(owner, child.id).unwrap();

    let parent = service.get_type(owner, parent.id).unwrap();
    assert!(parent.inverse_id.is_none());
    assert_eq!(parent.resolved_inverse_id(), parent.id);
    assert!(matches!(
        service.get_type(owner, child.id),
        Err(RelationshipTypeError::TypeNotFound(id)) if id == child.id
    ));
    assert!(matches!(
        service.delete_type(owner, child.id),
        Err(RelationshipTypeError::TypeNotFound(_))
    ));
    assert_eq!(service.list_types(owner).unwrap().len(), 1);

    let stamps = |id: Uuid| -> (Option<i64>, i64) {
        conn.query_row(
            "SELECT deleted_at, updated_at FROM relationship_types WHERE id = ?1;",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    };
    let (child_deleted_at, child_updated_at) = stamps(child.id);
    let (_, parent_updated_at) = stamps(parent.id);
    assert_eq!(child_deleted_at, Some(child_updated_at));
    assert_eq!(parent_updated_at, child_updated_at);
}

#[test]
fn types_are_scoped_to_their_owner() {
    let (conn, owner) = setup();
    let other = SqliteRepository::try_new(&conn)
        .unwrap()
        .create_user(&User::new("Grace"))
        .unwrap();
    let service = service(&conn);
    service.seed_default_types(owner).unwrap();

    assert!(service.list_types(other).unwrap().is_empty());
    let missing = Uuid::new_v4();
    assert!(matches!(
        service.get_type(other, missing),
        Err(RelationshipTypeError::TypeNotFound(id)) if id == missing
    ));
}
