//! Group and membership persistence.

use super::{uuid_column, RepoError, RepoResult, SqliteRepository};
use crate::model::group::{Group, GroupId};
use crate::model::person::PersonId;
use crate::model::user::UserId;
use crate::model::validation::require_text;
use rusqlite::{params, Row};

const GROUP_SELECT_SQL: &str = "SELECT
    g.id AS id,
    g.owner_id AS owner_id,
    g.name AS name,
    g.color AS color,
    g.created_at AS created_at,
    g.deleted_at AS deleted_at
FROM contact_groups g";

/// Repository interface for groups.
pub trait GroupRepository {
    fn create_group(&self, group: &Group) -> RepoResult<GroupId>;
    fn find_group(&self, id: GroupId, owner_id: UserId) -> RepoResult<Option<Group>>;
    /// Adds a membership; adding an existing member is a no-op.
    fn add_member(&self, group_id: GroupId, person_id: PersonId) -> RepoResult<()>;
    fn remove_member(&self, group_id: GroupId, person_id: PersonId) -> RepoResult<()>;
    /// Active groups of one person in membership order.
    fn list_groups_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Group>>;
}

impl GroupRepository for SqliteRepository<'_> {
    fn create_group(&self, group: &Group) -> RepoResult<GroupId> {
        require_text("name", &group.name)?;

        self.conn.execute(
            "INSERT INTO contact_groups (id, owner_id, name, color, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
            params![
                group.id.to_string(),
                group.owner_id.to_string(),
                group.name.as_str(),
                group.color.as_deref(),
                group.created_at,
            ],
        )?;
        Ok(group.id)
    }

    fn find_group(&self, id: GroupId, owner_id: UserId) -> RepoResult<Option<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE g.id = ?1
               AND g.owner_id = ?2
               AND g.deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query([id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }
        Ok(None)
    }

    fn add_member(&self, group_id: GroupId, person_id: PersonId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO group_members (person_id, group_id) VALUES (?1, ?2);",
            params![person_id.to_string(), group_id.to_string()],
        )?;
        Ok(())
    }

    fn remove_member(&self, group_id: GroupId, person_id: PersonId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM group_members WHERE person_id = ?1 AND group_id = ?2;",
            params![person_id.to_string(), group_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "group membership",
                id: person_id,
            });
        }
        Ok(())
    }

    fn list_groups_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             INNER JOIN group_members m ON m.group_id = g.id
             WHERE m.person_id = ?1
               AND g.deleted_at IS NULL
             ORDER BY m.created_at ASC, m.rowid ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    Ok(Group {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
