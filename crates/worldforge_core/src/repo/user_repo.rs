//! Principal (user + role) repository.
//!
//! # Invariants
//! - Role strings in storage are always parseable by `Role::parse`.
//! - Role changes refresh `updated_at`.

use crate::db::{ensure_connection_ready, NOW_MS_SQL};
use crate::model::principal::{Principal, Role};
use crate::model::resource::ValidationError;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for principals.
pub trait UserRepository {
    fn get_user(&self, id: &str) -> RepoResult<Option<Principal>>;
    fn create_user(&self, id: &str, role: Role) -> RepoResult<Principal>;
    fn set_role(&self, id: &str, role: Role) -> RepoResult<Principal>;
    fn list_users(&self) -> RepoResult<Vec<Principal>>;
}

/// SQLite-backed principal repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get_user(&self, id: &str) -> RepoResult<Option<Principal>> {
        self.conn
            .query_row(
                "SELECT id, role FROM users WHERE id = ?1;",
                [id],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_user(&self, id: &str, role: Role) -> RepoResult<Principal> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RepoError::Validation(ValidationError::BlankField("id")));
        }
        self.conn.execute(
            "INSERT INTO users (id, role) VALUES (?1, ?2);",
            params![id, role.as_str()],
        )?;
        Ok(Principal::new(id, role))
    }

    fn set_role(&self, id: &str, role: Role) -> RepoResult<Principal> {
        let changed = self.conn.execute(
            &format!("UPDATE users SET role = ?2, updated_at = {NOW_MS_SQL} WHERE id = ?1;"),
            params![id, role.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(Principal::new(id, role))
    }

    fn list_users(&self) -> RepoResult<Vec<Principal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, role FROM users ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<Principal> {
    let id: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;
    Ok(Principal { id, role })
}
