//! Generic named-resource repository.
//!
//! # Responsibility
//! - Provide CRUD over any table sharing the named resource shape.
//! - Bind the table through `ResourceKind`, never through runtime input.
//!
//! # Invariants
//! - `owner_id` is always the calling principal on insert.
//! - Reads are restricted by `visibility::list_filter`.
//! - Updates/deletes are restricted to `(id, owner or admin)` in SQL.
//! - Lists are ordered `name COLLATE NOCASE ASC, id ASC`.

use crate::db::{ensure_connection_ready, NOW_MS_SQL};
use crate::model::principal::Principal;
use crate::model::resource::{
    normalize_name, normalize_optional_text, NamedResource, NewResource, ResourceId,
    ResourceKind, ResourcePatch,
};
use crate::policy::visibility::list_filter;
use crate::repo::{
    bool_to_int, parse_flag, parse_uuid, unmatched_write, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::marker::PhantomData;
use uuid::Uuid;

const RESOURCE_COLUMNS: &str = "id,
    owner_id,
    name,
    tagline,
    data,
    is_free,
    is_published,
    created_at,
    updated_at";

/// Repository interface for one named resource table.
pub trait ResourceRepository {
    /// Backing table name.
    fn table(&self) -> &'static str;
    /// Lists rows visible to `principal`, ordered by name.
    fn list_resources(&self, principal: &Principal) -> RepoResult<Vec<NamedResource>>;
    /// Inserts one row owned by `principal`.
    fn create_resource(
        &self,
        principal: &Principal,
        input: &NewResource,
    ) -> RepoResult<NamedResource>;
    /// Loads one row if it exists and is visible to `principal`.
    fn get_resource(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> RepoResult<Option<NamedResource>>;
    /// Patches one row the principal may write.
    fn update_resource(
        &self,
        principal: &Principal,
        id: ResourceId,
        patch: &ResourcePatch,
    ) -> RepoResult<NamedResource>;
    /// Deletes one row the principal may write.
    fn delete_resource(&self, principal: &Principal, id: ResourceId) -> RepoResult<()>;
}

/// SQLite-backed repository for the table described by `K`.
pub struct SqliteResourceRepository<'conn, K: ResourceKind> {
    conn: &'conn Connection,
    kind: PhantomData<K>,
}

impl<'conn, K: ResourceKind> SqliteResourceRepository<'conn, K> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[K::TABLE])?;
        Ok(Self {
            conn,
            kind: PhantomData,
        })
    }

    fn load_unscoped(&self, id: &str) -> RepoResult<NamedResource> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM {} WHERE id = ?1;",
            K::TABLE
        ))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_resource_row(row, K::TABLE);
        }
        Err(RepoError::NotFound(id.to_string()))
    }
}

impl<K: ResourceKind> ResourceRepository for SqliteResourceRepository<'_, K> {
    fn table(&self) -> &'static str {
        K::TABLE
    }

    fn list_resources(&self, principal: &Principal) -> RepoResult<Vec<NamedResource>> {
        let (clause, binds) = list_filter(principal).to_sql("");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS}
             FROM {}
             WHERE {clause}
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
            K::TABLE
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_resource_row(row, K::TABLE)?);
        }
        Ok(items)
    }

    fn create_resource(
        &self,
        principal: &Principal,
        input: &NewResource,
    ) -> RepoResult<NamedResource> {
        let name = normalize_name(&input.name)?;
        let tagline = normalize_optional_text(input.tagline.as_deref());
        let data = encode_data(input.data.as_ref())?.unwrap_or_else(|| "{}".to_string());
        let id = Uuid::new_v4().to_string();

        self.conn.execute(
            &format!(
                "INSERT INTO {} (
                    id,
                    owner_id,
                    name,
                    tagline,
                    data,
                    is_free,
                    is_published
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                K::TABLE
            ),
            params![
                id.as_str(),
                principal.id.as_str(),
                name,
                tagline,
                data,
                bool_to_int(input.is_free),
                bool_to_int(input.is_published),
            ],
        )?;

        self.load_unscoped(&id)
    }

    fn get_resource(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> RepoResult<Option<NamedResource>> {
        let (clause, filter_binds) = list_filter(principal).to_sql("");
        let mut binds = vec![Value::Text(id.to_string())];
        binds.extend(filter_binds);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM {} WHERE id = ? AND {clause};",
            K::TABLE
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_resource_row(row, K::TABLE)?));
        }
        Ok(None)
    }

    fn update_resource(
        &self,
        principal: &Principal,
        id: ResourceId,
        patch: &ResourcePatch,
    ) -> RepoResult<NamedResource> {
        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let tagline = normalize_optional_text(patch.tagline.as_deref());
        let data = encode_data(patch.data.as_ref())?;
        let id_text = id.to_string();

        let changed = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET
                    name = COALESCE(?1, name),
                    tagline = CASE WHEN ?2 = 1 THEN ?3 ELSE tagline END,
                    data = COALESCE(?4, data),
                    is_free = COALESCE(?5, is_free),
                    is_published = COALESCE(?6, is_published),
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?7
                   AND (?8 = 1 OR owner_id = ?9);",
                K::TABLE
            ),
            params![
                name,
                bool_to_int(patch.tagline.is_some()),
                tagline,
                data,
                patch.is_free.map(bool_to_int),
                patch.is_published.map(bool_to_int),
                id_text.as_str(),
                bool_to_int(principal.is_admin()),
                principal.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(unmatched_write(self.conn, K::TABLE, &id_text));
        }

        self.load_unscoped(&id_text)
    }

    fn delete_resource(&self, principal: &Principal, id: ResourceId) -> RepoResult<()> {
        let id_text = id.to_string();
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {}
                 WHERE id = ?1
                   AND (?2 = 1 OR owner_id = ?3);",
                K::TABLE
            ),
            params![
                id_text.as_str(),
                bool_to_int(principal.is_admin()),
                principal.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(unmatched_write(self.conn, K::TABLE, &id_text));
        }
        Ok(())
    }
}

fn encode_data(data: Option<&serde_json::Value>) -> RepoResult<Option<String>> {
    data.map(serde_json::to_string)
        .transpose()
        .map_err(|err| RepoError::InvalidData(format!("unencodable data payload: {err}")))
}

fn parse_resource_row(row: &Row<'_>, table: &'static str) -> RepoResult<NamedResource> {
    let id_text: String = row.get("id")?;
    let data_text: String = row.get("data")?;
    let data = serde_json::from_str(&data_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid json in {table}.data for `{id_text}`: {err}"))
    })?;

    Ok(NamedResource {
        id: parse_uuid(&id_text, "id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        tagline: row.get("tagline")?,
        data,
        is_free: parse_flag(row.get("is_free")?, "is_free")?,
        is_published: parse_flag(row.get("is_published")?, "is_published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
