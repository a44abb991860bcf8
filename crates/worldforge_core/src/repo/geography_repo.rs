//! Geography repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist hierarchical geography entries on the named resource shape.
//! - Expose the unscoped parent lookup the service needs for ancestor walks.
//!
//! # Invariants
//! - Scoped reads/writes follow the same visibility rules as every other
//!   named resource table.
//! - Deleting an entry detaches its children (`parent_id` becomes NULL).
//! - Hierarchy legality is checked by the service before any write here.

use crate::db::{ensure_connection_ready, NOW_MS_SQL};
use crate::model::geography::{Geography, GeographyDetails, NewGeography, Scale};
use crate::model::principal::Principal;
use crate::model::resource::{normalize_name, normalize_optional_text, ResourceId};
use crate::policy::visibility::list_filter;
use crate::repo::{
    bool_to_int, parse_flag, parse_uuid, unmatched_write, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const GEOGRAPHY_TABLE: &str = "geographies";

const GEOGRAPHY_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    tagline,
    data,
    scale,
    scale_other,
    parent_id,
    is_free,
    is_published,
    created_at,
    updated_at
FROM geographies";

/// Repository interface for geography entries.
pub trait GeographyRepository {
    /// Lists entries visible to `principal`, ordered by name.
    fn list_geographies(&self, principal: &Principal) -> RepoResult<Vec<Geography>>;
    /// Inserts one entry owned by `principal`.
    fn create_geography(
        &self,
        principal: &Principal,
        input: &NewGeography,
    ) -> RepoResult<Geography>;
    /// Loads one entry visible to `principal`.
    fn get_geography(&self, principal: &Principal, id: ResourceId)
        -> RepoResult<Option<Geography>>;
    /// Loads one entry regardless of visibility. Internal checks only.
    fn find_geography_unscoped(&self, id: ResourceId) -> RepoResult<Option<Geography>>;
    /// Loads only the parent link of one entry, regardless of visibility.
    fn parent_of(&self, id: ResourceId) -> RepoResult<Option<Option<ResourceId>>>;
    /// Lists the direct children of one entry, regardless of visibility.
    fn children_of(&self, id: ResourceId) -> RepoResult<Vec<Geography>>;
    /// Overwrites every mutable field of one entry the principal may write.
    fn update_geography(
        &self,
        principal: &Principal,
        id: ResourceId,
        next: &NewGeography,
    ) -> RepoResult<Geography>;
    /// Deletes one entry the principal may write.
    fn delete_geography(&self, principal: &Principal, id: ResourceId) -> RepoResult<()>;
}

/// SQLite-backed geography repository.
pub struct SqliteGeographyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGeographyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[GEOGRAPHY_TABLE])?;
        Ok(Self { conn })
    }
}

impl GeographyRepository for SqliteGeographyRepository<'_> {
    fn list_geographies(&self, principal: &Principal) -> RepoResult<Vec<Geography>> {
        let (clause, binds) = list_filter(principal).to_sql("");
        let mut stmt = self.conn.prepare(&format!(
            "{GEOGRAPHY_SELECT_SQL}
             WHERE {clause}
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_geography_row(row)?);
        }
        Ok(items)
    }

    fn create_geography(
        &self,
        principal: &Principal,
        input: &NewGeography,
    ) -> RepoResult<Geography> {
        input.validate()?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO geographies (
                id,
                owner_id,
                name,
                tagline,
                data,
                scale,
                scale_other,
                parent_id,
                is_free,
                is_published
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                id.to_string(),
                principal.id.as_str(),
                normalize_name(&input.name)?,
                normalize_optional_text(input.tagline.as_deref()),
                encode_details(&input.data)?,
                input.scale.as_str(),
                stored_scale_other(input),
                input.parent_id.map(|value| value.to_string()),
                bool_to_int(input.is_free),
                bool_to_int(input.is_published),
            ],
        )?;

        self.find_geography_unscoped(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn get_geography(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> RepoResult<Option<Geography>> {
        let (clause, filter_binds) = list_filter(principal).to_sql("");
        let mut binds = vec![Value::Text(id.to_string())];
        binds.extend(filter_binds);

        let mut stmt = self.conn.prepare(&format!(
            "{GEOGRAPHY_SELECT_SQL} WHERE id = ? AND {clause};"
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_geography_row(row)?));
        }
        Ok(None)
    }

    fn find_geography_unscoped(&self, id: ResourceId) -> RepoResult<Option<Geography>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GEOGRAPHY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_geography_row(row)?));
        }
        Ok(None)
    }

    fn parent_of(&self, id: ResourceId) -> RepoResult<Option<Option<ResourceId>>> {
        let parent: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT parent_id FROM geographies WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        parent
            .map(|link| {
                link.map(|value| parse_uuid(&value, "geographies.parent_id"))
                    .transpose()
            })
            .transpose()
    }

    fn children_of(&self, id: ResourceId) -> RepoResult<Vec<Geography>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GEOGRAPHY_SELECT_SQL}
             WHERE parent_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_geography_row(row)?);
        }
        Ok(items)
    }

    fn update_geography(
        &self,
        principal: &Principal,
        id: ResourceId,
        next: &NewGeography,
    ) -> RepoResult<Geography> {
        next.validate()?;
        let id_text = id.to_string();
        let changed = self.conn.execute(
            &format!(
                "UPDATE geographies
                 SET
                    name = ?1,
                    tagline = ?2,
                    data = ?3,
                    scale = ?4,
                    scale_other = ?5,
                    parent_id = ?6,
                    is_free = ?7,
                    is_published = ?8,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?9
                   AND (?10 = 1 OR owner_id = ?11);"
            ),
            params![
                normalize_name(&next.name)?,
                normalize_optional_text(next.tagline.as_deref()),
                encode_details(&next.data)?,
                next.scale.as_str(),
                stored_scale_other(next),
                next.parent_id.map(|value| value.to_string()),
                bool_to_int(next.is_free),
                bool_to_int(next.is_published),
                id_text.as_str(),
                bool_to_int(principal.is_admin()),
                principal.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(unmatched_write(self.conn, GEOGRAPHY_TABLE, &id_text));
        }

        self.find_geography_unscoped(id)?
            .ok_or(RepoError::NotFound(id_text))
    }

    fn delete_geography(&self, principal: &Principal, id: ResourceId) -> RepoResult<()> {
        let id_text = id.to_string();
        let changed = self.conn.execute(
            "DELETE FROM geographies
             WHERE id = ?1
               AND (?2 = 1 OR owner_id = ?3);",
            params![
                id_text.as_str(),
                bool_to_int(principal.is_admin()),
                principal.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(unmatched_write(self.conn, GEOGRAPHY_TABLE, &id_text));
        }
        Ok(())
    }
}

/// `scale_other` is only meaningful for `other`; it is dropped otherwise.
fn stored_scale_other(input: &NewGeography) -> Option<String> {
    if input.scale == Scale::Other {
        normalize_optional_text(input.scale_other.as_deref())
    } else {
        None
    }
}

fn encode_details(details: &GeographyDetails) -> RepoResult<String> {
    serde_json::to_string(details)
        .map_err(|err| RepoError::InvalidData(format!("unencodable geography data: {err}")))
}

fn parse_geography_row(row: &Row<'_>) -> RepoResult<Geography> {
    let id_text: String = row.get("id")?;
    let data_text: String = row.get("data")?;
    let data = serde_json::from_str(&data_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid json in geographies.data for `{id_text}`: {err}"
        ))
    })?;

    let scale_text: String = row.get("scale")?;
    let scale = Scale::parse(&scale_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid scale `{scale_text}` in geographies.scale"))
    })?;

    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "geographies.parent_id"))
        .transpose()?;

    Ok(Geography {
        id: parse_uuid(&id_text, "geographies.id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        tagline: row.get("tagline")?,
        data,
        scale,
        scale_other: row.get("scale_other")?,
        parent_id,
        is_free: parse_flag(row.get("is_free")?, "geographies.is_free")?,
        is_published: parse_flag(row.get("is_published")?, "geographies.is_published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
