//! Axum router over the core services.
//!
//! # Responsibility
//! - Mount one route family per resource kind plus geographies, calendars
//!   and role administration.
//! - Resolve the principal before any body is read.
//! - Turn rejected bodies into `400` and unparseable ids into `404`.
//!
//! # Invariants
//! - All handlers share one SQLite connection; the mutex is the only
//!   serialization point and is never held across an `.await`.

use crate::api::{ApiReply, ApiResult};
use crate::identity::Authenticated;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use log::{error, warn};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use worldforge_core::model::resource::{
    Armor, Companion, Cosmos, Culture, Faction, Item, Language, Npc, Religion, Service, Skill,
    Spell,
};
use worldforge_core::{
    core_version, CalendarPayload, CalendarService, GeographyPatch, GeographyService,
    NewGeography, NewResource, ResourceId, ResourceKind, ResourcePatch, ResourceService, Role,
    ServiceError, ServiceResult, SqliteCalendarRepository, SqliteGeographyRepository,
    SqliteResourceRepository, SqliteUserRepository, UserService,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let guard = self.conn.lock().map_err(|_| {
            error!("event=db_lock module=http status=error reason=poisoned");
            ServiceError::Internal("connection lock poisoned".to_string())
        })?;
        f(&guard)
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let router = Router::new().route("/health", get(health));
    let router = mount_kind::<Skill>(router);
    let router = mount_kind::<Faction>(router);
    let router = mount_kind::<Armor>(router);
    let router = mount_kind::<Companion>(router);
    let router = mount_kind::<Service>(router);
    let router = mount_kind::<Cosmos>(router);
    let router = mount_kind::<Npc>(router);
    let router = mount_kind::<Religion>(router);
    let router = mount_kind::<Culture>(router);
    let router = mount_kind::<Language>(router);
    let router = mount_kind::<Item>(router);
    let router = mount_kind::<Spell>(router);

    router
        .route(
            "/geographies",
            get(list_geographies).post(create_geography),
        )
        .route(
            "/geographies/:id",
            get(get_geography)
                .put(update_geography)
                .delete(delete_geography),
        )
        .route(
            "/geographies/:id/candidate-parents",
            get(geography_candidates),
        )
        .route("/geographies/:id/child-draft", get(geography_child_draft))
        .route("/geographies/:id/inherit", post(geography_inherit))
        .route("/calendars", get(list_calendars).post(create_calendar))
        .route(
            "/calendars/:id",
            get(get_calendar).put(replace_calendar).delete(delete_calendar),
        )
        .route("/users", get(list_users))
        .route("/users/:id/role", put(set_user_role))
        .with_state(state)
}

fn mount_kind<K: ResourceKind>(router: Router<AppState>) -> Router<AppState> {
    let collection = format!("/{}", K::TABLE);
    let item = format!("{collection}/:id");
    router
        .route(
            &collection,
            get(list_resources::<K>).post(create_resource::<K>),
        )
        .route(
            &item,
            get(get_resource::<K>)
                .put(update_resource::<K>)
                .delete(delete_resource::<K>),
        )
}

async fn health() -> ApiReply {
    ApiReply::ok("version", core_version())
}

/// Unparseable ids cannot name an existing row.
fn parse_id(raw: &str) -> Result<ResourceId, ApiReply> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::NotFound(raw.to_string()).into())
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiReply> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(
            "event=http_body module=http status=rejected status_code={}",
            rejection.status().as_u16()
        );
        ServiceError::BadRequest(rejection.body_text()).into()
    })
}

// Named resources.

fn resources<K: ResourceKind>(
    conn: &Connection,
) -> ServiceResult<ResourceService<SqliteResourceRepository<'_, K>>> {
    Ok(ResourceService::new(SqliteResourceRepository::<K>::try_new(conn)?))
}

async fn list_resources<K: ResourceKind>(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult {
    let rows = state.with_conn(|conn| resources::<K>(conn)?.list(&principal))?;
    Ok(ApiReply::ok(K::TABLE, rows))
}

async fn create_resource<K: ResourceKind>(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<NewResource>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let row = state.with_conn(|conn| resources::<K>(conn)?.create(&principal, &input))?;
    Ok(ApiReply::ok(K::SINGULAR, row))
}

async fn get_resource<K: ResourceKind>(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let row = state.with_conn(|conn| resources::<K>(conn)?.get(&principal, id))?;
    Ok(ApiReply::ok(K::SINGULAR, row))
}

async fn update_resource<K: ResourceKind>(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    body: Result<Json<ResourcePatch>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let patch = parse_body(body)?;
    let row = state.with_conn(|conn| resources::<K>(conn)?.update(&principal, id, &patch))?;
    Ok(ApiReply::ok(K::SINGULAR, row))
}

async fn delete_resource<K: ResourceKind>(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    state.with_conn(|conn| resources::<K>(conn)?.delete(&principal, id))?;
    Ok(ApiReply::done())
}

// Geographies.

fn geographies(
    conn: &Connection,
) -> ServiceResult<GeographyService<SqliteGeographyRepository<'_>>> {
    Ok(GeographyService::new(SqliteGeographyRepository::try_new(
        conn,
    )?))
}

async fn list_geographies(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult {
    let rows = state.with_conn(|conn| geographies(conn)?.list(&principal))?;
    Ok(ApiReply::ok("geographies", rows))
}

async fn create_geography(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<NewGeography>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let row = state.with_conn(|conn| geographies(conn)?.create(&principal, &input))?;
    Ok(ApiReply::ok("geography", row))
}

async fn get_geography(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let row = state.with_conn(|conn| geographies(conn)?.get(&principal, id))?;
    Ok(ApiReply::ok("geography", row))
}

async fn update_geography(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    body: Result<Json<GeographyPatch>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let patch = parse_body(body)?;
    let row = state.with_conn(|conn| geographies(conn)?.update(&principal, id, &patch))?;
    Ok(ApiReply::ok("geography", row))
}

async fn delete_geography(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    state.with_conn(|conn| geographies(conn)?.delete(&principal, id))?;
    Ok(ApiReply::done())
}

async fn geography_candidates(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let rows = state.with_conn(|conn| geographies(conn)?.candidate_parents(&principal, id))?;
    Ok(ApiReply::ok("candidates", rows))
}

async fn geography_child_draft(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let draft = state.with_conn(|conn| geographies(conn)?.child_draft(&principal, id))?;
    Ok(ApiReply::ok("draft", draft))
}

async fn geography_inherit(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let row = state.with_conn(|conn| geographies(conn)?.inherit_from_parent(&principal, id))?;
    Ok(ApiReply::ok("geography", row))
}

// Calendars.

fn calendars(conn: &Connection) -> ServiceResult<CalendarService<SqliteCalendarRepository<'_>>> {
    Ok(CalendarService::new(SqliteCalendarRepository::try_new(conn)?))
}

async fn list_calendars(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult {
    let rows = state.with_conn(|conn| calendars(conn)?.list(&principal))?;
    Ok(ApiReply::ok("calendars", rows))
}

async fn create_calendar(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<CalendarPayload>, JsonRejection>,
) -> ApiResult {
    let payload = parse_body(body)?;
    let tree = state.with_conn(|conn| calendars(conn)?.write(&principal, None, &payload))?;
    Ok(ApiReply::ok("calendar", tree))
}

async fn get_calendar(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let tree = state.with_conn(|conn| calendars(conn)?.read(&principal, id))?;
    Ok(ApiReply::ok("calendar", tree))
}

async fn replace_calendar(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    body: Result<Json<CalendarPayload>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let payload = parse_body(body)?;
    let tree = state.with_conn(|conn| calendars(conn)?.write(&principal, Some(id), &payload))?;
    Ok(ApiReply::ok("calendar", tree))
}

async fn delete_calendar(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    state.with_conn(|conn| calendars(conn)?.delete(&principal, id))?;
    Ok(ApiReply::done())
}

// Users.

fn users(conn: &Connection) -> ServiceResult<UserService<SqliteUserRepository<'_>>> {
    Ok(UserService::new(SqliteUserRepository::try_new(conn)?))
}

async fn list_users(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult {
    let rows = state.with_conn(|conn| users(conn)?.list(&principal))?;
    Ok(ApiReply::ok("users", rows))
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

async fn set_user_role(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(target): Path<String>,
    body: Result<Json<RoleChange>, JsonRejection>,
) -> ApiResult {
    let change = parse_body(body)?;
    let user = state.with_conn(|conn| users(conn)?.set_role(&principal, &target, change.role))?;
    Ok(ApiReply::ok("user", user))
}
