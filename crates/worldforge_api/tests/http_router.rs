use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use worldforge_api::{router, AppState, USER_HEADER};
use worldforge_core::{open_db_in_memory, Role, SqliteUserRepository, UserService};

fn seeded_state() -> AppState {
    let state = AppState::new(open_db_in_memory().unwrap());
    state
        .with_conn(|conn| {
            let users = UserService::new(SqliteUserRepository::try_new(conn)?);
            users.register("root", Role::Admin)?;
            users.register("alice", Role::WorldBuilder)?;
            users.register("bob", Role::Free)?;
            Ok(())
        })
        .unwrap();
    state
}

async fn call(
    state: &AppState,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(USER_HEADER, user);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_needs_no_principal() {
    let state = seeded_state();
    let (status, body) = call(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn missing_or_unknown_user_is_unauthorized() {
    let state = seeded_state();
    for user in [None, Some("mallory")] {
        let (status, body) = call(&state, Method::GET, "/skills", user, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"ok": false, "error": "UNAUTHORIZED"}));
    }

    let (status, _) = call(
        &state,
        Method::POST,
        "/skills",
        None,
        Some("not json"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn resource_lifecycle_over_http() {
    let state = seeded_state();

    let (status, body) = call(
        &state,
        Method::POST,
        "/npcs",
        Some("alice"),
        Some(r#"{"name":"Volo","ownerId":"bob","isFree":true}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["npc"]["ownerId"], json!("alice"));
    assert_eq!(body["npc"]["canEdit"], json!(true));
    let id = body["npc"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&state, Method::GET, "/npcs", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["npcs"].as_array().unwrap().len(), 1);
    assert_eq!(body["npcs"][0]["canEdit"], json!(false));

    let item = format!("/npcs/{id}");
    let (status, body) = call(
        &state,
        Method::PUT,
        &item,
        Some("bob"),
        Some(r#"{"name":"Stolen"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("FORBIDDEN"));

    let (status, body) = call(
        &state,
        Method::PUT,
        &item,
        Some("alice"),
        Some(r#"{"tagline":"Author"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["npc"]["name"], json!("Volo"));
    assert_eq!(body["npc"]["tagline"], json!("Author"));

    let (status, body) = call(&state, Method::DELETE, &item, Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"ok": false, "error": "FORBIDDEN"}));

    let missing = format!("/npcs/{}", uuid::Uuid::new_v4());
    let (status, body) = call(&state, Method::DELETE, &missing, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"ok": false, "error": "NOT_FOUND"}));

    let (status, body) = call(&state, Method::DELETE, &item, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = call(&state, Method::GET, &item, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn bad_bodies_and_ids_are_classified() {
    let state = seeded_state();

    let (status, body) = call(
        &state,
        Method::POST,
        "/spells",
        Some("alice"),
        Some(r#"{"name":"   "}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("BAD_REQUEST"));

    let (status, _) = call(&state, Method::POST, "/spells", Some("alice"), Some("{")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, Method::POST, "/spells", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&state, Method::GET, "/spells/not-a-uuid", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn geography_routes_enforce_the_scale_chain() {
    let state = seeded_state();

    let (status, body) = call(
        &state,
        Method::POST,
        "/geographies",
        Some("alice"),
        Some(r#"{"name":"Toril","scale":"world"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let world_id = body["geography"]["id"].as_str().unwrap().to_string();

    let illegal = json!({"name": "Cormyr", "scale": "region", "parentId": world_id}).to_string();
    let (status, _) = call(&state, Method::POST, "/geographies", Some("alice"), Some(&illegal)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &state,
        Method::GET,
        &format!("/geographies/{world_id}/child-draft"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draft"]["scale"], json!("continent"));
    assert_eq!(body["draft"]["parentId"], json!(world_id));

    let (status, body) = call(
        &state,
        Method::GET,
        &format!("/geographies/{world_id}/candidate-parents"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"], json!([]));
}

#[tokio::test]
async fn calendar_tree_round_trips_over_http() {
    let state = seeded_state();
    let payload = json!({
        "name": "Barovian",
        "hoursPerDay": 24,
        "minutesPerHour": 60,
        "daylightHours": 8,
        "nightHours": 14,
        "dawnDuskHours": 2,
        "daysPerYear": 360,
        "months": [{"name": "Thaw", "weekStructure": [{"weekNumber": 1, "daysInWeek": 7}]}]
    })
    .to_string();

    let (status, body) = call(&state, Method::POST, "/calendars", Some("alice"), Some(&payload)).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["calendar"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &state,
        Method::GET,
        &format!("/calendars/{id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendar"]["canEdit"], json!(true));
    assert_eq!(body["calendar"]["months"][0]["name"], json!("Thaw"));
    assert_eq!(
        body["calendar"]["months"][0]["weekStructure"][0]["daysInWeek"],
        json!(7)
    );

    let (status, body) = call(&state, Method::GET, "/calendars", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendars"], json!([]));
}

#[tokio::test]
async fn role_changes_are_admin_only() {
    let state = seeded_state();
    let promote = r#"{"role":"world_developer"}"#;

    let (status, _) = call(&state, Method::PUT, "/users/bob/role", Some("alice"), Some(promote)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&state, Method::PUT, "/users/bob/role", Some("root"), Some(promote)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], json!({"id": "bob", "role": "world_developer"}));

    let (status, _) = call(
        &state,
        Method::PUT,
        "/users/bob/role",
        Some("root"),
        Some(r#"{"role":"overlord"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, Method::PUT, "/users/ghost/role", Some("root"), Some(promote)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_listing_is_admin_only() {
    let state = seeded_state();

    let (status, body) = call(&state, Method::GET, "/users", Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("FORBIDDEN"));

    let (status, body) = call(&state, Method::GET, "/users", Some("root"), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["alice", "bob", "root"]);
}
