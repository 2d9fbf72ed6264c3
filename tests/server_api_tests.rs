use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use lifeos_lib::config::AppConfig;
use lifeos_lib::db::Database;
use lifeos_lib::models::{AuditEntityType, MusicCrownItem, MusicEvent, MusicPending};
use lifeos_lib::server::routes::router;
use lifeos_lib::server::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn seeded_db() -> Arc<Database> {
    let db = Database::open_in_memory().expect("db should open");
    db.upsert_event(&MusicEvent {
        id: "E1".to_string(),
        event_date: "2024-01-01".to_string(),
        planned_count: 2,
        decided_count: 1,
        status: "done".to_string(),
        note: String::new(),
    })
    .expect("event should insert");
    db.upsert_crown_item(&MusicCrownItem {
        timeline_index: 1,
        event_id: "E1".to_string(),
        crown_date: "2024-01-02".to_string(),
        title: "Song A".to_string(),
        card_received_date: String::new(),
        note: String::new(),
        reason: String::new(),
    })
    .expect("crown item should insert");
    db.upsert_pending(&MusicPending {
        pending_id: "P1".to_string(),
        temp_code: "T1".to_string(),
        title: "Untitled".to_string(),
        reason: String::new(),
    })
    .expect("pending should insert");
    Arc::new(db)
}

fn app(db: Arc<Database>, api_token: Option<&str>) -> Router {
    let config = AppConfig {
        ssot_path: "missing-ssot".to_string(),
        api_token: api_token.map(str::to_string),
        ..AppConfig::default()
    };
    router(AppState::new(db, PathBuf::from("/nonexistent"), &config))
}

async fn send(app: Router, method: Method, uri: &str, body: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::from(body.to_string())).expect("request should build"))
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let payload = serde_json::from_slice(&bytes).expect("response should be json");
    (status, payload)
}

#[tokio::test]
async fn health_endpoint_returns_ok_json() {
    let (status, payload) = send(app(seeded_db(), None), Method::GET, "/api/health", "", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["service"], "lifeos");
}

#[tokio::test]
async fn item_reason_patch_updates_row_and_writes_one_audit_entry() {
    let db = seeded_db();
    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/1/reason",
        r#"{"reason":"great take"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["item"]["timelineIndex"], 1);
    assert_eq!(payload["item"]["reason"], "great take");

    let entries = db
        .list_audit_logs(AuditEntityType::MusicCrownItem, "1")
        .expect("audit entries should load");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "update_reason");
    assert_eq!(entries[0].before["reason"], "");
    assert_eq!(entries[0].after["reason"], "great take");
}

#[tokio::test]
async fn item_reason_patch_clears_reason_for_non_string_values() {
    let db = seeded_db();
    send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/1/reason",
        r#"{"reason":"keep"}"#,
        None,
    )
    .await;
    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/1/reason",
        r#"{"reason":7}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["item"]["reason"], "");
    let entries = db
        .list_audit_logs(AuditEntityType::MusicCrownItem, "1")
        .expect("audit entries should load");
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn unknown_item_is_not_found_and_leaves_no_audit_entry() {
    let db = seeded_db();
    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/99/reason",
        r#"{"reason":"x"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload, json!({"ok": false, "error": "not found"}));
    assert!(db
        .list_audit_logs(AuditEntityType::MusicCrownItem, "99")
        .expect("audit entries should load")
        .is_empty());
}

#[tokio::test]
async fn non_integer_timeline_index_is_rejected() {
    let (status, payload) = send(
        app(seeded_db(), None),
        Method::PATCH,
        "/api/ssot/music/items/abc/reason",
        r#"{"reason":"x"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"], "invalid timelineIndex");
}

#[tokio::test]
async fn whole_float_timeline_index_targets_the_integer_row() {
    let db = seeded_db();
    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/1.0/reason",
        r#"{"reason":"float path"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["item"]["timelineIndex"], 1);
    assert_eq!(payload["item"]["reason"], "float path");

    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/items/1.5/reason",
        r#"{"reason":"x"}"#,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"], "invalid timelineIndex");
    assert_eq!(
        db.list_audit_logs(AuditEntityType::MusicCrownItem, "1")
            .expect("audit entries should load")
            .len(),
        1
    );
}

#[tokio::test]
async fn unknown_pending_is_not_found() {
    let (status, payload) = send(
        app(seeded_db(), None),
        Method::PATCH,
        "/api/ssot/music/pending/P404/reason",
        r#"{"reason":"x"}"#,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload, json!({"ok": false, "error": "not found"}));
}

#[tokio::test]
async fn pending_reason_patch_is_audited() {
    let db = seeded_db();
    let (status, payload) = send(
        app(db.clone(), None),
        Method::PATCH,
        "/api/ssot/music/pending/P1/reason",
        "not json",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["pending"]["pendingId"], "P1");
    assert_eq!(payload["pending"]["tempCode"], "T1");
    assert_eq!(payload["pending"]["reason"], "");
    let entries = db
        .list_audit_logs(AuditEntityType::MusicPending, "P1")
        .expect("audit entries should load");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_type, "musicPending");
}

#[tokio::test]
async fn token_gate_rejects_missing_or_wrong_bearer() {
    let db = seeded_db();
    let uri = "/api/ssot/music/items/1/reason";
    let body = r#"{"reason":"great take"}"#;

    let (status, payload) = send(app(db.clone(), Some("s3cret")), Method::PATCH, uri, body, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payload["ok"], false);

    let (status, _) = send(app(db.clone(), Some("s3cret")), Method::PATCH, uri, body, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app(db.clone(), Some("s3cret")), Method::PATCH, uri, body, Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        db.list_audit_logs(AuditEntityType::MusicCrownItem, "1")
            .expect("audit entries should load")
            .len(),
        1
    );
}

#[tokio::test]
async fn read_endpoints_list_stored_rows() {
    let db = seeded_db();

    let (status, summary) = send(app(db.clone(), None), Method::GET, "/api/ssot/music/summary", "", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary,
        json!({"events": 1, "items": 1, "pending": 1, "lastEventDate": "2024-01-01"})
    );

    let (_, events) = send(app(db.clone(), None), Method::GET, "/api/ssot/music/events", "", None).await;
    assert_eq!(events["ok"], true);
    assert_eq!(events["events"][0]["eventDate"], "2024-01-01");

    let (_, items) = send(app(db.clone(), None), Method::GET, "/api/ssot/music/items", "", None).await;
    assert_eq!(items["items"][0]["eventId"], "E1");

    let (_, pending) = send(app(db, None), Method::GET, "/api/ssot/music/pending", "", None).await;
    assert_eq!(pending["pending"][0]["pendingId"], "P1");
}

#[tokio::test]
async fn status_reports_missing_root() {
    let (status, payload) = send(app(seeded_db(), None), Method::GET, "/api/ssot/status", "", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["exists"], false);
    assert_eq!(payload["isDir"], false);
    assert_eq!(payload["entries"], json!([]));
}
