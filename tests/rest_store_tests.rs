// Integration tests for the PostgREST-backed store
//
// A stub PostgREST server keeps rows in memory and implements just the
// filters the store uses (`eq.` / `is.null`, `Prefer: return=representation`,
// 409 on the unique webinar_id / room_name indexes). It can also simulate a
// concurrent writer slipping in between our read and our conditional update.

mod common;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use common::spawn_server;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use webinar_agent::store::NewWebinar;
use webinar_agent::{AgentError, RestStore, TranscriptStore, WebinarStore};

#[derive(Default)]
struct StubDb {
    transcripts: Mutex<Vec<Value>>,
    webinars: Mutex<Vec<Value>>,
    next_id: AtomicUsize,
    patch_calls: AtomicUsize,
    /// Number of upcoming PATCHes preceded by a foreign append
    interfere: AtomicUsize,
}

type Db = Arc<StubDb>;
type Params = Query<HashMap<String, String>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some("service-key")
        && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer service-key")
}

fn eq_filter<'a>(params: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    params.get(column).and_then(|v| v.strip_prefix("eq."))
}

fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|t| t.with_timezone(&Utc))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

async fn select_transcripts(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Params,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no api key"})));
    }

    let rows = db.transcripts.lock().unwrap();
    let webinar_id = eq_filter(&params, "webinar_id");
    let matching: Vec<Value> = rows
        .iter()
        .filter(|row| webinar_id.map_or(true, |id| row["webinar_id"] == json!(id)))
        .take(1)
        .cloned()
        .collect();

    (StatusCode::OK, Json(Value::Array(matching)))
}

async fn insert_transcript(
    State(db): State<Db>,
    Json(mut row): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut rows = db.transcripts.lock().unwrap();
    if rows.iter().any(|r| r["webinar_id"] == row["webinar_id"]) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"code": "23505", "message": "duplicate key value"})),
        );
    }

    row["id"] = json!(db.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn update_transcript(
    State(db): State<Db>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> (StatusCode, Json<Value>) {
    db.patch_calls.fetch_add(1, Ordering::SeqCst);
    let mut rows = db.transcripts.lock().unwrap();

    let Some(id) = eq_filter(&params, "id").and_then(|id| id.parse::<u64>().ok()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "id filter required"})));
    };
    let Some(row) = rows.iter_mut().find(|r| r["id"] == json!(id)) else {
        return (StatusCode::OK, Json(json!([])));
    };

    let interfere = db.interfere.load(Ordering::SeqCst);
    if interfere > 0 {
        db.interfere.store(interfere - 1, Ordering::SeqCst);
        let current = row["transcript"].as_str().unwrap_or_default().to_string();
        row["transcript"] = json!(format!("{} intruder", current));
        row["updated_at"] = json!(now());
    }

    let version_matches = match params.get("updated_at").map(String::as_str) {
        Some("is.null") => row["updated_at"].is_null(),
        Some(filter) => {
            let wanted = filter.strip_prefix("eq.").and_then(parse_ts);
            let stored = row["updated_at"].as_str().and_then(parse_ts);
            wanted.is_some() && wanted == stored
        }
        None => true,
    };

    if !version_matches {
        return (StatusCode::OK, Json(json!([])));
    }

    row["transcript"] = patch["transcript"].clone();
    row["updated_at"] = patch["updated_at"].clone();
    (StatusCode::OK, Json(json!([row.clone()])))
}

async fn select_webinars(State(db): State<Db>, Query(params): Params) -> Json<Value> {
    let rows = db.webinars.lock().unwrap();
    let mut matching: Vec<Value> = rows
        .iter()
        .filter(|row| eq_filter(&params, "id").map_or(true, |id| row["id"] == json!(id)))
        .cloned()
        .collect();

    if params.get("order").map(String::as_str) == Some("start_time.asc") {
        matching.sort_by_key(|row| row["start_time"].as_str().and_then(parse_ts));
    }

    Json(Value::Array(matching))
}

async fn insert_webinar(State(db): State<Db>, Json(row): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut rows = db.webinars.lock().unwrap();
    if rows.iter().any(|r| r["room_name"] == row["room_name"]) {
        return (StatusCode::CONFLICT, Json(json!({"code": "23505"})));
    }

    rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn stub_postgrest(db: Db) -> Result<String> {
    let app = Router::new()
        .route(
            "/rest/v1/webinar_transcriptions",
            get(select_transcripts)
                .post(insert_transcript)
                .patch(update_transcript),
        )
        .route(
            "/rest/v1/webinars",
            get(select_webinars).post(insert_webinar),
        )
        .with_state(db);

    spawn_server(app).await
}

async fn store_for(db: Db) -> Result<RestStore> {
    let base_url = stub_postgrest(db).await?;
    Ok(RestStore::new(
        &base_url,
        SecretString::from("service-key".to_string()),
        Duration::from_secs(5),
    )?)
}

#[tokio::test]
async fn test_create_then_append() -> Result<()> {
    let db = Db::default();
    let store = store_for(db.clone()).await?;

    let created = store.upsert_append("W1", "Hello").await?;
    assert_eq!(created.transcript, "Hello");
    assert_eq!(created.id, "1");

    let updated = store.upsert_append("W1", "world").await?;
    assert_eq!(updated.transcript, "Hello world");
    assert_eq!(updated.id, "1");

    let fetched = store.get("W1").await?.expect("record should exist");
    assert_eq!(fetched.transcript, "Hello world");
    assert_eq!(db.transcripts.lock().unwrap().len(), 1);

    assert!(store.get("W2").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_conflicting_write_is_retried_not_lost() -> Result<()> {
    let db = Db::default();
    let store = store_for(db.clone()).await?;

    store.upsert_append("W1", "Hello").await?;

    // Another writer appends between our read and our conditional update
    db.interfere.store(1, Ordering::SeqCst);
    let record = store.upsert_append("W1", "world").await?;

    assert_eq!(record.transcript, "Hello intruder world");
    assert_eq!(db.patch_calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn test_gives_up_after_bounded_attempts() -> Result<()> {
    let db = Db::default();
    let store = store_for(db.clone()).await?.with_max_write_attempts(3);

    store.upsert_append("W1", "Hello").await?;

    db.interfere.store(usize::MAX, Ordering::SeqCst);
    let err = store.upsert_append("W1", "world").await.unwrap_err();

    assert!(matches!(err, AgentError::Infrastructure(..)));
    assert_eq!(db.patch_calls.load(Ordering::SeqCst), 3);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_appends_keep_every_fragment() -> Result<()> {
    let db = Db::default();
    let store = Arc::new(store_for(db.clone()).await?.with_max_write_attempts(16));

    let fragments: Vec<String> = (0..8).map(|i| format!("part{}", i)).collect();
    let tasks = fragments.iter().cloned().map(|fragment| {
        let store = store.clone();
        tokio::spawn(async move { store.upsert_append("live", &fragment).await })
    });

    for result in futures::future::join_all(tasks).await {
        result??;
    }

    let transcript = store.get("live").await?.unwrap().transcript;
    for fragment in &fragments {
        assert!(transcript.contains(fragment.as_str()), "Lost {}", fragment);
    }
    assert_eq!(db.transcripts.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unauthorized_read_is_infrastructure_error() -> Result<()> {
    let base_url = stub_postgrest(Db::default()).await?;
    let store = RestStore::new(
        &base_url,
        SecretString::from("wrong-key".to_string()),
        Duration::from_secs(5),
    )?;

    let err = store.get("W1").await.unwrap_err();
    assert!(matches!(err, AgentError::Infrastructure(..)));
    assert!(err.details().unwrap().contains("401"));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_gateway_is_infrastructure_error() -> Result<()> {
    // Nothing listens on the discard port
    let store = RestStore::new(
        "http://127.0.0.1:9",
        SecretString::from("service-key".to_string()),
        Duration::from_secs(2),
    )?;

    let err = store.upsert_append("W1", "Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Infrastructure(..)));

    Ok(())
}

#[tokio::test]
async fn test_slow_gateway_is_infrastructure_timeout() -> Result<()> {
    let app = Router::new().route(
        "/rest/v1/webinar_transcriptions",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let base_url = spawn_server(app).await?;
    let store = RestStore::new(
        &base_url,
        SecretString::from("service-key".to_string()),
        Duration::from_millis(200),
    )?;

    let err = store.upsert_append("W1", "Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Infrastructure(..)));
    assert!(err.to_string().starts_with("Timed out"), "got {}", err);

    Ok(())
}

#[tokio::test]
async fn test_webinar_rows() -> Result<()> {
    let db = Db::default();
    let store = store_for(db.clone()).await?;

    let form: NewWebinar = serde_json::from_value(json!({
        "title": "Rust Async",
        "description": "Futures and executors",
        "startTime": "2030-05-01T17:00:00Z",
        "hostName": "Sam",
        "roomName": "rust-async"
    }))?;
    let created = store.create_webinar(form.clone().into_webinar()?).await?;

    // Stored with snake_case columns
    let row = db.webinars.lock().unwrap()[0].clone();
    assert_eq!(row["room_name"], json!("rust-async"));
    assert_eq!(row["host_name"], json!("Sam"));

    let fetched = store.get_webinar(created.id).await?.expect("webinar should exist");
    assert_eq!(fetched, created);

    let listed = store.list_webinars().await?;
    assert_eq!(listed, vec![created]);

    let err = store.create_webinar(form.into_webinar()?).await.unwrap_err();
    assert!(matches!(err, AgentError::Validation(..)));

    Ok(())
}
