//! SyncClient against an in-process axum server.
//!
//! Delays are recorded by a [`Sleeper`] instead of slept, so backoff
//! assertions run instantly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use motif_core::{ColorFeatures, FeatureValue};
use motif_registry::{EntryPayload, KnowledgeSource, RegistryConfig, RegistryStore, SyncBatch};
use motif_sync::*;
use tempfile::TempDir;

// ─────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────

#[derive(Default)]
struct RecordingSleeper(Mutex<Vec<Duration>>);

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
struct Calls(Arc<AtomicUsize>);

impl Calls {
    /// Returns the 0-based index of this call.
    fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> (SyncClient, Arc<RecordingSleeper>) {
    let cfg = SyncConfig { base_url, max_jitter_ms: 0, timeout_secs: 5, ..SyncConfig::default() };
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = SyncClient::new(cfg).unwrap().with_sleeper(sleeper.clone());
    (client, sleeper)
}

fn one_entry_batch() -> SyncBatch {
    let dir = TempDir::new().unwrap();
    let mut store = RegistryStore::open(RegistryConfig::new(dir.path())).unwrap();
    let value = FeatureValue::Color(ColorFeatures { dominant_rgb: Some([12.0, 200.0, 40.0]), ..Default::default() });
    let mut batch = SyncBatch::new();
    if let motif_registry::Ensured::Added { entry, blend } = store.ensure_detailed(&value, "prompt").unwrap() {
        batch.push_entry(EntryPayload::from_entry(&entry, "prompt", 120));
        batch.push_blend(blend);
    }
    batch
}

fn ok_receipt() -> Response {
    Json(serde_json::json!({ "results": { "color": 1 } })).into_response()
}

// ─────────────────────────────────────────────
// Retry behaviour
// ─────────────────────────────────────────────

#[tokio::test]
async fn rate_limit_honours_retry_after() {
    async fn handler(State(calls): State<Calls>) -> Response {
        if calls.hit() == 0 {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "5")], "slow down").into_response()
        } else {
            ok_receipt()
        }
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    let receipt = client.push_discoveries(&one_entry_batch()).await.unwrap();

    assert_eq!(receipt.results["color"], 1);
    assert_eq!(calls.count(), 2);
    let delays = sleeper.delays();
    assert_eq!(delays.len(), 1);
    assert!(delays[0] >= Duration::from_secs(5), "{delays:?}");
}

#[tokio::test]
async fn capacity_exhaustion_backs_off_at_least_ten_seconds() {
    async fn handler(State(calls): State<Calls>) -> Response {
        if calls.hit() == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, "Worker exceeded CPU time limit").into_response()
        } else {
            ok_receipt()
        }
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    client.push_discoveries(&one_entry_batch()).await.unwrap();

    let delays = sleeper.delays();
    assert_eq!(delays.len(), 1);
    assert!(delays[0] >= MIN_CAPACITY_BACKOFF, "{delays:?}");
}

#[tokio::test]
async fn ordinary_rate_limit_is_not_capacity_exhaustion() {
    async fn handler(State(calls): State<Calls>) -> Response {
        if calls.hit() == 0 {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "5")], "Rate limit exceeded").into_response()
        } else {
            ok_receipt()
        }
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    client.push_discoveries(&one_entry_batch()).await.unwrap();

    assert_eq!(sleeper.delays(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn unparseable_retry_after_falls_back_to_backoff() {
    async fn handler(State(calls): State<Calls>) -> Response {
        if calls.hit() == 0 {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "1e20")], "slow down").into_response()
        } else {
            ok_receipt()
        }
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    client.push_discoveries(&one_entry_batch()).await.unwrap();

    assert_eq!(calls.count(), 2);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(3)]);
}

#[tokio::test]
async fn oversized_retry_after_is_capped() {
    async fn handler(State(calls): State<Calls>) -> Response {
        if calls.hit() == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, [("retry-after", "99999999")], "maintenance").into_response()
        } else {
            ok_receipt()
        }
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    client.push_discoveries(&one_entry_batch()).await.unwrap();

    let cap = Duration::from_millis(SyncConfig::default().max_retry_after_ms);
    assert_eq!(sleeper.delays(), vec![cap]);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    async fn handler(State(calls): State<Calls>) -> Response {
        calls.hit();
        (StatusCode::BAD_REQUEST, "x".repeat(2_000)).into_response()
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    let err = client.push_discoveries(&one_entry_batch()).await.unwrap_err();

    match err {
        SyncError::ClientRejected { status, path, body } => {
            assert_eq!(status, 400);
            assert_eq!(path, "/discoveries");
            assert_eq!(body.chars().count(), BODY_EXCERPT_CHARS);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(calls.count(), 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn non_json_success_is_malformed() {
    async fn handler() -> &'static str {
        "<html>gateway</html>"
    }
    let url = serve(Router::new().route("/discoveries", post(handler))).await;
    let (client, _) = client(url);

    let err = client.push_discoveries(&one_entry_batch()).await.unwrap_err();
    assert!(matches!(&err, SyncError::MalformedResponse { body, .. } if body.contains("<html>")), "{err:?}");
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    async fn handler(State(calls): State<Calls>) -> Response {
        calls.hit();
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    }
    let calls = Calls::default();
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(calls.clone())).await;
    let (client, sleeper) = client(url);

    let err = client.push_discoveries(&one_entry_batch()).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.status(), Some(500));
    assert!(matches!(err, SyncError::TransientBackend { attempts: 4, .. }));
    assert_eq!(calls.count(), 4);
    let delays = sleeper.delays();
    assert_eq!(delays, vec![Duration::from_secs(3), Duration::from_secs(5), Duration::from_secs(7)]);
}

#[tokio::test]
async fn unreachable_backend_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = SyncConfig {
        base_url: format!("http://{addr}"),
        max_jitter_ms: 0,
        max_retries: 1,
        ..SyncConfig::default()
    };
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = SyncClient::new(cfg).unwrap().with_sleeper(sleeper.clone());

    let err = client.push_discoveries(&one_entry_batch()).await.unwrap_err();
    assert!(matches!(err, SyncError::TransientBackend { status: None, attempts: 2, .. }), "{err:?}");
    assert_eq!(sleeper.delays().len(), 1);
}

// ─────────────────────────────────────────────
// Jitter / payloads
// ─────────────────────────────────────────────

#[tokio::test]
async fn hot_endpoints_are_jittered() {
    async fn discoveries() -> Response {
        ok_receipt()
    }
    async fn backfill() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "processed": 0, "remaining": 0 }))
    }
    let url = serve(
        Router::new()
            .route("/discoveries", post(discoveries))
            .route("/registries/backfill-names", post(backfill)),
    )
    .await;
    let cfg = SyncConfig { base_url: url, max_jitter_ms: 50, ..SyncConfig::default() };
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = SyncClient::new(cfg).unwrap().with_sleeper(sleeper.clone());

    client.push_discoveries(&one_entry_batch()).await.unwrap();
    assert_eq!(sleeper.delays().len(), 1);
    assert!(sleeper.delays()[0] <= Duration::from_millis(50));

    client.backfill_names(10).await.unwrap();
    assert_eq!(sleeper.delays().len(), 1);
}

#[tokio::test]
async fn push_sends_grouped_body() {
    async fn handler(State(seen): State<Arc<Mutex<Option<serde_json::Value>>>>, Json(body): Json<serde_json::Value>) -> Response {
        *seen.lock().unwrap() = Some(body);
        ok_receipt()
    }
    let seen = Arc::new(Mutex::new(None));
    let url = serve(Router::new().route("/discoveries", post(handler)).with_state(seen.clone())).await;
    let (client, _) = client(url);

    client.push_discoveries(&one_entry_batch()).await.unwrap();

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["static"][0]["domain"], "color");
    assert_eq!(body["static"][0]["key"], "0_200_25");
    assert_eq!(body["blends"][0]["domain"], "color");
}

#[tokio::test]
async fn empty_batch_sends_nothing() {
    let (client, sleeper) = client("http://127.0.0.1:9".to_string());
    let receipt = client.push_discoveries(&SyncBatch::new()).await.unwrap();
    assert_eq!(receipt.total(), 0);
    assert!(sleeper.delays().is_empty());
}

// ─────────────────────────────────────────────
// Knowledge
// ─────────────────────────────────────────────

#[tokio::test]
async fn remote_knowledge_is_used_when_available() {
    async fn handler() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "domains": { "color": { "learned": [{ "name": "velo-marin", "key": "0_200_25", "count": 7 }], "origins": ["green"] } }
        }))
    }
    let url = serve(Router::new().route("/knowledge/for-creation", get(handler))).await;
    let (client, _) = client(url);

    let snap = client.knowledge_for_creation().await.unwrap();
    assert_eq!(snap.source, KnowledgeSource::Remote);
    assert_eq!(snap.domains["color"].learned[0].count, 7);
}

#[tokio::test]
async fn knowledge_falls_back_to_local_registry() {
    async fn handler() -> Response {
        (StatusCode::NOT_FOUND, "no such route").into_response()
    }
    let url = serve(Router::new().route("/knowledge/for-creation", get(handler))).await;
    let (client, _) = client(url);

    let dir = TempDir::new().unwrap();
    let mut store = RegistryStore::open(RegistryConfig::new(dir.path())).unwrap();
    let value = FeatureValue::Color(ColorFeatures { dominant_rgb: Some([0.0, 0.0, 0.0]), ..Default::default() });
    store.ensure(&value, "p").unwrap();

    let snap = client.knowledge_or_local(&store, 10).await;
    assert_eq!(snap.source, KnowledgeSource::Local);
    assert_eq!(snap.domains["color"].learned.len(), 1);
}

// ─────────────────────────────────────────────
// Backfill
// ─────────────────────────────────────────────

#[tokio::test]
async fn backfill_pages_until_done() {
    async fn handler(State(left): State<Arc<AtomicU64>>, Query(q): Query<HashMap<String, u64>>) -> Json<BackfillPage> {
        let limit = q.get("limit").copied().unwrap_or(10);
        let remaining = left.load(Ordering::SeqCst);
        let processed = remaining.min(limit);
        left.store(remaining - processed, Ordering::SeqCst);
        Json(BackfillPage { processed, remaining: remaining - processed })
    }
    let left = Arc::new(AtomicU64::new(250));
    let url = serve(Router::new().route("/registries/backfill-depths", post(handler)).with_state(left)).await;
    let cfg = SyncConfig { base_url: url, max_jitter_ms: 0, backfill_page_size: 100, ..SyncConfig::default() };
    let client = SyncClient::new(cfg).unwrap();

    let report = client.backfill_all(BackfillKind::Depths).await.unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(report.processed, 250);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.stop, BackfillStop::Complete);
}

#[tokio::test]
async fn backfill_stops_when_stalled() {
    async fn handler() -> Json<BackfillPage> {
        Json(BackfillPage { processed: 0, remaining: 40 })
    }
    let url = serve(Router::new().route("/registries/backfill-names", post(handler))).await;
    let (client, _) = client(url);

    let report = client.backfill_all(BackfillKind::Names).await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.stop, BackfillStop::Stalled);
}
