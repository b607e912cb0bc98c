//! End-to-end tests.
//!
//! Drives the full HTTP surface (router → reconciler → orchestrator and
//! record store) with an in-memory orchestrator and an on-disk store.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use redb::{Database, ReadableDatabase, ReadableTableMetadata};
use serde_json::{Value, json};
use tower::ServiceExt;

use podgrid_api::build_router;
use podgrid_k8s::{MemoryOrchestrator, Operation};
use podgrid_reconciler::Reconciler;
use podgrid_state::StateStore;
use podgrid_state::tables::{POD_ENVS, POD_NAMES, POD_PORTS, PODS};

fn setup(db_path: &Path) -> (Router, Arc<MemoryOrchestrator>) {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let store = StateStore::open(db_path).unwrap();
    let router = build_router(Reconciler::new(orchestrator.clone(), store));
    (router, orchestrator)
}

/// Reopen the store and rebuild the in-memory cluster from it, as
/// `podd standalone` does on startup.
async fn restart(db_path: &Path) -> (Router, Arc<MemoryOrchestrator>) {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let store = StateStore::open(db_path).unwrap();
    orchestrator.restore(&store).await.unwrap();
    let router = build_router(Reconciler::new(orchestrator.clone(), store));
    (router, orchestrator)
}

fn svc_a(replicas: i32) -> Value {
    json!({
        "pod_name": "svc-a",
        "pod_namespace": "default",
        "pod_image": "nginx:1.21",
        "pod_replicas": replicas,
        "pod_cpu_max": 0.5,
        "pod_memory_max": 128.0,
        "pod_port": [{ "container_port": 8080, "protocol": "TCP" }],
        "pod_env": [{ "env_key": "MODE", "env_value": "prod" }]
    })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn add_svc_a(router: &Router) -> i64 {
    let (status, body) = send(router, "POST", "/api/v1/pods", Some(svc_a(2))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

/// Row counts per table, read straight from the database file.
fn row_counts(db_path: &Path) -> [u64; 4] {
    let db = Database::create(db_path).unwrap();
    let txn = db.begin_read().unwrap();
    [
        txn.open_table(PODS).unwrap().len().unwrap(),
        txn.open_table(POD_NAMES).unwrap().len().unwrap(),
        txn.open_table(POD_PORTS).unwrap().len().unwrap(),
        txn.open_table(POD_ENVS).unwrap().len().unwrap(),
    ]
}

async fn pod_names(router: &Router) -> Vec<String> {
    let (status, body) = send(router, "GET", "/api/v1/pods", None).await;
    assert_eq!(status, StatusCode::OK);
    body["pod_info"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["pod_name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn add_pod_creates_deployment_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let (router, orch) = setup(&dir.path().join("podgrid.redb"));

    let id = add_svc_a(&router).await;
    assert!(id > 0);

    let deployment = orch.deployment("default", "svc-a").await.unwrap();
    let spec = deployment.spec.unwrap();
    assert_eq!(spec.replicas, Some(2));
    let ports = spec.template.spec.unwrap().containers[0].ports.clone().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].container_port, 8080);
    assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));

    let (status, pod) = send(&router, "GET", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pod["id"], id);
    assert_eq!(pod["pod_name"], "svc-a");
    assert_eq!(pod["pod_port"][0]["container_port"], 8080);
}

#[tokio::test]
async fn add_pod_twice_is_conflict_with_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let (router, orch) = setup(&dir.path().join("podgrid.redb"));
    add_svc_a(&router).await;

    let (status, body) = send(&router, "POST", "/api/v1/pods", Some(svc_a(2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["msg"].as_str().unwrap().contains("already exists"));

    assert_eq!(pod_names(&router).await, ["svc-a"]);
    assert_eq!(orch.len().await, 1);
}

#[tokio::test]
async fn update_pod_changes_replicas() {
    let dir = tempfile::tempdir().unwrap();
    let (router, orch) = setup(&dir.path().join("podgrid.redb"));
    let id = add_svc_a(&router).await;

    let mut body = svc_a(5);
    body["id"] = json!(id);
    let (status, resp) = send(&router, "PUT", &format!("/api/v1/pods/{id}"), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{resp}");

    let deployment = orch.deployment("default", "svc-a").await.unwrap();
    assert_eq!(deployment.spec.unwrap().replicas, Some(5));

    let (_, pod) = send(&router, "GET", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(pod["pod_replicas"], 5);
}

#[tokio::test]
async fn delete_pod_leaves_no_rows_behind() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("podgrid.redb");
    let (router, orch) = setup(&db_path);
    let id = add_svc_a(&router).await;

    let (status, _) = send(&router, "DELETE", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(orch.deployment("default", "svc-a").await.is_none());
    assert!(pod_names(&router).await.is_empty());

    drop(router);
    assert_eq!(row_counts(&db_path), [0, 0, 0, 0]);
}

#[tokio::test]
async fn failed_orchestrator_delete_keeps_record() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("podgrid.redb");
    let (router, orch) = setup(&db_path);
    let id = add_svc_a(&router).await;
    let (_, before) = send(&router, "GET", &format!("/api/v1/pods/{id}"), None).await;

    orch.fail_next(Operation::Delete).await;
    let (status, body) = send(&router, "DELETE", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["msg"].as_str().unwrap().contains("orchestrator"));

    let (_, after) = send(&router, "GET", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(after, before);
    assert!(orch.deployment("default", "svc-a").await.is_some());

    drop(router);
    assert_eq!(row_counts(&db_path), [1, 1, 1, 1]);
}

#[tokio::test]
async fn records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("podgrid.redb");
    let (router, _orch) = setup(&db_path);
    let id = add_svc_a(&router).await;
    drop(router);

    let (router, orch) = restart(&db_path).await;
    let (status, pod) = send(&router, "GET", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pod["pod_name"], "svc-a");
    assert_eq!(orch.len().await, 1);
}

#[tokio::test]
async fn restored_pods_can_be_updated_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("podgrid.redb");
    let (router, _orch) = setup(&db_path);
    let id = add_svc_a(&router).await;
    drop(router);

    let (router, orch) = restart(&db_path).await;
    let (status, body) = send(&router, "POST", "/api/v1/pods", Some(svc_a(2))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = send(&router, "PUT", &format!("/api/v1/pods/{id}"), Some(svc_a(4))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let deployment = orch.deployment("default", "svc-a").await.unwrap();
    assert_eq!(deployment.spec.unwrap().replicas, Some(4));

    let (status, body) = send(&router, "DELETE", &format!("/api/v1/pods/{id}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(orch.is_empty().await);

    drop(router);
    assert_eq!(row_counts(&db_path), [0, 0, 0, 0]);
}

#[tokio::test]
async fn same_name_in_other_namespace_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (router, orch) = setup(&dir.path().join("podgrid.redb"));
    add_svc_a(&router).await;

    let mut pod = svc_a(2);
    pod["pod_namespace"] = json!("other");
    let (status, _) = send(&router, "POST", "/api/v1/pods", Some(pod)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(orch.len().await, 1);
    assert!(orch.deployment("other", "svc-a").await.is_none());
}

#[tokio::test]
async fn malformed_requests_are_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (router, orch) = setup(&dir.path().join("podgrid.redb"));

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/pods")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, "GET", "/api/v1/pods/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["msg"].is_string());

    let mut pod = svc_a(2);
    pod["pod_port"][0]["container_port"] = json!(70000);
    let (status, _) = send(&router, "POST", "/api/v1/pods", Some(pod)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(orch.is_empty().await);
}

#[tokio::test]
async fn healthz_responds() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _orch) = setup(&dir.path().join("podgrid.redb"));

    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
