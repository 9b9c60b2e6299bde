//! HTTP API integration tests
//!
//! Drives the full router with `oneshot` requests. No model keys are
//! configured, so every classification takes the detector fallback path
//! and is routed to review.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use docguard_api::config::{LlmSettings, ServiceConfig};
use docguard_api::warehouse::Warehouse;
use docguard_api::{build_router, AppState};
use docguard_common::events::EventBus;

const BOUNDARY: &str = "docguard-test-boundary";

fn test_config(root: &TempDir) -> ServiceConfig {
    let root_folder = root.path().to_path_buf();
    ServiceConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_upload_bytes: 1024 * 1024,
        uploads_dir: root_folder.join("uploads"),
        warehouse_enabled: false,
        database_path: root_folder.join("docguard.db"),
        max_concurrency: 2,
        policy_path: None,
        primary_llm: LlmSettings::primary_defaults(),
        secondary_llm: LlmSettings::secondary_defaults(),
        root_folder,
    }
}

async fn test_app(warehouse: Warehouse) -> (Router, TempDir) {
    let root = TempDir::new().unwrap();
    let state = AppState::from_config(test_config(&root), warehouse, EventBus::new(64)).unwrap();
    (build_router(state), root)
}

/// Multipart body with one part per `(field, filename, contents)`
fn multipart_body(parts: &[(&str, &str, &str)]) -> Body {
    let mut body = String::new();
    for (field, filename, contents) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        body.push_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        ));
        body.push_str("Content-Type: text/plain\r\n\r\n");
        body.push_str(contents);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    Body::from(body)
}

fn multipart_request(uri: &str, parts: &[(&str, &str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(multipart_body(parts))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn upload(app: &Router, filename: &str, contents: &str) -> String {
    let (status, body) = send(app, multipart_request("/upload", &[("file", filename, contents)])).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    body["doc_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_configuration() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "docguard-api");
    assert_eq!(body["warehouse_enabled"], false);
    assert_eq!(body["primary_model_configured"], false);
    assert_eq!(body["secondary_model_configured"], false);
    assert_eq!(body["event_subscribers"], 0);
}

#[tokio::test]
async fn upload_extracts_text_document() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let (status, body) = send(
        &app,
        multipart_request("/upload", &[("file", "memo.txt", "Quarterly planning notes")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "memo.txt");
    assert_eq!(body["page_count"], 1);
    assert_eq!(body["image_count"], 0);
    assert_eq!(body["status"], "preprocessed");

    let doc_id = body["doc_id"].as_str().unwrap();
    let (status, record) = send(&app, get(&format!("/documents/{}", doc_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["doc_id"], doc_id);
    assert!(record.get("classification").is_none());
}

#[tokio::test]
async fn upload_rejects_missing_and_empty_files() {
    let (app, _root) = test_app(Warehouse::disabled()).await;

    let (status, body) = send(&app, multipart_request("/upload", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, multipart_request("/upload", &[("file", "blank.txt", "   ")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unable to extract content.");
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(&app, get(&format!("/documents/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/documents/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, post_empty(&format!("/classify/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get(&format!("/status/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classify_without_models_falls_back_to_detectors() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let doc_id = upload(&app, "hr.txt", "Employee SSN 123-45-6789 on file.").await;

    let (status, result) = send(&app, post_empty(&format!("/classify/{}", doc_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["doc_id"], doc_id.as_str());
    assert_eq!(result["raw_signals"]["has_pii"], true);
    assert_eq!(result["final_category"], "Highly Sensitive");
    assert_eq!(result["requires_review"], true);
    let triggers: Vec<&str> = result["review_triggers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(triggers.contains(&"prompt_errors"));
    assert!(result["dual_llm_agreement"].is_null());

    let (_, record) = send(&app, get(&format!("/documents/{}", doc_id))).await;
    assert_eq!(record["status"], "classified");
    assert_eq!(record["classification"]["final_category"], "Highly Sensitive");
}

#[tokio::test]
async fn pretty_classification_is_indented() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let doc_id = upload(&app, "note.txt", "Lunch menu for Friday").await;

    let response = app
        .clone()
        .oneshot(post_empty(&format!("/classify/{}?pretty=true", doc_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("{\n  "));
    assert!(text.ends_with("}\n"));
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["doc_id"], doc_id.as_str());
}

#[tokio::test]
async fn review_flow_requires_classification_first() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let doc_id = upload(&app, "contract.txt", "Internal only: draft terms").await;
    let override_body = json!({
        "doc_id": doc_id,
        "new_label": "Confidential",
        "reviewer": "analyst@example.com",
        "comment": "internal contract draft",
    });

    let (status, body) = send(&app, post_json("/hitl", override_body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(&app, post_empty(&format!("/classify/{}", doc_id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, queue) = send(&app, get("/hitl/queue")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["total"], 1);
    assert_eq!(queue["items"][0]["doc_id"], doc_id.as_str());
    assert_eq!(queue["items"][0]["status"], "open");

    let (status, body) = send(&app, post_json("/hitl", override_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (_, record) = send(&app, get(&format!("/documents/{}", doc_id))).await;
    assert_eq!(record["status"], "reviewed");
    assert_eq!(record["classification"]["final_category"], "Confidential");
    assert_eq!(record["classification"]["requires_review"], false);

    let (_, open) = send(&app, get("/hitl/queue")).await;
    assert_eq!(open["total"], 0);
    let (_, closed) = send(&app, get("/hitl/queue?status=closed")).await;
    assert_eq!(closed["total"], 1);
    assert_eq!(closed["items"][0]["assigned_to"], "analyst@example.com");

    let (status, _) = send(&app, get("/hitl/queue?status=pending")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_of_unknown_document_is_not_found() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let body = json!({
        "doc_id": uuid::Uuid::new_v4(),
        "new_label": "Public",
        "reviewer": "analyst",
    });
    let (status, _) = send(&app, post_json("/hitl", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_counts_classified_documents() {
    let (app, _root) = test_app(Warehouse::in_memory().await).await;
    let classified = upload(&app, "hr.txt", "SSN 123-45-6789").await;
    upload(&app, "menu.txt", "Soup of the day").await;
    let (status, _) = send(&app, post_empty(&format!("/classify/{}", classified))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, snapshot) = send(&app, get("/dashboard?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["limit"], 10);
    assert_eq!(snapshot["documents"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["counts"]["total"], 2);
    assert_eq!(snapshot["counts"]["highlySensitive"], 1);
    assert_eq!(snapshot["counts"]["needsReview"], 1);

    let unclassified = snapshot["documents"]
        .as_array()
        .unwrap()
        .iter()
        .find(|doc| doc["filename"] == "menu.txt")
        .unwrap();
    assert_eq!(unclassified["finalCategory"], "Unclassified");
}

#[tokio::test]
async fn warehouse_backed_queue_lists_review_items() {
    let (app, _root) = test_app(Warehouse::in_memory().await).await;
    let doc_id = upload(&app, "hr.txt", "SSN 123-45-6789").await;
    send(&app, post_empty(&format!("/classify/{}", doc_id))).await;

    let (status, queue) = send(&app, get("/hitl/queue?status=all&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["total"], 1);
    assert_eq!(queue["items"][0]["category"], "Highly Sensitive");
}

#[tokio::test]
async fn document_listing_honours_limit() {
    for warehouse in [Warehouse::disabled(), Warehouse::in_memory().await] {
        let (app, _root) = test_app(warehouse).await;
        upload(&app, "a.txt", "first").await;
        upload(&app, "b.txt", "second").await;
        upload(&app, "c.txt", "third").await;

        let (status, all) = send(&app, get("/documents")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all["total"], 3);

        let (_, limited) = send(&app, get("/documents?limit=2")).await;
        assert_eq!(limited["total"], 2);
        assert_eq!(limited["documents"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn audit_trail_lists_newest_event_first() {
    for warehouse in [Warehouse::disabled(), Warehouse::in_memory().await] {
        let (app, _root) = test_app(warehouse).await;
        let doc_id = upload(&app, "hr.txt", "SSN 123-45-6789").await;

        let (status, empty) = send(&app, get(&format!("/documents/{}/audit", doc_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty["total"], 0);

        send(&app, post_empty(&format!("/classify/{}", doc_id))).await;
        let review = json!({
            "doc_id": doc_id,
            "new_label": "Confidential",
            "reviewer": "analyst",
        });
        let (status, _) = send(&app, post_json("/hitl", review)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, trail) = send(&app, get(&format!("/documents/{}/audit", doc_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trail["doc_id"], doc_id.as_str());
        assert_eq!(trail["total"], 2);
        assert_eq!(trail["events"][0]["event_type"], "hitl_override");
        assert_eq!(trail["events"][0]["payload"]["new_label"], "Confidential");
        assert_eq!(trail["events"][1]["event_type"], "auto_classification");

        let (_, newest) = send(&app, get(&format!("/documents/{}/audit?limit=1", doc_id))).await;
        assert_eq!(newest["total"], 1);
    }

    let (app, _root) = test_app(Warehouse::disabled()).await;
    let (status, _) = send(&app, get("/documents/not-a-uuid/audit")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_upload_runs_to_completion() {
    let (app, _root) = test_app(Warehouse::disabled()).await;
    let (status, body) = send(
        &app,
        multipart_request(
            "/batch/upload",
            &[
                ("files", "a.txt", "First document"),
                ("files", "b.txt", "Second document"),
                ("files", "blank.txt", "  "),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 2);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Batch upload initiated. Successfully queued 2 documents."));
    assert!(message.contains("Failed: blank.txt"));
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let mut job = Value::Null;
    for _ in 0..100 {
        let (status, current) = send(&app, get(&format!("/status/{}", job_id))).await;
        assert_eq!(status, StatusCode::OK);
        job = current;
        if job["status"] == "completed" || job["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(job["status"], "completed");
    assert_eq!(job["completed"], 2);
    assert_eq!(job["failed"], 0);
    assert_eq!(job["progress"], 100.0);
    let filenames: Vec<&str> = job["documents"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|doc| doc["filename"].as_str())
        .collect();
    assert_eq!(filenames, vec!["a.txt", "b.txt"]);

    let (status, jobs) = send(&app, get("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs["total"], 1);
    assert_eq!(jobs["jobs"][0]["job_id"], job_id.as_str());
}

#[tokio::test]
async fn batch_upload_rejects_empty_and_all_failed() {
    let (app, _root) = test_app(Warehouse::disabled()).await;

    let (status, body) = send(&app, multipart_request("/batch/upload", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No files provided");

    let (status, body) = send(
        &app,
        multipart_request("/batch/upload", &[("files", "blank.txt", " ")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("All uploads failed."));
}
