//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use stagesync_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn accepted_facts() -> Value {
  json!([
    { "person_id": 7, "checklist_name": "Application Form", "completed_on": "2024-01-05" },
    { "person_id": "7", "checklist_name": "Decision", "completed_on": "2024-02-01",
      "school_decision": "Accepted" },
    { "person_id": null, "checklist_name": "Application Form" }
  ])
}

// ── Ingestion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_reports_stored_count() {
  let app = app().await;
  let resp = send(&app, "POST", "/facts", Some(accepted_facts())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(json_body(resp).await, json!({ "stored": 2 }));
}

#[tokio::test]
async fn ingest_rejects_non_array_body() {
  let app = app().await;
  let resp = send(&app, "POST", "/facts", Some(json!({ "person_id": 1 }))).await;
  assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn oversized_person_id_does_not_sink_the_batch() {
  let app = app().await;
  let facts = json!([
    { "person_id": 1, "checklist_name": "Application Form", "completed_on": "2024-01-05" },
    { "person_id": 9223372036854775808_u64, "checklist_name": "Application Form",
      "completed_on": "2024-01-05" }
  ]);
  let resp = send(&app, "POST", "/facts", Some(facts)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(json_body(resp).await, json!({ "stored": 1 }));

  let people = json_body(send(&app, "GET", "/people", None).await).await;
  assert_eq!(people.as_array().unwrap().len(), 1);
  assert_eq!(people[0]["person_id"], 1);

  for uri in [
    "/people/9223372036854775808/facts",
    "/people/9223372036854775808/view",
    "/people/9223372036854775808/breakdown",
  ] {
    let resp = send(&app, "GET", uri, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
  }
  let resp = send(&app, "POST", "/people/9223372036854775808/reclassify", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classify_is_stateless() {
  let app = app().await;
  let resp = send(&app, "POST", "/classify", Some(accepted_facts())).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body = json_body(resp).await;
  let people = body.as_array().unwrap();
  assert_eq!(people.len(), 1);
  assert_eq!(people[0]["person_id"], 7);
  assert_eq!(people[0]["breakdown"]["stage"], "Decision");
  assert_eq!(people[0]["breakdown"]["substage"], 23);

  // Nothing was stored.
  let resp = send(&app, "GET", "/people", None).await;
  assert_eq!(json_body(resp).await, json!([]));
}

// ── People ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_person_is_404() {
  let app = app().await;
  for uri in ["/people/1/facts", "/people/1/view", "/people/1/breakdown"] {
    let resp = send(&app, "GET", uri, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    assert!(json_body(resp).await["error"].is_string());
  }
}

#[tokio::test]
async fn non_numeric_person_id_is_rejected() {
  let app = app().await;
  let resp = send(&app, "GET", "/people/abc/view", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn view_and_facts_for_ingested_person() {
  let app = app().await;
  send(&app, "POST", "/facts", Some(accepted_facts())).await;

  let facts = json_body(send(&app, "GET", "/people/7/facts", None).await).await;
  assert_eq!(facts.as_array().unwrap().len(), 2);
  assert_eq!(facts[0]["checklist_name"], "Application Form");

  let view = json_body(send(&app, "GET", "/people/7/view", None).await).await;
  assert_eq!(view["person_id"], 7);
  assert_eq!(view["school_decision"], "Accepted");
  assert_eq!(view["checklist_completion"]["Decision"], true);
}

#[tokio::test]
async fn list_people_includes_verdict_after_reclassify() {
  let app = app().await;
  send(&app, "POST", "/facts", Some(accepted_facts())).await;

  let before = json_body(send(&app, "GET", "/people", None).await).await;
  assert_eq!(before[0]["person_id"], 7);
  assert!(before[0]["verdict"].is_null());

  let resp = send(&app, "POST", "/people/7/reclassify", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let r = json_body(resp).await;
  assert_eq!(r["breakdown"]["stage_reason"], "Decision checklist complete");
  assert_eq!(r["update"]["current"]["substage"], 23);
  assert!(r["update"]["previous"].is_null());

  let after = json_body(send(&app, "GET", "/people", None).await).await;
  assert_eq!(after[0]["verdict"], json!({ "stage": "Decision", "substage": 23 }));
}

#[tokio::test]
async fn breakdown_etag_and_conditional_get() {
  let app = app().await;
  send(&app, "POST", "/facts", Some(accepted_facts())).await;

  let resp = send(&app, "GET", "/people/7/breakdown", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  let body = json_body(resp).await;
  assert_eq!(body["substage_label"], "Accepted");

  let req = Request::builder()
    .uri("/people/7/breakdown")
    .header(header::IF_NONE_MATCH, &etag)
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

  // A new fact that changes the verdict changes the tag.
  let denied = json!([{ "person_id": 7, "school_decision": "Denied" }]);
  send(&app, "POST", "/facts", Some(denied)).await;
  let resp = send(&app, "GET", "/people/7/breakdown", None).await;
  assert_ne!(resp.headers()[header::ETAG].to_str().unwrap(), etag);
}

#[tokio::test]
async fn reclassify_unknown_person_is_404_and_stores_nothing() {
  use stagesync_core::store::FactStore as _;

  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let app = api_router(store.clone());
  let resp = send(&app, "POST", "/people/42/reclassify", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  assert!(store.get_verdict(42).await.unwrap().is_none());
  let pending = json_body(send(&app, "GET", "/updates", None).await).await;
  assert_eq!(pending, json!([]));
}

#[tokio::test]
async fn clear_then_reclassify_queues_regression() {
  let app = app().await;
  send(&app, "POST", "/facts", Some(accepted_facts())).await;
  send(&app, "POST", "/people/7/reclassify", None).await;

  let cleared = json_body(send(&app, "DELETE", "/people/7/facts", None).await).await;
  assert_eq!(cleared, json!({ "removed": 2 }));

  let r = json_body(send(&app, "POST", "/people/7/reclassify", None).await).await;
  assert!(r["breakdown"]["stage"].is_null());
  assert_eq!(r["breakdown"]["substage_reason"], "No substage criteria met");
  assert_eq!(r["update"]["previous"]["stage"], "Decision");
}

// ── Update queue ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn updates_can_be_listed_and_acked_once() {
  let app = app().await;
  send(&app, "POST", "/facts", Some(accepted_facts())).await;
  send(&app, "POST", "/people/7/reclassify", None).await;

  let pending = json_body(send(&app, "GET", "/updates", None).await).await;
  let pending = pending.as_array().unwrap();
  assert_eq!(pending.len(), 1);
  let id = pending[0]["update_id"].as_str().unwrap().to_owned();

  let resp = send(&app, "POST", &format!("/updates/{id}/ack"), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(&app, "POST", &format!("/updates/{id}/ack"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let pending = json_body(send(&app, "GET", "/updates?limit=5", None).await).await;
  assert_eq!(pending, json!([]));
}

#[tokio::test]
async fn zero_limit_is_bad_request() {
  let app = app().await;
  let resp = send(&app, "GET", "/updates?limit=0", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
