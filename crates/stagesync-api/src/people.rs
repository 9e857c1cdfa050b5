//! Handlers for `/people` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/people` | Every person with facts, plus their stored verdict |
//! | `GET`  | `/people/{id}/view` | Aggregated view; 404 if no facts |
//! | `GET`  | `/people/{id}/breakdown` | Live breakdown with `ETag`; 404 if no facts |
//! | `POST` | `/people/{id}/reclassify` | Persist a fresh verdict; returns any queued update; 404 if unknown |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagesync_core::{
  aggregate::aggregate_person,
  classify::{StageBreakdown, StageResult, classify_with_breakdown},
  store::{FactStore, StageUpdate},
  sync,
  view::PersonView,
};

use crate::{
  error::ApiError,
  etag::{compute_etag, if_none_match},
};

/// Load and aggregate a person's facts, or 404 when there are none.
async fn load_view<S: FactStore>(store: &S, person_id: u64) -> Result<PersonView, ApiError> {
  let facts = store.get_facts(person_id).await.map_err(ApiError::store)?;
  if facts.is_empty() {
    return Err(ApiError::NotFound(format!("no facts for person {person_id}")));
  }
  Ok(aggregate_person(person_id, facts))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct PersonSummary {
  pub person_id:     u64,
  /// `None` until the person has been classified at least once.
  pub verdict:       Option<StageResult>,
  pub classified_at: Option<DateTime<Utc>>,
}

/// `GET /people`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<PersonSummary>>, ApiError>
where
  S: FactStore,
{
  let ids = store.list_people().await.map_err(ApiError::store)?;
  let mut people = Vec::with_capacity(ids.len());
  for person_id in ids {
    let stored = store.get_verdict(person_id).await.map_err(ApiError::store)?;
    people.push(PersonSummary {
      person_id,
      verdict: stored.as_ref().map(|v| v.verdict),
      classified_at: stored.map(|v| v.classified_at),
    });
  }
  Ok(Json(people))
}

// ─── View ─────────────────────────────────────────────────────────────────────

/// `GET /people/{id}/view`
pub async fn view<S>(
  State(store): State<Arc<S>>,
  Path(person_id): Path<u64>,
) -> Result<Json<PersonView>, ApiError>
where
  S: FactStore,
{
  Ok(Json(load_view(store.as_ref(), person_id).await?))
}

// ─── Breakdown ────────────────────────────────────────────────────────────────

/// `GET /people/{id}/breakdown`
///
/// Computed from the current facts, not the stored verdict. Responds 304
/// when `If-None-Match` carries the current ETag.
pub async fn breakdown<S>(
  State(store): State<Arc<S>>,
  Path(person_id): Path<u64>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: FactStore,
{
  let view = load_view(store.as_ref(), person_id).await?;
  let body = serde_json::to_vec(&classify_with_breakdown(&view))?;
  let etag = compute_etag(&body);

  if if_none_match(&headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  Ok(
    (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, "application/json".to_owned()),
        (header::ETAG, etag),
      ],
      body,
    )
      .into_response(),
  )
}

// ─── Reclassify ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ReclassifyResponse {
  pub breakdown: StageBreakdown,
  /// Present when the verdict changed and an update was queued.
  pub update:    Option<StageUpdate>,
}

/// `POST /people/{id}/reclassify`
///
/// A known person with no facts left is still classified (as undetermined),
/// so clearing a person's facts and reclassifying queues the regression.
/// 404 when the person has neither facts nor a stored verdict.
pub async fn reclassify<S>(
  State(store): State<Arc<S>>,
  Path(person_id): Path<u64>,
) -> Result<Json<ReclassifyResponse>, ApiError>
where
  S: FactStore,
{
  let has_facts = !store.get_facts(person_id).await.map_err(ApiError::store)?.is_empty();
  if !has_facts && store.get_verdict(person_id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("unknown person {person_id}")));
  }
  let r = sync::reclassify(store.as_ref(), person_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ReclassifyResponse { breakdown: r.breakdown, update: r.update }))
}
