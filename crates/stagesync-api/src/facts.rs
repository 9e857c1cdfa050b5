//! Handlers for raw fact endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/facts` | Body: JSON array of facts; returns 201 + `{"stored": n}` |
//! | `GET`    | `/people/{id}/facts` | Facts in ingestion order; 404 if none |
//! | `DELETE` | `/people/{id}/facts` | Returns `{"removed": n}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use stagesync_core::{fact::RawChecklistFact, store::FactStore};

use crate::error::ApiError;

// ─── Ingest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
  pub stored: usize,
}

/// `POST /facts`: returns 201 + the number of facts actually stored.
///
/// Facts without a person id are accepted but not stored.
pub async fn ingest<S>(
  State(store): State<Arc<S>>,
  Json(facts): Json<Vec<RawChecklistFact>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FactStore,
{
  let received = facts.len();
  let stored = store.record_facts(facts).await.map_err(ApiError::store)?;
  tracing::debug!(received, stored, "facts ingested");
  Ok((StatusCode::CREATED, Json(IngestResponse { stored })))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /people/{id}/facts`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(person_id): Path<u64>,
) -> Result<Json<Vec<RawChecklistFact>>, ApiError>
where
  S: FactStore,
{
  let facts = store.get_facts(person_id).await.map_err(ApiError::store)?;
  if facts.is_empty() {
    return Err(ApiError::NotFound(format!("no facts for person {person_id}")));
  }
  Ok(Json(facts))
}

// ─── Clear ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
  pub removed: usize,
}

/// `DELETE /people/{id}/facts`. The stored verdict is left in place.
pub async fn clear<S>(
  State(store): State<Arc<S>>,
  Path(person_id): Path<u64>,
) -> Result<Json<ClearResponse>, ApiError>
where
  S: FactStore,
{
  let removed = store.clear_facts(person_id).await.map_err(ApiError::store)?;
  Ok(Json(ClearResponse { removed }))
}
