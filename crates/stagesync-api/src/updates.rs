//! Handlers for the stage update queue.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/updates` | Pending updates, oldest first; `?limit=` (default 100) |
//! | `POST` | `/updates/{id}/ack` | 404 if unknown or already acknowledged |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde::Deserialize;
use stagesync_core::store::{FactStore, StageUpdate};
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /updates[?limit=<n>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<StageUpdate>>, ApiError>
where
  S: FactStore,
{
  let limit = match params.limit {
    None => DEFAULT_LIMIT,
    Some(0) => return Err(ApiError::BadRequest("limit must be positive".into())),
    Some(n) => n.min(MAX_LIMIT),
  };
  let updates = store.pending_updates(limit).await.map_err(ApiError::store)?;
  Ok(Json(updates))
}

// ─── Ack ──────────────────────────────────────────────────────────────────────

/// `POST /updates/{id}/ack`: returns 204 on success.
pub async fn ack<S>(
  State(store): State<Arc<S>>,
  Path(update_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: FactStore,
{
  if store.ack_update(update_id).await.map_err(ApiError::store)? {
    tracing::debug!(%update_id, "update acknowledged");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("no pending update {update_id}")))
  }
}
