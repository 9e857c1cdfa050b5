//! JSON REST API for stagesync.
//!
//! Exposes an axum [`Router`] backed by any [`stagesync_core::store::FactStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stagesync_api::api_router(store.clone()))
//! ```

pub mod classify;
pub mod error;
pub mod etag;
pub mod facts;
pub mod people;
pub mod updates;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use stagesync_core::store::FactStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: FactStore + 'static,
{
  Router::new()
    // Ingestion
    .route("/facts", post(facts::ingest::<S>))
    .route("/classify", post(classify::handler))
    // People
    .route("/people", get(people::list::<S>))
    .route(
      "/people/{id}/facts",
      get(facts::list::<S>).delete(facts::clear::<S>),
    )
    .route("/people/{id}/view", get(people::view::<S>))
    .route("/people/{id}/breakdown", get(people::breakdown::<S>))
    .route("/people/{id}/reclassify", post(people::reclassify::<S>))
    // Update queue
    .route("/updates", get(updates::list::<S>))
    .route("/updates/{id}/ack", post(updates::ack::<S>))
    .with_state(store)
}
