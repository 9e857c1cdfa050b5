//! `POST /classify`: stateless classification of a batch of facts.
//!
//! Nothing is read from or written to the store, so callers can preview how
//! a snapshot would be classified before ingesting it.

use axum::Json;
use stagesync_core::{
  classify::{ClassifiedPerson, classify_facts},
  fact::RawChecklistFact,
};

/// Body: JSON array of facts. Returns one entry per attributable person,
/// ordered by person id.
pub async fn handler(Json(facts): Json<Vec<RawChecklistFact>>) -> Json<Vec<ClassifiedPerson>> {
  Json(classify_facts(facts))
}
