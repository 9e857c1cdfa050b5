//! The `FactStore` trait and the records it persists alongside facts.
//!
//! The trait is implemented by storage backends (e.g. `stagesync-store-sqlite`).
//! Higher layers (`stagesync-api`, `stagesync-server`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{classify::StageResult, fact::RawChecklistFact};

// ─── Records ─────────────────────────────────────────────────────────────────

/// The last verdict persisted for a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVerdict {
  pub person_id:     u64,
  pub verdict:       StageResult,
  pub classified_at: DateTime<Utc>,
}

/// A queued verdict change awaiting delivery to the CRM.
///
/// Delivery itself (and its retry policy) happens outside this workspace;
/// the store only keeps the outbox and an acknowledgement marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
  pub update_id: Uuid,
  pub person_id: u64,
  pub previous:  Option<StageResult>,
  pub current:   StageResult,
  pub queued_at: DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a stagesync storage backend.
///
/// Facts are append-only and returned in ingestion order, which is the order
/// "last non-null wins" aggregation relies on.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Append facts in the order given. Facts without a `person_id` are
  /// dropped; returns the number actually stored.
  fn record_facts(
    &self,
    facts: Vec<RawChecklistFact>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All facts for a person, in ingestion order. Empty if unknown.
  fn get_facts(
    &self,
    person_id: u64,
  ) -> impl Future<Output = Result<Vec<RawChecklistFact>, Self::Error>> + Send + '_;

  /// Forget every fact for a person so a poller can deliver a fresh
  /// snapshot. Returns the number removed. Verdicts are kept.
  fn clear_facts(
    &self,
    person_id: u64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Every person with at least one fact, ascending.
  fn list_people(
    &self,
  ) -> impl Future<Output = Result<Vec<u64>, Self::Error>> + Send + '_;

  // ── Verdicts ──────────────────────────────────────────────────────────

  fn get_verdict(
    &self,
    person_id: u64,
  ) -> impl Future<Output = Result<Option<StoredVerdict>, Self::Error>> + Send + '_;

  /// Persist `verdict` as the person's current verdict. When it differs
  /// from the previous one (see [`crate::diff::diff_verdict`]) a
  /// [`StageUpdate`] is queued atomically with the write and returned.
  fn record_verdict(
    &self,
    person_id: u64,
    verdict: StageResult,
  ) -> impl Future<Output = Result<Option<StageUpdate>, Self::Error>> + Send + '_;

  // ── Update queue ──────────────────────────────────────────────────────

  /// Unacknowledged updates, oldest first.
  fn pending_updates(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StageUpdate>, Self::Error>> + Send + '_;

  /// Mark an update delivered. Returns `false` if it does not exist or was
  /// already acknowledged.
  fn ack_update(
    &self,
    update_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
