//! Re-derive verdicts from stored facts and queue changes.
//!
//! Every pass is a full re-aggregation of a person's facts followed by
//! classification; the store decides whether the fresh verdict differs from
//! the persisted one.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  aggregate::aggregate_person,
  classify::{StageBreakdown, classify_with_breakdown},
  store::{FactStore, StageUpdate},
  view::PersonView,
};

/// Outcome of reclassifying one person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reclassification {
  pub view:      PersonView,
  pub breakdown: StageBreakdown,
  /// Present when the verdict changed and an update was queued.
  pub update:    Option<StageUpdate>,
}

/// Totals for one sweep over every known person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
  pub people:  usize,
  pub changed: usize,
  pub failed:  usize,
}

/// Aggregate, classify and persist the verdict for `person_id`.
pub async fn reclassify<S: FactStore>(
  store: &S,
  person_id: u64,
) -> Result<Reclassification, S::Error> {
  let facts = store.get_facts(person_id).await?;
  let fact_count = facts.len();
  let view = aggregate_person(person_id, facts);
  let breakdown = classify_with_breakdown(&view);

  let update = store.record_verdict(person_id, breakdown.result()).await?;

  match &update {
    Some(u) => info!(
      person_id,
      stage = ?u.current.stage,
      substage = ?u.current.substage.map(|s| s.code()),
      previous_stage = ?u.previous.and_then(|p| p.stage),
      "verdict changed; update queued"
    ),
    None => debug!(person_id, fact_count, "verdict unchanged"),
  }

  Ok(Reclassification { view, breakdown, update })
}

/// Reclassify every person in the store.
///
/// A failure for one person is logged and counted; it does not stop the
/// sweep. Only a failure to list people aborts.
pub async fn reclassify_all<S: FactStore>(store: &S) -> Result<SweepSummary, S::Error> {
  let people = store.list_people().await?;
  let mut summary = SweepSummary { people: people.len(), ..SweepSummary::default() };

  for person_id in people {
    match reclassify(store, person_id).await {
      Ok(r) if r.update.is_some() => summary.changed += 1,
      Ok(_) => {}
      Err(e) => {
        summary.failed += 1;
        warn!(person_id, error = %e, "reclassification failed");
      }
    }
  }

  Ok(summary)
}

#[cfg(test)]
mod tests {
  use std::{
    collections::BTreeMap,
    sync::Mutex,
  };

  use chrono::{NaiveDate, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    classify::{Stage, StageResult, Substage},
    diff::diff_verdict,
    fact::RawChecklistFact,
    store::StoredVerdict,
  };

  /// Minimal in-memory store for exercising the orchestration.
  #[derive(Default)]
  struct MemoryStore {
    facts:    Mutex<Vec<RawChecklistFact>>,
    verdicts: Mutex<BTreeMap<u64, StoredVerdict>>,
    updates:  Mutex<Vec<StageUpdate>>,
  }

  impl FactStore for MemoryStore {
    type Error = std::convert::Infallible;

    async fn record_facts(&self, facts: Vec<RawChecklistFact>) -> Result<usize, Self::Error> {
      let mut stored = self.facts.lock().unwrap();
      let before = stored.len();
      stored.extend(facts.into_iter().filter(|f| f.person_id.is_some()));
      Ok(stored.len() - before)
    }

    async fn get_facts(&self, person_id: u64) -> Result<Vec<RawChecklistFact>, Self::Error> {
      Ok(
        self
          .facts
          .lock()
          .unwrap()
          .iter()
          .filter(|f| f.person_id == Some(person_id))
          .cloned()
          .collect(),
      )
    }

    async fn clear_facts(&self, person_id: u64) -> Result<usize, Self::Error> {
      let mut stored = self.facts.lock().unwrap();
      let before = stored.len();
      stored.retain(|f| f.person_id != Some(person_id));
      Ok(before - stored.len())
    }

    async fn list_people(&self) -> Result<Vec<u64>, Self::Error> {
      let mut ids: Vec<u64> =
        self.facts.lock().unwrap().iter().filter_map(|f| f.person_id).collect();
      ids.sort_unstable();
      ids.dedup();
      Ok(ids)
    }

    async fn get_verdict(&self, person_id: u64) -> Result<Option<StoredVerdict>, Self::Error> {
      Ok(self.verdicts.lock().unwrap().get(&person_id).cloned())
    }

    async fn record_verdict(
      &self,
      person_id: u64,
      verdict: StageResult,
    ) -> Result<Option<StageUpdate>, Self::Error> {
      let mut verdicts = self.verdicts.lock().unwrap();
      let previous = verdicts.get(&person_id).map(|v| v.verdict);
      let update = diff_verdict(previous.as_ref(), &verdict).map(|change| StageUpdate {
        update_id: Uuid::new_v4(),
        person_id,
        previous:  change.previous,
        current:   change.current,
        queued_at: Utc::now(),
      });
      verdicts.insert(person_id, StoredVerdict {
        person_id,
        verdict,
        classified_at: Utc::now(),
      });
      if let Some(u) = &update {
        self.updates.lock().unwrap().push(u.clone());
      }
      Ok(update)
    }

    async fn pending_updates(&self, limit: usize) -> Result<Vec<StageUpdate>, Self::Error> {
      Ok(self.updates.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn ack_update(&self, update_id: Uuid) -> Result<bool, Self::Error> {
      let mut updates = self.updates.lock().unwrap();
      let before = updates.len();
      updates.retain(|u| u.update_id != update_id);
      Ok(updates.len() != before)
    }
  }

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, d).unwrap() }

  #[tokio::test]
  async fn first_classification_queues_update() {
    let store = MemoryStore::default();
    store
      .record_facts(vec![
        RawChecklistFact::new(1).with_checklist("Application Form").completed(day(5)),
      ])
      .await
      .unwrap();

    let r = reclassify(&store, 1).await.unwrap();
    assert_eq!(r.breakdown.stage, Some(Stage::Application));
    let update = r.update.expect("update queued");
    assert_eq!(update.previous, None);
    assert_eq!(update.current.substage, Some(Substage::ApplicationComplete));

    // Same facts again: nothing new to send.
    let again = reclassify(&store, 1).await.unwrap();
    assert!(again.update.is_none());
    assert_eq!(store.pending_updates(10).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn new_fact_moves_verdict_forward() {
    let store = MemoryStore::default();
    store
      .record_facts(vec![
        RawChecklistFact::new(1).with_checklist("Application Form").completed(day(5)),
      ])
      .await
      .unwrap();
    reclassify(&store, 1).await.unwrap();

    let mut accepted = RawChecklistFact::new(1).with_checklist("Decision").completed(day(9));
    accepted.school_decision = Some("Accepted".into());
    store.record_facts(vec![accepted]).await.unwrap();

    let update = reclassify(&store, 1).await.unwrap().update.unwrap();
    assert_eq!(update.previous.and_then(|p| p.stage), Some(Stage::Application));
    assert_eq!(update.current.stage, Some(Stage::Decision));
    assert_eq!(update.current.substage, Some(Substage::Accepted));
  }

  #[tokio::test]
  async fn sweep_counts_people_and_changes() {
    let store = MemoryStore::default();
    store
      .record_facts(vec![
        RawChecklistFact::new(1).with_checklist("Application Form").completed(day(1)),
        RawChecklistFact::new(2).with_item("Interview"),
        RawChecklistFact::default().with_checklist("Application Form").completed(day(1)),
        RawChecklistFact::new(3).with_item("Fairmont Admissions Assessment").requested(day(2)),
      ])
      .await
      .unwrap();

    let summary = reclassify_all(&store).await.unwrap();
    assert_eq!(summary, SweepSummary { people: 3, changed: 2, failed: 0 });

    let again = reclassify_all(&store).await.unwrap();
    assert_eq!(again.changed, 0);
  }

  #[tokio::test]
  async fn unknown_person_is_undetermined() {
    let store = MemoryStore::default();
    let r = reclassify(&store, 42).await.unwrap();
    assert!(r.breakdown.result().is_undetermined());
    assert!(r.update.is_none());
    assert!(store.get_verdict(42).await.unwrap().is_some());
  }
}
