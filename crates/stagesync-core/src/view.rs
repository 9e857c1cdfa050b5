//! The per-person read model produced by aggregation.
//!
//! A [`PersonView`] is never stored; it is re-derived from the full fact set
//! for a person on every aggregation run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Item status ─────────────────────────────────────────────────────────────

/// Progress of a single named checklist item.
///
/// Ordered so that `Complete > Requested`; aggregation only ever moves an
/// item upwards.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
  Requested,
  Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
  pub name:   String,
  pub status: ItemState,
}

// ─── PersonView ──────────────────────────────────────────────────────────────

/// Canonical snapshot of one person's checklist state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonView {
  pub person_id:              u64,
  /// Checklist-level labels → "at least one completed fact".
  pub checklist_completion:   BTreeMap<String, bool>,
  /// Item-level labels → "at least one completed fact".
  pub item_completion:        BTreeMap<String, bool>,
  /// One entry per distinct item name, in first-seen order.
  pub item_status:            Vec<ItemStatus>,
  pub test_no_show:           bool,
  pub test_short_description: Option<String>,
  pub candidate_decision:     Option<String>,
  pub school_decision:        Option<String>,
  pub reason_declined:        Option<String>,
  pub inactive:               bool,
  pub contract_publish_date:  Option<NaiveDate>,
  pub contract_return_date:   Option<NaiveDate>,
  pub contract_dep_rec_date:  Option<NaiveDate>,
}

impl PersonView {
  /// A view with no observations.
  pub fn empty(person_id: u64) -> Self {
    Self {
      person_id,
      checklist_completion: BTreeMap::new(),
      item_completion: BTreeMap::new(),
      item_status: Vec::new(),
      test_no_show: false,
      test_short_description: None,
      candidate_decision: None,
      school_decision: None,
      reason_declined: None,
      inactive: false,
      contract_publish_date: None,
      contract_return_date: None,
      contract_dep_rec_date: None,
    }
  }

  /// Whether `label` has a completed fact under either the checklist-name or
  /// the item-name scheme.
  pub fn is_completed(&self, label: &str) -> bool {
    self.checklist_completion.get(label).copied().unwrap_or(false)
      || self.item_completion.get(label).copied().unwrap_or(false)
  }

  /// Find the first item (in first-seen order) whose name equals `label`,
  /// contains it, or is contained in it.
  ///
  /// When several names match, the earliest-seen wins; there is no other
  /// tie-break.
  pub fn find_item(&self, label: &str) -> Option<&ItemStatus> {
    self.item_status.iter().find(|item| {
      item.name == label || item.name.contains(label) || label.contains(item.name.as_str())
    })
  }

  /// Status of the item matched by [`Self::find_item`].
  pub fn item_state(&self, label: &str) -> Option<ItemState> {
    self.find_item(label).map(|item| item.status)
  }

  /// Whether the no-show description mentions `needle`.
  pub fn no_show_for(&self, needle: &str) -> bool {
    self.test_no_show
      && self
        .test_short_description
        .as_deref()
        .is_some_and(|d| d.contains(needle))
  }
}
