//! Raw checklist facts: one observation about one person at one step.
//!
//! Facts arrive from external pollers in no guaranteed order, and the same
//! person may appear in many rows. Every field except `person_id` is
//! optional; a fact without a `person_id` cannot be attributed to anyone and
//! is dropped before aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize;

/// `step_status` values that count as completion even without a date.
pub const COMPLETED_STEP_STATUSES: [&str; 2] = ["Completed", "Waived"];

/// A single checklist observation as delivered by an upstream source.
///
/// Deserialisation is lenient: malformed ids, dates and flags are coerced to
/// `None`/`false` rather than rejecting the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChecklistFact {
  #[serde(default, deserialize_with = "normalize::person_id")]
  pub person_id:              Option<u64>,
  /// Checklist group label, e.g. "Application Form".
  #[serde(default, deserialize_with = "normalize::text")]
  pub checklist_name:         Option<String>,
  /// Step label within a checklist, e.g. "Fairmont Admissions Assessment".
  #[serde(default, deserialize_with = "normalize::text")]
  pub item_name:              Option<String>,
  #[serde(default, deserialize_with = "normalize::date")]
  pub completed_on:           Option<NaiveDate>,
  #[serde(default, deserialize_with = "normalize::date")]
  pub requested_on:           Option<NaiveDate>,
  #[serde(default, deserialize_with = "normalize::text")]
  pub step_status:            Option<String>,
  #[serde(default, deserialize_with = "normalize::text")]
  pub candidate_decision:     Option<String>,
  #[serde(default, deserialize_with = "normalize::text")]
  pub school_decision:        Option<String>,
  /// Informational only; never consulted by classification.
  #[serde(default, deserialize_with = "normalize::text")]
  pub reason_declined:        Option<String>,
  #[serde(default, deserialize_with = "normalize::flag")]
  pub inactive:               bool,
  #[serde(default, deserialize_with = "normalize::date")]
  pub contract_publish_date:  Option<NaiveDate>,
  #[serde(default, deserialize_with = "normalize::date")]
  pub contract_return_date:   Option<NaiveDate>,
  #[serde(default, deserialize_with = "normalize::date")]
  pub contract_dep_rec_date:  Option<NaiveDate>,
  #[serde(default, deserialize_with = "normalize::flag")]
  pub test_no_show:           bool,
  /// Which assessment a no-show relates to.
  #[serde(default, deserialize_with = "normalize::text")]
  pub test_short_description: Option<String>,
}

impl RawChecklistFact {
  /// An otherwise-empty fact for `person_id`; fill fields with struct update
  /// syntax or the `with_*` helpers.
  pub fn new(person_id: u64) -> Self {
    Self { person_id: Some(person_id), ..Self::default() }
  }

  pub fn with_checklist(mut self, name: impl Into<String>) -> Self {
    self.checklist_name = Some(name.into());
    self
  }

  pub fn with_item(mut self, name: impl Into<String>) -> Self {
    self.item_name = Some(name.into());
    self
  }

  pub fn completed(mut self, on: NaiveDate) -> Self {
    self.completed_on = Some(on);
    self
  }

  pub fn requested(mut self, on: NaiveDate) -> Self {
    self.requested_on = Some(on);
    self
  }

  /// A fact counts as complete when it has a completion date or a
  /// `Completed`/`Waived` step status.
  pub fn is_complete(&self) -> bool {
    self.completed_on.is_some()
      || self.step_status.as_deref().is_some_and(|s| {
        let s = s.trim();
        COMPLETED_STEP_STATUSES
          .iter()
          .any(|c| c.eq_ignore_ascii_case(s))
      })
  }

  /// Requested but not (yet) complete.
  pub fn is_requested(&self) -> bool {
    !self.is_complete() && self.requested_on.is_some()
  }
}
