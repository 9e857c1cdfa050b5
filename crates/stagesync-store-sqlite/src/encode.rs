//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as
//! `YYYY-MM-DD`, stages by their external spelling, substages by their
//! integer code, and UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use stagesync_core::{
  classify::{Stage, StageResult, Substage},
  fact::RawChecklistFact,
  normalize::parse_date,
  store::{StageUpdate, StoredVerdict},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: Option<NaiveDate>) -> Option<String> {
  d.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Unparseable stored dates read back as `None`, matching how malformed
/// dates are treated on ingestion.
pub fn decode_date(s: Option<String>) -> Option<NaiveDate> {
  s.as_deref().and_then(parse_date)
}

// ─── Person id ────────────────────────────────────────────────────────────────

pub fn encode_person_id(id: u64) -> Result<i64> {
  i64::try_from(id).map_err(|_| Error::PersonIdRange(id.to_string()))
}

pub fn decode_person_id(v: i64) -> Result<u64> {
  u64::try_from(v).map_err(|_| Error::PersonIdRange(v.to_string()))
}

// ─── Stage / Substage ─────────────────────────────────────────────────────────

pub fn encode_stage(s: Option<Stage>) -> Option<String> {
  s.map(|s| s.as_ref().to_owned())
}

pub fn decode_stage(s: Option<String>) -> Result<Option<Stage>> {
  s.map(|s| {
    s.parse::<Stage>()
      .map_err(|_| Error::from(stagesync_core::Error::UnknownStage(s)))
  })
  .transpose()
}

pub fn encode_substage(s: Option<Substage>) -> Option<i64> {
  s.map(|s| i64::from(s.code()))
}

pub fn decode_substage(v: Option<i64>) -> Result<Option<Substage>> {
  v.map(|v| {
    u8::try_from(v)
      .map_err(|_| stagesync_core::Error::InvalidSubstage(v))
      .and_then(Substage::try_from)
      .map_err(Error::from)
  })
  .transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for one `checklist_facts` row, ready to bind.
pub struct FactRow {
  pub person_id:              i64,
  pub checklist_name:         Option<String>,
  pub item_name:              Option<String>,
  pub completed_on:           Option<String>,
  pub requested_on:           Option<String>,
  pub step_status:            Option<String>,
  pub candidate_decision:     Option<String>,
  pub school_decision:        Option<String>,
  pub reason_declined:        Option<String>,
  pub inactive:               bool,
  pub contract_publish_date:  Option<String>,
  pub contract_return_date:   Option<String>,
  pub contract_dep_rec_date:  Option<String>,
  pub test_no_show:           bool,
  pub test_short_description: Option<String>,
}

impl FactRow {
  /// `None` for facts that cannot be attributed to a person.
  pub fn from_fact(f: RawChecklistFact) -> Result<Option<Self>> {
    let Some(person_id) = f.person_id else {
      return Ok(None);
    };
    Ok(Some(Self {
      person_id:              encode_person_id(person_id)?,
      checklist_name:         f.checklist_name,
      item_name:              f.item_name,
      completed_on:           encode_date(f.completed_on),
      requested_on:           encode_date(f.requested_on),
      step_status:            f.step_status,
      candidate_decision:     f.candidate_decision,
      school_decision:        f.school_decision,
      reason_declined:        f.reason_declined,
      inactive:               f.inactive,
      contract_publish_date:  encode_date(f.contract_publish_date),
      contract_return_date:   encode_date(f.contract_return_date),
      contract_dep_rec_date:  encode_date(f.contract_dep_rec_date),
      test_no_show:           f.test_no_show,
      test_short_description: f.test_short_description,
    }))
  }

  pub fn into_fact(self) -> Result<RawChecklistFact> {
    Ok(RawChecklistFact {
      person_id:              Some(decode_person_id(self.person_id)?),
      checklist_name:         self.checklist_name,
      item_name:              self.item_name,
      completed_on:           decode_date(self.completed_on),
      requested_on:           decode_date(self.requested_on),
      step_status:            self.step_status,
      candidate_decision:     self.candidate_decision,
      school_decision:        self.school_decision,
      reason_declined:        self.reason_declined,
      inactive:               self.inactive,
      contract_publish_date:  decode_date(self.contract_publish_date),
      contract_return_date:   decode_date(self.contract_return_date),
      contract_dep_rec_date:  decode_date(self.contract_dep_rec_date),
      test_no_show:           self.test_no_show,
      test_short_description: self.test_short_description,
    })
  }

  /// Read a row selected with [`FACT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:              row.get(0)?,
      checklist_name:         row.get(1)?,
      item_name:              row.get(2)?,
      completed_on:           row.get(3)?,
      requested_on:           row.get(4)?,
      step_status:            row.get(5)?,
      candidate_decision:     row.get(6)?,
      school_decision:        row.get(7)?,
      reason_declined:        row.get(8)?,
      inactive:               row.get(9)?,
      contract_publish_date:  row.get(10)?,
      contract_return_date:   row.get(11)?,
      contract_dep_rec_date:  row.get(12)?,
      test_no_show:           row.get(13)?,
      test_short_description: row.get(14)?,
    })
  }
}

/// Column list matching [`FactRow::from_row`].
pub const FACT_COLUMNS: &str = "person_id, checklist_name, item_name, completed_on, \
   requested_on, step_status, candidate_decision, school_decision, reason_declined, \
   inactive, contract_publish_date, contract_return_date, contract_dep_rec_date, \
   test_no_show, test_short_description";

/// Raw values read directly from a `verdicts` row.
pub struct RawVerdict {
  pub person_id:     i64,
  pub stage:         Option<String>,
  pub substage:      Option<i64>,
  pub classified_at: String,
}

impl RawVerdict {
  pub fn result(&self) -> Result<StageResult> {
    Ok(StageResult {
      stage:    decode_stage(self.stage.clone())?,
      substage: decode_substage(self.substage)?,
    })
  }

  pub fn into_verdict(self) -> Result<StoredVerdict> {
    Ok(StoredVerdict {
      person_id:     decode_person_id(self.person_id)?,
      verdict:       self.result()?,
      classified_at: decode_dt(&self.classified_at)?,
    })
  }
}

/// Raw values read directly from a `stage_updates` row.
pub struct RawUpdate {
  pub update_id:     String,
  pub person_id:     i64,
  pub had_previous:  bool,
  pub prev_stage:    Option<String>,
  pub prev_substage: Option<i64>,
  pub stage:         Option<String>,
  pub substage:      Option<i64>,
  pub queued_at:     String,
}

impl RawUpdate {
  pub fn into_update(self) -> Result<StageUpdate> {
    let previous = if self.had_previous {
      Some(StageResult {
        stage:    decode_stage(self.prev_stage)?,
        substage: decode_substage(self.prev_substage)?,
      })
    } else {
      None
    };

    Ok(StageUpdate {
      update_id: decode_uuid(&self.update_id)?,
      person_id: decode_person_id(self.person_id)?,
      previous,
      current: StageResult {
        stage:    decode_stage(self.stage)?,
        substage: decode_substage(self.substage)?,
      },
      queued_at: decode_dt(&self.queued_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stage_columns_use_external_spelling() {
    assert_eq!(encode_stage(Some(Stage::ClosedWon)).as_deref(), Some("Closed Won"));
    assert_eq!(
      decode_stage(Some("Contract Sent".into())).unwrap(),
      Some(Stage::ContractSent)
    );
    assert!(matches!(
      decode_stage(Some("Prospect".into())),
      Err(Error::Core(stagesync_core::Error::UnknownStage(_)))
    ));
  }

  #[test]
  fn substage_columns_are_range_checked() {
    assert_eq!(encode_substage(Some(Substage::Enrolled)), Some(27));
    assert_eq!(decode_substage(Some(27)).unwrap(), Some(Substage::Enrolled));
    assert_eq!(decode_substage(None).unwrap(), None);
    assert!(decode_substage(Some(12)).is_err());
    assert!(decode_substage(Some(-1)).is_err());
    assert!(decode_substage(Some(1000)).is_err());
  }

  #[test]
  fn person_id_must_fit_i64() {
    assert_eq!(encode_person_id(7).unwrap(), 7);
    assert!(encode_person_id(u64::MAX).is_err());
    assert!(decode_person_id(-3).is_err());
  }

  #[test]
  fn malformed_stored_date_reads_as_none() {
    assert_eq!(decode_date(Some("garbage".into())), None);
    assert_eq!(
      decode_date(encode_date(NaiveDate::from_ymd_opt(2024, 2, 29))),
      NaiveDate::from_ymd_opt(2024, 2, 29)
    );
  }
}
