//! [`SqliteStore`], the SQLite implementation of [`FactStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use stagesync_core::{
  classify::StageResult,
  diff::diff_verdict,
  fact::RawChecklistFact,
  store::{FactStore, StageUpdate, StoredVerdict},
};

use crate::{
  Error, Result,
  encode::{
    FACT_COLUMNS, FactRow, RawUpdate, RawVerdict, encode_dt, encode_person_id,
    encode_stage, encode_substage, encode_uuid,
  },
  schema::SCHEMA,
};

/// Carry a domain error out of a `tokio_rusqlite` closure.
fn other(e: Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(e)) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stagesync store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn record_facts(&self, facts: Vec<RawChecklistFact>) -> Result<usize> {
    let rows: Vec<FactRow> = facts
      .into_iter()
      .filter_map(|f| match FactRow::from_fact(f) {
        Ok(row) => row,
        Err(e) => {
          tracing::debug!(error = %e, "dropping fact that cannot be stored");
          None
        }
      })
      .collect();
    let at_str = encode_dt(Utc::now());

    let stored = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO checklist_facts (
               person_id, checklist_name, item_name, completed_on, requested_on,
               step_status, candidate_decision, school_decision, reason_declined,
               inactive, contract_publish_date, contract_return_date,
               contract_dep_rec_date, test_no_show, test_short_description,
               recorded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![
              r.person_id,
              r.checklist_name,
              r.item_name,
              r.completed_on,
              r.requested_on,
              r.step_status,
              r.candidate_decision,
              r.school_decision,
              r.reason_declined,
              r.inactive,
              r.contract_publish_date,
              r.contract_return_date,
              r.contract_dep_rec_date,
              r.test_no_show,
              r.test_short_description,
              at_str,
            ])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    Ok(stored)
  }

  async fn get_facts(&self, person_id: u64) -> Result<Vec<RawChecklistFact>> {
    // Ids that never fit the column were never stored.
    let Ok(id) = encode_person_id(person_id) else {
      return Ok(Vec::new());
    };

    let rows: Vec<FactRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM checklist_facts WHERE person_id = ?1 ORDER BY seq"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id], FactRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(FactRow::into_fact).collect()
  }

  async fn clear_facts(&self, person_id: u64) -> Result<usize> {
    let Ok(id) = encode_person_id(person_id) else {
      return Ok(0);
    };

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM checklist_facts WHERE person_id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    Ok(removed)
  }

  async fn list_people(&self) -> Result<Vec<u64>> {
    let ids: Vec<i64> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT DISTINCT person_id FROM checklist_facts ORDER BY person_id")?;
        let ids = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
      })
      .await?;

    ids.into_iter().map(crate::encode::decode_person_id).collect()
  }

  // ── Verdicts ──────────────────────────────────────────────────────────────

  async fn get_verdict(&self, person_id: u64) -> Result<Option<StoredVerdict>> {
    let Ok(id) = encode_person_id(person_id) else {
      return Ok(None);
    };

    let raw: Option<RawVerdict> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT person_id, stage, substage, classified_at
             FROM verdicts WHERE person_id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(RawVerdict {
                person_id:     row.get(0)?,
                stage:         row.get(1)?,
                substage:      row.get(2)?,
                classified_at: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVerdict::into_verdict).transpose()
  }

  async fn record_verdict(
    &self,
    person_id: u64,
    verdict:   StageResult,
  ) -> Result<Option<StageUpdate>> {
    let id          = encode_person_id(person_id)?;
    let now         = Utc::now();
    let at_str      = encode_dt(now);
    let stage_str   = encode_stage(verdict.stage);
    let substage_id = encode_substage(verdict.substage);

    let update = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let previous: Option<StageResult> = tx
          .query_row(
            "SELECT person_id, stage, substage, classified_at
             FROM verdicts WHERE person_id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(RawVerdict {
                person_id:     row.get(0)?,
                stage:         row.get(1)?,
                substage:      row.get(2)?,
                classified_at: row.get(3)?,
              })
            },
          )
          .optional()?
          .map(|raw| raw.result())
          .transpose()
          .map_err(other)?;

        tx.execute(
          "INSERT INTO verdicts (person_id, stage, substage, classified_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(person_id) DO UPDATE SET
             stage = excluded.stage,
             substage = excluded.substage,
             classified_at = excluded.classified_at",
          rusqlite::params![id, stage_str, substage_id, at_str],
        )?;

        let update = diff_verdict(previous.as_ref(), &verdict).map(|change| StageUpdate {
          update_id: Uuid::new_v4(),
          person_id,
          previous:  change.previous,
          current:   change.current,
          queued_at: now,
        });

        if let Some(u) = &update {
          let prev = u.previous.unwrap_or_default();
          tx.execute(
            "INSERT INTO stage_updates (
               update_id, person_id, had_previous, prev_stage, prev_substage,
               stage, substage, queued_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              encode_uuid(u.update_id),
              id,
              u.previous.is_some(),
              encode_stage(prev.stage),
              encode_substage(prev.substage),
              stage_str,
              substage_id,
              at_str,
            ],
          )?;
        }

        tx.commit()?;
        Ok(update)
      })
      .await?;

    Ok(update)
  }

  // ── Update queue ──────────────────────────────────────────────────────────

  async fn pending_updates(&self, limit: usize) -> Result<Vec<StageUpdate>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawUpdate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT update_id, person_id, had_previous, prev_stage, prev_substage,
                  stage, substage, queued_at
           FROM stage_updates
           WHERE acked_at IS NULL
           ORDER BY rowid
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawUpdate {
              update_id:     row.get(0)?,
              person_id:     row.get(1)?,
              had_previous:  row.get(2)?,
              prev_stage:    row.get(3)?,
              prev_substage: row.get(4)?,
              stage:         row.get(5)?,
              substage:      row.get(6)?,
              queued_at:     row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpdate::into_update).collect()
  }

  async fn ack_update(&self, update_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(update_id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE stage_updates SET acked_at = ?1
           WHERE update_id = ?2 AND acked_at IS NULL",
          rusqlite::params![at_str, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
