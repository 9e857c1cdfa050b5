//! SQL schema for the stagesync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Raw checklist observations, append-only. `seq` fixes ingestion order,
-- which 'last non-null wins' aggregation depends on.
CREATE TABLE IF NOT EXISTS checklist_facts (
    seq                    INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id              INTEGER NOT NULL,
    checklist_name         TEXT,
    item_name              TEXT,
    completed_on           TEXT,            -- YYYY-MM-DD
    requested_on           TEXT,            -- YYYY-MM-DD
    step_status            TEXT,
    candidate_decision     TEXT,
    school_decision        TEXT,
    reason_declined        TEXT,
    inactive               INTEGER NOT NULL DEFAULT 0,
    contract_publish_date  TEXT,
    contract_return_date   TEXT,
    contract_dep_rec_date  TEXT,
    test_no_show           INTEGER NOT NULL DEFAULT 0,
    test_short_description TEXT,
    recorded_at            TEXT NOT NULL    -- RFC 3339 UTC; server-assigned
);

-- Last verdict per person.
CREATE TABLE IF NOT EXISTS verdicts (
    person_id     INTEGER PRIMARY KEY,
    stage         TEXT,                     -- external stage spelling or NULL
    substage      INTEGER,                  -- 13..28 or NULL
    classified_at TEXT NOT NULL
);

-- Outbox of verdict changes awaiting delivery.
CREATE TABLE IF NOT EXISTS stage_updates (
    update_id      TEXT PRIMARY KEY,
    person_id      INTEGER NOT NULL,
    had_previous   INTEGER NOT NULL,
    prev_stage     TEXT,
    prev_substage  INTEGER,
    stage          TEXT,
    substage       INTEGER,
    queued_at      TEXT NOT NULL,
    acked_at       TEXT
);

CREATE INDEX IF NOT EXISTS checklist_facts_person_idx ON checklist_facts(person_id, seq);
CREATE INDEX IF NOT EXISTS stage_updates_pending_idx  ON stage_updates(acked_at, queued_at);

PRAGMA user_version = 1;
";
