// SQLite persistence layer for the pool event log.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::model::{
    ClearedStatus, GameWinner, GradeRecord, GradedOutcome, Outcome, PickFields, PickSubmission,
    ResultRecord, SpreadRecord, UpsertStatus,
};
use crate::store::EventLog;

/// SQLite-backed [`EventLog`]: an append-only `pick_submissions` table plus
/// keyed upsert tables for spreads, results, cleared flags, and grades.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS pick_submissions (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp       TEXT NOT NULL,
                week            TEXT NOT NULL,
                picker          TEXT NOT NULL,
                game_key        TEXT NOT NULL,
                away_team       TEXT NOT NULL,
                home_team       TEXT NOT NULL,
                away_spread     REAL,
                home_spread     REAL,
                line_pick       TEXT,
                winner_pick     TEXT,
                blazin          INTEGER NOT NULL DEFAULT 0,
                over_under_pick TEXT,
                total_line      REAL
            );

            CREATE TABLE IF NOT EXISTS spreads (
                week          TEXT NOT NULL,
                game_key      TEXT NOT NULL,
                spread        REAL NOT NULL,
                favorite_side TEXT NOT NULL,
                over_under    REAL,
                updated_at    TEXT NOT NULL,
                PRIMARY KEY (week, game_key)
            );

            CREATE TABLE IF NOT EXISTS results (
                week       TEXT NOT NULL,
                game_key   TEXT NOT NULL,
                away_team  TEXT NOT NULL,
                home_team  TEXT NOT NULL,
                away_score INTEGER NOT NULL,
                home_score INTEGER NOT NULL,
                winner     TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                source     TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (week, game_key)
            );

            CREATE TABLE IF NOT EXISTS cleared (
                week       TEXT NOT NULL,
                picker     TEXT NOT NULL,
                cleared    INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (week, picker)
            );

            CREATE TABLE IF NOT EXISTS grades (
                week           TEXT NOT NULL,
                picker         TEXT NOT NULL,
                game_key       TEXT NOT NULL,
                pick_seq       INTEGER NOT NULL,
                line_outcome   TEXT NOT NULL DEFAULT '',
                winner_outcome TEXT NOT NULL DEFAULT '',
                ou_outcome     TEXT NOT NULL DEFAULT '',
                graded_at      TEXT NOT NULL,
                PRIMARY KEY (week, picker, game_key)
            );
            ",
        )
        .context("failed to create database schema")?;

        // The projection scans one (week, picker, game) group at a time.
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_pick_submissions_week
                 ON pick_submissions(week, picker, game_key);",
        )
        .context("failed to create pick_submissions index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Count every stored pick submission, superseded ones included.
    pub fn submission_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM pick_submissions", [], |row| row.get(0))
            .context("failed to count pick submissions")?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Timestamp encoding
// ---------------------------------------------------------------------------

/// Fixed-width RFC 3339 (microseconds, `Z` suffix) so that string comparison
/// in SQL orders the same as time.
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_winner(row: &Row<'_>, idx: usize) -> rusqlite::Result<GameWinner> {
    let raw: String = row.get(idx)?;
    GameWinner::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown winner '{raw}'").into(),
        )
    })
}

fn status_from_changes(changed: usize) -> UpsertStatus {
    if changed == 0 {
        UpsertStatus::Stale
    } else {
        UpsertStatus::Applied
    }
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

const PICK_COLUMNS: &str = "seq, timestamp, week, picker, game_key, away_team, home_team,
     away_spread, home_spread, line_pick, winner_pick, blazin, over_under_pick, total_line";

fn pick_from_row(row: &Row<'_>) -> rusqlite::Result<PickSubmission> {
    Ok(PickSubmission {
        seq: row.get(0)?,
        timestamp: decode_ts(row, 1)?,
        week: row.get(2)?,
        picker: row.get(3)?,
        game_key: row.get(4)?,
        fields: PickFields {
            away_team: row.get(5)?,
            home_team: row.get(6)?,
            away_spread: row.get(7)?,
            home_spread: row.get(8)?,
            line_pick: row.get(9)?,
            winner_pick: row.get(10)?,
            blazin: row.get(11)?,
            over_under_pick: row.get(12)?,
            total_line: row.get(13)?,
        },
    })
}

const SPREAD_COLUMNS: &str = "week, game_key, spread, favorite_side, over_under, updated_at";

fn spread_from_row(row: &Row<'_>) -> rusqlite::Result<SpreadRecord> {
    Ok(SpreadRecord {
        week: row.get(0)?,
        game_key: row.get(1)?,
        spread: row.get(2)?,
        favorite_side: row.get(3)?,
        over_under: row.get(4)?,
        updated_at: decode_ts(row, 5)?,
    })
}

const RESULT_COLUMNS: &str =
    "week, game_key, away_team, home_team, away_score, home_score, winner, updated_at, source";

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    Ok(ResultRecord {
        week: row.get(0)?,
        game_key: row.get(1)?,
        away_team: row.get(2)?,
        home_team: row.get(3)?,
        away_score: row.get(4)?,
        home_score: row.get(5)?,
        winner: decode_winner(row, 6)?,
        updated_at: decode_ts(row, 7)?,
        source: row.get(8)?,
    })
}

fn cleared_from_row(row: &Row<'_>) -> rusqlite::Result<ClearedStatus> {
    Ok(ClearedStatus {
        week: row.get(0)?,
        picker: row.get(1)?,
        cleared: row.get(2)?,
        updated_at: decode_ts(row, 3)?,
    })
}

fn grade_from_row(row: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let line: String = row.get(4)?;
    let winner: String = row.get(5)?;
    let ou: String = row.get(6)?;
    Ok(GradeRecord {
        week: row.get(0)?,
        picker: row.get(1)?,
        game_key: row.get(2)?,
        pick_seq: row.get(3)?,
        outcome: GradedOutcome {
            line_outcome: Outcome::parse(&line),
            winner_outcome: Outcome::parse(&winner),
            ou_outcome: Outcome::parse(&ou),
        },
        graded_at: decode_ts(row, 7)?,
    })
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

impl EventLog for Database {
    /// Append a submission. `seq` on the input is ignored; the stored row's
    /// autoincrement id is returned in its place.
    fn append_pick(&self, mut submission: PickSubmission) -> Result<PickSubmission> {
        let conn = self.conn();
        let f = &submission.fields;
        conn.execute(
            "INSERT INTO pick_submissions
                (timestamp, week, picker, game_key, away_team, home_team, away_spread,
                 home_spread, line_pick, winner_pick, blazin, over_under_pick, total_line)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                encode_ts(&submission.timestamp),
                submission.week,
                submission.picker,
                submission.game_key,
                f.away_team,
                f.home_team,
                f.away_spread,
                f.home_spread,
                f.line_pick,
                f.winner_pick,
                f.blazin,
                f.over_under_pick,
                f.total_line,
            ],
        )
        .context("failed to append pick submission")?;
        submission.seq = conn.last_insert_rowid();
        Ok(submission)
    }

    fn upsert_spread(&self, record: &SpreadRecord) -> Result<UpsertStatus> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "INSERT INTO spreads (week, game_key, spread, favorite_side, over_under, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(week, game_key) DO UPDATE SET
                    spread        = excluded.spread,
                    favorite_side = excluded.favorite_side,
                    over_under    = excluded.over_under,
                    updated_at    = excluded.updated_at
                 WHERE excluded.updated_at >= spreads.updated_at",
                params![
                    record.week,
                    record.game_key,
                    record.spread,
                    record.favorite_side,
                    record.over_under,
                    encode_ts(&record.updated_at),
                ],
            )
            .context("failed to upsert spread")?;
        Ok(status_from_changes(changed))
    }

    fn upsert_result(&self, record: &ResultRecord) -> Result<UpsertStatus> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "INSERT INTO results
                    (week, game_key, away_team, home_team, away_score, home_score, winner, updated_at, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(week, game_key) DO UPDATE SET
                    away_team  = excluded.away_team,
                    home_team  = excluded.home_team,
                    away_score = excluded.away_score,
                    home_score = excluded.home_score,
                    winner     = excluded.winner,
                    updated_at = excluded.updated_at,
                    source     = excluded.source
                 WHERE excluded.updated_at >= results.updated_at",
                params![
                    record.week,
                    record.game_key,
                    record.away_team,
                    record.home_team,
                    record.away_score,
                    record.home_score,
                    record.winner.as_str(),
                    encode_ts(&record.updated_at),
                    record.source,
                ],
            )
            .context("failed to upsert result")?;
        Ok(status_from_changes(changed))
    }

    fn upsert_cleared(&self, record: &ClearedStatus) -> Result<UpsertStatus> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "INSERT INTO cleared (week, picker, cleared, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(week, picker) DO UPDATE SET
                    cleared    = excluded.cleared,
                    updated_at = excluded.updated_at
                 WHERE excluded.updated_at >= cleared.updated_at",
                params![
                    record.week,
                    record.picker,
                    record.cleared,
                    encode_ts(&record.updated_at),
                ],
            )
            .context("failed to upsert cleared status")?;
        Ok(status_from_changes(changed))
    }

    fn upsert_grade(&self, record: &GradeRecord) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO grades
                (week, picker, game_key, pick_seq, line_outcome, winner_outcome, ou_outcome, graded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.week,
                record.picker,
                record.game_key,
                record.pick_seq,
                record.outcome.line_outcome.as_str(),
                record.outcome.winner_outcome.as_str(),
                record.outcome.ou_outcome.as_str(),
                encode_ts(&record.graded_at),
            ],
        )
        .context("failed to upsert grade")?;
        Ok(())
    }

    fn all_picks(&self, week: Option<&str>) -> Result<Vec<PickSubmission>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PICK_COLUMNS} FROM pick_submissions
                 WHERE (?1 IS NULL OR week = ?1) ORDER BY seq"
            ))
            .context("failed to prepare all_picks query")?;
        let picks = stmt
            .query_map(params![week], pick_from_row)
            .context("failed to query pick submissions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pick submission rows")?;
        Ok(picks)
    }

    fn all_spreads(&self, week: Option<&str>) -> Result<Vec<SpreadRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SPREAD_COLUMNS} FROM spreads
                 WHERE (?1 IS NULL OR week = ?1) ORDER BY week, game_key"
            ))
            .context("failed to prepare all_spreads query")?;
        let spreads = stmt
            .query_map(params![week], spread_from_row)
            .context("failed to query spreads")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map spread rows")?;
        Ok(spreads)
    }

    fn all_results(&self, week: Option<&str>) -> Result<Vec<ResultRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RESULT_COLUMNS} FROM results
                 WHERE (?1 IS NULL OR week = ?1) ORDER BY week, game_key"
            ))
            .context("failed to prepare all_results query")?;
        let results = stmt
            .query_map(params![week], result_from_row)
            .context("failed to query results")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map result rows")?;
        Ok(results)
    }

    fn all_cleared(&self, week: Option<&str>) -> Result<Vec<ClearedStatus>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT week, picker, cleared, updated_at FROM cleared
                 WHERE (?1 IS NULL OR week = ?1) ORDER BY week, picker",
            )
            .context("failed to prepare all_cleared query")?;
        let rows = stmt
            .query_map(params![week], cleared_from_row)
            .context("failed to query cleared status")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map cleared rows")?;
        Ok(rows)
    }

    fn all_grades(&self, week: Option<&str>) -> Result<Vec<GradeRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT week, picker, game_key, pick_seq, line_outcome, winner_outcome,
                        ou_outcome, graded_at
                 FROM grades WHERE (?1 IS NULL OR week = ?1) ORDER BY week, picker, game_key",
            )
            .context("failed to prepare all_grades query")?;
        let rows = stmt
            .query_map(params![week], grade_from_row)
            .context("failed to query grades")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map grade rows")?;
        Ok(rows)
    }

    fn spread_for(&self, week: &str, game_key: &str) -> Result<Option<SpreadRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SPREAD_COLUMNS} FROM spreads WHERE week = ?1 AND game_key = ?2"
            ))
            .context("failed to prepare spread_for query")?;
        let mut rows = stmt
            .query_map(params![week, game_key], spread_from_row)
            .context("failed to query spread")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read spread row")?)),
            None => Ok(None),
        }
    }

    fn result_for(&self, week: &str, game_key: &str) -> Result<Option<ResultRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RESULT_COLUMNS} FROM results WHERE week = ?1 AND game_key = ?2"
            ))
            .context("failed to prepare result_for query")?;
        let mut rows = stmt
            .query_map(params![week, game_key], result_from_row)
            .context("failed to query result")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read result row")?)),
            None => Ok(None),
        }
    }
}
