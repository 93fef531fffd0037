// Event log abstraction: append-only pick history plus upsert tables.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use crate::model::{
    ClearedStatus, GradeRecord, PickSubmission, ResultRecord, SpreadRecord, UpsertStatus,
};

/// Storage consumed by the pool engine.
///
/// Picks are only ever appended. Spreads, results, and cleared flags are
/// upserted by key with last-writer-wins on `updated_at`: a write older than
/// the stored row is rejected as [`UpsertStatus::Stale`], an equal or newer
/// one replaces it. Grades always overwrite.
///
/// Timestamps reach the log truncated to microseconds, the precision the
/// SQLite backend stores, so every implementation orders them alike.
///
/// Every `week` filter is optional; `None` reads the whole table.
pub trait EventLog {
    /// Append a submission, returning it with its insertion `seq` assigned.
    fn append_pick(&self, submission: PickSubmission) -> Result<PickSubmission>;
    fn upsert_spread(&self, record: &SpreadRecord) -> Result<UpsertStatus>;
    fn upsert_result(&self, record: &ResultRecord) -> Result<UpsertStatus>;
    fn upsert_cleared(&self, record: &ClearedStatus) -> Result<UpsertStatus>;
    fn upsert_grade(&self, record: &GradeRecord) -> Result<()>;

    fn all_picks(&self, week: Option<&str>) -> Result<Vec<PickSubmission>>;
    fn all_spreads(&self, week: Option<&str>) -> Result<Vec<SpreadRecord>>;
    fn all_results(&self, week: Option<&str>) -> Result<Vec<ResultRecord>>;
    fn all_cleared(&self, week: Option<&str>) -> Result<Vec<ClearedStatus>>;
    fn all_grades(&self, week: Option<&str>) -> Result<Vec<GradeRecord>>;

    fn spread_for(&self, week: &str, game_key: &str) -> Result<Option<SpreadRecord>> {
        Ok(self
            .all_spreads(Some(week))?
            .into_iter()
            .find(|s| s.game_key == game_key))
    }

    fn result_for(&self, week: &str, game_key: &str) -> Result<Option<ResultRecord>> {
        Ok(self
            .all_results(Some(week))?
            .into_iter()
            .find(|r| r.game_key == game_key))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

type WeekKey = (String, String);

#[derive(Default)]
struct Tables {
    picks: Vec<PickSubmission>,
    spreads: HashMap<WeekKey, SpreadRecord>,
    results: HashMap<WeekKey, ResultRecord>,
    cleared: HashMap<WeekKey, ClearedStatus>,
    grades: HashMap<(String, String, String), GradeRecord>,
}

/// Ephemeral [`EventLog`] kept entirely in memory. Reads return rows in
/// insertion order for picks and key order for the upsert tables.
#[derive(Default)]
pub struct MemoryLog {
    tables: Mutex<Tables>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory log mutex poisoned")
    }
}

fn upsert_newer<T: Clone>(
    table: &mut HashMap<WeekKey, T>,
    key: WeekKey,
    record: &T,
    updated_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> UpsertStatus {
    if let Some(existing) = table.get(&key) {
        if updated_at(existing) > updated_at(record) {
            return UpsertStatus::Stale;
        }
    }
    table.insert(key, record.clone());
    UpsertStatus::Applied
}

fn matches_week(filter: Option<&str>, week: &str) -> bool {
    filter.is_none_or(|w| w == week)
}

fn sorted_rows<T: Clone>(
    table: &HashMap<WeekKey, T>,
    week: Option<&str>,
) -> Vec<T> {
    let mut keys: Vec<&WeekKey> = table
        .keys()
        .filter(|(w, _)| matches_week(week, w))
        .collect();
    keys.sort();
    keys.into_iter().map(|k| table[k].clone()).collect()
}

impl EventLog for MemoryLog {
    fn append_pick(&self, mut submission: PickSubmission) -> Result<PickSubmission> {
        let mut tables = self.tables();
        submission.seq = tables.picks.len() as i64 + 1;
        tables.picks.push(submission.clone());
        Ok(submission)
    }

    fn upsert_spread(&self, record: &SpreadRecord) -> Result<UpsertStatus> {
        let key = (record.week.clone(), record.game_key.clone());
        Ok(upsert_newer(&mut self.tables().spreads, key, record, |r| r.updated_at))
    }

    fn upsert_result(&self, record: &ResultRecord) -> Result<UpsertStatus> {
        let key = (record.week.clone(), record.game_key.clone());
        Ok(upsert_newer(&mut self.tables().results, key, record, |r| r.updated_at))
    }

    fn upsert_cleared(&self, record: &ClearedStatus) -> Result<UpsertStatus> {
        let key = (record.week.clone(), record.picker.clone());
        Ok(upsert_newer(&mut self.tables().cleared, key, record, |r| r.updated_at))
    }

    fn upsert_grade(&self, record: &GradeRecord) -> Result<()> {
        let key = (
            record.week.clone(),
            record.picker.clone(),
            record.game_key.clone(),
        );
        self.tables().grades.insert(key, record.clone());
        Ok(())
    }

    fn all_picks(&self, week: Option<&str>) -> Result<Vec<PickSubmission>> {
        Ok(self
            .tables()
            .picks
            .iter()
            .filter(|p| matches_week(week, &p.week))
            .cloned()
            .collect())
    }

    fn all_spreads(&self, week: Option<&str>) -> Result<Vec<SpreadRecord>> {
        Ok(sorted_rows(&self.tables().spreads, week))
    }

    fn all_results(&self, week: Option<&str>) -> Result<Vec<ResultRecord>> {
        Ok(sorted_rows(&self.tables().results, week))
    }

    fn all_cleared(&self, week: Option<&str>) -> Result<Vec<ClearedStatus>> {
        Ok(sorted_rows(&self.tables().cleared, week))
    }

    fn all_grades(&self, week: Option<&str>) -> Result<Vec<GradeRecord>> {
        let tables = self.tables();
        let mut grades: Vec<GradeRecord> = tables
            .grades
            .values()
            .filter(|g| matches_week(week, &g.week))
            .cloned()
            .collect();
        grades.sort_by(|a, b| {
            (&a.week, &a.picker, &a.game_key).cmp(&(&b.week, &b.picker, &b.game_key))
        });
        Ok(grades)
    }
}
