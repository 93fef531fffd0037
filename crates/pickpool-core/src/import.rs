// Bulk import of pick submissions from a spreadsheet CSV export.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PoolError, PoolResult};
use crate::model::PickFields;
use crate::pool::PickPool;
use crate::store::EventLog;

/// One row of a picks export. Column names match the header row.
#[derive(Debug, Deserialize)]
struct PickRow {
    timestamp: String,
    week: String,
    picker: String,
    #[serde(default)]
    game_key: String,
    #[serde(default)]
    away_team: String,
    #[serde(default)]
    home_team: String,
    away_spread: Option<f64>,
    home_spread: Option<f64>,
    line_pick: Option<String>,
    winner_pick: Option<String>,
    #[serde(default)]
    blazin: String,
    over_under_pick: Option<String>,
    total_line: Option<f64>,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub submitted: usize,
    pub rejected: usize,
}

/// Parse an export timestamp: RFC 3339, or the spreadsheet's
/// `M/D/YYYY H:MM:SS` form read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Submit every row of a picks CSV. Malformed rows and rows missing a
/// required field are counted as rejected and skipped; a store failure
/// aborts the import.
pub fn import_picks_csv<L: EventLog, R: Read>(
    pool: &PickPool<L>,
    reader: R,
) -> PoolResult<ImportSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    for (idx, record) in csv_reader.deserialize::<PickRow>().enumerate() {
        let line = idx + 2;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed CSV row {}: {}", line, e);
                summary.rejected += 1;
                continue;
            }
        };
        let Some(timestamp) = parse_timestamp(&row.timestamp) else {
            warn!("Skipping CSV row {}: bad timestamp '{}'", line, row.timestamp);
            summary.rejected += 1;
            continue;
        };

        let fields = PickFields {
            away_team: row.away_team,
            home_team: row.home_team,
            away_spread: row.away_spread,
            home_spread: row.home_spread,
            line_pick: non_blank(row.line_pick),
            winner_pick: non_blank(row.winner_pick),
            blazin: truthy(&row.blazin),
            over_under_pick: non_blank(row.over_under_pick),
            total_line: row.total_line,
        };

        match pool.submit_pick(&row.week, &row.picker, &row.game_key, fields, timestamp) {
            Ok(_) => summary.submitted += 1,
            Err(PoolError::MissingRequiredField { field }) => {
                warn!("Skipping CSV row {}: missing {}", line, field);
                summary.rejected += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "CSV import finished: {} submitted, {} rejected",
        summary.submitted, summary.rejected
    );
    Ok(summary)
}
