// Pool records: pick submissions, spreads, results, cleared status, grades.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// The picker-supplied fields of a pick submission.
///
/// Pick values are kept exactly as submitted (team name, `"home"`/`"away"`,
/// or a partial name); they are resolved to a side only at grading time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickFields {
    pub away_team: String,
    pub home_team: String,
    /// Away spread shown to the picker when the pick was made.
    pub away_spread: Option<f64>,
    /// Home spread shown to the picker when the pick was made.
    pub home_spread: Option<f64>,
    /// Against-the-spread pick.
    pub line_pick: Option<String>,
    /// Straight-up pick.
    pub winner_pick: Option<String>,
    /// Bonus-pick marker. Has no effect on grading.
    pub blazin: bool,
    /// `"over"` or `"under"`.
    pub over_under_pick: Option<String>,
    /// Totals line shown to the picker when the pick was made.
    pub total_line: Option<f64>,
}

/// One append-only pick submission. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickSubmission {
    /// Insertion order assigned by the event log. Breaks timestamp ties.
    #[serde(default)]
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub week: String,
    pub picker: String,
    pub game_key: String,
    #[serde(flatten)]
    pub fields: PickFields,
}

impl PickSubmission {
    /// Latest-wins ordering: later timestamp wins, equal timestamps fall back
    /// to the later insertion.
    pub fn supersedes(&self, other: &PickSubmission) -> bool {
        (self.timestamp, self.seq) > (other.timestamp, other.seq)
    }
}

// ---------------------------------------------------------------------------
// Spreads and results
// ---------------------------------------------------------------------------

/// The live spread row for a (week, game).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadRecord {
    pub week: String,
    pub game_key: String,
    /// Unsigned magnitude. Direction is carried by `favorite_side`.
    pub spread: f64,
    /// `"home"`, `"away"`, or a team name. Unresolvable values grade as home.
    pub favorite_side: String,
    pub over_under: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A spread write as supplied by a caller. The game key may be left empty
/// when both team names are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadUpdate {
    pub week: String,
    pub game_key: String,
    pub away_team: String,
    pub home_team: String,
    pub spread: f64,
    pub favorite_side: String,
    pub over_under: Option<f64>,
}

/// Straight-up winner, derived from the final score when a result is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameWinner {
    Home,
    Away,
    Tie,
}

impl GameWinner {
    pub fn from_scores(away_score: u32, home_score: u32) -> Self {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => GameWinner::Home,
            std::cmp::Ordering::Less => GameWinner::Away,
            std::cmp::Ordering::Equal => GameWinner::Tie,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameWinner::Home => "home",
            GameWinner::Away => "away",
            GameWinner::Tie => "tie",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home" => Some(GameWinner::Home),
            "away" => Some(GameWinner::Away),
            "tie" => Some(GameWinner::Tie),
            _ => None,
        }
    }
}

/// The live final-score row for a (week, game).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub week: String,
    pub game_key: String,
    pub away_team: String,
    pub home_team: String,
    pub away_score: u32,
    pub home_score: u32,
    pub winner: GameWinner,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

/// A result write as supplied by a caller. `winner` is never accepted from
/// the caller; it is derived from the scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultUpdate {
    pub week: String,
    pub game_key: String,
    pub away_team: String,
    pub home_team: String,
    pub away_score: u32,
    pub home_score: u32,
    pub source: String,
}

// ---------------------------------------------------------------------------
// Cleared status
// ---------------------------------------------------------------------------

/// Records that a picker explicitly cleared their picks for a week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearedStatus {
    pub week: String,
    pub picker: String,
    pub cleared: bool,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Outcome of one graded field. `Ungraded` serializes as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Push,
    #[default]
    #[serde(rename = "")]
    Ungraded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Push => "push",
            Outcome::Ungraded => "",
        }
    }

    /// Parse a stored outcome. Anything unrecognized reads as ungraded.
    pub fn parse(s: &str) -> Self {
        match s {
            "win" => Outcome::Win,
            "loss" => Outcome::Loss,
            "push" => Outcome::Push,
            _ => Outcome::Ungraded,
        }
    }

    pub fn is_graded(&self) -> bool {
        !matches!(self, Outcome::Ungraded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcomes for the three pick types on one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedOutcome {
    pub line_outcome: Outcome,
    pub winner_outcome: Outcome,
    pub ou_outcome: Outcome,
}

impl GradedOutcome {
    pub fn is_graded(&self) -> bool {
        self.line_outcome.is_graded() || self.winner_outcome.is_graded() || self.ou_outcome.is_graded()
    }
}

/// Materialized grade for the current pick of a (week, picker, game).
/// `pick_seq` ties the grade to the submission it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub week: String,
    pub picker: String,
    pub game_key: String,
    pub pick_seq: i64,
    #[serde(flatten)]
    pub outcome: GradedOutcome,
    pub graded_at: DateTime<Utc>,
}

/// A current pick with its outcomes attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedPick {
    #[serde(flatten)]
    pub pick: PickSubmission,
    #[serde(flatten)]
    pub outcome: GradedOutcome,
}

/// Whether an upsert replaced the stored row or lost to a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Applied,
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission(seq: i64, secs: i64) -> PickSubmission {
        PickSubmission {
            seq,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            week: "1".into(),
            picker: "dana".into(),
            game_key: "bills_jets".into(),
            fields: PickFields::default(),
        }
    }

    #[test]
    fn winner_from_scores() {
        assert_eq!(GameWinner::from_scores(17, 20), GameWinner::Home);
        assert_eq!(GameWinner::from_scores(24, 20), GameWinner::Away);
        assert_eq!(GameWinner::from_scores(10, 10), GameWinner::Tie);
    }

    #[test]
    fn winner_string_forms_parse_back() {
        for w in [GameWinner::Home, GameWinner::Away, GameWinner::Tie] {
            assert_eq!(GameWinner::parse(w.as_str()), Some(w));
        }
        assert_eq!(GameWinner::parse("draw"), None);
    }

    #[test]
    fn ungraded_serializes_as_empty_string() {
        let json = serde_json::to_value(GradedOutcome {
            line_outcome: Outcome::Win,
            winner_outcome: Outcome::Push,
            ou_outcome: Outcome::Ungraded,
        })
        .unwrap();
        assert_eq!(json["line_outcome"], "win");
        assert_eq!(json["winner_outcome"], "push");
        assert_eq!(json["ou_outcome"], "");
    }

    #[test]
    fn unknown_stored_outcome_reads_ungraded() {
        assert_eq!(Outcome::parse("loss"), Outcome::Loss);
        assert_eq!(Outcome::parse("WIN"), Outcome::Ungraded);
        assert_eq!(Outcome::parse(""), Outcome::Ungraded);
    }

    #[test]
    fn later_timestamp_supersedes() {
        assert!(submission(1, 200).supersedes(&submission(2, 100)));
        assert!(!submission(2, 100).supersedes(&submission(1, 200)));
    }

    #[test]
    fn equal_timestamps_fall_back_to_insertion_order() {
        assert!(submission(5, 100).supersedes(&submission(4, 100)));
        assert!(!submission(4, 100).supersedes(&submission(5, 100)));
    }

    #[test]
    fn graded_pick_flattens_fields() {
        let pick = GradedPick {
            pick: PickSubmission {
                fields: PickFields {
                    line_pick: Some("Bills".into()),
                    blazin: true,
                    ..PickFields::default()
                },
                ..submission(1, 100)
            },
            outcome: GradedOutcome::default(),
        };
        let json = serde_json::to_value(&pick).unwrap();
        assert_eq!(json["line_pick"], "Bills");
        assert_eq!(json["blazin"], true);
        assert_eq!(json["game_key"], "bills_jets");
        assert_eq!(json["line_outcome"], "");
    }
}
