// Grading: against-the-spread, straight-up, and totals outcomes.
//
// Everything here is a pure function of (pick, spread, result). A missing
// input or an unresolvable pick value leaves that outcome ungraded; nothing
// in this module fails.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{GameWinner, GradedOutcome, Outcome, PickSubmission, ResultRecord, SpreadRecord};
use crate::side::{favorite_side, resolve_side, Side, SideMatch};

/// Which side covered the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cover {
    Home,
    Away,
    Push,
}

/// Over/under pick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalsPick {
    Over,
    Under,
}

impl TotalsPick {
    /// Accepts `over`/`under` (or `o`/`u`) in any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "over" | "o" => Some(TotalsPick::Over),
            "under" | "u" => Some(TotalsPick::Under),
            _ => None,
        }
    }
}

/// Grade a final score against the spread.
///
/// `spread` is an unsigned magnitude applied to the favorite, resolved from
/// `favorite_side` with the full pick resolution rules, fuzzy team-name
/// matching included: `"Chiefs"` names the away side against
/// `"Kansas City Chiefs"`. Blank, unrecognized, or ambiguous markers mean
/// home. Landing exactly on the number is a push.
pub fn grade_ats(
    spread: f64,
    favorite_side_marker: &str,
    result: &ResultRecord,
    away_team: &str,
    home_team: &str,
) -> Cover {
    let spread = spread.abs();
    let margin = f64::from(result.home_score) - f64::from(result.away_score);
    let adjusted = match favorite_side(favorite_side_marker, away_team, home_team) {
        Side::Home => margin - spread,
        Side::Away => margin + spread,
    };

    if adjusted.abs() < f64::EPSILON {
        Cover::Push
    } else if adjusted > 0.0 {
        Cover::Home
    } else {
        Cover::Away
    }
}

/// Grade a totals pick against `line`.
pub fn grade_total(pick: TotalsPick, line: f64, result: &ResultRecord) -> Outcome {
    let total = f64::from(result.away_score) + f64::from(result.home_score);
    if (total - line).abs() < f64::EPSILON {
        return Outcome::Push;
    }
    match (pick, total > line) {
        (TotalsPick::Over, true) | (TotalsPick::Under, false) => Outcome::Win,
        _ => Outcome::Loss,
    }
}

/// Grade every pick type on one submission.
///
/// Team names for side resolution come from the result when it carries both,
/// otherwise from the submission itself.
pub fn grade_pick(
    pick: &PickSubmission,
    spread: Option<&SpreadRecord>,
    result: Option<&ResultRecord>,
) -> GradedOutcome {
    let Some(result) = result else {
        return GradedOutcome::default();
    };

    let (away_team, home_team) = matchup(pick, result);

    GradedOutcome {
        line_outcome: grade_line(pick, spread, result, away_team, home_team),
        winner_outcome: grade_winner(pick, result, away_team, home_team),
        ou_outcome: grade_over_under(pick, spread, result),
    }
}

fn matchup<'a>(pick: &'a PickSubmission, result: &'a ResultRecord) -> (&'a str, &'a str) {
    if !result.away_team.trim().is_empty() && !result.home_team.trim().is_empty() {
        (&result.away_team, &result.home_team)
    } else {
        (&pick.fields.away_team, &pick.fields.home_team)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn grade_line(
    pick: &PickSubmission,
    spread: Option<&SpreadRecord>,
    result: &ResultRecord,
    away_team: &str,
    home_team: &str,
) -> Outcome {
    let Some(line_pick) = present(&pick.fields.line_pick) else {
        return Outcome::Ungraded;
    };
    let Some(spread) = spread else {
        debug!(
            "No spread for {} week {}; line pick by {} left ungraded",
            pick.game_key, pick.week, pick.picker
        );
        return Outcome::Ungraded;
    };

    let cover = grade_ats(spread.spread, &spread.favorite_side, result, away_team, home_team);
    if cover == Cover::Push {
        return Outcome::Push;
    }

    match resolve_side(line_pick, away_team, home_team) {
        SideMatch::Unresolved | SideMatch::Ambiguous => {
            debug!(
                "Line pick '{}' by {} on {} did not resolve to one side",
                line_pick, pick.picker, pick.game_key
            );
            Outcome::Ungraded
        }
        side => win_or_loss(side.side() == Some(covering_side(cover))),
    }
}

fn covering_side(cover: Cover) -> Side {
    match cover {
        Cover::Away => Side::Away,
        _ => Side::Home,
    }
}

fn grade_winner(
    pick: &PickSubmission,
    result: &ResultRecord,
    away_team: &str,
    home_team: &str,
) -> Outcome {
    let Some(winner_pick) = present(&pick.fields.winner_pick) else {
        return Outcome::Ungraded;
    };
    let winning_side = match result.winner {
        GameWinner::Tie => return Outcome::Push,
        GameWinner::Home => Side::Home,
        GameWinner::Away => Side::Away,
    };

    match resolve_side(winner_pick, away_team, home_team).side() {
        Some(side) => win_or_loss(side == winning_side),
        None => {
            debug!(
                "Winner pick '{}' by {} on {} did not resolve to one side",
                winner_pick, pick.picker, pick.game_key
            );
            Outcome::Ungraded
        }
    }
}

fn grade_over_under(
    pick: &PickSubmission,
    spread: Option<&SpreadRecord>,
    result: &ResultRecord,
) -> Outcome {
    let Some(raw) = present(&pick.fields.over_under_pick) else {
        return Outcome::Ungraded;
    };
    let Some(direction) = TotalsPick::parse(raw) else {
        debug!("Unrecognized over/under pick '{}' by {}", raw, pick.picker);
        return Outcome::Ungraded;
    };
    let line = pick
        .fields
        .total_line
        .or_else(|| spread.and_then(|s| s.over_under));
    match line {
        Some(line) => grade_total(direction, line, result),
        None => Outcome::Ungraded,
    }
}

fn win_or_loss(won: bool) -> Outcome {
    if won {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PickFields;
    use chrono::{TimeZone, Utc};

    const AWAY: &str = "Kansas City Chiefs";
    const HOME: &str = "Denver Broncos";

    fn result(away_score: u32, home_score: u32) -> ResultRecord {
        ResultRecord {
            week: "3".into(),
            game_key: "kansas city chiefs_denver broncos".into(),
            away_team: AWAY.into(),
            home_team: HOME.into(),
            away_score,
            home_score,
            winner: GameWinner::from_scores(away_score, home_score),
            updated_at: Utc.timestamp_opt(1_000, 0).unwrap(),
            source: "test".into(),
        }
    }

    fn spread(points: f64, favorite: &str, over_under: Option<f64>) -> SpreadRecord {
        SpreadRecord {
            week: "3".into(),
            game_key: "kansas city chiefs_denver broncos".into(),
            spread: points,
            favorite_side: favorite.into(),
            over_under,
            updated_at: Utc.timestamp_opt(500, 0).unwrap(),
        }
    }

    fn pick(fields: PickFields) -> PickSubmission {
        PickSubmission {
            seq: 1,
            timestamp: Utc.timestamp_opt(100, 0).unwrap(),
            week: "3".into(),
            picker: "dana".into(),
            game_key: "kansas city chiefs_denver broncos".into(),
            fields: PickFields {
                away_team: AWAY.into(),
                home_team: HOME.into(),
                ..fields
            },
        }
    }

    // ------------------------------------------------------------------
    // grade_ats
    // ------------------------------------------------------------------

    #[test]
    fn home_favorite_landing_on_number_pushes() {
        assert_eq!(grade_ats(3.0, "home", &result(17, 20), AWAY, HOME), Cover::Push);
    }

    #[test]
    fn home_favorite_covering_by_one() {
        assert_eq!(grade_ats(3.0, "home", &result(17, 21), AWAY, HOME), Cover::Home);
    }

    #[test]
    fn away_favorite_failing_to_cover() {
        assert_eq!(grade_ats(7.0, "away", &result(10, 10), AWAY, HOME), Cover::Home);
    }

    #[test]
    fn away_favorite_covering() {
        assert_eq!(grade_ats(3.5, "away", &result(28, 21), AWAY, HOME), Cover::Away);
    }

    #[test]
    fn favorite_given_by_team_name() {
        assert_eq!(grade_ats(3.5, "Chiefs", &result(28, 21), AWAY, HOME), Cover::Away);
        assert_eq!(grade_ats(3.5, AWAY, &result(21, 24), AWAY, HOME), Cover::Home);
    }

    #[test]
    fn unknown_favorite_grades_as_home() {
        assert_eq!(
            grade_ats(3.0, "Packers", &result(17, 20), AWAY, HOME),
            grade_ats(3.0, "home", &result(17, 20), AWAY, HOME)
        );
        assert_eq!(grade_ats(3.0, "", &result(17, 21), AWAY, HOME), Cover::Home);
    }

    #[test]
    fn pick_em_spread_ties_push() {
        assert_eq!(grade_ats(0.0, "home", &result(14, 14), AWAY, HOME), Cover::Push);
    }

    #[test]
    fn negative_spread_is_treated_as_magnitude() {
        assert_eq!(grade_ats(-3.0, "home", &result(17, 20), AWAY, HOME), Cover::Push);
    }

    // ------------------------------------------------------------------
    // grade_pick: line
    // ------------------------------------------------------------------

    #[test]
    fn line_pick_win_and_loss() {
        let s = spread(3.0, "home", None);
        let home_pick = pick(PickFields { line_pick: Some("Broncos".into()), ..Default::default() });
        let away_pick = pick(PickFields { line_pick: Some("away".into()), ..Default::default() });

        let r = result(17, 21);
        assert_eq!(grade_pick(&home_pick, Some(&s), Some(&r)).line_outcome, Outcome::Win);
        assert_eq!(grade_pick(&away_pick, Some(&s), Some(&r)).line_outcome, Outcome::Loss);
    }

    #[test]
    fn line_pick_push_ignores_side() {
        let s = spread(3.0, "home", None);
        let p = pick(PickFields { line_pick: Some("Packers".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, Some(&s), Some(&result(17, 20))).line_outcome, Outcome::Push);
    }

    #[test]
    fn line_pick_without_spread_is_ungraded() {
        let p = pick(PickFields { line_pick: Some("Broncos".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, None, Some(&result(17, 21))).line_outcome, Outcome::Ungraded);
    }

    #[test]
    fn unresolvable_line_pick_is_ungraded() {
        let s = spread(3.0, "home", None);
        let p = pick(PickFields { line_pick: Some("Packers".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, Some(&s), Some(&result(17, 21))).line_outcome, Outcome::Ungraded);
    }

    #[test]
    fn ambiguous_line_pick_is_ungraded() {
        let r = ResultRecord {
            away_team: "New York Jets".into(),
            home_team: "New York Giants".into(),
            ..result(10, 20)
        };
        let s = spread(3.0, "home", None);
        let p = pick(PickFields { line_pick: Some("New York".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, Some(&s), Some(&r)).line_outcome, Outcome::Ungraded);
    }

    // ------------------------------------------------------------------
    // grade_pick: winner
    // ------------------------------------------------------------------

    #[test]
    fn winner_pick_graded_without_spread() {
        let p = pick(PickFields { winner_pick: Some("Chiefs".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, None, Some(&result(24, 20))).winner_outcome, Outcome::Win);
        assert_eq!(grade_pick(&p, None, Some(&result(20, 24))).winner_outcome, Outcome::Loss);
    }

    #[test]
    fn tie_pushes_winner_pick() {
        let p = pick(PickFields { winner_pick: Some("Chiefs".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, None, Some(&result(20, 20))).winner_outcome, Outcome::Push);
    }

    #[test]
    fn no_result_leaves_everything_ungraded() {
        let p = pick(PickFields {
            line_pick: Some("Chiefs".into()),
            winner_pick: Some("Chiefs".into()),
            over_under_pick: Some("over".into()),
            total_line: Some(44.5),
            ..Default::default()
        });
        let outcome = grade_pick(&p, Some(&spread(3.0, "home", Some(44.5))), None);
        assert_eq!(outcome, GradedOutcome::default());
        assert!(!outcome.is_graded());
    }

    #[test]
    fn resolves_against_pick_teams_when_result_has_none() {
        let r = ResultRecord {
            away_team: String::new(),
            home_team: String::new(),
            ..result(24, 20)
        };
        let p = pick(PickFields { winner_pick: Some("Chiefs".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, None, Some(&r)).winner_outcome, Outcome::Win);
    }

    // ------------------------------------------------------------------
    // grade_pick: totals
    // ------------------------------------------------------------------

    #[test]
    fn totals_use_pick_time_line_first() {
        let s = spread(3.0, "home", Some(40.0));
        let p = pick(PickFields {
            over_under_pick: Some("over".into()),
            total_line: Some(44.5),
            ..Default::default()
        });
        // 42 total: over the current line (40) but under the pick-time line.
        assert_eq!(grade_pick(&p, Some(&s), Some(&result(21, 21))).ou_outcome, Outcome::Loss);
    }

    #[test]
    fn totals_fall_back_to_spread_line() {
        let s = spread(3.0, "home", Some(40.0));
        let p = pick(PickFields { over_under_pick: Some("Under".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, Some(&s), Some(&result(10, 20))).ou_outcome, Outcome::Win);
        assert_eq!(grade_pick(&p, Some(&s), Some(&result(20, 20))).ou_outcome, Outcome::Push);
    }

    #[test]
    fn totals_without_any_line_are_ungraded() {
        let p = pick(PickFields { over_under_pick: Some("over".into()), ..Default::default() });
        assert_eq!(grade_pick(&p, None, Some(&result(30, 30))).ou_outcome, Outcome::Ungraded);
    }

    #[test]
    fn unknown_totals_direction_is_ungraded() {
        let p = pick(PickFields {
            over_under_pick: Some("sideways".into()),
            total_line: Some(40.0),
            ..Default::default()
        });
        assert_eq!(grade_pick(&p, None, Some(&result(30, 30))).ou_outcome, Outcome::Ungraded);
    }

    #[test]
    fn totals_pick_parsing() {
        assert_eq!(TotalsPick::parse("OVER"), Some(TotalsPick::Over));
        assert_eq!(TotalsPick::parse(" u "), Some(TotalsPick::Under));
        assert_eq!(TotalsPick::parse("push"), None);
    }

    #[test]
    fn grading_is_idempotent() {
        let s = spread(6.5, "away", Some(47.5));
        let r = result(31, 24);
        let p = pick(PickFields {
            line_pick: Some("Chiefs".into()),
            winner_pick: Some("Broncos".into()),
            over_under_pick: Some("over".into()),
            ..Default::default()
        });
        let first = grade_pick(&p, Some(&s), Some(&r));
        let second = grade_pick(&p, Some(&s), Some(&r));
        assert_eq!(first, second);
        assert_eq!(first.line_outcome, Outcome::Win);
        assert_eq!(first.winner_outcome, Outcome::Loss);
        assert_eq!(first.ou_outcome, Outcome::Win);
    }
}
