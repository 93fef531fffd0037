// Side resolution: map a pick value or favorite marker onto home/away.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One side of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving a free-form pick value against a matchup.
///
/// `Unresolved` and `Ambiguous` are not sides: grading code must leave the
/// outcome ungraded for either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideMatch {
    Home,
    Away,
    /// The value matches neither team.
    Unresolved,
    /// The fuzzy rule matched both teams.
    Ambiguous,
}

impl SideMatch {
    pub fn side(self) -> Option<Side> {
        match self {
            SideMatch::Home => Some(Side::Home),
            SideMatch::Away => Some(Side::Away),
            SideMatch::Unresolved | SideMatch::Ambiguous => None,
        }
    }

    fn from_hits(away: bool, home: bool) -> Option<Self> {
        match (away, home) {
            (true, false) => Some(SideMatch::Away),
            (false, true) => Some(SideMatch::Home),
            (true, true) => Some(SideMatch::Ambiguous),
            (false, false) => None,
        }
    }
}

/// Resolve `pick_value` to a side. First rule to match wins:
///
/// 1. the literal `"home"` or `"away"` (any case);
/// 2. an exact, case-insensitive team name;
/// 3. fuzzy: the team name contains the value, or the value contains the
///    team's last word (its mascot, e.g. `"Chiefs"`).
///
/// A blank value is `Unresolved`. A team with a blank name never matches.
pub fn resolve_side(pick_value: &str, away_team: &str, home_team: &str) -> SideMatch {
    let value = pick_value.trim().to_lowercase();
    if value.is_empty() {
        return SideMatch::Unresolved;
    }
    match value.as_str() {
        "home" => return SideMatch::Home,
        "away" => return SideMatch::Away,
        _ => {}
    }

    let away = away_team.trim().to_lowercase();
    let home = home_team.trim().to_lowercase();

    let exact = |team: &str| !team.is_empty() && team == value;
    if let Some(m) = SideMatch::from_hits(exact(&away), exact(&home)) {
        return m;
    }

    SideMatch::from_hits(fuzzy_match(&value, &away), fuzzy_match(&value, &home))
        .unwrap_or(SideMatch::Unresolved)
}

fn fuzzy_match(value: &str, team: &str) -> bool {
    if team.is_empty() {
        return false;
    }
    if team.contains(value) {
        return true;
    }
    team.split_whitespace()
        .last()
        .is_some_and(|mascot| value.contains(mascot))
}

/// Resolve the side a spread is applied to.
///
/// Uses the same rules as [`resolve_side`], fuzzy matching included, so a
/// mascot alone names the favorite. A blank, unrecognized, or
/// ambiguous marker falls back to [`Side::Home`]; that default is part of
/// the grading contract, not an error path.
pub fn favorite_side(marker: &str, away_team: &str, home_team: &str) -> Side {
    resolve_side(marker, away_team, home_team)
        .side()
        .unwrap_or(Side::Home)
}
