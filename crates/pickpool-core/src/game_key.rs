// Canonical game identifiers derived from team names.

/// Derive the join key shared by picks, spreads, and results:
/// `lowercase(away) + "_" + lowercase(home)`.
///
/// Surrounding whitespace is also stripped from each name before lowercasing,
/// so `" Chiefs "` and `"chiefs"` produce the same key.
///
/// Empty names produce a degenerate key (`"_"`, `"chiefs_"`) rather than an
/// error. Names typed differently at pick time and at result time produce
/// different keys, so the join fails silently; callers own name consistency.
pub fn game_key(away_team: &str, home_team: &str) -> String {
    format!(
        "{}_{}",
        away_team.trim().to_lowercase(),
        home_team.trim().to_lowercase()
    )
}

/// Pick the key to store a record under: an explicit key wins (normalized to
/// lowercase), otherwise one is derived from both team names. Returns `None`
/// when neither is available.
pub fn resolve_game_key(explicit: &str, away_team: &str, home_team: &str) -> Option<String> {
    let explicit = explicit.trim();
    if !explicit.is_empty() {
        return Some(explicit.to_lowercase());
    }
    if away_team.trim().is_empty() || home_team.trim().is_empty() {
        return None;
    }
    Some(game_key(away_team, home_team))
}
