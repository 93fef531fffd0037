// Latest-wins projection of the pick log into current picks.
//
// Nothing here is cached: every view is recomputed from the rows handed in,
// so replaying the same log always yields the same projection.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{ClearedStatus, PickSubmission};

/// `week -> picker -> game_key -> T`.
pub type PickTree<T> = BTreeMap<String, BTreeMap<String, BTreeMap<String, T>>>;

/// Every current pick in the log alongside the cleared flags, reported
/// separately so callers decide how to combine them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllCurrentPicks<T> {
    pub picks: PickTree<T>,
    /// `week -> picker -> true` for each picker with an active clear flag.
    pub cleared: BTreeMap<String, BTreeMap<String, bool>>,
}

impl<T> AllCurrentPicks<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> AllCurrentPicks<U> {
        let picks = self
            .picks
            .into_iter()
            .map(|(week, pickers)| {
                let pickers = pickers
                    .into_iter()
                    .map(|(picker, games)| {
                        let games = games.into_iter().map(|(k, p)| (k, f(p))).collect();
                        (picker, games)
                    })
                    .collect();
                (week, pickers)
            })
            .collect();
        AllCurrentPicks {
            picks,
            cleared: self.cleared,
        }
    }
}

/// Keep `candidate` in `slot` if it supersedes what is there.
fn keep_latest<'a>(slot: &mut Option<&'a PickSubmission>, candidate: &'a PickSubmission) {
    match *slot {
        Some(current) if !candidate.supersedes(current) => {}
        _ => *slot = Some(candidate),
    }
}

/// The latest submission for one (week, picker, game). Equal timestamps are
/// broken by insertion order, later insert wins.
pub fn current_pick<'a>(
    picks: &'a [PickSubmission],
    week: &str,
    picker: &str,
    game_key: &str,
) -> Option<&'a PickSubmission> {
    let mut latest = None;
    for pick in picks
        .iter()
        .filter(|p| p.week == week && p.picker == picker && p.game_key == game_key)
    {
        keep_latest(&mut latest, pick);
    }
    latest
}

/// Latest submission per game for one picker in one week.
///
/// An active clear hides every submission at or before the clear's
/// `updated_at`; games re-picked afterwards come back individually.
pub fn current_picks_for_week_picker(
    picks: &[PickSubmission],
    cleared: Option<&ClearedStatus>,
    week: &str,
    picker: &str,
) -> BTreeMap<String, PickSubmission> {
    let cleared_at = cleared
        .filter(|c| c.cleared && c.week == week && c.picker == picker)
        .map(|c| c.updated_at);

    let mut latest: BTreeMap<&str, &PickSubmission> = BTreeMap::new();
    for pick in picks.iter().filter(|p| p.week == week && p.picker == picker) {
        if cleared_at.is_some_and(|at| pick.timestamp <= at) {
            continue;
        }
        let mut slot = latest.get(pick.game_key.as_str()).copied();
        keep_latest(&mut slot, pick);
        if let Some(winner) = slot {
            latest.insert(&pick.game_key, winner);
        }
    }

    latest
        .into_iter()
        .map(|(key, pick)| (key.to_string(), pick.clone()))
        .collect()
}

/// Latest-wins across the whole log, without applying clears.
pub fn all_current_picks(
    picks: &[PickSubmission],
    cleared: &[ClearedStatus],
) -> AllCurrentPicks<PickSubmission> {
    let mut latest: BTreeMap<(&str, &str, &str), &PickSubmission> = BTreeMap::new();
    for pick in picks {
        let key = (pick.week.as_str(), pick.picker.as_str(), pick.game_key.as_str());
        let mut slot = latest.get(&key).copied();
        keep_latest(&mut slot, pick);
        if let Some(winner) = slot {
            latest.insert(key, winner);
        }
    }

    let mut tree: PickTree<PickSubmission> = BTreeMap::new();
    for ((week, picker, game_key), pick) in latest {
        tree.entry(week.to_string())
            .or_default()
            .entry(picker.to_string())
            .or_default()
            .insert(game_key.to_string(), pick.clone());
    }

    let mut cleared_map: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
    for status in cleared.iter().filter(|c| c.cleared) {
        cleared_map
            .entry(status.week.clone())
            .or_default()
            .insert(status.picker.clone(), true);
    }

    AllCurrentPicks {
        picks: tree,
        cleared: cleared_map,
    }
}

/// Each picker's latest submission on one game, ignoring clears.
pub fn latest_picks_for_game(
    picks: &[PickSubmission],
    week: &str,
    game_key: &str,
) -> Vec<PickSubmission> {
    let mut latest: BTreeMap<&str, &PickSubmission> = BTreeMap::new();
    for pick in picks.iter().filter(|p| p.week == week && p.game_key == game_key) {
        let mut slot = latest.get(pick.picker.as_str()).copied();
        keep_latest(&mut slot, pick);
        if let Some(winner) = slot {
            latest.insert(&pick.picker, winner);
        }
    }
    latest.into_values().cloned().collect()
}

/// Whether an active clear for the pick's (week, picker) hides it: the
/// clear is set and the pick is not newer than it.
pub fn hidden_by_clear(pick: &PickSubmission, cleared: &[ClearedStatus]) -> bool {
    cleared.iter().any(|c| {
        c.cleared && c.week == pick.week && c.picker == pick.picker && pick.timestamp <= c.updated_at
    })
}

/// Clear-aware current picks for every picker in a week.
pub fn effective_picks_for_week(
    picks: &[PickSubmission],
    cleared: &[ClearedStatus],
    week: &str,
) -> BTreeMap<String, BTreeMap<String, PickSubmission>> {
    let mut pickers: Vec<&str> = picks
        .iter()
        .filter(|p| p.week == week)
        .map(|p| p.picker.as_str())
        .collect();
    pickers.sort_unstable();
    pickers.dedup();

    pickers
        .into_iter()
        .map(|picker| {
            let status = cleared.iter().find(|c| c.week == week && c.picker == picker);
            (
                picker.to_string(),
                current_picks_for_week_picker(picks, status, week, picker),
            )
        })
        .filter(|(_, games)| !games.is_empty())
        .collect()
}
