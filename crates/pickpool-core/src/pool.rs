// Pool engine: write and read operations over an event log.
//
// Writes append or upsert into the log, then re-grade the affected game when
// a result for it exists. Reads recompute the latest-wins projection and
// attach the stored grade for each current pick.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};

use crate::error::{require, PoolError, PoolResult};
use crate::game_key::resolve_game_key;
use crate::grading::grade_pick;
use crate::model::{
    ClearedStatus, GameWinner, GradeRecord, GradedOutcome, GradedPick, PickFields,
    PickSubmission, ResultRecord, ResultUpdate, SpreadRecord, SpreadUpdate, UpsertStatus,
};
use crate::projection::{self, AllCurrentPicks};
use crate::standings::{compute_standings, PickerStanding};
use crate::store::EventLog;

/// Favorite marker stored when a spread arrives without one.
pub const DEFAULT_FAVORITE_SIDE: &str = "home";

/// Sub-second digits kept on incoming timestamps. The SQLite log stores
/// microseconds, so every backend orders on the same value.
const TIMESTAMP_DIGITS: u16 = 6;

fn stamp(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(TIMESTAMP_DIGITS)
}

/// The pick pool over any [`EventLog`].
pub struct PickPool<L> {
    log: L,
}

/// Stored grades keyed by (week, picker, game_key).
struct GradeIndex(HashMap<(String, String, String), GradeRecord>);

impl GradeIndex {
    fn new(grades: Vec<GradeRecord>) -> Self {
        Self(
            grades
                .into_iter()
                .map(|g| ((g.week.clone(), g.picker.clone(), g.game_key.clone()), g))
                .collect(),
        )
    }

    /// Attach the stored grade if it was computed from this exact
    /// submission; any other pick reads as ungraded.
    fn attach(&self, pick: PickSubmission) -> GradedPick {
        let key = (pick.week.clone(), pick.picker.clone(), pick.game_key.clone());
        let outcome = self
            .0
            .get(&key)
            .filter(|g| g.pick_seq == pick.seq)
            .map(|g| g.outcome)
            .unwrap_or_default();
        GradedPick { pick, outcome }
    }
}

impl<L: EventLog> PickPool<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Append a pick submission. `game_key` may be blank when both team
    /// names are present in `fields`. If the game already has a result the
    /// game is re-graded so the new pick carries outcomes immediately.
    pub fn submit_pick(
        &self,
        week: &str,
        picker: &str,
        game_key: &str,
        fields: PickFields,
        timestamp: DateTime<Utc>,
    ) -> PoolResult<PickSubmission> {
        require("week", week)?;
        require("picker", picker)?;
        let game_key = resolve_game_key(game_key, &fields.away_team, &fields.home_team)
            .ok_or(PoolError::MissingRequiredField { field: "game_key" })?;

        let stored = self.log.append_pick(PickSubmission {
            seq: 0,
            timestamp: stamp(timestamp),
            week: week.to_string(),
            picker: picker.to_string(),
            game_key,
            fields,
        })?;
        info!(
            "Pick recorded: week {} {} on {} (seq {})",
            stored.week, stored.picker, stored.game_key, stored.seq
        );

        if self.log.result_for(&stored.week, &stored.game_key)?.is_some() {
            self.regrade_game(&stored.week, &stored.game_key)?;
        }
        Ok(stored)
    }

    /// Set or lift a picker's cleared flag for a week.
    pub fn set_cleared(
        &self,
        week: &str,
        picker: &str,
        cleared: bool,
        timestamp: DateTime<Utc>,
    ) -> PoolResult<UpsertStatus> {
        require("week", week)?;
        require("picker", picker)?;
        let status = self.log.upsert_cleared(&ClearedStatus {
            week: week.to_string(),
            picker: picker.to_string(),
            cleared,
            updated_at: stamp(timestamp),
        })?;
        match status {
            UpsertStatus::Applied => info!("Cleared flag for {} week {} set to {}", picker, week, cleared),
            UpsertStatus::Stale => warn!("Ignored stale cleared flag for {} week {}", picker, week),
        }
        Ok(status)
    }

    /// Upsert the spread for a game. The magnitude is stored unsigned and a
    /// blank favorite is stored as [`DEFAULT_FAVORITE_SIDE`]. A spread
    /// correction on a game with a result re-grades that game.
    pub fn upsert_spread(
        &self,
        update: SpreadUpdate,
        timestamp: DateTime<Utc>,
    ) -> PoolResult<UpsertStatus> {
        require("week", &update.week)?;
        let game_key = resolve_game_key(&update.game_key, &update.away_team, &update.home_team)
            .ok_or(PoolError::MissingRequiredField { field: "game_key" })?;

        let favorite_side = match update.favorite_side.trim() {
            "" => DEFAULT_FAVORITE_SIDE.to_string(),
            marker => marker.to_string(),
        };
        let record = SpreadRecord {
            week: update.week,
            game_key,
            spread: update.spread.abs(),
            favorite_side,
            over_under: update.over_under,
            updated_at: stamp(timestamp),
        };

        let status = self.log.upsert_spread(&record)?;
        if status == UpsertStatus::Stale {
            warn!("Ignored stale spread for {} week {}", record.game_key, record.week);
            return Ok(status);
        }
        info!(
            "Spread for {} week {}: {} favored by {}",
            record.game_key, record.week, record.favorite_side, record.spread
        );

        if self.log.result_for(&record.week, &record.game_key)?.is_some() {
            self.regrade_game(&record.week, &record.game_key)?;
        }
        Ok(status)
    }

    /// Upsert a final score, derive the winner, and re-grade every current
    /// pick on the game. Returns how many picks were graded; a stale write
    /// grades nothing.
    pub fn upsert_result(
        &self,
        update: ResultUpdate,
        timestamp: DateTime<Utc>,
    ) -> PoolResult<usize> {
        require("week", &update.week)?;
        let game_key = resolve_game_key(&update.game_key, &update.away_team, &update.home_team)
            .ok_or(PoolError::MissingRequiredField { field: "game_key" })?;

        let record = ResultRecord {
            week: update.week,
            game_key,
            winner: GameWinner::from_scores(update.away_score, update.home_score),
            away_team: update.away_team,
            home_team: update.home_team,
            away_score: update.away_score,
            home_score: update.home_score,
            updated_at: stamp(timestamp),
            source: update.source,
        };

        if self.log.upsert_result(&record)? == UpsertStatus::Stale {
            warn!("Ignored stale result for {} week {}", record.game_key, record.week);
            return Ok(0);
        }
        info!(
            "Result for {} week {}: {}-{} ({})",
            record.game_key, record.week, record.away_score, record.home_score, record.source
        );

        self.regrade_game(&record.week, &record.game_key)
    }

    /// Grade each picker's latest pick on one game from the live spread and
    /// result, overwriting earlier grades. Picks hidden by a clear are graded
    /// too, so they carry outcomes if the clear is lifted or when listed by
    /// [`Self::get_all_current_picks`]. Returns the number of visible picks
    /// graded.
    pub fn regrade_game(&self, week: &str, game_key: &str) -> PoolResult<usize> {
        let Some(result) = self.log.result_for(week, game_key)? else {
            return Ok(0);
        };
        let spread = self.log.spread_for(week, game_key)?;
        let picks = self.log.all_picks(Some(week))?;
        let cleared = self.log.all_cleared(Some(week))?;

        let graded_at = Utc::now();
        let mut count = 0;
        for pick in projection::latest_picks_for_game(&picks, week, game_key) {
            let outcome: GradedOutcome = grade_pick(&pick, spread.as_ref(), Some(&result));
            if !projection::hidden_by_clear(&pick, &cleared) {
                count += 1;
            }
            self.log.upsert_grade(&GradeRecord {
                week: pick.week,
                picker: pick.picker,
                game_key: pick.game_key,
                pick_seq: pick.seq,
                outcome,
                graded_at,
            })?;
        }

        info!("Graded {} picks on {} week {}", count, game_key, week);
        Ok(count)
    }

    /// Re-grade every game in `week` that has a result.
    pub fn regrade_week(&self, week: &str) -> PoolResult<usize> {
        require("week", week)?;
        let mut total = 0;
        for result in self.log.all_results(Some(week))? {
            total += self.regrade_game(week, &result.game_key)?;
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current graded picks for one picker, keyed by game. Honors the
    /// picker's cleared flag.
    pub fn get_current_picks(
        &self,
        week: &str,
        picker: &str,
    ) -> PoolResult<BTreeMap<String, GradedPick>> {
        let picks = self.log.all_picks(Some(week))?;
        let cleared = self.log.all_cleared(Some(week))?;
        let status = cleared.iter().find(|c| c.picker == picker);
        let grades = GradeIndex::new(self.log.all_grades(Some(week))?);

        Ok(
            projection::current_picks_for_week_picker(&picks, status, week, picker)
                .into_iter()
                .map(|(key, pick)| (key, grades.attach(pick)))
                .collect(),
        )
    }

    /// Every current pick in the log plus the cleared flags, unmerged.
    pub fn get_all_current_picks(&self) -> PoolResult<AllCurrentPicks<GradedPick>> {
        let picks = self.log.all_picks(None)?;
        let cleared = self.log.all_cleared(None)?;
        let grades = GradeIndex::new(self.log.all_grades(None)?);
        Ok(projection::all_current_picks(&picks, &cleared).map(|pick| grades.attach(pick)))
    }

    pub fn get_spreads(&self, week: &str) -> PoolResult<Vec<SpreadRecord>> {
        Ok(self.log.all_spreads(Some(week))?)
    }

    pub fn get_results(&self, week: &str) -> PoolResult<Vec<ResultRecord>> {
        Ok(self.log.all_results(Some(week))?)
    }

    pub fn get_all_results(&self) -> PoolResult<Vec<ResultRecord>> {
        Ok(self.log.all_results(None)?)
    }

    /// Win/loss/push tallies per picker for one week.
    pub fn standings(&self, week: &str) -> PoolResult<Vec<PickerStanding>> {
        let picks = self.log.all_picks(Some(week))?;
        let cleared = self.log.all_cleared(Some(week))?;
        let grades = GradeIndex::new(self.log.all_grades(Some(week))?);

        let graded: BTreeMap<String, BTreeMap<String, GradedPick>> =
            projection::effective_picks_for_week(&picks, &cleared, week)
                .into_iter()
                .map(|(picker, games)| {
                    let games = games
                        .into_iter()
                        .map(|(key, pick)| (key, grades.attach(pick)))
                        .collect();
                    (picker, games)
                })
                .collect();
        Ok(compute_standings(&graded))
    }
}
