// Per-week win/loss/push tallies for each picker.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{GradedPick, Outcome};

/// Win/loss/push counts for one pick type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
}

impl Record {
    pub fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Push => self.pushes += 1,
            Outcome::Ungraded => {}
        }
    }
}

/// One picker's week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PickerStanding {
    pub picker: String,
    pub line: Record,
    pub winner: Record,
    pub over_under: Record,
    /// Line outcomes of blazin' picks only.
    pub blazin: Record,
    pub picks: u32,
}

/// Tally current graded picks (`picker -> game_key -> pick`), ordered by
/// line wins descending, then picker name.
pub fn compute_standings(
    picks: &BTreeMap<String, BTreeMap<String, GradedPick>>,
) -> Vec<PickerStanding> {
    let mut standings: Vec<PickerStanding> = picks
        .iter()
        .map(|(picker, games)| {
            let mut standing = PickerStanding {
                picker: picker.clone(),
                ..PickerStanding::default()
            };
            for graded in games.values() {
                standing.picks += 1;
                standing.line.tally(graded.outcome.line_outcome);
                standing.winner.tally(graded.outcome.winner_outcome);
                standing.over_under.tally(graded.outcome.ou_outcome);
                if graded.pick.fields.blazin {
                    standing.blazin.tally(graded.outcome.line_outcome);
                }
            }
            standing
        })
        .collect();

    standings.sort_by(|a, b| {
        b.line
            .wins
            .cmp(&a.line.wins)
            .then_with(|| a.picker.cmp(&b.picker))
    });
    standings
}
