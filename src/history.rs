//! Past-winner flag derived from the vote table itself.

use std::collections::BTreeMap;

use crate::model::{RosterEntry, SeasonLabel};

/// Highest vote total per season start year.
pub fn max_points_by_year(roster: &[RosterEntry]) -> BTreeMap<i32, f64> {
    let mut max: BTreeMap<i32, f64> = BTreeMap::new();
    for entry in roster {
        max.entry(entry.season_year())
            .and_modify(|m| {
                if entry.points > *m {
                    *m = entry.points;
                }
            })
            .or_insert(entry.points);
    }
    max
}

/// True when `candidate` held the top vote total of any season that started
/// before `season`. Every candidate tied for a season's maximum counts.
pub fn was_past_winner(candidate: &str, season: &SeasonLabel, roster: &[RosterEntry]) -> bool {
    let year = season.start_year();
    let max = max_points_by_year(roster);
    roster.iter().any(|entry| {
        entry.candidate == candidate
            && entry.season_year() < year
            && max.get(&entry.season_year()) == Some(&entry.points)
    })
}
