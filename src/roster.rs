//! Loads the upstream vote table: one row per (player, season, points).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::RosterError;
use crate::model::{RosterEntry, SeasonLabel};

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Season")]
    season: String,
    #[serde(rename = "Points")]
    points: f64,
}

pub fn load(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let reader = csv::Reader::from_path(path).map_err(|source| RosterError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    read(reader, path)
}

pub fn from_reader<R: Read>(input: R) -> Result<Vec<RosterEntry>, RosterError> {
    read(csv::Reader::from_reader(input), Path::new("<input>"))
}

fn read<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let mut entries = Vec::new();
    for record in reader.deserialize::<RosterRow>() {
        let row = record.map_err(|source| RosterError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        // header is line 1
        let line = entries.len() as u64 + 2;
        let season = SeasonLabel::parse(&row.season).ok_or_else(|| RosterError::BadSeason {
            line,
            label: row.season.clone(),
        })?;
        entries.push(RosterEntry::new(row.player.trim(), season, row.points));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_order_and_ignores_year_column() {
        let input = "Player,Points,Season,Year\n\
                     Steve Nash,1066.0,2005-06,2006\n\
                     LeBron James,688.0,2005-06,2006\n";
        let roster = from_reader(input.as_bytes()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].candidate, "Steve Nash");
        assert_eq!(roster[0].season_year(), 2005);
        assert_eq!(roster[1].points, 688.0);
    }

    #[test]
    fn bad_season_names_the_line() {
        let input = "Player,Season,Points\nA,2005-06,1\nB,unknown,2\n";
        match from_reader(input.as_bytes()) {
            Err(RosterError::BadSeason { line, label }) => {
                assert_eq!(line, 3);
                assert_eq!(label, "unknown");
            }
            other => panic!("expected bad season, got {other:?}"),
        }
    }
}
