//! Republishes checkpoint rows as JSON documents, one per line, ready for a
//! bulk load into a document store.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::model::{EnrichedResult, TeamRecord};

#[derive(Debug, Serialize)]
pub struct CandidateDocument {
    pub player: String,
    pub season: SeasonDoc,
    pub voting: VotingDoc,
    pub stats: StatsDoc,
    pub advanced: AdvancedDoc,
    pub flags: FlagsDoc,
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
}

#[derive(Debug, Serialize)]
pub struct SeasonDoc {
    pub label: String,
    pub start_year: i32,
    pub end_year: i32,
}

#[derive(Debug, Serialize)]
pub struct VotingDoc {
    #[serde(rename = "mvpPoints")]
    pub mvp_points: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDoc {
    pub gp: u32,
    pub mpg: f64,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub team: TeamDoc,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDoc {
    pub abbr: String,
    pub record: String,
    pub win_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedDoc {
    pub usg_pct: Option<f64>,
    pub off_rating: Option<f64>,
    pub def_rating: Option<f64>,
    pub net_rating: Option<f64>,
    pub pie: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FlagsDoc {
    pub pastmvpwinner: bool,
}

impl CandidateDocument {
    pub fn from_result(result: &EnrichedResult, exported_at: &str) -> Self {
        let season = &result.entry.season;
        let avg = &result.averages;
        let record: &TeamRecord = &result.team_record;
        Self {
            player: result.entry.candidate.clone(),
            season: SeasonDoc {
                label: season.to_string(),
                start_year: season.start_year(),
                end_year: season.end_year(),
            },
            voting: VotingDoc {
                mvp_points: result.entry.points,
            },
            stats: StatsDoc {
                gp: avg.games_played,
                mpg: avg.minutes,
                pts: avg.points,
                reb: avg.rebounds,
                ast: avg.assists,
                stl: avg.steals,
                blk: avg.blocks,
                fg_pct: avg.fg_pct,
                fg3_pct: avg.fg3_pct,
                ft_pct: avg.ft_pct,
                team: TeamDoc {
                    abbr: avg.team.clone(),
                    record: record.to_string(),
                    win_pct: record.win_pct(),
                },
            },
            advanced: AdvancedDoc {
                usg_pct: result.advanced.usage_pct,
                off_rating: result.advanced.off_rating,
                def_rating: result.advanced.def_rating,
                net_rating: result.advanced.net_rating,
                pie: result.advanced.pie,
            },
            flags: FlagsDoc {
                pastmvpwinner: result.past_winner,
            },
            exported_at: exported_at.to_string(),
        }
    }
}

/// Write one document per line. Returns the number of documents written.
pub fn write_documents<W: Write>(results: &[EnrichedResult], out: W) -> std::io::Result<usize> {
    let exported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut out = BufWriter::new(out);
    for result in results {
        let doc = CandidateDocument::from_result(result, &exported_at);
        serde_json::to_writer(&mut out, &doc)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(results.len())
}

pub fn export_to_file(results: &[EnrichedResult], path: &Path) -> std::io::Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_documents(results, File::create(path)?)
}
