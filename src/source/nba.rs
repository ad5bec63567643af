//! HTTP adapter for the stats.nba.com tabular endpoints.
//!
//! Every endpoint answers with `{"resultSets": [{"headers": [...], "rowSet": [[...]]}]}`;
//! only the first result set is read.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use super::{DirectoryEntry, GameLogRow, StandingsRow, StatsSource, WinLoss};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::model::{PlayerId, SeasonLabel};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "resultSets", default)]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultSet {
    #[serde(default)]
    headers: Vec<String>,
    #[serde(rename = "rowSet", default)]
    row_set: Vec<Vec<Value>>,
}

/// A result-set row addressable by column name.
pub(crate) struct Row<'a> {
    columns: &'a HashMap<&'a str, usize>,
    cells: &'a [Value],
}

impl ResultSet {
    fn column_index(&self) -> HashMap<&str, usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect()
    }
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns.get(column).and_then(|&i| self.cells.get(i))
    }

    /// Numeric cell; absent or null counts as zero.
    fn number(&self, column: &str) -> Result<f64, SourceError> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(0.0),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| SourceError::Malformed(format!("{column} is not finite"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| SourceError::Malformed(format!("{column} = {s:?} is not a number"))),
            Some(other) => Err(SourceError::Malformed(format!(
                "{column} = {other} is not a number"
            ))),
        }
    }

    fn count(&self, column: &str) -> Result<u32, SourceError> {
        let value = self.number(column)?;
        if value < 0.0 {
            return Err(SourceError::Malformed(format!("{column} is negative")));
        }
        Ok(value as u32)
    }

    fn text(&self, column: &str) -> String {
        match self.get(column) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

fn first_result_set(body: &str) -> Result<ResultSet, SourceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    envelope
        .result_sets
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Malformed("response has no resultSets".into()))
}

pub(crate) fn parse_directory(body: &str) -> Result<Vec<DirectoryEntry>, SourceError> {
    let set = first_result_set(body)?;
    let columns = set.column_index();
    set.row_set
        .iter()
        .map(|cells| {
            let row = Row {
                columns: &columns,
                cells,
            };
            let id = row.text("PERSON_ID");
            if id.is_empty() {
                return Err(SourceError::Malformed("directory row without PERSON_ID".into()));
            }
            Ok(DirectoryEntry {
                player_id: PlayerId(id),
                name: row.text("DISPLAY_FIRST_LAST"),
            })
        })
        .collect()
}

pub(crate) fn parse_game_log(body: &str) -> Result<Vec<GameLogRow>, SourceError> {
    let set = first_result_set(body)?;
    let columns = set.column_index();
    set.row_set
        .iter()
        .map(|cells| {
            let row = Row {
                columns: &columns,
                cells,
            };
            Ok(GameLogRow {
                minutes: row.number("MIN")?,
                points: row.number("PTS")?,
                rebounds: row.number("REB")?,
                assists: row.number("AST")?,
                steals: row.number("STL")?,
                blocks: row.number("BLK")?,
                fgm: row.number("FGM")?,
                fga: row.number("FGA")?,
                fg3m: row.number("FG3M")?,
                fg3a: row.number("FG3A")?,
                ftm: row.number("FTM")?,
                fta: row.number("FTA")?,
                result: row.text("WL"),
                matchup: row.text("MATCHUP"),
            })
        })
        .collect()
}

pub(crate) fn parse_standings(body: &str) -> Result<Vec<StandingsRow>, SourceError> {
    let set = first_result_set(body)?;
    let columns = set.column_index();
    set.row_set
        .iter()
        .map(|cells| {
            let row = Row {
                columns: &columns,
                cells,
            };
            let wins = if row.get("WINS").is_some() {
                row.count("WINS")?
            } else {
                row.count("W")?
            };
            let losses = if row.get("LOSSES").is_some() {
                row.count("LOSSES")?
            } else {
                row.count("L")?
            };
            Ok(StandingsRow {
                abbreviation: row.text("TeamAbbreviation"),
                wins,
                losses,
            })
        })
        .collect()
}

pub(crate) fn parse_team_info(body: &str) -> Result<Option<WinLoss>, SourceError> {
    let set = first_result_set(body)?;
    let columns = set.column_index();
    let Some(cells) = set.row_set.first() else {
        return Ok(None);
    };
    let row = Row {
        columns: &columns,
        cells,
    };
    Ok(Some(WinLoss {
        wins: row.count("W")?,
        losses: row.count("L")?,
    }))
}

/// Client for the public stats endpoints with retry on transient failures.
#[derive(Debug, Clone)]
pub struct NbaStatsClient {
    client: reqwest::Client,
    base_url: String,
    league_id: String,
    season_type: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl NbaStatsClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
        headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));
        for (name, value) in [(REFERER, &config.referer), (ORIGIN, &config.origin)] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| SourceError::Malformed(format!("bad {} header: {e}", name.as_str())))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout())
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| SourceError::Http {
                endpoint: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self::with_client(client, config))
    }

    /// Use an already configured HTTP client; only the endpoint and retry
    /// settings are taken from `config`.
    pub fn with_client(client: reqwest::Client, config: &SourceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            league_id: config.league_id.clone(),
            season_type: config.season_type.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut attempt = 0u32;
        loop {
            debug!(endpoint, attempt, "requesting");
            let result = self.client.get(&url).query(params).send().await;
            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| SourceError::Http {
                            endpoint: endpoint.to_string(),
                            message: e.to_string(),
                        });
                    }
                    let transient = status.as_u16() == 429 || status.is_server_error();
                    if transient && attempt < self.max_retries {
                        attempt += 1;
                        sleep(self.retry_backoff * attempt).await;
                        continue;
                    }
                    return Err(SourceError::Status {
                        endpoint: endpoint.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        attempt += 1;
                        sleep(self.retry_backoff * attempt).await;
                        continue;
                    }
                    return Err(SourceError::Http {
                        endpoint: endpoint.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl StatsSource for NbaStatsClient {
    async fn player_directory(
        &self,
        season: &SeasonLabel,
    ) -> Result<Vec<DirectoryEntry>, SourceError> {
        let body = self
            .fetch(
                "commonallplayers",
                &[
                    ("LeagueID", self.league_id.as_str()),
                    ("Season", season.as_str()),
                    ("IsOnlyCurrentSeason", "0"),
                ],
            )
            .await?;
        parse_directory(&body)
    }

    async fn game_log(
        &self,
        player_id: &PlayerId,
        season: &SeasonLabel,
    ) -> Result<Vec<GameLogRow>, SourceError> {
        let body = self
            .fetch(
                "playergamelog",
                &[
                    ("PlayerID", player_id.0.as_str()),
                    ("Season", season.as_str()),
                    ("SeasonType", self.season_type.as_str()),
                ],
            )
            .await?;
        parse_game_log(&body)
    }

    async fn standings(&self, season: &SeasonLabel) -> Result<Vec<StandingsRow>, SourceError> {
        let body = self
            .fetch(
                "leaguestandingsv3",
                &[
                    ("LeagueID", self.league_id.as_str()),
                    ("Season", season.as_str()),
                    ("SeasonType", self.season_type.as_str()),
                ],
            )
            .await?;
        parse_standings(&body)
    }

    async fn team_info(
        &self,
        team_id: &str,
        season: &SeasonLabel,
    ) -> Result<Option<WinLoss>, SourceError> {
        let body = self
            .fetch(
                "teaminfocommon",
                &[
                    ("TeamID", team_id),
                    ("Season", season.as_str()),
                    ("SeasonType", self.season_type.as_str()),
                ],
            )
            .await?;
        parse_team_info(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TEAM_INFO: &str = r#"{"resultSets":[{"headers":["W","L"],"rowSet":[[66,16]]}]}"#;

    /// Answers each connection with the next scripted status; the last one
    /// repeats. Returns the base URL and a request counter.
    async fn scripted_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses[n.min(statuses.len() - 1)];

                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(len) => read += len,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let body = if status == 200 { TEAM_INFO } else { "{}" };
                let reply = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}"), hits)
    }

    fn client_for(base_url: String) -> NbaStatsClient {
        let config = SourceConfig {
            base_url,
            max_retries: 2,
            retry_backoff_ms: 1,
            ..SourceConfig::default()
        };
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        NbaStatsClient::with_client(http, &config)
    }

    fn season() -> SeasonLabel {
        SeasonLabel::parse("2015-16").unwrap()
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let (url, hits) = scripted_server(vec![503, 503, 200]).await;
        let record = client_for(url).team_info("1610612744", &season()).await.unwrap();
        assert_eq!(record, Some(WinLoss { wins: 66, losses: 16 }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let (url, hits) = scripted_server(vec![404]).await;
        let err = client_for(url).standings(&season()).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limiting_gives_up_after_max_retries() {
        let (url, hits) = scripted_server(vec![429]).await;
        let err = client_for(url).standings(&season()).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 429, .. }), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connection_errors_are_retried() {
        // bind then drop so nothing listens on the port
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let err = client_for(format!("http://{addr}"))
            .standings(&season())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Http { .. }), "{err}");
    }

    #[test]
    fn directory_reads_id_and_display_name() {
        let body = r#"{"resultSets":[{
            "headers":["PERSON_ID","DISPLAY_LAST_COMMA_FIRST","DISPLAY_FIRST_LAST"],
            "rowSet":[
                [2544,"James, LeBron","LeBron James"],
                [201939,"Curry, Stephen","Stephen Curry"]
            ]}]}"#;
        let players = parse_directory(body).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].player_id, PlayerId("2544".into()));
        assert_eq!(players[1].name, "Stephen Curry");
    }

    #[test]
    fn game_log_nulls_count_as_zero() {
        let body = r#"{"resultSets":[{"headers":["MATCHUP","WL","MIN","PTS","FG3A"],
            "rowSet":[["CLE vs. BOS","W",38,31,null]]}]}"#;
        let rows = parse_game_log(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 31.0);
        assert_eq!(rows[0].fg3a, 0.0);
        assert_eq!(rows[0].rebounds, 0.0);
        assert_eq!(rows[0].result, "W");
        assert_eq!(rows[0].matchup, "CLE vs. BOS");
    }

    #[test]
    fn game_log_rejects_non_numeric_cells() {
        let body = r#"{"resultSets":[{"headers":["PTS"],"rowSet":[[12],["DNP"]]}]}"#;
        assert!(matches!(parse_game_log(body), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn standings_fall_back_to_short_columns() {
        let body = r#"{"resultSets":[{"headers":["TeamAbbreviation","W","L"],
            "rowSet":[["MIA",58,24]]}]}"#;
        let rows = parse_standings(body).unwrap();
        assert_eq!(
            rows,
            vec![StandingsRow {
                abbreviation: "MIA".into(),
                wins: 58,
                losses: 24
            }]
        );
    }

    #[test]
    fn team_info_empty_is_none() {
        let body = r#"{"resultSets":[{"headers":["W","L"],"rowSet":[]}]}"#;
        assert_eq!(parse_team_info(body).unwrap(), None);
        let body =
            r#"{"resultSets":[{"headers":["TEAM_ID","W","L"],"rowSet":[[1,66,16],[1,0,0]]}]}"#;
        assert_eq!(
            parse_team_info(body).unwrap(),
            Some(WinLoss { wins: 66, losses: 16 })
        );
    }

    #[test]
    fn missing_result_sets_is_malformed() {
        assert!(matches!(
            parse_standings(r#"{"resultSets":[]}"#),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(parse_standings("<html>"), Err(SourceError::Json(_))));
    }
}
