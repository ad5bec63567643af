//! Read-only analysis over a finished checkpoint.
//!
//! A season's winner is every candidate tied at that season's highest vote
//! total; the top three are the three highest totals, ties broken by
//! checkpoint order. Team win percentage comes from the resolved team
//! record, so rows whose record is `N/A` drop out of any figure that needs it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::checkpoint::season_coverage;
use crate::model::EnrichedResult;

/// First season start year counted in the modern era.
pub const MODERN_ERA_START: i32 = 2010;

const TOP_FINISHERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Pts,
    Reb,
    Ast,
    Stl,
    Blk,
    FgPct,
    Fg3Pct,
    FtPct,
    TeamWinPct,
}

impl Stat {
    pub const THRESHOLDS: [Stat; 9] = [
        Stat::Pts,
        Stat::Reb,
        Stat::Ast,
        Stat::Stl,
        Stat::Blk,
        Stat::FgPct,
        Stat::Fg3Pct,
        Stat::FtPct,
        Stat::TeamWinPct,
    ];
    pub const TOP_VS_FIELD: [Stat; 4] = [Stat::Pts, Stat::Reb, Stat::Ast, Stat::TeamWinPct];
    pub const ERAS: [Stat; 5] = [Stat::Pts, Stat::Reb, Stat::Ast, Stat::Fg3Pct, Stat::TeamWinPct];

    pub fn label(self) -> &'static str {
        match self {
            Stat::Pts => "PTS",
            Stat::Reb => "REB",
            Stat::Ast => "AST",
            Stat::Stl => "STL",
            Stat::Blk => "BLK",
            Stat::FgPct => "FG_PCT",
            Stat::Fg3Pct => "FG3_PCT",
            Stat::FtPct => "FT_PCT",
            Stat::TeamWinPct => "TEAM_WIN_PCT",
        }
    }

    pub fn value(self, result: &EnrichedResult) -> Option<f64> {
        let avg = &result.averages;
        match self {
            Stat::Pts => Some(avg.points),
            Stat::Reb => Some(avg.rebounds),
            Stat::Ast => Some(avg.assists),
            Stat::Stl => Some(avg.steals),
            Stat::Blk => Some(avg.blocks),
            Stat::FgPct => Some(avg.fg_pct),
            Stat::Fg3Pct => Some(avg.fg3_pct),
            Stat::FtPct => Some(avg.ft_pct),
            Stat::TeamWinPct => result.team_record.win_pct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonLeader {
    pub season: String,
    pub points: f64,
    /// Every candidate tied at the top.
    pub players: Vec<String>,
}

/// Summary of one stat over a group. Quantiles interpolate linearly between
/// the two nearest ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub max: f64,
}

impl Distribution {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        Some(Self {
            count,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            mean: sorted.iter().sum::<f64>() / count as f64,
            max: sorted[count - 1],
        })
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (n, sum) = values
        .into_iter()
        .fold((0usize, 0.0), |(n, sum), v| (n + 1, sum + v));
    (n > 0).then(|| sum / n as f64)
}

fn share(flags: impl IntoIterator<Item = bool>) -> Option<f64> {
    mean(flags.into_iter().map(|f| if f { 1.0 } else { 0.0 }))
}

/// Pearson correlation; `None` with fewer than two pairs or a constant side.
pub fn correlation(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let mx = mean(pairs.iter().map(|p| p.0))?;
    let my = mean(pairs.iter().map(|p| p.1))?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Group means of one stat. `difference` is `compared - base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub stat: Stat,
    pub compared: Option<f64>,
    pub base: Option<f64>,
}

impl Comparison {
    pub fn difference(&self) -> Option<f64> {
        Some(self.compared? - self.base?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupComparison {
    pub compared_count: usize,
    pub base_count: usize,
    pub rows: Vec<Comparison>,
}

impl GroupComparison {
    fn new(stats: &[Stat], compared: &[&EnrichedResult], base: &[&EnrichedResult]) -> Self {
        let group_mean = |group: &[&EnrichedResult], stat: Stat| {
            mean(group.iter().filter_map(|r| stat.value(r)))
        };
        Self {
            compared_count: compared.len(),
            base_count: base.len(),
            rows: stats
                .iter()
                .map(|&stat| Comparison {
                    stat,
                    compared: group_mean(compared, stat),
                    base: group_mean(base, stat),
                })
                .collect(),
        }
    }

    pub fn get(&self, stat: Stat) -> Option<&Comparison> {
        self.rows.iter().find(|c| c.stat == stat)
    }
}

/// How winners' teams fared, bucketed by win percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamSuccess {
    /// 70% and above.
    pub elite: usize,
    /// 60% up to 70%.
    pub good: usize,
    /// Below 60%.
    pub average: usize,
    /// Winners whose team record is `N/A`.
    pub unresolved: usize,
    pub mean_win_pct: Option<f64>,
    pub min_win_pct: Option<f64>,
    /// Vote points against team win percentage over every resolved row.
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PastWinnerAdvantage {
    pub past_winners: usize,
    pub first_timers: usize,
    /// Share of past-winner rows that won the season.
    pub past_win_rate: Option<f64>,
    pub first_timer_win_rate: Option<f64>,
    /// Share of season winners who had already won.
    pub repeat_share: Option<f64>,
    /// Players with more than one win, most wins first.
    pub multiple_winners: Vec<(String, usize)>,
}

impl PastWinnerAdvantage {
    /// How many times likelier a past winner is to win, when they are.
    pub fn advantage(&self) -> Option<f64> {
        let (past, first) = (self.past_win_rate?, self.first_timer_win_rate?);
        (past > first && first > 0.0).then(|| past / first)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rows: usize,
    pub seasons: usize,
    pub first_season: Option<String>,
    pub last_season: Option<String>,
    pub leaders: Vec<SeasonLeader>,
    pub past_winner_rows: usize,
    pub winners: usize,
    pub thresholds: Vec<(Stat, Distribution)>,
    /// Top three per season against everyone else.
    pub top_vs_field: GroupComparison,
    pub team_success: TeamSuccess,
    /// Modern-era winners against earlier winners.
    pub eras: GroupComparison,
    pub past_winners: PastWinnerAdvantage,
}

fn select<'a>(
    results: &'a [EnrichedResult],
    flags: &[bool],
    want: bool,
) -> Vec<&'a EnrichedResult> {
    results
        .iter()
        .zip(flags)
        .filter(|&(_, &flag)| flag == want)
        .map(|(r, _)| r)
        .collect()
}

fn team_success(results: &[EnrichedResult], winners: &[&EnrichedResult]) -> TeamSuccess {
    let pcts: Vec<f64> = winners
        .iter()
        .filter_map(|r| r.team_record.win_pct())
        .collect();
    let pairs: Vec<(f64, f64)> = results
        .iter()
        .filter_map(|r| r.team_record.win_pct().map(|pct| (r.entry.points, pct)))
        .collect();

    TeamSuccess {
        elite: pcts.iter().filter(|&&p| p >= 70.0).count(),
        good: pcts.iter().filter(|&&p| (60.0..70.0).contains(&p)).count(),
        average: pcts.iter().filter(|&&p| p < 60.0).count(),
        unresolved: winners.len() - pcts.len(),
        mean_win_pct: mean(pcts.iter().copied()),
        min_win_pct: pcts.iter().copied().reduce(f64::min),
        correlation: correlation(&pairs),
    }
}

fn past_winner_advantage(results: &[EnrichedResult], won: &[bool]) -> PastWinnerAdvantage {
    let rate = |past: bool| {
        let outcomes: Vec<bool> = results
            .iter()
            .zip(won)
            .filter(|(r, _)| r.past_winner == past)
            .map(|(_, &w)| w)
            .collect();
        (outcomes.len(), share(outcomes))
    };
    let (past_winners, past_win_rate) = rate(true);
    let (first_timers, first_timer_win_rate) = rate(false);

    let mut wins: HashMap<&str, usize> = HashMap::new();
    for r in select(results, won, true) {
        *wins.entry(r.entry.candidate.as_str()).or_default() += 1;
    }
    let mut multiple_winners: Vec<(String, usize)> = wins
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    multiple_winners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    PastWinnerAdvantage {
        past_winners,
        first_timers,
        past_win_rate,
        first_timer_win_rate,
        repeat_share: share(
            results
                .iter()
                .zip(won)
                .filter(|&(_, &w)| w)
                .map(|(r, _)| r.past_winner),
        ),
        multiple_winners,
    }
}

pub fn build(results: &[EnrichedResult]) -> Report {
    // keyed by start year so seasons sort chronologically
    let mut by_season: BTreeMap<(i32, &str), Vec<usize>> = BTreeMap::new();
    for (i, r) in results.iter().enumerate() {
        let season = &r.entry.season;
        by_season
            .entry((season.start_year(), season.as_str()))
            .or_default()
            .push(i);
    }

    let mut won = vec![false; results.len()];
    let mut top = vec![false; results.len()];
    let mut leaders = Vec::with_capacity(by_season.len());
    for ((_, season), mut ranked) in by_season {
        ranked.sort_by(|&a, &b| results[b].entry.points.total_cmp(&results[a].entry.points));
        let best = results[ranked[0]].entry.points;
        let mut players = Vec::new();
        for &i in ranked.iter().take_while(|&&i| results[i].entry.points == best) {
            won[i] = true;
            players.push(results[i].entry.candidate.clone());
        }
        for &i in ranked.iter().take(TOP_FINISHERS) {
            top[i] = true;
        }
        leaders.push(SeasonLeader {
            season: season.to_string(),
            points: best,
            players,
        });
    }

    let winners = select(results, &won, true);
    let (early, modern): (Vec<&EnrichedResult>, Vec<&EnrichedResult>) = winners
        .iter()
        .copied()
        .partition(|r| r.entry.season.start_year() < MODERN_ERA_START);
    let thresholds = Stat::THRESHOLDS
        .iter()
        .filter_map(|&stat| {
            Distribution::of(winners.iter().filter_map(|r| stat.value(r))).map(|d| (stat, d))
        })
        .collect();

    let coverage = season_coverage(results);
    Report {
        rows: results.len(),
        seasons: coverage.map(|c| c.0).unwrap_or(0),
        first_season: coverage.map(|c| c.1.to_string()),
        last_season: coverage.map(|c| c.2.to_string()),
        leaders,
        past_winner_rows: results.iter().filter(|r| r.past_winner).count(),
        winners: winners.len(),
        thresholds,
        top_vs_field: GroupComparison::new(
            &Stat::TOP_VS_FIELD,
            &select(results, &top, true),
            &select(results, &top, false),
        ),
        team_success: team_success(results, &winners),
        eras: GroupComparison::new(&Stat::ERAS, &modern, &early),
        past_winners: past_winner_advantage(results, &won),
    }
}

struct Num(Option<f64>);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) if f.sign_plus() => write!(f, "{v:>+w$.1}", w = f.width().unwrap_or(0)),
            Some(v) => write!(f, "{v:>w$.1}", w = f.width().unwrap_or(0)),
            None => write!(f, "{:>w$}", "-", w = f.width().unwrap_or(0)),
        }
    }
}

fn pct_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn write_comparison(
    f: &mut fmt::Formatter<'_>,
    group: &GroupComparison,
    compared: &str,
    base: &str,
) -> fmt::Result {
    writeln!(f, "{:<15} | {:>12} | {:>12} | {:>10}", "Stat", compared, base, "Difference")?;
    for c in &group.rows {
        writeln!(
            f,
            "{:<15} | {:>12} | {:>12} | {:>+10}",
            c.stat.label(),
            Num(c.compared),
            Num(c.base),
            Num(c.difference())
        )?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        match (&self.first_season, &self.last_season) {
            (Some(first), Some(last)) => {
                writeln!(f, "Seasons covered: {} ({} to {})", self.seasons, first, last)?
            }
            _ => writeln!(f, "Seasons covered: 0")?,
        }
        writeln!(f, "Rows flagged as past winners: {}", self.past_winner_rows)?;

        writeln!(f, "\nTop vote-getters:")?;
        for leader in &self.leaders {
            writeln!(
                f,
                "  {:<8} {:>7.1}  {}",
                leader.season,
                leader.points,
                leader.players.join(", ")
            )?;
        }

        writeln!(f, "\nWinner thresholds ({} winners):", self.winners)?;
        for (stat, d) in &self.thresholds {
            writeln!(
                f,
                "{:<15} | Min: {:6.1} | Q1: {:6.1} | Median: {:6.1} | Mean: {:6.1} | Max: {:6.1}",
                stat.label(),
                d.min,
                d.q1,
                d.median,
                d.mean,
                d.max
            )?;
        }

        let top = &self.top_vs_field;
        writeln!(
            f,
            "\nTop {} finishers ({}) vs rest of field ({}):",
            TOP_FINISHERS, top.compared_count, top.base_count
        )?;
        write_comparison(f, top, "Top 3 Avg", "Rest Avg")?;

        let team = &self.team_success;
        let resolved = team.elite + team.good + team.average;
        writeln!(f, "\nTeam success of winners:")?;
        for (label, n) in [
            ("Elite (70%+)", team.elite),
            ("Good (60-69%)", team.good),
            ("Average (<60%)", team.average),
        ] {
            writeln!(f, "  {:<16} {:>3} ({:.1}%)", label, n, pct_of(n, resolved))?;
        }
        if team.unresolved > 0 {
            writeln!(f, "  {:<16} {:>3}", "Record N/A", team.unresolved)?;
        }
        writeln!(f, "  Mean win%: {}", Num(team.mean_win_pct))?;
        writeln!(f, "  Min win%:  {}", Num(team.min_win_pct))?;
        match team.correlation {
            Some(r) => writeln!(f, "  Correlation of vote points and win%: {r:.3}")?,
            None => writeln!(f, "  Correlation of vote points and win%: -")?,
        }

        let eras = &self.eras;
        writeln!(
            f,
            "\nWinners before {MODERN_ERA_START} ({}) vs from {MODERN_ERA_START} ({}):",
            eras.base_count, eras.compared_count
        )?;
        write_comparison(f, eras, "Modern Avg", "Early Avg")?;

        let past = &self.past_winners;
        writeln!(f, "\nPast winner advantage:")?;
        writeln!(
            f,
            "  Past winners: {} rows, win rate {}%",
            past.past_winners,
            Num(past.past_win_rate.map(|r| r * 100.0))
        )?;
        writeln!(
            f,
            "  First-timers: {} rows, win rate {}%",
            past.first_timers,
            Num(past.first_timer_win_rate.map(|r| r * 100.0))
        )?;
        if let Some(x) = past.advantage() {
            writeln!(f, "  Past winners are {x:.1}x more likely to win")?;
        }
        writeln!(
            f,
            "  Winners who had already won: {}%",
            Num(past.repeat_share.map(|r| r * 100.0))
        )?;
        for (player, wins) in &past.multiple_winners {
            writeln!(f, "  {player}: {wins} wins")?;
        }
        Ok(())
    }
}
