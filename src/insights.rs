use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::game_log::{PlayerLog, RollingAverages, StatKind, rolling_averages};
use crate::probability::{seed_key, seeded_probability_at_least};
use crate::projection::{Projection, ProjectionConfig, project_with};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerProjections {
    pub points: Projection,
    pub rebounds: Projection,
    pub assists: Projection,
    pub threes: Projection,
}

impl PlayerProjections {
    /// Fits all four stats; the log must already be ordered most recent first.
    pub fn from_log(log: &PlayerLog, cfg: &ProjectionConfig) -> Self {
        let fit = |stat: StatKind| {
            let (counts, minutes) = log.series(stat);
            let projection = project_with(&counts, &minutes, cfg);
            debug!(
                player = %log.player_id,
                stat = stat.code(),
                mu = projection.mu,
                dispersion = ?projection.dispersion,
                zero_inflation = ?projection.zero_inflation,
                "projected"
            );
            projection
        };
        Self {
            points: fit(StatKind::Points),
            rebounds: fit(StatKind::Rebounds),
            assists: fit(StatKind::Assists),
            threes: fit(StatKind::Threes),
        }
    }

    pub fn get(&self, stat: StatKind) -> &Projection {
        match stat {
            StatKind::Points => &self.points,
            StatKind::Rebounds => &self.rebounds,
            StatKind::Assists => &self.assists,
            StatKind::Threes => &self.threes,
        }
    }
}

/// Selected "at least" target per stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Targets {
    pub points: i64,
    pub rebounds: i64,
    pub assists: i64,
    pub threes: i64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            points: StatKind::Points.default_target(),
            rebounds: StatKind::Rebounds.default_target(),
            assists: StatKind::Assists.default_target(),
            threes: StatKind::Threes.default_target(),
        }
    }
}

impl Targets {
    pub fn get(&self, stat: StatKind) -> i64 {
        match stat {
            StatKind::Points => self.points,
            StatKind::Rebounds => self.rebounds,
            StatKind::Assists => self.assists,
            StatKind::Threes => self.threes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderRung {
    pub target: i64,
    pub probability: f64,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatInsight {
    pub stat: StatKind,
    pub code: &'static str,
    pub label: &'static str,
    pub target: i64,
    pub projection: Projection,
    pub probability: f64,
    pub percent: u8,
    pub seed_key: String,
    pub summary: String,
    pub ladder: Vec<LadderRung>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReport {
    pub player_id: String,
    pub player_name: String,
    pub team_name: String,
    pub games: usize,
    pub averages: RollingAverages,
    pub insights: Vec<StatInsight>,
}

pub fn to_percent(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Reproducible headline probability for one stat and target.
pub fn stat_insight(
    player_id: &str,
    stat: StatKind,
    projection: &Projection,
    target: i64,
    samples: usize,
) -> StatInsight {
    let probability =
        seeded_probability_at_least(player_id, stat.code(), target, projection, samples);
    StatInsight {
        stat,
        code: stat.code(),
        label: stat.label(),
        target,
        projection: *projection,
        probability,
        percent: to_percent(probability),
        seed_key: seed_key(player_id, stat.code(), target, projection),
        summary: format!("Chance to {} next game.", stat.phrase(target)),
        ladder: Vec::new(),
    }
}

/// Probabilities for every preset target of a stat, each on its own seeded stream.
pub fn threshold_ladder(
    player_id: &str,
    stat: StatKind,
    projection: &Projection,
    samples: usize,
) -> Vec<LadderRung> {
    stat.presets()
        .iter()
        .map(|&target| {
            let probability =
                seeded_probability_at_least(player_id, stat.code(), target, projection, samples);
            LadderRung {
                target,
                probability,
                percent: to_percent(probability),
            }
        })
        .collect()
}

/// Full insight panel for a player: averages, projections, headline targets and ladders.
///
/// Stats are evaluated in parallel. Every query owns its RNG, so the result is
/// identical to a sequential run.
pub fn player_report(
    log: &PlayerLog,
    targets: &Targets,
    last_n: Option<usize>,
    cfg: &EngineConfig,
) -> PlayerReport {
    let projections = PlayerProjections::from_log(log, &cfg.projection);
    let build = |stat: &StatKind| {
        let stat = *stat;
        let projection = projections.get(stat);
        let mut insight = stat_insight(
            &log.player_id,
            stat,
            projection,
            targets.get(stat),
            cfg.primary_samples,
        );
        insight.ladder = threshold_ladder(&log.player_id, stat, projection, cfg.sweep_samples);
        insight
    };

    let pool = build_pool(cfg.parallelism);
    let insights = with_pool(&pool, || StatKind::ALL.par_iter().map(build).collect());

    PlayerReport {
        player_id: log.player_id.clone(),
        player_name: log.player_name.clone(),
        team_name: log.team_name().to_string(),
        games: log.games.len(),
        averages: rolling_averages(&log.games, last_n.unwrap_or(log.games.len())),
        insights,
    }
}

fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
