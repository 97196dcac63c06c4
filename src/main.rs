use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use hoops_props::config::EngineConfig;
use hoops_props::game_log::{self, StatKind};
use hoops_props::insights::{self, PlayerReport, Targets};
use hoops_props::sampling::Dispersion;

#[derive(Debug, Parser)]
#[command(
    name = "hoops_props",
    about = "Next-game prop probabilities from a player's recent game log"
)]
struct Cli {
    /// Player game log JSON (player_id, player_name, games[]).
    file: PathBuf,

    #[arg(long, value_parser = parse_target)]
    points: Option<i64>,

    #[arg(long, value_parser = parse_target)]
    rebounds: Option<i64>,

    #[arg(long, value_parser = parse_target)]
    assists: Option<i64>,

    #[arg(long, value_parser = parse_target)]
    threes: Option<i64>,

    /// Games included in the rolling averages (default: all).
    #[arg(long)]
    last: Option<usize>,

    /// Monte Carlo draws for the headline probabilities (100..=200000).
    #[arg(long)]
    samples: Option<usize>,

    /// Only report these stats (PTS, REB, AST, 3PM); repeatable.
    #[arg(long = "stat", value_parser = parse_stat)]
    stats: Vec<StatKind>,

    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_target(raw: &str) -> Result<i64, String> {
    game_log::parse_custom_target(raw.trim())
        .ok_or_else(|| format!("`{raw}` is not a positive whole number"))
}

fn parse_stat(raw: &str) -> Result<StatKind, String> {
    StatKind::from_code(raw).ok_or_else(|| format!("`{raw}` is not one of PTS, REB, AST, 3PM"))
}

fn engine_config(cli: &Cli, base: EngineConfig) -> EngineConfig {
    match cli.samples {
        Some(samples) => base.with_primary_samples(samples),
        None => base,
    }
}

fn main() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoops_props=warn".into()),
        )
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = engine_config(&cli, *EngineConfig::global());

    let raw = fs::read_to_string(&cli.file)
        .with_context(|| format!("read game log {}", cli.file.display()))?;
    let log = game_log::parse_player_log_json(&raw)
        .with_context(|| format!("parse game log {}", cli.file.display()))?;
    info!(
        player = %log.player_id,
        games = log.games.len(),
        "loaded game log"
    );

    let defaults = Targets::default();
    let targets = Targets {
        points: cli.points.unwrap_or(defaults.points),
        rebounds: cli.rebounds.unwrap_or(defaults.rebounds),
        assists: cli.assists.unwrap_or(defaults.assists),
        threes: cli.threes.unwrap_or(defaults.threes),
    };

    let mut report = insights::player_report(&log, &targets, cli.last, &cfg);
    if !cli.stats.is_empty() {
        report.insights.retain(|insight| cli.stats.contains(&insight.stat));
    }
    if cli.json {
        let out = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{out}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PlayerReport) {
    let name = if report.player_name.is_empty() {
        "Unknown player"
    } else {
        report.player_name.as_str()
    };
    println!("{name} ({}) - {} games", report.team_name, report.games);

    let avg = &report.averages;
    println!();
    println!("Last {} games", avg.games);
    println!(
        "  PPG {:>5.1}  RPG {:>5.1}  APG {:>5.1}  3PM {:>5.1}  MPG {:>5.1}",
        avg.points, avg.rebounds, avg.assists, avg.threes, avg.minutes
    );
    println!(
        "  FG% {:>5.1}  3P% {:>5.1}  FT% {:>5.1}",
        avg.fg_pct, avg.three_pct, avg.ft_pct
    );

    for insight in &report.insights {
        let p = &insight.projection;
        let dispersion = match p.dispersion {
            Dispersion::Fixed(size) => format!("NB size {size:.2}"),
            Dispersion::Poisson => "Poisson".to_string(),
        };
        let zero = p
            .zero_inflation
            .map(|z| format!(", zero mass {:.0}%", z * 100.0))
            .unwrap_or_default();

        println!();
        println!(
            "{} (at least {}): {:>3}%",
            insight.label, insight.target, insight.percent
        );
        println!("  projected {:.2} [{dispersion}{zero}]", p.mu);
        println!("  {}", insight.summary);
        let ladder = insight
            .ladder
            .iter()
            .map(|r| format!("{}+ {}%", r.target, r.percent))
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {ladder}");
    }

    if report.games == 0 {
        println!();
        println!("No games in log; all probabilities are 0.");
    }
}
