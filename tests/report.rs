use hoops_props::config::EngineConfig;
use hoops_props::game_log::{StatKind, parse_player_log_json};
use hoops_props::insights::{PlayerProjections, Targets, player_report};
use hoops_props::sampling::Dispersion;

static PLAYER_JSON: &str = include_str!("fixtures/player_stats.json");

#[test]
fn projections_skip_did_not_play_games() {
    let log = parse_player_log_json(PLAYER_JSON).expect("fixture should parse");
    let cfg = EngineConfig::default();
    let projections = PlayerProjections::from_log(&log, &cfg.projection);

    let pts = projections.get(StatKind::Points);
    assert!(pts.mu > 28.0 && pts.mu < 40.0, "mu {}", pts.mu);
    // The 0-point DNP stays in the raw dispersion window.
    assert!(matches!(pts.dispersion, Dispersion::Fixed(size) if size > 0.0));
    assert_eq!(pts.zero_inflation, None);
}

#[test]
fn repeated_reports_are_identical() {
    let log = parse_player_log_json(PLAYER_JSON).expect("fixture should parse");
    let targets = Targets {
        points: 30,
        ..Targets::default()
    };
    let cfg = EngineConfig::default();
    let first = player_report(&log, &targets, Some(5), &cfg);
    let second = player_report(&log, &targets, Some(5), &cfg);
    assert_eq!(first, second);

    let pts = &first.insights[0];
    assert_eq!(pts.stat, StatKind::Points);
    assert_eq!(pts.target, 30);
    assert!(pts.seed_key.starts_with("1628983-PTS-30-"));
    assert_eq!(first.averages.games, 5);
}

#[test]
fn ladder_probabilities_fall_as_targets_rise() {
    let log = parse_player_log_json(PLAYER_JSON).expect("fixture should parse");
    let report = player_report(&log, &Targets::default(), None, &EngineConfig::default());
    let pts = &report.insights[0];
    let probs: Vec<f64> = pts.ladder.iter().map(|r| r.probability).collect();
    assert_eq!(pts.ladder.len(), 5);
    // 5+ points from a 30-a-night scorer.
    assert!(probs[0] > 0.9, "{probs:?}");
    assert!(probs[0] > probs[4], "{probs:?}");
}

#[test]
fn report_serializes_to_json() {
    let log = parse_player_log_json(PLAYER_JSON).expect("fixture should parse");
    let report = player_report(&log, &Targets::default(), Some(3), &EngineConfig::default());
    let json = serde_json::to_value(&report).expect("report should serialize");
    assert_eq!(json["team_name"], "OKC");
    assert_eq!(json["insights"][1]["code"], "3PM");
    assert!(json["insights"][0]["projection"]["dispersion"]["kind"].is_string());
    assert!(json["insights"][0]["probability"].as_f64().is_some());
}

#[test]
fn empty_log_reports_zero_everywhere() {
    let log = parse_player_log_json("null").expect("null should parse");
    let report = player_report(&log, &Targets::default(), None, &EngineConfig::default());
    assert_eq!(report.games, 0);
    assert_eq!(report.team_name, "N/A");
    for insight in &report.insights {
        assert_eq!(insight.projection.mu, 0.0);
        assert_eq!(insight.probability, 0.0);
        assert!(insight.ladder.iter().all(|r| r.percent == 0));
    }
}
