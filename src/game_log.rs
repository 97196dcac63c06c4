use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Counting stats the engine can forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Points,
    Rebounds,
    Assists,
    Threes,
}

impl StatKind {
    /// Display order of the insights panel.
    pub const ALL: [StatKind; 4] = [
        StatKind::Points,
        StatKind::Threes,
        StatKind::Assists,
        StatKind::Rebounds,
    ];

    pub fn code(self) -> &'static str {
        match self {
            StatKind::Points => "PTS",
            StatKind::Rebounds => "REB",
            StatKind::Assists => "AST",
            StatKind::Threes => "3PM",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatKind::Points => "Points",
            StatKind::Rebounds => "Rebounds",
            StatKind::Assists => "Assists",
            StatKind::Threes => "3-Pointers",
        }
    }

    /// "Chance to {phrase} next game."
    pub fn phrase(self, target: i64) -> String {
        match self {
            StatKind::Points => format!("score at least {target} points"),
            StatKind::Rebounds => format!("grab at least {target} rebounds"),
            StatKind::Assists => format!("record at least {target} assists"),
            StatKind::Threes => format!("make at least {target} threes"),
        }
    }

    pub fn presets(self) -> &'static [i64] {
        match self {
            StatKind::Points => &[5, 10, 15, 20, 25],
            StatKind::Threes => &[1, 2, 3, 4, 5],
            StatKind::Assists | StatKind::Rebounds => &[3, 5, 7, 9, 13],
        }
    }

    pub fn default_target(self) -> i64 {
        match self {
            StatKind::Points => 5,
            StatKind::Rebounds | StatKind::Assists => 3,
            StatKind::Threes => 1,
        }
    }

    pub fn value(self, game: &GameRecord) -> f64 {
        match self {
            StatKind::Points => game.points,
            StatKind::Rebounds => game.rebounds,
            StatKind::Assists => game.assists,
            StatKind::Threes => game.threes,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PTS" | "POINTS" => Some(StatKind::Points),
            "REB" | "REBOUNDS" => Some(StatKind::Rebounds),
            "AST" | "ASSISTS" => Some(StatKind::Assists),
            "3PM" | "THREES" => Some(StatKind::Threes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub team_name: String,
    pub opponent_name: String,
    pub season: String,
    pub season_type: String,
    pub game_date: String,
    pub date: Option<NaiveDate>,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
    pub fg_pct: f64,
    pub three_pct: f64,
    pub ft_pct: f64,
    pub fg_made: f64,
    pub fg_attempted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLog {
    pub player_id: String,
    pub player_name: String,
    pub games: Vec<GameRecord>,
}

impl PlayerLog {
    /// Stable sort by date, newest first; undated games go last.
    pub fn sort_recent_first(&mut self) {
        self.games.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// Per-game counts and minutes in the log's order (recent first once sorted).
    pub fn series(&self, stat: StatKind) -> (Vec<f64>, Vec<f64>) {
        self.games
            .iter()
            .map(|g| (stat.value(g), g.minutes))
            .unzip()
    }

    pub fn team_name(&self) -> &str {
        self.games
            .first()
            .map(|g| g.team_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingAverages {
    pub games: usize,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
    pub minutes: f64,
    pub fg_pct: f64,
    pub three_pct: f64,
    pub ft_pct: f64,
}

/// Averages over the `last_n` leading (most recent) games.
///
/// Shooting percentages only count games where the percentage is positive, so
/// a night without attempts does not drag the average to zero.
pub fn rolling_averages(games: &[GameRecord], last_n: usize) -> RollingAverages {
    let window = &games[..last_n.min(games.len())];
    if window.is_empty() {
        return RollingAverages::default();
    }

    let n = window.len() as f64;
    let avg = |f: fn(&GameRecord) -> f64| window.iter().map(f).sum::<f64>() / n;
    let positive_avg = |f: fn(&GameRecord) -> f64| {
        let vals: Vec<f64> = window.iter().map(f).filter(|v| *v > 0.0).collect();
        if vals.is_empty() {
            0.0
        } else {
            vals.iter().sum::<f64>() / vals.len() as f64
        }
    };

    RollingAverages {
        games: window.len(),
        points: avg(|g| g.points),
        rebounds: avg(|g| g.rebounds),
        assists: avg(|g| g.assists),
        threes: avg(|g| g.threes),
        minutes: avg(|g| g.minutes),
        fg_pct: positive_avg(|g| g.fg_pct),
        three_pct: positive_avg(|g| g.three_pct),
        ft_pct: positive_avg(|g| g.ft_pct),
    }
}

/// Decodes a player game log and orders it most recent first.
///
/// Every numeric field is lenient: strings, numbers, null and missing values
/// are all accepted, and anything that is not a finite number becomes 0.
pub fn parse_player_log_json(raw: &str) -> Result<PlayerLog> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(PlayerLog {
            player_id: String::new(),
            player_name: String::new(),
            games: Vec::new(),
        });
    }

    let root: Value = serde_json::from_str(trimmed).context("invalid player stats json")?;
    let games = root
        .get("games")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(parse_game).collect())
        .unwrap_or_default();

    let mut log = PlayerLog {
        player_id: pick_string(&root, &["player_id", "playerId", "id"]).unwrap_or_default(),
        player_name: pick_string(&root, &["player_name", "playerName", "name"]).unwrap_or_default(),
        games,
    };
    log.sort_recent_first();
    Ok(log)
}

fn parse_game(row: &Value) -> GameRecord {
    let stats = row.get("player_stats").unwrap_or(&Value::Null);
    let game_date = pick_string(row, &["game_date", "date"]).unwrap_or_default();
    let date = parse_game_date(&game_date);
    if date.is_none() && !game_date.is_empty() {
        warn!(game_date = %game_date, "unrecognised game date, ordering it last");
    }

    GameRecord {
        game_id: pick_string(row, &["game_id", "id"]).unwrap_or_default(),
        team_name: pick_string(row, &["team_name"]).unwrap_or_default(),
        opponent_name: pick_string(row, &["opponent_name"]).unwrap_or_default(),
        season: pick_string(row, &["season"]).unwrap_or_default(),
        season_type: pick_string(row, &["season_type"]).unwrap_or_default(),
        game_date,
        date,
        minutes: lenient_f64(stats.get("mpg")).max(0.0),
        points: lenient_f64(stats.get("ppg")),
        rebounds: lenient_f64(stats.get("rpg")),
        assists: lenient_f64(stats.get("apg")),
        threes: lenient_f64(stats.get("three_pm")),
        fg_pct: lenient_f64(stats.get("fg_pct")),
        three_pct: lenient_f64(stats.get("three_p_pct")),
        ft_pct: lenient_f64(stats.get("ft_pct")),
        fg_made: lenient_f64(stats.get("fg_made")),
        fg_attempted: lenient_f64(stats.get("fg_attempted")),
    }
}

/// Accepts `YYYY-MM-DD` (optionally followed by a time) or `MON DD, YYYY`.
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Some(prefix) = trimmed.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }
    NaiveDate::parse_from_str(trimmed, "%b %d, %Y").ok()
}

/// Only positive integers without a leading zero are valid custom targets.
pub fn parse_custom_target(raw: &str) -> Option<i64> {
    let mut chars = raw.chars();
    let first = chars.next()?;
    if !('1'..='9').contains(&first) || !chars.all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

fn lenient_f64(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_leading_f64(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// Reads the longest numeric prefix, so "35:12" minutes read as 35.
fn parse_leading_f64(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}
