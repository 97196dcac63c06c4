use serde::{Deserialize, Serialize};

use crate::sampling::Dispersion;

// Guards the overdispersion test against float noise when variance ~= mean.
const DISPERSION_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub lookback_min: usize,
    pub lookback_max: usize,
    /// Zero fraction of the window above which a zero point-mass is fitted.
    pub zero_inflation_trigger: f64,
    pub zero_inflation_cap: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            lookback_min: 3,
            lookback_max: 10,
            zero_inflation_trigger: 0.3,
            zero_inflation_cap: 0.98,
        }
    }
}

/// Fitted next-game count model for one stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub mu: f64,
    pub dispersion: Dispersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_inflation: Option<f64>,
}

impl Projection {
    pub fn empty() -> Self {
        Self {
            mu: 0.0,
            dispersion: Dispersion::Poisson,
            zero_inflation: None,
        }
    }
}

/// Projects the next-game mean, dispersion and zero mass from a game log.
///
/// `counts` and `minutes` are aligned by index, most recent game first.
pub fn project(counts: &[f64], minutes: &[f64]) -> Projection {
    project_with(counts, minutes, &ProjectionConfig::default())
}

pub fn project_with(counts: &[f64], minutes: &[f64], cfg: &ProjectionConfig) -> Projection {
    let n = counts.len().min(minutes.len());
    if n == 0 {
        return Projection::empty();
    }

    let played: Vec<(f64, f64)> = counts[..n]
        .iter()
        .zip(&minutes[..n])
        .map(|(c, m)| (clean(*c), clean(*m)))
        .filter(|(_, m)| *m > 0.0)
        .collect();
    if played.is_empty() {
        return Projection::empty();
    }

    let lo = cfg.lookback_min.max(1);
    let hi = cfg.lookback_max.max(lo);
    let look = played.len().clamp(lo, hi);
    let alpha = 2.0 / (look as f64 + 1.0);

    // Window is recent-first; EWMA runs oldest -> newest over the last `look` played
    // games only, not the whole played history.
    let window = &played[..look.min(played.len())];
    let rates_chrono: Vec<f64> = window.iter().rev().map(|(c, m)| c / m).collect();
    let minutes_chrono: Vec<f64> = window.iter().rev().map(|(_, m)| *m).collect();
    let mu = (ewma(&rates_chrono, alpha) * ewma(&minutes_chrono, alpha)).max(0.0);
    if !mu.is_finite() {
        return Projection::empty();
    }

    let raw: Vec<f64> = counts[..look.min(n)].iter().map(|c| clean(*c)).collect();
    let mu_emp = mean(&raw);
    let v_emp = variance(&raw, mu_emp);
    let dispersion = if v_emp > mu_emp + DISPERSION_EPS {
        Dispersion::Fixed(mu_emp * mu_emp / (v_emp - mu_emp))
    } else {
        Dispersion::Poisson
    };

    let zeros = raw.iter().filter(|v| **v == 0.0).count();
    let zero_frac = zeros as f64 / raw.len() as f64;
    let zero_inflation = (zero_frac > cfg.zero_inflation_trigger)
        .then(|| zero_frac.min(cfg.zero_inflation_cap));

    Projection {
        mu,
        dispersion,
        zero_inflation,
    }
}

/// Exponentially weighted average seeded with the first (oldest) value.
pub fn ewma(values: &[f64], alpha: f64) -> f64 {
    let Some((first, rest)) = values.split_first() else {
        return 0.0;
    };
    rest.iter().fold(*first, |s, x| alpha * x + (1.0 - alpha) * s)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance around `mu`.
pub fn variance(values: &[f64], mu: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64
}

fn clean(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_is_zero_poisson() {
        assert_eq!(project(&[], &[]), Projection::empty());
    }

    #[test]
    fn no_minutes_played_is_zero_poisson() {
        let p = project(&[0.0, 4.0], &[0.0, 0.0]);
        assert_eq!(p.mu, 0.0);
        assert_eq!(p.dispersion, Dispersion::Poisson);
    }

    #[test]
    fn misaligned_inputs_use_shorter_length() {
        let p = project(&[10.0, 10.0, 10.0], &[30.0]);
        assert!((p.mu - 10.0).abs() < 1e-9);
    }

    #[test]
    fn constant_rate_projects_exact_mean() {
        let counts = [12.0; 6];
        let minutes = [24.0; 6];
        let p = project(&counts, &minutes);
        assert!((p.mu - 12.0).abs() < 1e-9);
        assert_eq!(p.dispersion, Dispersion::Poisson);
        assert_eq!(p.zero_inflation, None);
    }

    #[test]
    fn ewma_weights_recent_values_more() {
        // Oldest -> newest.
        let rising = ewma(&[1.0, 2.0, 3.0, 10.0], 0.4);
        assert!(rising > mean(&[1.0, 2.0, 3.0, 10.0]));
        assert_eq!(ewma(&[], 0.5), 0.0);
        assert_eq!(ewma(&[7.0], 0.5), 7.0);
        assert!((ewma(&[0.0, 10.0], 0.25) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn recent_hot_streak_lifts_projection() {
        // Most recent first: three big games after a quiet stretch.
        let counts = [30.0, 28.0, 31.0, 12.0, 10.0, 11.0, 12.0, 9.0];
        let minutes = [32.0; 8];
        let p = project(&counts, &minutes);
        assert!(p.mu > mean(&counts), "mu {} should lean to recent games", p.mu);
    }

    #[test]
    fn overdispersed_window_gets_nb2_size() {
        let counts = [0.0, 8.0, 1.0, 9.0, 0.0, 10.0];
        let minutes = [30.0; 6];
        let p = project(&counts, &minutes);
        let mu_emp = mean(&counts);
        let v_emp = variance(&counts, mu_emp);
        match p.dispersion {
            Dispersion::Fixed(size) => {
                assert!((size - mu_emp * mu_emp / (v_emp - mu_emp)).abs() < 1e-9);
            }
            Dispersion::Poisson => panic!("expected overdispersion"),
        }
    }

    #[test]
    fn sparse_stat_gets_zero_inflation() {
        let counts = [0.0, 2.0, 0.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0];
        let minutes = [28.0; 10];
        let p = project(&counts, &minutes);
        assert_eq!(p.zero_inflation, Some(0.6));

        let few_zeros = [1.0, 2.0, 0.0, 2.0, 1.0, 3.0, 2.0, 1.0, 1.0, 2.0];
        assert_eq!(project(&few_zeros, &minutes).zero_inflation, None);
    }

    #[test]
    fn zero_inflation_never_exceeds_cap() {
        // Played minutes but never scored: zero fraction is 1.0.
        let p = project(&[0.0; 5], &[12.0; 5]);
        assert_eq!(p.zero_inflation, Some(0.98));
        assert_eq!(p.mu, 0.0);
    }

    #[test]
    fn lookback_caps_dispersion_window_at_ten_games() {
        // Ten steady games followed (older) by wild ones that must be ignored.
        let mut counts = vec![20.0; 10];
        counts.extend([0.0, 60.0, 0.0, 60.0]);
        let minutes = vec![34.0; counts.len()];
        let p = project(&counts, &minutes);
        assert_eq!(p.dispersion, Dispersion::Poisson);
        assert!((p.mu - 20.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_inputs_are_neutralised() {
        let p = project(&[f64::NAN, 10.0, 10.0], &[30.0, f64::INFINITY, 30.0]);
        assert!(p.mu.is_finite());
        assert!(p.mu >= 0.0);
    }

    #[test]
    fn subnormal_minutes_do_not_project_infinity() {
        let p = project(&[5.0, 6.0, 4.0], &[1e-320, 30.0, 30.0]);
        assert_eq!(p, Projection::empty());
    }

    #[test]
    fn only_the_lookback_window_feeds_the_mean() {
        // Ten recent games at 1 per minute, older games at 3 per minute.
        let mut counts = vec![30.0; 10];
        counts.extend([90.0; 5]);
        let minutes = vec![30.0; counts.len()];
        let p = project(&counts, &minutes);
        assert!((p.mu - 30.0).abs() < 1e-9, "mu {}", p.mu);
    }
}
