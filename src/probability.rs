use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::projection::Projection;
use crate::rng::{EntropyRng, UnitRng, make_seeded_rng};
use crate::sampling::{Dispersion, negative_binomial};

pub const SWEEP_SAMPLES: usize = 2000;
pub const PRIMARY_SAMPLES: usize = 4000;
pub const MAX_ZERO_INFLATION: f64 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleOptions {
    pub samples: usize,
    pub zero_inflation: Option<f64>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            samples: SWEEP_SAMPLES,
            zero_inflation: None,
        }
    }
}

impl SampleOptions {
    pub fn with_samples(samples: usize) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    pub fn for_projection(projection: &Projection, samples: usize) -> Self {
        Self {
            samples,
            zero_inflation: projection.zero_inflation,
        }
    }

    fn zero_mass(&self) -> f64 {
        match self.zero_inflation {
            Some(p) if p.is_finite() => p.clamp(0.0, MAX_ZERO_INFLATION),
            _ => 0.0,
        }
    }
}

/// Monte Carlo estimate of `P(count >= threshold)`; the threshold is inclusive.
///
/// Without an `rng` the draws come from OS entropy and the estimate is not reproducible.
pub fn probability_at_least(
    mu: f64,
    dispersion: Dispersion,
    threshold: i64,
    opts: SampleOptions,
    rng: Option<&mut dyn UnitRng>,
) -> f64 {
    if threshold < 0 {
        return 0.0;
    }
    let cutoff = threshold as u64;
    simulate(mu, dispersion, &opts, rng, |y| y >= cutoff)
}

/// Monte Carlo estimate of "over `line`" where lines are quoted as X.5,
/// i.e. `P(count >= floor(line) + 1)`.
pub fn probability_over_line(
    mu: f64,
    dispersion: Dispersion,
    line: f64,
    opts: SampleOptions,
    rng: Option<&mut dyn UnitRng>,
) -> f64 {
    if !line.is_finite() {
        return 0.0;
    }
    let cutoff = line.floor() + 1.0;
    if cutoff < 0.0 {
        return 0.0;
    }
    probability_at_least(mu, dispersion, cutoff as i64, opts, rng)
}

/// Monte Carlo estimate of `P(count == exact)`.
pub fn probability_exact(
    mu: f64,
    dispersion: Dispersion,
    exact: i64,
    opts: SampleOptions,
    rng: Option<&mut dyn UnitRng>,
) -> f64 {
    if exact < 0 {
        return 0.0;
    }
    let target = exact as u64;
    simulate(mu, dispersion, &opts, rng, |y| y == target)
}

/// Stable RNG key for a displayed query: same inputs, same probability.
pub fn seed_key(
    player_id: &str,
    stat_code: &str,
    threshold: i64,
    projection: &Projection,
) -> String {
    let size = match projection.dispersion.size() {
        Some(size) => format!("{size:.6}"),
        None => "inf".to_string(),
    };
    format!(
        "{player_id}-{stat_code}-{threshold}-{:.6}-{size}-{:.6}",
        projection.mu,
        projection.zero_inflation.unwrap_or(0.0)
    )
}

/// Reproducible `P(count >= threshold)` for a fitted projection.
pub fn seeded_probability_at_least(
    player_id: &str,
    stat_code: &str,
    threshold: i64,
    projection: &Projection,
    samples: usize,
) -> f64 {
    let key = seed_key(player_id, stat_code, threshold, projection);
    let mut rng = make_seeded_rng(&key);
    let p = probability_at_least(
        projection.mu,
        projection.dispersion,
        threshold,
        SampleOptions::for_projection(projection, samples),
        Some(&mut rng),
    );
    debug!(key = %key, probability = p, "seeded at-least query");
    p
}

fn simulate(
    mu: f64,
    dispersion: Dispersion,
    opts: &SampleOptions,
    rng: Option<&mut dyn UnitRng>,
    hit: impl Fn(u64) -> bool,
) -> f64 {
    if opts.samples == 0 {
        return 0.0;
    }
    match rng {
        Some(rng) => hit_rate(mu, dispersion, opts, rng, hit),
        None => hit_rate(mu, dispersion, opts, &mut EntropyRng::new(), hit),
    }
}

fn hit_rate<R: UnitRng + ?Sized>(
    mu: f64,
    dispersion: Dispersion,
    opts: &SampleOptions,
    rng: &mut R,
    hit: impl Fn(u64) -> bool,
) -> f64 {
    let p_zero = opts.zero_mass();
    let mut hits = 0usize;
    for _ in 0..opts.samples {
        let y = if p_zero > 0.0 && rng.next_unit() < p_zero {
            0
        } else {
            negative_binomial(mu, dispersion, rng)
        };
        if hit(y) {
            hits += 1;
        }
    }
    hits as f64 / opts.samples as f64
}
