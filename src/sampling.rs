use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::rng::UnitRng;

// Knuth's product method gets slow (and loses precision in e^-lambda) past this.
const KNUTH_MAX_LAMBDA: f64 = 30.0;
const SQUEEZE: f64 = 0.0331;

/// Overdispersion of a count model.
///
/// `Fixed(size)` is the NB2 size parameter (variance = mean + mean^2 / size).
/// `Poisson` is the limit size -> infinity, i.e. variance equals the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "size", rename_all = "snake_case")]
pub enum Dispersion {
    Fixed(f64),
    Poisson,
}

impl Dispersion {
    /// Size usable for Gamma-Poisson mixing, `None` when the model is Poisson.
    pub fn size(self) -> Option<f64> {
        match self {
            Dispersion::Fixed(size) if size.is_finite() && size > 0.0 => Some(size),
            _ => None,
        }
    }
}

/// Box-Muller transform, cosine branch.
pub fn standard_normal<R: UnitRng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = rng.next_unit().max(f64::MIN_POSITIVE);
    let u2 = rng.next_unit();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Gamma(shape, scale) via Marsaglia & Tsang (2000).
///
/// Returns 0 for non-positive or non-finite parameters.
pub fn gamma<R: UnitRng + ?Sized>(shape: f64, scale: f64, rng: &mut R) -> f64 {
    if !(shape.is_finite() && scale.is_finite()) || shape <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    if shape < 1.0 {
        let u = rng.next_unit();
        return gamma(shape + 1.0, scale, rng) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let (z, v) = loop {
            let z = standard_normal(rng);
            let v = 1.0 + c * z;
            if v > 0.0 {
                break (z, v);
            }
        };
        let v = v * v * v;
        let u = rng.next_unit();
        let z2 = z * z;
        if u < 1.0 - SQUEEZE * z2 * z2 {
            return d * v * scale;
        }
        if u.ln() < 0.5 * z2 + d * (1.0 - v + v.ln()) {
            return d * v * scale;
        }
    }
}

/// Poisson(lambda): Knuth for small rates, rounded-down normal approximation above 30.
pub fn poisson<R: UnitRng + ?Sized>(lambda: f64, rng: &mut R) -> u64 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 0;
    }
    if lambda < KNUTH_MAX_LAMBDA {
        let limit = (-lambda).exp();
        let mut k = 0u64;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= rng.next_unit();
            if p <= limit {
                return k - 1;
            }
        }
    }

    let z = standard_normal(rng);
    let value = (lambda + lambda.sqrt() * z).floor();
    if value <= 0.0 { 0 } else { value as u64 }
}

/// Negative Binomial draw as a Gamma-Poisson mixture.
///
/// With [`Dispersion::Poisson`] this is exactly `poisson(mean)` on the same stream.
pub fn negative_binomial<R: UnitRng + ?Sized>(
    mean: f64,
    dispersion: Dispersion,
    rng: &mut R,
) -> u64 {
    if !mean.is_finite() || mean <= 0.0 {
        return 0;
    }
    match dispersion.size() {
        None => poisson(mean, rng),
        Some(size) => {
            let lambda = gamma(size, mean / size, rng);
            poisson(lambda, rng)
        }
    }
}
