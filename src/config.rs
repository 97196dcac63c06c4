use std::env;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::probability::{MAX_ZERO_INFLATION, PRIMARY_SAMPLES, SWEEP_SAMPLES};
use crate::projection::ProjectionConfig;

static GLOBAL: OnceCell<EngineConfig> = OnceCell::new();

const MIN_SAMPLES: usize = 100;
const MAX_SAMPLES: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub projection: ProjectionConfig,
    pub sweep_samples: usize,
    pub primary_samples: usize,
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            sweep_samples: SWEEP_SAMPLES,
            primary_samples: PRIMARY_SAMPLES,
            parallelism: 4,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `PROPS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Process-wide config, read from the environment on first use.
    pub fn global() -> &'static EngineConfig {
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Overrides the headline sample count, held to the same bounds as the env value.
    pub fn with_primary_samples(self, samples: usize) -> Self {
        Self {
            primary_samples: clamp_samples(samples),
            ..self
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let lookback_min = parse_or(&lookup, "PROPS_LOOKBACK_MIN", d.projection.lookback_min)
            .clamp(1, 50);
        let lookback_max = parse_or(&lookup, "PROPS_LOOKBACK_MAX", d.projection.lookback_max)
            .clamp(lookback_min, 82);
        let zero_inflation_trigger = parse_or(
            &lookup,
            "PROPS_ZERO_INFLATION_TRIGGER",
            d.projection.zero_inflation_trigger,
        )
        .clamp(0.0, 1.0);

        Self {
            projection: ProjectionConfig {
                lookback_min,
                lookback_max,
                zero_inflation_trigger,
                zero_inflation_cap: MAX_ZERO_INFLATION,
            },
            sweep_samples: clamp_samples(parse_or(
                &lookup,
                "PROPS_SWEEP_SAMPLES",
                d.sweep_samples,
            )),
            primary_samples: clamp_samples(parse_or(
                &lookup,
                "PROPS_PRIMARY_SAMPLES",
                d.primary_samples,
            )),
            parallelism: parse_or(&lookup, "PROPS_PARALLELISM", d.parallelism).clamp(1, 32),
        }
    }
}

fn clamp_samples(samples: usize) -> usize {
    samples.clamp(MIN_SAMPLES, MAX_SAMPLES)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}
