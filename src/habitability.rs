//! Scores how suitable surface conditions are for Earth-like life.
//!
//! Each factor is a step function over nested inclusive ranges, tested from
//! the narrowest outward.

use crate::config::HabitabilityConfig;
use once_cell::sync::Lazy;

static DEFAULT_HABITABILITY: Lazy<HabitabilityConfig> = Lazy::new(HabitabilityConfig::default);

/// (low, high, score) bands, narrowest first.
const TEMPERATURE_BANDS_K: [(f64, f64, f64); 3] = [
    (288.0, 295.0, 1.0),
    (270.0, 310.0, 0.8),
    (250.0, 320.0, 0.4),
];
const TEMPERATURE_LIMITS_K: (f64, f64) = (240.0, 320.0);
const TEMPERATURE_FLOOR_SCORE: f64 = 0.1;

const PRESSURE_BANDS_BAR: [(f64, f64, f64); 2] = [(0.7, 1.3, 1.0), (0.5, 2.0, 0.7)];
const PRESSURE_LIMITS_BAR: (f64, f64) = (0.3, 3.0);
const PRESSURE_FLOOR_SCORE: f64 = 0.3;

const OXYGEN_BANDS_PCT: [(f64, f64, f64); 2] = [(15.0, 25.0, 1.0), (10.0, 30.0, 0.7)];
const OXYGEN_LIMITS_PCT: (f64, f64) = (5.0, 35.0);
const OXYGEN_FLOOR_SCORE: f64 = 0.3;

fn banded_score(value: f64, limits: (f64, f64), bands: &[(f64, f64, f64)], floor: f64) -> f64 {
    if !(limits.0..=limits.1).contains(&value) {
        return 0.0;
    }
    bands
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&value))
        .map_or(floor, |(_, _, score)| *score)
}

pub fn temperature_factor(temperature_k: f64) -> f64 {
    banded_score(
        temperature_k,
        TEMPERATURE_LIMITS_K,
        &TEMPERATURE_BANDS_K,
        TEMPERATURE_FLOOR_SCORE,
    )
}

pub fn pressure_factor(pressure_bar: f64) -> f64 {
    banded_score(pressure_bar, PRESSURE_LIMITS_BAR, &PRESSURE_BANDS_BAR, PRESSURE_FLOOR_SCORE)
}

pub fn oxygen_factor(oxygen_pct: f64) -> f64 {
    banded_score(oxygen_pct, OXYGEN_LIMITS_PCT, &OXYGEN_BANDS_PCT, OXYGEN_FLOOR_SCORE)
}

#[derive(Debug, Clone, Copy)]
pub struct HabitabilityEvaluator<'a> {
    config: &'a HabitabilityConfig,
}

impl HabitabilityEvaluator<'static> {
    pub fn standard() -> Self {
        HabitabilityEvaluator {
            config: &DEFAULT_HABITABILITY,
        }
    }
}

impl<'a> HabitabilityEvaluator<'a> {
    pub fn new(config: &'a HabitabilityConfig) -> Self {
        HabitabilityEvaluator { config }
    }

    /// Weighted combination of the three factors, 0..1.
    pub fn habitability(&self, temperature_k: f64, pressure_bar: f64, oxygen_pct: f64) -> f64 {
        let score = self.config.temperature_weight * temperature_factor(temperature_k)
            + self.config.pressure_weight * pressure_factor(pressure_bar)
            + self.config.oxygen_weight * oxygen_factor(oxygen_pct);
        score.clamp(0.0, 1.0)
    }

    pub fn biodiversity(&self, biome_count: usize) -> f64 {
        if self.config.max_biomes == 0 {
            return if biome_count > 0 { 1.0 } else { 0.0 };
        }
        (biome_count as f64 / self.config.max_biomes as f64).min(1.0)
    }
}

pub fn calculate_habitability(temperature_k: f64, pressure_bar: f64, oxygen_pct: f64) -> f64 {
    HabitabilityEvaluator::standard().habitability(temperature_k, pressure_bar, oxygen_pct)
}

pub fn calculate_biodiversity(biome_count: usize) -> f64 {
    HabitabilityEvaluator::standard().biodiversity(biome_count)
}
