//! Tunable model parameters.
//!
//! Every table is optional in the TOML file; missing tables and keys fall
//! back to the `Default` values, which are the calibrated model constants.
//!
//! ```toml
//! [climate]
//! polar_offset_k = 75.0
//!
//! [volatiles.release_thresholds_k]
//! CO2 = 194.7
//!
//! [geology]
//! regolith_m_per_rate = 0.02
//!
//! [habitability]
//! max_biomes = 10
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Temperature, ice line and greenhouse parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClimateConfig {
    /// Equator-to-pole contrast before pressure damping.
    pub polar_offset_k: f64,
    /// Atmospheric heat transport: offset / (1 + damping * P).
    pub pressure_damping: f64,
    pub tropical_factor: f64,
    /// Freezing point used for the ice line.
    pub freezing_point_k: f64,
    pub lapse_rate_k_per_km: f64,
    pub min_surface_temp_k: f64,
    pub max_surface_temp_k: f64,
    pub max_greenhouse_factor: f64,
    /// Greenhouse weight per unit mass fraction, keyed by formula.
    pub greenhouse_coefficients: BTreeMap<String, f64>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            polar_offset_k: 75.0,
            pressure_damping: 5.0,
            tropical_factor: 1.1,
            freezing_point_k: 273.0,
            lapse_rate_k_per_km: 6.5,
            min_surface_temp_k: 150.0,
            max_surface_temp_k: 350.0,
            max_greenhouse_factor: 2.0,
            greenhouse_coefficients: [("CO2", 0.1), ("H2O", 0.5), ("CH4", 0.3), ("N2O", 0.2)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Geosphere outgassing and atmospheric freeze-out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VolatileConfig {
    pub release_thresholds_k: BTreeMap<String, f64>,
    pub default_release_threshold_k: f64,
    pub surface_ramp_k: f64,
    pub surface_max_rate: f64,
    pub subsurface_factor: f64,
    /// Applied instead of the depth scaling when regolith depth is unknown.
    pub unknown_depth_factor: f64,
    pub clathrate_thresholds_k: BTreeMap<String, f64>,
    pub default_clathrate_threshold_k: f64,
    pub clathrate_ramp_k: f64,
    pub clathrate_max_rate: f64,
    pub freeze_out_ramp_k: f64,
    pub freeze_out_max_fraction: f64,
}

impl Default for VolatileConfig {
    fn default() -> Self {
        let table = |pairs: &[(&str, f64)]| -> BTreeMap<String, f64> {
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        };
        Self {
            release_thresholds_k: table(&[
                ("CO2", 194.7),
                ("N2", 63.2),
                ("CH4", 90.7),
                ("H2O", 273.0),
                ("O2", 54.8),
            ]),
            default_release_threshold_k: 150.0,
            surface_ramp_k: 50.0,
            surface_max_rate: 0.05,
            subsurface_factor: 0.5,
            unknown_depth_factor: 0.25,
            clathrate_thresholds_k: table(&[("CO2", 220.0), ("CH4", 200.0), ("N2", 180.0)]),
            default_clathrate_threshold_k: 200.0,
            clathrate_ramp_k: 100.0,
            clathrate_max_rate: 0.01,
            freeze_out_ramp_k: 50.0,
            freeze_out_max_fraction: 0.5,
        }
    }
}

/// Evaporation, precipitation and ice exchange between hydrosphere and atmosphere.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WaterCycleConfig {
    pub freezing_point_k: f64,
    pub evaporation_per_k: f64,
    pub max_evaporation_fraction: f64,
    pub base_precipitation_fraction: f64,
    pub precipitation_per_k: f64,
    pub melt_fraction: f64,
    pub freeze_fraction: f64,
}

impl Default for WaterCycleConfig {
    fn default() -> Self {
        Self {
            freezing_point_k: 273.15,
            evaporation_per_k: 1.0e-4,
            max_evaporation_fraction: 0.01,
            base_precipitation_fraction: 0.01,
            precipitation_per_k: 0.001,
            melt_fraction: 0.01,
            freeze_fraction: 0.01,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HabitabilityConfig {
    pub temperature_weight: f64,
    pub pressure_weight: f64,
    pub oxygen_weight: f64,
    /// Biome count at which biodiversity saturates.
    pub max_biomes: usize,
}

impl Default for HabitabilityConfig {
    fn default() -> Self {
        Self {
            temperature_weight: 0.4,
            pressure_weight: 0.3,
            oxygen_weight: 0.3,
            max_biomes: 10,
        }
    }
}

/// Geological activity and regolith weathering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeologyConfig {
    /// Temperature at which the heat term saturates.
    pub heat_reference_k: f64,
    pub heat_weight: f64,
    pub mass_weight: f64,
    pub core_iron_weight: f64,
    /// Used for the mass ratio when the body records no mass.
    pub fallback_body_mass_kg: f64,
    pub weathering_base_rate: f64,
    /// Weathering gain per bar of surface pressure.
    pub weathering_pressure_coefficient: f64,
    pub weathering_reference_k: f64,
    pub weathering_temperature_coefficient: f64,
    /// Weathering gain per percent of the body's water that is liquid.
    pub weathering_water_coefficient: f64,
    /// Activity points per unit of the activity multiplier.
    pub activity_divisor: f64,
    pub regolith_m_per_rate: f64,
}

impl Default for GeologyConfig {
    fn default() -> Self {
        Self {
            heat_reference_k: 6000.0,
            heat_weight: 50.0,
            mass_weight: 30.0,
            core_iron_weight: 20.0,
            fallback_body_mass_kg: 1.0e24,
            weathering_base_rate: 0.1,
            weathering_pressure_coefficient: 0.5,
            weathering_reference_k: 273.0,
            weathering_temperature_coefficient: 0.01,
            weathering_water_coefficient: 0.01,
            activity_divisor: 10.0,
            regolith_m_per_rate: 0.01,
        }
    }
}

/// Gas exchange between living biomes and the atmosphere. Rates are
/// percentage points of the atmosphere's mass per tick.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GasExchangeConfig {
    pub o2_release_pct: f64,
    pub co2_uptake_pct: f64,
    pub ch4_release_pct: f64,
    /// Biome count at which the vegetation factor is one.
    pub reference_biomes: f64,
    pub min_vegetation_factor: f64,
    pub max_vegetation_factor: f64,
}

impl Default for GasExchangeConfig {
    fn default() -> Self {
        Self {
            o2_release_pct: 1.0e-5,
            co2_uptake_pct: 1.0e-5,
            ch4_release_pct: 1.0e-6,
            reference_biomes: 5.0,
            min_vegetation_factor: 0.1,
            max_vegetation_factor: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Relative tolerance of the before/after mass check.
    pub relative_epsilon: f64,
    /// Transfers kept in the journal; older entries are dropped first.
    pub journal_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            relative_epsilon: 1.0e-9,
            journal_capacity: 1024,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub climate: ClimateConfig,
    pub volatiles: VolatileConfig,
    pub water_cycle: WaterCycleConfig,
    pub geology: GeologyConfig,
    pub gas_exchange: GasExchangeConfig,
    pub habitability: HabitabilityConfig,
    pub ledger: LedgerConfig,
}

impl SimConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
