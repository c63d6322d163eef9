//! Surface temperature, latitudinal temperature spread and ice line.
//!
//! Everything here is a pure function of its inputs. `ClimateModel` binds the
//! functions to a `ClimateConfig`; the free functions use the default one.

use crate::config::ClimateConfig;
use crate::spheres::Atmosphere;
use crate::temp_utils::{effective_temperature_k, lapse_adjusted_k};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CLIMATE: Lazy<ClimateConfig> = Lazy::new(ClimateConfig::default);

/// Latitude (degrees) where each zone ends, counted from the pole side of
/// the ice line. Values above 90 are kept as computed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateZones {
    pub polar: f64,
    pub temperate: f64,
    pub tropical: f64,
}

impl ClimateZones {
    pub fn from_ice_latitude(ice_latitude_deg: f64) -> Self {
        ClimateZones {
            polar: ice_latitude_deg,
            temperate: (ice_latitude_deg + 30.0).max(45.0),
            tropical: (ice_latitude_deg + 60.0).max(75.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateState {
    pub surface_temp_k: f64,
    pub polar_temp_k: f64,
    pub tropical_temp_k: f64,
    /// Fraction of the surface equatorward of the ice line, 0..1.
    pub habitable_ratio: f64,
    pub ice_latitude_deg: f64,
    pub zones: ClimateZones,
}

#[derive(Debug, Clone, Copy)]
pub struct ClimateModel<'a> {
    config: &'a ClimateConfig,
}

impl ClimateModel<'static> {
    pub fn standard() -> Self {
        ClimateModel {
            config: &DEFAULT_CLIMATE,
        }
    }
}

impl<'a> ClimateModel<'a> {
    pub fn new(config: &'a ClimateConfig) -> Self {
        ClimateModel { config }
    }

    /// Thicker atmospheres carry more heat poleward.
    pub fn polar_temperature(&self, surface_temp_k: f64, pressure_bar: f64) -> f64 {
        surface_temp_k - self.config.polar_offset_k / (1.0 + self.config.pressure_damping * pressure_bar)
    }

    pub fn tropical_temperature(&self, surface_temp_k: f64) -> f64 {
        surface_temp_k * self.config.tropical_factor
    }

    /// Returns `(habitable_ratio, ice_latitude_deg)`.
    pub fn ice_line(&self, tropical_temp_k: f64, polar_temp_k: f64) -> (f64, f64) {
        let freezing = self.config.freezing_point_k;
        if tropical_temp_k > freezing && polar_temp_k < freezing {
            let ratio = ((tropical_temp_k - freezing) / (tropical_temp_k - polar_temp_k)).powf(2.0 / 3.0);
            (ratio, ratio.asin().to_degrees())
        } else if tropical_temp_k <= freezing {
            // frozen everywhere
            (0.0, 90.0)
        } else {
            // no freezing anywhere
            (1.0, 0.0)
        }
    }

    pub fn evaluate(&self, surface_temp_k: f64, pressure_bar: f64) -> ClimateState {
        let polar_temp_k = self.polar_temperature(surface_temp_k, pressure_bar);
        let tropical_temp_k = self.tropical_temperature(surface_temp_k);
        let (habitable_ratio, ice_latitude_deg) = self.ice_line(tropical_temp_k, polar_temp_k);
        ClimateState {
            surface_temp_k,
            polar_temp_k,
            tropical_temp_k,
            habitable_ratio,
            ice_latitude_deg,
            zones: ClimateZones::from_ice_latitude(ice_latitude_deg),
        }
    }

    /// Lapse-rate cooling with elevation, damped on thin atmospheres.
    pub fn local_temperature(&self, temp_k: f64, elevation_m: f64, pressure_bar: f64) -> f64 {
        let lapsed = lapse_adjusted_k(temp_k, elevation_m, self.config.lapse_rate_k_per_km);
        lapsed * (0.5 + 0.5 * pressure_bar.min(1.0))
    }

    /// `1 + Σ coefficient * fraction`, clamped to `[1, max_greenhouse_factor]`.
    pub fn greenhouse_factor(&self, atmosphere: &Atmosphere) -> f64 {
        let warming: f64 = self
            .config
            .greenhouse_coefficients
            .iter()
            .map(|(gas, coefficient)| coefficient * atmosphere.gas_percentage(gas) / 100.0)
            .sum();
        (1.0 + warming).clamp(1.0, self.config.max_greenhouse_factor.max(1.0))
    }

    /// Greenhouse-adjusted radiative temperature. A body without insolation
    /// keeps its current atmosphere temperature.
    pub fn surface_temperature(&self, insolation_w_m2: f64, albedo: f64, atmosphere: &Atmosphere) -> f64 {
        if insolation_w_m2 <= 0.0 {
            return atmosphere.temperature_k;
        }
        let effective = effective_temperature_k(insolation_w_m2, albedo);
        (effective * self.greenhouse_factor(atmosphere))
            .clamp(self.config.min_surface_temp_k, self.config.max_surface_temp_k)
    }
}

pub fn evaluate_climate(surface_temp_k: f64, pressure_bar: f64) -> ClimateState {
    ClimateModel::standard().evaluate(surface_temp_k, pressure_bar)
}

pub fn local_temperature(temp_k: f64, elevation_m: f64, pressure_bar: f64) -> f64 {
    ClimateModel::standard().local_temperature(temp_k, elevation_m, pressure_bar)
}
