//! Release of stored volatiles from the geosphere, and the reverse
//! freeze-out of gases onto the surface.
//!
//! Rates are per-tick fractions of the stored mass. They ramp linearly from
//! zero at the compound's threshold temperature up to a ceiling.

use crate::config::VolatileConfig;
use crate::material_catalog::MaterialCatalog;
use crate::spheres::VolatileReservoir;
use once_cell::sync::Lazy;

static DEFAULT_VOLATILES: Lazy<VolatileConfig> = Lazy::new(VolatileConfig::default);

#[derive(Debug, Clone, Copy)]
pub struct VolatileModel<'a> {
    config: &'a VolatileConfig,
}

impl VolatileModel<'static> {
    pub fn standard() -> Self {
        VolatileModel {
            config: &DEFAULT_VOLATILES,
        }
    }
}

impl<'a> VolatileModel<'a> {
    pub fn new(config: &'a VolatileConfig) -> Self {
        VolatileModel { config }
    }

    pub fn release_threshold_k(&self, compound: &str) -> f64 {
        self.config
            .release_thresholds_k
            .get(compound)
            .copied()
            .unwrap_or(self.config.default_release_threshold_k)
    }

    pub fn clathrate_threshold_k(&self, compound: &str) -> f64 {
        self.config
            .clathrate_thresholds_k
            .get(compound)
            .copied()
            .unwrap_or(self.config.default_clathrate_threshold_k)
    }

    pub fn surface_release_rate(&self, temperature_k: f64, compound: &str) -> f64 {
        let excess = temperature_k - self.release_threshold_k(compound);
        ramp(excess, self.config.surface_ramp_k) * self.config.surface_max_rate
    }

    /// Deeper regolith slows outgassing. Unknown depth gets a flat penalty.
    pub fn subsurface_release_rate(
        &self,
        temperature_k: f64,
        compound: &str,
        regolith_depth_m: Option<f64>,
    ) -> f64 {
        let surface = self.surface_release_rate(temperature_k, compound);
        match regolith_depth_m {
            Some(depth) => surface * (1.0 / depth.max(1.0)) * self.config.subsurface_factor,
            None => surface * self.config.unknown_depth_factor,
        }
    }

    pub fn clathrate_release_rate(&self, temperature_k: f64, compound: &str) -> f64 {
        let excess = temperature_k - self.clathrate_threshold_k(compound);
        ramp(excess, self.config.clathrate_ramp_k) * self.config.clathrate_max_rate
    }

    pub fn release_rate(
        &self,
        temperature_k: f64,
        compound: &str,
        reservoir: VolatileReservoir,
        regolith_depth_m: Option<f64>,
    ) -> f64 {
        match reservoir {
            VolatileReservoir::SurfaceIce | VolatileReservoir::PolarCaps => {
                self.surface_release_rate(temperature_k, compound)
            }
            VolatileReservoir::Regolith | VolatileReservoir::Subsurface => {
                self.subsurface_release_rate(temperature_k, compound, regolith_depth_m)
            }
            VolatileReservoir::Clathrates => self.clathrate_release_rate(temperature_k, compound),
        }
    }

    /// Temperature below which a gas starts condensing onto the surface:
    /// the configured release threshold, else the catalog boiling point.
    pub fn condensation_threshold_k(&self, compound: &str, catalog: &MaterialCatalog) -> f64 {
        self.config
            .release_thresholds_k
            .get(compound)
            .copied()
            .or_else(|| catalog.find_material(compound).map(|record| record.boiling_point_k))
            .unwrap_or(self.config.default_release_threshold_k)
    }

    /// Fraction of an atmospheric gas condensing out per tick.
    pub fn freeze_out_fraction(&self, temperature_k: f64, threshold_k: f64) -> f64 {
        ramp(threshold_k - temperature_k, self.config.freeze_out_ramp_k) * self.config.freeze_out_max_fraction
    }
}

fn ramp(excess_k: f64, span_k: f64) -> f64 {
    if excess_k <= 0.0 {
        return 0.0;
    }
    if span_k <= 0.0 {
        return 1.0;
    }
    (excess_k / span_k).clamp(0.0, 1.0)
}

pub fn calculate_surface_release_rate(temperature_k: f64, compound: &str) -> f64 {
    VolatileModel::standard().surface_release_rate(temperature_k, compound)
}

pub fn calculate_subsurface_release_rate(
    temperature_k: f64,
    compound: &str,
    regolith_depth_m: Option<f64>,
) -> f64 {
    VolatileModel::standard().subsurface_release_rate(temperature_k, compound, regolith_depth_m)
}

pub fn calculate_clathrate_release_rate(temperature_k: f64, compound: &str) -> f64 {
    VolatileModel::standard().clathrate_release_rate(temperature_k, compound)
}
