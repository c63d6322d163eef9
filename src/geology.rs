//! Slow geosphere processes driven by the rest of the body: how active the
//! interior is, and how fast the surface breaks down into regolith.

use crate::config::GeologyConfig;
use once_cell::sync::Lazy;

static DEFAULT_GEOLOGY: Lazy<GeologyConfig> = Lazy::new(GeologyConfig::default);

#[derive(Debug, Clone, Copy)]
pub struct GeologyModel<'a> {
    config: &'a GeologyConfig,
}

impl GeologyModel<'static> {
    pub fn standard() -> Self {
        GeologyModel {
            config: &DEFAULT_GEOLOGY,
        }
    }
}

impl<'a> GeologyModel<'a> {
    pub fn new(config: &'a GeologyConfig) -> Self {
        GeologyModel { config }
    }

    /// Activity on 0..=100 from heat, the share of the body's mass held in
    /// the geosphere and the core's iron content.
    pub fn geological_activity(
        &self,
        temperature_k: f64,
        geosphere_mass_kg: f64,
        body_mass_kg: f64,
        core_iron_pct: f64,
    ) -> f64 {
        let heat = if self.config.heat_reference_k > 0.0 {
            (temperature_k / self.config.heat_reference_k).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let body_mass_kg = if body_mass_kg > 0.0 {
            body_mass_kg
        } else {
            self.config.fallback_body_mass_kg
        };
        let mass = (geosphere_mass_kg / body_mass_kg).clamp(0.0, 1.0);
        let iron = (core_iron_pct / 100.0).clamp(0.0, 1.0);

        let activity = heat * self.config.heat_weight
            + mass * self.config.mass_weight
            + iron * self.config.core_iron_weight;
        activity.clamp(0.0, 100.0)
    }

    /// Weathering rate per tick. Never negative; cold enough surfaces stop
    /// weathering altogether.
    pub fn weathering_rate(
        &self,
        pressure_bar: f64,
        temperature_k: f64,
        liquid_water_pct: f64,
        geological_activity: f64,
    ) -> f64 {
        let c = self.config;
        let pressure = 1.0 + pressure_bar.max(0.0) * c.weathering_pressure_coefficient;
        let temperature = 1.0 + (temperature_k - c.weathering_reference_k) * c.weathering_temperature_coefficient;
        let water = 1.0 + liquid_water_pct.max(0.0) * c.weathering_water_coefficient;
        let activity = if c.activity_divisor > 0.0 {
            1.0 + geological_activity.max(0.0) / c.activity_divisor
        } else {
            1.0
        };
        (c.weathering_base_rate * pressure * temperature * water * activity).max(0.0)
    }

    /// Regolith gained in one tick at `rate`.
    pub fn regolith_growth_m(&self, rate: f64) -> f64 {
        rate.max(0.0) * self.config.regolith_m_per_rate
    }
}

pub fn calculate_geological_activity(
    temperature_k: f64,
    geosphere_mass_kg: f64,
    body_mass_kg: f64,
    core_iron_pct: f64,
) -> f64 {
    GeologyModel::standard().geological_activity(temperature_k, geosphere_mass_kg, body_mass_kg, core_iron_pct)
}

pub fn calculate_weathering_rate(
    pressure_bar: f64,
    temperature_k: f64,
    liquid_water_pct: f64,
    geological_activity: f64,
) -> f64 {
    GeologyModel::standard().weathering_rate(pressure_bar, temperature_k, liquid_water_pct, geological_activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_activity_terms() {
        // each term saturates at its weight
        assert_abs_diff_eq!(calculate_geological_activity(6000.0, 0.0, 1.0e24, 0.0), 50.0);
        assert_abs_diff_eq!(calculate_geological_activity(0.0, 2.0e24, 1.0e24, 0.0), 30.0);
        assert_abs_diff_eq!(calculate_geological_activity(0.0, 0.0, 1.0e24, 100.0), 20.0);
        assert_abs_diff_eq!(calculate_geological_activity(9000.0, 5.0e24, 1.0e24, 100.0), 100.0);
    }

    #[test]
    fn test_activity_partial_inputs() {
        // 3000 K, a tenth of the mass, 80 % iron core: 25 + 3 + 16
        let activity = calculate_geological_activity(3000.0, 1.0e23, 1.0e24, 80.0);
        assert_abs_diff_eq!(activity, 44.0, epsilon = 1e-9);
    }

    #[test]
    fn test_activity_massless_body_uses_fallback() {
        let activity = calculate_geological_activity(0.0, 5.0e23, 0.0, 0.0);
        assert_abs_diff_eq!(activity, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weathering_rate() {
        // 1 bar at the reference temperature, dry, inert
        assert_abs_diff_eq!(calculate_weathering_rate(1.0, 273.0, 0.0, 0.0), 0.15, epsilon = 1e-12);
        // 2 bar, 293 K, all water liquid, activity 10
        let rate = calculate_weathering_rate(2.0, 293.0, 100.0, 10.0);
        assert_abs_diff_eq!(rate, 0.1 * 2.0 * 1.2 * 2.0 * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cold_surface_does_not_weather() {
        assert_abs_diff_eq!(calculate_weathering_rate(0.006, 150.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_regolith_growth() {
        let model = GeologyModel::standard();
        assert_abs_diff_eq!(model.regolith_growth_m(0.15), 0.0015, epsilon = 1e-15);
        assert_abs_diff_eq!(model.regolith_growth_m(-1.0), 0.0);
    }
}
