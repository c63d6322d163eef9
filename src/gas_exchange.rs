//! Gas exchange between living biomes and the atmosphere.
//!
//! Biomes draw CO2 down into biomass and breathe out O2 and CH4. Flows are
//! a fixed share of the atmosphere's mass per tick, scaled for O2 and CO2 by
//! how many biomes there are.

use crate::config::GasExchangeConfig;
use once_cell::sync::Lazy;

static DEFAULT_GAS_EXCHANGE: Lazy<GasExchangeConfig> = Lazy::new(GasExchangeConfig::default);

/// Requested flows for one tick, in kg. The ledger may move less.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GasExchange {
    pub co2_uptake_kg: f64,
    pub o2_release_kg: f64,
    pub ch4_release_kg: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GasExchangeModel<'a> {
    config: &'a GasExchangeConfig,
}

impl GasExchangeModel<'static> {
    pub fn standard() -> Self {
        GasExchangeModel {
            config: &DEFAULT_GAS_EXCHANGE,
        }
    }
}

impl<'a> GasExchangeModel<'a> {
    pub fn new(config: &'a GasExchangeConfig) -> Self {
        GasExchangeModel { config }
    }

    /// `None` for a lifeless biosphere.
    pub fn vegetation_factor(&self, biome_count: usize) -> Option<f64> {
        if biome_count == 0 {
            return None;
        }
        let factor = if self.config.reference_biomes > 0.0 {
            biome_count as f64 / self.config.reference_biomes
        } else {
            self.config.max_vegetation_factor
        };
        Some(factor.clamp(self.config.min_vegetation_factor, self.config.max_vegetation_factor))
    }

    pub fn exchange(&self, atmosphere_mass_kg: f64, biome_count: usize) -> GasExchange {
        let Some(vegetation) = self.vegetation_factor(biome_count) else {
            return GasExchange::default();
        };
        let per_pct = atmosphere_mass_kg.max(0.0) / 100.0;
        GasExchange {
            co2_uptake_kg: self.config.co2_uptake_pct * vegetation * per_pct,
            o2_release_kg: self.config.o2_release_pct * vegetation * per_pct,
            ch4_release_kg: self.config.ch4_release_pct * per_pct,
        }
    }
}

pub fn calculate_gas_exchange(atmosphere_mass_kg: f64, biome_count: usize) -> GasExchange {
    GasExchangeModel::standard().exchange(atmosphere_mass_kg, biome_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_vegetation_factor_bounds() {
        let model = GasExchangeModel::standard();
        assert_eq!(model.vegetation_factor(0), None);
        assert_abs_diff_eq!(model.vegetation_factor(5).unwrap(), 1.0);
        assert_abs_diff_eq!(model.vegetation_factor(30).unwrap(), 2.0);

        let sparse = GasExchangeConfig {
            reference_biomes: 50.0,
            ..GasExchangeConfig::default()
        };
        assert_abs_diff_eq!(GasExchangeModel::new(&sparse).vegetation_factor(1).unwrap(), 0.1);
    }

    #[test]
    fn test_exchange_scales_with_biomes() {
        // 1e7 kg of atmosphere, 10 biomes: vegetation factor 2
        let flows = calculate_gas_exchange(1.0e7, 10);
        assert_abs_diff_eq!(flows.co2_uptake_kg, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(flows.o2_release_kg, 2.0, epsilon = 1e-12);
        // methane ignores vegetation
        assert_abs_diff_eq!(flows.ch4_release_kg, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_lifeless_biosphere_exchanges_nothing() {
        assert_eq!(calculate_gas_exchange(1.0e7, 0), GasExchange::default());
    }
}
