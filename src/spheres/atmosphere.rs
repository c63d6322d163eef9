use super::{MaterialSphere, NameIndex, SphereKind, Withdrawal};
use crate::error::{Result, check_amount};
use crate::material::{Location, MaterialPhase, SubstanceQuantity};
use crate::material_catalog::MaterialCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One gas in the atmosphere. `percentage` is derived from the masses and
/// only changes when the atmosphere recomputes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GasRecord {
    pub mass_kg: f64,
    pub molar_mass_g_mol: f64,
    percentage: f64,
}

impl GasRecord {
    pub fn percentage(&self) -> f64 {
        self.percentage
    }
}

/// Gas envelope of a body.
///
/// Pressure is `total_mass / (radius² * gravity)` and is recomputed together
/// with `total_mass_kg` and every gas percentage after each mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Atmosphere {
    radius_m: f64,
    surface_gravity_m_s2: f64,
    pub temperature_k: f64,
    pressure_bar: f64,
    total_mass_kg: f64,
    gases: BTreeMap<String, GasRecord>,
    /// Percent-only composition from older records, read when no live gas matches.
    #[serde(default)]
    legacy_composition: BTreeMap<String, f64>,
    #[serde(default)]
    dust_concentration: f64,
    #[serde(default)]
    names: NameIndex,
    #[serde(default)]
    dirty: bool,
}

impl Atmosphere {
    pub fn new(radius_m: f64, surface_gravity_m_s2: f64, temperature_k: f64) -> Self {
        Atmosphere {
            radius_m,
            surface_gravity_m_s2,
            temperature_k,
            pressure_bar: 0.0,
            total_mass_kg: 0.0,
            gases: BTreeMap::new(),
            legacy_composition: BTreeMap::new(),
            dust_concentration: 0.0,
            names: NameIndex::default(),
            dirty: false,
        }
    }

    pub fn pressure_bar(&self) -> f64 {
        self.pressure_bar
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.total_mass_kg
    }

    pub fn gases(&self) -> &BTreeMap<String, GasRecord> {
        &self.gases
    }

    /// Looks a gas up by formula or by any name it was added under.
    pub fn gas(&self, name: &str) -> Option<&GasRecord> {
        self.gases.get(self.names.resolve(name))
    }

    pub fn gas_mass(&self, name: &str) -> f64 {
        self.gas(name).map_or(0.0, |gas| gas.mass_kg)
    }

    /// Live percentage, then the legacy composition, then zero.
    pub fn gas_percentage(&self, name: &str) -> f64 {
        if let Some(gas) = self.gas(name) {
            return gas.percentage;
        }
        self.legacy_composition
            .get(self.names.resolve(name))
            .or_else(|| self.legacy_composition.get(name))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn dust_concentration(&self) -> f64 {
        self.dust_concentration
    }

    pub fn add_gas(&mut self, catalog: &MaterialCatalog, name: &str, mass_kg: f64) -> Result<()> {
        let record = catalog.require(name)?;
        check_amount(name, mass_kg)?;
        if mass_kg == 0.0 {
            return Ok(());
        }

        self.names.learn(record);
        self.gases
            .entry(record.formula.clone())
            .and_modify(|gas| gas.mass_kg += mass_kg)
            .or_insert_with(|| GasRecord {
                mass_kg,
                molar_mass_g_mol: record.molar_mass_g_mol,
                percentage: 0.0,
            });
        self.recompute();
        self.dirty = true;
        Ok(())
    }

    /// Removes up to `mass_kg` of a gas, returning the mass actually removed.
    pub fn remove_gas(&mut self, name: &str, mass_kg: f64) -> Result<f64> {
        check_amount(name, mass_kg)?;
        let formula = self.names.resolve(name).to_string();
        let Some(gas) = self.gases.get_mut(&formula) else {
            return Ok(0.0);
        };
        let removed = mass_kg.min(gas.mass_kg);
        gas.mass_kg -= removed;
        if gas.mass_kg <= 0.0 {
            self.gases.remove(&formula);
        }
        if removed > 0.0 {
            self.recompute();
            self.dirty = true;
        }
        Ok(removed)
    }

    /// Rebuilds total mass, percentages and pressure from the gas masses.
    pub fn recompute(&mut self) {
        self.total_mass_kg = self.gases.values().map(|gas| gas.mass_kg).sum();
        let total = self.total_mass_kg;
        for gas in self.gases.values_mut() {
            gas.percentage = if total > 0.0 {
                gas.mass_kg / total * 100.0
            } else {
                0.0
            };
        }
        let area_gravity = self.radius_m * self.radius_m * self.surface_gravity_m_s2;
        self.pressure_bar = if area_gravity > 0.0 {
            self.total_mass_kg / area_gravity
        } else {
            0.0
        };
    }

    pub fn set_temperature(&mut self, temperature_k: f64) {
        if self.temperature_k != temperature_k {
            self.temperature_k = temperature_k;
            self.dirty = true;
        }
    }

    pub fn set_legacy_composition(&mut self, composition: BTreeMap<String, f64>) {
        self.legacy_composition = composition;
    }

    pub fn add_dust(&mut self, amount: f64) -> Result<()> {
        check_amount("dust", amount)?;
        self.dust_concentration += amount;
        self.dirty = true;
        Ok(())
    }

    pub fn decrease_dust(&mut self, amount: f64) -> Result<()> {
        check_amount("dust", amount)?;
        self.dust_concentration = (self.dust_concentration - amount).max(0.0);
        self.dirty = true;
        Ok(())
    }
}

impl MaterialSphere for Atmosphere {
    fn kind(&self) -> SphereKind {
        SphereKind::Atmosphere
    }

    fn available(&self, substance: &str) -> f64 {
        self.gas_mass(substance)
    }

    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
        let removed = self.remove_gas(substance, mass_kg.max(0.0)).unwrap_or(0.0);
        Withdrawal {
            mass_kg: removed,
            phase: MaterialPhase::Gas,
        }
    }

    fn validate_deposit(&self, catalog: &MaterialCatalog, substance: &str) -> Result<()> {
        catalog.require(substance).map(|_| ())
    }

    fn deposit(
        &mut self,
        catalog: &MaterialCatalog,
        substance: &str,
        mass_kg: f64,
        _phase: MaterialPhase,
    ) -> Result<()> {
        self.add_gas(catalog, substance, mass_kg)
    }

    fn quantities(&self) -> Vec<SubstanceQuantity> {
        self.gases
            .iter()
            .map(|(name, gas)| {
                SubstanceQuantity::new(name, gas.mass_kg, MaterialPhase::Gas, Location::Atmosphere)
            })
            .collect()
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
