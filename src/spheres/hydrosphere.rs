use super::{MaterialSphere, NameIndex, PhaseDeterminer, SphereKind, Withdrawal, prune_empty};
use crate::constants::WATER_FREEZING_K;
use crate::error::{Result, check_amount};
use crate::material::{Location, MaterialPhase, SubstanceQuantity};
use crate::material_catalog::MaterialCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WATER: &str = "H2O";
const WATER_NAME: &str = "water";

// Share of new liquid water going to oceans, lakes and rivers
const OCEAN_SHARE: f64 = 0.7;
const LAKE_SHARE: f64 = 0.2;
const RIVER_SHARE: f64 = 0.1;

/// Surface water reservoirs, in kg.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct WaterBodies {
    pub oceans: f64,
    pub lakes: f64,
    pub rivers: f64,
    pub ice_caps: f64,
}

impl WaterBodies {
    pub fn liquid(&self) -> f64 {
        self.oceans + self.lakes + self.rivers
    }

    pub fn total(&self) -> f64 {
        self.liquid() + self.ice_caps
    }

    fn add_liquid(&mut self, mass_kg: f64) {
        self.oceans += mass_kg * OCEAN_SHARE;
        self.lakes += mass_kg * LAKE_SHARE;
        self.rivers += mass_kg * RIVER_SHARE;
    }

    /// Takes up to `mass_kg` from the liquid bodies in proportion to their size.
    fn take_liquid(&mut self, mass_kg: f64) -> f64 {
        let liquid = self.liquid();
        if liquid <= 0.0 || mass_kg <= 0.0 {
            return 0.0;
        }
        let fraction = (mass_kg / liquid).min(1.0);
        let mut taken = 0.0;
        for body in [&mut self.oceans, &mut self.lakes, &mut self.rivers] {
            let share = *body * fraction;
            *body -= share;
            taken += share;
        }
        taken
    }

    fn take_ice(&mut self, mass_kg: f64) -> f64 {
        let taken = mass_kg.max(0.0).min(self.ice_caps);
        self.ice_caps -= taken;
        taken
    }
}

/// Percent of the body's water in each state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct StateDistribution {
    pub solid: f64,
    pub liquid: f64,
    pub vapor: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Hydrosphere {
    pub temperature_k: f64,
    pub pressure_bar: f64,
    total_water_mass_kg: f64,
    water_bodies: WaterBodies,
    /// Non-water liquids (brines, hydrocarbons), keyed by formula.
    liquid_materials: BTreeMap<String, f64>,
    #[serde(default = "water_names")]
    names: NameIndex,
    #[serde(default)]
    dirty: bool,
}

fn water_names() -> NameIndex {
    let mut names = NameIndex::default();
    names.alias(WATER_NAME, WATER);
    names.alias(WATER, WATER);
    names
}

impl Hydrosphere {
    pub fn new(temperature_k: f64) -> Self {
        Hydrosphere {
            temperature_k,
            pressure_bar: 0.0,
            total_water_mass_kg: 0.0,
            water_bodies: WaterBodies::default(),
            liquid_materials: BTreeMap::new(),
            names: water_names(),
            dirty: false,
        }
    }

    pub fn total_water_mass_kg(&self) -> f64 {
        self.total_water_mass_kg
    }

    pub fn water_bodies(&self) -> &WaterBodies {
        &self.water_bodies
    }

    pub fn liquid_materials(&self) -> &BTreeMap<String, f64> {
        &self.liquid_materials
    }

    pub fn liquid_water_kg(&self) -> f64 {
        self.water_bodies.liquid()
    }

    pub fn ice_kg(&self) -> f64 {
        self.water_bodies.ice_caps
    }

    /// Adds a liquid. Water is spread over oceans, lakes and rivers.
    pub fn add_liquid(&mut self, catalog: &MaterialCatalog, name: &str, mass_kg: f64) -> Result<()> {
        let record = catalog.require(name)?;
        check_amount(name, mass_kg)?;
        if mass_kg == 0.0 {
            return Ok(());
        }
        self.names.learn(record);
        if record.formula == WATER {
            self.water_bodies.add_liquid(mass_kg);
        } else {
            *self.liquid_materials.entry(record.formula.clone()).or_insert(0.0) += mass_kg;
        }
        self.touch();
        Ok(())
    }

    pub fn add_ice(&mut self, mass_kg: f64) -> Result<()> {
        check_amount(WATER, mass_kg)?;
        if mass_kg > 0.0 {
            self.water_bodies.ice_caps += mass_kg;
            self.touch();
        }
        Ok(())
    }

    /// Removes up to `mass_kg` of a liquid and returns what was removed.
    /// Water comes out of the liquid bodies only.
    pub fn remove_liquid(&mut self, name: &str, mass_kg: f64) -> Result<f64> {
        check_amount(name, mass_kg)?;
        let formula = self.names.resolve(name).to_string();
        let removed = if formula == WATER {
            self.water_bodies.take_liquid(mass_kg)
        } else {
            match self.liquid_materials.get_mut(&formula) {
                Some(held) => {
                    let taken = mass_kg.min(*held);
                    *held -= taken;
                    prune_empty(&mut self.liquid_materials, &formula);
                    taken
                }
                None => 0.0,
            }
        };
        if removed > 0.0 {
            self.touch();
        }
        Ok(removed)
    }

    /// Melts a fraction of the ice above freezing, freezes a fraction of the
    /// liquid below it. Returns the net mass melted (negative when freezing).
    pub fn exchange_ice(&mut self, freezing_point_k: f64, melt_fraction: f64, freeze_fraction: f64) -> f64 {
        let net = if self.temperature_k > freezing_point_k {
            let melted = self.water_bodies.take_ice(self.water_bodies.ice_caps * melt_fraction);
            self.water_bodies.add_liquid(melted);
            melted
        } else if self.temperature_k < freezing_point_k {
            let frozen = self
                .water_bodies
                .take_liquid(self.water_bodies.liquid() * freeze_fraction);
            self.water_bodies.ice_caps += frozen;
            -frozen
        } else {
            0.0
        };
        if net != 0.0 {
            self.touch();
        }
        net
    }

    /// Share of water by state, counting atmospheric vapor as the third state.
    pub fn state_distribution(&self, vapor_kg: f64) -> StateDistribution {
        let total = self.total_water_mass_kg + vapor_kg.max(0.0);
        if total <= 0.0 {
            return StateDistribution::default();
        }
        StateDistribution {
            solid: self.water_bodies.ice_caps / total * 100.0,
            liquid: self.water_bodies.liquid() / total * 100.0,
            vapor: vapor_kg.max(0.0) / total * 100.0,
        }
    }

    pub fn set_temperature(&mut self, temperature_k: f64) {
        if self.temperature_k != temperature_k {
            self.temperature_k = temperature_k;
            self.dirty = true;
        }
    }

    pub fn recompute(&mut self) {
        self.total_water_mass_kg = self.water_bodies.total();
    }

    fn touch(&mut self) {
        self.recompute();
        self.dirty = true;
    }
}

impl PhaseDeterminer for Hydrosphere {
    fn determine_phase(&self, catalog: &MaterialCatalog, substance: &str) -> MaterialPhase {
        if substance == WATER {
            return if self.temperature_k < WATER_FREEZING_K {
                MaterialPhase::Solid
            } else {
                MaterialPhase::Liquid
            };
        }
        match catalog.phase_at(substance, self.temperature_k) {
            Some(MaterialPhase::Solid) => MaterialPhase::Solid,
            // whatever reaches the oceans is held in solution
            _ => MaterialPhase::Liquid,
        }
    }
}

impl MaterialSphere for Hydrosphere {
    fn kind(&self) -> SphereKind {
        SphereKind::Hydrosphere
    }

    fn available(&self, substance: &str) -> f64 {
        let substance = self.names.resolve(substance);
        if substance == WATER {
            self.total_water_mass_kg
        } else {
            self.liquid_materials.get(substance).copied().unwrap_or(0.0)
        }
    }

    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
        let mass_kg = mass_kg.max(0.0);
        if self.names.resolve(substance) != WATER {
            let removed = self.remove_liquid(substance, mass_kg).unwrap_or(0.0);
            return Withdrawal {
                mass_kg: removed,
                phase: MaterialPhase::Liquid,
            };
        }

        let liquid = self.water_bodies.take_liquid(mass_kg);
        let ice = self.water_bodies.take_ice(mass_kg - liquid);
        if liquid + ice > 0.0 {
            self.touch();
        }
        Withdrawal {
            mass_kg: liquid + ice,
            phase: if liquid > 0.0 {
                MaterialPhase::Liquid
            } else {
                MaterialPhase::Solid
            },
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
        phase: MaterialPhase,
    ) -> Result<()> {
        if substance == WATER && phase == MaterialPhase::Solid {
            catalog.require(substance)?;
            return self.add_ice(mass_kg);
        }
        self.add_liquid(catalog, substance, mass_kg)
    }

    fn phase_determiner(&self) -> Option<&dyn PhaseDeterminer> {
        Some(self)
    }

    fn quantities(&self) -> Vec<SubstanceQuantity> {
        let mut quantities = Vec::new();
        let liquid = self.water_bodies.liquid();
        if liquid > 0.0 {
            quantities.push(SubstanceQuantity::new(WATER, liquid, MaterialPhase::Liquid, Location::Hydrosphere));
        }
        if self.water_bodies.ice_caps > 0.0 {
            quantities.push(SubstanceQuantity::new(
                WATER,
                self.water_bodies.ice_caps,
                MaterialPhase::Solid,
                Location::Hydrosphere,
            ));
        }
        for (name, mass) in &self.liquid_materials {
            quantities.push(SubstanceQuantity::new(name, *mass, MaterialPhase::Liquid, Location::Hydrosphere));
        }
        quantities
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
