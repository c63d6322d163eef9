use super::{MaterialSphere, NameIndex, PhaseDeterminer, SphereKind, Withdrawal, percentages, prune_empty};
use crate::error::{Result, TerraSimError, check_amount};
use crate::material::{Location, MaterialPhase, SubstanceQuantity};
use crate::material_catalog::MaterialCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WATER: &str = "H2O";
const TECTONIC_ACTIVITY_THRESHOLD: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Crust,
    Mantle,
    Core,
}

impl Layer {
    pub fn location(&self) -> Location {
        match self {
            Layer::Crust => Location::Crust,
            Layer::Mantle => Location::Mantle,
            Layer::Core => Location::Core,
        }
    }
}

/// Where frozen or trapped volatiles are held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatileReservoir {
    SurfaceIce,
    PolarCaps,
    Regolith,
    Clathrates,
    Subsurface,
}

impl VolatileReservoir {
    pub const ALL: [VolatileReservoir; 5] = [
        VolatileReservoir::SurfaceIce,
        VolatileReservoir::PolarCaps,
        VolatileReservoir::Regolith,
        VolatileReservoir::Clathrates,
        VolatileReservoir::Subsurface,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatileReservoir::SurfaceIce => "surface_ice",
            VolatileReservoir::PolarCaps => "polar_caps",
            VolatileReservoir::Regolith => "regolith",
            VolatileReservoir::Clathrates => "clathrates",
            VolatileReservoir::Subsurface => "subsurface",
        }
    }

    pub fn location(&self) -> Location {
        match self {
            VolatileReservoir::SurfaceIce | VolatileReservoir::PolarCaps => Location::Surface,
            _ => Location::Crust,
        }
    }

    /// Reservoir for a volatile condensing out of the atmosphere.
    pub fn for_condensate(compound: &str) -> Self {
        if compound == WATER {
            VolatileReservoir::PolarCaps
        } else {
            VolatileReservoir::SurfaceIce
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Geosphere {
    pub surface_temperature_k: f64,
    layers: BTreeMap<Layer, BTreeMap<String, f64>>,
    crust_composition: BTreeMap<String, f64>,
    geological_activity: f64,
    tectonic_activity: bool,
    stored_volatiles: BTreeMap<String, BTreeMap<VolatileReservoir, f64>>,
    /// `None` when the regolith has not been surveyed.
    regolith_depth_m: Option<f64>,
    /// Liquids standing on or soaked into the surface, keyed by formula.
    #[serde(default)]
    surface_liquids: BTreeMap<String, f64>,
    #[serde(default)]
    names: NameIndex,
    #[serde(default)]
    dirty: bool,
}

impl Geosphere {
    pub fn new(surface_temperature_k: f64) -> Self {
        Geosphere {
            surface_temperature_k,
            layers: BTreeMap::new(),
            crust_composition: BTreeMap::new(),
            geological_activity: 0.0,
            tectonic_activity: false,
            stored_volatiles: BTreeMap::new(),
            regolith_depth_m: None,
            surface_liquids: BTreeMap::new(),
            names: NameIndex::default(),
            dirty: false,
        }
    }

    pub fn layer_mass(&self, layer: Layer) -> f64 {
        self.layers.get(&layer).map_or(0.0, |materials| materials.values().sum())
    }

    pub fn layer_materials(&self, layer: Layer) -> Option<&BTreeMap<String, f64>> {
        self.layers.get(&layer)
    }

    pub fn total_crust_mass_kg(&self) -> f64 {
        self.layer_mass(Layer::Crust)
    }

    pub fn total_mantle_mass_kg(&self) -> f64 {
        self.layer_mass(Layer::Mantle)
    }

    pub fn total_core_mass_kg(&self) -> f64 {
        self.layer_mass(Layer::Core)
    }

    pub fn total_geosphere_mass(&self) -> f64 {
        self.total_crust_mass_kg() + self.total_mantle_mass_kg() + self.total_core_mass_kg()
    }

    /// Percent share of each crust material.
    pub fn crust_composition(&self) -> &BTreeMap<String, f64> {
        &self.crust_composition
    }

    pub fn geological_activity(&self) -> f64 {
        self.geological_activity
    }

    pub fn tectonic_activity(&self) -> bool {
        self.tectonic_activity
    }

    /// Clamped to 0..=100. NaN and infinities are rejected.
    pub fn set_geological_activity(&mut self, activity: f64) -> Result<()> {
        if !activity.is_finite() {
            return Err(TerraSimError::invalid_amount("geological_activity", activity));
        }
        let activity = activity.clamp(0.0, 100.0);
        if self.geological_activity != activity {
            self.geological_activity = activity;
            self.tectonic_activity = activity > TECTONIC_ACTIVITY_THRESHOLD;
            self.dirty = true;
        }
        Ok(())
    }

    /// Percent of the core's mass that is `name`.
    pub fn core_share(&self, name: &str) -> f64 {
        self.layers
            .get(&Layer::Core)
            .map(percentages)
            .and_then(|shares| shares.get(self.names.resolve(name)).copied())
            .unwrap_or(0.0)
    }

    pub fn regolith_depth_m(&self) -> Option<f64> {
        self.regolith_depth_m
    }

    pub fn set_regolith_depth(&mut self, depth_m: Option<f64>) -> Result<()> {
        if let Some(depth) = depth_m {
            check_amount("regolith_depth", depth)?;
        }
        self.regolith_depth_m = depth_m;
        self.dirty = true;
        Ok(())
    }

    pub fn set_surface_temperature(&mut self, temperature_k: f64) {
        if self.surface_temperature_k != temperature_k {
            self.surface_temperature_k = temperature_k;
            self.dirty = true;
        }
    }

    pub fn add_material(
        &mut self,
        catalog: &MaterialCatalog,
        layer: Layer,
        name: &str,
        mass_kg: f64,
    ) -> Result<()> {
        let record = catalog.require(name)?;
        check_amount(name, mass_kg)?;
        if mass_kg == 0.0 {
            return Ok(());
        }
        self.names.learn(record);
        *self
            .layers
            .entry(layer)
            .or_default()
            .entry(record.formula.clone())
            .or_insert(0.0) += mass_kg;
        self.touch();
        Ok(())
    }

    /// Removes up to `mass_kg` from a layer and returns what was removed.
    pub fn remove_material(&mut self, layer: Layer, name: &str, mass_kg: f64) -> Result<f64> {
        check_amount(name, mass_kg)?;
        let formula = self.names.resolve(name).to_string();
        let Some(materials) = self.layers.get_mut(&layer) else {
            return Ok(0.0);
        };
        let Some(held) = materials.get_mut(&formula) else {
            return Ok(0.0);
        };
        let removed = mass_kg.min(*held);
        *held -= removed;
        prune_empty(materials, &formula);
        if materials.is_empty() {
            self.layers.remove(&layer);
        }
        if removed > 0.0 {
            self.touch();
        }
        Ok(removed)
    }

    /// Mines material out of the crust.
    pub fn extract_material(&mut self, name: &str, mass_kg: f64) -> Result<f64> {
        self.remove_material(Layer::Crust, name, mass_kg)
    }

    pub fn stored_volatiles(&self) -> &BTreeMap<String, BTreeMap<VolatileReservoir, f64>> {
        &self.stored_volatiles
    }

    pub fn stored_volatile(&self, compound: &str, reservoir: VolatileReservoir) -> f64 {
        self.stored_volatiles
            .get(self.names.resolve(compound))
            .and_then(|by_reservoir| by_reservoir.get(&reservoir))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_stored_volatile(&self, compound: &str) -> f64 {
        self.stored_volatiles
            .get(self.names.resolve(compound))
            .map_or(0.0, |by_reservoir| by_reservoir.values().sum())
    }

    /// Snapshot of every (compound, reservoir, mass) entry, in stable order.
    pub fn volatile_entries(&self) -> Vec<(String, VolatileReservoir, f64)> {
        self.stored_volatiles
            .iter()
            .flat_map(|(compound, by_reservoir)| {
                by_reservoir
                    .iter()
                    .map(move |(reservoir, mass)| (compound.clone(), *reservoir, *mass))
            })
            .collect()
    }

    pub fn add_volatile(
        &mut self,
        catalog: &MaterialCatalog,
        compound: &str,
        reservoir: VolatileReservoir,
        mass_kg: f64,
    ) -> Result<()> {
        let record = catalog.require(compound)?;
        check_amount(compound, mass_kg)?;
        self.names.learn(record);
        let formula = record.formula.clone();
        self.put_volatile(&formula, reservoir, mass_kg);
        Ok(())
    }

    pub fn surface_liquids(&self) -> &BTreeMap<String, f64> {
        &self.surface_liquids
    }

    pub fn surface_liquid(&self, name: &str) -> f64 {
        self.surface_liquids
            .get(self.names.resolve(name))
            .copied()
            .unwrap_or(0.0)
    }

    fn put_surface_liquid(&mut self, formula: &str, mass_kg: f64) {
        if mass_kg <= 0.0 {
            return;
        }
        *self.surface_liquids.entry(formula.to_string()).or_insert(0.0) += mass_kg;
        self.dirty = true;
    }

    fn take_surface_liquid(&mut self, formula: &str, mass_kg: f64) -> f64 {
        let Some(held) = self.surface_liquids.get_mut(formula) else {
            return 0.0;
        };
        let taken = mass_kg.max(0.0).min(*held);
        *held -= taken;
        prune_empty(&mut self.surface_liquids, &formula.to_string());
        if taken > 0.0 {
            self.dirty = true;
        }
        taken
    }

    fn put_volatile(&mut self, compound: &str, reservoir: VolatileReservoir, mass_kg: f64) {
        if mass_kg <= 0.0 {
            return;
        }
        *self
            .stored_volatiles
            .entry(compound.to_string())
            .or_default()
            .entry(reservoir)
            .or_insert(0.0) += mass_kg;
        self.dirty = true;
    }

    /// Takes up to `mass_kg` from one reservoir. Emptied reservoirs and
    /// compounds are dropped.
    pub fn take_volatile(&mut self, compound: &str, reservoir: VolatileReservoir, mass_kg: f64) -> f64 {
        let compound = self.names.resolve(compound).to_string();
        let Some(by_reservoir) = self.stored_volatiles.get_mut(&compound) else {
            return 0.0;
        };
        let Some(held) = by_reservoir.get_mut(&reservoir) else {
            return 0.0;
        };
        let taken = mass_kg.max(0.0).min(*held);
        *held -= taken;
        prune_empty(by_reservoir, &reservoir);
        if by_reservoir.is_empty() {
            self.stored_volatiles.remove(&compound);
        }
        if taken > 0.0 {
            self.dirty = true;
        }
        taken
    }

    pub fn recompute(&mut self) {
        self.crust_composition = self
            .layers
            .get(&Layer::Crust)
            .map(percentages)
            .unwrap_or_default();
        self.tectonic_activity = self.geological_activity > TECTONIC_ACTIVITY_THRESHOLD;
    }

    fn touch(&mut self) {
        self.recompute();
        self.dirty = true;
    }
}

impl PhaseDeterminer for Geosphere {
    fn determine_phase(&self, catalog: &MaterialCatalog, substance: &str) -> MaterialPhase {
        match catalog.phase_at(substance, self.surface_temperature_k) {
            Some(MaterialPhase::Liquid) => MaterialPhase::Liquid,
            // gases reaching the ground are frozen or adsorbed
            _ => MaterialPhase::Solid,
        }
    }
}

impl MaterialSphere for Geosphere {
    fn kind(&self) -> SphereKind {
        SphereKind::Geosphere
    }

    /// Crust holdings, every volatile reservoir and surface liquids.
    fn available(&self, substance: &str) -> f64 {
        let crust = self
            .layers
            .get(&Layer::Crust)
            .and_then(|materials| materials.get(self.names.resolve(substance)))
            .copied()
            .unwrap_or(0.0);
        crust + self.total_stored_volatile(substance) + self.surface_liquid(substance)
    }

    /// Takes solids first, then surface liquids. The withdrawal carries the
    /// phase of the larger share.
    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
        let formula = self.names.resolve(substance).to_string();
        let mut remaining = mass_kg.max(0.0);
        let mut solid = self
            .remove_material(Layer::Crust, &formula, remaining)
            .unwrap_or(0.0);
        remaining -= solid;
        for reservoir in VolatileReservoir::ALL {
            if remaining <= 0.0 {
                break;
            }
            let from_reservoir = self.take_volatile(&formula, reservoir, remaining);
            solid += from_reservoir;
            remaining -= from_reservoir;
        }
        let liquid = self.take_surface_liquid(&formula, remaining);
        Withdrawal {
            mass_kg: solid + liquid,
            phase: if liquid > solid {
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
        let record = catalog.require(substance)?;
        check_amount(substance, mass_kg)?;
        self.names.learn(record);
        let formula = record.formula.clone();
        if phase == MaterialPhase::Liquid {
            self.put_surface_liquid(&formula, mass_kg);
            Ok(())
        } else if record.is_volatile() {
            self.put_volatile(&formula, VolatileReservoir::for_condensate(&formula), mass_kg);
            Ok(())
        } else {
            self.add_material(catalog, Layer::Crust, &formula, mass_kg)
        }
    }

    fn phase_determiner(&self) -> Option<&dyn PhaseDeterminer> {
        Some(self)
    }

    fn quantities(&self) -> Vec<SubstanceQuantity> {
        let mut quantities = Vec::new();
        for (layer, materials) in &self.layers {
            for (name, mass) in materials {
                quantities.push(SubstanceQuantity::new(name, *mass, MaterialPhase::Solid, layer.location()));
            }
        }
        for (compound, reservoir, mass) in self.volatile_entries() {
            quantities.push(SubstanceQuantity::new(
                compound,
                mass,
                MaterialPhase::Solid,
                reservoir.location(),
            ));
        }
        for (name, mass) in &self.surface_liquids {
            quantities.push(SubstanceQuantity::new(name, *mass, MaterialPhase::Liquid, Location::Surface));
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

/// One volatile reservoir of a geosphere, seen as a sphere of its own so the
/// ledger can move mass in and out of that reservoir only. Everything a
/// reservoir holds is frozen or trapped, so arrivals are always solid.
pub struct ReservoirView<'a> {
    geosphere: &'a mut Geosphere,
    reservoir: VolatileReservoir,
}

impl<'a> ReservoirView<'a> {
    pub fn new(geosphere: &'a mut Geosphere, reservoir: VolatileReservoir) -> Self {
        ReservoirView { geosphere, reservoir }
    }
}

impl PhaseDeterminer for ReservoirView<'_> {
    fn determine_phase(&self, _catalog: &MaterialCatalog, _substance: &str) -> MaterialPhase {
        MaterialPhase::Solid
    }
}

impl MaterialSphere for ReservoirView<'_> {
    fn kind(&self) -> SphereKind {
        SphereKind::Geosphere
    }

    fn available(&self, substance: &str) -> f64 {
        self.geosphere.stored_volatile(substance, self.reservoir)
    }

    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
        Withdrawal {
            mass_kg: self.geosphere.take_volatile(substance, self.reservoir, mass_kg),
            phase: MaterialPhase::Solid,
        }
    }

    fn validate_deposit(&self, catalog: &MaterialCatalog, substance: &str) -> Result<()> {
        let record = catalog.require(substance)?;
        if record.is_volatile() {
            Ok(())
        } else {
            Err(TerraSimError::unknown_material(format!(
                "{substance} is not a volatile"
            )))
        }
    }

    fn deposit(
        &mut self,
        catalog: &MaterialCatalog,
        substance: &str,
        mass_kg: f64,
        _phase: MaterialPhase,
    ) -> Result<()> {
        self.validate_deposit(catalog, substance)?;
        check_amount(substance, mass_kg)?;
        let record = catalog.require(substance)?;
        self.geosphere.names.learn(record);
        self.geosphere.put_volatile(&record.formula, self.reservoir, mass_kg);
        Ok(())
    }

    fn phase_determiner(&self) -> Option<&dyn PhaseDeterminer> {
        Some(self)
    }

    fn quantities(&self) -> Vec<SubstanceQuantity> {
        self.geosphere
            .volatile_entries()
            .into_iter()
            .filter(|(_, reservoir, _)| *reservoir == self.reservoir)
            .map(|(compound, reservoir, mass)| {
                SubstanceQuantity::new(compound, mass, MaterialPhase::Solid, reservoir.location())
            })
            .collect()
    }

    fn is_dirty(&self) -> bool {
        self.geosphere.is_dirty()
    }

    fn clear_dirty(&mut self) {
        self.geosphere.clear_dirty();
    }
}
