use super::{MaterialSphere, NameIndex, SphereKind, Withdrawal, prune_empty};
use crate::climate::{ClimateState, ClimateZones};
use crate::error::{Result, check_amount};
use crate::material::{Location, MaterialPhase, SubstanceQuantity};
use crate::material_catalog::MaterialCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_BIOME_AREA_PCT: f64 = 10.0;

/// Living layer of a body. The indices are derived each tick and can only
/// be written by the simulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Biosphere {
    temperature_tropical_k: f64,
    temperature_polar_k: f64,
    ice_latitude_deg: f64,
    zones: ClimateZones,
    biodiversity_index: f64,
    habitable_ratio: f64,
    habitability_index: f64,
    biome_distribution: BTreeMap<String, f64>,
    /// Mass held per formula, split by the phase it arrived in.
    materials: BTreeMap<String, BTreeMap<MaterialPhase, f64>>,
    #[serde(default)]
    names: NameIndex,
    #[serde(default)]
    dirty: bool,
}

impl Default for Biosphere {
    fn default() -> Self {
        Self::new()
    }
}

impl Biosphere {
    pub fn new() -> Self {
        Biosphere {
            temperature_tropical_k: 0.0,
            temperature_polar_k: 0.0,
            ice_latitude_deg: 90.0,
            zones: ClimateZones::from_ice_latitude(90.0),
            biodiversity_index: 0.0,
            habitable_ratio: 0.0,
            habitability_index: 0.0,
            biome_distribution: BTreeMap::new(),
            materials: BTreeMap::new(),
            names: NameIndex::default(),
            dirty: false,
        }
    }

    pub fn temperature_tropical_k(&self) -> f64 {
        self.temperature_tropical_k
    }

    pub fn temperature_polar_k(&self) -> f64 {
        self.temperature_polar_k
    }

    pub fn ice_latitude_deg(&self) -> f64 {
        self.ice_latitude_deg
    }

    pub fn zones(&self) -> &ClimateZones {
        &self.zones
    }

    pub fn biodiversity_index(&self) -> f64 {
        self.biodiversity_index
    }

    pub fn habitable_ratio(&self) -> f64 {
        self.habitable_ratio
    }

    /// Weighted temperature/pressure/oxygen score, 0..1.
    pub fn habitability_index(&self) -> f64 {
        self.habitability_index
    }

    pub fn biome_distribution(&self) -> &BTreeMap<String, f64> {
        &self.biome_distribution
    }

    pub fn biome_count(&self) -> usize {
        self.biome_distribution.len()
    }

    /// Adds a biome covering `area_pct` of the surface (default 10 %).
    /// Re-introducing a biome replaces its area.
    pub fn introduce_biome(&mut self, name: &str, area_pct: Option<f64>) -> Result<()> {
        let area = area_pct.unwrap_or(DEFAULT_BIOME_AREA_PCT);
        check_amount(name, area)?;
        self.biome_distribution.insert(name.to_string(), area.min(100.0));
        self.dirty = true;
        Ok(())
    }

    pub fn remove_biome(&mut self, name: &str) -> bool {
        let removed = self.biome_distribution.remove(name).is_some();
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Mass of `name` over every phase.
    pub fn material_mass(&self, name: &str) -> f64 {
        self.materials
            .get(self.names.resolve(name))
            .map_or(0.0, |by_phase| by_phase.values().sum())
    }

    pub fn material_mass_in(&self, name: &str, phase: MaterialPhase) -> f64 {
        self.materials
            .get(self.names.resolve(name))
            .and_then(|by_phase| by_phase.get(&phase))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn add_material(
        &mut self,
        catalog: &MaterialCatalog,
        name: &str,
        mass_kg: f64,
        phase: MaterialPhase,
    ) -> Result<()> {
        let record = catalog.require(name)?;
        check_amount(name, mass_kg)?;
        if mass_kg == 0.0 {
            return Ok(());
        }
        self.names.learn(record);
        *self
            .materials
            .entry(record.formula.clone())
            .or_default()
            .entry(phase)
            .or_insert(0.0) += mass_kg;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_material(&mut self, name: &str, mass_kg: f64) -> Result<f64> {
        check_amount(name, mass_kg)?;
        Ok(self.withdraw(name, mass_kg).mass_kg)
    }

    pub(crate) fn apply_climate(&mut self, climate: &ClimateState) {
        self.temperature_tropical_k = climate.tropical_temp_k;
        self.temperature_polar_k = climate.polar_temp_k;
        self.ice_latitude_deg = climate.ice_latitude_deg;
        self.zones = climate.zones;
        self.habitable_ratio = climate.habitable_ratio.clamp(0.0, 1.0);
    }

    pub(crate) fn apply_habitability(&mut self, habitability_index: f64, biodiversity_index: f64) {
        self.habitability_index = habitability_index.clamp(0.0, 1.0);
        self.biodiversity_index = biodiversity_index.clamp(0.0, 1.0);
    }
}

impl MaterialSphere for Biosphere {
    fn kind(&self) -> SphereKind {
        SphereKind::Biosphere
    }

    fn available(&self, substance: &str) -> f64 {
        self.material_mass(substance)
    }

    /// Drains solid, then liquid, then gas. The withdrawal carries the phase
    /// that gave the most mass.
    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
        let formula = self.names.resolve(substance).to_string();
        let Some(by_phase) = self.materials.get_mut(&formula) else {
            return Withdrawal::none(MaterialPhase::Solid);
        };
        let mut remaining = mass_kg.max(0.0);
        let mut taken = 0.0;
        let mut largest = (MaterialPhase::Solid, 0.0);
        for phase in [MaterialPhase::Solid, MaterialPhase::Liquid, MaterialPhase::Gas] {
            let Some(held) = by_phase.get_mut(&phase) else {
                continue;
            };
            let share = remaining.min(*held);
            *held -= share;
            prune_empty(by_phase, &phase);
            remaining -= share;
            taken += share;
            if share > largest.1 {
                largest = (phase, share);
            }
        }
        if by_phase.is_empty() {
            self.materials.remove(&formula);
        }
        if taken > 0.0 {
            self.dirty = true;
        }
        Withdrawal {
            mass_kg: taken,
            phase: largest.0,
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
        self.add_material(catalog, substance, mass_kg, phase)
    }

    fn quantities(&self) -> Vec<SubstanceQuantity> {
        self.materials
            .iter()
            .flat_map(|(name, by_phase)| {
                by_phase
                    .iter()
                    .map(move |(phase, mass)| SubstanceQuantity::new(name, *mass, *phase, Location::Surface))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::evaluate_climate;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_biomes() {
        let mut bio = Biosphere::new();
        bio.introduce_biome("tundra", None).unwrap();
        bio.introduce_biome("boreal_forest", Some(25.0)).unwrap();

        assert_eq!(bio.biome_count(), 2);
        assert_abs_diff_eq!(bio.biome_distribution()["tundra"], DEFAULT_BIOME_AREA_PCT);
        assert!(bio.is_dirty());

        assert!(bio.remove_biome("tundra"));
        assert!(!bio.remove_biome("tundra"));
        assert!(bio.introduce_biome("desert", Some(-5.0)).is_err());
    }

    #[test]
    fn test_apply_climate() {
        let mut bio = Biosphere::new();
        let climate = evaluate_climate(300.0, 1.0);
        bio.apply_climate(&climate);

        assert_abs_diff_eq!(bio.temperature_polar_k(), 287.5, epsilon = 1e-9);
        assert_abs_diff_eq!(bio.temperature_tropical_k(), 330.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bio.habitable_ratio(), 1.0);
        assert_abs_diff_eq!(bio.zones().temperate, 45.0);
    }

    #[test]
    fn test_indices_are_clamped() {
        let mut bio = Biosphere::new();
        bio.apply_habitability(1.7, -0.2);
        assert_abs_diff_eq!(bio.habitability_index(), 1.0);
        assert_abs_diff_eq!(bio.biodiversity_index(), 0.0);
    }

    #[test]
    fn test_materials_keep_their_phase() {
        let catalog = MaterialCatalog::standard();
        let mut bio = Biosphere::new();
        bio.add_material(&catalog, "water", 20.0, MaterialPhase::Liquid).unwrap();

        assert!(bio.phase_determiner().is_none());
        let w = bio.withdraw("H2O", 5.0);
        assert_eq!(w.phase, MaterialPhase::Liquid);
        assert_abs_diff_eq!(bio.material_mass("H2O"), 15.0);

        assert_abs_diff_eq!(bio.remove_material("H2O", 50.0).unwrap(), 15.0);
        assert!(bio.quantities().is_empty());
    }

    #[test]
    fn test_phases_held_apart() {
        let catalog = MaterialCatalog::standard();
        let mut bio = Biosphere::new();
        bio.add_material(&catalog, "H2O", 10.0, MaterialPhase::Solid).unwrap();
        bio.add_material(&catalog, "water", 30.0, MaterialPhase::Liquid).unwrap();

        assert_abs_diff_eq!(bio.material_mass("water"), 40.0);
        assert_abs_diff_eq!(bio.material_mass_in("H2O", MaterialPhase::Solid), 10.0);
        assert_abs_diff_eq!(bio.material_mass_in("H2O", MaterialPhase::Liquid), 30.0);

        let mut phases: Vec<_> = bio.quantities().into_iter().map(|q| (q.phase, q.mass_kg)).collect();
        phases.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(phases, vec![(MaterialPhase::Solid, 10.0), (MaterialPhase::Liquid, 30.0)]);

        // solid drains first; the liquid share is larger
        let w = bio.withdraw("H2O", 25.0);
        assert_abs_diff_eq!(w.mass_kg, 25.0);
        assert_eq!(w.phase, MaterialPhase::Liquid);
        assert_abs_diff_eq!(bio.material_mass_in("H2O", MaterialPhase::Solid), 0.0);
        assert_abs_diff_eq!(bio.material_mass_in("H2O", MaterialPhase::Liquid), 15.0);
    }

    #[test]
    fn test_materials_serialize_by_phase() {
        let catalog = MaterialCatalog::standard();
        let mut bio = Biosphere::new();
        bio.add_material(&catalog, "CO2", 5.0, MaterialPhase::Gas).unwrap();

        let json = serde_json::to_string(&bio).unwrap();
        assert!(json.contains("\"gas\":5.0"));
        let back: Biosphere = serde_json::from_str(&json).unwrap();
        assert_abs_diff_eq!(back.material_mass_in("carbon_dioxide", MaterialPhase::Gas), 5.0);
    }
}
