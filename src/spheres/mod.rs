//! The four coupled spheres of a celestial body and the capabilities the
//! transfer ledger needs from them.

pub mod atmosphere;
pub mod biosphere;
pub mod geosphere;
pub mod hydrosphere;

pub use atmosphere::{Atmosphere, GasRecord};
pub use biosphere::Biosphere;
pub use geosphere::{Geosphere, Layer, ReservoirView, VolatileReservoir};
pub use hydrosphere::{Hydrosphere, StateDistribution, WaterBodies};

use crate::error::Result;
use crate::material::{MaterialPhase, SubstanceQuantity};
use crate::material_catalog::{MaterialCatalog, MaterialRecord};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SphereKind {
    Atmosphere,
    Hydrosphere,
    Geosphere,
    Biosphere,
}

impl SphereKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SphereKind::Atmosphere => "atmosphere",
            SphereKind::Hydrosphere => "hydrosphere",
            SphereKind::Geosphere => "geosphere",
            SphereKind::Biosphere => "biosphere",
        }
    }
}

/// Mass handed out by a sphere together with the phase it was held in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Withdrawal {
    pub mass_kg: f64,
    pub phase: MaterialPhase,
}

impl Withdrawal {
    pub fn none(phase: MaterialPhase) -> Self {
        Withdrawal { mass_kg: 0.0, phase }
    }
}

/// Spheres that decide the phase of material arriving in them.
pub trait PhaseDeterminer {
    fn determine_phase(&self, catalog: &MaterialCatalog, substance: &str) -> MaterialPhase;
}

/// A store of substances the ledger can move mass in and out of.
///
/// `substance` is always the catalog formula. Every mutating call leaves the
/// sphere's aggregates recomputed and the sphere marked dirty.
pub trait MaterialSphere {
    fn kind(&self) -> SphereKind;

    /// Mass of `substance` this sphere could hand out right now.
    fn available(&self, substance: &str) -> f64;

    /// Removes up to `mass_kg`. Never removes more than is available.
    fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal;

    /// Checks that `deposit` would succeed, without touching state.
    fn validate_deposit(&self, catalog: &MaterialCatalog, substance: &str) -> Result<()>;

    fn deposit(
        &mut self,
        catalog: &MaterialCatalog,
        substance: &str,
        mass_kg: f64,
        phase: MaterialPhase,
    ) -> Result<()>;

    fn phase_determiner(&self) -> Option<&dyn PhaseDeterminer> {
        None
    }

    /// Every non-empty quantity held, for audits.
    fn quantities(&self) -> Vec<SubstanceQuantity>;

    fn is_dirty(&self) -> bool;

    fn clear_dirty(&mut self);
}

/// Maps every name a stored substance was added under, and its catalog
/// aliases, to the formula it is stored under. Lookups are case-insensitive
/// and fall back to the name as given.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct NameIndex(std::collections::BTreeMap<String, String>);

impl NameIndex {
    pub(crate) fn learn(&mut self, record: &MaterialRecord) {
        self.alias(&record.name, &record.formula);
        self.alias(&record.formula, &record.formula);
    }

    pub(crate) fn alias(&mut self, name: &str, formula: &str) {
        self.0.insert(name.to_lowercase(), formula.to_string());
    }

    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0
            .get(&name.to_lowercase())
            .map_or(name, String::as_str)
    }
}

/// Removes `key` from `map` once its value is no longer positive.
pub(crate) fn prune_empty<K: Ord>(map: &mut std::collections::BTreeMap<K, f64>, key: &K) {
    if map.get(key).is_some_and(|mass| *mass <= 0.0) {
        map.remove(key);
    }
}

/// Percent share of each entry, or an empty map when nothing is held.
pub(crate) fn percentages(
    masses: &std::collections::BTreeMap<String, f64>,
) -> std::collections::BTreeMap<String, f64> {
    let total: f64 = masses.values().sum();
    if total <= 0.0 {
        return std::collections::BTreeMap::new();
    }
    masses
        .iter()
        .map(|(name, mass)| (name.clone(), mass / total * 100.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_percentages_sum_to_hundred() {
        let mut masses = BTreeMap::new();
        masses.insert("SiO2".to_string(), 3.0);
        masses.insert("FeO".to_string(), 1.0);
        masses.insert("MgO".to_string(), 2.0);

        let pct = percentages(&masses);
        assert_abs_diff_eq!(pct["SiO2"], 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pct.values().sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_percentages_empty() {
        assert!(percentages(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_name_index_resolves_aliases() {
        let catalog = MaterialCatalog::standard();
        let mut names = NameIndex::default();
        names.learn(catalog.require("oxygen").unwrap());

        assert_eq!(names.resolve("oxygen"), "O2");
        assert_eq!(names.resolve("Oxygen"), "O2");
        assert_eq!(names.resolve("o2"), "O2");
        assert_eq!(names.resolve("Xe"), "Xe");
    }

    #[test]
    fn test_prune_empty() {
        let mut masses = BTreeMap::new();
        masses.insert("CO2".to_string(), 0.0);
        masses.insert("N2".to_string(), 1.0);
        prune_empty(&mut masses, &"CO2".to_string());
        prune_empty(&mut masses, &"N2".to_string());
        assert_eq!(masses.len(), 1);
        assert!(masses.contains_key("N2"));
    }
}
