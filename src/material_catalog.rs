//! Read-only substance constants, looked up by formula or common name.
//!
//! Spheres store every substance under its catalog formula (`CO2`, `H2O`, ...),
//! so a lookup by `carbon_dioxide` and one by `CO2` land on the same record.

use crate::constants::VOLATILE_BOILING_CUTOFF_K;
use crate::error::{Result, TerraSimError};
use crate::material::MaterialPhase;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub formula: String,
    pub name: String,
    pub molar_mass_g_mol: f64,
    pub melting_point_k: f64,
    /// Sublimation point for substances that skip the liquid phase at one bar.
    pub boiling_point_k: f64,
    #[serde(default)]
    pub vapor_pressure_pa: Option<f64>,
}

impl MaterialRecord {
    /// Phase at one bar. Substances whose boiling point sits below the
    /// melting point (CO2) go straight from solid to gas.
    pub fn phase_at(&self, temperature_k: f64) -> MaterialPhase {
        if temperature_k < self.melting_point_k.min(self.boiling_point_k) {
            MaterialPhase::Solid
        } else if temperature_k < self.boiling_point_k {
            MaterialPhase::Liquid
        } else {
            MaterialPhase::Gas
        }
    }

    /// Ices and gases, as opposed to rock and metal.
    pub fn is_volatile(&self) -> bool {
        self.boiling_point_k < VOLATILE_BOILING_CUTOFF_K
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    records: BTreeMap<String, MaterialRecord>,
    aliases: BTreeMap<String, String>,
}

static STANDARD_CATALOG: Lazy<Arc<MaterialCatalog>> = Lazy::new(|| {
    let json_str = include_str!("materials.json");
    match MaterialCatalog::from_json_str(json_str) {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            tracing::error!(%err, "embedded material table failed to parse");
            Arc::new(MaterialCatalog::default())
        }
    }
});

impl MaterialCatalog {
    /// The embedded table of common gases, ices and rock-forming oxides.
    pub fn standard() -> Arc<MaterialCatalog> {
        STANDARD_CATALOG.clone()
    }

    pub fn from_records(records: impl IntoIterator<Item = MaterialRecord>) -> Self {
        let mut catalog = MaterialCatalog::default();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    /// Parses a JSON array of material records.
    pub fn from_json_str(json_str: &str) -> Result<Self> {
        let records: Vec<MaterialRecord> = serde_json::from_str(json_str)?;
        Ok(Self::from_records(records))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        Self::from_json_str(&json_str)
    }

    /// Adds or replaces a record. Both the formula and the common name
    /// become lookup keys.
    pub fn insert(&mut self, record: MaterialRecord) {
        let formula = record.formula.clone();
        self.aliases.insert(record.name.to_lowercase(), formula.clone());
        self.aliases.insert(formula.to_lowercase(), formula.clone());
        self.records.insert(formula, record);
    }

    pub fn find_material(&self, name: &str) -> Option<&MaterialRecord> {
        self.records.get(name).or_else(|| {
            self.aliases
                .get(&name.to_lowercase())
                .and_then(|formula| self.records.get(formula))
        })
    }

    /// Like `find_material`, but an absent substance is an error.
    pub fn require(&self, name: &str) -> Result<&MaterialRecord> {
        self.find_material(name)
            .ok_or_else(|| TerraSimError::unknown_material(name))
    }

    /// The formula a substance is stored under.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.find_material(name).map(|record| record.formula.as_str())
    }

    pub fn molar_mass(&self, name: &str) -> Option<f64> {
        self.find_material(name).map(|record| record.molar_mass_g_mol)
    }

    pub fn phase_at(&self, name: &str, temperature_k: f64) -> Option<MaterialPhase> {
        self.find_material(name).map(|record| record.phase_at(temperature_k))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.records.values()
    }
}
