use crate::constants::{
    EARTH_BOND_ALBEDO, EARTH_MASS_KG, EARTH_RADIUS_M, EARTH_SURFACE_GRAVITY_M_S2, MARS_BOND_ALBEDO,
    MARS_INSOLATION_W_M2, MARS_MASS_KG, MARS_RADIUS_M, MARS_SURFACE_GRAVITY_M_S2, SOLAR_CONSTANT_W_M2,
};
use crate::error::Result;
use crate::ledger::MaterialTransferLedger;
use crate::material::MaterialPhase;
use crate::material_catalog::MaterialCatalog;
use crate::spheres::{Atmosphere, Biosphere, Geosphere, Hydrosphere, Layer, MaterialSphere, SphereKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a tick is in progress for a body. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimState {
    #[default]
    Idle,
    Running,
}

pub struct BodyProps {
    pub name: String,
    pub radius_m: f64,
    pub surface_gravity_m_s2: f64,
    pub mass_kg: f64,
    pub albedo: f64,
    pub insolation_w_m2: f64,
    pub surface_temperature_k: f64,
}

impl BodyProps {
    pub fn earth(name: &str) -> Self {
        BodyProps {
            name: name.to_string(),
            radius_m: EARTH_RADIUS_M,
            surface_gravity_m_s2: EARTH_SURFACE_GRAVITY_M_S2,
            mass_kg: EARTH_MASS_KG,
            albedo: EARTH_BOND_ALBEDO,
            insolation_w_m2: SOLAR_CONSTANT_W_M2,
            surface_temperature_k: 288.0,
        }
    }

    pub fn mars(name: &str) -> Self {
        BodyProps {
            name: name.to_string(),
            radius_m: MARS_RADIUS_M,
            surface_gravity_m_s2: MARS_SURFACE_GRAVITY_M_S2,
            mass_kg: MARS_MASS_KG,
            albedo: MARS_BOND_ALBEDO,
            insolation_w_m2: MARS_INSOLATION_W_M2,
            surface_temperature_k: 210.0,
        }
    }
}

fn persisted_on_load() -> bool {
    true
}

/// A planet or moon and the four spheres it exclusively owns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CelestialBody {
    pub name: String,
    radius_m: f64,
    surface_gravity_m_s2: f64,
    mass_kg: f64,
    albedo: f64,
    /// Stellar flux at the body's orbit. Zero leaves temperatures to the caller.
    pub insolation_w_m2: f64,
    pub atmosphere: Atmosphere,
    pub hydrosphere: Hydrosphere,
    pub geosphere: Geosphere,
    pub biosphere: Biosphere,
    #[serde(default)]
    pub ledger: MaterialTransferLedger,
    #[serde(default = "persisted_on_load")]
    persisted: bool,
    #[serde(default)]
    mass_changed: bool,
    #[serde(default)]
    albedo_changed: bool,
    #[serde(skip)]
    sim_state: SimState,
}

impl CelestialBody {
    pub fn new(props: BodyProps) -> CelestialBody {
        let temperature = props.surface_temperature_k;
        CelestialBody {
            name: props.name,
            radius_m: props.radius_m,
            surface_gravity_m_s2: props.surface_gravity_m_s2,
            mass_kg: props.mass_kg,
            albedo: props.albedo,
            insolation_w_m2: props.insolation_w_m2,
            atmosphere: Atmosphere::new(props.radius_m, props.surface_gravity_m_s2, temperature),
            hydrosphere: Hydrosphere::new(temperature),
            geosphere: Geosphere::new(temperature),
            biosphere: Biosphere::new(),
            ledger: MaterialTransferLedger::default(),
            persisted: false,
            mass_changed: false,
            albedo_changed: false,
            sim_state: SimState::Idle,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn surface_gravity_m_s2(&self) -> f64 {
        self.surface_gravity_m_s2
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    pub fn albedo(&self) -> f64 {
        self.albedo
    }

    pub fn set_mass(&mut self, mass_kg: f64) {
        if self.mass_kg != mass_kg {
            self.mass_kg = mass_kg;
            self.mass_changed = true;
        }
    }

    pub fn set_albedo(&mut self, albedo: f64) {
        let albedo = albedo.clamp(0.0, 1.0);
        if self.albedo != albedo {
            self.albedo = albedo;
            self.albedo_changed = true;
        }
    }

    /// New bodies are never simulated until they have been saved once.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    pub fn sim_state(&self) -> SimState {
        self.sim_state
    }

    pub(crate) fn set_sim_state(&mut self, state: SimState) {
        self.sim_state = state;
    }

    pub fn has_relevant_changes(&self) -> bool {
        self.mass_changed
            || self.albedo_changed
            || self.atmosphere.is_dirty()
            || self.hydrosphere.is_dirty()
            || self.geosphere.is_dirty()
            || self.biosphere.is_dirty()
    }

    pub(crate) fn clear_change_flags(&mut self) {
        self.mass_changed = false;
        self.albedo_changed = false;
        self.atmosphere.clear_dirty();
        self.hydrosphere.clear_dirty();
        self.geosphere.clear_dirty();
        self.biosphere.clear_dirty();
    }

    pub fn sphere(&self, kind: SphereKind) -> &dyn MaterialSphere {
        match kind {
            SphereKind::Atmosphere => &self.atmosphere,
            SphereKind::Hydrosphere => &self.hydrosphere,
            SphereKind::Geosphere => &self.geosphere,
            SphereKind::Biosphere => &self.biosphere,
        }
    }

    /// Brings material onto the body from outside (imports, impacts) and
    /// records it in the ledger.
    pub fn inject(
        &mut self,
        catalog: &MaterialCatalog,
        kind: SphereKind,
        substance: &str,
        mass_kg: f64,
    ) -> Result<()> {
        let formula = catalog.require(substance)?.formula.clone();
        match kind {
            SphereKind::Atmosphere => self.atmosphere.add_gas(catalog, &formula, mass_kg)?,
            SphereKind::Hydrosphere => self.hydrosphere.add_liquid(catalog, &formula, mass_kg)?,
            SphereKind::Geosphere => self.geosphere.add_material(catalog, Layer::Crust, &formula, mass_kg)?,
            SphereKind::Biosphere => {
                self.biosphere.add_material(catalog, &formula, mass_kg, MaterialPhase::Solid)?
            }
        }
        self.ledger.record_addition(&formula, mass_kg)
    }

    /// Takes material off the body. Saturates at what the sphere holds and
    /// returns the mass removed.
    pub fn extract(
        &mut self,
        catalog: &MaterialCatalog,
        kind: SphereKind,
        substance: &str,
        mass_kg: f64,
    ) -> Result<f64> {
        let formula = catalog.canonical_name(substance).unwrap_or(substance).to_string();
        let removed = match kind {
            SphereKind::Atmosphere => self.atmosphere.remove_gas(&formula, mass_kg)?,
            SphereKind::Hydrosphere => self.hydrosphere.remove_liquid(&formula, mass_kg)?,
            SphereKind::Geosphere => self.geosphere.extract_material(&formula, mass_kg)?,
            SphereKind::Biosphere => self.biosphere.remove_material(&formula, mass_kg)?,
        };
        self.ledger.record_removal(&formula, removed)?;
        Ok(removed)
    }

    /// Mass of a substance summed over every sphere, layer and reservoir.
    pub fn total_substance_mass(&self, substance: &str) -> f64 {
        self.inventory().get(substance).copied().unwrap_or(0.0)
    }

    pub fn inventory(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for kind in [
            SphereKind::Atmosphere,
            SphereKind::Hydrosphere,
            SphereKind::Geosphere,
            SphereKind::Biosphere,
        ] {
            for quantity in self.sphere(kind).quantities() {
                *totals.entry(quantity.name).or_insert(0.0) += quantity.mass_kg;
            }
        }
        totals
    }
}
