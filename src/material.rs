// src/material.rs - Substance quantities and their phase/location tags

use serde::{Deserialize, Serialize};

/// Material phase state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPhase {
    Solid,
    Liquid,
    Gas,
}

impl MaterialPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialPhase::Solid => "solid",
            MaterialPhase::Liquid => "liquid",
            MaterialPhase::Gas => "gas",
        }
    }
}

/// Where on (or in) the body a quantity sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Atmosphere,
    Surface,
    Crust,
    Mantle,
    Core,
    Hydrosphere,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Atmosphere => "atmosphere",
            Location::Surface => "surface",
            Location::Crust => "crust",
            Location::Mantle => "mantle",
            Location::Core => "core",
            Location::Hydrosphere => "hydrosphere",
        }
    }
}

/// A mass of one substance in one phase at one location.
///
/// Spheres drop a quantity as soon as its mass reaches zero, so a listed
/// quantity always has `mass_kg > 0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubstanceQuantity {
    pub name: String,
    pub mass_kg: f64,
    pub phase: MaterialPhase,
    pub location: Location,
}

impl SubstanceQuantity {
    pub fn new(name: impl Into<String>, mass_kg: f64, phase: MaterialPhase, location: Location) -> Self {
        Self {
            name: name.into(),
            mass_kg: mass_kg.max(0.0),
            phase,
            location,
        }
    }
}
