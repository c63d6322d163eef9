pub mod celestial_body;
pub mod climate;
pub mod config;
pub mod constants;
pub mod error;
pub mod gas_exchange;
pub mod geology;
pub mod habitability;
pub mod ledger;
pub mod material;
pub mod material_catalog;
pub mod sim;
pub mod sim_op;
pub mod spheres;
pub mod temp_utils;
pub mod volatiles;

pub use celestial_body::{BodyProps, CelestialBody, SimState};
pub use config::SimConfig;
pub use error::{Result, TerraSimError};
pub use material_catalog::MaterialCatalog;
pub use sim::{TerraSim, TickReport, TickResult};
