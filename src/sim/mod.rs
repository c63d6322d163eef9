pub mod simulation;

pub use simulation::{OpTiming, TerraSim, TickReport, TickResult};
