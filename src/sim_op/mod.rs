// Tick pipeline operations, in default execution order
pub mod geological_activity_op;
pub mod weathering_op;
pub mod volatile_release_op;
pub mod freeze_out_op;
pub mod water_cycle_op;
pub mod gas_exchange_op;
pub mod atmosphere_op;
pub mod climate_op;
pub mod habitability_op;

pub use atmosphere_op::AtmosphereOp;
pub use climate_op::ClimateOp;
pub use freeze_out_op::FreezeOutOp;
pub use gas_exchange_op::GasExchangeOp;
pub use geological_activity_op::GeologicalActivityOp;
pub use habitability_op::HabitabilityOp;
pub use volatile_release_op::VolatileReleaseOp;
pub use water_cycle_op::WaterCycleOp;
pub use weathering_op::WeatheringOp;

use crate::celestial_body::CelestialBody;
use crate::error::Result;
use crate::material_catalog::MaterialCatalog;
use crate::config::SimConfig;
use crate::sim::simulation::{TerraSim, TickReport};

/// Everything an op may read or write during one tick of one body.
pub struct TickContext<'a> {
    pub engine: &'a TerraSim,
    pub body: &'a mut CelestialBody,
    pub report: &'a mut TickReport,
    /// Atmosphere temperature when the tick started. Settlement ops read
    /// this, so they see last tick's climate.
    pub start_temperature_k: f64,
}

impl<'a> TickContext<'a> {
    pub fn catalog(&self) -> &'a MaterialCatalog {
        self.engine.catalog()
    }

    pub fn config(&self) -> &'a SimConfig {
        self.engine.config()
    }
}

pub trait SimOp: Send + Sync {
    /// The name of this operator (for identification and timing)
    fn name(&self) -> &str;

    /// Called once per tick, in pipeline order
    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()>;
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}

/// The fixed default pipeline: update the geosphere, settle transfers,
/// recompute the atmosphere, then climate, then habitability.
pub fn default_ops() -> Vec<SimOpHandle> {
    vec![
        SimOpHandle::new(Box::new(GeologicalActivityOp)),
        SimOpHandle::new(Box::new(WeatheringOp)),
        SimOpHandle::new(Box::new(VolatileReleaseOp)),
        SimOpHandle::new(Box::new(FreezeOutOp)),
        SimOpHandle::new(Box::new(WaterCycleOp)),
        SimOpHandle::new(Box::new(GasExchangeOp)),
        SimOpHandle::new(Box::new(AtmosphereOp)),
        SimOpHandle::new(Box::new(ClimateOp)),
        SimOpHandle::new(Box::new(HabitabilityOp)),
    ]
}

/// Turns a non-fatal transfer failure into a skipped compound. Fatal errors
/// pass through and abort the tick.
pub(crate) fn skip_unless_fatal(report: &mut TickReport, compound: &str, outcome: Result<f64>) -> Result<f64> {
    match outcome {
        Ok(moved) => Ok(moved),
        Err(err) if !err.is_fatal() => {
            tracing::warn!(compound, %err, "skipping compound this tick");
            report.skip(compound);
            Ok(0.0)
        }
        Err(err) => Err(err),
    }
}
