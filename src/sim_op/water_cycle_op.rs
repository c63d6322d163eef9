/// Water cycle operation
/// Melts or freezes surface ice, evaporates liquid water into the atmosphere
/// and rains vapor back out. All moves between spheres go through the ledger.

use super::{SimOp, TickContext, skip_unless_fatal};
use crate::error::Result;
use crate::spheres::MaterialSphere;

const WATER: &str = "H2O";

pub struct WaterCycleOp;

impl SimOp for WaterCycleOp {
    fn name(&self) -> &str {
        "WaterCycle"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let catalog = ctx.catalog();
        let cycle = &ctx.config().water_cycle;
        let temperature_k = ctx.start_temperature_k;
        let above_freezing_k = temperature_k - cycle.freezing_point_k;

        let body = &mut *ctx.body;
        let net_melt_kg =
            body.hydrosphere
                .exchange_ice(cycle.freezing_point_k, cycle.melt_fraction, cycle.freeze_fraction);
        ctx.report.net_melt_kg += net_melt_kg;

        if above_freezing_k > 0.0 {
            let fraction =
                (above_freezing_k * cycle.evaporation_per_k).clamp(0.0, cycle.max_evaporation_fraction);
            let amount = body.hydrosphere.liquid_water_kg() * fraction;
            let outcome = body.ledger.transfer(
                catalog,
                WATER,
                amount,
                &mut body.hydrosphere,
                &mut body.atmosphere,
            );
            let evaporated = skip_unless_fatal(ctx.report, WATER, outcome)?;
            ctx.report.evaporated_kg += evaporated;
        }

        let vapor_kg = body.atmosphere.available(WATER);
        if vapor_kg > 0.0 {
            let fraction = (cycle.base_precipitation_fraction
                + above_freezing_k.max(0.0) * cycle.precipitation_per_k)
                .min(1.0);
            let outcome = body.ledger.transfer(
                catalog,
                WATER,
                vapor_kg * fraction,
                &mut body.atmosphere,
                &mut body.hydrosphere,
            );
            let precipitated = skip_unless_fatal(ctx.report, WATER, outcome)?;
            ctx.report.precipitated_kg += precipitated;
        }

        if ctx.report.evaporated_kg > 0.0 || ctx.report.precipitated_kg > 0.0 {
            tracing::debug!(
                evaporated_kg = ctx.report.evaporated_kg,
                precipitated_kg = ctx.report.precipitated_kg,
                "water cycle"
            );
        }
        Ok(())
    }
}
