/// Freeze-out operation
/// Condenses atmospheric gases onto the surface when the tick-start
/// temperature is below their condensation threshold. Water is left to the
/// water cycle.

use super::{SimOp, TickContext, skip_unless_fatal};
use crate::error::Result;
use crate::spheres::{ReservoirView, VolatileReservoir};
use crate::volatiles::VolatileModel;

const WATER: &str = "H2O";

pub struct FreezeOutOp;

impl SimOp for FreezeOutOp {
    fn name(&self) -> &str {
        "FreezeOut"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let catalog = ctx.catalog();
        let model = VolatileModel::new(&ctx.config().volatiles);
        let temperature_k = ctx.start_temperature_k;

        let gases: Vec<(String, f64)> = ctx
            .body
            .atmosphere
            .gases()
            .iter()
            .filter(|(name, _)| name.as_str() != WATER)
            .map(|(name, gas)| (name.clone(), gas.mass_kg))
            .collect();

        for (gas, mass_kg) in gases {
            let threshold_k = model.condensation_threshold_k(&gas, catalog);
            let fraction = model.freeze_out_fraction(temperature_k, threshold_k);
            if fraction <= 0.0 {
                continue;
            }

            let body = &mut *ctx.body;
            let mut surface_ice = ReservoirView::new(&mut body.geosphere, VolatileReservoir::SurfaceIce);
            let outcome = body.ledger.transfer(
                catalog,
                &gas,
                mass_kg * fraction,
                &mut body.atmosphere,
                &mut surface_ice,
            );
            let frozen = skip_unless_fatal(ctx.report, &gas, outcome)?;
            if frozen > 0.0 {
                tracing::debug!(gas = gas.as_str(), frozen_kg = frozen, "freeze-out");
                ctx.report.record_freeze(&gas, frozen);
            }
        }
        Ok(())
    }
}
