/// Volatile release operation
/// Outgasses ices and trapped gases from the geosphere's reservoirs into the
/// atmosphere, at a rate set by the tick-start temperature.

use super::{SimOp, TickContext, skip_unless_fatal};
use crate::error::Result;
use crate::spheres::ReservoirView;
use crate::volatiles::VolatileModel;

pub struct VolatileReleaseOp;

impl SimOp for VolatileReleaseOp {
    fn name(&self) -> &str {
        "VolatileRelease"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let catalog = ctx.catalog();
        let model = VolatileModel::new(&ctx.config().volatiles);
        let temperature_k = ctx.start_temperature_k;
        let regolith_depth_m = ctx.body.geosphere.regolith_depth_m();

        for (compound, reservoir, stored) in ctx.body.geosphere.volatile_entries() {
            let rate = model.release_rate(temperature_k, &compound, reservoir, regolith_depth_m);
            if rate <= 0.0 {
                continue;
            }

            let body = &mut *ctx.body;
            let mut source = ReservoirView::new(&mut body.geosphere, reservoir);
            let outcome = body
                .ledger
                .transfer(catalog, &compound, stored * rate, &mut source, &mut body.atmosphere);
            let released = skip_unless_fatal(ctx.report, &compound, outcome)?;

            if released > 0.0 {
                tracing::debug!(
                    compound = compound.as_str(),
                    reservoir = reservoir.as_str(),
                    released_kg = released,
                    "volatile release"
                );
                ctx.report.record_release(&compound, released);
            }
        }
        Ok(())
    }
}
