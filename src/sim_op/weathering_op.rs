/// Weathering operation
/// Deepens surveyed regolith at a rate set by pressure, temperature, liquid
/// water and geological activity. Unsurveyed regolith stays unknown.

use super::{SimOp, TickContext};
use crate::error::Result;
use crate::geology::GeologyModel;

const WATER: &str = "H2O";

pub struct WeatheringOp;

impl SimOp for WeatheringOp {
    fn name(&self) -> &str {
        "Weathering"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let model = GeologyModel::new(&ctx.config().geology);
        let temperature_k = ctx.start_temperature_k;
        let body = &mut *ctx.body;

        let Some(depth_m) = body.geosphere.regolith_depth_m() else {
            return Ok(());
        };
        let vapor_kg = body.atmosphere.gas_mass(WATER);
        let liquid_pct = body.hydrosphere.state_distribution(vapor_kg).liquid;
        let rate = model.weathering_rate(
            body.atmosphere.pressure_bar(),
            temperature_k,
            liquid_pct,
            body.geosphere.geological_activity(),
        );
        let growth_m = model.regolith_growth_m(rate);
        if growth_m > 0.0 {
            body.geosphere.set_regolith_depth(Some(depth_m + growth_m))?;
            tracing::debug!(rate, growth_m, "regolith weathering");
        }

        ctx.report.weathering_rate = Some(rate);
        ctx.report.regolith_growth_m += growth_m;
        Ok(())
    }
}
