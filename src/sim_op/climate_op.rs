/// Climate operation
/// Derives the surface temperature from insolation, albedo and greenhouse
/// gases, then spreads it over latitude and locates the ice line. Every
/// sphere that carries a temperature is brought in line.

use super::{SimOp, TickContext};
use crate::climate::ClimateModel;
use crate::error::Result;

pub struct ClimateOp;

impl SimOp for ClimateOp {
    fn name(&self) -> &str {
        "Climate"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let model = ClimateModel::new(&ctx.config().climate);
        let body = &mut *ctx.body;

        let surface_temp_k = model.surface_temperature(body.insolation_w_m2, body.albedo(), &body.atmosphere);
        let state = model.evaluate(surface_temp_k, body.atmosphere.pressure_bar());

        body.atmosphere.set_temperature(state.surface_temp_k);
        body.hydrosphere.set_temperature(state.surface_temp_k);
        body.geosphere.set_surface_temperature(state.surface_temp_k);
        body.biosphere.apply_climate(&state);

        tracing::debug!(
            surface_temp_k = state.surface_temp_k,
            habitable_ratio = state.habitable_ratio,
            ice_latitude_deg = state.ice_latitude_deg,
            "climate"
        );
        ctx.report.climate = Some(state);
        Ok(())
    }
}
