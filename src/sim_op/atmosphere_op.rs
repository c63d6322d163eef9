/// Atmosphere recompute operation
/// Rebuilds the derived aggregates of every sphere touched by the settlement
/// ops and pushes the new surface pressure down to the hydrosphere.

use super::{SimOp, TickContext};
use crate::error::Result;

pub struct AtmosphereOp;

impl SimOp for AtmosphereOp {
    fn name(&self) -> &str {
        "AtmosphereRecompute"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let body = &mut *ctx.body;
        body.atmosphere.recompute();
        body.hydrosphere.pressure_bar = body.atmosphere.pressure_bar();
        body.hydrosphere.recompute();
        body.geosphere.recompute();

        tracing::trace!(
            pressure_bar = body.atmosphere.pressure_bar(),
            total_mass_kg = body.atmosphere.total_mass_kg(),
            "atmosphere recomputed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celestial_body::{BodyProps, CelestialBody};
    use crate::sim::simulation::{TerraSim, TickReport};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pressure_reaches_hydrosphere() {
        let engine = TerraSim::standard();
        let mut body = CelestialBody::new(BodyProps {
            name: "Testbed".to_string(),
            radius_m: 1000.0,
            surface_gravity_m_s2: 10.0,
            mass_kg: 1.0e20,
            albedo: 0.3,
            insolation_w_m2: 0.0,
            surface_temperature_k: 288.0,
        });
        body.atmosphere.add_gas(engine.catalog(), "N2", 1.0e7).unwrap();

        let mut report = TickReport::default();
        let mut ctx = TickContext {
            engine: &engine,
            body: &mut body,
            report: &mut report,
            start_temperature_k: 288.0,
        };
        AtmosphereOp.update_sim(&mut ctx).unwrap();

        assert_abs_diff_eq!(body.atmosphere.pressure_bar(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(body.hydrosphere.pressure_bar, 1.0, epsilon = 1e-12);
    }
}
