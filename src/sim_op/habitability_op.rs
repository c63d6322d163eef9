/// Habitability operation
/// Scores the body for life from the fresh climate and atmosphere, and
/// derives biodiversity from the number of biomes.

use super::{SimOp, TickContext};
use crate::error::Result;
use crate::habitability::HabitabilityEvaluator;

pub struct HabitabilityOp;

impl SimOp for HabitabilityOp {
    fn name(&self) -> &str {
        "Habitability"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let evaluator = HabitabilityEvaluator::new(&ctx.config().habitability);
        let body = &mut *ctx.body;

        let score = evaluator.habitability(
            body.atmosphere.temperature_k,
            body.atmosphere.pressure_bar(),
            body.atmosphere.gas_percentage("O2"),
        );
        let biodiversity = evaluator.biodiversity(body.biosphere.biome_count());
        body.biosphere.apply_habitability(score, biodiversity);

        ctx.report.habitability = Some(score);
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
    fn test_scores_land_on_biosphere() {
        let engine = TerraSim::standard();
        let catalog = engine.catalog();
        let mut body = CelestialBody::new(BodyProps {
            name: "Garden".to_string(),
            radius_m: 1000.0,
            surface_gravity_m_s2: 10.0,
            mass_kg: 1.0e20,
            albedo: 0.3,
            insolation_w_m2: 0.0,
            surface_temperature_k: 291.0,
        });
        body.atmosphere.add_gas(catalog, "N2", 8.0e6).unwrap();
        body.atmosphere.add_gas(catalog, "O2", 2.0e6).unwrap();
        body.biosphere.introduce_biome("forest", None).unwrap();
        body.biosphere.introduce_biome("wetland", Some(5.0)).unwrap();

        let mut report = TickReport::default();
        let mut ctx = TickContext {
            engine: &engine,
            body: &mut body,
            report: &mut report,
            start_temperature_k: 291.0,
        };
        HabitabilityOp.update_sim(&mut ctx).unwrap();

        // 1 bar, 20 % O2, 291 K is the ideal case
        assert_abs_diff_eq!(report.habitability.unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.biosphere.habitability_index(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.biosphere.biodiversity_index(), 0.2, epsilon = 1e-12);
    }
}
