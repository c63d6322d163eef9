/// Geological activity operation
/// Re-derives interior activity from heat, geosphere mass and core iron.
/// Tectonics switch on above 50.

use super::{SimOp, TickContext};
use crate::error::Result;
use crate::geology::GeologyModel;

const IRON: &str = "Fe";

pub struct GeologicalActivityOp;

impl SimOp for GeologicalActivityOp {
    fn name(&self) -> &str {
        "GeologicalActivity"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let model = GeologyModel::new(&ctx.config().geology);
        let body = &mut *ctx.body;

        let activity = model.geological_activity(
            body.geosphere.surface_temperature_k,
            body.geosphere.total_geosphere_mass(),
            body.mass_kg(),
            body.geosphere.core_share(IRON),
        );
        body.geosphere.set_geological_activity(activity)?;
        tracing::debug!(activity, tectonic = body.geosphere.tectonic_activity(), "geological activity");

        ctx.report.geological_activity = Some(activity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celestial_body::{BodyProps, CelestialBody};
    use crate::sim::simulation::{TerraSim, TickReport};
    use crate::spheres::Layer;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_iron_core_raises_activity() {
        let engine = TerraSim::standard();
        let catalog = engine.catalog();
        let mut body = CelestialBody::new(BodyProps {
            name: "Forge".to_string(),
            radius_m: 1000.0,
            surface_gravity_m_s2: 10.0,
            mass_kg: 1.0e6,
            albedo: 0.3,
            insolation_w_m2: 0.0,
            surface_temperature_k: 3000.0,
        });
        body.geosphere.add_material(catalog, Layer::Mantle, "MgO", 4.0e5).unwrap();
        body.geosphere.add_material(catalog, Layer::Core, "Fe", 4.0e5).unwrap();
        body.geosphere.add_material(catalog, Layer::Core, "Ni", 1.0e5).unwrap();

        let mut report = TickReport::default();
        let mut ctx = TickContext {
            engine: &engine,
            body: &mut body,
            report: &mut report,
            start_temperature_k: 3000.0,
        };
        GeologicalActivityOp.update_sim(&mut ctx).unwrap();

        // heat 25, mass 0.9 * 30 = 27, iron 0.8 * 20 = 16
        assert_abs_diff_eq!(report.geological_activity.unwrap(), 68.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.geosphere.geological_activity(), 68.0, epsilon = 1e-9);
        assert!(body.geosphere.tectonic_activity());
    }

    #[test]
    fn test_cold_barren_body_is_quiet() {
        let engine = TerraSim::standard();
        let mut body = CelestialBody::new(BodyProps::mars("Mars"));

        let mut report = TickReport::default();
        let mut ctx = TickContext {
            engine: &engine,
            body: &mut body,
            report: &mut report,
            start_temperature_k: 210.0,
        };
        GeologicalActivityOp.update_sim(&mut ctx).unwrap();

        // only the heat term: 210 / 6000 * 50
        assert_abs_diff_eq!(body.geosphere.geological_activity(), 1.75, epsilon = 1e-12);
        assert!(!body.geosphere.tectonic_activity());
    }
}
