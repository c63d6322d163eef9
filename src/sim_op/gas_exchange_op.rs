/// Biosphere gas exchange operation
/// Living biomes take CO2 out of the atmosphere and give back the O2 and
/// CH4 the biosphere holds. Flows go through the ledger, so a biosphere can
/// only release gas it actually stores.

use super::{SimOp, TickContext, skip_unless_fatal};
use crate::error::Result;
use crate::gas_exchange::GasExchangeModel;

const CO2: &str = "CO2";
const O2: &str = "O2";
const CH4: &str = "CH4";

pub struct GasExchangeOp;

impl SimOp for GasExchangeOp {
    fn name(&self) -> &str {
        "BiosphereGasExchange"
    }

    fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
        let catalog = ctx.catalog();
        let model = GasExchangeModel::new(&ctx.config().gas_exchange);
        let flows = model.exchange(ctx.body.atmosphere.total_mass_kg(), ctx.body.biosphere.biome_count());

        let body = &mut *ctx.body;
        let outcome = body.ledger.transfer(
            catalog,
            CO2,
            flows.co2_uptake_kg,
            &mut body.atmosphere,
            &mut body.biosphere,
        );
        let absorbed = skip_unless_fatal(ctx.report, CO2, outcome)?;
        if absorbed > 0.0 {
            ctx.report.record_biogenic(CO2, -absorbed);
        }

        for (gas, amount) in [(O2, flows.o2_release_kg), (CH4, flows.ch4_release_kg)] {
            let body = &mut *ctx.body;
            let outcome = body
                .ledger
                .transfer(catalog, gas, amount, &mut body.biosphere, &mut body.atmosphere);
            let released = skip_unless_fatal(ctx.report, gas, outcome)?;
            if released > 0.0 {
                ctx.report.record_biogenic(gas, released);
            }
        }

        if !ctx.report.biogenic_flux.is_empty() {
            tracing::debug!(flux = ?ctx.report.biogenic_flux, "biosphere gas exchange");
        }
        Ok(())
    }
}
