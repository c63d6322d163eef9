// Mars terraforming demo
// Imports CO2 and water vapor into a thin Martian atmosphere and watches the
// caps outgas, the surface warm and the ice line retreat.
//
// Run with RUST_LOG=terra_sim_rust=debug to see per-op logs.

use colored::Colorize;
use terra_sim_rust::spheres::{SphereKind, VolatileReservoir};
use terra_sim_rust::{BodyProps, CelestialBody, Result, TerraSim, TickReport};
use tracing_subscriber::EnvFilter;

const TICKS: usize = 12;
const CO2_IMPORT_KG: f64 = 2.0e11;
const WATER_IMPORT_KG: f64 = 1.5e11;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("{}", "🔴 Mars Terraforming Run".bold().red());
    println!("========================");

    let engine = TerraSim::standard();
    let catalog = engine.catalog();

    let mut mars = CelestialBody::new(BodyProps::mars("Mars"));
    mars.atmosphere.add_gas(catalog, "CO2", 2.5e11)?;
    mars.atmosphere.add_gas(catalog, "N2", 7.0e9)?;
    mars.atmosphere.add_gas(catalog, "Ar", 5.0e9)?;
    mars.geosphere.set_regolith_depth(Some(20.0))?;
    mars.geosphere.add_volatile(catalog, "CO2", VolatileReservoir::PolarCaps, 1.0e13)?;
    mars.geosphere.add_volatile(catalog, "CO2", VolatileReservoir::Regolith, 4.0e13)?;
    mars.geosphere.add_volatile(catalog, "CH4", VolatileReservoir::Clathrates, 2.0e12)?;
    mars.hydrosphere.add_ice(5.0e14)?;
    mars.biosphere.introduce_biome("lichen_fields", Some(2.0))?;
    mars.mark_persisted();

    println!("Pipeline: {}", engine.op_names().join(" → "));
    println!();

    let mut last_report = TickReport::default();
    for tick in 1..=TICKS {
        if tick % 3 == 1 {
            mars.inject(catalog, SphereKind::Atmosphere, "CO2", CO2_IMPORT_KG)?;
            mars.inject(catalog, SphereKind::Atmosphere, "water", WATER_IMPORT_KG)?;
        }

        let result = engine.tick(&mut mars)?;
        if !result.changed {
            println!("{}", format!("Tick {tick:>2}: nothing to do").dimmed());
            continue;
        }
        print_tick(tick, &mars, &result.report);
        last_report = result.report;
    }

    println!();
    println!("{}", "Final inventory".bold());
    for (substance, mass) in mars.inventory() {
        println!("  {:<6} {:>12.3e} kg", substance, mass);
    }
    last_report.print_timing_report();
    Ok(())
}

fn print_tick(tick: usize, mars: &CelestialBody, report: &TickReport) {
    let temperature = mars.atmosphere.temperature_k;
    let temperature_text = format!("{temperature:>6.1} K");
    let temperature_text = if temperature >= 273.15 {
        temperature_text.green()
    } else if temperature >= 240.0 {
        temperature_text.yellow()
    } else {
        temperature_text.cyan()
    };

    println!(
        "Tick {:>2}: T {} | P {:>8.5} bar | released {:>10.3e} kg | snow {:>10.3e} kg | habitable {:>5.1}% | score {:.2}",
        tick,
        temperature_text,
        mars.atmosphere.pressure_bar(),
        report.total_released_kg(),
        report.precipitated_kg,
        mars.biosphere.habitable_ratio() * 100.0,
        mars.biosphere.habitability_index(),
    );
    if let (Some(activity), Some(depth)) = (report.geological_activity, mars.geosphere.regolith_depth_m()) {
        let absorbed = -report.biogenic_flux.get("CO2").copied().unwrap_or(0.0);
        let line = format!("         activity {activity:>5.2} | regolith {depth:>8.4} m | CO2 to biomass {absorbed:.3e} kg");
        println!("{}", line.dimmed());
    }
    if !report.skipped.is_empty() {
        println!("{}", format!("         skipped: {}", report.skipped.join(", ")).red());
    }
}
