use crate::celestial_body::{CelestialBody, SimState};
use crate::climate::ClimateState;
use crate::config::SimConfig;
use crate::error::Result;
use crate::material_catalog::MaterialCatalog;
use crate::sim_op::{SimOp, SimOpHandle, TickContext, default_ops};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OpTiming {
    pub op_name: String,
    pub total_update_time: Duration,
    pub update_call_count: u32,
}

impl OpTiming {
    pub fn new(op_name: String) -> Self {
        Self {
            op_name,
            total_update_time: Duration::ZERO,
            update_call_count: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.total_update_time += elapsed;
        self.update_call_count += 1;
    }

    pub fn avg_update_time(&self) -> Duration {
        if self.update_call_count > 0 {
            self.total_update_time / self.update_call_count
        } else {
            Duration::ZERO
        }
    }

    /// Folds another timing for the same op into this one.
    pub fn absorb(&mut self, other: &OpTiming) {
        self.total_update_time += other.total_update_time;
        self.update_call_count += other.update_call_count;
    }
}

/// What one tick did to one body.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Mass released from geosphere reservoirs, by compound.
    pub released: BTreeMap<String, f64>,
    /// Mass condensed out of the atmosphere, by compound.
    pub frozen: BTreeMap<String, f64>,
    pub evaporated_kg: f64,
    pub precipitated_kg: f64,
    /// Ice melted minus liquid frozen.
    pub net_melt_kg: f64,
    /// Net biosphere flow into the atmosphere, by gas. Uptake is negative.
    pub biogenic_flux: BTreeMap<String, f64>,
    pub geological_activity: Option<f64>,
    /// `None` when the regolith depth is unknown.
    pub weathering_rate: Option<f64>,
    pub regolith_growth_m: f64,
    /// Compounds dropped from this tick because they are not in the catalog.
    pub skipped: Vec<String>,
    pub climate: Option<ClimateState>,
    pub habitability: Option<f64>,
    pub op_timings: Vec<OpTiming>,
}

impl TickReport {
    pub fn record_release(&mut self, compound: &str, mass_kg: f64) {
        *self.released.entry(compound.to_string()).or_insert(0.0) += mass_kg;
    }

    pub fn record_freeze(&mut self, compound: &str, mass_kg: f64) {
        *self.frozen.entry(compound.to_string()).or_insert(0.0) += mass_kg;
    }

    pub fn record_biogenic(&mut self, gas: &str, mass_kg: f64) {
        *self.biogenic_flux.entry(gas.to_string()).or_insert(0.0) += mass_kg;
    }

    pub fn skip(&mut self, compound: &str) {
        if !self.skipped.iter().any(|skipped| skipped == compound) {
            self.skipped.push(compound.to_string());
        }
    }

    pub fn total_released_kg(&self) -> f64 {
        self.released.values().sum()
    }

    pub fn total_frozen_kg(&self) -> f64 {
        self.frozen.values().sum()
    }

    pub fn total_update_time(&self) -> Duration {
        self.op_timings.iter().map(|timing| timing.total_update_time).sum()
    }

    pub fn print_timing_report(&self) {
        let total_time = self.total_update_time();
        println!("\n📊 === TICK TIMING REPORT ===");
        for timing in &self.op_timings {
            let percentage = if total_time.as_nanos() > 0 {
                (timing.total_update_time.as_nanos() as f64 / total_time.as_nanos() as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  🔧 {:<25} | Total: {:>8}µs | Avg: {:>8}µs | Share: {:>5.1}%",
                timing.op_name,
                timing.total_update_time.as_micros(),
                timing.avg_update_time().as_micros(),
                percentage
            );
        }
        println!("⏱️  TOTAL TICK TIME: {}µs", total_time.as_micros());
        println!("📊 === END TIMING REPORT ===\n");
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickResult {
    pub changed: bool,
    pub report: TickReport,
}

impl TickResult {
    pub fn unchanged() -> Self {
        TickResult::default()
    }
}

/// Holds a body in `SimState::Running` and drops it back to `Idle` on every
/// exit path, including errors.
struct RunningGuard<'b> {
    body: &'b mut CelestialBody,
}

impl<'b> RunningGuard<'b> {
    fn enter(body: &'b mut CelestialBody) -> Self {
        body.set_sim_state(SimState::Running);
        RunningGuard { body }
    }
}

impl Deref for RunningGuard<'_> {
    type Target = CelestialBody;

    fn deref(&self) -> &CelestialBody {
        self.body
    }
}

impl DerefMut for RunningGuard<'_> {
    fn deref_mut(&mut self) -> &mut CelestialBody {
        self.body
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.body.set_sim_state(SimState::Idle);
    }
}

/// The tick engine. Owns the catalog, the tunables and the op pipeline, and
/// holds no per-body state, so one engine can drive any number of bodies.
pub struct TerraSim {
    catalog: Arc<MaterialCatalog>,
    config: SimConfig,
    ops: Vec<Box<dyn SimOp>>,
}

impl TerraSim {
    pub fn new(catalog: Arc<MaterialCatalog>, config: SimConfig) -> TerraSim {
        Self::with_ops(catalog, config, default_ops())
    }

    pub fn standard() -> TerraSim {
        Self::new(MaterialCatalog::standard(), SimConfig::default())
    }

    pub fn with_ops(catalog: Arc<MaterialCatalog>, config: SimConfig, ops: Vec<SimOpHandle>) -> TerraSim {
        let ops = ops.into_iter().map(|handle| handle.op).collect();
        TerraSim { catalog, config, ops }
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn op_names(&self) -> Vec<&str> {
        self.ops.iter().map(|op| op.name()).collect()
    }

    /// Runs the pipeline once over `body`.
    ///
    /// Returns `changed = false` without touching the body when a tick is
    /// already running for it, when it was never persisted, or when nothing
    /// relevant changed since the last tick.
    pub fn tick(&self, body: &mut CelestialBody) -> Result<TickResult> {
        if body.sim_state() == SimState::Running {
            tracing::debug!(body = body.name.as_str(), "tick already running, skipping");
            return Ok(TickResult::unchanged());
        }
        if !body.is_persisted() || !body.has_relevant_changes() {
            return Ok(TickResult::unchanged());
        }

        let span = tracing::debug_span!("tick", body = %body.name);
        let _enter = span.enter();

        let mut guard = RunningGuard::enter(body);
        guard.ledger.configure(&self.config.ledger);
        let start_temperature_k = guard.atmosphere.temperature_k;
        let mut report = TickReport::default();

        for op in &self.ops {
            tracing::debug!(op = op.name(), "op start");
            let start = Instant::now();
            let mut ctx = TickContext {
                engine: self,
                body: &mut *guard,
                report: &mut report,
                start_temperature_k,
            };
            let outcome = op.update_sim(&mut ctx);
            let mut timing = OpTiming::new(op.name().to_string());
            timing.record(start.elapsed());
            report.op_timings.push(timing);

            if let Err(err) = outcome {
                tracing::error!(op = op.name(), %err, "tick aborted");
                return Err(err);
            }
        }

        guard.clear_change_flags();
        Ok(TickResult { changed: true, report })
    }

    /// Ticks every body in parallel. Results line up with `bodies`.
    pub fn tick_all(&self, bodies: &mut [CelestialBody]) -> Vec<Result<TickResult>> {
        bodies.par_iter_mut().map(|body| self.tick(body)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celestial_body::BodyProps;
    use crate::error::TerraSimError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ready_body() -> CelestialBody {
        let catalog = MaterialCatalog::standard();
        let mut body = CelestialBody::new(BodyProps::mars("Mars"));
        body.atmosphere.add_gas(&catalog, "CO2", 2.5e16).unwrap();
        body.atmosphere.add_gas(&catalog, "N2", 1.0e15).unwrap();
        body.mark_persisted();
        body
    }

    struct RecordingOp {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SimOp for RecordingOp {
        fn name(&self) -> &str {
            self.name
        }

        fn update_sim(&self, _ctx: &mut TickContext<'_>) -> Result<()> {
            if let Ok(mut log) = self.log.lock() {
                log.push(self.name);
            }
            Ok(())
        }
    }

    struct ReentrantOp {
        nested_changed: Arc<AtomicBool>,
    }

    impl SimOp for ReentrantOp {
        fn name(&self) -> &str {
            "Reentrant"
        }

        fn update_sim(&self, ctx: &mut TickContext<'_>) -> Result<()> {
            let nested = ctx.engine.tick(ctx.body)?;
            self.nested_changed.store(nested.changed, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingOp;

    impl SimOp for FailingOp {
        fn name(&self) -> &str {
            "Failing"
        }

        fn update_sim(&self, _ctx: &mut TickContext<'_>) -> Result<()> {
            Err(TerraSimError::InvariantViolation {
                substance: "CO2".to_string(),
                expected: 1.0,
                actual: 2.0,
            })
        }
    }

    #[test]
    fn test_default_pipeline_order() {
        let engine = TerraSim::standard();
        assert_eq!(
            engine.op_names(),
            vec![
                "GeologicalActivity",
                "Weathering",
                "VolatileRelease",
                "FreezeOut",
                "WaterCycle",
                "BiosphereGasExchange",
                "AtmosphereRecompute",
                "Climate",
                "Habitability"
            ]
        );
    }

    #[test]
    fn test_custom_ops_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ops = ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                SimOpHandle::new(Box::new(RecordingOp {
                    name,
                    log: log.clone(),
                }))
            })
            .collect();
        let engine = TerraSim::with_ops(MaterialCatalog::standard(), SimConfig::default(), ops);

        let mut body = ready_body();
        let result = engine.tick(&mut body).unwrap();

        assert!(result.changed);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(result.report.op_timings.len(), 3);
        assert!(result.report.op_timings.iter().all(|t| t.update_call_count == 1));
    }

    #[test]
    fn test_new_record_is_never_ticked() {
        let engine = TerraSim::standard();
        let catalog = MaterialCatalog::standard();
        let mut body = CelestialBody::new(BodyProps::mars("Fresh"));
        body.atmosphere.add_gas(&catalog, "CO2", 1.0e15).unwrap();

        let result = engine.tick(&mut body).unwrap();
        assert!(!result.changed);
        assert!(body.has_relevant_changes());
    }

    #[test]
    fn test_clean_body_is_not_ticked() {
        let engine = TerraSim::standard();
        let mut body = CelestialBody::new(BodyProps::mars("Quiet"));
        body.mark_persisted();
        assert!(!engine.tick(&mut body).unwrap().changed);
    }

    #[test]
    fn test_second_tick_is_a_no_op() {
        let engine = TerraSim::standard();
        let mut body = ready_body();

        let first = engine.tick(&mut body).unwrap();
        assert!(first.changed);
        assert!(!body.has_relevant_changes());
        let snapshot = serde_json::to_value(&body).unwrap();

        let second = engine.tick(&mut body).unwrap();
        assert!(!second.changed);
        assert_eq!(serde_json::to_value(&body).unwrap(), snapshot);
        assert_eq!(body.sim_state(), SimState::Idle);
    }

    #[test]
    fn test_reentrant_tick_is_silent() {
        let nested_changed = Arc::new(AtomicBool::new(true));
        let engine = TerraSim::with_ops(
            MaterialCatalog::standard(),
            SimConfig::default(),
            vec![SimOpHandle::new(Box::new(ReentrantOp {
                nested_changed: nested_changed.clone(),
            }))],
        );

        let mut body = ready_body();
        let result = engine.tick(&mut body).unwrap();

        assert!(result.changed);
        assert!(!nested_changed.load(Ordering::SeqCst));
        assert_eq!(body.sim_state(), SimState::Idle);
    }

    #[test]
    fn test_failed_tick_releases_guard() {
        let engine = TerraSim::with_ops(
            MaterialCatalog::standard(),
            SimConfig::default(),
            vec![SimOpHandle::new(Box::new(FailingOp))],
        );
        let mut body = ready_body();

        let err = engine.tick(&mut body).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(body.sim_state(), SimState::Idle);
        // flags survive so the next tick retries
        assert!(body.has_relevant_changes());
    }

    #[test]
    fn test_tick_all_matches_bodies() {
        let engine = TerraSim::standard();
        let mut quiet = CelestialBody::new(BodyProps::earth("Quiet"));
        quiet.mark_persisted();
        let mut bodies = vec![ready_body(), quiet, ready_body()];

        let results = engine.tick_all(&mut bodies);

        let changed: Vec<bool> = results.into_iter().map(|r| r.unwrap().changed).collect();
        assert_eq!(changed, vec![true, false, true]);
    }

    #[test]
    fn test_report_skip_dedupes() {
        let mut report = TickReport::default();
        report.skip("Xe");
        report.skip("Xe");
        report.record_release("CO2", 1.0);
        report.record_release("CO2", 2.0);
        assert_eq!(report.skipped, vec!["Xe".to_string()]);
        assert_eq!(report.total_released_kg(), 3.0);
    }

    #[test]
    fn test_op_timing_average() {
        let mut timing = OpTiming::new("Climate".to_string());
        assert_eq!(timing.avg_update_time(), Duration::ZERO);
        timing.record(Duration::from_millis(4));
        timing.record(Duration::from_millis(2));

        let mut other = OpTiming::new("Climate".to_string());
        other.record(Duration::from_millis(3));
        timing.absorb(&other);

        assert_eq!(timing.update_call_count, 3);
        assert_eq!(timing.avg_update_time(), Duration::from_millis(3));
    }
}
