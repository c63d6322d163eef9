//! Mass-conserving transfers between spheres.
//!
//! Every move of material from one sphere to another goes through
//! [`MaterialTransferLedger::transfer`], which saturates at what the source
//! holds, settles the arriving phase, and checks that the two spheres hold
//! the same combined mass afterwards.

use crate::config::LedgerConfig;
use crate::error::{Result, TerraSimError, check_amount};
use crate::material::MaterialPhase;
use crate::material_catalog::MaterialCatalog;
use crate::spheres::{MaterialSphere, SphereKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub substance: String,
    pub mass_kg: f64,
    pub from: SphereKind,
    pub to: SphereKind,
    pub phase: MaterialPhase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTransferLedger {
    #[serde(skip)]
    settings: LedgerConfig,
    #[serde(skip)]
    journal: VecDeque<TransferRecord>,
    /// Mass brought in from outside the body, per substance.
    external_added: BTreeMap<String, f64>,
    /// Mass taken off the body, per substance.
    external_removed: BTreeMap<String, f64>,
}

impl MaterialTransferLedger {
    pub fn new(settings: LedgerConfig) -> Self {
        MaterialTransferLedger {
            settings,
            ..Default::default()
        }
    }

    pub fn configure(&mut self, settings: &LedgerConfig) {
        self.settings = settings.clone();
        while self.journal.len() > self.settings.journal_capacity {
            self.journal.pop_front();
        }
    }

    /// Moves up to `amount_kg` of `substance` from one sphere to another and
    /// returns the mass actually moved.
    ///
    /// Nothing moves when the source is empty or the request is not a
    /// positive number. A destination that cannot hold the substance fails
    /// with `UnknownMaterial` before anything is withdrawn.
    pub fn transfer(
        &mut self,
        catalog: &MaterialCatalog,
        substance: &str,
        amount_kg: f64,
        from: &mut dyn MaterialSphere,
        to: &mut dyn MaterialSphere,
    ) -> Result<f64> {
        let substance = catalog.canonical_name(substance).unwrap_or(substance);
        if !(amount_kg.is_finite() && amount_kg > 0.0) {
            return Ok(0.0);
        }
        let available = from.available(substance);
        if available <= 0.0 {
            return Ok(0.0);
        }
        to.validate_deposit(catalog, substance)?;

        let before = available + to.available(substance);
        let withdrawal = from.withdraw(substance, amount_kg.min(available));
        if withdrawal.mass_kg <= 0.0 {
            return Ok(0.0);
        }

        let phase = if to.kind() == SphereKind::Atmosphere {
            MaterialPhase::Gas
        } else if let Some(determiner) = to.phase_determiner() {
            determiner.determine_phase(catalog, substance)
        } else {
            withdrawal.phase
        };

        if let Err(err) = to.deposit(catalog, substance, withdrawal.mass_kg, phase) {
            from.deposit(catalog, substance, withdrawal.mass_kg, withdrawal.phase)?;
            return Err(err);
        }

        let after = from.available(substance) + to.available(substance);
        let tolerance = self.settings.relative_epsilon * before.abs().max(1.0);
        if (after - before).abs() > tolerance {
            tracing::error!(
                substance,
                from = from.kind().as_str(),
                to = to.kind().as_str(),
                expected = before,
                actual = after,
                "transfer did not conserve mass"
            );
            return Err(TerraSimError::InvariantViolation {
                substance: substance.to_string(),
                expected: before,
                actual: after,
            });
        }

        tracing::trace!(
            substance,
            mass_kg = withdrawal.mass_kg,
            from = from.kind().as_str(),
            to = to.kind().as_str(),
            "transfer"
        );
        self.log(TransferRecord {
            substance: substance.to_string(),
            mass_kg: withdrawal.mass_kg,
            from: from.kind(),
            to: to.kind(),
            phase,
        });
        Ok(withdrawal.mass_kg)
    }

    fn log(&mut self, record: TransferRecord) {
        if self.settings.journal_capacity == 0 {
            return;
        }
        if self.journal.len() >= self.settings.journal_capacity {
            self.journal.pop_front();
        }
        self.journal.push_back(record);
    }

    pub fn journal(&self) -> impl Iterator<Item = &TransferRecord> {
        self.journal.iter()
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    pub fn record_addition(&mut self, substance: &str, mass_kg: f64) -> Result<()> {
        check_amount(substance, mass_kg)?;
        *self.external_added.entry(substance.to_string()).or_insert(0.0) += mass_kg;
        Ok(())
    }

    pub fn record_removal(&mut self, substance: &str, mass_kg: f64) -> Result<()> {
        check_amount(substance, mass_kg)?;
        *self.external_removed.entry(substance.to_string()).or_insert(0.0) += mass_kg;
        Ok(())
    }

    /// Mass added from outside minus mass taken off the body.
    pub fn net_external(&self, substance: &str) -> f64 {
        let added = self.external_added.get(substance).copied().unwrap_or(0.0);
        let removed = self.external_removed.get(substance).copied().unwrap_or(0.0);
        added - removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Location, SubstanceQuantity};
    use crate::spheres::{Atmosphere, Biosphere, Geosphere, Hydrosphere, ReservoirView, VolatileReservoir, Withdrawal};
    use approx::assert_abs_diff_eq;
    use std::sync::{Arc, Mutex};

    fn ledger() -> MaterialTransferLedger {
        MaterialTransferLedger::new(LedgerConfig::default())
    }

    /// A store that keeps only half of every deposit.
    #[derive(Default)]
    struct LeakySphere {
        held: BTreeMap<String, f64>,
    }

    impl MaterialSphere for LeakySphere {
        fn kind(&self) -> SphereKind {
            SphereKind::Biosphere
        }

        fn available(&self, substance: &str) -> f64 {
            self.held.get(substance).copied().unwrap_or(0.0)
        }

        fn withdraw(&mut self, substance: &str, mass_kg: f64) -> Withdrawal {
            let held = self.held.entry(substance.to_string()).or_insert(0.0);
            let taken = mass_kg.min(*held);
            *held -= taken;
            Withdrawal {
                mass_kg: taken,
                phase: MaterialPhase::Solid,
            }
        }

        fn validate_deposit(&self, catalog: &MaterialCatalog, substance: &str) -> Result<()> {
            catalog.require(substance).map(|_| ())
        }

        fn deposit(
            &mut self,
            _catalog: &MaterialCatalog,
            substance: &str,
            mass_kg: f64,
            _phase: MaterialPhase,
        ) -> Result<()> {
            *self.held.entry(substance.to_string()).or_insert(0.0) += mass_kg / 2.0;
            Ok(())
        }

        fn quantities(&self) -> Vec<SubstanceQuantity> {
            self.held
                .iter()
                .map(|(name, mass)| SubstanceQuantity::new(name, *mass, MaterialPhase::Solid, Location::Surface))
                .collect()
        }

        fn is_dirty(&self) -> bool {
            false
        }

        fn clear_dirty(&mut self) {}
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lost_mass_is_an_invariant_violation() {
        println!("🧪 A destination that loses half of every deposit");
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 290.0);
        let mut leaky = LeakySphere::default();
        atmo.add_gas(&catalog, "CO2", 100.0).unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let outcome = tracing::subscriber::with_default(subscriber, || {
            ledger.transfer(&catalog, "CO2", 50.0, &mut atmo, &mut leaky)
        });

        let err = outcome.unwrap_err();
        println!("   Error: {}", err);
        assert!(err.is_fatal());
        match err {
            TerraSimError::InvariantViolation { substance, expected, actual } => {
                assert_eq!(substance, "CO2");
                assert_abs_diff_eq!(expected, 100.0);
                assert_abs_diff_eq!(actual, 75.0);
            }
            other => panic!("expected an invariant violation, got {other:?}"),
        }
        assert_eq!(ledger.journal().count(), 0, "failed transfers are not journaled");

        let output = String::from_utf8_lossy(&log.0.lock().unwrap()).to_string();
        assert!(output.contains("ERROR"), "no error event in: {output}");
        assert!(output.contains("transfer did not conserve mass"));
        println!("   ✅ Violation returned and logged at error level");
    }

    #[test]
    fn test_geosphere_keeps_liquid_arrivals() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 300.0);
        let mut geo = Geosphere::new(300.0);
        atmo.add_gas(&catalog, "H2O", 10.0).unwrap();

        ledger.transfer(&catalog, "water", 10.0, &mut atmo, &mut geo).unwrap();

        assert_eq!(ledger.journal().last().unwrap().phase, MaterialPhase::Liquid);
        let held = geo.quantities();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].phase, MaterialPhase::Liquid);
        assert_abs_diff_eq!(held[0].mass_kg, 10.0);
        assert_abs_diff_eq!(geo.surface_liquid("H2O"), 10.0);
    }

    #[test]
    fn test_reservoir_arrivals_are_solid() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 300.0);
        let mut geo = Geosphere::new(300.0);
        atmo.add_gas(&catalog, "H2O", 10.0).unwrap();

        let mut caps = ReservoirView::new(&mut geo, VolatileReservoir::PolarCaps);
        ledger.transfer(&catalog, "H2O", 6.0, &mut atmo, &mut caps).unwrap();

        assert_eq!(ledger.journal().last().unwrap().phase, MaterialPhase::Solid);
        assert_abs_diff_eq!(geo.stored_volatile("H2O", VolatileReservoir::PolarCaps), 6.0);
        assert!(geo.surface_liquids().is_empty());
    }

    #[test]
    fn test_transfer_saturates_at_source() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut hydro = Hydrosphere::new(290.0);
        let mut atmo = Atmosphere::new(1000.0, 10.0, 290.0);
        hydro.add_liquid(&catalog, "H2O", 30.0).unwrap();

        let moved = ledger
            .transfer(&catalog, "H2O", 100.0, &mut hydro, &mut atmo)
            .unwrap();

        assert_abs_diff_eq!(moved, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hydro.total_water_mass_kg(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(atmo.gas_mass("H2O"), 30.0, epsilon = 1e-9);
        assert_eq!(ledger.journal().count(), 1);
    }

    #[test]
    fn test_empty_source_is_noop() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut hydro = Hydrosphere::new(290.0);
        let mut atmo = Atmosphere::new(1000.0, 10.0, 290.0);

        let moved = ledger
            .transfer(&catalog, "H2O", 10.0, &mut hydro, &mut atmo)
            .unwrap();
        assert_abs_diff_eq!(moved, 0.0);
        assert!(!atmo.is_dirty());
        assert_eq!(ledger.journal().count(), 0);
    }

    #[test]
    fn test_bad_requests_move_nothing() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 290.0);
        let mut bio = Biosphere::new();
        atmo.add_gas(&catalog, "CO2", 10.0).unwrap();

        for amount in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
            let moved = ledger.transfer(&catalog, "CO2", amount, &mut atmo, &mut bio).unwrap();
            assert_abs_diff_eq!(moved, 0.0);
        }
        assert_abs_diff_eq!(atmo.gas_mass("CO2"), 10.0);
    }

    #[test]
    fn test_atmosphere_destination_makes_gas() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut geo = Geosphere::new(150.0);
        let mut atmo = Atmosphere::new(1000.0, 10.0, 150.0);
        geo.add_volatile(&catalog, "N2", VolatileReservoir::SurfaceIce, 40.0).unwrap();

        let mut ice = ReservoirView::new(&mut geo, VolatileReservoir::SurfaceIce);
        ledger.transfer(&catalog, "nitrogen", 15.0, &mut ice, &mut atmo).unwrap();

        let record = ledger.journal().last().unwrap();
        assert_eq!(record.phase, MaterialPhase::Gas);
        assert_eq!(record.substance, "N2");
        assert_eq!(record.from, SphereKind::Geosphere);
        assert_abs_diff_eq!(atmo.gas_mass("N2"), 15.0);
        assert_abs_diff_eq!(geo.stored_volatile("N2", VolatileReservoir::SurfaceIce), 25.0);
    }

    #[test]
    fn test_destination_decides_phase() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 250.0);
        let mut hydro = Hydrosphere::new(250.0);
        atmo.add_gas(&catalog, "H2O", 20.0).unwrap();

        ledger.transfer(&catalog, "H2O", 20.0, &mut atmo, &mut hydro).unwrap();

        assert_eq!(ledger.journal().last().unwrap().phase, MaterialPhase::Solid);
        assert_abs_diff_eq!(hydro.ice_kg(), 20.0);
        assert!(atmo.gas("H2O").is_none());
    }

    #[test]
    fn test_source_phase_kept_without_determiner() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut hydro = Hydrosphere::new(290.0);
        let mut bio = Biosphere::new();
        hydro.add_liquid(&catalog, "H2O", 10.0).unwrap();

        ledger.transfer(&catalog, "H2O", 4.0, &mut hydro, &mut bio).unwrap();

        assert_eq!(ledger.journal().last().unwrap().phase, MaterialPhase::Liquid);
        assert_eq!(bio.quantities()[0].phase, MaterialPhase::Liquid);
    }

    #[test]
    fn test_unknown_destination_material_moves_nothing() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = ledger();
        let mut geo: Geosphere = serde_json::from_value(serde_json::json!({
            "surface_temperature_k": 250.0,
            "layers": {},
            "crust_composition": {},
            "geological_activity": 0.0,
            "tectonic_activity": false,
            "stored_volatiles": { "Xe": { "surface_ice": 12.0 } },
            "regolith_depth_m": null
        }))
        .unwrap();
        let mut atmo = Atmosphere::new(1000.0, 10.0, 250.0);

        let mut ice = ReservoirView::new(&mut geo, VolatileReservoir::SurfaceIce);
        let err = ledger.transfer(&catalog, "Xe", 5.0, &mut ice, &mut atmo).unwrap_err();

        assert!(matches!(err, TerraSimError::UnknownMaterial(_)));
        assert_abs_diff_eq!(geo.stored_volatile("Xe", VolatileReservoir::SurfaceIce), 12.0);
        assert!(atmo.gases().is_empty());
    }

    #[test]
    fn test_journal_is_bounded() {
        let catalog = MaterialCatalog::standard();
        let mut ledger = MaterialTransferLedger::new(LedgerConfig {
            journal_capacity: 2,
            ..LedgerConfig::default()
        });
        let mut atmo = Atmosphere::new(1000.0, 10.0, 290.0);
        let mut bio = Biosphere::new();
        atmo.add_gas(&catalog, "O2", 10.0).unwrap();

        for _ in 0..5 {
            ledger.transfer(&catalog, "O2", 1.0, &mut atmo, &mut bio).unwrap();
        }
        assert_eq!(ledger.journal().count(), 2);
        assert_abs_diff_eq!(bio.material_mass("O2"), 5.0);
    }

    #[test]
    fn test_external_tallies() {
        let mut ledger = ledger();
        ledger.record_addition("CO2", 100.0).unwrap();
        ledger.record_removal("CO2", 30.0).unwrap();
        assert_abs_diff_eq!(ledger.net_external("CO2"), 70.0);
        assert_abs_diff_eq!(ledger.net_external("N2"), 0.0);
        assert!(ledger.record_addition("CO2", -1.0).is_err());
    }
}
