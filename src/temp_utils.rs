//! Temperature conversions and radiative-balance helpers.

use crate::constants::{M_PER_KM, STEFAN_BOLTZMANN_W_M2_K4, TO_KELVIN};

/// Converts Celsius to Kelvin.
pub fn celsius_to_kelvin(temp_c: f64) -> f64 {
    temp_c + TO_KELVIN
}

/// Converts Kelvin to Celsius.
pub fn kelvin_to_celsius(temp_k: f64) -> f64 {
    temp_k - TO_KELVIN
}

/// Radiative equilibrium temperature of a body.
///
/// # Arguments
/// - `insolation_w_m2`: stellar flux at the body's orbit
/// - `albedo`: bond albedo, 0..1
///
/// # Returns
/// `((1 - albedo) * S / (4 * sigma))^(1/4)` in Kelvin
pub fn effective_temperature_k(insolation_w_m2: f64, albedo: f64) -> f64 {
    let absorbed = (1.0 - albedo.clamp(0.0, 1.0)) * insolation_w_m2.max(0.0);
    (absorbed / (4.0 * STEFAN_BOLTZMANN_W_M2_K4)).powf(0.25)
}

/// Linear lapse-rate cooling. Negative elevations warm by the same rate.
pub fn lapse_adjusted_k(temp_k: f64, elevation_m: f64, lapse_rate_k_per_km: f64) -> f64 {
    temp_k - lapse_rate_k_per_km * elevation_m / M_PER_KM
}
