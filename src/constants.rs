pub const TO_KELVIN: f64 = 273.15;
pub const STEFAN_BOLTZMANN_W_M2_K4: f64 = 5.670374419e-8;

// Water freezing point at one bar
pub const WATER_FREEZING_K: f64 = 273.15;

// Substances boiling below this are stored as ices rather than crust minerals
pub const VOLATILE_BOILING_CUTOFF_K: f64 = 400.0;

pub const M_PER_KM: f64 = 1000.0;

// Reference bodies
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const EARTH_SURFACE_GRAVITY_M_S2: f64 = 9.807;
pub const EARTH_MASS_KG: f64 = 5.972e24;
pub const EARTH_BOND_ALBEDO: f64 = 0.306;
pub const SOLAR_CONSTANT_W_M2: f64 = 1361.0;

pub const MARS_RADIUS_M: f64 = 3_389_500.0;
pub const MARS_SURFACE_GRAVITY_M_S2: f64 = 3.721;
pub const MARS_MASS_KG: f64 = 6.417e23;
pub const MARS_BOND_ALBEDO: f64 = 0.25;
pub const MARS_INSOLATION_W_M2: f64 = 586.2;
