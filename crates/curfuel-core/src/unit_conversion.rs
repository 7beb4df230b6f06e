//! Unit Conversion Functions
//!
//! Volume conversions used when turning a tank volume into a log reading:
//! - Cubic meters ↔ Liters
//! - Liters ↔ US Gallons

/// US gallons per liter
pub const LITRE_GALLON_FACTOR: f64 = 0.264172052;

/// Liters per cubic meter
pub const LITRES_PER_CUBIC_METER: f64 = 1000.0;

/// Convert cubic meters to liters
pub fn cubic_meters_to_liters(m3: f64) -> f64 {
    m3 * LITRES_PER_CUBIC_METER
}

/// Convert liters to cubic meters
pub fn liters_to_cubic_meters(liters: f64) -> f64 {
    liters / LITRES_PER_CUBIC_METER
}

/// Convert liters to US gallons
pub fn liters_to_gallons(liters: f64) -> f64 {
    liters * LITRE_GALLON_FACTOR
}

/// Convert US gallons to liters
pub fn gallons_to_liters(gallons: f64) -> f64 {
    gallons / LITRE_GALLON_FACTOR
}

/// Convert cubic meters straight to US gallons
pub fn cubic_meters_to_gallons(m3: f64) -> f64 {
    liters_to_gallons(cubic_meters_to_liters(m3))
}
