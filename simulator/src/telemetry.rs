use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Reading sent by the device on every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub vibration: f64,
    pub battery_level: f64,
    pub timestamp: String,
}

pub const TEMPERATURE: Range<f64> = 28.0..38.0; // °C
pub const HUMIDITY: Range<f64> = 45.0..75.0; // %
pub const PRESSURE: Range<f64> = 980.0..1020.0; // hPa
pub const VIBRATION: Range<f64> = 0.2..6.0; // mm/s
pub const BATTERY_LEVEL: Range<f64> = 70.0..100.0; // %

/// Random value in `range`, rounded to `decimals` places, or floored to a
/// whole number when `decimals` is 0.
pub fn in_range(rng: &mut impl Rng, range: Range<f64>, decimals: u32) -> f64 {
    let value = rng.gen_range(range);
    if decimals == 0 {
        value.floor()
    } else {
        let scale = 10f64.powi(decimals as i32);
        (value * scale).round() / scale
    }
}

pub fn generate(rng: &mut impl Rng, device_id: &str) -> Telemetry {
    Telemetry {
        device_id: device_id.to_string(),
        temperature: in_range(rng, TEMPERATURE, 0),
        humidity: in_range(rng, HUMIDITY, 0),
        pressure: in_range(rng, PRESSURE, 0),
        vibration: in_range(rng, VIBRATION, 2),
        battery_level: in_range(rng, BATTERY_LEVEL, 0),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
