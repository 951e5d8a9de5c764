// Per-tick wire output handed to the transport layer.

use serde::Serialize;

use crate::tires::TireSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warn,
    Success,
}

/// One coaching or status alert. Produced fresh each tick, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub msg: String,
    #[serde(rename = "type")]
    pub severity: AlertSeverity,
}

impl Alert {
    pub fn new(msg: impl Into<String>, severity: AlertSeverity) -> Self {
        Self {
            msg: msg.into(),
            severity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temp_c: f64,
    pub track_temp_c: f64,
    pub humidity: u32,
    pub wind_kph: f64,
    pub wind_dir: f64,
    pub rain: u8,
}

impl Default for WeatherSnapshot {
    // Paddock defaults used when no weather feed is loaded.
    fn default() -> Self {
        Self {
            temp_c: 28.0,
            track_temp_c: 32.0,
            humidity: 55,
            wind_kph: 8.0,
            wind_dir: 0.0,
            rain: 0,
        }
    }
}

/// The per-tick packet. Every numeric field is finite and defaulted so
/// consumers never branch on absence.
#[derive(Clone, Debug, Serialize)]
pub struct Packet {
    pub timestamp: String,
    pub speed: f64,
    pub rpm: f64,
    pub gear: i32,
    pub throttle: f64,
    pub brake: f64,
    pub g_lat: f64,
    pub g_long: f64,
    pub lat: f64,
    pub long: f64,
    pub tire_health: f64,
    pub tire_healths: TireSet,
    pub lap: u32,
    pub total_laps: u32,
    pub weather: WeatherSnapshot,
    pub alerts: Vec<Alert>,
    pub coaching_tip: Option<String>,
}
