// Field resolution for sparse upstream channels.
// Each logical field consults an ordered fallback list of source names and
// degrades to a carry-over of the previous resolved value, never to a gap.

use crate::model::{RawRecord, Sample};
use crate::track::{FALLBACK_LAT, FALLBACK_LONG};

const SPEED_SOURCES: &[&str] = &["speed", "Speed", "SPEED", "speed_kmh", "speed_mps"];
const RPM_SOURCES: &[&str] = &["RPM", "nmot"];
const GEAR_SOURCES: &[&str] = &["Gear", "gear"];
const THROTTLE_SOURCES: &[&str] = &["Throttle", "aps"];
const BRAKE_SOURCES: &[&str] = &["Brake", "brake_pressure"];
const LAT_G_SOURCES: &[&str] = &["accx_can", "lat_g"];
const LONG_G_SOURCES: &[&str] = &["accy_can", "long_g"];
const LAT_SOURCES: &[&str] = &["VBOX_Lat_Min", "GPS_Lat"];
const LONG_SOURCES: &[&str] = &["VBOX_Long_Minutes", "GPS_Long"];

const SPEED_SMOOTH_NEW: f64 = 0.97;
const RPM_SMOOTH_NEW: f64 = 0.95;

pub struct Normalizer {
    brake_pressure_full: f64,
    last_speed: f64,
    last_rpm: f64,
    last_position: Option<(f64, f64)>,
}

impl Normalizer {
    pub fn new(brake_pressure_full: f64) -> Self {
        Self {
            brake_pressure_full,
            last_speed: 0.0,
            last_rpm: 0.0,
            last_position: None,
        }
    }

    pub fn reset(&mut self) {
        self.last_speed = 0.0;
        self.last_rpm = 0.0;
        self.last_position = None;
    }

    /// Resolve a raw record into a fully defaulted sample. Never fails:
    /// absent or non-finite channels resolve to carry-over values.
    pub fn normalize(&mut self, record: &RawRecord) -> Sample {
        let rpm_hint = finite(record.first_channel(RPM_SOURCES)).unwrap_or(0.0);

        let mut raw_speed = finite(record.first_channel(SPEED_SOURCES)).unwrap_or(0.0);
        if raw_speed <= 0.0 && self.last_speed > 5.0 {
            raw_speed = self.last_speed;
        }
        if raw_speed <= 0.0 && rpm_hint > 500.0 {
            raw_speed = (rpm_hint / 80.0).max(8.0);
        }
        let speed = if self.last_speed <= 0.0 {
            raw_speed
        } else {
            SPEED_SMOOTH_NEW * raw_speed + (1.0 - SPEED_SMOOTH_NEW) * self.last_speed
        };
        self.last_speed = speed.max(0.0);

        let mut raw_rpm = rpm_hint;
        if raw_rpm <= 100.0 && self.last_rpm > 0.0 {
            raw_rpm = self.last_rpm;
        }
        let rpm = if self.last_rpm <= 0.0 {
            raw_rpm
        } else {
            RPM_SMOOTH_NEW * raw_rpm + (1.0 - RPM_SMOOTH_NEW) * self.last_rpm
        };
        self.last_rpm = rpm.max(0.0);

        let brake = self.resolve_brake(record);
        let throttle = finite(record.first_channel(THROTTLE_SOURCES))
            .unwrap_or(0.0)
            .max(0.0);
        let gear = finite(record.first_channel(GEAR_SOURCES)).unwrap_or(0.0) as i32;
        let g_lat = finite(record.first_channel(LAT_G_SOURCES)).unwrap_or(0.0);
        let g_long = finite(record.first_channel(LONG_G_SOURCES)).unwrap_or(0.0);

        let (carry_lat, carry_long) = self.last_position.unwrap_or((FALLBACK_LAT, FALLBACK_LONG));
        let lat = finite(record.first_channel(LAT_SOURCES)).unwrap_or(carry_lat);
        let long = finite(record.first_channel(LONG_SOURCES)).unwrap_or(carry_long);
        self.last_position = Some((lat, long));

        Sample {
            timestamp: record.timestamp.clone(),
            t: record.t.filter(|t| t.is_finite()),
            speed,
            rpm,
            gear,
            throttle,
            brake,
            g_lat,
            g_long,
            lat,
            long,
            lap_index: record.lap,
        }
    }

    // Sources above 100 are raw pressure; rescale against the configured
    // full-scale value.
    fn resolve_brake(&self, record: &RawRecord) -> f64 {
        let raw = finite(record.first_channel(BRAKE_SOURCES)).unwrap_or(0.0);
        if raw > 100.0 {
            (raw / self.brake_pressure_full * 100.0).min(100.0)
        } else {
            raw.max(0.0)
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
