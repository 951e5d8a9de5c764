// Synthetic waveform generator for sessions with no dataset loaded.

use crate::model::Sample;
use crate::track::{FALLBACK_LAT, FALLBACK_LONG};

/// Plausible sinusoidal sample at `elapsed_s` of session time. Pure:
/// the same elapsed time always produces the same sample.
pub fn synthetic_sample(elapsed_s: f64) -> Sample {
    let phase = elapsed_s.sin();
    Sample {
        timestamp: format_clock(elapsed_s),
        t: Some(elapsed_s),
        speed: 140.0 + 40.0 * phase,
        rpm: 5000.0 + 1500.0 * phase,
        gear: 4,
        throttle: 80.0,
        brake: 0.0,
        g_lat: phase,
        g_long: elapsed_s.cos(),
        lat: FALLBACK_LAT,
        long: FALLBACK_LONG,
        lap_index: None,
    }
}

fn format_clock(elapsed_s: f64) -> String {
    let total = elapsed_s.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
