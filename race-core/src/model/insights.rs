// Session-summary snapshot streamed when any aggregate changes.

use serde::Serialize;

use crate::track::Sector;

/// One entry of the bounded lap-time history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapRecord {
    pub lap: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    /// Authoritative duration from the results feed, when it overrode the
    /// locally timed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_s: Option<f64>,
    pub provisional: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SectorBest {
    pub sector: Sector,
    pub duration_s: f64,
    pub lap: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionInsights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_lap_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_lap_s: Option<f64>,
    /// Standard deviation of the most recent completed laps; absent until
    /// at least two are in the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_vs_best_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed_kph: Option<f64>,
    pub pit_count: u32,
    pub laps: Vec<LapRecord>,
    pub best_sectors: Vec<SectorBest>,
}
