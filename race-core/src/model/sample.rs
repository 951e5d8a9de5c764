// Raw wide-format dataset rows and the normalized per-tick sample.

use std::collections::HashMap;

/// One wide row of the pivoted dataset: a timestamp plus whatever channel
/// columns survived upstream reshaping, keyed by their source names.
#[derive(Clone, Debug, Default)]
pub struct RawRecord {
    /// Timestamp parsed as seconds, when the source column was numeric.
    pub t: Option<f64>,
    /// Source timestamp text, kept verbatim for display.
    pub timestamp: String,
    /// Categorical lap index carried by the dataset, when present.
    pub lap: Option<u32>,
    pub channels: HashMap<String, f64>,
}

impl RawRecord {
    pub fn channel(&self, name: &str) -> Option<f64> {
        self.channels.get(name).copied()
    }

    /// First present channel from an ordered fallback list.
    pub fn first_channel(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| self.channel(name))
    }
}

/// One normalized tick of input. Immutable once produced by the normalizer;
/// every field is finite and defaulted.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: String,
    pub t: Option<f64>,
    pub speed: f64,
    pub rpm: f64,
    pub gear: i32,
    pub throttle: f64,
    pub brake: f64,
    pub g_lat: f64,
    pub g_long: f64,
    pub lat: f64,
    pub long: f64,
    pub lap_index: Option<u32>,
}
