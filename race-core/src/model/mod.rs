// Core data models for raw records, normalized samples, and wire output.

mod insights;
mod packet;
mod sample;

pub use insights::{LapRecord, SectorBest, SessionInsights};
pub use packet::{Alert, AlertSeverity, Packet, WeatherSnapshot};
pub use sample::{RawRecord, Sample};
