// Core replay and analytics engine for the pitwall server.

pub mod alerts;
pub mod buffers;
pub mod config;
pub mod laps;
pub mod model;
pub mod normalize;
pub mod results;
pub mod sectors;
pub mod session;
pub mod stats;
pub mod synth;
pub mod tires;
pub mod track;
pub mod weather;
