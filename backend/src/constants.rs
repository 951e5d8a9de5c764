// Shared constants for server timing, protocol, and data paths.

pub const SCHEMA_VERSION: &str = "1.0";
pub const BROADCAST_CHANNEL_CAP: usize = 256;
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_CAR_ID: &str = "GR86-002-000";
pub const TELEMETRY_FILE_PREFIX: &str = "telemetry_";
pub const WEATHER_FILE: &str = "weather_r1.CSV";
pub const RESULTS_FILE: &str = "results_r1.csv";
pub const MAX_TELEMETRY_ROWS: usize = 50_000;
pub const TOTAL_LAPS_FLOOR: u32 = 22;
