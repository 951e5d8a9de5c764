// Engine tuning constants. Every field is externally settable by the host.

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Replay cadence in milliseconds.
    pub tick_ms: u64,
    /// Geofence crossing radius around the start/finish point, meters.
    pub geofence_enter_m: f64,
    /// Radius the car must leave before another crossing can arm, meters.
    pub geofence_exit_m: f64,
    /// Minimum wall-clock gap between two geofence crossings, seconds.
    pub crossing_debounce_s: f64,
    /// Acceptance radius for the nearest-marker sector fallback, meters.
    pub sector_fallback_m: f64,
    /// Bounded lap-time history window.
    pub lap_history_window: usize,
    /// Number of most recent laps feeding the consistency metric.
    pub consistency_window: usize,
    /// Completed laps excluded from official statistics at session start.
    pub warmup_laps: u32,
    /// A new top speed must beat the previous one by this margin, km/h.
    pub top_speed_margin_kph: f64,
    /// Weather snapshot replacement threshold, degrees C.
    pub weather_delta_c: f64,
    /// Synthetic-mode lap interval, seconds.
    pub synthetic_lap_s: f64,
    /// Brake channel full-scale pressure mapped to 100%.
    pub brake_pressure_full: f64,
    /// Speed below which a stop episode can begin, km/h.
    pub pit_speed_kph: f64,
    /// Dwell below the pit speed before a stop counts, seconds.
    pub pit_dwell_s: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            geofence_enter_m: 15.0,
            geofence_exit_m: 25.0,
            crossing_debounce_s: 5.0,
            sector_fallback_m: 300.0,
            lap_history_window: 120,
            consistency_window: 5,
            warmup_laps: 1,
            top_speed_margin_kph: 0.5,
            weather_delta_c: 1.0,
            synthetic_lap_s: 90.0,
            brake_pressure_full: 1500.0,
            pit_speed_kph: 10.0,
            pit_dwell_s: 3.0,
        }
    }
}

impl EngineConfig {
    /// With an authoritative results feed the first two laps are treated as
    /// warm-up instead of one.
    pub fn with_results_feed(mut self) -> Self {
        self.warmup_laps = self.warmup_laps.max(2);
        self
    }
}
