// Replay and analytics server for the pitwall dashboard.

use std::env;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{info, warn};

use race_core::config::EngineConfig;

use pitwall_server::app::{AppState, ReplayState};
use pitwall_server::constants::{
    BROADCAST_CHANNEL_CAP, DEFAULT_CAR_ID, DEFAULT_HTTP_PORT, MAX_TELEMETRY_ROWS, RESULTS_FILE,
    WEATHER_FILE,
};
use pitwall_server::http;
use pitwall_server::loader;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bind = env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_HTTP_PORT);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .expect("invalid HTTP_BIND or HTTP_PORT");

    let hero_car = env::var("PITWALL_CAR_ID").unwrap_or_else(|_| DEFAULT_CAR_ID.to_string());
    let engine_config = engine_config_from_env();

    let data_dir = loader::resolve_data_dir();
    info!(data_dir = %data_dir.display(), "starting pitwall server");

    let dataset = match loader::find_telemetry_file(&data_dir) {
        Some(path) => {
            info!(path = %path.display(), "loading telemetry");
            match loader::load_dataset(&path, &hero_car, MAX_TELEMETRY_ROWS) {
                Ok(dataset) => Some(dataset),
                Err(err) => {
                    warn!(?err, "telemetry load failed; swapping to synthetic mode");
                    None
                }
            }
        }
        None => {
            warn!("telemetry file not found; swapping to synthetic mode");
            None
        }
    };

    let weather_path = data_dir.join(WEATHER_FILE);
    let weather = if weather_path.is_file() {
        match loader::load_weather(&weather_path) {
            Ok(rows) => {
                info!(rows = rows.len(), "weather feed loaded");
                rows
            }
            Err(err) => {
                warn!(?err, "weather load failed; continuing without weather feed");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let results_path = data_dir.join(RESULTS_FILE);
    let results = if results_path.is_file() {
        match loader::load_results(&results_path) {
            Ok(feed) if !feed.is_empty() => {
                info!("results feed loaded");
                Some(feed)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(?err, "results load failed; continuing without results feed");
                None
            }
        }
    } else {
        None
    };

    let (tx, _) = broadcast::channel::<String>(BROADCAST_CHANNEL_CAP);
    let app_state = AppState {
        tx,
        sequence: Arc::new(AtomicU64::new(0)),
        start_instant: Instant::now(),
        engine_config,
        dataset: Arc::new(dataset),
        weather: Arc::new(weather),
        results: Arc::new(results),
        replay_state: Arc::new(Mutex::new(ReplayState::default())),
        replay_active: Arc::new(AtomicBool::new(false)),
        replay_sequence: Arc::new(AtomicU64::new(0)),
    };

    let app = http::router(app_state);

    info!(%addr, "serving");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("server failed");
}

fn engine_config_from_env() -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(value) = env_u64("PITWALL_TICK_MS") {
        config.tick_ms = value;
    }
    if let Some(value) = env_f64("PITWALL_GEOFENCE_ENTER_M") {
        config.geofence_enter_m = value;
    }
    if let Some(value) = env_f64("PITWALL_GEOFENCE_EXIT_M") {
        config.geofence_exit_m = value;
    }
    if let Some(value) = env_f64("PITWALL_CROSSING_DEBOUNCE_S") {
        config.crossing_debounce_s = value;
    }
    if let Some(value) = env_f64("PITWALL_SECTOR_FALLBACK_M") {
        config.sector_fallback_m = value;
    }
    if let Some(value) = env_u64("PITWALL_LAP_HISTORY") {
        config.lap_history_window = value as usize;
    }
    if let Some(value) = env_u64("PITWALL_CONSISTENCY_WINDOW") {
        config.consistency_window = value as usize;
    }
    if let Some(value) = env_u64("PITWALL_WARMUP_LAPS") {
        config.warmup_laps = value as u32;
    }
    if let Some(value) = env_f64("PITWALL_TOP_SPEED_MARGIN") {
        config.top_speed_margin_kph = value;
    }
    if let Some(value) = env_f64("PITWALL_WEATHER_DELTA_C") {
        config.weather_delta_c = value;
    }
    if let Some(value) = env_f64("PITWALL_SYNTHETIC_LAP_S") {
        config.synthetic_lap_s = value;
    }
    if let Some(value) = env_f64("PITWALL_BRAKE_PRESSURE_FULL") {
        config.brake_pressure_full = value;
    }
    config
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
