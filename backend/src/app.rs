// Application state shared by the HTTP surface and the replay task.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::time::Instant;

use race_core::config::EngineConfig;
use race_core::model::WeatherSnapshot;
use race_core::results::ResultsFeed;

use crate::loader::Dataset;

#[derive(Clone)]
pub struct AppState {
    pub tx: broadcast::Sender<String>,
    pub sequence: Arc<AtomicU64>,
    pub start_instant: Instant,
    pub engine_config: EngineConfig,
    pub dataset: Arc<Option<Dataset>>,
    pub weather: Arc<Vec<WeatherSnapshot>>,
    pub results: Arc<Option<ResultsFeed>>,
    pub replay_state: Arc<Mutex<ReplayState>>,
    pub replay_active: Arc<AtomicBool>,
    pub replay_sequence: Arc<AtomicU64>,
}

impl AppState {
    pub fn replay_mode(&self) -> &'static str {
        if self.dataset.is_some() {
            "recorded"
        } else {
            "synthetic"
        }
    }
}

/// Registry entry for the single shared replay session. Start is
/// idempotent; websocket subscribers only attach to the broadcast
/// channel and never spawn loops of their own.
#[derive(Default)]
pub struct ReplayState {
    pub active: bool,
    pub session_id: u64,
    pub cancel: Option<oneshot::Sender<()>>,
}
