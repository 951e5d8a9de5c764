// The replay scheduler: one background task per active session, driving
// the engine at the tick cadence and broadcasting the results.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;
use tracing::info;

use race_core::session::{ReplaySession, TickInput};
use race_core::track::TrackConfig;

use crate::app::AppState;
use crate::constants::{SCHEMA_VERSION, TOTAL_LAPS_FLOOR};
use crate::utils::{monotonic_ms, monotonic_secs, next_sequence, now_epoch_ms};
use crate::ws::{SessionInsightsMessage, TelemetryUpdateMessage};

pub async fn replay_loop(app_state: AppState, mut cancel: oneshot::Receiver<()>) {
    let fallback_track = TrackConfig::fallback();
    let (track, first_lap, total_laps) = match app_state.dataset.as_ref() {
        Some(dataset) => (&dataset.track, dataset.first_lap, dataset.total_laps),
        None => (&fallback_track, 1, TOTAL_LAPS_FLOOR),
    };

    let mut session = ReplaySession::new(
        app_state.engine_config.clone(),
        track,
        app_state.weather.as_ref().clone(),
        app_state.results.as_ref().clone(),
        first_lap,
        total_laps,
    );

    let mut cursor = 0usize;
    let mut interval = time::interval(Duration::from_millis(app_state.engine_config.tick_ms));
    info!(mode = app_state.replay_mode(), "replay session started");

    loop {
        tokio::select! {
            _ = &mut cancel => {
                info!("replay session cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let now_s = monotonic_secs(app_state.start_instant);
        let output = match app_state.dataset.as_ref() {
            Some(dataset) if !dataset.records.is_empty() => {
                let record = &dataset.records[cursor];
                let wrapped = cursor + 1 >= dataset.records.len();
                cursor = if wrapped { 0 } else { cursor + 1 };
                session.tick(TickInput::Recorded { record, wrapped }, now_s)
            }
            _ => session.tick(TickInput::Synthetic, now_s),
        };

        let update = TelemetryUpdateMessage {
            schema_version: SCHEMA_VERSION,
            timestamp_ms: now_epoch_ms(),
            monotonic_ms: monotonic_ms(app_state.start_instant),
            sequence: next_sequence(app_state.sequence.as_ref()),
            message_type: "telemetry_update",
            packet: output.packet,
        };
        if let Ok(payload) = serde_json::to_string(&update) {
            let _ = app_state.tx.send(payload);
        }

        if let Some(insights) = output.insights {
            let message = SessionInsightsMessage {
                schema_version: SCHEMA_VERSION,
                timestamp_ms: now_epoch_ms(),
                monotonic_ms: monotonic_ms(app_state.start_instant),
                sequence: next_sequence(app_state.sequence.as_ref()),
                message_type: "session_insights",
                insights,
            };
            if let Ok(payload) = serde_json::to_string(&message) {
                let _ = app_state.tx.send(payload);
            }
        }
    }
}
