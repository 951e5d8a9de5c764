// WebSocket transport for telemetry streaming.
// Subscribers attach to the shared broadcast channel; they never own or
// start a replay loop.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use race_core::model::{Packet, SessionInsights};
use race_core::track::{GeoPoint, GpsBounds};

use crate::app::AppState;
use crate::constants::SCHEMA_VERSION;
use crate::utils::{monotonic_ms, next_sequence, now_epoch_ms};

#[derive(Serialize)]
pub struct TrackInitMessage {
    pub schema_version: &'static str,
    pub timestamp_ms: u64,
    pub monotonic_ms: u64,
    pub sequence: u64,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub shape: Vec<GeoPoint>,
    pub bounds: GpsBounds,
    pub start: GeoPoint,
}

#[derive(Serialize)]
pub struct TelemetryUpdateMessage {
    pub schema_version: &'static str,
    pub timestamp_ms: u64,
    pub monotonic_ms: u64,
    pub sequence: u64,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub packet: Packet,
}

#[derive(Serialize)]
pub struct SessionInsightsMessage {
    pub schema_version: &'static str,
    pub timestamp_ms: u64,
    pub monotonic_ms: u64,
    pub sequence: u64,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub insights: SessionInsights,
}

pub fn track_init_message(app_state: &AppState) -> TrackInitMessage {
    let track = match app_state.dataset.as_ref() {
        Some(dataset) => dataset.track.clone(),
        None => race_core::track::TrackConfig::fallback(),
    };
    TrackInitMessage {
        schema_version: SCHEMA_VERSION,
        timestamp_ms: now_epoch_ms(),
        monotonic_ms: monotonic_ms(app_state.start_instant),
        sequence: next_sequence(app_state.sequence.as_ref()),
        message_type: "track_init",
        shape: track.shape,
        bounds: track.bounds,
        start: track.start,
    }
}

pub async fn ws_handler(
    AxumState(app_state): AxumState<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(mut socket: WebSocket, app_state: AppState) {
    info!("ws connected");
    let mut rx = app_state.tx.subscribe();

    let hello = track_init_message(&app_state);
    if let Ok(payload) = serde_json::to_string(&hello) {
        if socket.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Ok(payload) => {
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        continue;
                    }
                    Err(_) => break,
                }
            }
            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(?err, "ws error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }
    info!("ws disconnected");
}
