// HTTP handlers and routing.

use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::atomic::Ordering;
use tracing::info;

use crate::app::AppState;
use crate::tasks::replay_loop;
use crate::utils::next_sequence;
use crate::ws::{track_init_message, ws_handler};

mod types;
use types::*;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session_status))
        .route("/session/start", axum::routing::post(start_session))
        .route("/session/stop", axum::routing::post(stop_session))
        .route("/track", get(get_track))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn get_session_status(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    let state = app_state.replay_state.lock().await;
    Json(SessionStatusResponse {
        active: state.active,
        session_id: state.session_id,
        mode: app_state.replay_mode(),
    })
}

/// Idempotent start of the single shared replay session. A second start
/// request while one is active returns the running session instead of
/// spawning another loop.
async fn start_session(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    let mut state = app_state.replay_state.lock().await;
    if state.active {
        info!(session_id = state.session_id, "replay session already active");
        return Json(SessionStatusResponse {
            active: true,
            session_id: state.session_id,
            mode: app_state.replay_mode(),
        });
    }

    let session_id = next_sequence(app_state.replay_sequence.as_ref());
    let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel();
    state.active = true;
    state.session_id = session_id;
    state.cancel = Some(cancel_tx);
    drop(state);

    app_state.replay_active.store(true, Ordering::Relaxed);

    let task_state = app_state.clone();
    let replay_state = app_state.replay_state.clone();
    let replay_active = app_state.replay_active.clone();
    tokio::spawn(async move {
        replay_loop(task_state, cancel_rx).await;
        replay_active.store(false, Ordering::Relaxed);
        let mut state = replay_state.lock().await;
        state.active = false;
        state.cancel = None;
    });

    info!(session_id, "replay session started");
    Json(SessionStatusResponse {
        active: true,
        session_id,
        mode: app_state.replay_mode(),
    })
}

async fn stop_session(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    let mut state = app_state.replay_state.lock().await;
    if let Some(cancel) = state.cancel.take() {
        let _ = cancel.send(());
    }
    let session_id = state.session_id;
    state.active = false;
    app_state.replay_active.store(false, Ordering::Relaxed);
    info!(session_id, "replay session stopped");
    Json(SessionStatusResponse {
        active: false,
        session_id,
        mode: app_state.replay_mode(),
    })
}

async fn get_track(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    Json(track_init_message(&app_state))
}
