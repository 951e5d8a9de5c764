// HTTP response payload types.

use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub active: bool,
    pub session_id: u64,
    pub mode: &'static str,
}
