use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use log::{info, warn};

use crate::provider::{ProviderError, Telephony};
use crate::types::{HealthResponse, ServerResponse};

pub struct AppState {
    pub provider: Arc<dyn Telephony>,
    pub login_url: String,
    pub api_key: String,
}

/// Turns a provider result into the JSON the dialer pages expect.
fn respond(state: &AppState, result: Result<(), ProviderError>, done: &str) -> ServerResponse {
    match result {
        Ok(()) => ServerResponse::succeeded(done),
        Err(e) => {
            warn!("{} failed: {}", e.step(), e);
            let mut response = ServerResponse::failed(e.to_string(), e.step().to_string());
            if e.login_needed() {
                response.rc_login_needed = true;
                response.redirect = Some(state.login_url.clone());
            }
            response
        }
    }
}

pub async fn dial_number(
    State(state): State<Arc<AppState>>,
    Path(to_number): Path<String>,
) -> Json<ServerResponse> {
    info!("Dial request for {}", to_number);
    let result = state.provider.ring_out(&to_number).await;
    Json(respond(&state, result, "Call in progress"))
}

pub async fn send_sms_message(
    State(state): State<Arc<AppState>>,
    Path((to_number, message)): Path<(String, String)>,
) -> Json<ServerResponse> {
    info!("SMS request for {} ({} chars)", to_number, message.chars().count());
    let result = state.provider.send_sms(&to_number, &message).await;
    Json(respond(&state, result, "Message sent"))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
