//! REST API endpoints

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::animation::{AnimationSnapshot, EyeFrame};
use crate::output::sse;
use crate::transport::token;
use crate::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    pub fn error(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        })
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
        })
    }
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub buckets: u32,
    pub transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationSnapshot>,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatusResponse>> {
    let (buckets, transport) = {
        let config = state.config.read().await;
        (
            config.encoder.num_divisions,
            format!("{}:{}", config.transport.host, config.transport.port),
        )
    };

    let animation = match state.animation().await {
        Some(handle) => handle.snapshot().await.ok(),
        None => None,
    };

    ApiResponse::success(StatusResponse {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        buckets,
        transport,
        animation,
    })
}

/// Frame currently on the display
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub frame: EyeFrame,
    pub asset: String,
    pub candidates: Vec<String>,
    pub display_on: bool,
}

pub async fn get_frame(State(state): State<Arc<AppState>>) -> Json<ApiResponse<FrameResponse>> {
    let Some(handle) = state.animation().await else {
        return ApiResponse::error("Animation is not running");
    };

    match handle.snapshot().await {
        Ok(snapshot) => ApiResponse::success(FrameResponse {
            frame: snapshot.displayed,
            asset: snapshot.displayed.asset_key(),
            candidates: snapshot.displayed.asset_candidates(),
            display_on: snapshot.display_on,
        }),
        Err(e) => ApiResponse::error(&e.to_string()),
    }
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(config.clone())
}

/// Single named setting, same names as the settings listener
#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub variable: String,
    pub value: f64,
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Json<ApiResponse<()>> {
    match state.apply_setting(&update.variable, update.value).await {
        Ok(()) => ApiResponse::ok(),
        Err(e) => ApiResponse::error(&e.to_string()),
    }
}

/// Write the running configuration to disk
pub async fn save_config(State(state): State<Arc<AppState>>) -> Json<ApiResponse<String>> {
    match state.save_config().await {
        Ok(path) => ApiResponse::success(path.display().to_string()),
        Err(e) => ApiResponse::error(&e.to_string()),
    }
}

/// Blink request; `code` is a gaze code stem such as `bt_20_cs`
#[derive(Debug, Default, Deserialize)]
pub struct BlinkRequest {
    #[serde(default)]
    pub code: Option<String>,
}

pub async fn blink(
    State(state): State<Arc<AppState>>,
    request: Option<Json<BlinkRequest>>,
) -> Json<ApiResponse<bool>> {
    let Some(handle) = state.animation().await else {
        return ApiResponse::error("Animation is not running");
    };

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let target = match request.code.as_deref() {
        Some(stem) => match token::parse_code(stem) {
            Some(code) => Some(code),
            None => return ApiResponse::error(&format!("Invalid gaze code '{}'", stem)),
        },
        None => None,
    };

    match handle.blink(target).await {
        Ok(started) => ApiResponse::success(started),
        Err(e) => ApiResponse::error(&e.to_string()),
    }
}

/// SSE stream of rendered frames
pub async fn frame_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_frame_stream(state)
}
