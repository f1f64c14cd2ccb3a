//! Live settings listener
//!
//! Control panels push one setting per UDP datagram:
//!
//! ```json
//! {"category":"backend","variable":"blink_speed","value":2.5}
//! {"command":"save"}
//! ```
//!
//! `category` is accepted for compatibility and otherwise ignored. Boolean
//! values are read as 1.0 / 0.0.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use tokio::net::UdpSocket;

use crate::config::SettingsConfig;
use crate::error::{ConfigError, GazerError};
use crate::AppState;

/// A single settings datagram
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsMessage {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub command: Option<String>,
}

/// What a datagram asks for
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsRequest {
    Set { variable: String, value: f64 },
    Save,
}

/// Parse one datagram
pub fn parse_message(bytes: &[u8]) -> Result<SettingsRequest, ConfigError> {
    let msg: SettingsMessage =
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if let Some(command) = msg.command {
        return match command.as_str() {
            "save" => Ok(SettingsRequest::Save),
            other => Err(ConfigError::UnknownSetting(format!("command {}", other))),
        };
    }

    let variable = msg
        .variable
        .ok_or_else(|| ConfigError::invalid("variable", "Missing setting name"))?;
    let value = match msg.value {
        Some(serde_json::Value::Bool(b)) => f64::from(u8::from(b)),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ConfigError::invalid(&variable, "Value out of range"))?,
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(&variable, "Value is not a number"))?,
        _ => return Err(ConfigError::invalid(&variable, "Missing numeric value")),
    };

    Ok(SettingsRequest::Set { variable, value })
}

/// UDP listener applying settings to the shared configuration
pub struct SettingsListener {
    config: SettingsConfig,
    socket: Option<UdpSocket>,
}

impl SettingsListener {
    pub fn new(config: &SettingsConfig) -> Self {
        Self {
            config: config.clone(),
            socket: None,
        }
    }

    /// Bind the UDP socket
    pub fn start(&mut self) -> Result<(), GazerError> {
        let addr = format!("{}:{}", self.config.listen_address, self.config.port);

        let socket = std::net::UdpSocket::bind(&addr)
            .map_err(|e| ConfigError::Listener(format!("Failed to bind to {}: {}", addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ConfigError::Listener(format!("Failed to set non-blocking: {}", e)))?;
        let socket = UdpSocket::from_std(socket)
            .map_err(|e| ConfigError::Listener(format!("Failed to register socket: {}", e)))?;

        tracing::info!("Settings listener on {}", addr);
        self.socket = Some(socket);
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Wait for one datagram and apply it. Returns `Ok(None)` when not
    /// started; rejected settings come back as errors and change nothing.
    pub async fn process(&self, state: &AppState) -> Result<Option<SettingsRequest>, GazerError> {
        let socket = match &self.socket {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut buf = [0u8; 1024];
        let size = socket
            .recv(&mut buf)
            .await
            .map_err(|e| ConfigError::Listener(format!("Receive error: {}", e)))?;
        let request = parse_message(&buf[..size])?;

        match &request {
            SettingsRequest::Set { variable, value } => {
                state.apply_setting(variable, *value).await?;
            }
            SettingsRequest::Save => {
                state.save_config().await?;
            }
        }

        Ok(Some(request))
    }

    pub fn stop(&mut self) {
        self.socket = None;
        tracing::info!("Settings listener stopped");
    }
}

/// Run the listener until shutdown
pub async fn run_settings_listener(state: Arc<AppState>, config: SettingsConfig) -> Result<(), GazerError> {
    let mut listener = SettingsListener::new(&config);
    listener.start()?;

    let mut shutdown_rx = state.subscribe_shutdown();
    loop {
        tokio::select! {
            result = listener.process(&state) => {
                if let Err(e) = result {
                    tracing::warn!("Settings update rejected: {}", e);
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    listener.stop();
    Ok(())
}
