//! Best-effort UDP sender for gaze tokens

use tokio::net::UdpSocket;

use crate::config::TransportConfig;
use crate::error::{GazerError, TransportError};
use crate::gaze::code::GazeUpdate;
use crate::transport::token;

/// Sends gaze tokens to the animation process
pub struct TokenSender {
    socket: UdpSocket,
    target: String,
}

impl TokenSender {
    /// Bind an ephemeral local socket aimed at the configured host and port
    pub async fn bind(config: &TransportConfig) -> Result<Self, GazerError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| TransportError::Bind(format!("ephemeral sender socket: {}", e)))?;
        let target = format!("{}:{}", config.host, config.port);

        tracing::info!("Gaze tokens will be sent to {}", target);
        Ok(Self { socket, target })
    }

    /// Send one token. Delivery is at-most-once.
    pub async fn send(&self, update: &GazeUpdate) -> Result<(), GazerError> {
        let token = token::encode(update);
        self.socket
            .send_to(token.as_bytes(), &self.target)
            .await
            .map_err(|e| TransportError::Send(format!("{} -> {}: {}", token, self.target, e)))?;
        tracing::trace!("Sent {}", token);
        Ok(())
    }
}
