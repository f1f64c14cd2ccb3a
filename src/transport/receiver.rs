//! UDP receiver for gaze tokens

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::config::TransportConfig;
use crate::error::{GazerError, TransportError};
use crate::gaze::code::GazeUpdate;
use crate::transport::token;

/// Receives gaze tokens from the tracking process
pub struct TokenReceiver {
    config: TransportConfig,
    socket: Option<UdpSocket>,
}

impl TokenReceiver {
    /// Create a new receiver (does not bind yet)
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            config: config.clone(),
            socket: None,
        }
    }

    /// Bind the UDP socket. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), GazerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let socket = std::net::UdpSocket::bind(&addr)
            .map_err(|e| TransportError::Bind(format!("Failed to bind to {}: {}", addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::Bind(format!("Failed to set non-blocking: {}", e)))?;
        let socket = UdpSocket::from_std(socket)
            .map_err(|e| TransportError::Bind(format!("Failed to register socket: {}", e)))?;

        tracing::info!("Gaze token receiver listening on {}", addr);
        self.socket = Some(socket);
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Wait for the next token. Returns `Ok(None)` when not started.
    pub async fn process(&self) -> Result<Option<GazeUpdate>, GazerError> {
        let socket = match &self.socket {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut buf = [0u8; 1024];
        let size = socket
            .recv(&mut buf)
            .await
            .map_err(|e| TransportError::Receive(format!("Receive error: {}", e)))?;

        let text = String::from_utf8_lossy(&buf[..size]);
        let update = token::decode(&text)?;
        Ok(Some(update))
    }

    /// Stop the receiver
    pub fn stop(&mut self) {
        self.socket = None;
        tracing::info!("Gaze token receiver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::code::{GazeCode, YClass, ZClass};
    use crate::transport::sender::TokenSender;

    #[tokio::test]
    async fn test_send_and_receive() {
        let mut receiver = TokenReceiver::new(&TransportConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        });
        receiver.start().unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sender = TokenSender::bind(&TransportConfig {
            host: "127.0.0.1".to_string(),
            port,
        })
        .await
        .unwrap();

        let update = GazeUpdate::new(GazeCode::new(17, YClass::Down, ZClass::Far), true);
        sender.send(&update).await.unwrap();

        let received = receiver.process().await.unwrap();
        assert_eq!(received, Some(update));
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_an_error() {
        let mut receiver = TokenReceiver::new(&TransportConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        });
        receiver.start().unwrap();
        let addr = receiver.local_addr().unwrap();

        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        raw.send_to(b"not a token", addr).await.unwrap();

        let err = receiver.process().await.unwrap_err();
        assert!(matches!(
            err,
            GazerError::Transport(TransportError::MalformedToken { .. })
        ));

        // Invalid UTF-8 in a legacy-shaped token is rejected, and the receiver keeps going
        raw.send_to(b"bt_1_\xff|new", addr).await.unwrap();
        let err = receiver.process().await.unwrap_err();
        assert!(matches!(
            err,
            GazerError::Transport(TransportError::MalformedToken { .. })
        ));

        raw.send_to(b"v1|bt_4_cs|old", addr).await.unwrap();
        assert!(receiver.process().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unstarted_receiver_yields_nothing() {
        let receiver = TokenReceiver::new(&TransportConfig::default());
        assert!(receiver.process().await.unwrap().is_none());
    }
}
