//! Detection feed receiver
//!
//! Receives one JSON packet per perception frame over UDP:
//!
//! ```json
//! {"detections":[{"id":7,"kind":"person","position":[0.1,1.5,-1.2],"moving":true}]}
//! ```
//!
//! Missing or `null` coordinates become NaN so the tracker can drop that
//! detection without losing the rest of the frame.

use std::net::SocketAddr;

use serde::Deserialize;
use tokio::net::UdpSocket;

use crate::config::FeedConfig;
use crate::error::{GazerError, TrackingError};
use crate::tracking::detection::{Detection, ObjectKind, Vec3};

/// A single JSON packet from the perception pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPacket {
    #[serde(default)]
    pub detections: Vec<FeedDetection>,
}

/// One detection as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDetection {
    pub id: u32,
    pub kind: ObjectKind,
    #[serde(default)]
    pub position: [Option<f32>; 3],
    #[serde(default)]
    pub moving: bool,
}

impl From<FeedDetection> for Detection {
    fn from(d: FeedDetection) -> Self {
        let [x, y, z] = d.position.map(|c| c.unwrap_or(f32::NAN));
        Detection {
            id: d.id,
            kind: d.kind,
            position: Vec3::new(x, y, z),
            moving: d.moving,
        }
    }
}

/// Parse one feed datagram into this frame's detections
pub fn parse_packet(bytes: &[u8]) -> Result<Vec<Detection>, TrackingError> {
    let packet: FeedPacket = serde_json::from_slice(bytes)
        .map_err(|e| TrackingError::FeedParse(format!("JSON parse error: {}", e)))?;
    Ok(packet.detections.into_iter().map(Detection::from).collect())
}

/// Detection feed JSON-over-UDP receiver
pub struct FeedReceiver {
    config: FeedConfig,
    socket: Option<UdpSocket>,
}

impl FeedReceiver {
    /// Create a new feed receiver (does not bind yet)
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            config: config.clone(),
            socket: None,
        }
    }

    /// Bind the UDP socket and start receiving
    pub fn start(&mut self) -> Result<(), GazerError> {
        let addr = format!("{}:{}", self.config.listen_address, self.config.port);

        let socket = std::net::UdpSocket::bind(&addr).map_err(|e| {
            TrackingError::FeedReceiver(format!("Failed to bind to {}: {}", addr, e))
        })?;
        socket.set_nonblocking(true).map_err(|e| {
            TrackingError::FeedReceiver(format!("Failed to set non-blocking: {}", e))
        })?;
        let socket = UdpSocket::from_std(socket).map_err(|e| {
            TrackingError::FeedReceiver(format!("Failed to register socket: {}", e))
        })?;

        tracing::info!("Detection feed listening on {}", addr);
        self.socket = Some(socket);

        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Wait for the next frame of detections. Returns `Ok(None)` when not started.
    pub async fn process(&self) -> Result<Option<Vec<Detection>>, GazerError> {
        let socket = match &self.socket {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut buf = [0u8; 65536];
        let size = socket
            .recv(&mut buf)
            .await
            .map_err(|e| TrackingError::FeedReceiver(format!("Receive error: {}", e)))?;

        Ok(Some(parse_packet(&buf[..size])?))
    }

    /// Stop the receiver
    pub fn stop(&mut self) {
        self.socket = None;
        tracing::info!("Detection feed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_packet() {
        let json = serde_json::json!({
            "detections": [
                {"id": 7, "kind": "person", "position": [0.1, 1.5, -1.2], "moving": true},
                {"id": 2, "kind": "object", "position": [0.0, 0.4, -0.8]}
            ]
        })
        .to_string();

        let detections = parse_packet(json.as_bytes()).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(
            detections[0],
            Detection::person(7, Vec3::new(0.1, 1.5, -1.2), true)
        );
        assert_eq!(detections[1].kind, ObjectKind::Object);
        assert!(!detections[1].moving);
    }

    #[test]
    fn test_null_coordinate_kept_as_nan() {
        let json = r#"{"detections":[{"id":1,"kind":"person","position":[null,1.0,-2.0],"moving":true}]}"#;
        let detections = parse_packet(json.as_bytes()).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(detections[0].position.x.is_nan());
        assert!(!detections[0].position.is_finite());
    }

    #[test]
    fn test_empty_frame() {
        assert!(parse_packet(br#"{"detections":[]}"#).unwrap().is_empty());
        assert!(parse_packet(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_packet() {
        assert!(matches!(
            parse_packet(b"not json"),
            Err(TrackingError::FeedParse(_))
        ));
        assert!(parse_packet(br#"{"detections":[{"id":1,"kind":"dog"}]}"#).is_err());
    }

    #[tokio::test]
    async fn test_receive_frame() {
        let mut receiver = FeedReceiver::new(&FeedConfig {
            enabled: true,
            listen_address: "127.0.0.1".to_string(),
            port: 0,
        });
        receiver.start().unwrap();
        let addr = receiver.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let json = r#"{"detections":[{"id":3,"kind":"person","position":[0,0,-1],"moving":false}]}"#;
        client.send_to(json.as_bytes(), addr).await.unwrap();

        let detections = receiver.process().await.unwrap().unwrap();
        assert_eq!(detections, vec![Detection::person(3, Vec3::new(0.0, 0.0, -1.0), false)]);

        receiver.stop();
        assert!(receiver.process().await.unwrap().is_none());
    }
}
