//! Server-Sent Events for rendered eye frames

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::animation::AnimationEvent;
use crate::AppState;

/// Create an SSE stream of frames and display power changes
pub fn create_frame_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_events();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(animation_event(&event))),
        Err(e) => {
            // A slow renderer only misses intermediate frames
            tracing::debug!("Frame stream lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert an animation event to an SSE event
pub fn animation_event(event: &AnimationEvent) -> Event {
    let name = match event {
        AnimationEvent::Frame { .. } => "frame",
        AnimationEvent::DisplayPower { .. } => "display",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

    Event::default().event(name).data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{EyeFrame, FrameSource};
    use crate::gaze::GazeCode;

    #[test]
    fn test_frame_event_payload() {
        let frame = EyeFrame::open(GazeCode::centered(41), FrameSource::Live);
        let event = AnimationEvent::Frame {
            frame,
            asset: frame.asset_key(),
            candidates: frame.asset_candidates(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["asset"], "bt_20_cso.jpg");
    }

    #[test]
    fn test_display_event_payload() {
        let json = serde_json::to_value(AnimationEvent::DisplayPower { on: false }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "display_power", "on": false}));
    }
}
