//! SSE framing for session streams.
//!
//! Each [`StreamEvent`] becomes one SSE message whose `event:` field is the
//! event name (`meta`, `text-delta`, `audio-chunk`, ...) and whose `data:`
//! field is the JSON-encoded event.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use voxflow_core::StreamEvent;

/// Interval between keep-alive comments on an idle stream.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Encode a stream event as an SSE message.
pub fn to_sse_event(event: &StreamEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_name()).data(json)),
        Err(e) => {
            tracing::warn!(target: "voxflow.http", "Failed to serialize stream event: {}", e);
            None
        }
    }
}

/// Turn a session's event channel into an SSE response.
///
/// The response ends when the orchestrator drops its sender. Dropping the
/// response (client disconnect) closes the channel, which the orchestrator
/// observes and tears the session down.
pub fn session_stream(
    receiver: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let stream = ReceiverStream::new(receiver)
        .filter_map(|event| to_sse_event(&event))
        .map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping"))
}
