//! SSE streaming adapter.
//!
//! `GET /sessions/{id}/events` subscribes to the shared broadcast emitter,
//! forwards only the requested session's frames, and closes the stream
//! after the terminal frame. A lagged subscriber skips the dropped frames
//! and keeps reading; it never stalls the session runner.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use metrics::counter;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use strand_core::events::StrandEvent;
use strand_runtime::EventEmitter;

use crate::state::AppState;

/// Handle `GET /sessions/{id}/events`.
pub async fn session_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    counter!("sse_connections_total").increment(1);
    let stream = session_stream(state.emitter(), session_id);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Frames for one session, ending after its terminal frame.
fn session_stream(
    emitter: &Arc<EventEmitter>,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut rx = emitter.subscribe();
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(frame) if frame.base().session_id == session_id => {
                    let terminal = frame.is_terminal();
                    yield Ok(to_sse_event(&frame));
                    if terminal {
                        debug!(session_id, "terminal frame sent, closing stream");
                        break;
                    }
                }
                // Frame for another session.
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    counter!("sse_lagged_frames_total").increment(skipped);
                    warn!(session_id, skipped, "subscriber lagged, frames dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Serialize one frame as an SSE event named by its type tag.
fn to_sse_event(frame: &StrandEvent) -> Event {
    let event = Event::default().event(frame.event_type());
    match serde_json::to_string(frame) {
        Ok(json) => event.data(json),
        // StrandEvent serialization is infallible in practice; keep the
        // stream alive if it ever is not.
        Err(err) => {
            warn!(%err, "frame serialization failed");
            event.data("{}")
        }
    }
}
