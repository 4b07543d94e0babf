//! SSE streaming of task progress events.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use verbatim_core::ProgressEvent;

use crate::metrics::SSE_CONNECTIONS_TOTAL;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StreamErrorResponse {
    pub error: String,
}

fn sse_event(event: &ProgressEvent) -> Event {
    Event::default()
        .event("progress")
        .data(serde_json::to_string(event).unwrap_or_default())
}

/// Stream progress events for a task, terminated by one terminal event.
///
/// The subscription is taken before the snapshot so no committed update can
/// fall between them. A subscriber attaching after the task is already
/// terminal receives exactly one synthetic event reflecting the persisted
/// terminal record. A state observed both by the snapshot and as a queued
/// event may be emitted twice; duplicates are harmless because progress
/// only moves forward.
pub async fn stream_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<KeepAliveStream<BoxStream<'static, Result<Event, Infallible>>>>, impl IntoResponse> {
    let rx = state.progress_bus().subscribe(&id);

    let task = match state.task_store().get(&id) {
        Ok(Some(task)) => task,
        Ok(None) => {
            drop(rx);
            state.progress_bus().prune(&id);
            return Err((
                StatusCode::NOT_FOUND,
                Json(StreamErrorResponse {
                    error: format!("Task not found: {}", id),
                }),
            ));
        }
        Err(e) => {
            drop(rx);
            state.progress_bus().prune(&id);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StreamErrorResponse {
                    error: e.to_string(),
                }),
            ));
        }
    };

    SSE_CONNECTIONS_TOTAL.inc();
    debug!(task_id = %id, "SSE stream opened");

    let initial = ProgressEvent::from_task(&task, None);

    let stream: BoxStream<'static, Result<Event, Infallible>> = if initial.is_terminal() {
        // Late subscriber: one synthetic terminal event, then end
        drop(rx);
        state.progress_bus().prune(&id);
        stream::once(async move { Ok(sse_event(&initial)) }).boxed()
    } else {
        // Current snapshot first, then live events until the bus closes the
        // channel on the terminal event
        let follow = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
        stream::once(async move { Ok(sse_event(&initial)) })
            .chain(follow)
            .boxed()
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
