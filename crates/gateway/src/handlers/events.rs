//! Server-sent change feed
//!
//! Streams [`LeadEvent`]s as they are published. A client that falls behind
//! skips what it missed and gets a `lagged` event carrying the count.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use leadbook_common::LeadEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Subscribe to change events
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    tracing::debug!(subscribers = state.events.subscriber_count(), "Event subscriber connected");

    let live = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(event) => Some((Ok(to_sse(&event)), rx)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "SSE subscriber lagged, events dropped");
                let event = Event::default().event("lagged").data(missed.to_string());
                Some((Ok(event), rx))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    });

    Sse::new(live).keep_alive(KeepAlive::default().interval(KEEP_ALIVE_INTERVAL))
}

fn to_sse(event: &LeadEvent) -> Event {
    Event::default()
        .event(event.kind())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().comment("serialization error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_named_after_kind() {
        let event = to_sse(&LeadEvent::CategoryDeleted { category_id: 3 });
        let rendered = format!("{:?}", event);
        assert!(rendered.contains("category-deleted"));
    }
}
