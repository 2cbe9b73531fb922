use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::event::DeliveryEvent;
use crate::models::request::DeliveryStatus;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
enum EventFilter {
    /// All transitions of a single request (restaurant/driver tracking view).
    Request(Uuid),
    /// Newly created pending requests (driver board).
    Pending,
}

impl EventFilter {
    fn matches(&self, event: &DeliveryEvent) -> bool {
        match self {
            EventFilter::Request(id) => event.request_id == *id,
            EventFilter::Pending => event.status == DeliveryStatus::Pending,
        }
    }
}

pub async fn request_events(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, state, EventFilter::Request(id)))
}

pub async fn pending_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_events(socket, state, EventFilter::Pending))
}

async fn stream_events(socket: WebSocket, state: Arc<AppState>, filter: EventFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.delivery_events_tx.subscribe());

    info!(?filter, "delivery event subscriber connected");

    let send_task = tokio::spawn(async move {
        while let Some(result) = events.next().await {
            let event = match result {
                Ok(event) => event,
                // A lagged subscriber skips missed events and carries on.
                Err(_lagged) => continue,
            };

            if !filter.matches(&event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize delivery event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    // The subscription ends with the socket; dropping the stream unsubscribes.
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("delivery event subscriber disconnected");
}
