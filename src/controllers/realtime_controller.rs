use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};

use crate::{
    services::broadcast_hub::{SendError, Subscriber},
    AppState,
};

const PING_EVERY: Duration = Duration::from_secs(25);

/// Write half of a client socket, registered with the hub.
pub struct WsSubscriber {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    closed: AtomicBool,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    async fn send(&self, msg: Message) -> Result<(), SendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SendError("connection closed".to_string()));
        }
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| SendError(e.to_string()))
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    async fn send_text(&self, text: String) -> Result<(), SendError> {
        self.send(Message::Text(text)).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sink.lock().await.close().await;
    }
}

// GET /ws
pub async fn ws_portfolio(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_portfolio_socket(socket, state))
}

async fn handle_portfolio_socket(socket: WebSocket, state: AppState) {
    let (sink, mut inbound) = socket.split();
    let subscriber = Arc::new(WsSubscriber::new(sink));
    let id = state.hub.join(subscriber.clone());

    tracing::info!("WS client connected: id={} live={}", id, state.hub.len());

    // catch-up push so the client has data before the next broadcast
    match state.pipeline.build_snapshot().await {
        Ok(snapshot) => {
            state.hub.send_to(id, &snapshot).await;
        }
        Err(e) => tracing::warn!("initial snapshot for subscriber {} failed: {}", id, e),
    }

    let mut ping = interval(PING_EVERY);
    ping.tick().await;

    // inbound frames are only read to notice the client going away
    loop {
        tokio::select! {
            _ = ping.tick() => {
                if subscriber.send(Message::Ping(b"ping".to_vec())).await.is_err() {
                    break;
                }
            }

            client_msg = inbound.next() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.leave(id).await;
    tracing::info!("WS client disconnected: id={} live={}", id, state.hub.len());
}
