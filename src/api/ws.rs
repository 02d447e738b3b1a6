// src/api/ws.rs
//! WebSocket glue for the streaming loops.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, Sink, SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::watch;

use super::AppState;
use crate::error::{SentinelError, SentinelResult};
use crate::stream::{PushSink, StreamContext, StreamKind, StreamLoop};

/// Write half of a socket. Closing twice is a no-op.
pub struct WsSink<Tx = SplitSink<WebSocket, Message>> {
    tx: Tx,
    closed: bool,
}

impl<Tx> WsSink<Tx> {
    pub fn new(tx: Tx) -> Self {
        Self { tx, closed: false }
    }
}

#[async_trait::async_trait]
impl<Tx> PushSink for WsSink<Tx>
where
    Tx: Sink<Message> + Unpin + Send,
{
    async fn push(&mut self, frame: &Value) -> SentinelResult<()> {
        if self.closed {
            return Err(SentinelError::ConnectionClosed);
        }
        self.tx
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|_| SentinelError::ConnectionClosed)
    }

    async fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        let _ = self.tx.send(Message::Close(None)).await;
        let _ = self.tx.close().await;
    }
}

/// Runs one stream on an upgraded socket. Inbound frames are drained so the
/// peer's close (or a read error) cancels the loop.
pub async fn serve(socket: WebSocket, ctx: StreamContext, kind: StreamKind) {
    let (tx, mut rx) = socket.split();
    let (stop_tx, stop_rx) = watch::channel(false);

    let reader = tokio::spawn(async move {
        while let Some(msg) = rx.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
        let _ = stop_tx.send(true);
    });

    let report = StreamLoop::new(ctx, kind, WsSink::new(tx)).run(stop_rx).await;
    reader.abort();
    tracing::debug!(stream = kind.as_str(), ?report, "websocket finished");
}

pub async fn signals(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let ctx = state.stream_context();
    ws.on_upgrade(move |socket| serve(socket, ctx, StreamKind::Signals))
}

pub async fn insights(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let ctx = state.stream_context();
    ws.on_upgrade(move |socket| serve(socket, ctx, StreamKind::Insights))
}
