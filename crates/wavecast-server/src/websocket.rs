//! `WebSocket` transport glue: drives one socket from upgrade to close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::histogram;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::ClientConnection;
use crate::handlers::ConnectionHandler;
use crate::metrics::CONNECTION_DURATION_SECONDS;

/// Run a `WebSocket` session for a connected client.
///
/// 1. Spawns a writer task draining the connection's outbound queue
/// 2. Notifies `handler` of the open
/// 3. Dispatches inbound text (and UTF-8 binary) frames as messages
/// 4. On socket end or `cancel`, aborts the writer and notifies the close
///
/// The close notification runs exactly once, whichever way the socket ends.
pub async fn run_socket(
    ws: WebSocket,
    handler: Arc<dyn ConnectionHandler>,
    signal: &'static str,
    queue_capacity: usize,
    cancel: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (connection, mut send_rx) = ClientConnection::channel(queue_capacity);
    let id = connection.id.clone();
    let mode = handler.mode().as_str();

    let writer = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(text.as_ref().into())).await.is_err() {
                break;
            }
        }
    });

    handler.on_open(connection.clone()).await;

    let reason = loop {
        let msg = tokio::select! {
            () = cancel.cancelled() => break "server shutting down".to_string(),
            msg = ws_rx.next() => msg,
        };
        let text = match msg {
            Some(Ok(Message::Text(t))) => t.to_string(),
            Some(Ok(Message::Binary(data))) => {
                if let Ok(s) = std::str::from_utf8(&data) {
                    s.to_string()
                } else {
                    debug!(connection_id = %id, len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                break frame.map(|f| f.reason.to_string()).unwrap_or_default();
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Err(e)) => break format!("socket error: {e}"),
            None => break String::new(),
        };
        handler.on_message(&id, &text).await;
    };

    writer.abort();
    handler.on_close(&id, &reason).await;
    histogram!(CONNECTION_DURATION_SECONDS, "signal" => signal, "mode" => mode)
        .record(connection.age().as_secs_f64());
    info!(connection_id = %id, signal, mode, dropped = connection.drop_count(), "socket closed");
}
