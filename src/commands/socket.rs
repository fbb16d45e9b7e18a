use super::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

/// Upgrade to a live suggestion feed
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push every published suggestion to one client until either side goes away.
/// Inbound frames carry no meaning; reading them only detects disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut subscription = state.broadcaster.subscribe();
    let id = subscription.id;
    tracing::debug!("[Socket] Client {} connected", id);

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            if ws_sender
                .send(Message::Text(message.as_ref().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!("[Socket] Receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.broadcaster.unsubscribe(id);
    tracing::debug!("[Socket] Client {} disconnected", id);
}
