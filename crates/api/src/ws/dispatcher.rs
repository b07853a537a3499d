use axum::extract::ws::Message;
use futures::SinkExt;
use tracing::{debug, warn};

use super::session::{ChannelKey, ChannelRegistry, WsSender};

async fn send_all(senders: Vec<WsSender>, message: &serde_json::Value) {
    let text = serde_json::to_string(message).unwrap_or_default();

    for sender in senders {
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text.clone())).await {
            warn!(%e, "Failed to send WS message");
        } else {
            debug!("WS message sent");
        }
    }
}

/// Delivers a JSON event to every subscriber of a channel.
pub async fn broadcast(
    registry: &ChannelRegistry,
    key: &ChannelKey,
    message: &serde_json::Value,
) {
    send_all(registry.subscribers(key, None), message).await;
}

/// Delivers to every subscriber except the originating connection. The
/// originator learns the outcome from its ack instead.
pub async fn broadcast_except(
    registry: &ChannelRegistry,
    key: &ChannelKey,
    except_connection_id: &str,
    message: &serde_json::Value,
) {
    send_all(
        registry.subscribers(key, Some(except_connection_id)),
        message,
    )
    .await;
}

/// Delivers to one connection only.
pub async fn send_to_connection(
    registry: &ChannelRegistry,
    connection_id: &str,
    message: &serde_json::Value,
) {
    if let Some(sender) = registry.sender(connection_id) {
        send_all(vec![sender], message).await;
    }
}
