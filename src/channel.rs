use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsFrame;

use crate::error::ApiError;
use crate::state::Message;

/// One event on the live channel, in both directions.
///
/// Wire form is a JSON text frame `{"event": <name>, "data": <payload>}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChannelEvent {
    /// Server → client: the full set of online user ids. Replaces, never merges.
    OnlineUserSet(Vec<String>),
    /// Server → client: a message addressed to this user.
    NewMessage(Message),
    /// Server → client: a cross-conversation notification.
    #[serde(rename_all = "camelCase")]
    Notification { sender_name: String, message: String },
    /// Client → server: announce which user this channel belongs to.
    Join(String),
}

/// Live channel endpoints a connector hands back: a sender the engine uses
/// for outbound events and a receiver it drains for inbound ones. Dropping
/// the sender closes the channel from our side.
#[derive(Debug)]
pub struct ChannelSession {
    pub outbound: mpsc::UnboundedSender<ChannelEvent>,
    pub inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// What the actor keeps while a channel is live.
#[derive(Debug)]
pub struct ChannelHandle {
    pub outbound: mpsc::UnboundedSender<ChannelEvent>,
}

/// Opens live channels to the server. Swapped out in tests.
#[async_trait]
pub trait ChannelConnector: Send + Sync + 'static {
    async fn connect(&self, user_id: &str) -> Result<ChannelSession, ApiError>;
}

pub type SharedChannelConnector = Arc<RwLock<Option<Arc<dyn ChannelConnector>>>>;

/// Default connector: a WebSocket to `{url}?userId={id}`.
pub struct WsChannelConnector {
    url: String,
}

impl WsChannelConnector {
    pub fn new(url: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChannelConnector for WsChannelConnector {
    async fn connect(&self, user_id: &str) -> Result<ChannelSession, ApiError> {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{sep}userId={user_id}", self.url);
        let (ws, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ChannelEvent>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ChannelEvent>();
        // Raw frames the reader needs written (pong replies).
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<WsFrame>();

        // Writer: serializes outbound events; a dropped `outbound` sender ends
        // the task with a polite close frame.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = out_rx.recv() => match event {
                        Some(event) => {
                            let text = match serde_json::to_string(&event) {
                                Ok(text) => text,
                                Err(e) => {
                                    tracing::error!("serialize outbound channel event: {e}");
                                    continue;
                                }
                            };
                            if ws_tx.send(WsFrame::Text(text.into())).await.is_err() {
                                tracing::debug!("channel write failed, server gone");
                                break;
                            }
                        }
                        None => {
                            let _ = ws_tx.send(WsFrame::Close(None)).await;
                            break;
                        }
                    },
                    frame = raw_rx.recv() => match frame {
                        Some(frame) => {
                            if ws_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        // Reader ended, so the socket is already down.
                        None => break,
                    },
                }
            }
        });

        // Reader: parses inbound frames until close or error; ending the task
        // drops `in_tx`, which is how the engine observes the closure.
        tokio::spawn(async move {
            while let Some(result) = ws_rx.next().await {
                match result {
                    Ok(WsFrame::Text(text)) => match serde_json::from_str::<ChannelEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("unrecognized channel frame: {e}"),
                    },
                    Ok(WsFrame::Ping(payload)) => {
                        let _ = raw_tx.send(WsFrame::Pong(payload));
                    }
                    Ok(WsFrame::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("channel read error: {e}");
                        break;
                    }
                }
            }
        });

        Ok(ChannelSession {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_join_wire_form() {
        let json = serde_json::to_string(&ChannelEvent::Join("u1".into())).unwrap();
        assert_eq!(json, r#"{"event":"join","data":"u1"}"#);
    }

    #[test]
    fn inbound_events_parse_by_name() {
        let presence: ChannelEvent =
            serde_json::from_str(r#"{"event":"online-user-set","data":["u1","u2"]}"#).unwrap();
        assert_eq!(
            presence,
            ChannelEvent::OnlineUserSet(vec!["u1".into(), "u2".into()])
        );

        let notification: ChannelEvent = serde_json::from_str(
            r#"{"event":"notification","data":{"senderName":"Ada","message":"New message from Ada"}}"#,
        )
        .unwrap();
        assert_eq!(
            notification,
            ChannelEvent::Notification {
                sender_name: "Ada".into(),
                message: "New message from Ada".into(),
            }
        );

        let message: ChannelEvent = serde_json::from_str(
            r#"{"event":"new-message","data":{"id":"m1","senderId":"u2","receiverId":"u1","text":"hey","createdAt":"2024-01-15T10:00:00Z"}}"#,
        )
        .unwrap();
        match message {
            ChannelEvent::NewMessage(m) => {
                assert_eq!(m.sender_id, "u2");
                assert_eq!(m.text.as_deref(), Some("hey"));
            }
            other => panic!("expected new-message, got {other:?}"),
        }
    }
}
