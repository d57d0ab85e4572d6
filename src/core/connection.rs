use crate::channel::{ChannelEvent, ChannelHandle, ChannelSession};
use crate::error::ApiError;
use crate::state::ConnectionState;
use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

impl AppCore {
    /// Ask the installed connector for a live channel. No-op unless currently
    /// disconnected; there is never more than one channel.
    pub(super) fn open_channel(&mut self) {
        if self.channel.is_some() || self.state.connection != ConnectionState::Disconnected {
            tracing::debug!("channel open skipped, already connecting or connected");
            return;
        }
        let Some(user_id) = self.my_id() else {
            tracing::warn!("channel open skipped, not authenticated");
            return;
        };
        let Some(connector) = self.connector() else {
            // Offline configuration; the engine works without live events.
            tracing::warn!("no channel connector installed, staying disconnected");
            return;
        };

        self.channel_epoch += 1;
        let epoch = self.channel_epoch;
        self.state.connection = ConnectionState::Connecting;
        self.emit_state();

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            match connector.connect(&user_id).await {
                Ok(session) => {
                    let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ChannelOpened {
                        epoch,
                        session,
                    })));
                }
                Err(error) => {
                    let _ = tx.send(CoreMsg::Internal(Box::new(
                        InternalEvent::ChannelOpenFailed { epoch, error },
                    )));
                }
            }
        });
    }

    /// Idempotent. Bumping the epoch invalidates everything still in flight
    /// for the old channel; dropping the handle closes it from our side.
    pub(super) fn close_channel(&mut self) {
        self.channel_epoch += 1;
        self.channel = None;
        if self.state.connection != ConnectionState::Disconnected {
            self.state.connection = ConnectionState::Disconnected;
            self.emit_state();
        }
    }

    pub(super) fn on_channel_opened(&mut self, epoch: u64, session: ChannelSession) {
        if !self.channel_epoch_current(epoch) {
            // Opened after a logout or a newer open; dropping the session
            // closes it.
            tracing::debug!(epoch, "stale channel open discarded");
            return;
        }
        let Some(user_id) = self.my_id() else {
            tracing::warn!("channel opened without a session, closing");
            self.close_channel();
            return;
        };

        let ChannelSession {
            outbound,
            mut inbound,
        } = session;

        // Announce ourselves before anything else travels on this channel.
        let _ = outbound.send(ChannelEvent::Join(user_id));
        self.channel = Some(ChannelHandle { outbound });
        self.state.connection = ConnectionState::Connected;
        tracing::info!(epoch, "channel connected");
        self.emit_state();

        // Forward inbound events to the actor until the server side closes.
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            while let Some(event) = inbound.recv().await {
                let internal = match event {
                    ChannelEvent::OnlineUserSet(online_ids) => {
                        InternalEvent::PresenceReplaced { epoch, online_ids }
                    }
                    ChannelEvent::NewMessage(message) => {
                        InternalEvent::MessageReceived { epoch, message }
                    }
                    ChannelEvent::Notification {
                        sender_name,
                        message,
                    } => InternalEvent::NotificationReceived {
                        epoch,
                        sender_name,
                        message,
                    },
                    // Client-to-server only; a server echoing it is noise.
                    ChannelEvent::Join(_) => continue,
                };
                if tx.send(CoreMsg::Internal(Box::new(internal))).is_err() {
                    break;
                }
            }
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ChannelClosed {
                epoch,
            })));
        });
    }

    pub(super) fn on_channel_open_failed(&mut self, epoch: u64, error: ApiError) {
        if !self.channel_epoch_current(epoch) {
            tracing::debug!(epoch, "stale channel open failure discarded");
            return;
        }
        tracing::warn!(%error, "channel open failed");
        self.state.connection = ConnectionState::Disconnected;
        self.toast(error.user_message("Connection failed"));
    }

    /// Transport-initiated closure. No automatic reconnection: the channel
    /// stays down until the next authentication event opens a fresh one.
    pub(super) fn on_channel_closed(&mut self, epoch: u64) {
        if !self.channel_epoch_current(epoch) {
            tracing::debug!(epoch, "stale channel close discarded");
            return;
        }
        tracing::info!("channel closed by transport");
        self.close_channel();
    }
}
