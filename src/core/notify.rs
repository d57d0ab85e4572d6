use crate::state::{now_seconds, NotificationItem};

use super::AppCore;

impl AppCore {
    /// Every notification joins the queue; mute only silences the toast.
    /// The queue is never pruned and outlives the session.
    pub(super) fn on_notification_received(
        &mut self,
        epoch: u64,
        sender_name: String,
        message: String,
    ) {
        if !self.channel_epoch_current(epoch) {
            tracing::debug!(epoch, "stale notification discarded");
            return;
        }
        tracing::info!(from = %sender_name, "notification received");
        self.state.notifications.push(NotificationItem {
            sender_name,
            message: message.clone(),
            received_at: now_seconds(),
        });
        if self.state.notifications_muted {
            self.emit_state();
        } else {
            self.toast(message);
        }
    }

    pub(super) fn set_notifications_muted(&mut self, muted: bool) {
        if self.state.notifications_muted != muted {
            self.state.notifications_muted = muted;
            self.emit_state();
        }
    }
}
