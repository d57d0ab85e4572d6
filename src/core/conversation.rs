use crate::api::MessageDraft;
use crate::error::ApiError;
use crate::state::{Identity, Message};
use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

impl AppCore {
    pub(super) fn list_peers(&mut self) {
        if !self.is_authenticated() {
            tracing::debug!("peer list skipped, not authenticated");
            return;
        }
        if self.state.busy.loading_peers {
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };
        self.set_busy(|b| b.loading_peers = true);

        let auth_epoch = self.auth_epoch;
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.list_peers().await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::PeersListed {
                auth_epoch,
                result,
            })));
        });
    }

    pub(super) fn on_peers_listed(&mut self, auth_epoch: u64, result: Result<Vec<Identity>, ApiError>) {
        if !self.auth_epoch_current(auth_epoch) {
            tracing::debug!("stale peer list discarded");
            return;
        }
        self.state.busy.loading_peers = false;
        match result {
            Ok(peers) => {
                tracing::debug!(count = peers.len(), "peer list refreshed");
                self.state.peer_list = peers;
                self.emit_state();
            }
            // The previous list stays; only the failure is surfaced.
            Err(e) => self.fail_authenticated_call(e, "Failed to load users."),
        }
    }

    /// Select `Some(peer)` to focus a conversation, `None` to leave the chat
    /// view. Deselecting throws the whole cache away; re-selecting starts over.
    pub(super) fn select_peer(&mut self, peer_id: Option<String>) {
        match peer_id {
            None => {
                self.state.selected_peer = None;
                // Full wipe, not per-entry pruning. In-flight loads stay
                // valid on purpose: their results are written even though
                // the view moved on.
                self.state.conversations.clear();
                self.emit_state();
            }
            Some(peer) => {
                if !self.is_authenticated() {
                    tracing::debug!("peer selection skipped, not authenticated");
                    return;
                }
                self.state.selected_peer = Some(peer.clone());
                if self.state.conversations.contains_key(&peer) {
                    // Cached; selection alone never re-fetches.
                    self.emit_state();
                    return;
                }
                self.state.conversations.insert(peer.clone(), vec![]);
                self.emit_state();
                self.load_messages(peer);
            }
        }
    }

    fn load_messages(&mut self, peer_id: String) {
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };
        self.load_seq += 1;
        let token = self.load_seq;
        self.active_loads.insert(peer_id.clone(), token);
        self.set_busy(|b| b.loading_messages = true);

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.load_messages(&peer_id).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::MessagesLoaded {
                peer_id,
                token,
                result,
            })));
        });
    }

    pub(super) fn on_messages_loaded(
        &mut self,
        peer_id: String,
        token: u64,
        result: Result<Vec<Message>, ApiError>,
    ) {
        if self.active_loads.get(&peer_id) != Some(&token) {
            // Superseded: a newer load, an append, or a clear got here first.
            tracing::debug!(peer = %peer_id, token, "stale history load discarded");
            return;
        }
        self.active_loads.remove(&peer_id);
        self.state.busy.loading_messages = !self.active_loads.is_empty();
        match result {
            Ok(messages) => {
                tracing::debug!(peer = %peer_id, count = messages.len(), "history loaded");
                self.state.conversations.insert(peer_id, messages);
                self.emit_state();
            }
            // Whatever the cache held for this peer stays as it was.
            Err(e) => self.fail_authenticated_call(e, "Failed to load messages."),
        }
    }

    pub(super) fn send_message(
        &mut self,
        peer_id: String,
        text: Option<String>,
        image: Option<String>,
    ) {
        if !self.is_authenticated() {
            tracing::debug!("send skipped, not authenticated");
            return;
        }
        if self.state.selected_peer.as_deref() != Some(peer_id.as_str()) {
            // Sends are only valid into the focused conversation.
            self.toast("No user selected for messaging!");
            return;
        }
        let draft = MessageDraft {
            text: text.filter(|t| !t.trim().is_empty()),
            image,
        };
        if draft.is_empty() {
            tracing::debug!("empty draft ignored");
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };

        let auth_epoch = self.auth_epoch;
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.send_message(&peer_id, &draft).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::MessageSent {
                auth_epoch,
                peer_id,
                result,
            })));
        });
    }

    pub(super) fn on_message_sent(
        &mut self,
        auth_epoch: u64,
        peer_id: String,
        result: Result<Message, ApiError>,
    ) {
        if !self.auth_epoch_current(auth_epoch) {
            // An echo from before a logout must not leak into whatever
            // conversation the new session builds under the same key.
            tracing::debug!(peer = %peer_id, "stale send echo discarded");
            return;
        }
        match result {
            Ok(echo) => {
                // The echo is the message's first and only appearance here;
                // there is no optimistic copy to reconcile.
                let Some(log) = self.state.conversations.get_mut(&peer_id) else {
                    // Deselected or cleared while the send was in flight; the
                    // message lives server-side and returns with the next load.
                    tracing::debug!(peer = %peer_id, "send echo dropped, conversation gone");
                    return;
                };
                log.push(echo);
                self.retire_pending_load(&peer_id, "append");
                self.emit_state();
            }
            Err(e) => self.fail_authenticated_call(e, "Failed to send message."),
        }
    }

    pub(super) fn clear_conversation(&mut self, peer_id: String) {
        if !self.is_authenticated() {
            tracing::debug!("clear skipped, not authenticated");
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };

        let auth_epoch = self.auth_epoch;
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.clear_conversation(&peer_id).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::ConversationCleared {
                    auth_epoch,
                    peer_id,
                    result,
                },
            )));
        });
    }

    pub(super) fn on_conversation_cleared(
        &mut self,
        auth_epoch: u64,
        peer_id: String,
        result: Result<(), ApiError>,
    ) {
        if !self.auth_epoch_current(auth_epoch) {
            tracing::debug!(peer = %peer_id, "stale clear result discarded");
            return;
        }
        match result {
            Ok(()) => {
                self.state.conversations.remove(&peer_id);
                // A pre-clear load snapshot must not resurrect the cleared log.
                self.retire_pending_load(&peer_id, "clear");
                self.toast("Messages cleared");
            }
            Err(e) => self.fail_authenticated_call(e, "Failed to clear messages"),
        }
    }

    /// Inbound live message, routed against current state at arrival time:
    /// only the focused conversation accepts appends; everything else is
    /// dropped and comes back through the next history load.
    pub(super) fn on_message_received(&mut self, epoch: u64, message: Message) {
        if !self.channel_epoch_current(epoch) {
            tracing::debug!(epoch, "stale inbound message discarded");
            return;
        }
        if self.state.selected_peer.as_deref() != Some(message.sender_id.as_str()) {
            tracing::debug!(sender = %message.sender_id, "inbound message outside focused conversation dropped");
            return;
        }
        let peer = message.sender_id.clone();
        // The entry can be missing right after a clear; a live message
        // re-creates it.
        self.state
            .conversations
            .entry(peer.clone())
            .or_default()
            .push(message);
        self.retire_pending_load(&peer, "append");
        self.emit_state();
    }

    /// Any write that lands after a load was issued makes that load's
    /// snapshot stale; retire it so its arrival is discarded.
    fn retire_pending_load(&mut self, peer_id: &str, reason: &'static str) {
        if self.active_loads.remove(peer_id).is_some() {
            tracing::debug!(peer = %peer_id, reason, "pending history load superseded");
            self.state.busy.loading_messages = !self.active_loads.is_empty();
        }
    }
}
