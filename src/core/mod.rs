mod config;
mod connection;
mod conversation;
mod notify;
mod presence;
mod session;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::api::{Api, HttpApi, SharedApi};
use crate::channel::{ChannelConnector, ChannelHandle, SharedChannelConnector, WsChannelConnector};
use crate::state::{AppState, BusyState};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    data_dir: String,
    runtime: tokio::runtime::Runtime,

    api: SharedApi,
    channel_connector: SharedChannelConnector,

    // Live channel, if any. The epoch counts channel generations: every open
    // and close bumps it, and anything reported by an older generation is
    // discarded on arrival.
    channel: Option<ChannelHandle>,
    channel_epoch: u64,

    // Session generations, same discipline: every auth transition bumps it,
    // and results of calls issued under an older session are discarded.
    auth_epoch: u64,

    // History-load bookkeeping. `active_loads` maps peer id -> token of the
    // one load whose result is still allowed to write that conversation.
    load_seq: u64,
    active_loads: HashMap<String, u64>,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        api: SharedApi,
        channel_connector: SharedChannelConnector,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        if config.network_enabled() {
            match HttpApi::new(config.api_base_url().to_string()) {
                Ok(client) => {
                    Self::install_api(&api, Arc::new(client));
                }
                Err(e) => tracing::warn!(%e, "http client unavailable, api calls disabled"),
            }
            Self::install_connector(
                &channel_connector,
                Arc::new(WsChannelConnector::new(config.channel_url().to_string())),
            );
        }

        let mut state = AppState::empty();
        state.cached_identity = session::load_cached_identity(&data_dir);

        let this = Self {
            state,
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            data_dir,
            runtime,
            api,
            channel_connector,
            channel: None,
            channel_epoch: 0,
            auth_epoch: 0,
            load_seq: 0,
            active_loads: HashMap::new(),
        };

        // Ensure ChatApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn install_api(slot: &SharedApi, client: Arc<dyn Api>) {
        match slot.write() {
            Ok(mut g) => *g = Some(client),
            Err(poison) => *poison.into_inner() = Some(client),
        }
    }

    fn install_connector(slot: &SharedChannelConnector, connector: Arc<dyn ChannelConnector>) {
        match slot.write() {
            Ok(mut g) => *g = Some(connector),
            Err(poison) => *poison.into_inner() = Some(connector),
        }
    }

    /// The installed API client. `None` when the network is disabled and no
    /// test double has been injected yet.
    fn api_client(&self) -> Option<Arc<dyn Api>> {
        match self.api.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    fn connector(&self) -> Option<Arc<dyn ChannelConnector>> {
        match self.channel_connector.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn toast(&mut self, msg: impl Into<String>) {
        // Toasts stay in state until the UI dispatches ClearToast.
        self.state.toast = Some(msg.into());
        self.emit_state();
    }

    fn is_authenticated(&self) -> bool {
        self.state.session.is_authenticated()
    }

    fn my_id(&self) -> Option<String> {
        self.state.session.identity().map(|i| i.id.clone())
    }

    fn set_busy(&mut self, f: impl FnOnce(&mut BusyState)) {
        let mut next = self.state.busy.clone();
        f(&mut next);
        if next != self.state.busy {
            self.state.busy = next;
            self.emit_state();
        }
    }

    /// Session transitions ripple through everything session-scoped.
    ///
    /// Down: close the channel and drop all server-derived caches. The
    /// notification queue is process-lifetime and survives.
    /// Up: remember the identity for the next cold start and go live.
    fn handle_auth_transition(&mut self, logged_in: bool) {
        self.auth_epoch += 1;
        if logged_in {
            if let Some(identity) = self.state.session.identity().cloned() {
                self.state.cached_identity = Some(identity.clone());
                session::store_cached_identity(&self.data_dir, &identity);
            }
            self.emit_state();
            self.open_channel();
        } else {
            self.close_channel();
            self.state.cached_identity = None;
            session::clear_cached_identity(&self.data_dir);
            self.state.peer_list = vec![];
            self.state.online_peers.clear();
            self.state.selected_peer = None;
            self.state.conversations.clear();
            self.state.busy = BusyState::idle();
            self.active_loads.clear();
            self.emit_state();
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it can contain credentials.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Session
            AppAction::CheckSession => self.check_session(),
            AppAction::Login { email, password } => self.login(email, password),
            AppAction::Signup {
                full_name,
                email,
                password,
            } => self.signup(full_name, email, password),
            AppAction::UpdateProfile { profile_pic } => self.update_profile(profile_pic),
            AppAction::Logout => self.logout(),

            // Conversations
            AppAction::ListPeers => self.list_peers(),
            AppAction::SelectPeer { peer_id } => self.select_peer(peer_id),
            AppAction::SendMessage {
                peer_id,
                text,
                image,
            } => self.send_message(peer_id, text, image),
            AppAction::ClearConversation { peer_id } => self.clear_conversation(peer_id),

            // Notifications
            AppAction::SetNotificationsMuted { muted } => self.set_notifications_muted(muted),

            // UI
            AppAction::ClearToast => {
                if self.state.toast.is_some() {
                    self.state.toast = None;
                    self.emit_state();
                }
            }
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            // Session endpoint results
            InternalEvent::SessionChecked { result } => self.on_session_checked(result),
            InternalEvent::LoginFinished { result } => self.on_login_finished(result),
            InternalEvent::SignupFinished { result } => self.on_signup_finished(result),
            InternalEvent::ProfileUpdated { auth_epoch, result } => {
                self.on_profile_updated(auth_epoch, result)
            }
            InternalEvent::LogoutFinished { auth_epoch, result } => {
                self.on_logout_finished(auth_epoch, result)
            }

            // Conversation endpoint results
            InternalEvent::PeersListed { auth_epoch, result } => {
                self.on_peers_listed(auth_epoch, result)
            }
            InternalEvent::MessagesLoaded {
                peer_id,
                token,
                result,
            } => self.on_messages_loaded(peer_id, token, result),
            InternalEvent::MessageSent {
                auth_epoch,
                peer_id,
                result,
            } => self.on_message_sent(auth_epoch, peer_id, result),
            InternalEvent::ConversationCleared {
                auth_epoch,
                peer_id,
                result,
            } => self.on_conversation_cleared(auth_epoch, peer_id, result),

            // Channel lifecycle and inbound events
            InternalEvent::ChannelOpened { epoch, session } => self.on_channel_opened(epoch, session),
            InternalEvent::ChannelOpenFailed { epoch, error } => {
                self.on_channel_open_failed(epoch, error)
            }
            InternalEvent::ChannelClosed { epoch } => self.on_channel_closed(epoch),
            InternalEvent::PresenceReplaced { epoch, online_ids } => {
                self.on_presence_replaced(epoch, online_ids)
            }
            InternalEvent::MessageReceived { epoch, message } => {
                self.on_message_received(epoch, message)
            }
            InternalEvent::NotificationReceived {
                epoch,
                sender_name,
                message,
            } => self.on_notification_received(epoch, sender_name, message),
        }
    }

    /// True when `epoch` belongs to the channel generation we currently hold.
    fn channel_epoch_current(&self, epoch: u64) -> bool {
        epoch == self.channel_epoch
    }

    /// True when `epoch` belongs to the current session generation.
    fn auth_epoch_current(&self, epoch: u64) -> bool {
        epoch == self.auth_epoch
    }
}
