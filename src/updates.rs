use crate::channel::ChannelSession;
use crate::error::ApiError;
use crate::state::{AppState, Identity, Message};
use crate::AppAction;

#[derive(Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    // Session-establishing results. These are serialized by the session state
    // machine itself and carry no generation tag.
    SessionChecked {
        result: Result<Identity, ApiError>,
    },
    LoginFinished {
        result: Result<Identity, ApiError>,
    },
    SignupFinished {
        result: Result<Identity, ApiError>,
    },

    // Results of calls that needed a live session. Each carries the auth
    // epoch of the session that issued it; a result from an earlier session
    // is dropped on arrival.
    ProfileUpdated {
        auth_epoch: u64,
        result: Result<Identity, ApiError>,
    },
    LogoutFinished {
        auth_epoch: u64,
        result: Result<(), ApiError>,
    },
    PeersListed {
        auth_epoch: u64,
        result: Result<Vec<Identity>, ApiError>,
    },
    // `token` identifies the load so a superseded result can be discarded.
    // The active-load table is wiped with the session, so no epoch is needed.
    MessagesLoaded {
        peer_id: String,
        token: u64,
        result: Result<Vec<Message>, ApiError>,
    },
    MessageSent {
        auth_epoch: u64,
        peer_id: String,
        result: Result<Message, ApiError>,
    },
    ConversationCleared {
        auth_epoch: u64,
        peer_id: String,
        result: Result<(), ApiError>,
    },

    // Channel lifecycle and inbound events. Every variant carries the epoch
    // of the channel it came from; stale epochs are dropped on arrival.
    ChannelOpened {
        epoch: u64,
        session: ChannelSession,
    },
    ChannelOpenFailed {
        epoch: u64,
        error: ApiError,
    },
    ChannelClosed {
        epoch: u64,
    },
    PresenceReplaced {
        epoch: u64,
        online_ids: Vec<String>,
    },
    MessageReceived {
        epoch: u64,
        message: Message,
    },
    NotificationReceived {
        epoch: u64,
        sender_name: String,
        message: String,
    },
}
