#[derive(Debug, Clone)]
pub enum AppAction {
    // Session
    CheckSession,
    Login {
        email: String,
        password: String,
    },
    Signup {
        full_name: String,
        email: String,
        password: String,
    },
    UpdateProfile {
        profile_pic: String,
    },
    Logout,

    // Conversations
    ListPeers,
    SelectPeer {
        peer_id: Option<String>,
    },
    SendMessage {
        peer_id: String,
        text: Option<String>,
        image: Option<String>,
    },
    ClearConversation {
        peer_id: String,
    },

    // Notifications
    SetNotificationsMuted {
        muted: bool,
    },

    // UI
    ClearToast,
}

impl AppAction {
    /// Log-safe action tag (never includes secrets like passwords).
    pub fn tag(&self) -> &'static str {
        match self {
            // Session
            AppAction::CheckSession => "CheckSession",
            AppAction::Login { .. } => "Login",
            AppAction::Signup { .. } => "Signup",
            AppAction::UpdateProfile { .. } => "UpdateProfile",
            AppAction::Logout => "Logout",

            // Conversations
            AppAction::ListPeers => "ListPeers",
            AppAction::SelectPeer { .. } => "SelectPeer",
            AppAction::SendMessage { .. } => "SendMessage",
            AppAction::ClearConversation { .. } => "ClearConversation",

            // Notifications
            AppAction::SetNotificationsMuted { .. } => "SetNotificationsMuted",

            // UI
            AppAction::ClearToast => "ClearToast",
        }
    }
}
