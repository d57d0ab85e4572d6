use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

/// Authenticated user profile, as the server returns it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One chat message. Immutable once created; ids are server-assigned.
/// At least one of `text` / `image_url` is present.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A relayed cross-conversation notification, timestamped on arrival.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationItem {
    pub sender_name: String,
    pub message: String,
    pub received_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Checking,
    Authenticated { identity: Identity },
    Failed,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// In-flight flags for operations the UI should reflect as spinners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusyState {
    pub checking_session: bool,
    pub logging_in: bool,
    pub signing_up: bool,
    pub updating_profile: bool,
    pub loading_peers: bool,
    pub loading_messages: bool,
}

impl BusyState {
    pub fn idle() -> Self {
        Self {
            checking_session: false,
            logging_in: false,
            signing_up: false,
            updating_profile: false,
            loading_peers: false,
            loading_messages: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub session: SessionState,
    /// Last identity that authenticated from this data dir. Display hint only:
    /// never drives the session machine or the connection.
    pub cached_identity: Option<Identity>,
    pub connection: ConnectionState,
    pub busy: BusyState,
    pub peer_list: Vec<Identity>,
    pub online_peers: BTreeSet<String>,
    pub selected_peer: Option<String>,
    /// Per-peer message logs, keyed by peer id. Entries exist only for peers
    /// that were selected this session or that a live message arrived for
    /// while selected; deselecting wipes the whole map.
    pub conversations: HashMap<String, Vec<Message>>,
    pub notifications: Vec<NotificationItem>,
    pub notifications_muted: bool,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            session: SessionState::Anonymous,
            cached_identity: None,
            connection: ConnectionState::Disconnected,
            busy: BusyState::idle(),
            peer_list: vec![],
            online_peers: BTreeSet::new(),
            selected_peer: None,
            conversations: HashMap::new(),
            notifications: vec![],
            notifications_muted: false,
            toast: None,
        }
    }

    pub fn is_peer_online(&self, peer_id: &str) -> bool {
        self.online_peers.contains(peer_id)
    }

    pub fn selected_conversation(&self) -> Option<&Vec<Message>> {
        self.selected_peer
            .as_deref()
            .and_then(|peer| self.conversations.get(peer))
    }
}

pub fn now_seconds() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            full_name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            profile_pic_url: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn empty_state_is_anonymous_and_disconnected() {
        let state = AppState::empty();
        assert_eq!(state.rev, 0);
        assert_eq!(state.session, SessionState::Anonymous);
        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert_eq!(state.busy, BusyState::idle());
        assert!(state.conversations.is_empty());
        assert!(state.toast.is_none());
    }

    #[test]
    fn presence_membership_reflects_the_set() {
        let mut state = AppState::empty();
        state.online_peers = ["u1".to_string(), "u2".to_string()].into_iter().collect();
        assert!(state.is_peer_online("u1"));
        assert!(state.is_peer_online("u2"));
        assert!(!state.is_peer_online("u3"));
    }

    #[test]
    fn session_identity_accessor() {
        let anon = SessionState::Anonymous;
        assert!(anon.identity().is_none());
        assert!(!anon.is_authenticated());

        let authed = SessionState::Authenticated { identity: identity("u1") };
        assert_eq!(authed.identity().map(|i| i.id.as_str()), Some("u1"));
        assert!(authed.is_authenticated());
    }

    #[test]
    fn identity_wire_form_is_camel_case() {
        let json = r#"{
            "id": "u1",
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "profilePicUrl": "https://cdn.example.com/u1.png",
            "createdAt": "2024-01-15T10:00:00.000Z"
        }"#;
        let parsed: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.full_name, "Ada Lovelace");
        assert_eq!(parsed.profile_pic_url.as_deref(), Some("https://cdn.example.com/u1.png"));
    }

    #[test]
    fn message_tolerates_absent_optional_fields() {
        let json = r#"{
            "id": "m1",
            "senderId": "u1",
            "receiverId": "u2",
            "text": "hello",
            "createdAt": "2024-01-15T10:00:00.000Z"
        }"#;
        let parsed: Message = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("hello"));
        assert!(parsed.image_url.is_none());
    }
}
