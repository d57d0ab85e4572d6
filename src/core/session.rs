use std::path::{Path, PathBuf};

use crate::error::ApiError;
use crate::state::{Identity, SessionState};
use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

fn cache_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("session_cache.json")
}

/// Last identity that authenticated from this data dir, if any. Read failures
/// mean "no cache"; the session check is the source of truth either way.
pub(super) fn load_cached_identity(data_dir: &str) -> Option<Identity> {
    let bytes = std::fs::read(cache_path(data_dir)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub(super) fn store_cached_identity(data_dir: &str, identity: &Identity) {
    if let Ok(json) = serde_json::to_vec(identity) {
        let _ = std::fs::write(cache_path(data_dir), json);
    }
}

pub(super) fn clear_cached_identity(data_dir: &str) {
    let _ = std::fs::remove_file(cache_path(data_dir));
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

impl AppCore {
    pub(super) fn check_session(&mut self) {
        if self.is_authenticated() || matches!(self.state.session, SessionState::Checking) {
            tracing::debug!("session check skipped");
            return;
        }
        let Some(api) = self.api_client() else {
            // Silent by contract: an unreachable check leaves the user anonymous.
            tracing::debug!("session check skipped, no api client");
            if self.state.session != SessionState::Anonymous {
                self.state.session = SessionState::Anonymous;
                self.emit_state();
            }
            return;
        };
        self.state.session = SessionState::Checking;
        self.set_busy(|b| b.checking_session = true);

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.check_session().await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::SessionChecked {
                result,
            })));
        });
    }

    pub(super) fn on_session_checked(&mut self, result: Result<Identity, ApiError>) {
        if !matches!(self.state.session, SessionState::Checking) {
            tracing::debug!("session check result ignored, session moved on");
            return;
        }
        self.state.busy.checking_session = false;
        match result {
            Ok(identity) => {
                tracing::info!(user = %identity.id, "session restored");
                self.state.session = SessionState::Authenticated { identity };
                self.handle_auth_transition(true);
            }
            Err(e) => {
                // The one silent failure: nobody asked for this check to be
                // visible, so an expired session just stays anonymous.
                tracing::debug!(%e, "session check failed");
                self.state.session = SessionState::Anonymous;
                self.handle_auth_transition(false);
            }
        }
    }

    pub(super) fn login(&mut self, email: String, password: String) {
        if self.is_authenticated() {
            tracing::debug!("login ignored, already authenticated");
            return;
        }
        if self.state.busy.logging_in || self.state.busy.signing_up {
            return;
        }
        let email = email.trim().to_string();
        if email.is_empty() || password.is_empty() {
            self.toast("All fields are required");
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };
        self.state.session = SessionState::Checking;
        self.set_busy(|b| b.logging_in = true);

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.login(&email, &password).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::LoginFinished {
                result,
            })));
        });
    }

    pub(super) fn on_login_finished(&mut self, result: Result<Identity, ApiError>) {
        if self.is_authenticated() {
            tracing::debug!("login result ignored, already authenticated");
            return;
        }
        self.state.busy.logging_in = false;
        match result {
            Ok(identity) => {
                tracing::info!(user = %identity.id, "logged in");
                self.state.session = SessionState::Authenticated { identity };
                self.handle_auth_transition(true);
                self.toast("Logged in successfully");
            }
            Err(e) => {
                tracing::warn!(%e, "login failed");
                self.state.session = SessionState::Failed;
                self.toast(e.user_message("Login failed"));
            }
        }
    }

    pub(super) fn signup(&mut self, full_name: String, email: String, password: String) {
        if self.is_authenticated() {
            tracing::debug!("signup ignored, already authenticated");
            return;
        }
        if self.state.busy.logging_in || self.state.busy.signing_up {
            return;
        }
        let full_name = full_name.trim().to_string();
        let email = email.trim().to_string();
        if full_name.is_empty() || email.is_empty() || password.is_empty() {
            self.toast("All fields are required");
            return;
        }
        if !valid_email(&email) {
            self.toast("Invalid email format");
            return;
        }
        if password.len() < 6 {
            self.toast("Password must be at least 6 characters");
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };
        self.state.session = SessionState::Checking;
        self.set_busy(|b| b.signing_up = true);

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.signup(&full_name, &email, &password).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::SignupFinished {
                result,
            })));
        });
    }

    pub(super) fn on_signup_finished(&mut self, result: Result<Identity, ApiError>) {
        if self.is_authenticated() {
            tracing::debug!("signup result ignored, already authenticated");
            return;
        }
        self.state.busy.signing_up = false;
        match result {
            Ok(identity) => {
                tracing::info!(user = %identity.id, "account created");
                self.state.session = SessionState::Authenticated { identity };
                self.handle_auth_transition(true);
                self.toast("Account created successfully");
            }
            Err(e) => {
                tracing::warn!(%e, "signup failed");
                self.state.session = SessionState::Failed;
                self.toast(e.user_message("Signup failed"));
            }
        }
    }

    /// Overlapping updates are not coalesced: each dispatch goes to the
    /// server, and the last response to arrive wins the wholesale replace.
    pub(super) fn update_profile(&mut self, profile_pic: String) {
        if !self.is_authenticated() {
            tracing::warn!("profile update ignored, not authenticated");
            return;
        }
        let Some(api) = self.api_client() else {
            self.toast("Network disabled");
            return;
        };
        self.set_busy(|b| b.updating_profile = true);

        let auth_epoch = self.auth_epoch;
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.update_profile(&profile_pic).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ProfileUpdated {
                auth_epoch,
                result,
            })));
        });
    }

    pub(super) fn on_profile_updated(&mut self, auth_epoch: u64, result: Result<Identity, ApiError>) {
        if !self.auth_epoch_current(auth_epoch) {
            // Logged out, or a different session entirely; nothing to apply.
            tracing::debug!("stale profile update result discarded");
            return;
        }
        self.state.busy.updating_profile = false;
        match result {
            // Whole-identity replace: the last response to arrive wins.
            Ok(identity) => {
                self.state.session = SessionState::Authenticated {
                    identity: identity.clone(),
                };
                self.state.cached_identity = Some(identity.clone());
                store_cached_identity(&self.data_dir, &identity);
                self.toast("Profile updated successfully");
            }
            Err(e) => self.fail_authenticated_call(e, "Profile update failed"),
        }
    }

    /// The user asked to be out, so the engine goes down first and lets the
    /// endpoint result pick the toast afterwards.
    pub(super) fn logout(&mut self) {
        if !self.is_authenticated() {
            tracing::debug!("logout ignored, not authenticated");
            return;
        }
        self.state.session = SessionState::Anonymous;
        self.handle_auth_transition(false);

        let Some(api) = self.api_client() else {
            // Nothing to tell the server; the local logout already happened.
            self.toast("Logged out successfully");
            return;
        };
        // Capture the post-teardown epoch: the result is only worth a toast
        // while this logged-out generation is still the current one.
        let auth_epoch = self.auth_epoch;
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = api.logout().await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::LogoutFinished {
                auth_epoch,
                result,
            })));
        });
    }

    pub(super) fn on_logout_finished(&mut self, auth_epoch: u64, result: Result<(), ApiError>) {
        if !self.auth_epoch_current(auth_epoch) {
            tracing::debug!("stale logout result discarded");
            return;
        }
        match result {
            Ok(()) => self.toast("Logged out successfully"),
            Err(e) => {
                tracing::warn!(%e, "logout endpoint failed");
                self.toast(e.user_message("Logout failed"));
            }
        }
    }

    /// Shared failure path for calls that need a live session: surface the
    /// message once, and treat a 401 as the session having expired.
    pub(super) fn fail_authenticated_call(&mut self, error: ApiError, fallback: &str) {
        let message = error.user_message(fallback);
        if error.is_auth() && self.is_authenticated() {
            tracing::warn!(%error, "session expired, dropping authentication");
            self.state.session = SessionState::Anonymous;
            self.handle_auth_transition(false);
        }
        self.toast(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn email_shape_check() {
        assert!(valid_email("ada@example.com"));
        assert!(valid_email("a.b@sub.example.co"));
        assert!(!valid_email("ada"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("ada@example"));
        assert!(!valid_email("ada@.com"));
        assert!(!valid_email("ada@example."));
    }

    #[test]
    fn identity_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        assert!(load_cached_identity(data_dir).is_none());

        let identity = Identity {
            id: "u1".into(),
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            profile_pic_url: None,
            created_at: chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        store_cached_identity(data_dir, &identity);
        assert_eq!(load_cached_identity(data_dir), Some(identity));

        clear_cached_identity(data_dir);
        assert!(load_cached_identity(data_dir).is_none());
    }
}
