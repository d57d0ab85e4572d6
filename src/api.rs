use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{Identity, Message};

/// Everything the engine asks of the HTTP side of the server.
///
/// Implementations must be callable from any runtime task; results come back
/// by value so the actor can route them through internal events.
#[async_trait]
pub trait Api: Send + Sync + 'static {
    async fn check_session(&self) -> Result<Identity, ApiError>;
    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError>;
    async fn signup(&self, full_name: &str, email: &str, password: &str)
        -> Result<Identity, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn update_profile(&self, profile_pic: &str) -> Result<Identity, ApiError>;
    async fn list_peers(&self) -> Result<Vec<Identity>, ApiError>;
    async fn load_messages(&self, peer_id: &str) -> Result<Vec<Message>, ApiError>;
    async fn send_message(&self, peer_id: &str, draft: &MessageDraft) -> Result<Message, ApiError>;
    async fn clear_conversation(&self, peer_id: &str) -> Result<(), ApiError>;
}

/// Swappable API slot. `None` until a network-enabled engine installs the
/// default client (or a test injects a double).
pub type SharedApi = Arc<RwLock<Option<Arc<dyn Api>>>>;

/// Outgoing message payload. The server requires at least one field.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MessageDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl MessageDraft {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty()) && self.image.is_none()
    }
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupPayload<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePayload<'a> {
    profile_pic: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Default `Api` implementation over the server's REST surface.
///
/// Session auth rides on a cookie the server sets at login/signup, so the
/// client keeps a cookie jar for the lifetime of the engine.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Network(format!("http client init: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            resp.json::<T>()
                .await
                .map_err(|e| ApiError::Server(format!("invalid response body: {e}")))
        } else {
            Err(Self::status_error(resp).await)
        }
    }

    async fn decode_unit(resp: reqwest::Response) -> Result<(), ApiError> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(resp).await)
        }
    }

    async fn status_error(resp: reqwest::Response) -> ApiError {
        let status = resp.status().as_u16();
        let message = resp.json::<ErrorBody>().await.ok().map(|b| b.message);
        ApiError::from_status(status, message)
    }
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

#[async_trait]
impl Api for HttpApi {
    async fn check_session(&self) -> Result<Identity, ApiError> {
        let resp = self
            .client
            .get(self.url("/auth/check"))
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginPayload { email, password })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn signup(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ApiError> {
        let resp = self
            .client
            .post(self.url("/auth/signup"))
            .json(&SignupPayload {
                full_name,
                email,
                password,
            })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .send()
            .await
            .map_err(transport)?;
        Self::decode_unit(resp).await
    }

    async fn update_profile(&self, profile_pic: &str) -> Result<Identity, ApiError> {
        let resp = self
            .client
            .put(self.url("/auth/update-profile"))
            .json(&ProfilePayload { profile_pic })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn list_peers(&self) -> Result<Vec<Identity>, ApiError> {
        let resp = self
            .client
            .get(self.url("/messages/users"))
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn load_messages(&self, peer_id: &str) -> Result<Vec<Message>, ApiError> {
        let resp = self
            .client
            .get(self.url(&format!("/messages/{peer_id}")))
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn send_message(&self, peer_id: &str, draft: &MessageDraft) -> Result<Message, ApiError> {
        let resp = self
            .client
            .post(self.url(&format!("/messages/send/{peer_id}")))
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(resp).await
    }

    async fn clear_conversation(&self, peer_id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/messages/soft-delete/{peer_id}")))
            .send()
            .await
            .map_err(transport)?;
        Self::decode_unit(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_emptiness_ignores_whitespace_text() {
        assert!(MessageDraft::default().is_empty());
        assert!(MessageDraft {
            text: Some("   ".into()),
            image: None
        }
        .is_empty());
        assert!(!MessageDraft {
            text: Some("hi".into()),
            image: None
        }
        .is_empty());
        assert!(!MessageDraft {
            text: None,
            image: Some("data:image/png;base64,xyz".into())
        }
        .is_empty());
    }

    #[test]
    fn payloads_serialize_with_server_field_names() {
        let signup = serde_json::to_value(SignupPayload {
            full_name: "Ada",
            email: "ada@example.com",
            password: "secret",
        })
        .unwrap();
        assert_eq!(signup["fullName"], "Ada");

        let profile = serde_json::to_value(ProfilePayload {
            profile_pic: "data:image/png;base64,xyz",
        })
        .unwrap();
        assert_eq!(profile["profilePic"], "data:image/png;base64,xyz");

        let draft = serde_json::to_value(MessageDraft {
            text: Some("hi".into()),
            image: None,
        })
        .unwrap();
        assert!(draft.get("image").is_none());
    }
}
