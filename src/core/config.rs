use std::path::Path;

use serde::Deserialize;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5001/api";
const DEFAULT_CHANNEL_URL: &str = "ws://localhost:5001";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    pub(super) disable_network: Option<bool>,
    pub(super) api_base_url: Option<String>,
    pub(super) channel_url: Option<String>,
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join("banter_config.json");
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_default()
}

impl AppConfig {
    pub(super) fn network_enabled(&self) -> bool {
        // Used to keep Rust tests deterministic and offline.
        if let Some(disable) = self.disable_network {
            return !disable;
        }
        std::env::var("BANTER_DISABLE_NETWORK").ok().as_deref() != Some("1")
    }

    pub(super) fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub(super) fn channel_url(&self) -> &str {
        self.channel_url.as_deref().unwrap_or(DEFAULT_CHANNEL_URL)
    }
}
