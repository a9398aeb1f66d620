use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MixpanelClientConfig {
    /// The project token delivered events are attributed to
    pub token: String,

    /// The base URL of the ingestion API
    #[serde(default = "default_server_api_url")]
    pub server_api_url: String,

    /// The call timeout in seconds. Default is 10 seconds
    pub timeout_secs: Option<u64>,
}

pub fn default_server_api_url() -> String {
    "https://api.mixpanel.com".to_owned()
}
