use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use hookrelay_common_api::FlatData;
use hookrelay_sink_common::{Sink, SinkError};
use log::*;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub mod config;

use crate::config::MixpanelClientConfig;

/// A Sink that delivers events to the Mixpanel HTTP ingestion API.
#[derive(Clone)]
pub struct MixpanelSink {
    token: String,
    pub track_url: String,
    client: Client,
}

impl MixpanelSink {
    pub fn new(config: &MixpanelClientConfig) -> Result<MixpanelSink, SinkError> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(10)))
            .build()
            .map_err(|err| SinkError::ConfigurationError {
                message: format!("Error while building the Mixpanel client. Err: {:?}", err),
            })?;

        // The server API url should not contain the /track suffix.
        // Clean the URL as users have this suffix in their configuration.
        let mut server_api_url = config.server_api_url.replace("/track", "");
        if server_api_url.ends_with('/') {
            server_api_url = server_api_url[0..server_api_url.len() - 1].to_owned()
        }

        Ok(MixpanelSink {
            token: config.token.to_owned(),
            track_url: format!("{}/track", server_api_url),
            client,
        })
    }
}

/// Builds the message the /track endpoint expects: the event name plus the
/// flat data as properties, with the project token injected.
fn track_message(event_name: &str, data: &FlatData, token: &str) -> Value {
    let mut properties = Map::new();
    for (key, value) in data {
        properties.insert(key.to_owned(), Value::String(value.to_owned()));
    }
    properties.insert("token".to_owned(), Value::String(token.to_owned()));
    json!({ "event": event_name, "properties": properties })
}

#[async_trait::async_trait(?Send)]
impl Sink for MixpanelSink {
    async fn track(&self, event_name: &str, data: &FlatData) -> Result<(), SinkError> {
        let message = track_message(event_name, data, &self.token);
        let encoded = base64.encode(message.to_string());

        trace!("MixpanelSink - HTTP POST - url: {}", self.track_url);

        let response = self
            .client
            .post(&self.track_url)
            .form(&[("data", encoded.as_str())])
            .send()
            .await
            .map_err(|err| SinkError::TrackDeliveryError {
                message: format!("MixpanelSink - Connection failed. Err: {:?}", err),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| SinkError::TrackDeliveryError {
            message: format!("MixpanelSink - Cannot read the response body. Err: {:?}", err),
        })?;

        // The /track endpoint reports the outcome in the body: "1" when the
        // event was accepted, "0" when it was rejected.
        if !status.is_success() || body.trim() != "1" {
            return Err(SinkError::TrackDeliveryError {
                message: format!(
                    "MixpanelSink - The event was not accepted. Status: {}. Body: {}",
                    status, body
                ),
            });
        }

        debug!("MixpanelSink - event [{}] accepted", event_name);
        Ok(())
    }
}
