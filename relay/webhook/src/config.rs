use clap::Parser;
use config_rs::{Config, ConfigError, File};
use hookrelay_common_logger::LoggerConfig;
use hookrelay_mapper_structure::config::StructureMapperConfig;
use hookrelay_sink_mixpanel::config::MixpanelClientConfig;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use crate::error::RelayError;

#[derive(Parser)]
#[clap(name = "hookrelay_webhook")]
pub struct RelayArgs {
    /// The filesystem folder where the webhook relay configuration is saved
    #[clap(short = 'c', long = "config-dir", default_value = "/etc/hookrelay_webhook")]
    pub config_dir: String,

    /// The file with the structure mapping configuration, in JSON format;
    /// this file is relative to the `config-dir`
    #[clap(long = "mapping-file", default_value = "mapping.json")]
    pub mapping_file: String,

    /// The named mode configuration to run with
    #[clap(index = 1, default_value = "test")]
    pub mode: String,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    /// The logger configuration
    pub logger: LoggerConfig,
    pub webhook_relay: WebhookRelayConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct WebhookRelayConfig {
    pub server_bind_address: String,
    pub modes: HashMap<String, ModeConfig>,
}

/// One named runtime configuration. A mode bundles the listening port and the
/// ingestion project the relay delivers to.
#[derive(Deserialize, Serialize, Clone)]
pub struct ModeConfig {
    /// Human readable description of the mode, logged at startup
    pub info: String,
    /// The ingestion project name
    pub name: String,
    pub port: u32,
    pub mixpanel: MixpanelClientConfig,
}

pub fn build_config(config_dir: &str) -> Result<RelayConfig, ConfigError> {
    let config_file_path = format!("{}/{}", &config_dir, "webhook_relay.toml");
    let mut s = Config::new();
    s.merge(File::with_name(&config_file_path))?;
    s.try_into()
}

/// Resolves the mode selected on the command line. An unrecognized mode is a
/// fatal startup error.
pub fn select_mode<'a>(
    config: &'a WebhookRelayConfig,
    mode: &str,
) -> Result<&'a ModeConfig, RelayError> {
    config.modes.get(mode).ok_or_else(|| RelayError::ConfigurationError {
        message: format!("no such mode/configuration: [{}]", mode),
    })
}

pub fn read_mapping_from_config(path: &str) -> Result<StructureMapperConfig, RelayError> {
    info!("Loading structure mapping configuration from file: [{}]", path);

    let mapping_body = fs::read_to_string(path).map_err(|e| RelayError::ConfigurationError {
        message: format!("Unable to open the file [{}]. Err: {}", path, e),
    })?;
    trace!("Structure mapping configuration body: \n{}", mapping_body);
    serde_json::from_str(&mapping_body).map_err(|e| RelayError::ConfigurationError {
        message: format!(
            "Cannot build the structure mapping from json config: [{:?}] \n error: [{}]",
            &mapping_body, e
        ),
    })
}
