use std::{fs, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::Seconds;

/// Version of the settings layout this build understands
pub const SETTINGS_VERSION: u32 = 1;

/// Read access to the notifier settings and the host wide webcam setup
pub trait SettingsSource {
    /// Snapshot of the notifier settings, taken once per dispatch
    fn settings(&self) -> NotificationSettings;

    /// Still image URL of the printer webcam, if one is configured
    fn snapshot_url(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Layout version the file was written for
    #[serde(default = "default_settings_version")]
    pub settings_version: u32,

    /// Settings owned by the notifier
    #[serde(default)]
    pub emailnotifier: NotificationSettings,

    /// Host wide webcam settings
    #[serde(default)]
    pub webcam: WebcamConfig,

    /// Transport options not exposed through the notifier settings
    #[serde(default)]
    pub smtp: SmtpOptions,
}

fn default_settings_version() -> u32 {
    SETTINGS_VERSION
}

impl Config {
    pub fn load_from(config_path: &Path) -> anyhow::Result<Config> {
        debug!("Loading Config from: {config_path:?}");
        let file_contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read contents of {config_path:?}"))?;
        let result: Config = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse contents of {config_path:?}"))?;
        if result.settings_version > SETTINGS_VERSION {
            bail!(
                "{config_path:?} uses settings version {} but only version {SETTINGS_VERSION} is supported",
                result.settings_version
            );
        }
        Ok(result)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            emailnotifier: Default::default(),
            webcam: Default::default(),
            smtp: Default::default(),
        }
    }
}

impl SettingsSource for Config {
    fn settings(&self) -> NotificationSettings {
        self.emailnotifier.clone()
    }

    fn snapshot_url(&self) -> Option<String> {
        self.webcam
            .snapshot
            .as_ref()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Send a notification when a print job finishes
    pub enabled: bool,

    /// Comma separated list of recipients
    pub recipient_address: String,

    /// SMTP server, optionally as `host:port`
    pub mail_server: String,

    /// Sender address, also used to look up the SMTP password
    pub mail_username: String,

    /// Display name shown next to the sender address
    pub mail_useralias: String,

    /// Attach a webcam snapshot when one is configured
    pub include_snapshot: bool,

    pub message_format: MessageFormat,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            recipient_address: String::new(),
            mail_server: String::new(),
            mail_username: String::new(),
            mail_useralias: String::new(),
            include_snapshot: true,
            message_format: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFormat {
    pub title: String,
    pub body: String,
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self {
            title: "Print job complete".to_string(),
            body: "{filename} done printing after {elapsed_time}".to_string(),
        }
    }
}

/// The on disk document printed by the `defaults` subcommand
#[derive(Debug, Serialize)]
pub struct SettingsDocument {
    pub settings_version: u32,
    pub emailnotifier: NotificationSettings,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            emailnotifier: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebcamConfig {
    pub snapshot: Option<String>,

    /// How long to wait for the snapshot image
    pub snapshot_timeout: Seconds,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            snapshot_timeout: 10.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    StartTls,
    Tls,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmtpOptions {
    /// Used when the server setting carries no port
    pub port: Option<u16>,

    pub tls: TlsMode,

    /// Connection timeout
    pub timeout: Seconds,

    /// JSON object mapping usernames to SMTP passwords
    pub credentials_file: Option<PathBuf>,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            port: None,
            tls: TlsMode::default(),
            timeout: 10.into(),
            credentials_file: None,
        }
    }
}
