// Persisted client configuration
//
// A JSON file in the platform config directory carries the base URL, the
// optional Photon URL and the last ticket-granting ticket. Credentials are
// only ever taken from the environment or an interactive prompt and are
// never written to disk.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::Credentials;
use crate::errors::BonusdriveError;

const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_BASE_URL: &str = "https://bonusdrive.allianz.de";

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub photon_url: Option<String>,
    /// Ticket-granting ticket from the last successful handshake
    pub tgt: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            photon_url: None,
            tgt: None,
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("bonusdrive").join(CONFIG_FILE_NAME);
        Self::from_file(&config_path)
    }

    fn from_file(config_path: &Path) -> Option<Self> {
        if config_path.exists() {
            let file = std::fs::File::open(config_path).expect("Could not open config file");
            Some(serde_json::from_reader(file).expect("Could not parse config file"))
        } else {
            None
        }
    }

    /// Applies the `BONUSDRIVE_BASE_URL`, `BONUSDRIVE_PHOTON_URL` and
    /// `BONUSDRIVE_TGT` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("BONUSDRIVE_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(photon_url) = std::env::var("BONUSDRIVE_PHOTON_URL") {
            self.photon_url = Some(photon_url);
        }
        if let Ok(tgt) = std::env::var("BONUSDRIVE_TGT") {
            self.tgt = Some(tgt);
        }
    }

    pub fn save(&self) -> Result<(), BonusdriveError> {
        let config_path = dirs::config_dir()
            .ok_or(BonusdriveError::NoConfigDir)?
            .join("bonusdrive")
            .join(CONFIG_FILE_NAME);
        self.save_to(&config_path)
    }

    fn save_to(&self, config_path: &Path) -> Result<(), BonusdriveError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BonusdriveError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| BonusdriveError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| BonusdriveError::ConfigSerializeError { source: e })
    }
}

/// Credentials from `BONUSDRIVE_EMAIL` and `BONUSDRIVE_PASSWORD`, when both
/// are set and non-empty.
pub fn credentials_from_env() -> Option<Credentials> {
    let email = std::env::var("BONUSDRIVE_EMAIL").ok()?;
    let password = std::env::var("BONUSDRIVE_PASSWORD").ok()?;
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credentials { email, password })
}
