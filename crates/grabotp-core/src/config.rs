//! On-disk configuration: `OAuth2` client credentials and the account list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::account::AccountIdentity;
use crate::error::{Error, Result};

/// Directory name under the user's configuration directory.
pub const APP_DIR: &str = "grabotp";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.json";

/// Persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `OAuth2` client id registered with the provider.
    #[serde(default)]
    pub client_id: String,
    /// `OAuth2` client secret, for clients registered as confidential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Configured account addresses, in the order they were added.
    #[serde(default)]
    pub emails: Vec<AccountIdentity>,
}

impl Config {
    /// Default location of the configuration file.
    ///
    /// `~/.config/grabotp/config.json` on Unix-likes, the platform
    /// configuration directory on Windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the home or configuration directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let base = if cfg!(windows) {
            dirs::config_dir()
        } else {
            dirs::home_dir().map(|home| home.join(".config"))
        };

        base.map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or_else(|| Error::Config("cannot determine configuration directory".into()))
    }

    /// Loads the configuration from `path`. A missing file is an empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Returns the client id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no client id has been set.
    pub fn require_client_id(&self) -> Result<&str> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config(
                "missing client identifier; pass --client-id to `grabotp account add`".into(),
            ));
        }
        Ok(&self.client_id)
    }

    /// Adds an account. Returns `false` if it was already configured.
    pub fn add_account(&mut self, account: AccountIdentity) -> bool {
        if self.emails.iter().any(|e| e.matches(&account)) {
            return false;
        }
        self.emails.push(account);
        true
    }

    /// Removes an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if the account is not configured.
    pub fn remove_account(&mut self, account: &AccountIdentity) -> Result<()> {
        let before = self.emails.len();
        self.emails.retain(|e| !e.matches(account));

        if self.emails.len() == before {
            return Err(Error::AccountNotFound(account.to_string()));
        }
        Ok(())
    }

    /// Clears the client credentials and every account.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
