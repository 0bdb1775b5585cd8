//! CLI settings file: the user's PAT plus the Logto app used to exchange it.
//!
//! ```yaml
//! pat: "pat_..."
//! logto:
//!   tenant_url: "https://<tenant>.logto.app"
//!   client_id: "..."
//!   client_secret: "..."   # optional
//!   scope: "profile"       # optional
//!   resource: "urn:api"    # optional
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_FILE_NAME: &str = ".logto-playground.yaml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not determine the user home directory")]
    NoHomeDir,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("PAT value cannot be empty")]
    EmptyPat,
    #[error("missing configuration keys: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
    #[serde(default)]
    pub logto: LogtoSettings,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogtoSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// Everything `deploy test` needs, checked present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTarget<'a> {
    pub pat: &'a str,
    pub tenant_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scope: Option<&'a str>,
    pub resource: Option<&'a str>,
}

/// `explicit` if given, else `$HOME/.logto-playground.yaml`.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, SettingsError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_FILE_NAME))
            .ok_or(SettingsError::NoHomeDir),
    }
}

impl CliSettings {
    /// Read the file; a missing or empty file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Write the file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(io_err)
    }

    pub fn set_pat(&mut self, value: &str) -> Result<(), SettingsError> {
        if value.trim().is_empty() {
            return Err(SettingsError::EmptyPat);
        }
        self.pat = Some(value.to_string());
        Ok(())
    }

    pub fn exchange_target(&self) -> Result<ExchangeTarget<'_>, SettingsError> {
        let pat = present(&self.pat);
        let tenant_url = present(&self.logto.tenant_url);
        let client_id = present(&self.logto.client_id);

        let mut missing = Vec::new();
        if pat.is_none() {
            missing.push("pat");
        }
        if tenant_url.is_none() {
            missing.push("logto.tenant_url");
        }
        if client_id.is_none() {
            missing.push("logto.client_id");
        }

        match (pat, tenant_url, client_id) {
            (Some(pat), Some(tenant_url), Some(client_id)) => Ok(ExchangeTarget {
                pat,
                tenant_url,
                client_id,
                client_secret: self.logto.client_secret.as_deref().unwrap_or_default(),
                scope: present(&self.logto.scope),
                resource: present(&self.logto.resource),
            }),
            _ => Err(SettingsError::MissingKeys(missing)),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
