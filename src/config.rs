use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use token_ledger::LedgerConfig;

/// `tledger.toml`. Every field is optional.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    /// Ledger snapshot (JSON) read before and written after each command.
    pub state_path: PathBuf,
    /// Hex-encoded ed25519 secret key of the signer.
    pub keypair_path: PathBuf,
    pub ledger: LedgerConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("ledger.json"),
            keypair_path: PathBuf::from("keys/sk.hex"),
            ledger: LedgerConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_path.as_os_str().is_empty() {
            bail!("state_path must not be empty");
        }
        if self.keypair_path.as_os_str().is_empty() {
            bail!("keypair_path must not be empty");
        }
        Ok(())
    }

    /// Command-line flags win over the file.
    pub fn with_overrides(mut self, state: Option<PathBuf>, keypair: Option<PathBuf>) -> Self {
        if let Some(state) = state {
            self.state_path = state;
        }
        if let Some(keypair) = keypair {
            self.keypair_path = keypair;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.ledger.bootstrap_balance, 1_000);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tledger.toml");
        fs::write(
            &path,
            "state_path = \"data/ledger.json\"\n[ledger]\ntrack_supply = false\n",
        )
        .unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.state_path, PathBuf::from("data/ledger.json"));
        assert_eq!(config.keypair_path, PathBuf::from("keys/sk.hex"));
        assert!(!config.ledger.track_supply);
        assert_eq!(config.ledger.bootstrap_balance, 1_000);
    }

    #[test]
    fn empty_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tledger.toml");
        fs::write(&path, "state_path = \"\"\n").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let config = CliConfig::default()
            .with_overrides(Some(PathBuf::from("other.json")), None);
        assert_eq!(config.state_path, PathBuf::from("other.json"));
        assert_eq!(config.keypair_path, PathBuf::from("keys/sk.hex"));
    }
}
