//! CLI configuration
//!
//! Settings come from `~/.vxauth/vxauth.toml` (or `--config`), overridden by
//! `VXAUTH_`-prefixed environment variables. Nested keys use `__`, e.g.
//! `VXAUTH_MACHINE__ELECTION_HASH=...`.

use std::path::{Path, PathBuf};

use eyre::OptionExt;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use vxauth::{AuthConfig, MachineState};
use vxauth_apdu_transport_pcsc::{PcscConfig, ShareMode};

/// Everything the CLI can be configured with
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) auth: AuthConfig,
    pub(crate) machine: MachineState,
    pub(crate) reader: ReaderConfig,
}

/// Which reader to use and how
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ReaderConfig {
    /// Only use a reader whose name contains this
    pub(crate) name: Option<String>,
    pub(crate) share_mode: ShareMode,
}

impl ReaderConfig {
    pub(crate) fn pcsc_config(&self) -> PcscConfig {
        let config = PcscConfig::new().with_share_mode(self.share_mode);
        match &self.name {
            Some(name) => config.with_reader_name(name.clone()),
            None => config,
        }
    }
}

/// Base config directory
pub(crate) fn config_dir() -> eyre::Result<PathBuf> {
    Ok(std::env::home_dir()
        .ok_or_eyre("home directory not found")?
        .join(".vxauth"))
}

pub(crate) fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_dir()?.join("vxauth.toml"),
    };
    Ok(Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("VXAUTH_").split("__"))
        .extract()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(Some(Path::new("/nonexistent/vxauth.toml"))).unwrap();
        assert_eq!(config.auth, AuthConfig::default());
        assert_eq!(config.machine.election_hash, None);
        assert!(config.reader.name.is_none());
    }

    #[test]
    fn test_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[auth]
enable_poll_worker_pins = true

[machine]
election_hash = "ABC123"
allowed_user_roles = ["system_administrator"]

[reader]
name = "ACS"
share_mode = "shared"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(config.auth.enable_poll_worker_pins);
        assert_eq!(config.machine.election_hash.as_deref(), Some("ABC123"));
        assert_eq!(config.machine.allowed_user_roles.len(), 1);
        assert_eq!(config.reader.share_mode, ShareMode::Shared);
        assert!(config.reader.pcsc_config().matches_reader("ACS ACR39U"));
        assert!(!config.reader.pcsc_config().matches_reader("Other"));
    }
}
