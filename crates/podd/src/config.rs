//! podd.toml configuration.
//!
//! Every key is optional. Values given on the command line are merged over
//! the file with [`DaemonConfig::merge`], and [`DaemonConfig::settings`]
//! fills in whatever is still unset.
//!
//! ```toml
//! listen = "0.0.0.0:8081"
//! data_dir = "/var/lib/podgrid"
//! db_file = "podgrid.redb"
//! kubeconfig = "/etc/podgrid/kubeconfig"
//! context = "prod"
//! log_json = true
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8081);
pub const DEFAULT_DATA_DIR: &str = "/var/lib/podgrid";
pub const DEFAULT_DB_FILE: &str = "podgrid.redb";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub listen: Option<SocketAddr>,
    pub data_dir: Option<PathBuf>,
    pub db_file: Option<String>,
    /// Kubeconfig file; when unset the client is inferred from the environment.
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub log_json: Option<bool>,
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub db_file: String,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub log_json: bool,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay `overrides` on `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: DaemonConfig) -> Self {
        Self {
            listen: overrides.listen.or(self.listen),
            data_dir: overrides.data_dir.or(self.data_dir),
            db_file: overrides.db_file.or(self.db_file),
            kubeconfig: overrides.kubeconfig.or(self.kubeconfig),
            context: overrides.context.or(self.context),
            log_json: overrides.log_json.or(self.log_json),
        }
    }

    pub fn settings(self) -> Settings {
        Settings {
            listen: self.listen.unwrap_or(DEFAULT_LISTEN),
            data_dir: self
                .data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            db_file: self.db_file.unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            kubeconfig: self.kubeconfig,
            context: self.context,
            log_json: self.log_json.unwrap_or(false),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}
