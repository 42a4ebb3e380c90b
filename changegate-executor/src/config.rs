//! Service configuration loaded from YAML.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! public_base_url: https://gate.example.com
//! tool_id: changegate
//! wait:
//!   default_timeout_secs: 3600
//! store:
//!   kind: file
//!   path: /var/lib/changegate/registry.json
//! endpoints:
//!   default:
//!     url: https://cm.example.com/api/change
//!     auth: { type: basic, username: svc, password: secret }
//!   jobs:
//!     payments/:
//!       url: https://cm-payments.example.com/api/change
//!       auth: { type: token, token: abc }
//! ```

use crate::api::ServerConfig;
use crate::issuer::MAX_TIMEOUT;
use changegate_core::error::{GateError, Result};
use changegate_core::registry::{FileRegistryStore, MemoryRegistryStore, RegistryStore};
use changegate_core::transport::{Endpoint, EndpointResolver};
use changegate_core::types::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// HTTP listener.
    pub server: ServerSection,
    /// Externally reachable base URL used to build callback URLs.
    pub public_base_url: String,
    /// Prefix for minted tokens.
    pub tool_id: String,
    /// Wait timing.
    pub wait: WaitSection,
    /// Registry persistence.
    pub store: StoreSection,
    /// Change-control endpoints.
    pub endpoints: EndpointsSection,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Wait timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSection {
    /// Deadline applied when a request does not carry its own (0 = none).
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// How often the timeout processor scans the registry.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Retention for resolved and expired records.
    #[serde(default = "default_tombstone_ttl_secs")]
    pub tombstone_ttl_secs: u64,
}

/// Registry backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process memory only.
    #[default]
    Memory,
    /// JSON snapshot file.
    File,
}

/// Registry persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Backend.
    pub kind: StoreKind,
    /// Snapshot path (required for `file`).
    pub path: Option<PathBuf>,
}

/// Endpoint routing table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsSection {
    /// Endpoint used when no job prefix matches.
    pub default: Option<Endpoint>,
    /// Job-ID prefix to endpoint.
    pub jobs: BTreeMap<String, Endpoint>,
}

fn default_timeout_secs() -> u64 {
    3600
}
fn default_check_interval_ms() -> u64 {
    1000
}
fn default_tombstone_ttl_secs() -> u64 {
    3600
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for WaitSection {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            check_interval_ms: default_check_interval_ms(),
            tombstone_ttl_secs: default_tombstone_ttl_secs(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            public_base_url: "http://localhost:8080".to_string(),
            tool_id: "changegate".to_string(),
            wait: WaitSection::default(),
            store: StoreSection::default(),
            endpoints: EndpointsSection::default(),
        }
    }
}

impl WaitSection {
    /// Default deadline, `None` when waits are unbounded.
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_secs > 0).then(|| Duration::from_secs(self.default_timeout_secs))
    }

    /// Timeout processor scan interval.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Tombstone retention.
    pub fn tombstone_ttl(&self) -> Duration {
        Duration::from_secs(self.tombstone_ttl_secs)
    }
}

impl GateConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    /// Load configuration from a file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GateError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

        let mut config = Self::parse(&content, path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| GateError::YamlParse {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })
    }

    /// Apply `CHANGEGATE_HOST`, `CHANGEGATE_PORT` and `CHANGEGATE_PUBLIC_URL`.
    ///
    /// `lookup` resolves a variable name to its value.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CHANGEGATE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CHANGEGATE_PORT") {
            self.server.port = port.parse().map_err(|_| GateError::ConfigValue {
                field: "CHANGEGATE_PORT".to_string(),
                cause: format!("'{}' is not a valid port", port),
            })?;
        }
        if let Some(url) = lookup("CHANGEGATE_PUBLIC_URL") {
            self.public_base_url = url;
        }
        Ok(())
    }

    /// Check the configuration for values that would fail at runtime.
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.public_base_url) {
            return Err(config_error(
                "public_base_url",
                format!("'{}' must be an http(s) URL", self.public_base_url),
            ));
        }
        if self.tool_id.trim().is_empty() {
            return Err(config_error("tool_id", "must not be empty"));
        }
        if self.wait.default_timeout_secs > MAX_TIMEOUT.as_secs() {
            return Err(config_error(
                "wait.default_timeout_secs",
                format!("must not exceed {}", MAX_TIMEOUT.as_secs()),
            ));
        }
        if self.wait.check_interval_ms == 0 {
            return Err(config_error("wait.check_interval_ms", "must be positive"));
        }
        if self.store.kind == StoreKind::File && self.store.path.is_none() {
            return Err(config_error("store.path", "required when store.kind is 'file'"));
        }
        if let Some(default) = &self.endpoints.default {
            check_endpoint("endpoints.default", default)?;
        }
        for (prefix, endpoint) in &self.endpoints.jobs {
            check_endpoint(&format!("endpoints.jobs.{}", prefix), endpoint)?;
        }
        Ok(())
    }

    /// Listener configuration for the API server.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.server.host, self.server.port)
    }

    /// Endpoint resolver built from the `endpoints` section.
    pub fn endpoints(&self) -> ConfiguredEndpoints {
        ConfiguredEndpoints::new(self.endpoints.default.clone(), self.endpoints.jobs.clone())
    }

    /// Open the configured registry store.
    pub fn open_store(&self) -> Result<Arc<dyn RegistryStore>> {
        match (self.store.kind, &self.store.path) {
            (StoreKind::Memory, _) => Ok(Arc::new(MemoryRegistryStore::new())),
            (StoreKind::File, Some(path)) => Ok(Arc::new(FileRegistryStore::open(path)?)),
            (StoreKind::File, None) => Err(config_error(
                "store.path",
                "required when store.kind is 'file'",
            )),
        }
    }
}

fn config_error(field: &str, cause: impl Into<String>) -> GateError {
    GateError::ConfigValue {
        field: field.to_string(),
        cause: cause.into(),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn check_endpoint(field: &str, endpoint: &Endpoint) -> Result<()> {
    if is_http_url(&endpoint.url) {
        Ok(())
    } else {
        Err(config_error(
            field,
            format!("endpoint URL '{}' must be an http(s) URL", endpoint.url),
        ))
    }
}

/// Endpoint resolver backed by the configuration's routing table.
///
/// The longest job-ID prefix wins; jobs matching no prefix use the default.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredEndpoints {
    default: Option<Endpoint>,
    by_prefix: Vec<(String, Endpoint)>,
}

impl ConfiguredEndpoints {
    /// Build a resolver.
    pub fn new(default: Option<Endpoint>, jobs: BTreeMap<String, Endpoint>) -> Self {
        let mut by_prefix: Vec<_> = jobs.into_iter().collect();
        by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { default, by_prefix }
    }
}

impl EndpointResolver for ConfiguredEndpoints {
    fn resolve(&self, job_id: &JobId) -> Result<Endpoint> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| job_id.as_str().starts_with(prefix.as_str()))
            .map(|(_, endpoint)| endpoint)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| GateError::EndpointNotConfigured {
                job_id: job_id.clone(),
            })
    }
}
