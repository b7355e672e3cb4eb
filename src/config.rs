use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use crate::observability::DEFAULT_LEVEL;
use crate::services::DEFAULT_SNAPSHOT_BASE_URL;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    #[serde(with = "duration_string")]
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for perfdaily's own targets: error, warn, info, debug or trace
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Base URL of snapshot reports; an empty string disables report links
    pub snapshot_base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: "./perfdaily-data".to_string(),
            database_url: None,
            max_connections: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            snapshot_base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown storage backend '{other}' (expected memory, file or postgres)"),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        LevelFilter::from_str(self.level.trim())
            .map_err(|_| anyhow::anyhow!("unknown log level '{}'", self.level))?;
        Ok(())
    }
}

impl ReportConfig {
    pub fn snapshot_base_url(&self) -> Option<String> {
        let base = self.snapshot_base_url.trim();
        (!base.is_empty()).then(|| base.to_string())
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        config.logging.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(host) = lookup("PERFDAILY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PERFDAILY_PORT") {
            self.server.port = port.parse()?;
        }
        if let Some(data_dir) = lookup("PERFDAILY_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(backend) = lookup("PERFDAILY_STORE") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = Some(url);
        }
        if let Some(level) = lookup("PERFDAILY_LOG_LEVEL") {
            self.logging.level = level;
            self.logging.validate()?;
        }
        Ok(())
    }
}

// Helper module for duration serialization
mod duration_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.strip_suffix('s') {
            Some(secs) => secs
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom),
            None => Err(serde::de::Error::custom(
                "Expected duration string ending with 's'",
            )),
        }
    }
}
