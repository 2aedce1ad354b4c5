use serde::Deserialize;
use std::time::Duration;

use crate::application::retention::RetentionPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    /// Bucket width and heartbeat period
    pub bucket_ms: u64,
    pub retention_minutes: u64,
    pub command_queue: usize,
    /// Workspace activated at startup
    pub workspace: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bucket_ms: 100,
            retention_minutes: 360,
            command_queue: 1024,
            workspace: None,
        }
    }
}

impl EngineSettings {
    pub fn bucket(&self) -> Duration {
        Duration::from_millis(self.bucket_ms.max(1))
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_minutes(self.retention_minutes, self.bucket_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "data/charts.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Simulation,
    Gateway,
    None,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub gateway_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreamSettings {
    pub interval_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self { interval_ms: 250 }
    }
}

impl StreamSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// `config/tracer.*` if present, overridden by `TRACER__SECTION__KEY` env vars.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/tracer").required(false))
        .add_source(
            config::Environment::with_prefix("TRACER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
