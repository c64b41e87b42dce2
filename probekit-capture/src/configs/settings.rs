use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::errors::ProbeError;
use crate::models::Method;

const DEFAULT_HOST: &str = "131.175.120.117";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sink {
    pub path: String,
}

impl Default for Sink {
    fn default() -> Self {
        Self { path: "data.json".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Coap {
    pub host: String,
    pub port: u16,
    pub resources: String,
    pub methods: Vec<String>,
    pub payload: String,
    /// Per-request timeout; `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for Coap {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: 5683,
            resources: "resources.txt".into(),
            methods: Method::ALL.iter().map(|m| m.to_string()).collect(),
            payload: String::new(),
            timeout_secs: 5,
        }
    }
}

impl Coap {
    pub fn methods(&self) -> Result<Vec<Method>, ProbeError> {
        self.methods.iter().map(|m| m.parse()).collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mqtt {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
    pub listen_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: 1883,
            topic: "#".into(),
            client_id: None,
            keep_alive_secs: 5,
            listen_secs: 60 * 60,
            poll_interval_ms: 1000,
        }
    }
}

impl Mqtt {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn listen_budget(&self) -> Duration {
        Duration::from_secs(self.listen_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Analyser {
    pub separator: String,
    pub noise_marker: String,
    pub hit_marker: String,
    pub content_separator: String,
    /// Separator in logs made only of coordinate lines.
    pub line_separator: String,
}

impl Default for Analyser {
    fn default() -> Self {
        Self {
            separator: " ".into(),
            noise_marker: "noise".into(),
            hit_marker: "hit".into(),
            content_separator: "||".into(),
            line_separator: "|".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub sink: Sink,
    pub coap: Coap,
    pub mqtt: Mqtt,
    pub analyser: Analyser,
}

impl Settings {
    /// Layers `default.toml`, `{RUN_MODE}.toml` and `PROBEKIT__*` variables.
    pub fn new(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let settings: Settings = Config::builder()
            .add_source(File::with_name(&config_dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&config_dir.join(&run_mode).to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("PROBEKIT").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coap.methods().map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.sink.path.trim().is_empty() {
            return Err(ConfigError::Message("sink.path must not be empty".into()));
        }

        Ok(())
    }
}
