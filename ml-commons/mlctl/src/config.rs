use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use ml_engine::{algorithms::BUILTIN_PROVIDERS, AlgorithmRegistry, FunctionName};
use ml_registration::loopback::{InMemoryAccessControl, ModelGroupDirectory};
use serde::Deserialize;
use shared_event_bus::FileEventPublisher;
use shared_logging::{LogLevel, Telemetry};

/// Settings read from `mlctl.toml`.
#[derive(Debug, Clone, Default)]
pub struct MlctlConfig {
    pub telemetry: TelemetrySettings,
    pub engine: EngineSettings,
    pub access: AccessSettings,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub module: String,
    pub log_path: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
    pub level: LogLevel,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            module: "mlctl".into(),
            log_path: None,
            event_log: None,
            level: LogLevel::Info,
        }
    }
}

/// Algorithms the engine may dispatch to; empty allows every built-in.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub algorithms: Vec<FunctionName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub enabled: bool,
    pub admins: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MlctlConfigSerde {
    telemetry: TelemetrySerde,
    engine: EngineSerde,
    access: AccessSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelemetrySerde {
    module: Option<String>,
    log_path: Option<PathBuf>,
    event_log: Option<PathBuf>,
    level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EngineSerde {
    algorithms: Vec<String>,
}

impl MlctlConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading mlctl config {}", path.display()))?;
        let document: MlctlConfigSerde =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resolve = |candidate: PathBuf| {
            if candidate.is_absolute() {
                candidate
            } else {
                source_dir.join(candidate)
            }
        };

        let defaults = TelemetrySettings::default();
        let level = match document.telemetry.level {
            Some(level) => level
                .parse::<LogLevel>()
                .with_context(|| format!("telemetry.level in {}", path.display()))?,
            None => defaults.level,
        };
        let algorithms = document
            .engine
            .algorithms
            .iter()
            .map(|name| {
                name.parse::<FunctionName>()
                    .with_context(|| format!("engine.algorithms in {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            telemetry: TelemetrySettings {
                module: document.telemetry.module.unwrap_or(defaults.module),
                log_path: document.telemetry.log_path.map(&resolve),
                event_log: document.telemetry.event_log.map(&resolve),
                level,
            },
            engine: EngineSettings { algorithms },
            access: document.access,
        })
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Telemetry handle for `component`, or `None` when no sink is configured.
    pub fn telemetry(&self, component: &str) -> Result<Option<Telemetry>> {
        let settings = &self.telemetry;
        if settings.log_path.is_none() && settings.event_log.is_none() {
            return Ok(None);
        }
        let mut builder = Telemetry::builder(format!("{}.{component}", settings.module))
            .min_level(settings.level);
        if let Some(path) = &settings.log_path {
            builder = builder.log_path(path.clone());
        }
        if let Some(path) = &settings.event_log {
            let publisher = FileEventPublisher::new(path)
                .with_context(|| format!("opening event log {}", path.display()))?;
            builder = builder.event_publisher(Arc::new(publisher));
        }
        builder.build().map(Some)
    }

    /// Registry holding the allowed built-in providers.
    pub fn registry(&self) -> Result<AlgorithmRegistry> {
        let allowed = &self.engine.algorithms;
        let providers = BUILTIN_PROVIDERS
            .iter()
            .filter(|entry| allowed.is_empty() || allowed.contains(&entry.function_name))
            .copied()
            .collect::<Vec<_>>();
        AlgorithmRegistry::from_providers(&providers).context("building algorithm registry")
    }

    /// Access control over `directory` honouring the `[access]` section.
    pub fn access_control(&self, directory: ModelGroupDirectory) -> InMemoryAccessControl {
        InMemoryAccessControl::new(directory)
            .enabled(self.access.enabled)
            .admins(self.access.admins.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mlctl.toml");
        fs::write(
            &config_path,
            r#"
[telemetry]
log_path = "logs/mlctl.jsonl"
level = "warning"

[engine]
algorithms = ["kmeans", "LOCAL_SAMPLE_CALCULATOR"]

[access]
enabled = true
admins = ["root"]
"#,
        )
        .unwrap();
        let config = MlctlConfig::load(&config_path).unwrap();
        assert_eq!(config.telemetry.module, "mlctl");
        assert_eq!(config.telemetry.level, LogLevel::Warn);
        assert!(config.telemetry.log_path.as_ref().unwrap().is_absolute());
        assert_eq!(
            config.engine.algorithms,
            vec![FunctionName::KMeans, FunctionName::LocalSampleCalculator]
        );
        assert!(config.access.enabled);

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(FunctionName::LinearRegression));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mlctl.toml");
        fs::write(&config_path, "").unwrap();
        let config = MlctlConfig::load(&config_path).unwrap();
        assert!(config.telemetry("engine").unwrap().is_none());
        assert!(!config.access.enabled);
        assert_eq!(config.registry().unwrap().len(), FunctionName::ALL.len());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mlctl.toml");
        fs::write(&config_path, "[engine]\nalgorithms = [\"svm\"]\n").unwrap();
        let err = MlctlConfig::load(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("engine.algorithms"));
    }
}
