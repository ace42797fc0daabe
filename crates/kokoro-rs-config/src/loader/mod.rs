//! Layered configuration loader with requirement constraints.
//!
//! Discovers configuration layers (system, user, project, cwd, repo, runtime),
//! checks each against the schema, merges them under optional requirement
//! constraints, and produces the effective `KokoroConfig`.

mod layer_io;
mod merge;
mod schema;


use crate::{ConfigError, KokoroConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "kokoro.json5";
/// Config directory under user or repo roots.
const DEFAULT_CONFIG_DIR: &str = ".kokoro";
/// Marker entries that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/kokoro/kokoro.json5";
#[cfg(unix)]
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/kokoro/requirements.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\kokoro\\kokoro.json5";
#[cfg(windows)]
const SYSTEM_REQUIREMENTS_PATH: &str = "C:\\ProgramData\\kokoro\\requirements.json5";

/// Effective config plus the layers it was assembled from.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: KokoroConfig,
    /// Layers that were found and applied, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Origin of a config layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked values that later layers cannot override.
    Requirements,
    System,
    User,
    /// Config file at the detected project root.
    Project,
    /// Config file in the working directory.
    Cwd,
    /// `.kokoro/kokoro.json5` under the project root.
    Repo,
    /// Explicit override files (highest precedence).
    Runtime,
}

impl ConfigLayerSource {
    /// Short name used in error labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::System => "system",
            Self::User => "user",
            Self::Project => "project",
            Self::Cwd => "cwd",
            Self::Repo => "repo",
            Self::Runtime => "runtime",
        }
    }
}

/// A loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layer discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find local layers.
    pub cwd: PathBuf,
    /// System config path; `/etc/kokoro/kokoro.json5` on Unix by default.
    pub system_config_path: Option<PathBuf>,
    /// User config path; `~/.kokoro/kokoro.json5` by default.
    pub user_config_path: Option<PathBuf>,
    /// Requirements file whose values are locked.
    pub requirements_path: Option<PathBuf>,
    /// Override files applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    /// Entries whose presence marks a project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Options with default layer locations for `cwd`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            requirements_path: layer_io::default_requirements_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add an override file applied after every discovered layer.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl KokoroConfig {
    /// Load a single config file (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a config from JSON5 text (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the layered stack from default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load the layered stack from explicit locations.
    ///
    /// Precedence (low to high): system, user, project, cwd, repo, runtime.
    /// Requirements apply first and win over every other layer.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::normalize_path(&options.cwd)?;
        let mut stack = LayerStack::default();

        let requirements = match options.requirements_path.as_deref() {
            Some(path) => layer_io::read_optional(ConfigLayerSource::Requirements, path)?,
            None => None,
        };
        if let Some((layer, _)) = &requirements {
            stack.layers.push(layer.clone());
        }

        for (source, path) in [
            (ConfigLayerSource::System, options.system_config_path.as_deref()),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
        ] {
            if let Some(path) = path {
                stack.push_optional(source, path)?;
            }
        }

        let project_root = layer_io::find_project_root(&cwd, &options.project_root_markers);
        match project_root.as_ref() {
            Some(root) => debug!("resolved project root: {}", root.display()),
            None => debug!("project root not found; skipping project/repo layers"),
        }
        if let Some(root) = project_root.as_ref() {
            stack.push_optional(ConfigLayerSource::Project, &root.join(DEFAULT_CONFIG_FILE))?;
        }
        stack.push_optional(ConfigLayerSource::Cwd, &cwd.join(DEFAULT_CONFIG_FILE))?;
        if let Some(root) = project_root.as_ref() {
            let path = root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE);
            stack.push_optional(ConfigLayerSource::Repo, &path)?;
        }

        for path in &options.runtime_paths {
            let (layer, value) = layer_io::read_required(ConfigLayerSource::Runtime, path)?;
            debug!("loaded runtime layer (path={})", path.display());
            stack.layers.push(layer);
            stack.values.push(value);
        }

        let constraints = requirements.map(|(_, value)| value);
        let merged = merge::merge_layers(&stack.values, constraints.as_ref());
        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", stack.layers.len());
        Ok(LayeredConfig {
            config,
            layers: stack.layers,
        })
    }

    /// Check invariants that the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let memory = &self.memory;
        if memory.capacity == 0 {
            return Err(ConfigError::Invalid(
                "memory.capacity must be at least 1".to_string(),
            ));
        }
        if memory.recall.limit == 0 {
            return Err(ConfigError::Invalid(
                "memory.recall.limit must be at least 1".to_string(),
            ));
        }
        if memory.recall.min_score.is_some_and(|score| score < 0.0) {
            return Err(ConfigError::Invalid(
                "memory.recall.min_score must not be negative".to_string(),
            ));
        }
        for (name, value) in [
            (
                "memory.quality.near_duplicate_threshold",
                memory.quality.near_duplicate_threshold,
            ),
            ("memory.quality.min_importance", memory.quality.min_importance),
            (
                "memory.consolidation.similarity_threshold",
                memory.consolidation.similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 1"
                )));
            }
        }
        if memory.relations.graph_max_nodes == 0 {
            return Err(ConfigError::Invalid(
                "memory.relations.graph_max_nodes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Layers accumulated during discovery, deduplicated by canonical path.
#[derive(Default)]
struct LayerStack {
    layers: Vec<ConfigLayer>,
    values: Vec<Value>,
    seen: HashSet<PathBuf>,
}

impl LayerStack {
    fn push_optional(&mut self, source: ConfigLayerSource, path: &Path) -> Result<(), ConfigError> {
        if !self.seen.insert(layer_io::unique_path(path)) {
            debug!(
                "skipping duplicate layer (source={:?}, path={})",
                source,
                path.display()
            );
            return Ok(());
        }
        if let Some((layer, value)) = layer_io::read_optional(source, path)? {
            debug!("loaded {:?} layer (path={})", source, path.display());
            self.layers.push(layer);
            self.values.push(value);
        }
        Ok(())
    }
}

fn config_from_value(value: Value, label: &str) -> Result<KokoroConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: KokoroConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
