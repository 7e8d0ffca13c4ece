//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/waldiez/waldiez.toml`
//! 3. Local config: `<flow_dir>/.waldiez.toml` (next to the flow file)
//! 4. Environment variables: `WALDIEZ_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Raw settings for intermediate parsing (Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub python: Option<String>,
    pub install_requirements: Option<bool>,
    pub output_dir_name: Option<String>,
    pub ag2_package: Option<String>,
    pub extra_requirements: Option<Vec<String>>,
}

/// Unified configuration for waldiez.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Interpreter used by `run` (default: python3, python on Windows)
    pub python: String,
    /// Install the flow's requirements with pip before running
    pub install_requirements: bool,
    /// Directory (next to `--output`) that receives run artifacts
    pub output_dir_name: String,
    /// ag2 distribution, optionally pinned (`ag2==0.9.7`)
    pub ag2_package: String,
    /// Requirements added to every flow
    pub extra_requirements: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let python = if cfg!(windows) { "python" } else { "python3" };
        Self {
            python: python.into(),
            install_requirements: false,
            output_dir_name: "waldiez_out".into(),
            ag2_package: "ag2".into(),
            extra_requirements: vec![],
        }
    }
}

/// Get the XDG config directory for waldiez.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "waldiez").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("waldiez.toml"))
}

/// Get the path to the local config file in a flow directory.
pub fn local_config_path(flow_dir: &Path) -> PathBuf {
    flow_dir.join(".waldiez.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.python = expand_env_vars(&self.python);
    }

    /// Merge local config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            python: overlay.python.clone().unwrap_or_else(|| self.python.clone()),
            install_requirements: overlay
                .install_requirements
                .unwrap_or(self.install_requirements),
            output_dir_name: overlay
                .output_dir_name
                .clone()
                .unwrap_or_else(|| self.output_dir_name.clone()),
            ag2_package: overlay
                .ag2_package
                .clone()
                .unwrap_or_else(|| self.ag2_package.clone()),
            extra_requirements: overlay
                .extra_requirements
                .as_ref()
                .map(|o| Self::merge_array(&self.extra_requirements, o))
                .unwrap_or_else(|| self.extra_requirements.clone()),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            extra_requirements: global
                .extra_requirements
                .clone()
                .unwrap_or_else(|| self.extra_requirements.clone()),
            ..self.merge_with(&RawSettings {
                extra_requirements: None,
                ..global.clone()
            })
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `flow_dir` - Optional directory of the flow file for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/waldiez/waldiez.toml` (arrays REPLACE defaults)
    /// 3. Local config: `<flow_dir>/.waldiez.toml` (arrays UNION with global)
    /// 4. Environment variables: `WALDIEZ_*` prefix (REPLACES - explicit override)
    pub fn load(flow_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = flow_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply WALDIEZ_* environment variables as explicit overrides.
    ///
    /// Env vars replace values (not merge) - they are explicit user overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("WALDIEZ")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("extra_requirements")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("python") {
            settings.python = val;
        }
        if let Ok(val) = config.get_bool("install_requirements") {
            settings.install_requirements = val;
        }
        if let Ok(val) = config.get_string("output_dir_name") {
            settings.output_dir_name = val;
        }
        if let Ok(val) = config.get_string("ag2_package") {
            settings.ag2_package = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("extra_requirements") {
            settings.extra_requirements = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# waldiez configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/waldiez/waldiez.toml  (defines your baseline)
#   Local:  <flow_dir>/.waldiez.toml        (per-directory additions)
#   Env:    WALDIEZ_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global. Use "!item" to REMOVE an inherited item:
#     extra_requirements = ["pandas", "!numpy"]

# Interpreter used by `waldiez run`
# python = "python3"

# Install the flow's requirements with pip before running
# install_requirements = false

# Directory next to --output that receives run artifacts
# output_dir_name = "waldiez_out"

# ag2 distribution, optionally pinned
# ag2_package = "ag2==0.9.7"

# Requirements added to every flow
# extra_requirements = []
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
