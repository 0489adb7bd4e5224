//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/morphaug/morphaug.toml`
//! 3. Local config: `<dir>/.morphaug.toml` (working directory for the CLI)
//! 4. Environment variables: `MORPHAUG_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::perturb::{DropParams, Perturbation, Pipeline, PointParams, WeightingStrategy};
use crate::util::path::expand_env_vars;

/// Operator names usable in the `pipeline` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Point,
    Drop,
    Rotate,
}

impl std::str::FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "drop" => Ok(Self::Drop),
            "rotate" => Ok(Self::Rotate),
            other => Err(format!("unknown operator: {other}")),
        }
    }
}

/// Raw point config for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPointConfig {
    pub proportion: Option<f64>,
    pub max_shift: Option<f64>,
}

/// Raw drop config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDropConfig {
    pub fraction: Option<f64>,
    pub max_branches: Option<usize>,
    pub weighting: Option<WeightingStrategy>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub seed: Option<u64>,
    pub views: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub pipeline: Option<Vec<OpKind>>,
    pub point: RawPointConfig,
    pub drop: RawDropConfig,
}

/// Unified configuration for morphaug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Batch seed; a random one is drawn (and logged) when absent
    pub seed: Option<u64>,
    /// Augmented views written per neuron
    pub views: usize,
    /// Destination for augmented files (default: beside each input)
    pub output_dir: Option<PathBuf>,
    /// Operators applied, in order
    pub pipeline: Vec<OpKind>,
    pub point: PointParams,
    pub drop: DropParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            views: 2,
            output_dir: None,
            pipeline: vec![OpKind::Point, OpKind::Drop, OpKind::Rotate],
            point: PointParams::default(),
            drop: DropParams::default(),
        }
    }
}

/// Get the XDG config directory for morphaug.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "morphaug").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("morphaug.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".morphaug.toml")
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
    /// Operators of the configured pipeline with their configured parameters.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_of(&self.pipeline)
    }

    /// A pipeline over `ops`, parameterized from these settings.
    pub fn pipeline_of(&self, ops: &[OpKind]) -> Pipeline {
        Pipeline::new(
            ops.iter()
                .map(|op| match op {
                    OpKind::Point => Perturbation::Point(self.point),
                    OpKind::Drop => Perturbation::Drop(self.drop),
                    OpKind::Rotate => Perturbation::Rotate,
                })
                .collect(),
        )
    }

    /// Check operator parameters up front, before any file is touched.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.point.validate()?;
        self.drop.validate()?;
        if self.views == 0 {
            return Err(ApplicationError::Config {
                message: "views must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(dir) = &self.output_dir {
            self.output_dir = Some(PathBuf::from(expand_env_vars(&dir.to_string_lossy())));
        }
    }

    /// Merge overlay config onto self (base): overlay wins where specified.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            seed: overlay.seed.or(self.seed),
            views: overlay.views.unwrap_or(self.views),
            output_dir: overlay
                .output_dir
                .clone()
                .or_else(|| self.output_dir.clone()),
            pipeline: overlay
                .pipeline
                .clone()
                .unwrap_or_else(|| self.pipeline.clone()),
            point: PointParams {
                proportion: overlay.point.proportion.unwrap_or(self.point.proportion),
                max_shift: overlay.point.max_shift.unwrap_or(self.point.max_shift),
            },
            drop: DropParams {
                fraction: overlay.drop.fraction.unwrap_or(self.drop.fraction),
                max_branches: overlay.drop.max_branches.unwrap_or(self.drop.max_branches),
                weighting: overlay.drop.weighting.unwrap_or(self.drop.weighting),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.morphaug.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/morphaug/morphaug.toml`
    /// 3. Local config: `<local_dir>/.morphaug.toml`
    /// 4. Environment variables: `MORPHAUG_*` prefix
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
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

    /// Apply MORPHAUG_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MORPHAUG")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("seed") {
            settings.seed = Some(parse_env("seed", &val)?);
        }
        if let Ok(val) = config.get_string("views") {
            settings.views = parse_env("views", &val)?;
        }
        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("pipeline") {
            settings.pipeline = val
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<OpKind>())
                .collect::<Result<_, _>>()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_string("point.proportion") {
            settings.point.proportion = parse_env("point.proportion", &val)?;
        }
        if let Ok(val) = config.get_string("point.max_shift") {
            settings.point.max_shift = parse_env("point.max_shift", &val)?;
        }
        if let Ok(val) = config.get_string("drop.fraction") {
            settings.drop.fraction = parse_env("drop.fraction", &val)?;
        }
        if let Ok(val) = config.get_string("drop.max_branches") {
            settings.drop.max_branches = parse_env("drop.max_branches", &val)?;
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
        r#"# morphaug configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/morphaug/morphaug.toml
#   Local:  ./.morphaug.toml
#   Env:    MORPHAUG_* environment variables (MORPHAUG_DROP__FRACTION=0.05)

# Batch seed (omit for a random seed, which is logged)
# seed = 42

# Augmented views per neuron
# views = 2

# Output directory (default: beside each input)
# output_dir = "~/augmented"

# Operators, applied in order
# pipeline = ["point", "drop", "rotate"]

[point]
# Share of non-root nodes to jitter
# proportion = 0.5
# Maximum shift per node (µm)
# max_shift = 10.0

[drop]
# Share of the total node count to remove
# fraction = 0.02
# Maximum branches dropped per call
# max_branches = 8

# Drop-probability model: inverse_length | inverse_subtree_length | uniform
# [drop.weighting]
# kind = "inverse_length"
"#
        .to_string()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ApplicationError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ApplicationError::Config {
        message: format!("MORPHAUG {key}={value}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
