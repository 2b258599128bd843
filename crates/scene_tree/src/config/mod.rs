//! Configuration system
//!
//! Scene configuration can be loaded from TOML or RON files. Everything has a
//! sensible default so a missing file is never fatal for callers that use
//! `unwrap_or_default`-style fallbacks.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Appearance of the permanent world-axes node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldAxesConfig {
    /// Initial visibility of `/WorldAxes`
    pub visible: bool,
    /// Length of each axis
    pub axes_length: f32,
    /// Radius of each axis cylinder
    pub axes_radius: f32,
}

impl Default for WorldAxesConfig {
    fn default() -> Self {
        Self {
            visible: true,
            axes_length: 0.5,
            axes_radius: 0.0125,
        }
    }
}

/// # Scene Tree Configuration
///
/// Controls how the store treats contract violations and how the seeded tree
/// looks. `reset()` rebuilds the seeded tree from this configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTreeConfig {
    /// Contract violations (missing parent, invalid path, removing the root)
    /// are reported as errors when `true`, logged and dropped when `false`
    pub strict: bool,
    /// World axes settings
    pub world_axes: WorldAxesConfig,
}

impl Default for SceneTreeConfig {
    fn default() -> Self {
        Self {
            strict: true,
            world_axes: WorldAxesConfig::default(),
        }
    }
}

impl SceneTreeConfig {
    /// Lenient configuration: contract violations are logged and dropped
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }
}

impl Config for SceneTreeConfig {}
