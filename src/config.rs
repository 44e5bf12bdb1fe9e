//! Configuration for locating the dataset.
//!
//! [`Config`] is the persisted user configuration (default dataset
//! location and padding). [`DatasetConfig`] is the validated value that is
//! passed explicitly into every accessor.

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the subfolder holding the per-subject data.
pub const DATA_SUBFOLDER: &str = "data";

/// Name of the subfolder holding the sensor calibration files.
pub const CALIBRATION_SUBFOLDER: &str = "calibrations";

/// Persisted user configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Root of the dataset checkout
    pub data_folder: Option<PathBuf>,

    /// Default padding around gait tests in seconds
    #[serde(default)]
    pub data_padding_s: f64,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults.
    pub fn load_from(path: &Path) -> std::result::Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> std::result::Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensor-position-dataset")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A validated dataset location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetConfig {
    root: PathBuf,
}

impl DatasetConfig {
    /// Use `root` as dataset location.
    ///
    /// Fails if the folder or its `data` subfolder does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DatasetError::InvalidDataFolder {
                path: root,
                reason: "folder does not exist".to_string(),
            });
        }
        if !root.join(DATA_SUBFOLDER).is_dir() {
            return Err(DatasetError::InvalidDataFolder {
                path: root,
                reason: format!("no '{DATA_SUBFOLDER}' subfolder"),
            });
        }
        Ok(Self { root })
    }

    /// Use `explicit` if given, otherwise the folder stored in [`Config`].
    ///
    /// A configuration file that cannot be read is an error, not a
    /// missing folder.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        Self::resolve_from(explicit, &Config::config_path())
    }

    /// Like [`Self::resolve`], reading the stored configuration from `config_path`.
    pub fn resolve_from(explicit: Option<PathBuf>, config_path: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::new(path);
        }
        match Config::load_from(config_path)?.data_folder {
            Some(path) => Self::new(path),
            None => Err(DatasetError::NoDataFolder),
        }
    }

    /// Root of the dataset checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder containing one subfolder per subject.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_SUBFOLDER)
    }

    pub fn calibration_dir(&self) -> PathBuf {
        self.root.join(CALIBRATION_SUBFOLDER)
    }

    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.data_dir().join(subject)
    }

    pub fn imu_dir(&self, subject: &str) -> PathBuf {
        self.subject_dir(subject).join("imu")
    }

    pub fn mocap_dir(&self, subject: &str) -> PathBuf {
        self.subject_dir(subject).join("mocap")
    }
}
