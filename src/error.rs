//! Error type shared by all dataset accessors.

use crate::config::ConfigError;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Errors that can occur while reading or processing the dataset.
#[derive(Debug)]
pub enum DatasetError {
    /// No dataset location was configured
    NoDataFolder,
    /// The stored configuration could not be read
    Config(ConfigError),
    /// The configured location does not look like the dataset
    InvalidDataFolder { path: PathBuf, reason: String },
    /// A data property was requested while not exactly one row is selected
    NotSingle { rows: usize },
    /// The selected row names a participant but no test
    NoTestSelected { subject: String },
    /// The subject has no test with this name
    UnknownTest { subject: String, test: String },
    /// A sensor name or device id could not be resolved
    UnknownSensor(String),
    /// A sensor group lacks one of the expected channels
    MissingChannel { sensor: String, channel: String },
    /// No motion capture file exists for the subject/test
    NoMocapData { subject: String, test: String },
    /// Calibration could not be found or applied
    Calibration(String),
    /// Recordings could not be synchronised
    Synchronisation(String),
    /// Columns or indices of a table do not line up
    Shape(String),
    /// A file did not follow the expected format
    Format { path: PathBuf, message: String },
    /// The dataset checkout is not at the expected revision
    Revision(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl DatasetError {
    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DatasetError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::NoDataFolder => write!(
                f,
                "No data folder configured. Pass a data folder or run `sensor-position config --data-folder <path>`"
            ),
            DatasetError::Config(e) => write!(f, "Failed to load configuration: {e}"),
            DatasetError::InvalidDataFolder { path, reason } => write!(
                f,
                "The selected folder does not seem to be correct ({reason}). The selected folder is: {path:?}"
            ),
            DatasetError::NotSingle { rows } => write!(
                f,
                "Data can only be accessed for a single row, but {rows} rows are selected"
            ),
            DatasetError::NoTestSelected { subject } => {
                write!(f, "The selected row of subject {subject} has no test")
            }
            DatasetError::UnknownTest { subject, test } => {
                write!(f, "Subject {subject} has no test named {test}")
            }
            DatasetError::UnknownSensor(name) => write!(f, "Unknown sensor: {name}"),
            DatasetError::MissingChannel { sensor, channel } => {
                write!(f, "Sensor {sensor} has no channel {channel}")
            }
            DatasetError::NoMocapData { subject, test } => {
                write!(f, "No Mocap data exists for subject {subject} and test {test}")
            }
            DatasetError::Calibration(msg) => write!(f, "Calibration error: {msg}"),
            DatasetError::Synchronisation(msg) => write!(f, "Synchronisation error: {msg}"),
            DatasetError::Shape(msg) => write!(f, "Table shape error: {msg}"),
            DatasetError::Format { path, message } => {
                write!(f, "Format error in {path:?}: {message}")
            }
            DatasetError::Revision(msg) => write!(f, "Dataset revision error: {msg}"),
            DatasetError::Io(e) => write!(f, "IO error: {e}"),
            DatasetError::Json(e) => write!(f, "JSON error: {e}"),
            DatasetError::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Config(e) => Some(e),
            DatasetError::Io(e) => Some(e),
            DatasetError::Json(e) => Some(e),
            DatasetError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for DatasetError {
    fn from(e: ConfigError) -> Self {
        DatasetError::Config(e)
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(e: std::io::Error) -> Self {
        DatasetError::Io(e)
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(e: serde_json::Error) -> Self {
        DatasetError::Json(e)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(e: csv::Error) -> Self {
        DatasetError::Csv(e)
    }
}
