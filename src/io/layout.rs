//! Discovery of subjects, tests and files in the dataset folder.

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::io::metadata::metadata_subject;
use std::path::PathBuf;

/// Subject whose first recording is missing one of the sensors.
pub const WRONG_RECORDING_SUBJECT: &str = "6dbe";

/// All subject ids in alphabetical order.
///
/// The incomplete recording of [`WRONG_RECORDING_SUBJECT`] is only listed
/// if `include_wrong_recording` is set.
pub fn all_subjects(config: &DatasetConfig, include_wrong_recording: bool) -> Result<Vec<String>> {
    let data_dir = config.data_dir();
    let mut names: Vec<String> = std::fs::read_dir(&data_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();

    if names.is_empty() || !names.iter().all(|n| n.len() == 4 || n.len() == 6) {
        return Err(DatasetError::InvalidDataFolder {
            path: data_dir,
            reason: "no subject folders found".to_string(),
        });
    }

    Ok(names
        .into_iter()
        .filter(|n| include_wrong_recording || n != WRONG_RECORDING_SUBJECT)
        .collect())
}

/// All tests a subject performed, in the order of the metadata file.
pub fn all_tests(config: &DatasetConfig, subject: &str) -> Result<Vec<String>> {
    Ok(metadata_subject(config, subject)?.test_names())
}

/// Device id encoded in a raw recording file name (`<prefix>-<ID>_<suffix>`).
pub fn sensor_id_from_file_name(file_name: &str) -> Option<&str> {
    let (_, rest) = file_name.split_once('-')?;
    let id = rest.split(['_', '.']).next()?;
    (!id.is_empty()).then_some(id)
}

/// Raw recordings of a subject, sorted by file name.
pub fn recording_files(config: &DatasetConfig, subject: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(config.imu_dir(subject))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Raw recording file of a sensor given by its position name (`l_cavity`).
pub fn sensor_file(
    config: &DatasetConfig,
    subject: &str,
    sensor_name: &str,
) -> Result<Option<PathBuf>> {
    let metadata = metadata_subject(config, subject)?;
    let sensor_id = metadata
        .sensors
        .get(sensor_name)
        .ok_or_else(|| DatasetError::UnknownSensor(sensor_name.to_string()))?
        .to_uppercase();

    Ok(recording_files(config, subject)?.into_iter().find(|f| {
        f.file_name()
            .and_then(|n| n.to_str())
            .and_then(sensor_id_from_file_name)
            .map(|id| id.to_uppercase().starts_with(&sensor_id))
            .unwrap_or(false)
    }))
}
