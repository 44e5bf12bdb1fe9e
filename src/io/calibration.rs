//! Ferraris calibration files and their lookup.
//!
//! Calibration files are named `<sensor_id>_<type>_<YYYY-MM-DD_HH-MM>.json`
//! and may be stored in any subfolder of the calibration folder.

use crate::error::{DatasetError, Result};
use crate::io::recording::{Recording, RecordingWarning, WarningKind};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Calibrations further away from the recording than this raise a warning.
const MAX_CALIBRATION_AGE_DAYS: i64 = 30;

/// Calibration parameters as stored on disk.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize)]
struct CalibrationFile {
    K_a: [[f64; 3]; 3],
    R_a: [[f64; 3]; 3],
    b_a: [f64; 3],
    K_g: [[f64; 3]; 3],
    R_g: [[f64; 3]; 3],
    K_ga: [[f64; 3]; 3],
    b_g: [f64; 3],
}

/// Ferraris calibration with precomputed inverses.
#[derive(Debug, Clone, PartialEq)]
pub struct FerrarisCalibration {
    acc_inv: Matrix3<f64>,
    b_a: Vector3<f64>,
    gyr_inv: Matrix3<f64>,
    k_ga: Matrix3<f64>,
    b_g: Vector3<f64>,
}

fn matrix(m: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    )
}

impl FerrarisCalibration {
    /// Load a calibration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: CalibrationFile = serde_json::from_str(&content)?;

        let singular = || DatasetError::Calibration(format!("singular calibration matrix in {path:?}"));
        let acc = matrix(&raw.R_a) * matrix(&raw.K_a);
        let gyr = matrix(&raw.R_g) * matrix(&raw.K_g);

        Ok(Self {
            acc_inv: acc.try_inverse().ok_or_else(singular)?,
            b_a: Vector3::from(raw.b_a),
            gyr_inv: gyr.try_inverse().ok_or_else(singular)?,
            k_ga: matrix(&raw.K_ga),
            b_g: Vector3::from(raw.b_g),
        })
    }

    /// Calibrate one acc/gyr sample pair.
    ///
    /// `acc = (R_a K_a)⁻¹ (raw_acc - b_a)`,
    /// `gyr = (R_g K_g)⁻¹ (raw_gyr - K_ga acc - b_g)`.
    pub fn calibrate(&self, acc: Vector3<f64>, gyr: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let acc = self.acc_inv * (acc - self.b_a);
        let gyr = self.gyr_inv * (gyr - self.k_ga * acc - self.b_g);
        (acc, gyr)
    }

    /// Calibrate the acc and gyr channels of a recording in place.
    pub fn apply(&self, recording: &mut Recording) -> Result<()> {
        let take = |name: &str| {
            recording
                .channel(name)
                .map(<[f64]>::to_vec)
                .ok_or_else(|| DatasetError::MissingChannel {
                    sensor: recording.sensor_id.clone(),
                    channel: name.to_string(),
                })
        };
        let acc = [take("acc_x")?, take("acc_y")?, take("acc_z")?];
        let gyr = [take("gyr_x")?, take("gyr_y")?, take("gyr_z")?];

        let n = recording.len();
        let mut out_acc = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
        let mut out_gyr = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
        for i in 0..n {
            let (a, g) = self.calibrate(
                Vector3::new(acc[0][i], acc[1][i], acc[2][i]),
                Vector3::new(gyr[0][i], gyr[1][i], gyr[2][i]),
            );
            for axis in 0..3 {
                out_acc[axis][i] = a[axis];
                out_gyr[axis][i] = g[axis];
            }
        }

        for (name, values) in ["acc_x", "acc_y", "acc_z"].iter().zip(out_acc) {
            if let Some(column) = recording.channel_mut(name) {
                *column = values;
            }
        }
        for (name, values) in ["gyr_x", "gyr_y", "gyr_z"].iter().zip(out_gyr) {
            if let Some(column) = recording.channel_mut(name) {
                *column = values;
            }
        }
        Ok(())
    }
}

/// Sensor id and recording time encoded in a calibration file name.
fn parse_calibration_name(path: &Path) -> Option<(String, DateTime<Utc>)> {
    let stem = path.file_stem()?.to_str()?;
    let (sensor_id, _) = stem.split_once('_')?;
    let stamp = stem.get(stem.len().checked_sub(16)?..)?;
    let time = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d_%H-%M").ok()?;
    Some((sensor_id.to_lowercase(), time.and_utc()))
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            out.push(path);
        }
    }
    Ok(())
}

/// Find the calibration of `sensor_id` closest in time to `recorded_at`.
///
/// A missing calibration is an error. A calibration older or newer than
/// the allowed age is returned together with a warning.
pub fn find_closest_calibration(
    folder: &Path,
    sensor_id: &str,
    recorded_at: DateTime<Utc>,
) -> Result<(PathBuf, Option<RecordingWarning>)> {
    if !folder.is_dir() {
        return Err(DatasetError::Calibration(format!(
            "calibration folder {folder:?} does not exist"
        )));
    }
    let mut files = Vec::new();
    collect_json_files(folder, &mut files)?;

    let sensor_id_lower = sensor_id.to_lowercase();
    let (path, distance) = files
        .into_iter()
        .filter_map(|p| {
            let (id, time) = parse_calibration_name(&p)?;
            (id == sensor_id_lower).then(|| (p, (time - recorded_at).abs()))
        })
        .min_by_key(|(_, distance)| *distance)
        .ok_or_else(|| {
            DatasetError::Calibration(format!("no calibration found for sensor {sensor_id}"))
        })?;

    let warning = (distance > Duration::days(MAX_CALIBRATION_AGE_DAYS)).then(|| {
        RecordingWarning::new(
            WarningKind::Calibration,
            sensor_id,
            format!(
                "closest calibration {:?} is {} days away from the recording",
                path.file_name().unwrap_or_default(),
                distance.num_days()
            ),
        )
    });
    Ok((path, warning))
}
