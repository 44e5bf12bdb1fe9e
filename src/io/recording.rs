//! Reader for raw IMU recordings exported as CSV.
//!
//! Each file starts with one header line of `key=value` pairs:
//!
//! ```text
//! # sampling_rate_hz=204.8; utc_start=2019-05-29T10:00:00.000; sync_role=master; version=0.14.0
//! counter,acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z,analog_0,analog_1,analog_2
//! 1000,0.1,0.0,9.81,0.0,0.0,0.0,0,0,512
//! ```
//!
//! `counter` is the synchronised sample counter shared by all sensors of a
//! session. The device id is taken from the file name
//! (`NilsPodX-<ID>_<suffix>.csv`).

use crate::core::table::{SF_ACC, SF_GYR};
use crate::error::{DatasetError, Result};
use crate::io::layout::sensor_id_from_file_name;
use crate::io::metadata::parse_timestamp;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// First firmware version that writes the current file layout.
const MIN_CURRENT_VERSION: (u32, u32, u32) = (0, 13, 0);

/// Role of a sensor in the wireless synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    Master,
    Slave,
    Disabled,
}

impl std::str::FromStr for SyncRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "master" => Ok(SyncRole::Master),
            "slave" => Ok(SyncRole::Slave),
            "disabled" => Ok(SyncRole::Disabled),
            other => Err(format!("invalid sync role '{other}'")),
        }
    }
}

/// Kinds of warnings raised while reading and preparing recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Recording was written by an old firmware and converted on load
    Legacy,
    /// Samples were lost during recording
    CorruptedPackage,
    /// Calibration is far away in time from the recording
    Calibration,
    /// Device clocks disagree with the synchronised counter
    Synchronisation,
    /// Non-finite values in the data
    InvalidSample,
}

impl WarningKind {
    /// Warnings that are expected for every recording of this hardware
    /// generation.
    pub fn is_benign(self) -> bool {
        !matches!(self, WarningKind::InvalidSample)
    }
}

/// A non-fatal problem found in a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingWarning {
    pub kind: WarningKind,
    pub sensor_id: String,
    pub message: String,
}

impl RecordingWarning {
    pub fn new(kind: WarningKind, sensor_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            sensor_id: sensor_id.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.sensor_id, self.message)
    }
}

/// Header information of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    pub sampling_rate_hz: f64,
    /// Time of the first sample
    pub utc_start: DateTime<Utc>,
    pub sync_role: SyncRole,
    pub version: (u32, u32, u32),
}

/// One raw recording of a single sensor.
#[derive(Debug, Clone)]
pub struct Recording {
    pub sensor_id: String,
    pub path: PathBuf,
    pub header: RecordingHeader,
    /// Synchronised sample counter, strictly increasing
    pub counter: Vec<u64>,
    /// Data channels in file order (everything except `counter`)
    pub channels: Vec<(String, Vec<f64>)>,
}

impl Recording {
    /// Read a recording and collect the warnings raised while reading it.
    pub fn from_file(path: &Path) -> Result<(Self, Vec<RecordingWarning>)> {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let sensor_id = sensor_id_from_file_name(file_name)
            .ok_or_else(|| DatasetError::format(path, "file name does not contain a sensor id"))?
            .to_string();

        let content = std::fs::read_to_string(path)?;
        let (header_line, body) = content
            .split_once('\n')
            .ok_or_else(|| DatasetError::format(path, "file is empty"))?;
        let header = parse_header(header_line).map_err(|m| DatasetError::format(path, m))?;

        let mut warnings = Vec::new();
        if header.version < MIN_CURRENT_VERSION {
            warnings.push(RecordingWarning::new(
                WarningKind::Legacy,
                &sensor_id,
                format!(
                    "recorded with firmware {}.{}.{}, legacy layout resolved",
                    header.version.0, header.version.1, header.version.2
                ),
            ));
        }

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());
        let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let counter_idx = names
            .iter()
            .position(|n| n == "counter")
            .ok_or_else(|| DatasetError::format(path, "missing column 'counter'"))?;
        for required in SF_ACC.iter().chain(SF_GYR.iter()) {
            if !names.iter().any(|n| n == required) {
                return Err(DatasetError::format(path, format!("missing column '{required}'")));
            }
        }

        let mut counter = Vec::new();
        let mut channels: Vec<(String, Vec<f64>)> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != counter_idx)
            .map(|(_, n)| (n.clone(), Vec::new()))
            .collect();

        let mut non_finite = 0usize;
        for (line_idx, row) in rdr.records().enumerate() {
            let rec = row?;
            let line = line_idx + 3; // header line + column line
            let raw_counter = rec.get(counter_idx).unwrap_or_default();
            let value: f64 = raw_counter.parse().map_err(|_| {
                DatasetError::format(path, format!("invalid counter '{raw_counter}' at line {line}"))
            })?;
            counter.push(value as u64);

            let mut channel = 0;
            for (i, field) in rec.iter().enumerate() {
                if i == counter_idx {
                    continue;
                }
                let v: f64 = field.parse().map_err(|_| {
                    DatasetError::format(path, format!("invalid value '{field}' at line {line}"))
                })?;
                if !v.is_finite() {
                    non_finite += 1;
                }
                channels[channel].1.push(v);
                channel += 1;
            }
        }

        if counter.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DatasetError::format(path, "counter is not strictly increasing"));
        }
        let lost: u64 = counter.windows(2).map(|w| w[1] - w[0] - 1).sum();
        if lost > 0 {
            warnings.push(RecordingWarning::new(
                WarningKind::CorruptedPackage,
                &sensor_id,
                format!("{lost} samples lost during recording"),
            ));
        }
        if non_finite > 0 {
            warnings.push(RecordingWarning::new(
                WarningKind::InvalidSample,
                &sensor_id,
                format!("{non_finite} non-finite values"),
            ));
        }

        Ok((
            Self {
                sensor_id,
                path: path.to_path_buf(),
                header,
                counter,
                channels,
            },
            warnings,
        ))
    }

    pub fn len(&self) -> usize {
        self.counter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counter.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.channels
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

fn parse_header(line: &str) -> std::result::Result<RecordingHeader, String> {
    let line = line
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| "missing '#' header line".to_string())?;

    let mut sampling_rate_hz = None;
    let mut utc_start = None;
    let mut sync_role = None;
    let mut version = None;

    for pair in line.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid header entry '{pair}'"))?;
        let value = value.trim();
        match key.trim() {
            "sampling_rate_hz" => {
                sampling_rate_hz = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("invalid sampling rate '{value}'"))?,
                )
            }
            "utc_start" => {
                utc_start =
                    Some(parse_timestamp(value).ok_or_else(|| format!("invalid utc_start '{value}'"))?)
            }
            "sync_role" => sync_role = Some(value.parse::<SyncRole>()?),
            "version" => version = Some(parse_version(value)?),
            // unknown keys are informational only
            _ => {}
        }
    }

    Ok(RecordingHeader {
        sampling_rate_hz: sampling_rate_hz.ok_or("missing sampling_rate_hz")?,
        utc_start: utc_start.ok_or("missing utc_start")?,
        sync_role: sync_role.ok_or("missing sync_role")?,
        version: version.unwrap_or((0, 0, 0)),
    })
}

fn parse_version(value: &str) -> std::result::Result<(u32, u32, u32), String> {
    let parts: Vec<u32> = value
        .trim_start_matches('v')
        .split('.')
        .map(|p| p.parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| format!("invalid version '{value}'"))?;
    match parts.as_slice() {
        [major, minor, patch] => Ok((*major, *minor, *patch)),
        [major, minor] => Ok((*major, *minor, 0)),
        _ => Err(format!("invalid version '{value}'")),
    }
}
