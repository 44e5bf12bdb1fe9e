//! CSV readers for the manual stride borders and the mocap gait events.

use crate::config::DatasetConfig;
use crate::core::labels::{scope_to_test, StrideLabel};
use crate::core::sensor::Foot;
use crate::core::windowing::TestWindow;
use crate::error::{DatasetError, Result};
use crate::io::metadata::metadata_subject;
use csv::StringRecord;
use std::collections::BTreeMap;
use std::path::Path;

const MANUAL_LABEL_FILE: &str = "manual_stride_border.csv";

fn column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DatasetError::format(path, format!("missing column '{name}'")))
}

fn parse_index(rec: &StringRecord, idx: usize, path: &Path, line: usize) -> Result<i64> {
    let s = rec.get(idx).unwrap_or_default();
    s.parse::<i64>()
        .or_else(|_| s.parse::<f64>().map(|v| v as i64))
        .map_err(|_| DatasetError::format(path, format!("invalid integer '{s}' at line {line}")))
}

/// Read a stride border file.
pub fn read_stride_labels(path: &Path) -> Result<Vec<StrideLabel>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = rdr.headers()?.clone();

    let s_id = column(&headers, "s_id", path)?;
    let start = column(&headers, "start", path)?;
    let end = column(&headers, "end", path)?;
    let foot = column(&headers, "foot", path)?;

    let mut labels = Vec::new();
    for (line_idx, row) in rdr.records().enumerate() {
        let rec = row?;
        let line = line_idx + 2;
        let foot_value = rec.get(foot).unwrap_or_default();
        labels.push(StrideLabel {
            s_id: parse_index(&rec, s_id, path, line)?,
            start: parse_index(&rec, start, path, line)?,
            end: parse_index(&rec, end, path, line)?,
            foot: foot_value
                .parse::<Foot>()
                .map_err(|e| DatasetError::format(path, format!("{e} at line {line}")))?,
            extra: headers
                .iter()
                .zip(rec.iter())
                .enumerate()
                .filter(|(i, _)| ![s_id, start, end, foot].contains(i))
                .map(|(_, (h, v))| (h.to_string(), v.to_string()))
                .collect(),
        });
    }
    Ok(labels)
}

/// All manual stride borders of a subject, in session samples.
pub fn manual_labels(config: &DatasetConfig, subject: &str) -> Result<Vec<StrideLabel>> {
    read_stride_labels(&config.subject_dir(subject).join(MANUAL_LABEL_FILE))
}

/// Manual stride borders of one test, relative to the test start.
pub fn manual_labels_for_test(
    config: &DatasetConfig,
    subject: &str,
    test: &str,
) -> Result<Vec<StrideLabel>> {
    let metadata = metadata_subject(config, subject)?;
    let window = TestWindow::from_metadata(&metadata, subject, test)?;
    let labels = manual_labels(config, subject)?;
    Ok(scope_to_test(&labels, window.start_idx, window.stop_idx))
}

/// Gait events detected in the mocap data, in mocap samples after the
/// start of the test.
#[derive(Debug, Clone, PartialEq)]
pub struct MocapEvents {
    /// Names of the event columns (without `foot`)
    pub columns: Vec<String>,
    /// One row of values per stride, per foot. Empty cells are `None`.
    pub per_foot: BTreeMap<Foot, Vec<Vec<Option<f64>>>>,
}

impl MocapEvents {
    /// Values of one event column for one foot.
    pub fn column(&self, foot: Foot, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.per_foot
                .get(&foot)
                .map(|rows| rows.iter().map(|r| r[idx]).collect())
                .unwrap_or_default(),
        )
    }
}

/// Read a `<test>_steps.csv` file.
pub fn read_mocap_events(path: &Path) -> Result<MocapEvents> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = rdr.headers()?.clone();
    let foot = column(&headers, "foot", path)?;
    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != foot)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut per_foot: BTreeMap<Foot, Vec<Vec<Option<f64>>>> = BTreeMap::new();
    for (line_idx, row) in rdr.records().enumerate() {
        let rec = row?;
        let line = line_idx + 2;
        let side = rec
            .get(foot)
            .unwrap_or_default()
            .parse::<Foot>()
            .map_err(|e| DatasetError::format(path, format!("{e} at line {line}")))?;
        let mut values = Vec::with_capacity(columns.len());
        for (i, field) in rec.iter().enumerate() {
            if i == foot {
                continue;
            }
            if field.is_empty() {
                values.push(None);
            } else {
                values.push(Some(field.parse::<f64>().map_err(|_| {
                    DatasetError::format(path, format!("invalid value '{field}' at line {line}"))
                })?));
            }
        }
        per_foot.entry(side).or_default().push(values);
    }
    Ok(MocapEvents { columns, per_foot })
}

/// Mocap gait events of one test.
pub fn mocap_events(config: &DatasetConfig, subject: &str, test: &str) -> Result<MocapEvents> {
    read_mocap_events(&config.mocap_dir(subject).join(format!("{test}_steps.csv")))
}
