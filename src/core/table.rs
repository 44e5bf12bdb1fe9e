//! Multi-sensor time-series table.
//!
//! Columns are grouped by sensor (or marker) name and channel, mirroring
//! the two-level column layout the dataset is published with. Data is
//! stored column-major; every column has exactly as many values as the
//! index has rows.

use crate::error::{DatasetError, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::ops::Range;

/// Accelerometer channel names in the sensor frame.
pub const SF_ACC: [&str; 3] = ["acc_x", "acc_y", "acc_z"];

/// Gyroscope channel names in the sensor frame.
pub const SF_GYR: [&str; 3] = ["gyr_x", "gyr_y", "gyr_z"];

/// Name of the column group holding the synchronisation trigger.
pub const SYNC_GROUP: &str = "sync";

/// Row index of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeIndex {
    /// Absolute time of each sample
    Utc(Vec<DateTime<Utc>>),
    /// Seconds relative to some zero point
    Seconds(Vec<f64>),
    /// Plain frame numbers `0..n`
    Frames(usize),
}

impl TimeIndex {
    pub fn len(&self) -> usize {
        match self {
            TimeIndex::Utc(v) => v.len(),
            TimeIndex::Seconds(v) => v.len(),
            TimeIndex::Frames(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, range: Range<usize>) -> TimeIndex {
        match self {
            TimeIndex::Utc(v) => TimeIndex::Utc(v[range].to_vec()),
            TimeIndex::Seconds(v) => TimeIndex::Seconds(v[range].to_vec()),
            TimeIndex::Frames(_) => TimeIndex::Frames(range.len()),
        }
    }

    /// Render the index value of one row for export.
    pub fn label(&self, row: usize) -> String {
        match self {
            TimeIndex::Utc(v) => v[row].to_rfc3339(),
            TimeIndex::Seconds(v) => v[row].to_string(),
            TimeIndex::Frames(_) => row.to_string(),
        }
    }
}

/// Two-level column key: `(group, channel)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub group: String,
    pub channel: String,
}

impl ColumnKey {
    pub fn new(group: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            channel: channel.into(),
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.channel)
    }
}

/// A single column of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: ColumnKey,
    pub values: Vec<f64>,
}

/// A table of synchronised sensor (or marker) channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTable {
    index: TimeIndex,
    columns: Vec<Column>,
}

impl SensorTable {
    /// Create a table without columns.
    pub fn new(index: TimeIndex) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column keys in table order.
    pub fn keys(&self) -> Vec<&ColumnKey> {
        self.columns.iter().map(|c| &c.key).collect()
    }

    /// Append a column at the end of the table.
    pub fn push_column(&mut self, key: ColumnKey, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len() {
            return Err(DatasetError::Shape(format!(
                "column {key} has {} values, index has {}",
                values.len(),
                self.len()
            )));
        }
        if self.columns.iter().any(|c| c.key == key) {
            return Err(DatasetError::Shape(format!("duplicate column {key}")));
        }
        self.columns.push(Column { key, values });
        Ok(())
    }

    pub fn column(&self, group: &str, channel: &str) -> Option<&[f64]> {
        self.position(group, channel)
            .map(|i| self.columns[i].values.as_slice())
    }

    pub fn column_mut(&mut self, group: &str, channel: &str) -> Option<&mut Vec<f64>> {
        self.position(group, channel)
            .map(move |i| &mut self.columns[i].values)
    }

    fn position(&self, group: &str, channel: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.key.group == group && c.key.channel == channel)
    }

    /// Unique group names in order of first appearance.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for column in &self.columns {
            if !names.contains(&column.key.group.as_str()) {
                names.push(&column.key.group);
            }
        }
        names
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.columns.iter().any(|c| c.key.group == group)
    }

    /// Channel names of one group in table order.
    pub fn channels(&self, group: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.key.group == group)
            .map(|c| c.key.channel.as_str())
            .collect()
    }

    /// Copy of a single group with the same index.
    pub fn select_group(&self, group: &str) -> Option<SensorTable> {
        if !self.has_group(group) {
            return None;
        }
        Some(SensorTable {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.key.group == group)
                .cloned()
                .collect(),
        })
    }

    /// Copy of the table without one group.
    pub fn without_group(&self, group: &str) -> SensorTable {
        SensorTable {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.key.group != group)
                .cloned()
                .collect(),
        }
    }

    /// Append all columns of `other`, which must share the row count.
    pub fn append(&mut self, other: SensorTable) -> Result<()> {
        for column in other.columns {
            self.push_column(column.key, column.values)?;
        }
        Ok(())
    }

    /// Sort columns lexicographically by `(group, channel)`.
    pub fn sort_columns(&mut self) {
        self.columns.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Rename every group through `f`.
    pub fn rename_groups<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        for column in &mut self.columns {
            column.key.group = f(&column.key.group)?;
        }
        Ok(())
    }

    /// Rows in `range`; the range is clipped to the table bounds.
    pub fn slice_rows(&self, range: Range<usize>) -> SensorTable {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        SensorTable {
            index: self.index.slice(start..end),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    key: c.key.clone(),
                    values: c.values[start..end].to_vec(),
                })
                .collect(),
        }
    }

    /// Rows whose UTC time lies in `[start, stop]`.
    ///
    /// Bounds outside the recording are clipped.
    pub fn between(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<SensorTable> {
        let TimeIndex::Utc(times) = &self.index else {
            return Err(DatasetError::Shape(
                "time slicing requires an absolute time index".to_string(),
            ));
        };
        let first = times.partition_point(|t| *t < start);
        let last = times.partition_point(|t| *t <= stop);
        Ok(self.slice_rows(first..last.max(first)))
    }

    /// Replace the index with `row / rate_hz + offset_s` seconds.
    pub fn with_seconds_index(mut self, rate_hz: f64, offset_s: f64) -> SensorTable {
        let seconds = (0..self.len())
            .map(|i| i as f64 / rate_hz + offset_s)
            .collect();
        self.index = TimeIndex::Seconds(seconds);
        self
    }

    /// Write the table as CSV with `group/channel` headers.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["index".to_string()];
        header.extend(self.columns.iter().map(|c| c.key.to_string()));
        wtr.write_record(&header)?;
        for row in 0..self.len() {
            let mut record = vec![self.index.label(row)];
            record.extend(self.columns.iter().map(|c| {
                let v = c.values[row];
                if v.is_nan() {
                    String::new()
                } else {
                    v.to_string()
                }
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_table() -> SensorTable {
        let start = Utc.with_ymd_and_hms(2019, 5, 29, 10, 0, 0).unwrap();
        let times = (0..10).map(|i| start + Duration::milliseconds(i * 100)).collect();
        let mut table = SensorTable::new(TimeIndex::Utc(times));
        table
            .push_column(ColumnKey::new("r_heel", "acc_x"), (0..10).map(f64::from).collect())
            .unwrap();
        table
            .push_column(ColumnKey::new("l_heel", "acc_x"), vec![1.0; 10])
            .unwrap();
        table
            .push_column(ColumnKey::new("r_heel", "gyr_x"), vec![2.0; 10])
            .unwrap();
        table
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = sample_table();
        let result = table.push_column(ColumnKey::new("x", "y"), vec![0.0; 3]);
        assert!(matches!(result, Err(DatasetError::Shape(_))));
    }

    #[test]
    fn test_group_names_in_order() {
        let table = sample_table();
        assert_eq!(table.group_names(), vec!["r_heel", "l_heel"]);
        assert_eq!(table.channels("r_heel"), vec!["acc_x", "gyr_x"]);
    }

    #[test]
    fn test_sort_columns() {
        let mut table = sample_table();
        table.sort_columns();
        let keys: Vec<String> = table.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["l_heel/acc_x", "r_heel/acc_x", "r_heel/gyr_x"]);
    }

    #[test]
    fn test_between_is_inclusive() {
        let table = sample_table();
        let TimeIndex::Utc(times) = table.index().clone() else {
            panic!("expected utc index");
        };
        let sliced = table.between(times[2], times[5]).unwrap();
        assert_eq!(sliced.len(), 4);
        assert_eq!(sliced.column("r_heel", "acc_x").unwrap()[0], 2.0);
    }

    #[test]
    fn test_between_clips_to_recording() {
        let table = sample_table();
        let TimeIndex::Utc(times) = table.index().clone() else {
            panic!("expected utc index");
        };
        let sliced = table
            .between(times[0] - Duration::seconds(60), times[9] + Duration::seconds(60))
            .unwrap();
        assert_eq!(sliced.len(), 10);
    }

    #[test]
    fn test_slice_rows_clips() {
        let table = sample_table();
        assert_eq!(table.slice_rows(8..20).len(), 2);
        assert_eq!(table.slice_rows(20..30).len(), 0);
    }

    #[test]
    fn test_seconds_index() {
        let table = sample_table().with_seconds_index(10.0, -0.5);
        let TimeIndex::Seconds(seconds) = table.index() else {
            panic!("expected seconds index");
        };
        assert!((seconds[0] + 0.5).abs() < 1e-12);
        assert!((seconds[5] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_without_group_keeps_rows() {
        let table = sample_table();
        let rest = table.without_group("r_heel");
        assert_eq!(rest.len(), 10);
        assert_eq!(rest.group_names(), vec!["l_heel"]);
    }
}
