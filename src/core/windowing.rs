//! Slicing of a recording session into the individual gait tests.
//!
//! Test boundaries are known twice: as timestamps (used to cut the IMU
//! session) and as sample indices (used to re-base the stride labels).
//! Both are symmetrically extended by an optional padding.

use crate::core::labels::{padding_samples, scope_to_test, shift, StrideLabel};
use crate::core::table::SensorTable;
use crate::error::Result;
use crate::io::metadata::SubjectMetadata;
use chrono::{DateTime, Duration, Utc};

/// Boundaries of one gait test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestWindow {
    pub subject: String,
    pub test: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub start_idx: i64,
    pub stop_idx: i64,
}

fn seconds(padding_s: f64) -> Duration {
    Duration::nanoseconds((padding_s * 1e9).round() as i64)
}

impl TestWindow {
    /// Look up the window of `test` in a subject's metadata.
    pub fn from_metadata(metadata: &SubjectMetadata, subject: &str, test: &str) -> Result<Self> {
        let imu_test = metadata.imu_test(subject, test)?;
        Ok(Self {
            subject: subject.to_string(),
            test: test.to_string(),
            start: imu_test.start,
            stop: imu_test.stop,
            start_idx: imu_test.start_idx,
            stop_idx: imu_test.stop_idx,
        })
    }

    /// Number of samples of the unpadded test.
    pub fn sample_count(&self) -> i64 {
        self.stop_idx - self.start_idx
    }

    /// Time range `[start - padding, stop + padding]`.
    pub fn time_bounds(&self, padding_s: f64) -> (DateTime<Utc>, DateTime<Utc>) {
        let padding = seconds(padding_s);
        (self.start - padding, self.stop + padding)
    }

    /// Rows of an absolute-time table that belong to the padded test.
    ///
    /// Padding beyond the recorded session is silently truncated.
    pub fn slice_time(&self, session: &SensorTable, padding_s: f64) -> Result<SensorTable> {
        let (start, stop) = self.time_bounds(padding_s);
        session.between(start, stop)
    }

    /// Rows `[start_idx - padding, stop_idx + padding)` of a table indexed
    /// by session sample, truncated at the table bounds.
    pub fn slice_samples(&self, table: &SensorTable, padding: i64) -> SensorTable {
        let start = (self.start_idx - padding).max(0) as usize;
        let stop = (self.stop_idx + padding).max(0) as usize;
        table.slice_rows(start..stop.max(start))
    }

    /// Labels inside this test, relative to the (padded) test start.
    pub fn scope_labels(
        &self,
        labels: &[StrideLabel],
        padding_s: f64,
        sampling_rate_hz: f64,
    ) -> Vec<StrideLabel> {
        let mut scoped = scope_to_test(labels, self.start_idx, self.stop_idx);
        if padding_s != 0.0 {
            shift(&mut scoped, padding_samples(padding_s, sampling_rate_hz));
        }
        scoped
    }
}
