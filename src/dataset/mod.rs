//! Dataset facades over the on-disk layout.
//!
//! - [`SegmentationDataset`]: one row per participant, full sessions
//! - [`MocapDataset`]: one row per (participant, test), synchronised with
//!   the motion capture recordings
//!
//! Data accessors require that the current selection is a single row.

pub mod index;
pub mod mocap;
pub mod segmentation;

pub use index::{DatasetIndex, IndexRow};
pub use mocap::MocapDataset;
pub use segmentation::SegmentationDataset;

use crate::cache::{CacheKey, TableCache};
use crate::config::DatasetConfig;
use crate::core::alignment::align_coordinates;
use crate::core::labels::{per_sensor, StrideBorder, StrideLabel};
use crate::core::table::SensorTable;
use crate::error::Result;
use crate::session::load_session;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sampling rate of all IMU recordings.
pub const SAMPLING_RATE_HZ: f64 = 204.8;

/// Sampling rate of the motion capture system.
pub const MOCAP_SAMPLING_RATE_HZ: f64 = 100.0;

/// Settings shared by both facades.
#[derive(Debug, Clone)]
struct DatasetSource {
    config: DatasetConfig,
    include_wrong_recording: bool,
    cache: Option<TableCache>,
}

impl DatasetSource {
    fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            include_wrong_recording: false,
            cache: None,
        }
    }

    fn memoize<F>(
        &self,
        operation: &'static str,
        subject: &str,
        test: Option<&str>,
        compute: F,
    ) -> Result<Arc<SensorTable>>
    where
        F: FnOnce() -> Result<SensorTable>,
    {
        match &self.cache {
            Some(cache) => cache.cached(
                CacheKey::new(self.config.root(), operation, subject, test),
                compute,
            ),
            None => compute().map(Arc::new),
        }
    }

    /// Session of a subject with a UTC index.
    fn session(&self, subject: &str) -> Result<Arc<SensorTable>> {
        self.memoize("session", subject, None, || {
            load_session(&self.config, subject)
        })
    }

    /// Session of a subject with all sensors in the foot frame.
    fn aligned_session(&self, subject: &str) -> Result<Arc<SensorTable>> {
        self.memoize("aligned_session", subject, None, || {
            align_coordinates(self.session(subject)?.as_ref())
        })
    }
}

/// Behaviour shared by the dataset facades.
pub trait GaitDataset {
    /// Currently selected rows.
    fn index(&self) -> &DatasetIndex;

    fn sampling_rate_hz(&self) -> f64 {
        SAMPLING_RATE_HZ
    }

    fn is_single(&self) -> bool {
        self.index().is_single()
    }

    /// Manually labeled strides of the selected row.
    fn segmented_stride_list(&self) -> Result<Vec<StrideLabel>>;

    /// Stride borders of the selected row for every foot sensor.
    fn segmented_stride_list_per_sensor(&self) -> Result<BTreeMap<String, Vec<StrideBorder>>> {
        Ok(per_sensor(&self.segmented_stride_list()?))
    }
}
