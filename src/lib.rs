//! Sensor Position Dataset - access helpers for a foot-worn IMU gait dataset.
//!
//! The dataset contains synchronised recordings of up to six IMUs per foot,
//! optical motion capture of the same gait tests, manually labeled stride
//! borders and per-subject metadata.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Sensor Position Dataset                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Recordings  │──▶│   Session   │──▶│  Alignment  │       │
//! │  │ Calibration │   │  (synced)   │   │ (foot frame)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                 │               │
//! │                           ▼                 ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Labels    │──▶│  Windowing  │──▶│  Datasets   │       │
//! │  │  Mocap/C3D  │   │ (per test)  │   │ (facades)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sensor_position_dataset::{DatasetConfig, GaitDataset, MocapDataset};
//!
//! let config = DatasetConfig::new("/data/sensor_position_dataset").unwrap();
//! let dataset = MocapDataset::new(config).unwrap().with_padding(3.0);
//!
//! let test = dataset.subset(Some("4d91"), Some("normal_10"));
//! let imu = test.data().unwrap();
//! let strides = test.segmented_stride_list().unwrap();
//! println!("{} samples, {} strides", imu.len(), strides.len());
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod io;
pub mod revision;
pub mod session;

// Re-export key types at crate root for convenience
pub use cache::TableCache;
pub use config::{Config, DatasetConfig};
pub use crate::core::{
    align_coordinates, rotate_dataset, ColumnKey, Foot, Position, Rotations, SensorName,
    SensorTable, StrideLabel, TestWindow, TimeIndex,
};
pub use dataset::{GaitDataset, MocapDataset, SegmentationDataset};
pub use error::{DatasetError, Result};
pub use revision::ensure_git_revision;
pub use session::{imu_test, load_session};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
