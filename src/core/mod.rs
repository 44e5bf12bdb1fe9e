//! Core data model and the pure table transformations.
//!
//! This module contains:
//! - The multi-sensor table and sensor naming
//! - The rotation table and rotation of sensor data
//! - Alignment of all sensors into the foot frame
//! - Slicing of sessions into tests and re-basing of stride labels

pub mod alignment;
pub mod labels;
pub mod rotation;
pub mod sensor;
pub mod table;
pub mod windowing;

// Re-export commonly used types
pub use alignment::align_coordinates;
pub use labels::{StrideBorder, StrideLabel};
pub use rotation::{rotate_dataset, Rotations, COORDINATE_TRANSFORMATIONS};
pub use sensor::{Foot, Position, SensorName};
pub use table::{ColumnKey, SensorTable, TimeIndex};
pub use windowing::TestWindow;
