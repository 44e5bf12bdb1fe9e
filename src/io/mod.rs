//! Readers for the files of the dataset.

pub mod c3d;
pub mod calibration;
pub mod labels;
pub mod layout;
pub mod metadata;
pub mod recording;

pub use layout::{all_subjects, all_tests, WRONG_RECORDING_SUBJECT};
pub use metadata::{metadata_subject, update_metadata_subject, SubjectMetadata};
