//! One row per (participant, test), synchronised with the motion capture.

use super::{
    DatasetIndex, DatasetSource, GaitDataset, IndexRow, MOCAP_SAMPLING_RATE_HZ,
    SAMPLING_RATE_HZ,
};
use crate::cache::TableCache;
use crate::config::DatasetConfig;
use crate::core::labels::StrideLabel;
use crate::core::table::SensorTable;
use crate::core::windowing::TestWindow;
use crate::error::{DatasetError, Result};
use crate::io::c3d::mocap_test;
use crate::io::labels::{manual_labels, mocap_events, MocapEvents};
use crate::io::layout::{all_subjects, all_tests};
use crate::io::metadata::metadata_subject;

/// Gait tests with IMU data, stride labels and marker trajectories.
#[derive(Debug, Clone)]
pub struct MocapDataset {
    source: DatasetSource,
    data_padding_s: f64,
    align_data: bool,
    index: DatasetIndex,
}

impl MocapDataset {
    /// All tests of all participants except the wrongly recorded one,
    /// aligned and without padding.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        let source = DatasetSource::new(config);
        Ok(Self {
            index: Self::create_index(&source)?,
            source,
            data_padding_s: 0.0,
            align_data: true,
        })
    }

    fn create_index(source: &DatasetSource) -> Result<DatasetIndex> {
        let mut rows = Vec::new();
        for subject in all_subjects(&source.config, source.include_wrong_recording)? {
            for test in all_tests(&source.config, &subject)? {
                rows.push(IndexRow::test(subject.clone(), test));
            }
        }
        Ok(DatasetIndex::new(rows))
    }

    /// Rebuild the index with or without the wrongly recorded participant.
    pub fn with_wrong_recording(mut self, include: bool) -> Result<Self> {
        self.source.include_wrong_recording = include;
        self.index = Self::create_index(&self.source)?;
        Ok(self)
    }

    /// Extend every test by `padding_s` seconds on both sides.
    pub fn with_padding(mut self, padding_s: f64) -> Self {
        self.data_padding_s = padding_s;
        self
    }

    /// Whether the IMU data is rotated into the foot frame.
    pub fn with_alignment(mut self, align_data: bool) -> Self {
        self.align_data = align_data;
        self
    }

    pub fn with_cache(mut self, cache: TableCache) -> Self {
        self.source.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.source.config
    }

    pub fn data_padding_s(&self) -> f64 {
        self.data_padding_s
    }

    pub fn mocap_sampling_rate_hz(&self) -> f64 {
        MOCAP_SAMPLING_RATE_HZ
    }

    /// Restrict the selection by participant and/or test.
    pub fn subset(&self, participant: Option<&str>, test: Option<&str>) -> Self {
        Self {
            index: self.index.subset(participant, test),
            ..self.clone()
        }
    }

    /// One single-row dataset per selected test.
    pub fn iter_rows(&self) -> impl Iterator<Item = Self> + '_ {
        self.index.split_rows().into_iter().map(|index| Self {
            index,
            ..self.clone()
        })
    }

    /// One dataset per selected participant.
    pub fn group_by_participant(&self) -> Vec<Self> {
        self.index
            .group_by_participant()
            .into_iter()
            .map(|index| Self {
                index,
                ..self.clone()
            })
            .collect()
    }

    fn selected(&self) -> Result<(&str, &str)> {
        let row = self.index.single()?;
        let test = row
            .test
            .as_deref()
            .ok_or_else(|| DatasetError::NoTestSelected {
                subject: row.participant.clone(),
            })?;
        Ok((&row.participant, test))
    }

    fn window(&self, subject: &str, test: &str) -> Result<TestWindow> {
        let metadata = metadata_subject(&self.source.config, subject)?;
        TestWindow::from_metadata(&metadata, subject, test)
    }

    /// IMU data of the selected test.
    ///
    /// The index is in seconds with `0` at the actual start of the test,
    /// so padded data starts at `-data_padding_s`.
    pub fn data(&self) -> Result<SensorTable> {
        let (subject, test) = self.selected()?;
        let session = if self.align_data {
            self.source.aligned_session(subject)?
        } else {
            self.source.session(subject)?
        };
        let window = self.window(subject, test)?;
        Ok(window
            .slice_time(&session, self.data_padding_s)?
            .with_seconds_index(SAMPLING_RATE_HZ, -self.data_padding_s))
    }

    /// Gait events of the mocap system per foot, in mocap samples after
    /// the start of the test. Padding is not applied.
    pub fn mocap_events(&self) -> Result<MocapEvents> {
        let (subject, test) = self.selected()?;
        mocap_events(&self.source.config, subject, test)
    }

    /// Marker trajectories of the selected test, indexed in seconds after
    /// the start of the test.
    pub fn marker_position(&self) -> Result<SensorTable> {
        let (subject, test) = self.selected()?;
        let markers = self.source.memoize("mocap", subject, Some(test), || {
            mocap_test(&self.source.config, subject, test)
        })?;
        Ok(markers
            .as_ref()
            .clone()
            .with_seconds_index(MOCAP_SAMPLING_RATE_HZ, 0.0))
    }
}

impl GaitDataset for MocapDataset {
    fn index(&self) -> &DatasetIndex {
        &self.index
    }

    /// Manual stride borders relative to the first row of [`Self::data`].
    fn segmented_stride_list(&self) -> Result<Vec<StrideLabel>> {
        let (subject, test) = self.selected()?;
        let window = self.window(subject, test)?;
        let labels = manual_labels(&self.source.config, subject)?;
        Ok(window.scope_labels(&labels, self.data_padding_s, SAMPLING_RATE_HZ))
    }
}
