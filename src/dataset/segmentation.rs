//! One row per participant with the full recording session.

use super::{DatasetIndex, DatasetSource, GaitDataset, IndexRow, SAMPLING_RATE_HZ};
use crate::cache::TableCache;
use crate::config::DatasetConfig;
use crate::core::labels::StrideLabel;
use crate::core::table::SensorTable;
use crate::error::Result;
use crate::io::labels::manual_labels;
use crate::io::layout::all_subjects;

/// Full sessions for stride segmentation.
#[derive(Debug, Clone)]
pub struct SegmentationDataset {
    source: DatasetSource,
    index: DatasetIndex,
}

impl SegmentationDataset {
    /// All participants except the wrongly recorded one.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        Self::build(DatasetSource::new(config))
    }

    fn build(source: DatasetSource) -> Result<Self> {
        let index = DatasetIndex::new(
            all_subjects(&source.config, source.include_wrong_recording)?
                .into_iter()
                .map(IndexRow::participant)
                .collect(),
        );
        Ok(Self { source, index })
    }

    /// Rebuild the index with or without the wrongly recorded participant.
    pub fn with_wrong_recording(self, include: bool) -> Result<Self> {
        Self::build(DatasetSource {
            include_wrong_recording: include,
            ..self.source
        })
    }

    pub fn with_cache(mut self, cache: TableCache) -> Self {
        self.source.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.source.config
    }

    /// Restrict the selection to one participant.
    pub fn subset(&self, participant: &str) -> Self {
        Self {
            source: self.source.clone(),
            index: self.index.subset(Some(participant), None),
        }
    }

    /// One single-row dataset per selected participant.
    pub fn iter_rows(&self) -> impl Iterator<Item = Self> + '_ {
        self.index.split_rows().into_iter().map(|index| Self {
            source: self.source.clone(),
            index,
        })
    }

    /// Aligned session data, indexed in seconds since the session start.
    pub fn data(&self) -> Result<SensorTable> {
        let row = self.index.single()?;
        let session = self.source.aligned_session(&row.participant)?;
        Ok(session.as_ref().clone().with_seconds_index(SAMPLING_RATE_HZ, 0.0))
    }
}

impl GaitDataset for SegmentationDataset {
    fn index(&self) -> &DatasetIndex {
        &self.index
    }

    /// All manual stride borders in session samples.
    fn segmented_stride_list(&self) -> Result<Vec<StrideLabel>> {
        let row = self.index.single()?;
        manual_labels(&self.source.config, &row.participant)
    }
}
