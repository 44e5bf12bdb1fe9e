//! Row index of the dataset facades.

use crate::error::{DatasetError, Result};
use serde::Serialize;

/// One addressable unit of a dataset: a participant, optionally narrowed to
/// one test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexRow {
    pub participant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
}

impl IndexRow {
    pub fn participant(participant: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            test: None,
        }
    }

    pub fn test(participant: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            test: Some(test.into()),
        }
    }
}

impl std::fmt::Display for IndexRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.test {
            Some(test) => write!(f, "{}/{}", self.participant, test),
            None => write!(f, "{}", self.participant),
        }
    }
}

/// Ordered selection of index rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetIndex {
    rows: Vec<IndexRow>,
}

impl DatasetIndex {
    pub fn new(rows: Vec<IndexRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.rows.len() == 1
    }

    /// The selected row, if exactly one row is selected.
    pub fn single(&self) -> Result<&IndexRow> {
        match self.rows.as_slice() {
            [row] => Ok(row),
            rows => Err(DatasetError::NotSingle { rows: rows.len() }),
        }
    }

    pub fn get(&self, i: usize) -> Option<&IndexRow> {
        self.rows.get(i)
    }

    /// Rows matching all given filters.
    pub fn subset(&self, participant: Option<&str>, test: Option<&str>) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| participant.map_or(true, |p| r.participant == p))
                .filter(|r| test.map_or(true, |t| r.test.as_deref() == Some(t)))
                .cloned()
                .collect(),
        }
    }

    /// Unique participants in row order.
    pub fn participants(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.participant.as_str()) {
                out.push(&row.participant);
            }
        }
        out
    }

    /// One index per participant.
    pub fn group_by_participant(&self) -> Vec<Self> {
        self.participants()
            .into_iter()
            .map(|p| self.subset(Some(p), None))
            .collect()
    }

    /// One index per row.
    pub fn split_rows(&self) -> Vec<Self> {
        self.rows
            .iter()
            .map(|r| Self {
                rows: vec![r.clone()],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DatasetIndex {
        DatasetIndex::new(vec![
            IndexRow::test("4d91", "fast_10"),
            IndexRow::test("4d91", "slow_10"),
            IndexRow::test("5237", "fast_10"),
        ])
    }

    #[test]
    fn test_single() {
        let index = index();
        assert!(matches!(
            index.single(),
            Err(DatasetError::NotSingle { rows: 3 })
        ));
        let one = index.subset(Some("5237"), None);
        assert!(one.is_single());
        assert_eq!(one.single().unwrap().test.as_deref(), Some("fast_10"));
        assert!(matches!(
            DatasetIndex::default().single(),
            Err(DatasetError::NotSingle { rows: 0 })
        ));
    }

    #[test]
    fn test_subset_and_groups() {
        let index = index();
        assert_eq!(index.subset(None, Some("fast_10")).len(), 2);
        assert_eq!(index.subset(Some("4d91"), Some("slow_10")).len(), 1);
        assert!(index.subset(Some("ffff"), None).is_empty());

        assert_eq!(index.participants(), vec!["4d91", "5237"]);
        let groups = index.group_by_participant();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(index.split_rows().len(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(IndexRow::test("4d91", "fast_10").to_string(), "4d91/fast_10");
        assert_eq!(IndexRow::participant("4d91").to_string(), "4d91");
    }
}
