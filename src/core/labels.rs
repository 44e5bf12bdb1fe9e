//! Manually labeled stride borders.

use crate::core::sensor::{foot_sensors, Foot};
use serde::Serialize;
use std::collections::BTreeMap;

/// One manually labeled stride.
///
/// `start` and `end` are sample indices, either into the full session or
/// relative to the start of a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrideLabel {
    pub s_id: i64,
    pub start: i64,
    pub end: i64,
    pub foot: Foot,
    /// Additional columns of the label file, in file order
    pub extra: Vec<(String, String)>,
}

/// Start and end of a stride without the foot information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrideBorder {
    pub s_id: i64,
    pub start: i64,
    pub end: i64,
}

/// Keep labels fully inside `[start_idx, stop_idx]` and make them relative
/// to `start_idx`.
pub fn scope_to_test(labels: &[StrideLabel], start_idx: i64, stop_idx: i64) -> Vec<StrideLabel> {
    labels
        .iter()
        .filter(|l| l.start >= start_idx && l.end <= stop_idx)
        .map(|l| StrideLabel {
            start: l.start - start_idx,
            end: l.end - start_idx,
            ..l.clone()
        })
        .collect()
}

/// Shift all labels by `offset` samples.
pub fn shift(labels: &mut [StrideLabel], offset: i64) {
    for label in labels {
        label.start += offset;
        label.end += offset;
    }
}

/// Number of samples that `padding_s` seconds add in front of a test.
pub fn padding_samples(padding_s: f64, sampling_rate_hz: f64) -> i64 {
    (padding_s * sampling_rate_hz) as i64
}

/// Stride borders grouped by foot.
pub fn per_foot(labels: &[StrideLabel]) -> BTreeMap<Foot, Vec<StrideBorder>> {
    let mut out: BTreeMap<Foot, Vec<StrideBorder>> = BTreeMap::new();
    for label in labels {
        out.entry(label.foot).or_default().push(StrideBorder {
            s_id: label.s_id,
            start: label.start,
            end: label.end,
        });
    }
    out
}

/// Stride borders for every foot sensor.
///
/// A stride is assumed to be synchronous for all sensors on one foot, so
/// every sensor of a foot gets the same list.
pub fn per_sensor(labels: &[StrideLabel]) -> BTreeMap<String, Vec<StrideBorder>> {
    let by_foot = per_foot(labels);
    let mut out = BTreeMap::new();
    for foot in Foot::BOTH {
        let borders = by_foot.get(&foot).cloned().unwrap_or_default();
        for sensor in foot_sensors(foot, true) {
            out.insert(sensor, borders.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s_id: i64, start: i64, end: i64, foot: Foot) -> StrideLabel {
        StrideLabel {
            s_id,
            start,
            end,
            foot,
            extra: Vec::new(),
        }
    }

    fn labels() -> Vec<StrideLabel> {
        vec![
            label(0, 50, 250, Foot::Left),
            label(1, 100, 300, Foot::Left),
            label(2, 120, 320, Foot::Right),
            label(3, 350, 520, Foot::Right),
            label(4, 900, 1100, Foot::Left),
        ]
    }

    #[test]
    fn test_scope_keeps_only_labels_inside_test() {
        let scoped = scope_to_test(&labels(), 100, 520);
        let ids: Vec<i64> = scoped.iter().map(|l| l.s_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!((scoped[0].start, scoped[0].end), (0, 200));
        assert_eq!((scoped[2].start, scoped[2].end), (250, 420));
    }

    #[test]
    fn test_rebase_with_padding() {
        let rate = 204.8;
        let padding = 2.0;
        let mut scoped = scope_to_test(&labels(), 100, 520);
        shift(&mut scoped, padding_samples(padding, rate));
        // (s - start_idx + p * rate)
        assert_eq!(scoped[1].start, 120 - 100 + 409);
        assert_eq!(scoped[1].end, 320 - 100 + 409);
    }

    #[test]
    fn test_per_sensor_broadcasts_foot_labels() {
        let per_sensor = per_sensor(&labels());
        assert_eq!(per_sensor.len(), 12);
        assert_eq!(per_sensor["l_cavity"], per_sensor["l_insole"]);
        assert_eq!(per_sensor["l_heel"].len(), 3);
        assert_eq!(per_sensor["r_medial"].len(), 2);
        assert_eq!(
            per_sensor["r_medial"][0],
            StrideBorder {
                s_id: 2,
                start: 120,
                end: 320
            }
        );
    }

    #[test]
    fn test_per_sensor_without_strides_on_one_foot() {
        let only_left = vec![label(0, 0, 10, Foot::Left)];
        let per_sensor = per_sensor(&only_left);
        assert!(per_sensor["r_heel"].is_empty());
        assert_eq!(per_sensor["l_heel"].len(), 1);
    }
}
