//! Per-subject metadata (`meta_data.json`).

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

const METADATA_FILE: &str = "meta_data.json";

/// Content of a subject's metadata file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectMetadata {
    /// Semantic position name -> device id
    pub sensors: BTreeMap<String, String>,
    /// Test name -> boundaries within the IMU session
    pub imu_tests: BTreeMap<String, ImuTest>,
    /// Test name -> start within the mocap recording, in file order
    pub mocap_test_start: Map<String, Value>,
    /// Everything else in the file
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Boundaries of one gait test within the IMU session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImuTest {
    #[serde(with = "timestamp_serde")]
    pub start: DateTime<Utc>,
    #[serde(with = "timestamp_serde")]
    pub stop: DateTime<Utc>,
    pub start_idx: i64,
    pub stop_idx: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubjectMetadata {
    /// Test names in the order of the metadata file.
    pub fn test_names(&self) -> Vec<String> {
        self.mocap_test_start.keys().cloned().collect()
    }

    /// Device id -> position name, with lowercased ids.
    pub fn sensor_map(&self) -> BTreeMap<String, String> {
        self.sensors
            .iter()
            .map(|(position, id)| (id.to_lowercase(), position.clone()))
            .collect()
    }

    pub fn imu_test(&self, subject: &str, test: &str) -> Result<&ImuTest> {
        self.imu_tests
            .get(test)
            .ok_or_else(|| DatasetError::UnknownTest {
                subject: subject.to_string(),
                test: test.to_string(),
            })
    }
}

fn metadata_path(config: &DatasetConfig, subject: &str) -> PathBuf {
    config.subject_dir(subject).join(METADATA_FILE)
}

/// Read the metadata of one subject.
pub fn metadata_subject(config: &DatasetConfig, subject: &str) -> Result<SubjectMetadata> {
    let content = std::fs::read_to_string(metadata_path(config, subject))?;
    Ok(serde_json::from_str(&content)?)
}

/// Overwrite the metadata of one subject.
///
/// The file is written pretty-printed with sorted keys so diffs in the
/// dataset repository stay small.
pub fn update_metadata_subject(
    config: &DatasetConfig,
    subject: &str,
    metadata: &SubjectMetadata,
) -> Result<()> {
    let value = sort_keys(serde_json::to_value(metadata)?);
    let content = serde_json::to_string_pretty(&value)?;
    std::fs::write(metadata_path(config, subject), content)?;
    Ok(())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serde support for the naive ISO timestamps of the metadata files.
///
/// Timestamps carry no zone and are interpreted as UTC.
mod timestamp_serde {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'")))
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(|naive| naive.and_utc())
    }
}

pub(crate) use timestamp_serde::parse as parse_timestamp;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    const SAMPLE: &str = r#"{
        "sensors": {"l_cavity": "2A14", "r_heel": "9e82", "sync": "C0FF"},
        "imu_tests": {
            "slow_10": {"start": "2019-05-29T10:01:00.500", "stop": "2019-05-29T10:01:20",
                        "start_idx": 12390, "stop_idx": 16486}
        },
        "mocap_test_start": {"slow_10": 10.0, "fast_10": 20.0, "normal_10": 5.0},
        "age": 27
    }"#;

    #[test]
    fn test_parse_metadata() {
        let meta: SubjectMetadata = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(meta.test_names(), vec!["slow_10", "fast_10", "normal_10"]);
        assert_eq!(meta.extra.get("age"), Some(&Value::from(27)));

        let test = meta.imu_test("4d91", "slow_10").unwrap();
        assert_eq!(test.start_idx, 12390);
        assert_eq!(test.start.nanosecond(), 500_000_000);
        assert_eq!(
            test.stop,
            Utc.with_ymd_and_hms(2019, 5, 29, 10, 1, 20).unwrap()
        );
    }

    #[test]
    fn test_sensor_map_is_lowercase() {
        let meta: SubjectMetadata = serde_json::from_str(SAMPLE).unwrap();
        let map = meta.sensor_map();
        assert_eq!(map.get("2a14").map(String::as_str), Some("l_cavity"));
        assert_eq!(map.get("c0ff").map(String::as_str), Some("sync"));
    }

    #[test]
    fn test_unknown_test() {
        let meta: SubjectMetadata = serde_json::from_str(SAMPLE).unwrap();
        assert!(matches!(
            meta.imu_test("4d91", "sprint"),
            Err(DatasetError::UnknownTest { .. })
        ));
    }

    #[test]
    fn test_sort_keys_recursively() {
        let value: Value = serde_json::from_str(r#"{"b": {"z": 1, "a": 2}, "a": [ {"y": 1, "x": 2} ]}"#).unwrap();
        let sorted = serde_json::to_string(&sort_keys(value)).unwrap();
        assert_eq!(sorted, r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2019-05-29T10:01:00").is_some());
        assert!(parse_timestamp("2019-05-29 10:01:00.25").is_some());
        assert!(parse_timestamp("2019-05-29T10:01:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
