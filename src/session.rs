//! Assembly of all IMU recordings of one subject into a single session table.
//!
//! Loading a session reads every raw recording of the subject, cuts them to
//! the counter range all sensors have in common, calibrates them and merges
//! them into one table indexed by UTC time. Sensors are renamed from their
//! device id to their mounting position and known mounting errors are
//! corrected.

use crate::config::DatasetConfig;
use crate::core::rotation::{rotate_dataset, rotation_from_angle};
use crate::core::table::{ColumnKey, SensorTable, TimeIndex, SYNC_GROUP};
use crate::core::windowing::TestWindow;
use crate::error::{DatasetError, Result};
use crate::io::calibration::{find_closest_calibration, FerrarisCalibration};
use crate::io::layout::recording_files;
use crate::io::metadata::metadata_subject;
use crate::io::recording::{Recording, RecordingWarning, SyncRole, WarningKind};
use chrono::Duration;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Subjects whose left cavity sensor was mounted rotated by 180°.
pub const FIXUP_L_CAVITY: [&str; 3] = ["8d60", "cb3d", "cdfc"];

/// Subjects whose left medial sensor was mounted rotated by 180°.
pub const FIXUP_L_MEDIAL: [&str; 4] = ["4d91", "5237", "80b8", "c9bb"];

/// Channel of the sync box that carries the trigger signal.
const TRIGGER_SOURCE: &str = "analog_2";

/// Allowed disagreement between a device clock and the synchronised counter.
const MAX_CLOCK_OFFSET_S: f64 = 1.0;

/// Load the prepared session of a subject.
///
/// Benign recording warnings are logged at debug level, all others as
/// warnings. Errors are never suppressed.
pub fn load_session(config: &DatasetConfig, subject: &str) -> Result<SensorTable> {
    let (session, warnings) = assemble_session(config, subject)?;
    for warning in &warnings {
        if warning.kind.is_benign() {
            tracing::debug!("{}: {}", subject, warning);
        } else {
            tracing::warn!("{}: {}", subject, warning);
        }
    }
    Ok(session)
}

/// Load the prepared session of a subject together with all warnings
/// raised on the way.
pub fn assemble_session(
    config: &DatasetConfig,
    subject: &str,
) -> Result<(SensorTable, Vec<RecordingWarning>)> {
    tracing::info!("Loading session of subject {}", subject);

    let mut warnings = Vec::new();
    let mut recordings = Vec::new();
    for path in recording_files(config, subject)? {
        let (recording, recording_warnings) = Recording::from_file(&path)?;
        warnings.extend(recording_warnings);
        recordings.push(recording);
    }

    let calibration_dir = config.calibration_dir();
    for recording in &mut recordings {
        let (path, warning) = find_closest_calibration(
            &calibration_dir,
            &recording.sensor_id,
            recording.header.utc_start,
        )?;
        warnings.extend(warning);
        FerrarisCalibration::from_file(&path)?.apply(recording)?;
    }

    let (mut session, sync_warnings) = synchronise(&recordings)?;
    warnings.extend(sync_warnings);

    let sensor_map = metadata_subject(config, subject)?.sensor_map();
    session.rename_groups(|id| {
        sensor_map
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| DatasetError::UnknownSensor(id.to_string()))
    })?;
    session.sort_columns();

    let trigger = session
        .column(SYNC_GROUP, TRIGGER_SOURCE)
        .map(<[f64]>::to_vec)
        .ok_or_else(|| DatasetError::MissingChannel {
            sensor: SYNC_GROUP.to_string(),
            channel: TRIGGER_SOURCE.to_string(),
        })?;
    let session = session.without_group(SYNC_GROUP);

    let mut session = apply_fixups(subject, &session)?;
    session.push_column(ColumnKey::new(SYNC_GROUP, "trigger"), trigger)?;
    Ok((session, warnings))
}

/// Merge recordings on their common counter range.
///
/// Exactly one recording must be the sync master; its start time and
/// counter define the UTC index. Counter values missing in a recording are
/// filled with NaN. Groups are named by the lowercased device id.
pub fn synchronise(recordings: &[Recording]) -> Result<(SensorTable, Vec<RecordingWarning>)> {
    if recordings.is_empty() {
        return Err(DatasetError::Synchronisation(
            "no recordings found".to_string(),
        ));
    }
    if let Some(r) = recordings
        .iter()
        .find(|r| r.header.sync_role == SyncRole::Disabled)
    {
        return Err(DatasetError::Synchronisation(format!(
            "sensor {} was recorded without synchronisation",
            r.sensor_id
        )));
    }
    let masters: Vec<&Recording> = recordings
        .iter()
        .filter(|r| r.header.sync_role == SyncRole::Master)
        .collect();
    let [master] = masters.as_slice() else {
        return Err(DatasetError::Synchronisation(format!(
            "expected exactly one sync master, found {}",
            masters.len()
        )));
    };
    let rate = master.header.sampling_rate_hz;
    if let Some(r) = recordings
        .iter()
        .find(|r| r.header.sampling_rate_hz != rate)
    {
        return Err(DatasetError::Synchronisation(format!(
            "sensor {} has sampling rate {} Hz, master has {} Hz",
            r.sensor_id, r.header.sampling_rate_hz, rate
        )));
    }

    let mut first = 0u64;
    let mut last = u64::MAX;
    for r in recordings {
        let (Some(start), Some(stop)) = (r.counter.first(), r.counter.last()) else {
            return Err(DatasetError::Synchronisation(format!(
                "sensor {} has no samples",
                r.sensor_id
            )));
        };
        first = first.max(*start);
        last = last.min(*stop);
    }
    if first > last {
        return Err(DatasetError::Synchronisation(
            "recordings do not share a common sync region".to_string(),
        ));
    }

    let master_start = master.counter[0] as f64;
    let at = |counter: u64| {
        let seconds = (counter as f64 - master_start) / rate;
        master.header.utc_start + Duration::nanoseconds((seconds * 1e9).round() as i64)
    };

    let mut warnings = Vec::new();
    for r in recordings {
        let offset = (r.header.utc_start - at(r.counter[0]))
            .num_milliseconds()
            .abs() as f64
            / 1000.0;
        if offset > MAX_CLOCK_OFFSET_S {
            warnings.push(RecordingWarning::new(
                WarningKind::Synchronisation,
                &r.sensor_id,
                format!("device clock is {offset:.1} s off the sync master"),
            ));
        }
    }

    let n = (last - first + 1) as usize;
    let index = TimeIndex::Utc((first..=last).map(at).collect());
    let mut table = SensorTable::new(index);
    for r in recordings {
        let group = r.sensor_id.to_lowercase();
        for (channel, values) in &r.channels {
            let mut column = vec![f64::NAN; n];
            for (counter, value) in r.counter.iter().zip(values) {
                if (first..=last).contains(counter) {
                    column[(counter - first) as usize] = *value;
                }
            }
            table.push_column(ColumnKey::new(group.clone(), channel.clone()), column)?;
        }
    }
    Ok((table, warnings))
}

/// Correct the known mounting errors of a subject.
///
/// Affected sensors are rotated by 180° about z. Tables of other subjects
/// are returned unchanged.
pub fn apply_fixups(subject: &str, session: &SensorTable) -> Result<SensorTable> {
    let flipped = rotation_from_angle(Vector3::z(), PI);
    let mut rotations = BTreeMap::new();
    if FIXUP_L_CAVITY.contains(&subject) {
        rotations.insert("l_cavity".to_string(), flipped);
    }
    if FIXUP_L_MEDIAL.contains(&subject) {
        rotations.insert("l_medial".to_string(), flipped);
    }
    if rotations.is_empty() {
        return Ok(session.clone());
    }
    tracing::debug!("Applying mounting fixups for subject {}", subject);
    rotate_dataset(session, rotations)
}

/// IMU data of one test, extended by `padding_s` seconds on both sides.
///
/// Pass an already loaded `session` to avoid reloading it when extracting
/// several tests of the same subject.
pub fn imu_test(
    config: &DatasetConfig,
    subject: &str,
    test: &str,
    session: Option<&SensorTable>,
    padding_s: f64,
) -> Result<SensorTable> {
    let metadata = metadata_subject(config, subject)?;
    let window = TestWindow::from_metadata(&metadata, subject, test)?;
    match session {
        Some(session) => window.slice_time(session, padding_s),
        None => window.slice_time(&load_session(config, subject)?, padding_s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::{SF_ACC, SF_GYR};
    use crate::io::recording::RecordingHeader;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn recording(id: &str, role: SyncRole, counter: Vec<u64>, start_offset_s: f64) -> Recording {
        let t0 = Utc.with_ymd_and_hms(2019, 5, 29, 10, 0, 0).unwrap();
        Recording {
            sensor_id: id.to_string(),
            path: PathBuf::from(format!("NilsPodX-{id}_0.csv")),
            header: RecordingHeader {
                sampling_rate_hz: 204.8,
                utc_start: t0
                    + Duration::nanoseconds(
                        ((counter[0] as f64 - 100.0) / 204.8 * 1e9 + start_offset_s * 1e9) as i64,
                    ),
                sync_role: role,
                version: (0, 14, 0),
            },
            channels: vec![("acc_x".to_string(), counter.iter().map(|c| *c as f64).collect())],
            counter,
        }
    }

    #[test]
    fn test_synchronise_uses_common_region() {
        let master = recording("AAAA", SyncRole::Master, (100..200).collect(), 0.0);
        let slave = recording("BBBB", SyncRole::Slave, (120..250).collect(), 0.0);
        let (table, warnings) = synchronise(&[master, slave]).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(table.len(), 80);
        assert_eq!(table.column("aaaa", "acc_x").unwrap()[0], 120.0);
        assert_eq!(table.column("bbbb", "acc_x").unwrap()[79], 199.0);

        let TimeIndex::Utc(times) = table.index() else {
            panic!("expected utc index");
        };
        let t0 = Utc.with_ymd_and_hms(2019, 5, 29, 10, 0, 0).unwrap();
        let expected = t0 + Duration::nanoseconds((20.0 / 204.8 * 1e9_f64).round() as i64);
        assert_eq!(times[0], expected);
    }

    #[test]
    fn test_synchronise_fills_lost_samples_with_nan() {
        let master = recording("AAAA", SyncRole::Master, (100..110).collect(), 0.0);
        let mut counter: Vec<u64> = (100..110).collect();
        counter.remove(3);
        let slave = recording("BBBB", SyncRole::Slave, counter, 0.0);
        let (table, _) = synchronise(&[master, slave]).unwrap();

        let values = table.column("bbbb", "acc_x").unwrap();
        assert!(values[3].is_nan());
        assert_eq!(values[4], 104.0);
    }

    #[test]
    fn test_synchronise_requires_one_master() {
        let a = recording("AAAA", SyncRole::Slave, (0..10).collect(), 0.0);
        let b = recording("BBBB", SyncRole::Slave, (0..10).collect(), 0.0);
        assert!(matches!(
            synchronise(&[a.clone(), b]),
            Err(DatasetError::Synchronisation(_))
        ));

        let disabled = recording("CCCC", SyncRole::Disabled, (0..10).collect(), 0.0);
        let master = recording("DDDD", SyncRole::Master, (0..10).collect(), 0.0);
        assert!(synchronise(&[master, disabled]).is_err());
        assert!(synchronise(&[]).is_err());
    }

    #[test]
    fn test_synchronise_without_overlap() {
        let master = recording("AAAA", SyncRole::Master, (100..200).collect(), 0.0);
        let slave = recording("BBBB", SyncRole::Slave, (300..400).collect(), 0.0);
        assert!(matches!(
            synchronise(&[master, slave]),
            Err(DatasetError::Synchronisation(_))
        ));
    }

    #[test]
    fn test_clock_offset_warning() {
        let master = recording("AAAA", SyncRole::Master, (100..200).collect(), 0.0);
        let slave = recording("BBBB", SyncRole::Slave, (100..200).collect(), 3.0);
        let (_, warnings) = synchronise(&[master, slave]).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::Synchronisation);
        assert_eq!(warnings[0].sensor_id, "BBBB");
    }

    fn motion_table(sensors: &[&str]) -> SensorTable {
        let mut table = SensorTable::new(TimeIndex::Frames(4));
        for sensor in sensors {
            for (c, channel) in SF_ACC.iter().chain(SF_GYR.iter()).enumerate() {
                let values = (0..4).map(|i| (i + c) as f64 + 0.25).collect();
                table
                    .push_column(ColumnKey::new(*sensor, *channel), values)
                    .unwrap();
            }
        }
        table
    }

    #[test]
    fn test_fixup_flips_left_cavity() {
        let input = motion_table(&["l_cavity", "l_medial"]);
        let fixed = apply_fixups("8d60", &input).unwrap();

        for axis in ["acc", "gyr"] {
            let x = format!("{axis}_x");
            let y = format!("{axis}_y");
            let z = format!("{axis}_z");
            for i in 0..4 {
                let before = |c: &str| input.column("l_cavity", c).unwrap()[i];
                let after = |c: &str| fixed.column("l_cavity", c).unwrap()[i];
                assert!((after(&x) + before(&x)).abs() < 1e-9);
                assert!((after(&y) + before(&y)).abs() < 1e-9);
                assert!((after(&z) - before(&z)).abs() < 1e-9);
            }
        }
        assert_eq!(fixed.select_group("l_medial"), input.select_group("l_medial"));
    }

    #[test]
    fn test_fixup_flips_left_medial() {
        let input = motion_table(&["l_cavity", "l_medial"]);
        let fixed = apply_fixups("c9bb", &input).unwrap();
        let before = input.column("l_medial", "gyr_x").unwrap()[1];
        assert!((fixed.column("l_medial", "gyr_x").unwrap()[1] + before).abs() < 1e-9);
        assert_eq!(fixed.select_group("l_cavity"), input.select_group("l_cavity"));
    }

    #[test]
    fn test_no_fixup_for_other_subjects() {
        let input = motion_table(&["l_cavity", "l_medial"]);
        assert_eq!(apply_fixups("2a14", &input).unwrap(), input);
    }
}
