//! Alignment of all foot sensors into the common foot frame.

use crate::core::rotation::{rotate_dataset, Rotations};
use crate::core::sensor::SensorName;
use crate::core::table::{SensorTable, SYNC_GROUP};
use crate::error::Result;
use std::collections::BTreeMap;

/// Rotate every `{side}_{position}` sensor into the foot frame.
///
/// The `sync` group is split off before rotating and re-attached unchanged
/// at the end of the table. Groups whose name does not parse as a sensor
/// name are left as they are.
///
/// Rotations compose, so this must be applied exactly once per table.
pub fn align_coordinates(multi_sensor_data: &SensorTable) -> Result<SensorTable> {
    let rotations: BTreeMap<String, _> = multi_sensor_data
        .group_names()
        .into_iter()
        .filter_map(|group| {
            SensorName::parse(group).map(|name| (group.to_string(), name.alignment_rotation()))
        })
        .collect();

    let motion = multi_sensor_data.without_group(SYNC_GROUP);
    let mut aligned = rotate_dataset(&motion, Rotations::PerSensor(rotations))?;

    if let Some(sync) = multi_sensor_data.select_group(SYNC_GROUP) {
        aligned.append(sync)?;
    }
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sensor::{Foot, Position};
    use crate::core::table::{ColumnKey, TimeIndex, SF_ACC, SF_GYR};

    fn session_like_table() -> SensorTable {
        let n = 8;
        let mut table = SensorTable::new(TimeIndex::Frames(n));
        for sensor in ["l_cavity", "r_lateral", "r_insole"] {
            for (c, channel) in SF_ACC.iter().chain(SF_GYR.iter()).enumerate() {
                let values = (0..n).map(|i| (i * 3 + c) as f64 * 0.5 - 2.0).collect();
                table
                    .push_column(ColumnKey::new(sensor, *channel), values)
                    .unwrap();
            }
        }
        // Sync data that looks like motion channels must stay untouched.
        for channel in SF_ACC {
            table
                .push_column(ColumnKey::new(SYNC_GROUP, channel), vec![1.5; n])
                .unwrap();
        }
        table
            .push_column(ColumnKey::new(SYNC_GROUP, "trigger"), (0..n).map(|i| i as f64).collect())
            .unwrap();
        table
    }

    #[test]
    fn test_sync_is_never_rotated() {
        let table = session_like_table();
        let aligned = align_coordinates(&table).unwrap();
        assert_eq!(aligned.select_group(SYNC_GROUP), table.select_group(SYNC_GROUP));
    }

    #[test]
    fn test_columns_are_preserved() {
        let table = session_like_table();
        let aligned = align_coordinates(&table).unwrap();
        assert_eq!(aligned.keys(), table.keys());
        assert_eq!(aligned.len(), table.len());
    }

    #[test]
    fn test_uses_side_specific_matrix() {
        let table = session_like_table();
        let aligned = align_coordinates(&table).unwrap();

        // right lateral: new_x = -y, new_y = -z, new_z = x
        let r = Position::Lateral.transformation().rotation(Foot::Right);
        assert_eq!(r.matrix()[(0, 1)], -1.0);
        let acc_y = table.column("r_lateral", "acc_y").unwrap();
        let new_x = aligned.column("r_lateral", "acc_x").unwrap();
        for (y, x) in acc_y.iter().zip(new_x) {
            assert!((x + y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_applying_twice_differs() {
        let table = session_like_table();
        let once = align_coordinates(&table).unwrap();
        let twice = align_coordinates(&once).unwrap();
        assert_ne!(
            once.column("r_insole", "gyr_x"),
            twice.column("r_insole", "gyr_x")
        );
    }

    #[test]
    fn test_is_deterministic() {
        let table = session_like_table();
        assert_eq!(align_coordinates(&table).unwrap(), align_coordinates(&table).unwrap());
    }
}
