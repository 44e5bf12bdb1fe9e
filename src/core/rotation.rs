//! Fixed sensor-to-foot coordinate transformations and the rotation
//! applicator for multi-sensor tables.
//!
//! Each mounting position has one matrix per foot that maps the sensor
//! frame of a NilsPod v1 sensor onto the foot frame used by the Qualisys
//! motion capture system. The matrices follow from the physical mounting
//! geometry and never change at runtime.

use crate::core::sensor::{Foot, Position, SensorName};
use crate::core::table::{SensorTable, SF_ACC, SF_GYR};
use crate::error::{DatasetError, Result};
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::collections::BTreeMap;

/// Rotation matrices of one mounting position, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    pub left_sensor: [[f64; 3]; 3],
    pub right_sensor: [[f64; 3]; 3],
}

impl Transformation {
    /// Rotation for a sensor mounted on `foot`.
    pub fn rotation(&self, foot: Foot) -> Rotation3<f64> {
        let m = match foot {
            Foot::Left => &self.left_sensor,
            Foot::Right => &self.right_sensor,
        };
        Rotation3::from_matrix_unchecked(Matrix3::new(
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
        ))
    }
}

// [[+y -> +x], [+z -> +y], [+x -> +z]] / [[-y -> +x], [-z -> +y], [+x -> +z]]
const LATERAL: Transformation = Transformation {
    left_sensor: [[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
    right_sensor: [[0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]],
};

// Mirror image of the lateral mounting.
const MEDIAL: Transformation = Transformation {
    left_sensor: [[0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]],
    right_sensor: [[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
};

// [[-x -> +x], [-y -> +y], [+z -> +z]] on both feet
const INSTEP: Transformation = Transformation {
    left_sensor: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
    right_sensor: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
};

const CAVITY: Transformation = INSTEP;

// [[-z -> +x], [+y -> +y], [+x -> +z]] on both feet
const HEEL: Transformation = Transformation {
    left_sensor: [[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
    right_sensor: [[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
};

// [[+y -> +x], [-x -> +y], [+z -> +z]] / [[-y -> +x], [+x -> +y], [+z -> +z]]
const INSOLE: Transformation = Transformation {
    left_sensor: [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
    right_sensor: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
};

/// All transformations keyed by their published names.
pub static COORDINATE_TRANSFORMATIONS: [(&str, Transformation); 6] = [
    ("qualisis_lateral_nilspodv1", LATERAL),
    ("qualisis_medial_nilspodv1", MEDIAL),
    ("qualisis_instep_nilspodv1", INSTEP),
    ("qualisis_cavity_nilspodv1", CAVITY),
    ("qualisis_heel_nilspodv1", HEEL),
    ("qualisis_insole_nilspodv1", INSOLE),
];

/// Look up a transformation by its published key.
pub fn coordinate_transformation(key: &str) -> Option<&'static Transformation> {
    COORDINATE_TRANSFORMATIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, t)| t)
}

impl Position {
    /// Key of this position in [`COORDINATE_TRANSFORMATIONS`].
    pub fn transformation_key(self) -> String {
        format!("qualisis_{}_nilspodv1", self.as_str())
    }

    pub fn transformation(self) -> &'static Transformation {
        match self {
            Position::Cavity => &CAVITY,
            Position::Heel => &HEEL,
            Position::Lateral => &LATERAL,
            Position::Medial => &MEDIAL,
            Position::Instep => &INSTEP,
            Position::Insole => &INSOLE,
        }
    }
}

impl SensorName {
    /// Rotation from this sensor's frame into the foot frame.
    pub fn alignment_rotation(&self) -> Rotation3<f64> {
        self.position.transformation().rotation(self.foot)
    }
}

/// Rotation of `angle_rad` around `axis`.
pub fn rotation_from_angle(axis: Vector3<f64>, angle_rad: f64) -> Rotation3<f64> {
    Rotation3::from_scaled_axis(axis.normalize() * angle_rad)
}

/// Rotations to apply to a table.
#[derive(Debug, Clone)]
pub enum Rotations {
    /// The same rotation for every sensor group that carries acc and gyr
    Uniform(Rotation3<f64>),
    /// A rotation per sensor name; other sensors stay untouched
    PerSensor(BTreeMap<String, Rotation3<f64>>),
}

impl From<Rotation3<f64>> for Rotations {
    fn from(rotation: Rotation3<f64>) -> Self {
        Rotations::Uniform(rotation)
    }
}

impl From<BTreeMap<String, Rotation3<f64>>> for Rotations {
    fn from(map: BTreeMap<String, Rotation3<f64>>) -> Self {
        Rotations::PerSensor(map)
    }
}

/// Apply rotations to the acc and gyr channels of a dataset.
///
/// The result is always an independent copy with the same columns in the
/// same order. Non-motion channels are never touched.
///
/// # Errors
///
/// A per-sensor rotation for a sensor that is not part of the table is
/// reported as [`DatasetError::UnknownSensor`], a sensor without the six
/// motion channels as [`DatasetError::MissingChannel`].
pub fn rotate_dataset(dataset: &SensorTable, rotations: impl Into<Rotations>) -> Result<SensorTable> {
    let mut rotated = dataset.clone();

    match rotations.into() {
        Rotations::Uniform(rotation) => {
            let sensors: Vec<String> = dataset
                .group_names()
                .into_iter()
                .filter(|g| has_motion_channels(dataset, g))
                .map(str::to_string)
                .collect();
            for sensor in sensors {
                rotate_sensor(&mut rotated, &sensor, &rotation)?;
            }
        }
        Rotations::PerSensor(map) => {
            for (sensor, rotation) in &map {
                if !dataset.has_group(sensor) {
                    return Err(DatasetError::UnknownSensor(sensor.clone()));
                }
                rotate_sensor(&mut rotated, sensor, rotation)?;
            }
        }
    }

    Ok(rotated)
}

fn has_motion_channels(table: &SensorTable, sensor: &str) -> bool {
    SF_ACC
        .iter()
        .chain(SF_GYR.iter())
        .all(|c| table.column(sensor, c).is_some())
}

/// Rotate acc and gyr of one sensor in place.
fn rotate_sensor(table: &mut SensorTable, sensor: &str, rotation: &Rotation3<f64>) -> Result<()> {
    rotate_triple(table, sensor, &SF_GYR, rotation)?;
    rotate_triple(table, sensor, &SF_ACC, rotation)
}

fn rotate_triple(
    table: &mut SensorTable,
    sensor: &str,
    channels: &[&str; 3],
    rotation: &Rotation3<f64>,
) -> Result<()> {
    let fetch = |channel: &str| {
        table
            .column(sensor, channel)
            .map(<[f64]>::to_vec)
            .ok_or_else(|| DatasetError::MissingChannel {
                sensor: sensor.to_string(),
                channel: channel.to_string(),
            })
    };
    let (xs, ys, zs) = (fetch(channels[0])?, fetch(channels[1])?, fetch(channels[2])?);

    let mut out = [
        Vec::with_capacity(xs.len()),
        Vec::with_capacity(xs.len()),
        Vec::with_capacity(xs.len()),
    ];
    for ((x, y), z) in xs.into_iter().zip(ys).zip(zs) {
        let v = rotation * Vector3::new(x, y, z);
        out[0].push(v.x);
        out[1].push(v.y);
        out[2].push(v.z);
    }

    for (channel, values) in channels.iter().zip(out) {
        if let Some(column) = table.column_mut(sensor, channel) {
            *column = values;
        }
    }
    Ok(())
}
