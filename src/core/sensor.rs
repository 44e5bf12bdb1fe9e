//! Sensor naming scheme of the dataset.
//!
//! Foot-worn sensors are named `{side}_{position}`, e.g. `l_cavity`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which foot a sensor or stride belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    pub const BOTH: [Foot; 2] = [Foot::Left, Foot::Right];

    /// Single-letter side code used in sensor names.
    pub fn code(self) -> &'static str {
        match self {
            Foot::Left => "l",
            Foot::Right => "r",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Foot::Left => "left",
            Foot::Right => "right",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(Foot::Left),
            "r" => Some(Foot::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Foot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Foot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Ok(Foot::Left),
            "right" | "r" => Ok(Foot::Right),
            other => Err(format!("invalid foot '{other}'")),
        }
    }
}

/// Mounting position of a foot-worn sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Cavity,
    Heel,
    Lateral,
    Medial,
    Instep,
    Insole,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Cavity,
        Position::Heel,
        Position::Lateral,
        Position::Medial,
        Position::Instep,
        Position::Insole,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Cavity => "cavity",
            Position::Heel => "heel",
            Position::Lateral => "lateral",
            Position::Medial => "medial",
            Position::Instep => "instep",
            Position::Insole => "insole",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Position::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

/// A parsed `{side}_{position}` sensor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorName {
    pub foot: Foot,
    pub position: Position,
}

impl SensorName {
    pub fn new(foot: Foot, position: Position) -> Self {
        Self { foot, position }
    }

    /// Parse a column group name.
    ///
    /// Returns `None` for names without an underscore (e.g. `sync`) and for
    /// unknown sides or positions.
    pub fn parse(name: &str) -> Option<Self> {
        let (side, position) = name.split_once('_')?;
        Some(Self {
            foot: Foot::from_code(side)?,
            position: Position::from_name(position)?,
        })
    }
}

impl fmt::Display for SensorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.foot.code(), self.position.as_str())
    }
}

/// Names of all sensors attached to one foot.
pub fn foot_sensors(foot: Foot, include_insole: bool) -> Vec<String> {
    Position::ALL
        .into_iter()
        .filter(|p| include_insole || *p != Position::Insole)
        .map(|p| SensorName::new(foot, p).to_string())
        .collect()
}

/// Names of all mocap markers attached to one foot.
pub fn foot_markers(foot: Foot) -> Vec<String> {
    ["fcc", "toe", "fm5", "fm1"]
        .iter()
        .map(|m| format!("{}_{m}", foot.code()))
        .collect()
}
