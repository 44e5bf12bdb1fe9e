//! Minimal C3D reader for marker trajectories.
//!
//! Only the parts needed for the dataset are decoded: the header, the
//! parameter section (for `POINT:LABELS`) and the 3D point data. Analog
//! data is skipped. Intel, DEC and MIPS processor formats are supported,
//! both with floating point and with scaled integer storage.

use crate::config::DatasetConfig;
use crate::core::table::{ColumnKey, SensorTable, TimeIndex};
use crate::error::{DatasetError, Result};
use std::collections::HashMap;
use std::path::Path;

const BLOCK_SIZE: usize = 512;
const AXES: [&str; 3] = ["x", "y", "z"];

/// Byte layout of the numbers in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    Intel,
    Dec,
    Mips,
}

impl Processor {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            84 => Some(Processor::Intel),
            85 => Some(Processor::Dec),
            86 => Some(Processor::Mips),
            _ => None,
        }
    }
}

struct Bytes<'a> {
    data: &'a [u8],
    processor: Processor,
}

impl<'a> Bytes<'a> {
    fn get<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.data.get(offset..offset + N)?.try_into().ok()
    }

    fn u8(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    fn i8(&self, offset: usize) -> Option<i8> {
        self.u8(offset).map(|b| b as i8)
    }

    fn i16(&self, offset: usize) -> Option<i16> {
        let b = self.get::<2>(offset)?;
        Some(match self.processor {
            Processor::Mips => i16::from_be_bytes(b),
            _ => i16::from_le_bytes(b),
        })
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        self.i16(offset).map(|v| v as u16)
    }

    fn f32(&self, offset: usize) -> Option<f32> {
        let b = self.get::<4>(offset)?;
        Some(match self.processor {
            Processor::Intel => f32::from_le_bytes(b),
            Processor::Mips => f32::from_be_bytes(b),
            // VAX F-floating: swapped 16 bit words, values scaled by 4
            Processor::Dec => f32::from_le_bytes([b[2], b[3], b[0], b[1]]) / 4.0,
        })
    }
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq)]
enum ParamData {
    Chars { dims: Vec<usize>, bytes: Vec<u8> },
    Numbers(Vec<f64>),
}

impl ParamData {
    /// Interpret a 2D char parameter as a list of trimmed strings.
    fn strings(&self) -> Vec<String> {
        match self {
            ParamData::Chars { dims, bytes } => {
                let width = dims.first().copied().unwrap_or(bytes.len()).max(1);
                bytes
                    .chunks(width)
                    .map(|c| String::from_utf8_lossy(c).trim().to_string())
                    .collect()
            }
            ParamData::Numbers(_) => Vec::new(),
        }
    }

    fn first_number(&self) -> Option<f64> {
        match self {
            ParamData::Numbers(values) => values.first().copied(),
            ParamData::Chars { .. } => None,
        }
    }
}

/// Header and point data of a C3D file.
#[derive(Debug, Clone)]
pub struct C3dFile {
    pub processor: Processor,
    pub frame_rate: f64,
    pub first_frame: u16,
    pub last_frame: u16,
    /// Marker names, lowercased
    pub labels: Vec<String>,
    /// `frames[f][p]` is `[x, y, z]` of point `p` in frame `f`
    pub frames: Vec<Vec<[f64; 3]>>,
}

impl C3dFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data).map_err(|m| DatasetError::format(path, m))
    }

    pub fn parse(data: &[u8]) -> std::result::Result<Self, String> {
        if data.len() < BLOCK_SIZE {
            return Err("file shorter than the header block".to_string());
        }
        if data[1] != 0x50 {
            return Err("not a C3D file (missing 0x50 key)".to_string());
        }
        let param_start = (data[0] as usize)
            .checked_sub(1)
            .ok_or("invalid parameter block")?
            * BLOCK_SIZE;
        let processor = data
            .get(param_start + 3)
            .and_then(|code| Processor::from_code(*code))
            .ok_or("unknown processor type")?;
        let bytes = Bytes { data, processor };

        let truncated = || "truncated header".to_string();
        let point_count = bytes.u16(2).ok_or_else(truncated)? as usize;
        let analog_per_frame = bytes.u16(4).ok_or_else(truncated)? as usize;
        let first_frame = bytes.u16(6).ok_or_else(truncated)?;
        let last_frame = bytes.u16(8).ok_or_else(truncated)?;
        let scale = bytes.f32(12).ok_or_else(truncated)?;
        let data_block = bytes.u16(16).ok_or_else(truncated)? as usize;
        let header_rate = bytes.f32(20).ok_or_else(truncated)? as f64;

        let params = read_parameters(&bytes, param_start)?;
        let frame_rate = if header_rate > 0.0 {
            header_rate
        } else {
            params
                .get(&("POINT".to_string(), "RATE".to_string()))
                .and_then(ParamData::first_number)
                .unwrap_or(0.0)
        };
        let mut labels: Vec<String> = params
            .get(&("POINT".to_string(), "LABELS".to_string()))
            .map(ParamData::strings)
            .unwrap_or_default();
        if let Some(more) = params.get(&("POINT".to_string(), "LABELS2".to_string())) {
            labels.extend(more.strings());
        }
        labels.truncate(point_count);
        while labels.len() < point_count {
            labels.push(format!("point_{}", labels.len() + 1));
        }
        let labels = labels.into_iter().map(|l| l.to_lowercase()).collect();

        let frame_count = (last_frame as usize + 1).saturating_sub(first_frame as usize);
        let is_float = scale < 0.0;
        let word = if is_float { 4 } else { 2 };
        let frame_size = (point_count * 4 + analog_per_frame) * word;
        let data_start = data_block.checked_sub(1).ok_or("invalid data block")? * BLOCK_SIZE;

        let mut frames = Vec::with_capacity(frame_count);
        for f in 0..frame_count {
            let frame_start = data_start + f * frame_size;
            let mut points = Vec::with_capacity(point_count);
            for p in 0..point_count {
                let at = frame_start + p * 4 * word;
                let mut xyz = [0.0; 3];
                for (axis, value) in xyz.iter_mut().enumerate() {
                    let offset = at + axis * word;
                    *value = if is_float {
                        bytes.f32(offset).map(f64::from)
                    } else {
                        bytes.i16(offset).map(|v| v as f64 * scale.abs() as f64)
                    }
                    .ok_or_else(|| format!("truncated point data in frame {}", f + 1))?;
                }
                points.push(xyz);
            }
            frames.push(points);
        }

        Ok(Self {
            processor,
            frame_rate,
            first_frame,
            last_frame,
            labels,
            frames,
        })
    }

    /// Marker trajectories as a table with columns `(marker, x|y|z)`.
    ///
    /// Exactly zero coordinates mark untracked markers and become NaN if
    /// `insert_nan` is set.
    pub fn to_table(&self, insert_nan: bool) -> Result<SensorTable> {
        let mut table = SensorTable::new(TimeIndex::Frames(self.frames.len()));
        for (p, label) in self.labels.iter().enumerate() {
            for (axis, name) in AXES.iter().enumerate() {
                let values = self
                    .frames
                    .iter()
                    .map(|frame| {
                        let v = frame[p][axis];
                        if insert_nan && v == 0.0 {
                            f64::NAN
                        } else {
                            v
                        }
                    })
                    .collect();
                table.push_column(ColumnKey::new(label.clone(), *name), values)?;
            }
        }
        Ok(table)
    }
}

type ParamKey = (String, String);

fn read_parameters(
    bytes: &Bytes<'_>,
    start: usize,
) -> std::result::Result<HashMap<ParamKey, ParamData>, String> {
    let mut groups: HashMap<u8, String> = HashMap::new();
    let mut raw: Vec<(i8, String, ParamData)> = Vec::new();

    let mut pos = start + 4;
    loop {
        let Some(name_len) = bytes.i8(pos) else { break };
        let name_len = name_len.unsigned_abs() as usize;
        if name_len == 0 {
            break;
        }
        let group_id = bytes.i8(pos + 1).ok_or("truncated parameter section")?;
        let name_bytes = bytes
            .data
            .get(pos + 2..pos + 2 + name_len)
            .ok_or("truncated parameter name")?;
        let name = String::from_utf8_lossy(name_bytes).trim().to_uppercase();
        let offset_pos = pos + 2 + name_len;
        let next = bytes.i16(offset_pos).ok_or("truncated parameter section")?;

        if group_id < 0 {
            groups.insert(group_id.unsigned_abs(), name);
        } else {
            let data = read_param_data(bytes, offset_pos + 2)?;
            raw.push((group_id, name, data));
        }

        if next <= 0 {
            break;
        }
        pos = offset_pos + next as usize;
    }

    Ok(raw
        .into_iter()
        .filter_map(|(gid, name, data)| groups.get(&(gid as u8)).map(|g| ((g.clone(), name), data)))
        .collect())
}

fn read_param_data(bytes: &Bytes<'_>, pos: usize) -> std::result::Result<ParamData, String> {
    let truncated = || "truncated parameter data".to_string();
    let kind = bytes.i8(pos).ok_or_else(truncated)?;
    let ndims = bytes.u8(pos + 1).ok_or_else(truncated)? as usize;
    let dims: Vec<usize> = (0..ndims)
        .map(|i| bytes.u8(pos + 2 + i).map(usize::from))
        .collect::<Option<_>>()
        .ok_or_else(truncated)?;
    let count: usize = dims.iter().product();
    let start = pos + 2 + ndims;

    match kind {
        -1 => Ok(ParamData::Chars {
            bytes: bytes
                .data
                .get(start..start + count)
                .ok_or_else(truncated)?
                .to_vec(),
            dims,
        }),
        1 => (0..count)
            .map(|i| bytes.u8(start + i).map(f64::from))
            .collect::<Option<Vec<_>>>()
            .map(ParamData::Numbers)
            .ok_or_else(truncated),
        2 => (0..count)
            .map(|i| bytes.i16(start + i * 2).map(f64::from))
            .collect::<Option<Vec<_>>>()
            .map(ParamData::Numbers)
            .ok_or_else(truncated),
        4 => (0..count)
            .map(|i| bytes.f32(start + i * 4).map(f64::from))
            .collect::<Option<Vec<_>>>()
            .map(ParamData::Numbers)
            .ok_or_else(truncated),
        other => Err(format!("unknown parameter type {other}")),
    }
}

/// Load the marker trajectories of a C3D file.
pub fn load_c3d_data(path: &Path, insert_nan: bool) -> Result<SensorTable> {
    C3dFile::from_file(path)?.to_table(insert_nan)
}

/// Marker trajectories of one test.
///
/// The recording starts with the test, so the first frame is aligned with
/// the unpadded start of the matching IMU test.
pub fn mocap_test(config: &DatasetConfig, subject: &str, test: &str) -> Result<SensorTable> {
    let path = config.mocap_dir(subject).join(format!("{test}.c3d"));
    if !path.is_file() {
        return Err(DatasetError::NoMocapData {
            subject: subject.to_string(),
            test: test.to_string(),
        });
    }
    load_c3d_data(&path, true)
}
