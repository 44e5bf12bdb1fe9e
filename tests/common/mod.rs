//! Synthetic on-disk dataset for the integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const SAMPLES: usize = 2048;
pub const FIRST_COUNTER: u64 = 1000;

/// (position, device id)
pub const SENSORS: [(&str, &str); 4] = [
    ("l_cavity", "A001"),
    ("l_medial", "A002"),
    ("r_heel", "A003"),
    ("sync", "A0FF"),
];

/// (s_id, start, end, foot) in session samples
pub const STRIDES: [(i64, i64, i64, &str); 5] = [
    (0, 520, 700, "left"),
    (1, 600, 800, "right"),
    (2, 900, 1100, "left"),
    (3, 1300, 1500, "right"),
    (4, 100, 300, "left"),
];

/// Raw value of a motion channel of sensor `k` at sample `i`.
pub fn raw(k: usize, channel: &str, i: usize) -> f64 {
    let i = i as f64;
    let k = k as f64;
    match channel {
        "acc_x" => 1.0 + k + i * 0.001,
        "acc_y" => 2.0 - i * 0.002,
        "acc_z" => 9.81 + k * 0.1,
        "gyr_x" => 0.5 * k - 1.0,
        "gyr_y" => 0.25 + i * 0.0005,
        "gyr_z" => i * 0.01 - 3.0,
        _ => 0.0,
    }
}

/// Trigger signal of the sync box.
pub fn trigger(i: usize) -> f64 {
    if i % 200 == 0 {
        1.0
    } else {
        0.0
    }
}

pub struct Fixture {
    pub root: PathBuf,
}

impl Fixture {
    /// Write a dataset with the given subjects to a fresh temp folder.
    pub fn build(name: &str, subjects: &[&str]) -> Self {
        let root = std::env::temp_dir().join(format!(
            "spd-fixture-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("calibrations/ferraris")).unwrap();

        for (_, id) in SENSORS {
            std::fs::write(
                root.join(format!("calibrations/ferraris/{id}_ferraris_2019-05-29_09-00.json")),
                IDENTITY_CALIBRATION,
            )
            .unwrap();
        }
        for subject in subjects {
            write_subject(&root.join("data").join(subject));
        }
        Self { root }
    }

    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.root.join("data").join(subject)
    }
}

const IDENTITY_CALIBRATION: &str = r#"{
    "K_a": [[1,0,0],[0,1,0],[0,0,1]], "R_a": [[1,0,0],[0,1,0],[0,0,1]], "b_a": [0,0,0],
    "K_g": [[1,0,0],[0,1,0],[0,0,1]], "R_g": [[1,0,0],[0,1,0],[0,0,1]],
    "K_ga": [[0,0,0],[0,0,0],[0,0,0]], "b_g": [0,0,0]
}"#;

const METADATA: &str = r#"{
    "sensors": {"l_cavity": "a001", "l_medial": "A002", "r_heel": "A003", "sync": "A0FF"},
    "imu_tests": {
        "fast_10": {"start": "2019-05-29T10:00:02.5", "stop": "2019-05-29T10:00:05.0", "start_idx": 512, "stop_idx": 1024},
        "slow_10": {"start": "2019-05-29T10:00:05.859375", "stop": "2019-05-29T10:00:08.7890625", "start_idx": 1200, "stop_idx": 1800}
    },
    "mocap_test_start": {"fast_10": "2019-05-29T10:00:02.5", "slow_10": "2019-05-29T10:00:05.859375"},
    "age": 27
}"#;

fn write_subject(dir: &Path) {
    std::fs::create_dir_all(dir.join("imu")).unwrap();
    std::fs::create_dir_all(dir.join("mocap")).unwrap();
    std::fs::write(dir.join("meta_data.json"), METADATA).unwrap();

    let mut labels = String::from("s_id,start,end,foot\n");
    for (s_id, start, end, foot) in STRIDES {
        writeln!(labels, "{s_id},{start},{end},{foot}").unwrap();
    }
    std::fs::write(dir.join("manual_stride_border.csv"), labels).unwrap();

    for (k, (position, id)) in SENSORS.iter().enumerate() {
        let is_sync = *position == "sync";
        let role = if is_sync { "master" } else { "slave" };
        let mut content = format!(
            "# sampling_rate_hz=204.8; utc_start=2019-05-29T10:00:00.000; sync_role={role}; version=0.14.0\n"
        );
        content.push_str("counter,acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z");
        if is_sync {
            content.push_str(",analog_0,analog_1,analog_2");
        }
        content.push('\n');
        for i in 0..SAMPLES {
            write!(content, "{}", FIRST_COUNTER + i as u64).unwrap();
            for channel in ["acc_x", "acc_y", "acc_z", "gyr_x", "gyr_y", "gyr_z"] {
                write!(content, ",{}", raw(k, channel, i)).unwrap();
            }
            if is_sync {
                write!(content, ",0,0,{}", trigger(i)).unwrap();
            }
            content.push('\n');
        }
        std::fs::write(
            dir.join(format!("imu/NilsPodX-{id}_20190529_1000.csv")),
            content,
        )
        .unwrap();
    }

    // Only the first test has mocap data.
    let frames = vec![
        vec![[10.0, 20.0, 30.0], [0.0, 0.0, 0.0]],
        vec![[11.0, 21.0, 31.0], [5.0, 6.0, 7.0]],
        vec![[12.0, 22.0, 32.0], [5.5, 0.0, 7.5]],
    ];
    std::fs::write(
        dir.join("mocap/fast_10.c3d"),
        c3d(&["L_FCC", "R_TOE"], &frames, 100.0),
    )
    .unwrap();
    std::fs::write(
        dir.join("mocap/fast_10_steps.csv"),
        "ic,tc,foot\n10,60,left\n20,,right\n110,160,left\n",
    )
    .unwrap();
}

/// Intel float C3D file without analog data.
pub fn c3d(labels: &[&str], frames: &[Vec<[f32; 3]>], rate: f32) -> Vec<u8> {
    let mut out = vec![0u8; 512];
    out[0] = 2;
    out[1] = 0x50;
    out[2..4].copy_from_slice(&(labels.len() as u16).to_le_bytes());
    out[6..8].copy_from_slice(&1u16.to_le_bytes());
    out[8..10].copy_from_slice(&(frames.len() as u16).to_le_bytes());
    out[12..16].copy_from_slice(&(-1.0f32).to_le_bytes());
    out[16..18].copy_from_slice(&3u16.to_le_bytes());
    out[20..24].copy_from_slice(&rate.to_le_bytes());

    let mut params = vec![1u8, 0x50, 1, 84];
    params.extend([5u8, (-1i8) as u8]);
    params.extend(b"POINT");
    params.extend(3i16.to_le_bytes());
    params.push(0);

    let width = labels.iter().map(|l| l.len()).max().unwrap_or(1);
    let mut label_bytes = Vec::new();
    for label in labels {
        let mut padded = label.as_bytes().to_vec();
        padded.resize(width, b' ');
        label_bytes.extend(padded);
    }
    params.extend([6u8, 1]);
    params.extend(b"LABELS");
    let next = 2 + 1 + 1 + 2 + label_bytes.len() + 1;
    params.extend((next as i16).to_le_bytes());
    params.extend([(-1i8) as u8, 2, width as u8, labels.len() as u8]);
    params.extend(label_bytes);
    params.push(0);
    params.push(0);
    params.resize(512, 0);
    out.extend(params);

    for frame in frames {
        for point in frame {
            for v in point {
                out.extend(v.to_le_bytes());
            }
            out.extend(0.0f32.to_le_bytes());
        }
    }
    out
}
