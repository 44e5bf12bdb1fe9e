//! Sensor Position Dataset CLI
//!
//! Inspect and export the sensor-position gait dataset.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sensor_position_dataset::{
    config::Config,
    core::labels::StrideLabel,
    core::table::SensorTable,
    io::{all_subjects, all_tests},
    DatasetConfig, GaitDataset, MocapDataset, SegmentationDataset, VERSION,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensor-position")]
#[command(version = VERSION)]
#[command(about = "Access helpers for the sensor-position gait dataset", long_about = None)]
struct Cli {
    /// Dataset root (defaults to the configured folder)
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all participants
    Subjects {
        /// Include the participant with the wrong recording
        #[arg(long)]
        include_wrong_recording: bool,
    },

    /// List the gait tests of a participant
    Tests {
        subject: String,
    },

    /// Print the manual stride borders of a participant
    Labels {
        subject: String,

        /// Only strides of this test, relative to its start
        #[arg(long)]
        test: Option<String>,

        /// Print as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Export IMU data as CSV
    Export {
        subject: String,

        /// Export a single test instead of the full session
        #[arg(long)]
        test: Option<String>,

        /// Padding around the test in seconds (defaults to the configured value)
        #[arg(long)]
        padding: Option<f64>,

        /// Keep the sensor frames instead of aligning to the foot frame
        #[arg(long)]
        no_align: bool,

        /// Output file (stdout if not given)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Export marker trajectories of a test as CSV
    Markers {
        subject: String,
        test: String,

        /// Output file (stdout if not given)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show or update the configuration
    Config {
        /// Store this folder as default dataset root
        #[arg(long)]
        set_data_folder: Option<PathBuf>,

        /// Store this default padding in seconds
        #[arg(long)]
        set_padding: Option<f64>,
    },

    /// Check that the dataset checkout is at the expected git revision
    CheckRevision {
        #[arg(long, default_value = "HEAD")]
        version: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_folder = cli.data_folder;

    match cli.command {
        Commands::Subjects {
            include_wrong_recording,
        } => cmd_subjects(data_folder, include_wrong_recording),
        Commands::Tests { subject } => cmd_tests(data_folder, &subject),
        Commands::Labels {
            subject,
            test,
            json,
        } => cmd_labels(data_folder, &subject, test.as_deref(), json),
        Commands::Export {
            subject,
            test,
            padding,
            no_align,
            output,
        } => cmd_export(data_folder, &subject, test.as_deref(), padding, !no_align, output),
        Commands::Markers {
            subject,
            test,
            output,
        } => cmd_markers(data_folder, &subject, &test, output),
        Commands::Config {
            set_data_folder,
            set_padding,
        } => cmd_config(set_data_folder, set_padding),
        Commands::CheckRevision { version } => cmd_check_revision(data_folder, &version),
    }
}

fn dataset_config(data_folder: Option<PathBuf>) -> Result<DatasetConfig> {
    DatasetConfig::resolve(data_folder).context("Failed to locate the dataset")
}

fn cmd_subjects(data_folder: Option<PathBuf>, include_wrong_recording: bool) -> Result<()> {
    let config = dataset_config(data_folder)?;
    for subject in all_subjects(&config, include_wrong_recording)? {
        println!("{subject}");
    }
    Ok(())
}

fn cmd_tests(data_folder: Option<PathBuf>, subject: &str) -> Result<()> {
    let config = dataset_config(data_folder)?;
    for test in all_tests(&config, subject)
        .with_context(|| format!("Failed to read metadata of subject {subject}"))?
    {
        println!("{test}");
    }
    Ok(())
}

fn cmd_labels(
    data_folder: Option<PathBuf>,
    subject: &str,
    test: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = dataset_config(data_folder)?;
    let labels = match test {
        Some(test) => MocapDataset::new(config)?
            .with_wrong_recording(true)?
            .subset(Some(subject), Some(test))
            .segmented_stride_list()?,
        None => SegmentationDataset::new(config)?
            .with_wrong_recording(true)?
            .subset(subject)
            .segmented_stride_list()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
    } else {
        print_labels(&labels)?;
    }
    Ok(())
}

fn print_labels(labels: &[StrideLabel]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(["s_id", "start", "end", "foot"])?;
    for label in labels {
        wtr.write_record([
            label.s_id.to_string(),
            label.start.to_string(),
            label.end.to_string(),
            label.foot.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn cmd_export(
    data_folder: Option<PathBuf>,
    subject: &str,
    test: Option<&str>,
    padding: Option<f64>,
    align: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = dataset_config(data_folder)?;
    let table = match test {
        Some(test) => {
            let padding = match padding {
                Some(padding) => padding,
                None => Config::load().context("Failed to load configuration")?.data_padding_s,
            };
            if padding < 0.0 {
                bail!("Padding must not be negative, got {padding}");
            }
            MocapDataset::new(config)?
                .with_wrong_recording(true)?
                .with_padding(padding)
                .with_alignment(align)
                .subset(Some(subject), Some(test))
                .data()?
        }
        None if align => SegmentationDataset::new(config)?
            .with_wrong_recording(true)?
            .subset(subject)
            .data()?,
        None => sensor_position_dataset::load_session(&config, subject)?,
    };
    write_table(&table, output)
}

fn cmd_markers(
    data_folder: Option<PathBuf>,
    subject: &str,
    test: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = dataset_config(data_folder)?;
    let markers = MocapDataset::new(config)?
        .with_wrong_recording(true)?
        .subset(Some(subject), Some(test))
        .marker_position()?;
    write_table(&markers, output)
}

fn write_table(table: &SensorTable, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {path:?}"))?;
            table.write_csv(file)?;
            eprintln!("Wrote {} rows to {:?}", table.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            table.write_csv(&mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn cmd_config(set_data_folder: Option<PathBuf>, set_padding: Option<f64>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if set_data_folder.is_some() || set_padding.is_some() {
        if let Some(folder) = set_data_folder {
            // Validate before storing
            let dataset = DatasetConfig::new(folder)?;
            config.data_folder = Some(dataset.root().to_path_buf());
        }
        if let Some(padding) = set_padding {
            config.data_padding_s = padding;
        }
        config.save().context("Failed to save configuration")?;
        println!("Configuration saved.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_check_revision(data_folder: Option<PathBuf>, version: &str) -> Result<()> {
    let config = dataset_config(data_folder)?;
    let head = sensor_position_dataset::ensure_git_revision(&config, version)?;
    println!("Dataset is at {version} ({head})");
    Ok(())
}
