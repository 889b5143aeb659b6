//! Configuration for acqspec
//!
//! Read from `~/.acqspec/config.toml` (home overridable with
//! `ACQSPEC_HOME`). A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::output::print_table;

/// Header fields offered when `init` is given no `--field`.
pub const DEFAULT_FIELDS: &[&str] = &[
    "SeriesDescription",
    "SequenceName",
    "SequenceVariant",
    "ScanningSequence",
    "ImageType",
    "Manufacturer",
    "ManufacturerModelName",
    "SoftwareVersion",
    "MRAcquisitionType",
    "SliceThickness",
    "PixelSpacing",
    "Rows",
    "Columns",
    "Slices",
    "AcquisitionMatrix",
    "ReconstructionDiameter",
    "RepetitionTime",
    "EchoTime",
    "InversionTime",
    "FlipAngle",
    "EchoTrainLength",
    "GradientEchoTrainLength",
    "NumberOfTemporalPositions",
    "TemporalResolution",
    "SliceTiming",
    "DiffusionBValue",
    "DiffusionGradientDirectionSequence",
    "ParallelAcquisitionTechnique",
    "ParallelReductionFactorInPlane",
    "PartialFourier",
    "SliceAccelerationFactor",
    "PixelBandwidth",
    "BandwidthPerPixelPhaseEncode",
    "InPlanePhaseEncodingDirection",
    "PhaseEncodingDirectionPositive",
    "NumberOfPhaseEncodingSteps",
    "MagneticFieldStrength",
    "ImagingFrequency",
    "ImagedNucleus",
    "TransmitCoilName",
    "ReceiveCoilName",
    "SAR",
    "NumberOfAverages",
    "CoilType",
    "PercentSampling",
    "PercentPhaseFieldOfView",
    "ScanOptions",
    "AngioFlag",
    "TriggerTime",
    "TriggerSourceOrType",
    "BeatRejectionFlag",
    "LowRRValue",
    "HighRRValue",
    "SpoilingRFPhaseAngle",
    "PerfusionTechnique",
    "SpectrallySelectedExcitation",
    "SaturationRecovery",
    "SpectrallySelectedSuppression",
    "TimeOfFlightContrast",
    "SteadyStatePulseSequence",
    "PartialFourierDirection",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcqspecConfig {
    /// Record field that names the acquisition (protocol) a file belongs to
    pub acquisition_field: String,
    pub default_fields: Vec<String>,
    /// tracing filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl Default for AcqspecConfig {
    fn default() -> Self {
        Self {
            acquisition_field: "ProtocolName".to_string(),
            default_fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            log_filter: None,
        }
    }
}

impl AcqspecConfig {
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// `~/.acqspec/config.toml`
pub fn config_path() -> PathBuf {
    acqspec_logging::acqspec_home().join("config.toml")
}

#[derive(Debug, Serialize)]
struct ConfigReport<'a> {
    home: PathBuf,
    config_file: PathBuf,
    config_file_exists: bool,
    logs_dir: PathBuf,
    #[serde(flatten)]
    config: &'a AcqspecConfig,
}

pub fn run(config: &AcqspecConfig, json: bool) -> Result<()> {
    let report = ConfigReport {
        home: acqspec_logging::acqspec_home(),
        config_file: config_path(),
        config_file_exists: config_path().exists(),
        logs_dir: acqspec_logging::logs_dir(),
        config,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let rows = vec![
        vec!["home".to_string(), report.home.display().to_string()],
        vec![
            "config_file".to_string(),
            format!(
                "{}{}",
                report.config_file.display(),
                if report.config_file_exists { "" } else { " (not found, using defaults)" }
            ),
        ],
        vec!["logs_dir".to_string(), report.logs_dir.display().to_string()],
        vec!["acquisition_field".to_string(), config.acquisition_field.clone()],
        vec![
            "default_fields".to_string(),
            format!("{} fields", config.default_fields.len()),
        ],
        vec![
            "log_filter".to_string(),
            config
                .log_filter
                .clone()
                .unwrap_or_else(|| acqspec_logging::DEFAULT_LOG_FILTER.to_string()),
        ],
    ];
    print_table(&["Setting", "Value"], rows);
    Ok(())
}
