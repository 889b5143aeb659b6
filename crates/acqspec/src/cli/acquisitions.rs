//! Acquisitions command - list what a record file contains

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use acqspec_schema::InMemoryRowSource;

use crate::cli::config::AcqspecConfig;
use crate::cli::output::print_table;

#[derive(Debug)]
pub struct AcquisitionsArgs {
    pub records: PathBuf,
    pub acquisition_field: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct AcquisitionSummary {
    name: String,
    records: usize,
}

#[derive(Debug, Serialize)]
struct AcquisitionsReport {
    acquisition_field: String,
    records: usize,
    acquisitions: Vec<AcquisitionSummary>,
    columns: Vec<String>,
}

/// Load a record file as an in-memory row source.
pub fn load_records(path: &Path, acquisition_field: &str) -> Result<InMemoryRowSource> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records: {}", path.display()))?;
    InMemoryRowSource::from_json(acquisition_field, &contents)
        .with_context(|| format!("Failed to parse records: {}", path.display()))
}

pub fn run(args: AcquisitionsArgs, config: &AcqspecConfig) -> Result<()> {
    let field = args
        .acquisition_field
        .unwrap_or_else(|| config.acquisition_field.clone());
    let source = load_records(&args.records, &field)?;

    let report = AcquisitionsReport {
        acquisitions: source
            .acquisitions()
            .into_iter()
            .map(|name| AcquisitionSummary {
                records: source.records_in(&name),
                name,
            })
            .collect(),
        columns: source.columns(),
        records: source.record_count(),
        acquisition_field: field,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.acquisitions.is_empty() {
        println!(
            "No records carry '{}'. Use --acquisition-field to pick another field.",
            report.acquisition_field
        );
        return Ok(());
    }
    let rows = report
        .acquisitions
        .iter()
        .map(|a| vec![a.name.clone(), a.records.to_string()])
        .collect();
    print_table(&["Acquisition", "Records"], rows);
    println!();
    println!("{} fields: {}", report.columns.len(), report.columns.join(", "));
    Ok(())
}
