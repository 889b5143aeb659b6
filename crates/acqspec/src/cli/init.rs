//! Init command - select fields and derive an acquisition's starting schema

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use acqspec_schema::{SchemaBuilder, SchemaSession};

use crate::cli::acquisitions::load_records;
use crate::cli::config::AcqspecConfig;
use crate::cli::output::{emit, print_schema};

/// Arguments for the `init` command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// JSON array of flat header records, one per file
    pub records: PathBuf,

    /// Acquisition (protocol) to build a schema for
    #[arg(short, long)]
    pub acquisition: String,

    /// Field to constrain; repeat for several. Defaults to the configured
    /// default fields present in the records
    #[arg(short, long = "field")]
    pub fields: Vec<String>,

    /// Title for the schema (defaults to the acquisition name)
    #[arg(long)]
    pub title: Option<String>,

    /// Free-text description stored with the schema
    #[arg(long)]
    pub description: Option<String>,

    /// Field that names each record's acquisition
    #[arg(long)]
    pub acquisition_field: Option<String>,

    /// Output the export document as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the export document to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: InitArgs, config: &AcqspecConfig) -> Result<()> {
    let acquisition_field = args
        .acquisition_field
        .as_deref()
        .unwrap_or(&config.acquisition_field);
    let source = load_records(&args.records, acquisition_field)?;

    if source.records_in(&args.acquisition) == 0 {
        bail!(
            "No records for acquisition '{}'. Available: {}",
            args.acquisition,
            source.acquisitions().join(", ")
        );
    }

    let fields = if args.fields.is_empty() {
        let columns = source.columns();
        let present: Vec<String> = config
            .default_fields
            .iter()
            .filter(|f| columns.contains(*f))
            .cloned()
            .collect();
        if present.is_empty() {
            bail!("None of the default fields appear in the records; pass --field explicitly");
        }
        present
    } else {
        args.fields.clone()
    };

    let mut builder = SchemaBuilder::new(&args.acquisition);
    for field in &fields {
        builder
            .select_field(field.as_str())
            .with_context(|| format!("Cannot select '{}'", field))?;
    }
    builder
        .finish_selection(&source)
        .with_context(|| format!("Failed to build schema for '{}'", args.acquisition))?;
    if let Some(title) = &args.title {
        builder.set_title(title.as_str());
    }
    if let Some(description) = &args.description {
        builder.set_description(description.as_str());
    }
    info!(
        acquisition = %args.acquisition,
        fields = fields.len(),
        "initialized schema"
    );

    if !args.json {
        print_schema(builder.schema());
    }

    let mut session = SchemaSession::new();
    session.add(builder);
    let document = session.finalize()?;
    let json = document.to_json()?;

    if let Some(out) = &args.out {
        emit(&json, Some(out))?;
        if !args.json {
            println!();
            println!("Wrote {}", out.display());
        }
    }
    if args.json {
        emit(&json, None)?;
    }
    Ok(())
}
