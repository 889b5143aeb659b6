//! Apply command - run an edit script against an exported schema document

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use acqspec_schema::{apply_script, parse_script, SchemaDocument, SchemaSession, TracingNotifier};

use crate::cli::output::{emit, print_schema};

/// Arguments for the `apply` command
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Exported schema document
    pub schema: PathBuf,

    /// JSON array of edit actions
    pub edits: PathBuf,

    /// Acquisition to edit (required when the document holds several)
    #[arg(short, long)]
    pub acquisition: Option<String>,

    /// Output the resulting document as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the resulting document to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read schema: {}", args.schema.display()))?;
    let document = SchemaDocument::from_json(&contents)
        .with_context(|| format!("Invalid schema document: {}", args.schema.display()))?;

    let script_text = std::fs::read_to_string(&args.edits)
        .with_context(|| format!("Failed to read edits: {}", args.edits.display()))?;
    let script = parse_script(&script_text)
        .with_context(|| format!("Invalid edit script: {}", args.edits.display()))?;

    let title = match args.acquisition {
        Some(title) => title,
        None => {
            let mut titles = document.acquisitions.keys();
            match (titles.next(), titles.next()) {
                (Some(only), None) => only.clone(),
                (None, _) => bail!("Schema document has no acquisitions"),
                (Some(_), Some(_)) => bail!(
                    "Document holds several acquisitions; choose one with --acquisition ({})",
                    document
                        .acquisitions
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }
        }
    };

    let mut session = SchemaSession::from_document(&document)?;
    let builder = session
        .find_by_title_mut(&title)
        .ok_or_else(|| anyhow!("No acquisition titled '{}'", title))?;
    apply_script(builder, &script, &TracingNotifier)
        .with_context(|| format!("Edits to '{}' were rejected", title))?;
    if builder.has_open_edits() {
        bail!("Edit script left open edits; end it with finish_editing");
    }

    if !args.json {
        print_schema(builder.schema());
    }

    let document = session.finalize()?;
    let json = document.to_json()?;
    if let Some(out) = &args.out {
        emit(&json, Some(out))?;
    }
    if args.json {
        emit(&json, None)?;
    }
    Ok(())
}
