//! Output formatting utilities for CLI commands

use acqspec_schema::{AcquisitionSchema, ConstraintValue};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

/// Constraint shape and value as two table columns.
fn constraint_cells(value: &ConstraintValue) -> [String; 2] {
    [value.kind().to_string(), value.to_string()]
}

/// Print one acquisition: its constant fields, then its series table.
pub fn print_schema(schema: &AcquisitionSchema) {
    println!("Acquisition: {}", schema.title);
    if !schema.description.is_empty() {
        println!("{}", schema.description);
    }
    println!();

    if schema.constant.is_empty() {
        println!("No constant fields.");
    } else {
        let rows = schema
            .constant
            .iter()
            .map(|record| {
                let [kind, value] = constraint_cells(&record.value);
                vec![record.name.clone(), kind, value]
            })
            .collect();
        print_table(&["Field", "Constraint", "Value"], rows);
    }
    println!();

    if schema.variable.is_empty() {
        println!("No variable fields.");
        return;
    }
    let columns = schema.variable.columns();
    let mut headers: Vec<&str> = vec!["Series"];
    headers.extend(columns.iter().map(String::as_str));
    let rows = schema
        .variable
        .iter()
        .map(|row| {
            let mut cells = vec![row.series.to_string()];
            cells.extend(
                columns
                    .iter()
                    .map(|c| row.get(c).map(ToString::to_string).unwrap_or_default()),
            );
            cells
        })
        .collect();
    print_table(&headers, rows);
}

/// Write `contents` to `path`, or to stdout when no path is given.
pub fn emit(contents: &str, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    use anyhow::Context;
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", contents);
            Ok(())
        }
    }
}
