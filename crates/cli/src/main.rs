//! # tablebook-cli
//!
//! Command-line interface for reading and converting xlsx and CSV tables.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tablebook_sheet::{open_collection, read_tables, BookOptions, CellValue, NamedTable};
use tracing_subscriber::EnvFilter;

/// tablebook - Read and convert spreadsheet tables
#[derive(Parser)]
#[command(name = "tablebook")]
#[command(author, version, about = "Read and convert xlsx and CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Options file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip rows whose cells are all empty
    #[arg(long, global = true)]
    ignore_empty_rows: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tables of a file
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Only print this table
        #[arg(short, long)]
        table: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Copy every table of one file into a new file
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Write the first row of each table as a header
        #[arg(long)]
        header: bool,

        /// Write every value as text instead of detecting numbers and booleans
        #[arg(long)]
        text: bool,
    },
}

/// Output format for `show`.
#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    /// Aligned columns (default)
    #[default]
    Table,
    /// JSON array of tables
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    let options = load_options(cli.config.as_deref(), cli.ignore_empty_rows)?;

    match cli.command {
        Command::Show {
            file,
            table,
            format,
        } => show(&file, table.as_deref(), format, &options),
        Command::Convert {
            input,
            output,
            header,
            text,
        } => {
            let written = convert(&input, &output, header, text, &options)?;
            println!(
                "{} {} table(s) to {}",
                "Wrote".green().bold(),
                written,
                output.display()
            );
            Ok(())
        }
    }
}

/// Read options from a JSON file, command-line flags win
fn load_options(config: Option<&Path>, ignore_empty_rows: bool) -> Result<BookOptions> {
    let mut options = match config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => BookOptions::default(),
    };

    if ignore_empty_rows {
        options.ignore_empty_rows = true;
    }
    Ok(options)
}

fn show(file: &Path, table: Option<&str>, format: OutputFormat, options: &BookOptions) -> Result<()> {
    let mut tables = read_tables(file, options)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if let Some(name) = table {
        tables.retain(|t| t.name == name);
        if tables.is_empty() {
            bail!("No table named '{name}' in {}", file.display());
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tables)?),
        OutputFormat::Table => {
            for table in &tables {
                print_table(table);
            }
        }
    }
    Ok(())
}

/// Print a table with padded columns.
fn print_table(table: &NamedTable) {
    println!(
        "{} ({} rows)",
        table.name.cyan().bold(),
        table.rows.len()
    );

    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in &table.rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect();
        println!("  {}", line.join(" | ").trim_end());
    }

    if !table.groups.is_empty() {
        let groups: Vec<String> = table.groups.iter().map(ToString::to_string).collect();
        println!("  {} {}", "groups:".yellow(), groups.join(" "));
    }
    println!();
}

/// Convert a read value back into a cell value.
fn parse_cell(value: &str) -> CellValue {
    if value.is_empty() {
        CellValue::Blank
    } else if value == "true" {
        CellValue::Boolean(true)
    } else if value == "false" {
        CellValue::Boolean(false)
    } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
        CellValue::Number(n)
    } else {
        CellValue::from(value)
    }
}

/// Copy all tables of `input` into the new file `output`. Returns the number of tables.
fn convert(
    input: &Path,
    output: &Path,
    header: bool,
    text: bool,
    options: &BookOptions,
) -> Result<usize> {
    if output.exists() {
        bail!("Output file already exists: {}", output.display());
    }

    let tables = read_tables(input, options)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut collection = open_collection(output, options)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let single_table = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if single_table && tables.len() != 1 {
        bail!(
            "{} holds {} tables, a CSV file can hold only one",
            input.display(),
            tables.len()
        );
    }

    // New sheets are inserted first, so write in reverse to keep the order
    for table in tables.iter().rev() {
        let name = if single_table {
            output
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            table.name.clone()
        };

        let mut writer = collection
            .get_writer(&name)
            .with_context(|| format!("Failed to create table '{name}'"))?;

        for (index, row) in table.rows.iter().enumerate() {
            let values: Vec<CellValue> = if text {
                row.iter().map(CellValue::from).collect()
            } else {
                row.iter().map(|value| parse_cell(value)).collect()
            };

            if header && index == 0 {
                writer.write_header(&values)?;
            } else {
                writer.write_row(&values)?;
            }
        }

        for group in &table.groups {
            writer.group_rows(group.start_index(), group.end_index())?;
        }
        writer.close()?;
        tracing::debug!("Copied table '{}' ({} rows)", name, table.rows.len());
    }

    collection.close()?;
    Ok(tables.len())
}
