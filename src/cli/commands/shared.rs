//! Shared utilities for CLI commands
//!
//! Logging setup, output writing and summary reporting used by the
//! describe and convert commands.

use crate::cli::args::OutputFormat;
use crate::decoder::{DecodeSummary, Table};
use crate::error::Result;
use crate::models::ColumnType;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::{CsvWriter, ParquetCompression, ParquetWriter, PlSmallStr, Schema, SerWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Rows and files written by a convert run
#[derive(Debug, Clone, Default)]
pub struct OutputStats {
    pub rows_written: usize,
    pub batches_written: usize,
    pub files: Vec<PathBuf>,
}

/// Set up structured logging on stderr
///
/// `RUST_LOG` takes precedence over the level derived from the flags.
pub fn setup_logging(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("microdata_processor={}", log_level)));

    // try_init: tests may run several commands in one process
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init();

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Write a whole table to one file
pub fn write_table(table: &Table, path: &Path, format: OutputFormat) -> Result<usize> {
    let mut df = table.to_dataframe()?;
    let mut file = File::create(path)?;

    match format {
        OutputFormat::Parquet => {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)?;
        }
        OutputFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        }
    }

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(df.height())
}

/// Write a stream of batches sharing `schema` to one file
///
/// Parquet batches become row groups; CSV batches are appended after a
/// single header. An empty stream still produces a file with the header
/// or schema.
pub fn write_batches<I>(
    batches: I,
    schema: &[(String, ColumnType)],
    path: &Path,
    format: OutputFormat,
    progress: Option<&ProgressBar>,
) -> Result<OutputStats>
where
    I: Iterator<Item = Result<Table>>,
{
    let mut stats = OutputStats {
        files: vec![path.to_path_buf()],
        ..OutputStats::default()
    };
    let mut file = File::create(path)?;

    match format {
        OutputFormat::Parquet => {
            let polars_schema: Schema = schema
                .iter()
                .map(|(name, column_type)| (PlSmallStr::from(name.as_str()), column_type.to_polars()))
                .collect();
            let mut writer = ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Snappy)
                .batched(&polars_schema)?;

            for batch in batches {
                let df = batch?.to_dataframe()?;
                writer.write_batch(&df)?;
                record_batch(&mut stats, df.height(), progress);
            }
            writer.finish()?;
        }
        OutputFormat::Csv => {
            let mut header_written = false;
            for batch in batches {
                let mut df = batch?.to_dataframe()?;
                CsvWriter::new(&mut file)
                    .include_header(!header_written)
                    .finish(&mut df)?;
                header_written = true;
                record_batch(&mut stats, df.height(), progress);
            }
            if !header_written {
                let mut df = Table::new("", schema).to_dataframe()?;
                CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
            }
        }
    }

    debug!(
        "Wrote {} rows in {} batches to {}",
        stats.rows_written,
        stats.batches_written,
        path.display()
    );
    Ok(stats)
}

fn record_batch(stats: &mut OutputStats, rows: usize, progress: Option<&ProgressBar>) {
    stats.rows_written += rows;
    stats.batches_written += 1;
    if let Some(pb) = progress {
        pb.set_message(format!("Decoded {} rows", stats.rows_written));
    }
}

/// Output path for one record type's table: `out.parquet` becomes
/// `out_person.parquet`
pub fn record_type_path(output: &Path, record_type: &str, format: OutputFormat) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let suffix: String = record_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    output.with_file_name(format!("{}_{}.{}", stem, suffix, format.extension()))
}

/// Delete files left behind by a failed conversion
pub fn remove_partial_outputs(paths: &[PathBuf]) {
    for path in paths.iter().filter(|path| path.exists()) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
        }
    }
}

/// Create a spinner for work of unknown length
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Print the decode and output summary
pub fn print_summary(summary: &DecodeSummary, output: &OutputStats, elapsed: Duration) {
    println!("\n{}", "Decoding Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Lines read:".bright_cyan(),
        summary.lines_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows decoded:".bright_cyan(),
        summary.rows_decoded.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows written:".bright_cyan(),
        output.rows_written.to_string().bright_white().bold()
    );
    println!(
        "  {} {:.2}%",
        "Success rate:".bright_cyan(),
        summary.success_rate()
    );

    if summary.has_problems() {
        println!("\n{}", "Problems".bright_red().bold());
        let problems = [
            ("Unknown record types:", summary.unknown_record_types),
            ("Invalid values:", summary.invalid_values),
            ("Short lines:", summary.short_lines),
            ("Long lines:", summary.long_lines),
            ("Unmatched subordinate rows:", summary.unmatched_subordinate_rows),
            ("Dropped base rows:", summary.dropped_base_rows),
        ];
        for (label, count) in problems.iter().filter(|(_, count)| *count > 0) {
            println!("  {} {}", label.bright_cyan(), count.to_string().bright_red());
        }
        for message in summary.errors.iter().take(5) {
            println!("    {}", message);
        }
    }

    println!("\n{}", "Output".bright_green().bold());
    for path in &output.files {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!(
            "  {} ({})",
            path.display().to_string().bright_white(),
            format_file_size(size)
        );
    }
    println!(
        "  {} {:.2}s",
        "Elapsed:".bright_cyan(),
        elapsed.as_secs_f64()
    );
}
