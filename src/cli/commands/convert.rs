//! Convert command: decode a data file and write Parquet or CSV
//!
//! Rectangular extracts are decoded and written batch by batch.
//! Hierarchical extracts are decoded whole, then written either as one
//! rectangularized table or as one file per record type.

use crate::cli::args::{ConvertArgs, OutputFormat};
use crate::cli::commands::shared::{
    OutputStats, create_spinner, print_summary, record_type_path, remove_partial_outputs,
    setup_logging, write_batches, write_table,
};
use crate::codebook::{Codebook, read_codebook};
use crate::config::DecodeConfig;
use crate::decoder::{
    DecodeSummary, HierarchicalOutput, LineDecoder, read_hierarchical_microdata,
    read_microdata_chunked,
};
use crate::error::{MicrodataError, Result};
use colored::Colorize;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Convert command runner
pub fn run_convert(args: ConvertArgs) -> Result<()> {
    setup_logging(args.get_log_level())?;
    args.validate()?;

    let format = args.output_format()?;
    let config = args.decode_config()?;
    let start = Instant::now();

    let codebook = read_codebook(&args.codebook)?;
    info!(
        "Codebook {} declares {} variables ({:?})",
        args.codebook.display(),
        codebook.variables().len(),
        codebook.structure()
    );

    if !args.quiet {
        println!(
            "{} {} -> {}",
            "Converting".bright_green().bold(),
            args.data.display(),
            args.output.display()
        );
    }

    let progress = args.show_progress().then(|| create_spinner("Decoding..."));

    let mut written = Vec::new();
    let result = if codebook.is_hierarchical() {
        convert_hierarchical(&codebook, &args, &config, format, &mut written)
    } else {
        convert_rectangular(&codebook, &args, &config, format, progress.as_ref(), &mut written)
    };

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let (summary, output) = match result {
        Ok(done) => done,
        Err(error) => {
            // Partial output from an aborted decode is not kept
            remove_partial_outputs(&written);
            return Err(error);
        }
    };

    if !args.quiet {
        print_summary(&summary, &output, start.elapsed());
    }
    Ok(())
}

fn convert_rectangular(
    codebook: &Codebook,
    args: &ConvertArgs,
    config: &DecodeConfig,
    format: OutputFormat,
    progress: Option<&ProgressBar>,
    written: &mut Vec<PathBuf>,
) -> Result<(DecodeSummary, OutputStats)> {
    let schema = LineDecoder::for_codebook(codebook, config)?
        .first()
        .map(|decoder| decoder.schema())
        .unwrap_or_default();

    let mut batches = read_microdata_chunked(codebook, &args.data, config)?;
    written.push(args.output.clone());
    let output = write_batches(&mut batches, &schema, &args.output, format, progress)?;

    Ok((batches.into_summary(), output))
}

fn convert_hierarchical(
    codebook: &Codebook,
    args: &ConvertArgs,
    config: &DecodeConfig,
    format: OutputFormat,
    written: &mut Vec<PathBuf>,
) -> Result<(DecodeSummary, OutputStats)> {
    let (decoded, summary) = read_hierarchical_microdata(codebook, &args.data, config)?;
    let mut output = OutputStats::default();

    match decoded {
        HierarchicalOutput::Rectangular(table) => {
            written.push(args.output.clone());
            output.rows_written = write_table(&table, &args.output, format)?;
            output.batches_written = 1;
            output.files.push(args.output.clone());
        }
        HierarchicalOutput::Tables(tables) => {
            if tables.is_empty() {
                warn!("No records decoded; nothing written");
            }
            for table in tables.iter() {
                let path = record_type_path(&args.output, &table.record_type, format);
                if path.exists() && !args.force {
                    return Err(MicrodataError::configuration(format!(
                        "Output file {} already exists; use --force to overwrite",
                        path.display()
                    )));
                }
                written.push(path.clone());
                output.rows_written += write_table(table, &path, format)?;
                output.batches_written += 1;
                output.files.push(path);
            }
        }
    }

    Ok((summary, output))
}
