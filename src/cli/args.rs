//! Command-line argument definitions for the microdata processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::{BlankNumericPolicy, DecodeConfig};
use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::{MicrodataError, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI arguments for the microdata processor
///
/// Decodes fixed-width census microdata extracts described by a DDI
/// codebook into Parquet or CSV tables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "microdata-processor",
    version,
    about = "Decode fixed-width census microdata extracts into Parquet or CSV",
    long_about = "Reads a DDI codebook and the fixed-width (or delimited) data file it describes, \
                  decodes every record with implied decimals and value types applied, and writes \
                  the result as Parquet or CSV. Hierarchical extracts are written either as one \
                  rectangularized table or as one table per record type."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Show codebook metadata, or the layout and labels of one variable
    Describe(DescribeArgs),
    /// Decode a data file and write it as Parquet or CSV
    Convert(ConvertArgs),
}

/// Arguments for the describe command
#[derive(Debug, Clone, Parser)]
pub struct DescribeArgs {
    /// Codebook file (.xml or .xml.gz) or a directory holding one
    #[arg(value_name = "CODEBOOK")]
    pub codebook: PathBuf,

    /// Variable to describe in detail (case-insensitive)
    #[arg(value_name = "VARIABLE")]
    pub variable: Option<String>,

    /// Decode this data file and tabulate the variable's values
    #[arg(long = "tabulate", value_name = "DATA", requires = "variable")]
    pub tabulate: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,
}

/// Arguments for the convert command
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Codebook file (.xml or .xml.gz) or a directory holding one
    #[arg(value_name = "CODEBOOK")]
    pub codebook: PathBuf,

    /// Data file (.dat, .dat.gz, .csv or .csv.gz)
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Output file; the extension selects Parquet (.parquet) or CSV (.csv)
    ///
    /// With --as-dict, one file per record type is written next to this
    /// path, named after the record type.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,

    /// Restrict decoding to these variables (comma-separated)
    #[arg(long = "subset", value_name = "LIST", value_delimiter = ',')]
    pub subset: Option<Vec<String>>,

    /// Rows per decoded batch (default: the --config value, else 100000)
    #[arg(long = "chunk-size", value_name = "ROWS")]
    pub chunk_size: Option<usize>,

    /// Abort on the first unknown record type or undecodable field
    #[arg(long = "strict")]
    pub strict: bool,

    /// Decode blank numeric fields as null instead of zero
    #[arg(long = "blank-as-missing")]
    pub blank_as_missing: bool,

    /// Hierarchical extracts: write one file per record type
    #[arg(long = "as-dict")]
    pub as_dict: bool,

    /// Hierarchical extracts: keep base records without subordinate records
    #[arg(long = "keep-unmatched-base", conflicts_with = "as_dict")]
    pub keep_unmatched_base: bool,

    /// Character encoding of string fields, overriding the codebook
    #[arg(long = "encoding", value_name = "LABEL")]
    pub encoding: Option<String>,

    /// JSON decode configuration; command-line flags take precedence
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long = "force")]
    pub force: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Output table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    /// Select the format from an output path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("parquet") => Ok(OutputFormat::Parquet),
            Some("csv") => Ok(OutputFormat::Csv),
            _ => Err(MicrodataError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl DescribeArgs {
    pub fn get_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl ConvertArgs {
    /// Validate the convert arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == Some(0) {
            return Err(MicrodataError::configuration(
                "Chunk size must be greater than 0",
            ));
        }

        OutputFormat::from_path(&self.output)?;

        if self.output.exists() && !self.force {
            return Err(MicrodataError::configuration(format!(
                "Output file {} already exists; use --force to overwrite",
                self.output.display()
            )));
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.is_file() {
                return Err(MicrodataError::FileNotFound {
                    path: config_file.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_path(&self.output)
    }

    /// Decode configuration: the optional JSON file overlaid with flags
    pub fn decode_config(&self) -> Result<DecodeConfig> {
        let mut config = match &self.config_file {
            Some(path) => DecodeConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            None => DecodeConfig::default(),
        };

        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = Some(chunk_size);
        } else if config.chunk_size.is_none() {
            config.chunk_size = Some(DEFAULT_CHUNK_SIZE);
        }
        // Rectangularized output unless asked otherwise
        config.as_dict = self.as_dict || (self.config_file.is_some() && config.as_dict);
        if let Some(subset) = &self.subset {
            config.column_subset = Some(subset.iter().map(|s| s.trim().to_string()).collect());
        }
        if self.strict {
            config.strict_mode = true;
        }
        if self.blank_as_missing {
            config.blank_numeric = BlankNumericPolicy::Missing;
        }
        if self.keep_unmatched_base {
            config.preserve_unmatched_base = true;
        }
        if let Some(encoding) = &self.encoding {
            config.encoding = Some(encoding.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    fn convert_args(args: &[&str]) -> ConvertArgs {
        match parse(args).command {
            Some(Commands::Convert(convert)) => convert,
            other => panic!("Expected convert command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_convert() {
        let args = convert_args(&[
            "microdata-processor",
            "convert",
            "cps.xml",
            "cps.dat.gz",
            "-o",
            "out.parquet",
            "--subset",
            "AGE, sex",
            "--chunk-size",
            "500",
            "--blank-as-missing",
            "--strict",
        ]);

        assert_eq!(args.output_format().unwrap(), OutputFormat::Parquet);
        let config = args.decode_config().unwrap();
        assert_eq!(config.chunk_size, Some(500));
        assert_eq!(
            config.column_subset,
            Some(vec!["AGE".to_string(), "sex".to_string()])
        );
        assert_eq!(config.blank_numeric, BlankNumericPolicy::Missing);
        assert!(config.strict_mode);
        assert!(!config.as_dict);
    }

    #[test]
    fn test_parse_describe() {
        match parse(&["microdata-processor", "describe", "cps.xml", "AGE", "-vv"]).command {
            Some(Commands::Describe(describe)) => {
                assert_eq!(describe.variable.as_deref(), Some("AGE"));
                assert_eq!(describe.get_log_level(), "debug");
            }
            other => panic!("Expected describe command, got {:?}", other),
        }

        // Tabulation needs a variable
        assert!(
            Args::try_parse_from(["microdata-processor", "describe", "cps.xml", "--tabulate", "cps.dat"])
                .is_err()
        );
    }

    #[test]
    fn test_output_format_detection() {
        assert_eq!(
            OutputFormat::from_path(Path::new("x.CSV")).unwrap(),
            OutputFormat::Csv
        );
        assert!(OutputFormat::from_path(Path::new("x.xlsx")).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let args = convert_args(&[
            "microdata-processor",
            "convert",
            "cps.xml",
            "cps.dat",
            "-o",
            "out.csv",
            "--chunk-size",
            "0",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_config_file_chunk_size_without_flag() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("decode.json");
        std::fs::write(&config_path, r#"{"chunk_size": 250, "strict_mode": true}"#).unwrap();
        let config_arg = config_path.to_string_lossy().into_owned();
        let base = [
            "microdata-processor",
            "convert",
            "cps.xml",
            "cps.dat",
            "-o",
            "out.csv",
            "--config",
            config_arg.as_str(),
        ];

        let config = convert_args(&base).decode_config().unwrap();
        assert_eq!(config.chunk_size, Some(250));
        assert!(config.strict_mode);

        let mut flagged = base.to_vec();
        flagged.extend(["--chunk-size", "10"]);
        assert_eq!(convert_args(&flagged).decode_config().unwrap().chunk_size, Some(10));

        let plain = convert_args(&base[..6]).decode_config().unwrap();
        assert_eq!(plain.chunk_size, Some(DEFAULT_CHUNK_SIZE));
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(
            Args::try_parse_from([
                "microdata-processor",
                "convert",
                "a.xml",
                "a.dat",
                "-o",
                "a.csv",
                "--as-dict",
                "--keep-unmatched-base"
            ])
            .is_err()
        );
        assert!(
            Args::try_parse_from([
                "microdata-processor",
                "convert",
                "a.xml",
                "a.dat",
                "-o",
                "a.csv",
                "-q",
                "-v"
            ])
            .is_err()
        );
    }
}
