//! Command implementations for the microdata processor CLI
//!
//! Each command is implemented in its own module:
//! - `describe`: Codebook metadata, variable layouts and tabulations
//! - `convert`: Decoding a data file to Parquet or CSV

pub mod convert;
pub mod describe;
pub mod shared;

pub use shared::OutputStats;

use crate::cli::args::{Args, Commands};
use crate::error::{MicrodataError, Result};

/// Main command runner: dispatches to the subcommand handler
pub fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Describe(describe_args)) => describe::run_describe(describe_args),
        Some(Commands::Convert(convert_args)) => convert::run_convert(convert_args),
        None => Err(MicrodataError::configuration("No command given")),
    }
}
