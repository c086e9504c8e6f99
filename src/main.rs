use anyhow::Context;
use clap::Parser;
use microdata_processor::cli::args::{Args, Commands};
use microdata_processor::cli::commands;
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    if let Err(error) = run(args) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let command = match &args.command {
        Some(Commands::Describe(_)) => "describe",
        _ => "convert",
    };
    commands::run(args).with_context(|| format!("{} failed", command))
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Microdata Processor - Census Microdata Extract Decoder");
    println!("======================================================");
    println!();
    println!("Decode fixed-width census and survey microdata extracts, described by");
    println!("their DDI XML codebooks, into Parquet or CSV tables.");
    println!();
    println!("USAGE:");
    println!("    microdata-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    describe    Show codebook metadata or one variable's layout and labels");
    println!("    convert     Decode a data file into Parquet or CSV");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # List the variables of an extract:");
    println!("    microdata-processor describe cps_00006.xml");
    println!();
    println!("    # Show value labels and frequencies of one variable:");
    println!("    microdata-processor describe cps_00006.xml AGE --tabulate cps_00006.dat.gz");
    println!();
    println!("    # Convert an extract to Parquet:");
    println!("    microdata-processor convert cps_00006.xml cps_00006.dat.gz -o cps.parquet");
    println!();
    println!("    # One CSV per record type of a hierarchical extract:");
    println!("    microdata-processor convert usa_00001.xml usa_00001.dat.gz -o usa.csv --as-dict");
    println!();
    println!("For detailed help on any command, use:");
    println!("    microdata-processor <COMMAND> --help");
}
