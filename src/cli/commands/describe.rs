//! Describe command: codebook metadata, variable layouts and tabulations

use crate::cli::args::DescribeArgs;
use crate::cli::commands::shared::setup_logging;
use crate::codebook::{Codebook, VariableDescription, read_codebook};
use crate::config::DecodeConfig;
use crate::decoder::{HierarchicalOutput, Table, read_hierarchical_microdata, read_microdata};
use crate::error::{MicrodataError, Result};
use crate::models::VariableType;
use crate::tabulate::tabulate;
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Describe command runner
pub fn run_describe(args: DescribeArgs) -> Result<()> {
    setup_logging(args.get_log_level())?;

    let codebook = read_codebook(&args.codebook)?;
    info!(
        "Loaded codebook with {} variables",
        codebook.variables().len()
    );

    match &args.variable {
        None => print_codebook(&codebook),
        Some(name) => {
            let variable = codebook.get_variable_info(name)?;
            print_variable(variable);
            if let Some(data) = &args.tabulate {
                print_tabulation(&codebook, variable, data)?;
            }
        }
    }

    Ok(())
}

fn print_codebook(codebook: &Codebook) {
    let file = &codebook.file_description;
    println!("\n{}", "Codebook".bright_green().bold());
    println!("  {} {}", "File:".bright_cyan(), file.filename.bright_white());
    println!("  {} {:?}", "Structure:".bright_cyan(), file.structure);
    println!("  {} {}", "Encoding:".bright_cyan(), codebook.encoding());
    if !file.description.is_empty() {
        println!("  {} {}", "Description:".bright_cyan(), file.description);
    }
    if !codebook.study.samples.is_empty() {
        println!(
            "  {} {}",
            "Samples:".bright_cyan(),
            codebook.study.samples.join(", ")
        );
    }
    if !codebook.study.doi.is_empty() {
        println!("  {} {}", "DOI:".bright_cyan(), codebook.study.doi);
    }

    if codebook.is_hierarchical() {
        println!("\n{}", "Record Types".bright_green().bold());
        for layout in codebook.layouts() {
            println!(
                "  {} {} ({} variables, {} bytes)",
                layout.record_type.code.bright_white().bold(),
                layout.name(),
                layout.variables.len(),
                layout.line_length
            );
        }
        println!(
            "  {} {}",
            "Linking variables:".bright_cyan(),
            codebook.linking_variables().join(", ")
        );
    }

    println!("\n{}", "Variables".bright_green().bold());
    for variable in codebook.variables() {
        println!(
            "  {:<12} {:>5}-{:<5} {:<8} {}",
            variable.name.bright_white(),
            variable.start,
            variable.end,
            type_label(variable),
            variable.label
        );
    }
}

fn print_variable(variable: &VariableDescription) {
    println!("\n{}", variable.name.bright_green().bold());
    println!("  {} {}", "Label:".bright_cyan(), variable.label);
    println!(
        "  {} columns {}-{} ({} bytes)",
        "Span:".bright_cyan(),
        variable.start,
        variable.end,
        variable.width()
    );
    println!("  {} {}", "Type:".bright_cyan(), type_label(variable));
    if !variable.rectypes.is_empty() {
        println!(
            "  {} {}",
            "Record types:".bright_cyan(),
            variable.rectypes.join(", ")
        );
    }
    if !variable.description.is_empty() {
        println!("  {} {}", "Description:".bright_cyan(), variable.description);
    }
    if !variable.concept.is_empty() {
        println!("  {} {}", "Concept:".bright_cyan(), variable.concept);
    }

    if !variable.codes.is_empty() {
        println!("\n  {}", "Value labels".bright_green());
        for (code, label) in &variable.codes {
            println!("    {:>8}  {}", code.bright_white(), label);
        }
    }
}

fn type_label(variable: &VariableDescription) -> String {
    match variable.vartype {
        VariableType::String => "string".to_string(),
        VariableType::Numeric if variable.implied_decimals > 0 => {
            format!("decimal({})", variable.implied_decimals)
        }
        VariableType::Numeric => "integer".to_string(),
    }
}

fn print_tabulation(codebook: &Codebook, variable: &VariableDescription, data: &Path) -> Result<()> {
    let config = DecodeConfig::default()
        .with_column_subset([variable.name.as_str()])
        .with_as_dict(true);
    let table = decode_variable(codebook, &variable.name, data, &config)?;
    let rows = tabulate(variable, &table)?;

    println!(
        "\n  {} ({} rows)",
        "Frequencies".bright_green(),
        table.height()
    );
    for row in rows {
        println!(
            "    {:>8}  {:>10}  {:>6.2}%  {}",
            row.value.to_string().bright_white(),
            row.count,
            row.proportion * 100.0,
            row.label.unwrap_or_default()
        );
    }
    Ok(())
}

/// Decode only one variable, from whichever record type carries it
fn decode_variable(
    codebook: &Codebook,
    name: &str,
    data: &Path,
    config: &DecodeConfig,
) -> Result<Table> {
    if !codebook.is_hierarchical() {
        let (table, _) = read_microdata(codebook, data, config)?;
        return Ok(table);
    }

    let (output, _) = read_hierarchical_microdata(codebook, data, config)?;
    let HierarchicalOutput::Tables(tables) = output else {
        return Err(MicrodataError::configuration(
            "Expected one table per record type",
        ));
    };

    tables
        .into_tables()
        .into_iter()
        .find(|table| table.column(name).is_some())
        .ok_or_else(|| MicrodataError::UnknownVariable {
            name: name.to_string(),
        })
}
