//! DDI codebook parsing.
//!
//! Reads the study description (citation, conditions, samples), the single
//! file description (structure, record groups, charset) and every variable
//! description (span, decimals, type, value labels) from codebook markup.

use super::variable::VariableDescription;
use super::xml::{XmlElement, parse_document};
use super::{Codebook, FileDescription, RecordGroup, StudyDescription};
use crate::constants::{
    DEFAULT_ENCODING, MAX_IMPLIED_DECIMALS, STRUCTURE_HIERARCHICAL, STRUCTURE_RECTANGULAR,
    VARTYPE_CHARACTER, VARTYPE_NUMERIC,
};
use crate::error::{MicrodataError, Result};
use crate::models::{RecordStructure, VariableType};
use tracing::debug;

/// Parse codebook markup into a validated codebook
pub fn parse_codebook(xml: &str) -> Result<Codebook> {
    let root = parse_document(xml)?;

    let file_txts = root.find_all(&["fileDscr", "fileTxt"]);
    let file_txt = match file_txts.as_slice() {
        [single] => *single,
        [] => {
            return Err(MicrodataError::malformed(
                "fileDscr/fileTxt",
                "codebook has no file description",
            ));
        }
        _ => {
            return Err(MicrodataError::malformed(
                "fileDscr/fileTxt",
                "codebooks with more than one file type are not supported",
            ));
        }
    };

    let file_description = parse_file_description(file_txt)?;
    let study = parse_study_description(&root);

    let variables = root
        .find_all(&["dataDscr", "var"])
        .into_iter()
        .map(parse_variable)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Parsed codebook: {} variables, {:?} structure, {} record groups",
        variables.len(),
        file_description.structure,
        file_description.record_groups.len()
    );

    Codebook::new(file_description, variables, study)
}

fn parse_study_description(root: &XmlElement) -> StudyDescription {
    let samples = root
        .find_all(&["stdyDscr", "stdyInfo", "notes"])
        .into_iter()
        .filter_map(|notes| notes.text.trim().lines().next().map(str::to_string))
        .map(|first_line| {
            first_line
                .rsplit(':')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .collect();

    StudyDescription {
        citation: root.text_at(&["stdyDscr", "dataAccs", "useStmt", "citReq"]),
        conditions: root.text_at(&["stdyDscr", "dataAccs", "useStmt", "conditions"]),
        collection: root
            .find(&["stdyDscr", "citation", "serStmt", "serName"])
            .and_then(|e| e.attr("abbr"))
            .unwrap_or_default()
            .to_string(),
        doi: root.text_at(&["stdyDscr", "citation", "serStmt", "serInfo"]),
        samples,
    }
}

fn parse_file_description(file_txt: &XmlElement) -> Result<FileDescription> {
    let file_structure = file_txt
        .child("fileStrc")
        .ok_or_else(|| MicrodataError::malformed("fileTxt/fileStrc", "missing record structure"))?;

    let structure = match file_structure.attr("type").map(str::trim) {
        Some(STRUCTURE_RECTANGULAR) => RecordStructure::Rectangular,
        Some(STRUCTURE_HIERARCHICAL) => RecordStructure::Hierarchical,
        Some(other) => {
            return Err(MicrodataError::UnknownRecordStructure {
                value: other.to_string(),
            });
        }
        None => {
            return Err(MicrodataError::malformed(
                "fileTxt/fileStrc",
                "missing type attribute",
            ));
        }
    };

    let record_groups = file_structure
        .children("recGrp")
        .map(|group| {
            let code = group.attr("rectype").map(str::trim).unwrap_or_default();
            if code.is_empty() {
                return Err(MicrodataError::malformed(
                    "fileStrc/recGrp",
                    "record group without rectype attribute",
                ));
            }
            let label = group.text_at(&["labl"]);
            Ok(RecordGroup {
                code: code.to_string(),
                name: if label.trim().is_empty() {
                    code.to_string()
                } else {
                    label.trim().to_string()
                },
                id_variable: group.attr("recidvar").unwrap_or_default().to_string(),
                key_variables: group
                    .attr("keyvar")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let encoding = file_txt
        .child("fileType")
        .and_then(|e| e.attr("charset"))
        .map(|charset| charset.trim().to_lowercase())
        .filter(|charset| !charset.is_empty())
        .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

    Ok(FileDescription {
        filename: file_txt.text_at(&["fileName"]),
        description: file_txt.text_at(&["fileCont"]),
        structure,
        record_groups,
        encoding,
        format: file_txt.text_at(&["format"]),
        place: file_txt.text_at(&["filePlac"]),
    })
}

fn parse_variable(var: &XmlElement) -> Result<VariableDescription> {
    let name = var
        .attr("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MicrodataError::malformed("dataDscr/var", "variable without a name"))?
        .to_string();
    let section = format!("var {}", name);

    let location = var
        .child("location")
        .ok_or_else(|| MicrodataError::malformed(&section, "missing column span"))?;
    let start = parse_position(location, "StartPos", &section)?;
    let end = parse_position(location, "EndPos", &section)?;
    if start > end {
        return Err(MicrodataError::malformed(
            &section,
            format!("start column {} is after end column {}", start, end),
        ));
    }

    let implied_decimals = match var.attr("dcml").map(str::trim) {
        None | Some("") => 0,
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            MicrodataError::malformed(&section, format!("non-numeric decimal count '{}'", raw))
        })?,
    };
    if implied_decimals > MAX_IMPLIED_DECIMALS {
        return Err(MicrodataError::malformed(
            &section,
            format!(
                "decimal count {} exceeds the supported maximum of {}",
                implied_decimals, MAX_IMPLIED_DECIMALS
            ),
        ));
    }

    let vartype = match var.child("varFormat").and_then(|e| e.attr("type")) {
        Some(VARTYPE_NUMERIC) => VariableType::Numeric,
        Some(VARTYPE_CHARACTER) => VariableType::String,
        Some(other) => {
            return Err(MicrodataError::malformed(
                &section,
                format!("unknown variable type '{}'", other),
            ));
        }
        None => return Err(MicrodataError::malformed(&section, "missing varFormat type")),
    };

    let mut variable = VariableDescription {
        id: var.attr("ID").unwrap_or(&name).to_string(),
        name: name.clone(),
        rectypes: var
            .attr("rectype")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        codes: Vec::new(),
        start,
        end,
        label: var.text_at(&["labl"]),
        description: var.text_at(&["txt"]),
        concept: var.text_at(&["concept"]),
        vartype,
        notes: var.text_at(&["notes"]),
        implied_decimals,
    };

    for category in var.children("catgry") {
        let code = category.text_at(&["catValu"]);
        if code.is_empty() {
            debug!("Skipping category without a value in {}", name);
            continue;
        }
        variable.insert_code(code, category.text_at(&["labl"]));
    }

    Ok(variable)
}

fn parse_position(location: &XmlElement, attribute: &str, section: &str) -> Result<usize> {
    let raw = location
        .attr(attribute)
        .ok_or_else(|| MicrodataError::malformed(section, format!("missing {}", attribute)))?;

    match raw.trim().parse::<usize>() {
        Ok(position) if position >= 1 => Ok(position),
        Ok(_) => Err(MicrodataError::malformed(
            section,
            format!("{} must be at least 1", attribute),
        )),
        Err(_) => Err(MicrodataError::malformed(
            section,
            format!("non-numeric {} '{}'", attribute, raw),
        )),
    }
}
