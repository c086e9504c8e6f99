//! Locating and opening codebook files.
//!
//! A codebook may be given as a plain `.xml` file, a gzipped `.xml.gz`
//! file, or a directory holding exactly one `.xml` file. Markup that is not
//! valid UTF-8 is decoded as windows-1252.

use super::Codebook;
use crate::constants::{GZIP_MAGIC, GZIP_SUFFIX, XML_SUFFIX};
use crate::error::{MicrodataError, Result};
use flate2::bufread::MultiGzDecoder;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read and parse a codebook from a file or directory
pub fn read_codebook(path: &Path) -> Result<Codebook> {
    let resolved = resolve_codebook_path(path)?;
    info!("Reading codebook {}", resolved.display());

    let file = fs::File::open(&resolved)?;
    let codebook = read_codebook_from(file)?;

    debug!(
        "Codebook {} declares {} variables across {} record types",
        resolved.display(),
        codebook.variables().len(),
        codebook.layouts().len()
    );
    if let Some(notice) = codebook.citation_notice() {
        info!("{}", notice);
    }
    Ok(codebook)
}

/// Parse a codebook from any reader, transparently inflating gzip streams
pub fn read_codebook_from<R: Read>(reader: R) -> Result<Codebook> {
    let mut raw = Vec::new();
    BufReader::new(reader).read_to_end(&mut raw)?;

    if raw.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        MultiGzDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
        raw = inflated;
    }

    Codebook::from_xml_str(&decode_markup(&raw))
}

fn decode_markup(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            debug!("Codebook is not valid UTF-8, decoding as windows-1252");
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(raw);
            text.into_owned()
        }
    }
}

/// Resolve a codebook argument to a single markup file
pub fn resolve_codebook_path(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let mut candidates: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_suffix(p, XML_SUFFIX))
            .collect();
        candidates.sort();

        return match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(MicrodataError::FileNotFound {
                path: path.join(format!("*.{}", XML_SUFFIX)),
            }),
            n => Err(MicrodataError::configuration(format!(
                "Directory {} holds {} codebook files; name one explicitly",
                path.display(),
                n
            ))),
        };
    }

    if path.is_file() {
        if has_suffix(path, GZIP_SUFFIX)
            && !path
                .file_stem()
                .is_some_and(|stem| has_suffix(Path::new(stem), XML_SUFFIX))
        {
            return Err(MicrodataError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
        return Ok(path.to_path_buf());
    }

    Err(MicrodataError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(suffix))
}
