//! Tests for locating and opening codebook files

use super::*;
use crate::codebook::source::{read_codebook, read_codebook_from, resolve_codebook_path};
use crate::error::MicrodataError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_read_plain_codebook() {
    let file = create_temp_file(rectangular_codebook_xml().as_bytes());
    let codebook = read_codebook(file.path()).unwrap();
    assert_eq!(codebook.variables().len(), 8);
}

#[test]
fn test_read_gzipped_codebook() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut encoder, hierarchical_codebook_xml().as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let codebook = read_codebook_from(compressed.as_slice()).unwrap();
    assert!(codebook.is_hierarchical());
}

#[test]
fn test_read_latin1_codebook() {
    let xml = rectangular_codebook_xml().replace("Respondent alias", "Nom du r\u{e9}pondant");
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&xml);

    let codebook = read_codebook_from(bytes.as_ref()).unwrap();
    assert_eq!(
        codebook.get_variable_info("NAME").unwrap().label,
        "Nom du r\u{e9}pondant"
    );
}

#[test]
fn test_directory_with_single_codebook() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cps_00006.xml"), rectangular_codebook_xml()).unwrap();
    fs::write(dir.path().join("cps_00006.dat"), "").unwrap();

    let resolved = resolve_codebook_path(dir.path()).unwrap();
    assert_eq!(resolved, dir.path().join("cps_00006.xml"));
    assert!(read_codebook(dir.path()).is_ok());
}

#[test]
fn test_directory_with_several_codebooks_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.xml"), rectangular_codebook_xml()).unwrap();
    fs::write(dir.path().join("b.xml"), rectangular_codebook_xml()).unwrap();

    assert!(matches!(
        resolve_codebook_path(dir.path()),
        Err(MicrodataError::Configuration { .. })
    ));
}

#[test]
fn test_missing_codebook() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
        resolve_codebook_path(dir.path()),
        Err(MicrodataError::FileNotFound { .. })
    ));
    assert!(matches!(
        read_codebook(&dir.path().join("absent.xml")),
        Err(MicrodataError::FileNotFound { .. })
    ));
}

#[test]
fn test_gzip_without_xml_stem_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cps_00006.dat.gz");
    fs::write(&path, b"").unwrap();

    assert!(matches!(
        resolve_codebook_path(&path),
        Err(MicrodataError::UnsupportedFormat { .. })
    ));

    let path = dir.path().join("cps_00006.xml.gz");
    fs::write(&path, b"").unwrap();
    assert!(resolve_codebook_path(&path).is_ok());
}
