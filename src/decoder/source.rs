//! Data file access: path resolution, format detection, transparent gzip
//! decompression and a byte-oriented line cursor.

use crate::constants::{DELIMITED_SUFFIX, FIXED_WIDTH_SUFFIX, GZIP_MAGIC, GZIP_SUFFIX};
use crate::error::{MicrodataError, Result};
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Layout convention of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    FixedWidth,
    Delimited,
}

impl DataFormat {
    /// Detect the format from the file suffix, looking through a `.gz` suffix
    pub fn from_path(path: &Path) -> Result<Self> {
        let inner = if has_suffix(path, GZIP_SUFFIX) {
            path.file_stem().map(Path::new).unwrap_or(path)
        } else {
            path
        };

        if has_suffix(inner, FIXED_WIDTH_SUFFIX) {
            Ok(DataFormat::FixedWidth)
        } else if has_suffix(inner, DELIMITED_SUFFIX) {
            Ok(DataFormat::Delimited)
        } else {
            Err(MicrodataError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Resolve a data file path, falling back between gzipped and plain siblings
pub fn resolve_data_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let sibling = if has_suffix(path, GZIP_SUFFIX) {
        path.with_extension("")
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}", GZIP_SUFFIX));
        PathBuf::from(name)
    };

    if sibling.is_file() {
        warn!(
            "Data file {} not found, reading {} instead",
            path.display(),
            sibling.display()
        );
        return Ok(sibling);
    }

    Err(MicrodataError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Open a data file for sequential reads, inflating gzip streams by magic bytes
pub fn open_data_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MicrodataError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => MicrodataError::Io(e),
    })?;

    let mut reader = BufReader::new(file);
    if is_gzip(&mut reader)? {
        debug!("Reading {} as a gzip stream", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

fn is_gzip<R: BufRead>(reader: &mut R) -> Result<bool> {
    let head = reader.fill_buf()?;
    Ok(head.starts_with(&GZIP_MAGIC))
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(suffix))
}

/// Sequential cursor over the physical lines of a source.
///
/// Lines are yielded as raw bytes with the line terminator (`\n` or `\r\n`)
/// removed. The final line need not be terminated.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: u64,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(512),
            line_number: 0,
        }
    }

    /// Next line and its 1-based number, or `None` at end of input
    pub fn next_line(&mut self) -> Result<Option<(u64, &[u8])>> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        self.line_number += 1;
        Ok(Some((self.line_number, &self.buf)))
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[test]
    fn test_line_source_strips_terminators() {
        let data = b"first\r\nsecond\n\nlast";
        let mut source = LineSource::new(&data[..]);

        assert_eq!(source.next_line().unwrap(), Some((1, &b"first"[..])));
        assert_eq!(source.next_line().unwrap(), Some((2, &b"second"[..])));
        assert_eq!(source.next_line().unwrap(), Some((3, &b""[..])));
        assert_eq!(source.next_line().unwrap(), Some((4, &b"last"[..])));
        assert_eq!(source.next_line().unwrap(), None);
        assert_eq!(source.line_number(), 4);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DataFormat::from_path(Path::new("cps_00006.dat")).unwrap(),
            DataFormat::FixedWidth
        );
        assert_eq!(
            DataFormat::from_path(Path::new("cps_00006.dat.gz")).unwrap(),
            DataFormat::FixedWidth
        );
        assert_eq!(
            DataFormat::from_path(Path::new("cps_00006.CSV")).unwrap(),
            DataFormat::Delimited
        );
        assert!(matches!(
            DataFormat::from_path(Path::new("cps_00006.sav")),
            Err(MicrodataError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_open_gzip_by_magic_bytes() {
        let dir = TempDir::new().unwrap();
        // Deliberately without a .gz suffix
        let path = dir.path().join("extract.dat");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"H2020\nP2020\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut text = String::new();
        open_data_file(&path)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "H2020\nP2020\n");
    }

    #[test]
    fn test_resolve_gz_fallback() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("extract.dat");
        std::fs::write(&plain, b"x").unwrap();

        let requested = dir.path().join("extract.dat.gz");
        assert_eq!(resolve_data_path(&requested).unwrap(), plain);

        let gz_only = dir.path().join("other.dat.gz");
        std::fs::write(&gz_only, b"x").unwrap();
        assert_eq!(
            resolve_data_path(&dir.path().join("other.dat")).unwrap(),
            gz_only
        );

        assert!(matches!(
            resolve_data_path(&dir.path().join("absent.dat")),
            Err(MicrodataError::FileNotFound { .. })
        ));
    }
}
