//! Application constants for the microdata processor
//!
//! Default values and well-known names from the DDI codebook format used
//! throughout the decoder.

// =============================================================================
// Codebook Conventions
// =============================================================================

/// Character set assumed when the codebook does not declare one
pub const DEFAULT_ENCODING: &str = "iso-8859-1";

/// Conventional name of the record type discriminator variable
pub const RECTYPE_VARIABLE: &str = "RECTYPE";

/// Record type name used for rectangular extracts, which declare no record groups
pub const RECTANGULAR_RECORD_TYPE: &str = "rectangular";

/// `fileStrc/@type` values
pub const STRUCTURE_RECTANGULAR: &str = "rectangular";
pub const STRUCTURE_HIERARCHICAL: &str = "hierarchical";

/// `varFormat/@type` values
pub const VARTYPE_NUMERIC: &str = "numeric";
pub const VARTYPE_CHARACTER: &str = "character";

// =============================================================================
// Decoding Defaults
// =============================================================================

/// Rows per batch when the CLI streams an extract
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Number of error messages kept verbatim in a decode summary
pub const DEFAULT_MAX_RECORDED_ERRORS: usize = 100;

/// Largest implied decimal count representable with an `i64` power of ten
pub const MAX_IMPLIED_DECIMALS: u32 = 18;

/// Gzip stream magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// =============================================================================
// File Suffixes
// =============================================================================

pub const FIXED_WIDTH_SUFFIX: &str = "dat";
pub const DELIMITED_SUFFIX: &str = "csv";
pub const GZIP_SUFFIX: &str = "gz";
pub const XML_SUFFIX: &str = "xml";
