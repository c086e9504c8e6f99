//! Decode session: the error policy and counters of one decode.
//!
//! Every line-level problem is routed through [`DecodeSession::record`],
//! which either absorbs it into the summary or hands it back as fatal.
//! Sessions are independent, so concurrent decodes never share counters.

use super::stats::DecodeSummary;
use crate::config::DecodeConfig;
use crate::error::{MicrodataError, Result};

#[derive(Debug, Clone)]
pub struct DecodeSession {
    strict: bool,
    max_recorded_errors: usize,
    summary: DecodeSummary,
}

impl DecodeSession {
    pub fn new(config: &DecodeConfig) -> Self {
        Self {
            strict: config.strict_mode,
            max_recorded_errors: config.max_recorded_errors,
            summary: DecodeSummary::new(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Absorb a line-level error, or return it when it must abort the decode.
    ///
    /// Record type and value errors abort only in strict mode; line length
    /// errors never abort.
    pub fn record(&mut self, error: MicrodataError) -> Result<()> {
        match &error {
            MicrodataError::UnknownRecordType { .. } | MicrodataError::ValueDecode { .. }
                if self.strict =>
            {
                return Err(error);
            }
            MicrodataError::UnknownRecordType { .. } => self.summary.unknown_record_types += 1,
            MicrodataError::ValueDecode { .. } => self.summary.invalid_values += 1,
            MicrodataError::LineLength {
                expected, found, ..
            } => {
                if found < expected {
                    self.summary.short_lines += 1;
                } else {
                    self.summary.long_lines += 1;
                }
            }
            _ => return Err(error),
        }

        if self.summary.errors.len() < self.max_recorded_errors {
            self.summary.errors.push(error.to_string());
        }
        Ok(())
    }

    pub fn line_read(&mut self) {
        self.summary.lines_read += 1;
    }

    pub fn blank_line(&mut self) {
        self.summary.blank_lines += 1;
    }

    pub fn row_decoded(&mut self) {
        self.summary.rows_decoded += 1;
    }

    pub fn summary(&self) -> &DecodeSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DecodeSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(line: u64) -> MicrodataError {
        MicrodataError::UnknownRecordType {
            line,
            code: "X".to_string(),
        }
    }

    fn short_line() -> MicrodataError {
        MicrodataError::LineLength {
            line: 1,
            record_type: "person".to_string(),
            expected: 26,
            found: 20,
        }
    }

    #[test]
    fn test_lenient_session_counts() {
        let mut session = DecodeSession::new(&DecodeConfig::default());

        session.record(unknown(1)).unwrap();
        session.record(short_line()).unwrap();
        session
            .record(MicrodataError::LineLength {
                line: 2,
                record_type: "person".to_string(),
                expected: 26,
                found: 30,
            })
            .unwrap();

        let summary = session.summary();
        assert_eq!(summary.unknown_record_types, 1);
        assert_eq!(summary.short_lines, 1);
        assert_eq!(summary.long_lines, 1);
        assert_eq!(summary.errors.len(), 3);
        assert!(summary.has_problems());
    }

    #[test]
    fn test_strict_session_escalates() {
        let mut session = DecodeSession::new(&DecodeConfig::default().with_strict_mode());

        assert!(matches!(
            session.record(unknown(4)),
            Err(MicrodataError::UnknownRecordType { line: 4, .. })
        ));
        // Line length problems stay non-fatal even in strict mode
        assert!(session.record(short_line()).is_ok());
    }

    #[test]
    fn test_fatal_errors_pass_through() {
        let mut session = DecodeSession::new(&DecodeConfig::default());
        let err = MicrodataError::from(std::io::Error::other("read failed"));
        assert!(matches!(session.record(err), Err(MicrodataError::Io(_))));
    }

    #[test]
    fn test_recorded_errors_are_bounded() {
        let mut session =
            DecodeSession::new(&DecodeConfig::default().with_max_recorded_errors(2));
        for line in 1..=5 {
            session.record(unknown(line)).unwrap();
        }

        let summary = session.into_summary();
        assert_eq!(summary.unknown_record_types, 5);
        assert_eq!(summary.errors.len(), 2);
    }

    #[test]
    fn test_success_rate() {
        let summary = DecodeSummary {
            lines_read: 11,
            blank_lines: 1,
            rows_decoded: 9,
            unknown_record_types: 1,
            ..Default::default()
        };
        assert_eq!(summary.success_rate(), 90.0);
        assert_eq!(summary.skipped_lines(), 1);
        assert_eq!(DecodeSummary::new().success_rate(), 0.0);
    }
}
