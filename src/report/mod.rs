//! Codec report types for tracking what an export or import did.
//!
//! Recoverable conditions (skipped links, undeclared features, unknown
//! format versions) never fail a call. They are aggregated here, one issue
//! per condition with a count, so callers can show a summary instead of
//! one line per occurrence.

use serde::Serialize;
use std::fmt;

/// Which way data moved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Model to store.
    #[default]
    Export,
    /// Store to model.
    Import,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Export => f.write_str("export"),
            Direction::Import => f.write_str("import"),
        }
    }
}

/// A report generated by an export or import.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CodecReport {
    /// Direction of the call.
    pub direction: Direction,
    /// Store group the call read from or wrote to.
    pub group: String,
    /// Entities present in the source.
    pub input: CodecCounts,
    /// Entities that made it to the destination.
    pub output: CodecCounts,
    /// Links dropped because an endpoint did not resolve.
    pub skipped_links: usize,
    /// Aggregated issues.
    pub issues: Vec<CodecIssue>,
}

impl CodecReport {
    /// Create a new empty report.
    pub fn new(direction: Direction, group: impl Into<String>) -> Self {
        Self {
            direction,
            group: group.into(),
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: CodecIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CodecSeverity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CodecSeverity::Info)
            .count()
    }

    /// Returns true if some information did not survive the call.
    pub fn is_lossy(&self) -> bool {
        self.warning_count() > 0
    }

    /// Returns true if an issue with `code` was recorded.
    pub fn has(&self, code: CodecIssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Records `count` skipped links as a single aggregated warning.
    pub fn record_skipped_links(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.skipped_links += count;
        let message = format!("{} link(s) skipped due to unresolved endpoints", count);
        tracing::warn!("{}", message);
        self.add(CodecIssue::warning(
            CodecIssueCode::UnresolvedLinkEndpoint,
            message,
        ));
    }
}

impl fmt::Display for CodecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} detections, {} links, {} tracks",
            self.input.detections, self.input.links, self.input.tracks
        )?;

        if self.output != self.input {
            writeln!(
                f,
                "  output: {} detections, {} links, {} tracks",
                self.output.detections, self.output.links, self.output.tracks
            )?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == CodecSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == CodecSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

/// Counts of tracking graph entities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CodecCounts {
    pub detections: usize,
    pub links: usize,
    pub tracks: usize,
}

/// A single aggregated issue.
#[derive(Clone, Debug, Serialize)]
pub struct CodecIssue {
    pub severity: CodecSeverity,
    pub code: CodecIssueCode,
    pub message: String,
}

impl CodecIssue {
    /// Create a warning-level issue (indicates lossiness).
    pub fn warning(code: CodecIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: CodecSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Create an info-level issue (policy note).
    pub fn info(code: CodecIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: CodecSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

/// Severity level for codec issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecSeverity {
    /// Information was dropped or substituted.
    Warning,
    /// A policy decision was applied.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report schema and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecIssueCode {
    /// Links whose source or target did not resolve were skipped.
    UnresolvedLinkEndpoint,
    /// The store declares a format version this crate does not know.
    UnknownFormatVersion,
    /// There were no detections, so axis bounds are undefined.
    EmptyBoundingBox,
    /// Feature values without a declaration.
    UndeclaredFeature,
    /// A polygon had different numbers of x and y offsets.
    PolygonLengthMismatch,
    /// Tracks were rebuilt from connected components.
    TrackIdAssignment,
    /// An optional column was absent and a default was used.
    MissingOptionalColumn,
    /// A 2D export of detections with non-zero z.
    DropZCoordinate,
    /// Integer feature values outside the storable range became missing.
    IntFeatureOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_not_lossy() {
        let report = CodecReport::new(Direction::Import, "tracks.geff");
        assert!(!report.is_lossy());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.info_count(), 0);
    }

    #[test]
    fn skipped_links_aggregate_into_one_issue() {
        let mut report = CodecReport::new(Direction::Import, "tracks.geff");
        report.record_skipped_links(0);
        assert!(report.issues.is_empty());

        report.record_skipped_links(3);
        assert_eq!(report.skipped_links, 3);
        assert_eq!(report.warning_count(), 1);
        assert!(report.issues[0].message.starts_with("3 link(s) skipped"));
    }

    #[test]
    fn info_does_not_make_report_lossy() {
        let mut report = CodecReport::new(Direction::Import, "tracks.geff");
        report.add(CodecIssue::info(
            CodecIssueCode::TrackIdAssignment,
            "tracks rebuilt",
        ));
        assert!(!report.is_lossy());
        assert!(report.has(CodecIssueCode::TrackIdAssignment));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = CodecReport::new(Direction::Export, "tracks.geff");
        report.input = CodecCounts {
            detections: 10,
            links: 8,
            tracks: 2,
        };
        report.record_skipped_links(1);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"direction\":\"export\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"code\":\"unresolved_link_endpoint\""));
        assert!(json.contains("\"skipped_links\":1"));
    }

    #[test]
    fn display_lists_output_counts_when_they_differ() {
        let mut report = CodecReport::new(Direction::Export, "tracks.geff");
        report.input.links = 2;
        report.output.links = 1;
        report.record_skipped_links(1);

        let text = report.to_string();
        assert!(text.contains("output: 0 detections, 1 links"));
        assert!(text.contains("Warnings (1):"));
    }
}
