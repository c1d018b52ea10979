//! Validation report types for structured error reporting.
//!
//! This module provides rich, structured validation results that can be
//! displayed to users, written to files, or processed programmatically.

use serde::Serialize;
use std::fmt;

use crate::model::FeatureScope;

/// The result of validating a tracking model.
///
/// Contains all issues found during validation, categorized by severity.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// All issues found during validation.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns true if any issue carries `code`.
    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Where the issue occurred.
    #[serde(serialize_with = "serialize_context")]
    pub context: IssueContext,
}

fn serialize_context<S: serde::Serializer>(
    context: &IssueContext,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(context)
}

impl ValidationIssue {
    /// Creates a new validation issue.
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    /// Creates a new warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A warning that doesn't prevent export but may indicate problems.
    Warning,
    /// An error that indicates invalid or corrupt data.
    Error,
}

/// A stable code identifying the type of validation issue.
///
/// These codes can be used for filtering, ignoring specific issues,
/// or programmatic handling of validation results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // ID uniqueness issues
    /// Multiple detections have the same ID.
    DuplicateDetectionId,
    /// Multiple links have the same ID.
    DuplicateLinkId,
    /// Multiple tracks have the same ID.
    DuplicateTrackId,

    // Reference issues
    /// A link references a non-existent detection. Export skips it.
    MissingLinkEndpoint,
    /// A track lists a non-existent detection or link.
    MissingTrackMember,

    // Detection issues
    /// A position component is NaN or infinite.
    PositionNotFinite,
    /// A radius is negative or not finite.
    InvalidRadius,
    /// A color component lies outside [0, 1].
    ColorOutOfRange,
    /// A frame does not fit a 32-bit store column.
    FrameOutOfRange,

    // Link issues
    /// A link weight is negative or not finite.
    InvalidWeight,

    // Feature issues
    /// A feature key cannot be used as a store path segment.
    InvalidFeatureKey,
    /// An entity carries a value for a feature nobody declared.
    UndeclaredFeature,
    /// An integer feature value cannot be stored in 32 bits.
    IntFeatureOutOfRange,
    /// An integer feature carries a fractional value.
    NonIntegerFeatureValue,

    // Model issues
    /// Space or time units are empty.
    EmptyUnits,
}

/// Context about where a validation issue occurred.
#[derive(Clone, Debug)]
pub enum IssueContext {
    /// Issue with the model as a whole.
    Model,
    /// Issue with a specific detection.
    Detection { id: i64 },
    /// Issue with a specific link.
    Link { id: i64 },
    /// Issue with a specific track.
    Track { id: i64 },
    /// Issue with a feature declaration.
    Feature { scope: FeatureScope, key: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Model => write!(f, "model"),
            IssueContext::Detection { id } => write!(f, "detection {}", id),
            IssueContext::Link { id } => write!(f, "link {}", id),
            IssueContext::Track { id } => write!(f, "track {}", id),
            IssueContext::Feature { scope, key } => write!(f, "{} feature '{}'", scope, key),
        }
    }
}
