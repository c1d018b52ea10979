//! Tracking model validation.
//!
//! This module checks a model before it is exported:
//! - Structural integrity (unique IDs, link endpoints and track members exist)
//! - Data quality (finite positions, sane radii, normalized colors)
//! - Feature consistency (storable keys, declared and integral values)
//!
//! The exporter itself only refuses what it cannot write at all; this
//! pass also reports data that would survive export but is likely wrong.
//! Links with a missing endpoint are warnings: export skips them.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::geff::{is_storable_key, to_int};
use crate::model::{
    DetectionId, FeatureScope, LinkId, TrackId, TrackingModel, ValueKind,
};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates a tracking model and returns a report of all issues found.
pub fn validate_model(model: &TrackingModel, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_units(model, &mut report);
    validate_schema(model, &mut report);

    let detection_ids = validate_detections(model, &mut report);
    let link_ids = validate_links(model, &detection_ids, &mut report);
    validate_tracks(model, &detection_ids, &link_ids, &mut report);

    report
}

fn validate_units(model: &TrackingModel, report: &mut ValidationReport) {
    for (label, unit) in [("space", &model.space_units), ("time", &model.time_units)] {
        if unit.trim().is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyUnits,
                format!("Empty {} units", label),
                IssueContext::Model,
            ));
        }
    }
}

fn validate_schema(model: &TrackingModel, report: &mut ValidationReport) {
    for scope in FeatureScope::ALL {
        for decl in model.features.declarations(scope) {
            if !is_storable_key(&decl.key) {
                report.add(ValidationIssue::error(
                    IssueCode::InvalidFeatureKey,
                    "Key is empty, contains '/', or starts with '.'",
                    IssueContext::Feature {
                        scope,
                        key: decl.key.clone(),
                    },
                ));
            }
        }
    }
}

/// Checks one entity's feature values against its scope's declarations.
fn validate_feature_values(
    model: &TrackingModel,
    scope: FeatureScope,
    values: &BTreeMap<String, f64>,
    context: impl Fn() -> IssueContext,
    report: &mut ValidationReport,
) {
    for (key, &value) in values {
        match model.features.get(scope, key) {
            None => report.add(ValidationIssue::warning(
                IssueCode::UndeclaredFeature,
                format!("Value for undeclared {} feature '{}' will not be exported", scope, key),
                context(),
            )),
            Some(decl) if decl.kind == ValueKind::Int && !value.is_nan() && to_int(value).is_none() => {
                report.add(ValidationIssue::warning(
                    IssueCode::IntFeatureOutOfRange,
                    format!(
                        "Integer feature '{}' has value {} outside the 32-bit range (will be stored as missing)",
                        key, value
                    ),
                    context(),
                ))
            }
            Some(decl) if decl.kind == ValueKind::Int && value.is_finite() && value.fract() != 0.0 => {
                report.add(ValidationIssue::warning(
                    IssueCode::NonIntegerFeatureValue,
                    format!("Integer feature '{}' has value {} (will be rounded)", key, value),
                    context(),
                ))
            }
            Some(_) => {}
        }
    }
}

/// Validates all detections and returns the set of their IDs.
fn validate_detections(model: &TrackingModel, report: &mut ValidationReport) -> HashSet<DetectionId> {
    let mut seen_ids: HashMap<DetectionId, usize> = HashMap::new();

    for (idx, detection) in model.detections.iter().enumerate() {
        let id = detection.id.as_i64();

        if let Some(first_idx) = seen_ids.get(&detection.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateDetectionId,
                format!("Duplicate detection ID {} (first seen at index {})", id, first_idx),
                IssueContext::Detection { id },
            ));
        } else {
            seen_ids.insert(detection.id, idx);
        }

        if detection.position.iter().any(|c| !c.is_finite()) {
            report.add(ValidationIssue::error(
                IssueCode::PositionNotFinite,
                format!("Position {:?} contains NaN or infinity", detection.position),
                IssueContext::Detection { id },
            ));
        }

        if !detection.radius.is_finite() || detection.radius < 0.0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidRadius,
                format!("Radius {} must be finite and non-negative", detection.radius),
                IssueContext::Detection { id },
            ));
        }

        if i32::try_from(detection.frame).is_err() {
            report.add(ValidationIssue::error(
                IssueCode::FrameOutOfRange,
                format!("Frame {} exceeds the 32-bit time column", detection.frame),
                IssueContext::Detection { id },
            ));
        }

        if let Some(color) = detection.color {
            if !color.is_normalized() {
                report.add(ValidationIssue::warning(
                    IssueCode::ColorOutOfRange,
                    format!("Color {:?} has components outside [0, 1]", color.0),
                    IssueContext::Detection { id },
                ));
            }
        }

        validate_feature_values(
            model,
            FeatureScope::Node,
            &detection.features,
            || IssueContext::Detection { id },
            report,
        );
    }

    seen_ids.into_keys().collect()
}

/// Validates all links and returns the set of their IDs.
fn validate_links(
    model: &TrackingModel,
    detection_ids: &HashSet<DetectionId>,
    report: &mut ValidationReport,
) -> HashSet<LinkId> {
    let mut seen_ids: HashMap<LinkId, usize> = HashMap::new();

    for (idx, link) in model.links.iter().enumerate() {
        let id = link.id.as_i64();

        if let Some(first_idx) = seen_ids.get(&link.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateLinkId,
                format!("Duplicate link ID {} (first seen at index {})", id, first_idx),
                IssueContext::Link { id },
            ));
        } else {
            seen_ids.insert(link.id, idx);
        }

        for (end, detection) in [("source", link.source), ("target", link.target)] {
            if !detection_ids.contains(&detection) {
                report.add(ValidationIssue::warning(
                    IssueCode::MissingLinkEndpoint,
                    format!("References non-existent {} detection {}", end, detection),
                    IssueContext::Link { id },
                ));
            }
        }

        if !link.weight.is_finite() || link.weight < 0.0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidWeight,
                format!("Weight {} must be finite and non-negative", link.weight),
                IssueContext::Link { id },
            ));
        }

        validate_feature_values(
            model,
            FeatureScope::Edge,
            &link.features,
            || IssueContext::Link { id },
            report,
        );
    }

    seen_ids.into_keys().collect()
}

fn validate_tracks(
    model: &TrackingModel,
    detection_ids: &HashSet<DetectionId>,
    link_ids: &HashSet<LinkId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<TrackId, usize> = HashMap::new();

    for (idx, track) in model.tracks.iter().enumerate() {
        let id = track.id.as_i64();

        if let Some(first_idx) = seen_ids.get(&track.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateTrackId,
                format!("Duplicate track ID {} (first seen at index {})", id, first_idx),
                IssueContext::Track { id },
            ));
        } else {
            seen_ids.insert(track.id, idx);
        }

        for detection in track.detections.iter().filter(|d| !detection_ids.contains(d)) {
            report.add(ValidationIssue::error(
                IssueCode::MissingTrackMember,
                format!("Lists non-existent detection {}", detection),
                IssueContext::Track { id },
            ));
        }
        for link in track.links.iter().filter(|l| !link_ids.contains(l)) {
            report.add(ValidationIssue::error(
                IssueCode::MissingTrackMember,
                format!("Lists non-existent link {}", link),
                IssueContext::Track { id },
            ));
        }

        validate_feature_values(
            model,
            FeatureScope::Track,
            &track.features,
            || IssueContext::Track { id },
            report,
        );
    }
}
