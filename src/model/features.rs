//! Feature schema for the tracking graph model.
//!
//! Features are numeric values attached to detections, links, or tracks.
//! Each feature is declared once per scope with its display metadata and
//! value kind; entities then carry plain `f64` values keyed by the feature
//! key. The declared kind decides how values are typed when they cross
//! into the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity kind a feature is declared for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScope {
    Node,
    Edge,
    Track,
}

impl FeatureScope {
    /// All scopes, in store order.
    pub const ALL: [FeatureScope; 3] = [FeatureScope::Node, FeatureScope::Edge, FeatureScope::Track];

    /// Name of the store group holding entities of this scope.
    pub fn group(&self) -> &'static str {
        match self {
            FeatureScope::Node => "nodes",
            FeatureScope::Edge => "edges",
            FeatureScope::Track => "tracks",
        }
    }
}

impl fmt::Display for FeatureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureScope::Node => "node",
            FeatureScope::Edge => "edge",
            FeatureScope::Track => "track",
        };
        f.write_str(name)
    }
}

/// Physical dimension (unit category) of a feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    #[default]
    None,
    Quality,
    Cost,
    Intensity,
    IntensitySquared,
    Position,
    Velocity,
    Length,
    Area,
    Time,
    Angle,
    Rate,
    AngleRate,
    Count,
    /// A dimension written by another tool that this crate does not know.
    #[serde(other)]
    Unknown,
}

/// Value kind of a feature: decides the column type in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Real,
}

/// Declaration of one feature within one scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDeclaration {
    /// Stable key (e.g. "MEAN_INTENSITY_CH1").
    pub key: String,

    /// Display name (e.g. "Mean intensity ch1").
    pub name: String,

    /// Short display name (e.g. "Mean ch1").
    pub short_name: String,

    /// Unit category.
    #[serde(default)]
    pub dimension: Dimension,

    /// Whether values are integers or reals.
    pub kind: ValueKind,
}

impl FeatureDeclaration {
    /// Creates a new declaration.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        short_name: impl Into<String>,
        dimension: Dimension,
        kind: ValueKind,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            short_name: short_name.into(),
            dimension,
            kind,
        }
    }

    /// A declaration carrying only a key and a kind, used when a store holds
    /// values for a feature it never declared.
    pub fn bare(key: impl Into<String>, kind: ValueKind) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            short_name: key.clone(),
            key,
            dimension: Dimension::None,
            kind,
        }
    }
}

/// The declared features of a model, per scope, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node: Vec<FeatureDeclaration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge: Vec<FeatureDeclaration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub track: Vec<FeatureDeclaration>,
}

impl FeatureSchema {
    /// Declares a feature. A later declaration with the same key replaces
    /// the earlier one in place.
    pub fn declare(&mut self, scope: FeatureScope, declaration: FeatureDeclaration) {
        let decls = self.scope_mut(scope);
        match decls.iter_mut().find(|d| d.key == declaration.key) {
            Some(existing) => *existing = declaration,
            None => decls.push(declaration),
        }
    }

    /// Declared features of one scope.
    pub fn declarations(&self, scope: FeatureScope) -> &[FeatureDeclaration] {
        match scope {
            FeatureScope::Node => &self.node,
            FeatureScope::Edge => &self.edge,
            FeatureScope::Track => &self.track,
        }
    }

    /// Looks up one declaration.
    pub fn get(&self, scope: FeatureScope, key: &str) -> Option<&FeatureDeclaration> {
        self.declarations(scope).iter().find(|d| d.key == key)
    }

    /// Total number of declarations across all scopes.
    pub fn len(&self) -> usize {
        self.node.len() + self.edge.len() + self.track.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scope_mut(&mut self, scope: FeatureScope) -> &mut Vec<FeatureDeclaration> {
        match scope {
            FeatureScope::Node => &mut self.node,
            FeatureScope::Edge => &mut self.edge,
            FeatureScope::Track => &mut self.track,
        }
    }
}
