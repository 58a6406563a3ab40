//! Field-level change detection
//!
//! Each resource kind declares a static table of [`DiffRule`]s once. The
//! table names the field, how to compare desired input against observed
//! state, and whether a difference can be applied in place or forces a
//! replacement. [`diff`] runs the table and never touches the remote API.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Change classification for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiffKind {
    /// No change
    #[serde(rename = "no-op")]
    NoOp,
    /// Applied in place by an update call
    #[serde(rename = "in-place-update")]
    Update,
    /// The remote object must be recreated
    #[serde(rename = "requires-replacement")]
    Replace,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::NoOp => write!(f, "no-op"),
            DiffKind::Update => write!(f, "in-place-update"),
            DiffKind::Replace => write!(f, "requires-replacement"),
        }
    }
}

/// One entry of a resource kind's diff table
pub struct DiffRule<I, S> {
    /// Schema name of the field
    pub field: &'static str,
    /// Classification applied when the field differs
    pub kind: DiffKind,
    /// Returns true when desired input and observed state disagree
    pub differs: fn(&I, &S) -> bool,
}

/// Result of comparing desired input against observed state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRecord {
    /// Differing fields only
    pub fields: BTreeMap<&'static str, DiffKind>,
    /// True iff `fields` is non-empty
    pub has_changes: bool,
    /// Tear down the old object before creating its replacement
    pub delete_before_replace: bool,
}

impl DiffRecord {
    /// Classification of `field`, `NoOp` when it did not change
    pub fn kind(&self, field: &str) -> DiffKind {
        self.fields.get(field).copied().unwrap_or(DiffKind::NoOp)
    }

    /// Whether any field forces a replacement
    pub fn requires_replacement(&self) -> bool {
        self.fields.values().any(|kind| *kind == DiffKind::Replace)
    }

    /// Fields that force a replacement
    pub fn replace_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, kind)| **kind == DiffKind::Replace)
            .map(|(field, _)| *field)
            .collect()
    }
}

/// Run a diff table against one input/state pair
pub fn diff<I, S>(
    rules: &[DiffRule<I, S>],
    inputs: &I,
    state: &S,
    delete_before_replace: bool,
) -> DiffRecord {
    let fields: BTreeMap<_, _> = rules
        .iter()
        .filter(|rule| rule.kind != DiffKind::NoOp && (rule.differs)(inputs, state))
        .map(|rule| (rule.field, rule.kind))
        .collect();

    DiffRecord {
        has_changes: !fields.is_empty(),
        fields,
        delete_before_replace,
    }
}
