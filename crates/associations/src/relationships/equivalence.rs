//! Equivalence - Decide whether a requested association matches an existing one

use serde::{Deserialize, Serialize};

use crate::error::AssociationResult;
use crate::model::{same_initial_model, ModelDefinition};

use super::association::{Association, AssociationType};
use super::options::NormalizedAssociationOptions;

/// Outcome of comparing a requested association with an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncompatibilityStatus {
    DifferentTypes,
    DifferentTargets,
    DifferentOptions,
    /// Compatible, the existing association can be reused
    None,
}

impl IncompatibilityStatus {
    pub fn is_compatible(self) -> bool {
        self == Self::None
    }

    /// Categorical explanation for diagnostics
    pub fn explanation(self) -> &'static str {
        match self {
            Self::DifferentTypes => "The two associations have different types (e.g. hasMany vs belongsTo).",
            Self::DifferentTargets => "The two associations point to different target models.",
            Self::DifferentOptions => "The two associations have different options that cannot be reconciled.",
            Self::None => "The two associations are compatible.",
        }
    }
}

/// Compare an existing association with a requested declaration.
///
/// Checks run in order and the first mismatch wins: type, then target (by
/// initial model, so schema variants match), then options without `inverse`.
pub fn classify(
    existing: &Association,
    association_type: AssociationType,
    target: &ModelDefinition,
    options: &NormalizedAssociationOptions,
) -> AssociationResult<IncompatibilityStatus> {
    if existing.association_type() != association_type {
        return Ok(IncompatibilityStatus::DifferentTypes);
    }

    if !same_initial_model(existing.target(), target) {
        return Ok(IncompatibilityStatus::DifferentTargets);
    }

    if !existing.options().equivalent(options)? {
        return Ok(IncompatibilityStatus::DifferentOptions);
    }

    Ok(IncompatibilityStatus::None)
}
