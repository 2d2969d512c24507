//! Association engine configuration
//!
//! Loaded from `ELIF_ASSOCIATIONS_*` environment variables the same way the
//! application configuration is.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::relationships::equivalence::IncompatibilityStatus;

pub const COMPOSITE_REUSE_VAR: &str = "ELIF_ASSOCIATIONS_COMPOSITE_REUSE";
pub const FOREIGN_KEY_CONSTRAINTS_VAR: &str = "ELIF_ASSOCIATIONS_FOREIGN_KEY_CONSTRAINTS";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// How far a composite (through) declaration may reuse an existing leg that
/// does not match the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeReusePolicy {
    /// Any incompatibility between two composite legs is tolerated
    #[default]
    Tolerant,
    /// Only differing options are tolerated, type and target must match
    OptionsOnly,
    /// Composite legs follow the plain reuse rule
    Strict,
}

impl CompositeReusePolicy {
    /// Whether a leg classified with `status` may be reused
    pub fn tolerates(self, status: IncompatibilityStatus) -> bool {
        match self {
            Self::Tolerant => true,
            Self::OptionsOnly => matches!(
                status,
                IncompatibilityStatus::None | IncompatibilityStatus::DifferentOptions
            ),
            Self::Strict => status == IncompatibilityStatus::None,
        }
    }
}

impl FromStr for CompositeReusePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tolerant" => Ok(Self::Tolerant),
            "options-only" | "options_only" => Ok(Self::OptionsOnly),
            "strict" => Ok(Self::Strict),
            _ => Err(ConfigError::InvalidValue {
                field: "composite_reuse".to_string(),
                value: s.to_string(),
                expected: "tolerant, options-only, or strict".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CompositeReusePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = match self {
            Self::Tolerant => "tolerant",
            Self::OptionsOnly => "options-only",
            Self::Strict => "strict",
        };
        write!(f, "{}", policy)
    }
}

/// Engine-wide association settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationConfig {
    pub composite_reuse: CompositeReusePolicy,
    /// Infer `references` for foreign keys unless an association opts out
    pub foreign_key_constraints: bool,
}

impl AssociationConfig {
    pub fn new() -> Self {
        Self {
            composite_reuse: CompositeReusePolicy::Tolerant,
            foreign_key_constraints: true,
        }
    }

    /// Configuration that rejects every incompatible composite leg
    pub fn strict() -> Self {
        Self {
            composite_reuse: CompositeReusePolicy::Strict,
            ..Self::new()
        }
    }

    pub fn with_composite_reuse(mut self, policy: CompositeReusePolicy) -> Self {
        self.composite_reuse = policy;
        self
    }

    pub fn with_foreign_key_constraints(mut self, enabled: bool) -> Self {
        self.foreign_key_constraints = enabled;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(policy) = env::var(COMPOSITE_REUSE_VAR) {
            config.composite_reuse = policy.parse()?;
        }

        if let Ok(enabled) = env::var(FOREIGN_KEY_CONSTRAINTS_VAR) {
            config.foreign_key_constraints =
                enabled.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "foreign_key_constraints".to_string(),
                    value: enabled,
                    expected: "true or false".to_string(),
                })?;
        }

        Ok(config)
    }
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self::new()
    }
}
