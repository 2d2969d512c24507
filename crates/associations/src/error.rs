//! Error types for association declaration
//!
//! Every failure is terminal to the declaration call that raised it and is
//! meant to be surfaced verbatim to the declaring caller.

use thiserror::Error;

use crate::config::ConfigError;
use crate::relationships::equivalence::IncompatibilityStatus;

/// Result type alias for association operations
pub type AssociationResult<T> = Result<T, AssociationError>;

/// Error types for association declaration and accessor dispatch
#[derive(Debug, Error)]
pub enum AssociationError {
    /// A removed or renamed option key was used
    #[error("The \"{old}\" option has been renamed. Use \"{new}\" instead.")]
    RenamedOption { old: String, new: String },

    /// The alias is already taken by a plain attribute of the source model
    #[error("Naming collision between attribute '{alias}' and association '{alias}' on model {model}. To remedy this, change the \"as\" option in your association definition")]
    NamingCollision { model: String, alias: String },

    /// The alias is already taken by an incompatible association
    #[error("{}", conflict_message(.model, .alias, .existing, .requested, .status))]
    Conflict {
        model: String,
        alias: String,
        existing: String,
        requested: String,
        status: IncompatibilityStatus,
    },

    /// The type-specific builder failed
    #[error("Defining {description} failed{}", chain_suffix(.chain))]
    Construction {
        description: String,
        chain: Vec<String>,
        #[source]
        cause: Box<AssociationError>,
    },

    /// The association target is not a known model
    #[error("{name} is not a model. Associations can only be declared between models")]
    NotAModel { name: String },

    /// A model was used before it was attached to a registry
    #[error("Model {model} has not been initialized yet. Attach it to a model registry before declaring associations on it")]
    ModelNotInitialized { model: String },

    /// A model can belong to one registry only
    #[error("Model {model} is already attached to another model registry")]
    AlreadyAttached { model: String },

    /// Options are structurally invalid for the association kind
    #[error("Invalid association options: {message}")]
    InvalidOptions { message: String },

    /// The referenced model has no primary key to join on
    #[error("Model {model} has no primary key, specify the key explicitly")]
    MissingPrimaryKey { model: String },

    /// An accessor needed a key value the instance does not hold
    #[error("Instance of {model} has no value for '{attribute}'")]
    MissingKeyValue { model: String, attribute: String },

    /// Dispatch to a method the model does not expose
    #[error("Model {model} has no method named '{method}'")]
    UnknownMethod { model: String, method: String },

    /// An accessor outlived its association
    #[error("Association '{alias}' is no longer attached to its model")]
    AssociationDropped { alias: String },

    /// A lifecycle hook callback failed
    #[error(transparent)]
    Hook(anyhow::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AssociationError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// The incompatibility reported by a naming conflict, if this is one
    pub fn incompatibility(&self) -> Option<IncompatibilityStatus> {
        match self {
            Self::Conflict { status, .. } => Some(*status),
            Self::Construction { cause, .. } => cause.incompatibility(),
            _ => None,
        }
    }
}

fn conflict_message(
    model: &str,
    alias: &str,
    existing: &str,
    requested: &str,
    status: &IncompatibilityStatus,
) -> String {
    format!(
        "You have defined two associations with the same name \"{alias}\" on the model \"{model}\". \
         Use another alias using the \"as\" parameter.\n\
         Existing association: {existing}\n\
         Requested association: {requested}\n\
         {}",
        status.explanation()
    )
}

fn chain_suffix(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (declared by {})", chain.join(" <- "))
    }
}
