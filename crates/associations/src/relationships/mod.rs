//! Relationships Module - Association declaration and resolution
//!
//! Callers declare associations through [`crate::model::ModelRegistry`],
//! which hands every declaration to [`declaration::declare`].

pub mod accessors;
pub mod association;
pub mod collision;
pub mod constraints;
pub mod declaration;
pub mod equivalence;
pub mod options;
pub mod query;

mod belongs_to;
mod belongs_to_many;
mod has_many;
mod has_one;

pub use accessors::{inject_accessors, COLLECTION_ALIASES};
pub use association::{describe, AccessorKind, Association, AssociationType, ThroughLegs};
pub use collision::check_naming_collision;
pub use constraints::derive_foreign_key;
pub use declaration::declare;
pub use equivalence::{classify, IncompatibilityStatus};
pub use options::{
    normalize_options, resolve_alias, AliasOption, AssociationOptions, ForeignKeyOption, ForeignKeyOptions,
    InverseOptions, NormalizedAssociationOptions, RawForeignKeyOptions, ThroughOptions,
};
pub use query::{AccessorOutcome, AssociationQuery, Condition, JoinClause, QueryOperation};
