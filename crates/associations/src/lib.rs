//! # elif-associations: Association engine for elif.rs
//!
//! Declares `belongsTo`, `hasOne`, `hasMany` and `belongsToMany`
//! associations between models: normalizes declaration options, rejects
//! alias collisions, reuses equivalent declarations, derives foreign-key
//! constraints and installs accessor methods on the source model.
//!
//! ```ignore
//! let registry = ModelRegistry::new();
//! let user = registry.define(ModelDefinition::builder("User").attribute(
//!     AttributeDefinition::new("id", DataType::Integer).primary_key(),
//! ))?;
//! let post = registry.define(ModelDefinition::builder("Post"))?;
//!
//! let posts = registry.has_many(&user, &post, AssociationOptions::new().alias("posts"))?;
//! ```

pub mod config;
pub mod error;
pub mod inflection;
pub mod model;
pub mod operators;
pub mod relationships;

pub use config::*;
pub use error::*;
pub use inflection::*;
pub use model::*;
pub use operators::*;
pub use relationships::*;
