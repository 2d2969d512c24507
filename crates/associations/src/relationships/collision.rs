//! Collision detection between association aliases and plain attributes

use crate::error::{AssociationError, AssociationResult};
use crate::model::ModelDefinition;

/// Fail if `alias` already names an attribute of `source`.
///
/// Runs twice per declaration: before construction, and again after the
/// hooks ran since they may have added attributes.
pub fn check_naming_collision(source: &ModelDefinition, alias: &str) -> AssociationResult<()> {
    if source.has_attribute(alias) {
        return Err(AssociationError::NamingCollision {
            model: source.name().to_string(),
            alias: alias.to_string(),
        });
    }
    Ok(())
}
