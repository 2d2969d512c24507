//! BelongsTo - The foreign key lives on the source model

use std::sync::Arc;

use crate::error::AssociationResult;
use crate::model::{AttributeDefinition, DataType, ModelDefinition, ModelRef, ModelRegistry};

use super::association::{Association, AssociationType};
use super::constraints::derive_foreign_key;
use super::options::{key_or_primary, ForeignKeyOptions, NormalizedAssociationOptions};

pub(crate) fn build(
    registry: &ModelRegistry,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    let target_key = key_or_primary(options.target_key.as_deref(), target)?;

    let mut attribute = foreign_key_attribute(source, target, &options.foreign_key, &target_key);
    derive_foreign_key(&mut attribute, target, &options, &target_key, registry.config());
    source.set_attribute(attribute);

    let foreign_key = options.foreign_key.name.clone();
    let association = Arc::new(Association::new(
        AssociationType::BelongsTo,
        source,
        target,
        options,
        parent,
        foreign_key,
        target_key,
    ));

    // declared as the inverse of a hasOne/hasMany
    if let Some(parent) = parent {
        association.set_inverse_alias(parent.alias());
    }

    Ok(association)
}

/// Existing attribute merged with the caller's foreign-key options, or a new
/// attribute typed like the key it references
pub(crate) fn foreign_key_attribute(
    model: &ModelDefinition,
    referenced: &ModelDefinition,
    foreign_key: &ForeignKeyOptions,
    key: &str,
) -> AttributeDefinition {
    let mut attribute = model.attribute(&foreign_key.name).unwrap_or_else(|| {
        let data_type = referenced
            .attribute(key)
            .map(|attr| attr.data_type)
            .unwrap_or(DataType::Integer);
        AttributeDefinition::new(foreign_key.name.clone(), data_type)
    });

    if let Some(field) = &foreign_key.field {
        attribute.field = Some(field.clone());
    }
    if let Some(allow_null) = foreign_key.allow_null {
        attribute.allow_null = allow_null;
    }
    if foreign_key.on_delete.is_some() {
        attribute.on_delete = foreign_key.on_delete;
    }
    if foreign_key.on_update.is_some() {
        attribute.on_update = foreign_key.on_update;
    }
    attribute
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReferentialAction;

    #[test]
    fn test_new_attribute_copies_key_type() {
        let user = ModelDefinition::builder("User")
            .attribute(AttributeDefinition::new("id", DataType::Uuid).primary_key())
            .build();
        let post = ModelDefinition::builder("Post").build();

        let attribute = foreign_key_attribute(&post, &user, &ForeignKeyOptions::named("authorId"), "id");
        assert_eq!(attribute.name, "authorId");
        assert_eq!(attribute.data_type, DataType::Uuid);
        assert!(attribute.allow_null);
    }

    #[test]
    fn test_existing_attribute_is_merged() {
        let user = ModelDefinition::builder("User")
            .attribute(AttributeDefinition::new("id", DataType::Integer).primary_key())
            .build();
        let post = ModelDefinition::builder("Post")
            .attribute(AttributeDefinition::new("userId", DataType::BigInt).with_field("user_id"))
            .build();

        let mut foreign_key = ForeignKeyOptions::named("userId");
        foreign_key.allow_null = Some(false);
        foreign_key.on_delete = Some(ReferentialAction::Restrict);

        let attribute = foreign_key_attribute(&post, &user, &foreign_key, "id");
        assert_eq!(attribute.data_type, DataType::BigInt);
        assert_eq!(attribute.column(), "user_id");
        assert!(!attribute.allow_null);
        assert_eq!(attribute.on_delete, Some(ReferentialAction::Restrict));
    }
}
