//! HasMany - The foreign key lives on the target model
//!
//! The paired `belongsTo` is declared on the target through the orchestrator
//! with the new association as its parent. That declaration is what puts the
//! foreign-key attribute on the target.

use std::sync::Arc;

use crate::error::AssociationResult;
use crate::inflection::{camelize, upper_first};
use crate::model::{ModelDefinition, ModelRef, ModelRegistry};

use super::association::{Association, AssociationType};
use super::declaration::declare;
use super::options::{
    key_or_primary, AliasOption, AssociationOptions, ForeignKeyOption, NormalizedAssociationOptions,
    RawForeignKeyOptions,
};

pub(crate) fn build(
    registry: &ModelRegistry,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    build_with_inverse(registry, AssociationType::HasMany, source, target, options, parent)
}

/// Shared by `hasOne` and `hasMany`
pub(crate) fn build_with_inverse(
    registry: &ModelRegistry,
    association_type: AssociationType,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    let source_key = key_or_primary(options.source_key.as_deref(), source)?;
    let inverse_options = inverse_options(source, &source_key, &options);

    let association = Arc::new(Association::new(
        association_type,
        source,
        target,
        options.clone(),
        parent,
        source_key,
        options.foreign_key.name.clone(),
    ));

    let inverse = declare(
        registry,
        AssociationType::BelongsTo,
        target,
        source,
        inverse_options,
        Some(&association),
    )?;
    association.set_inverse_alias(inverse.alias());

    Ok(association)
}

/// Options of the paired `belongsTo`: same foreign key, keyed on our source key
fn inverse_options(source: &ModelRef, source_key: &str, options: &NormalizedAssociationOptions) -> AssociationOptions {
    let alias = options
        .inverse
        .as_ref()
        .and_then(|inverse| inverse.alias.clone())
        .unwrap_or_else(|| AliasOption::Name(default_inverse_alias(source, source_key, &options.foreign_key.name)));

    let foreign_key = RawForeignKeyOptions {
        name: Some(options.foreign_key.name.clone()),
        field_name: None,
        field: options.foreign_key.field.clone(),
        allow_null: options.foreign_key.allow_null,
        on_delete: options.foreign_key.on_delete,
        on_update: options.foreign_key.on_update,
    };

    AssociationOptions {
        alias: Some(alias),
        foreign_key: Some(ForeignKeyOption::Options(foreign_key)),
        target_key: options.source_key.clone(),
        foreign_key_constraints: options.foreign_key_constraints,
        hooks: Some(options.hooks),
        ..AssociationOptions::default()
    }
}

/// Inverse alias when none is given: the source's singular name for the
/// default foreign key, otherwise a name taken from the foreign key itself
/// (`editorId` -> `editor`), so associations on different keys never share
/// one inverse.
fn default_inverse_alias(source: &ModelDefinition, source_key: &str, foreign_key: &str) -> String {
    let singular = &source.names().singular;
    if foreign_key == camelize(&[singular, source_key]) {
        return singular.clone();
    }
    match foreign_key.strip_suffix(upper_first(source_key).as_str()) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => camelize(&[foreign_key, singular]),
    }
}
