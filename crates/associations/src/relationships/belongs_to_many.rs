//! BelongsToMany - Many-to-many through a join model
//!
//! Declared as a composite: the association itself plus two `hasMany` legs,
//! `source -> through` and `target -> through`, whose inverses place both
//! foreign keys on the join model. Leg aliases can be set with
//! `through: { model, sourceAs, targetAs }`.

use std::sync::Arc;

use crate::error::{AssociationError, AssociationResult};
use crate::inflection::camelize;
use crate::model::{same_initial_model, ModelDefinition, ModelRef, ModelRegistry};

use super::association::{Association, AssociationType, ThroughLegs};
use super::declaration::declare;
use super::options::{
    key_or_primary, AliasOption, AssociationOptions, ForeignKeyOption, ForeignKeyOptions,
    NormalizedAssociationOptions, RawForeignKeyOptions, ThroughOptions,
};

pub(crate) fn build(
    registry: &ModelRegistry,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    let through_options = options
        .through
        .clone()
        .ok_or_else(|| AssociationError::invalid_options("belongsToMany must be given a through option"))?;

    let other_key = options
        .other_key
        .clone()
        .ok_or_else(|| AssociationError::invalid_options("belongsToMany requires an otherKey"))?;

    if options.foreign_key.name == other_key.name {
        return Err(AssociationError::invalid_options(format!(
            "foreignKey and otherKey of {}.{} both resolve to \"{}\", specify distinct keys",
            source.name(),
            options.alias,
            other_key.name
        )));
    }

    let through = registry.resolve_or_define(&through_options.model)?;
    let source_key = key_or_primary(options.source_key.as_deref(), source)?;
    let target_key = key_or_primary(options.target_key.as_deref(), target)?;

    let (source_alias, target_alias) = leg_aliases(source, target, &through, &through_options, &options)?;

    let from_source_options = leg_options(
        source_alias,
        &options.foreign_key,
        options.source_key.clone(),
        AliasOption::Name(source.names().singular.clone()),
        &options,
    );
    let from_target_options = leg_options(
        target_alias,
        &other_key,
        options.target_key.clone(),
        AliasOption::Name(options.name.singular.clone()),
        &options,
    );

    let association = Arc::new(Association::new(
        AssociationType::BelongsToMany,
        source,
        target,
        options,
        parent,
        source_key,
        target_key,
    ));

    let from_source = declare(
        registry,
        AssociationType::HasMany,
        source,
        &through,
        from_source_options,
        Some(&association),
    )?;
    let from_target = declare(
        registry,
        AssociationType::HasMany,
        target,
        &through,
        from_target_options,
        Some(&association),
    )?;

    association.set_through(ThroughLegs {
        through,
        from_source,
        from_target,
    });

    Ok(association)
}

/// Aliases of the source-side and target-side legs. Both default to the join
/// model's plural name, except that a self-association gets a distinct
/// target-side alias (`friendFriendships`) so the two legs stay separate.
fn leg_aliases(
    source: &ModelDefinition,
    target: &ModelDefinition,
    through: &ModelDefinition,
    through_options: &ThroughOptions,
    options: &NormalizedAssociationOptions,
) -> AssociationResult<(String, String)> {
    let plural = &through.names().plural;
    let self_association = same_initial_model(source, target);

    let source_alias = through_options.source_alias.clone().unwrap_or_else(|| plural.clone());
    let target_alias = match &through_options.target_alias {
        Some(alias) => alias.clone(),
        None if self_association => camelize(&[&options.name.singular, plural]),
        None => plural.clone(),
    };

    if self_association && source_alias == target_alias {
        return Err(AssociationError::invalid_options(format!(
            "both legs of {}.{} through {} are aliased \"{}\", specify distinct through aliases",
            source.name(),
            options.alias,
            through.name(),
            source_alias
        )));
    }

    Ok((source_alias, target_alias))
}

/// Options of one `hasMany` leg onto the join model. Join columns are not
/// nullable unless the caller says so.
fn leg_options(
    alias: String,
    foreign_key: &ForeignKeyOptions,
    source_key: Option<String>,
    inverse: AliasOption,
    options: &NormalizedAssociationOptions,
) -> AssociationOptions {
    let foreign_key = RawForeignKeyOptions {
        name: Some(foreign_key.name.clone()),
        field_name: None,
        field: foreign_key.field.clone(),
        allow_null: foreign_key.allow_null.or(Some(false)),
        on_delete: foreign_key.on_delete,
        on_update: foreign_key.on_update,
    };

    let mut leg = AssociationOptions::new()
        .alias(alias)
        .foreign_key(ForeignKeyOption::Options(foreign_key))
        .hooks(options.hooks)
        .inverse(inverse);
    leg.source_key = source_key;
    leg.foreign_key_constraints = options.foreign_key_constraints;
    leg
}
