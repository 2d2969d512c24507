//! Declaration Orchestrator - Single entry point for declaring associations
//!
//! Sequence: normalize, collision check, reuse check against the existing
//! association under the same alias, `beforeAssociate`, construction,
//! `afterAssociate`, second collision check, accessor injection and
//! registration on the source model.
//!
//! A failed outermost declaration restores the models it touched, so inverses
//! and legs declared on the way never outlive it.

use std::sync::Arc;

use crate::error::{AssociationError, AssociationResult};
use crate::model::definition::ModelSnapshot;
use crate::model::{same_initial_model, AssociateContext, ModelDefinition, ModelRef, ModelRegistry};

use super::accessors::{inject_accessors, COLLECTION_ALIASES};
use super::association::{describe, AccessorKind, Association, AssociationType};
use super::collision::check_naming_collision;
use super::equivalence::{classify, IncompatibilityStatus};
use super::options::{normalize_options, AssociationOptions, NormalizedAssociationOptions};
use super::{belongs_to, belongs_to_many, has_many, has_one};

/// Declare `association_type` from `source` to `target`, or return the
/// equivalent association already registered under the same alias.
///
/// `parent` is set when the call is one leg of a composite declaration.
pub fn declare(
    registry: &ModelRegistry,
    association_type: AssociationType,
    source: &ModelRef,
    target: &ModelRef,
    options: AssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    ensure_initialized(registry, source)?;
    ensure_initialized(registry, target)?;

    let mut options = normalize_options(association_type, options, source, target, registry.inflector())?;

    check_naming_collision(source, &options.alias)?;

    if let Some(existing) = source.association(&options.alias) {
        return reuse(registry, existing, association_type, source, target, &options, parent);
    }

    let context = AssociateContext {
        source: Arc::clone(source),
        target: Arc::clone(target),
        association_type,
    };

    if options.hooks {
        source.hooks().run_before_associate(&context, &mut options)?;
    }

    // only the outermost declaration undoes the work of its legs and inverses
    let journal = parent.is_none().then(|| DeclarationJournal::capture(registry, source, target, &options));

    let association = match build_checked(registry, association_type, source, target, options, parent, &context) {
        Ok(association) => association,
        Err(err) => {
            if let Some(journal) = journal {
                journal.rollback(registry);
            }
            return Err(err);
        }
    };

    let aliases: &[(AccessorKind, AccessorKind)] = if association_type.is_multiple() { COLLECTION_ALIASES } else { &[] };
    inject_accessors(&association, association_type.accessor_kinds(), aliases);

    source.register_association(Arc::clone(&association));
    tracing::debug!("Registered association {}", association);

    Ok(association)
}

/// Construction, `afterAssociate` and the second collision check
fn build_checked(
    registry: &ModelRegistry,
    association_type: AssociationType,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
    context: &AssociateContext,
) -> AssociationResult<Arc<Association>> {
    let description = describe(association_type, source, target, &options);
    let association = construct(registry, association_type, source, target, options, parent).map_err(|cause| {
        AssociationError::Construction {
            description,
            chain: parent.map(|parent| composite_chain(parent)).unwrap_or_default(),
            cause: Box::new(cause),
        }
    })?;

    if association.options().hooks {
        source.hooks().run_after_associate(context, &association)?;
    }

    check_naming_collision(source, association.alias())?;

    Ok(association)
}

/// State of every model a declaration can write to, taken before construction
struct DeclarationJournal {
    models: Vec<(ModelRef, ModelSnapshot)>,
    /// Join model that construction will define, removed again on failure
    pending_join_model: Option<String>,
}

impl DeclarationJournal {
    fn capture(
        registry: &ModelRegistry,
        source: &ModelRef,
        target: &ModelRef,
        options: &NormalizedAssociationOptions,
    ) -> Self {
        let mut models: Vec<ModelRef> = vec![Arc::clone(source)];
        let mut pending_join_model = None;

        if !same_initial_model(source, target) {
            models.push(Arc::clone(target));
        }
        if let Some(through) = &options.through {
            match registry.resolve(&through.model) {
                Some(join) if !models.iter().any(|model| same_initial_model(model, &join)) => models.push(join),
                Some(_) => {}
                None => pending_join_model = Some(through.model.clone()),
            }
        }

        Self {
            models: models
                .into_iter()
                .map(|model| {
                    let snapshot = model.snapshot();
                    (model, snapshot)
                })
                .collect(),
            pending_join_model,
        }
    }

    fn rollback(self, registry: &ModelRegistry) {
        for (model, snapshot) in self.models {
            model.restore(snapshot);
        }
        if let Some(name) = self.pending_join_model {
            registry.remove(&name);
        }
        tracing::debug!("Rolled back failed declaration");
    }
}

fn ensure_initialized(registry: &ModelRegistry, model: &ModelDefinition) -> AssociationResult<()> {
    if model.registry_id() != Some(registry.id()) {
        return Err(AssociationError::ModelNotInitialized {
            model: model.name().to_string(),
        });
    }
    Ok(())
}

/// Return `existing` if the requested declaration may reuse it
fn reuse(
    registry: &ModelRegistry,
    existing: Arc<Association>,
    association_type: AssociationType,
    source: &ModelDefinition,
    target: &ModelDefinition,
    options: &NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    let status = classify(&existing, association_type, target, options)?;

    if status == IncompatibilityStatus::None {
        tracing::debug!("Reusing association {}", existing);
        return Ok(existing);
    }

    let policy = registry.config().composite_reuse;
    if parent.is_some()
        && existing.has_parent()
        && policy.tolerates(status)
        && keeps_key_columns(&existing, association_type, source, target, options)
    {
        tracing::warn!(
            "Reusing composite leg {} despite {:?} ({} composite reuse)",
            existing,
            status,
            policy
        );
        return Ok(existing);
    }

    Err(AssociationError::Conflict {
        model: source.name().to_string(),
        alias: options.alias.clone(),
        existing: existing.describe(),
        requested: describe(association_type, source, target, options),
        status,
    })
}

/// Whether reusing `existing` leaves every key column of the requested
/// declaration in place. A leg that would drop a column is never tolerated.
fn keeps_key_columns(
    existing: &Association,
    association_type: AssociationType,
    source: &ModelDefinition,
    target: &ModelDefinition,
    options: &NormalizedAssociationOptions,
) -> bool {
    let foreign_key = &options.foreign_key.name;
    if existing.foreign_key() != foreign_key {
        return false;
    }
    match association_type {
        AssociationType::BelongsTo => source.has_attribute(foreign_key),
        AssociationType::HasOne | AssociationType::HasMany => target.has_attribute(foreign_key),
        AssociationType::BelongsToMany => {
            let other_key = |options: &NormalizedAssociationOptions| options.other_key.as_ref().map(|key| key.name.clone());
            other_key(existing.options()) == other_key(options)
        }
    }
}

fn construct(
    registry: &ModelRegistry,
    association_type: AssociationType,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    match association_type {
        AssociationType::BelongsTo => belongs_to::build(registry, source, target, options, parent),
        AssociationType::HasOne => has_one::build(registry, source, target, options, parent),
        AssociationType::HasMany => has_many::build(registry, source, target, options, parent),
        AssociationType::BelongsToMany => belongs_to_many::build(registry, source, target, options, parent),
    }
}

/// `parent` followed by its own ancestors
fn composite_chain(parent: &Association) -> Vec<String> {
    let mut chain = vec![parent.to_string()];
    chain.extend(parent.parent_chain());
    chain
}
