//! Accessor injection
//!
//! Each association installs named callables into its source model's method
//! table. A callable holds a weak handle to its association and, when
//! invoked, describes the statement(s) that would satisfy the call.

use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use crate::error::{AssociationError, AssociationResult};
use crate::model::{MethodFn, ModelDefinition, ModelInstance};
use crate::operators::Op;

use super::association::{AccessorKind, Association, AssociationType};
use super::query::{AccessorOutcome, AssociationQuery};

/// Kinds that share an implementation with another kind
pub const COLLECTION_ALIASES: &[(AccessorKind, AccessorKind)] = &[
    (AccessorKind::AddMultiple, AccessorKind::Add),
    (AccessorKind::RemoveMultiple, AccessorKind::Remove),
    (AccessorKind::HasSingle, AccessorKind::HasAll),
];

/// Install accessors of `kinds` on the association's source model.
///
/// `aliases` maps a public kind to the kind whose implementation it forwards
/// to. Names already present in the method table are left alone. Returns the
/// names that were installed.
pub fn inject_accessors(
    association: &Arc<Association>,
    kinds: &[AccessorKind],
    aliases: &[(AccessorKind, AccessorKind)],
) -> Vec<String> {
    let source = association.source();
    let mut installed = Vec::new();

    for kind in kinds {
        let Some(name) = association.accessor(*kind) else {
            continue;
        };

        let implementation = aliases
            .iter()
            .find(|(public, _)| public == kind)
            .map(|(_, target)| *target)
            .unwrap_or(*kind);

        if source.install_accessor(name, bound_accessor(association, implementation)) {
            installed.push(name.to_string());
        } else {
            tracing::trace!(
                "Method {}.{} already defined, skipping accessor for {}",
                source.name(),
                name,
                association
            );
        }
    }

    tracing::debug!("Injected {} accessors for {}", installed.len(), association);
    installed
}

fn bound_accessor(association: &Arc<Association>, kind: AccessorKind) -> MethodFn {
    let handle: Weak<Association> = Arc::downgrade(association);
    let alias = association.alias().to_string();

    Arc::new(move |instance: &mut ModelInstance, args: &[Value]| {
        let association = handle
            .upgrade()
            .ok_or_else(|| AssociationError::AssociationDropped { alias: alias.clone() })?;
        invoke(&association, kind, instance, args)
    })
}

/// Run the implementation of `kind` for `association` on behalf of `instance`
pub fn invoke(
    association: &Association,
    kind: AccessorKind,
    instance: &mut ModelInstance,
    args: &[Value],
) -> AssociationResult<AccessorOutcome> {
    match association.association_type() {
        AssociationType::BelongsTo => belongs_to(association, kind, instance, args),
        AssociationType::HasOne => has_one(association, kind, instance, args),
        AssociationType::HasMany => has_many(association, kind, instance, args),
        AssociationType::BelongsToMany => belongs_to_many(association, kind, instance, args),
    }
}

fn belongs_to(
    association: &Association,
    kind: AccessorKind,
    instance: &mut ModelInstance,
    args: &[Value],
) -> AssociationResult<AccessorOutcome> {
    let target = association.target();
    let foreign_key = association.source_key();
    let target_key = association.target_key();

    match kind {
        AccessorKind::Get => {
            let value = instance.require(foreign_key)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::select(target.table_name())
                    .where_eq(column(target, target_key), value)
                    .limit(1),
            ))
        }
        AccessorKind::Set => {
            let value = match args.first() {
                Some(value) if !value.is_null() => key_of(value, target, target_key)?,
                _ => Value::Null,
            };
            instance.set(foreign_key, value.clone());
            Ok(AccessorOutcome::Assigned {
                attribute: foreign_key.to_string(),
                value,
            })
        }
        AccessorKind::Create => {
            let values = values_arg(args)?;
            if let Some(value) = values.get(target_key).filter(|value| !value.is_null()) {
                instance.set(foreign_key, value.clone());
            }
            Ok(AccessorOutcome::Query(
                AssociationQuery::insert(target.table_name()).values(values),
            ))
        }
        _ => Err(unsupported(association, kind)),
    }
}

fn has_one(
    association: &Association,
    kind: AccessorKind,
    instance: &mut ModelInstance,
    args: &[Value],
) -> AssociationResult<AccessorOutcome> {
    let target = association.target();
    let foreign_key = column(target, association.target_key());
    let value = instance.require(association.source_key())?;

    match kind {
        AccessorKind::Get => Ok(AccessorOutcome::Query(
            AssociationQuery::select(target.table_name())
                .where_eq(foreign_key, value)
                .limit(1),
        )),
        AccessorKind::Set => {
            let mut queries = vec![AssociationQuery::update(target.table_name())
                .value(foreign_key.clone(), Value::Null)
                .where_eq(foreign_key.clone(), value.clone())];

            if let Some(associated) = args.first().filter(|arg| !arg.is_null()) {
                let primary_key = target_primary_key(target)?;
                queries.push(
                    AssociationQuery::update(target.table_name())
                        .value(foreign_key, value)
                        .where_eq(column(target, &primary_key), key_of(associated, target, &primary_key)?),
                );
            }
            Ok(AccessorOutcome::Queries(queries))
        }
        AccessorKind::Create => {
            let values = values_arg(args)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::insert(target.table_name())
                    .values(values)
                    .value(foreign_key, value),
            ))
        }
        _ => Err(unsupported(association, kind)),
    }
}

fn has_many(
    association: &Association,
    kind: AccessorKind,
    instance: &mut ModelInstance,
    args: &[Value],
) -> AssociationResult<AccessorOutcome> {
    let target = association.target();
    let table = target.table_name();
    let foreign_key = column(target, association.target_key());
    let value = instance.require(association.source_key())?;

    match kind {
        AccessorKind::Get => {
            let mut query = AssociationQuery::select(table).where_eq(foreign_key, value);
            for (key, filter) in values_arg(args)? {
                query = query.where_eq(column(target, &key), filter);
            }
            Ok(AccessorOutcome::Query(query))
        }
        AccessorKind::Count => Ok(AccessorOutcome::Query(
            AssociationQuery::count(table).where_eq(foreign_key, value),
        )),
        AccessorKind::Create => {
            let values = values_arg(args)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::insert(table).values(values).value(foreign_key, value),
            ))
        }
        AccessorKind::Set => {
            let primary_key = target_primary_key(target)?;
            let keys = keys_arg(args, target, &primary_key)?;

            let mut unlink = AssociationQuery::update(table.clone())
                .value(foreign_key.clone(), Value::Null)
                .where_eq(foreign_key.clone(), value.clone());
            if !keys.is_empty() {
                unlink = unlink.where_op(column(target, &primary_key), Op::NotIn, Value::Array(keys.clone()));
            }

            let mut queries = vec![unlink];
            if !keys.is_empty() {
                queries.push(
                    AssociationQuery::update(table)
                        .value(foreign_key, value)
                        .where_op(column(target, &primary_key), Op::In, Value::Array(keys)),
                );
            }
            Ok(AccessorOutcome::Queries(queries))
        }
        AccessorKind::Add => {
            let primary_key = target_primary_key(target)?;
            let keys = keys_arg(args, target, &primary_key)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::update(table)
                    .value(foreign_key, value)
                    .where_op(column(target, &primary_key), Op::In, Value::Array(keys)),
            ))
        }
        AccessorKind::Remove => {
            let primary_key = target_primary_key(target)?;
            let keys = keys_arg(args, target, &primary_key)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::update(table)
                    .value(foreign_key.clone(), Value::Null)
                    .where_eq(foreign_key, value)
                    .where_op(column(target, &primary_key), Op::In, Value::Array(keys)),
            ))
        }
        AccessorKind::HasAll => {
            let primary_key = target_primary_key(target)?;
            let keys = keys_arg(args, target, &primary_key)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::count(table)
                    .where_eq(foreign_key, value)
                    .where_op(column(target, &primary_key), Op::In, Value::Array(keys)),
            ))
        }
        _ => Err(unsupported(association, kind)),
    }
}

fn belongs_to_many(
    association: &Association,
    kind: AccessorKind,
    instance: &mut ModelInstance,
    args: &[Value],
) -> AssociationResult<AccessorOutcome> {
    let legs = association.through().ok_or_else(|| AssociationError::AssociationDropped {
        alias: association.alias().to_string(),
    })?;
    let target = association.target();
    let through = &legs.through;
    let through_table = through.table_name();
    let target_key = association.target_key();

    let foreign_key = column(through, association.foreign_key());
    let other_key = association
        .options()
        .other_key
        .as_ref()
        .map(|other| column(through, &other.name))
        .ok_or_else(|| AssociationError::invalid_options("belongsToMany requires otherKey"))?;

    let value = instance.require(association.source_key())?;

    let joined = |query: AssociationQuery| {
        query
            .join(
                through_table.clone(),
                format!("{}.{}", through_table, other_key),
                format!("{}.{}", target.table_name(), column(target, target_key)),
            )
            .where_eq(format!("{}.{}", through_table, foreign_key), value.clone())
    };

    let link = |key: Value| {
        AssociationQuery::insert(through_table.clone())
            .value(foreign_key.clone(), value.clone())
            .value(other_key.clone(), key)
    };

    match kind {
        AccessorKind::Get => Ok(AccessorOutcome::Query(joined(AssociationQuery::select(
            target.table_name(),
        )))),
        AccessorKind::Count => Ok(AccessorOutcome::Query(joined(AssociationQuery::count(
            target.table_name(),
        )))),
        AccessorKind::HasAll => {
            let keys = keys_arg(args, target, target_key)?;
            Ok(AccessorOutcome::Query(
                joined(AssociationQuery::count(target.table_name())).where_op(
                    format!("{}.{}", through_table, other_key),
                    Op::In,
                    Value::Array(keys),
                ),
            ))
        }
        AccessorKind::Set => {
            let keys = keys_arg(args, target, target_key)?;
            let mut queries = vec![AssociationQuery::delete(through_table.clone())
                .where_eq(foreign_key.clone(), value.clone())];
            queries.extend(keys.into_iter().map(link));
            Ok(AccessorOutcome::Queries(queries))
        }
        AccessorKind::Add => {
            let keys = keys_arg(args, target, target_key)?;
            Ok(AccessorOutcome::Queries(keys.into_iter().map(link).collect()))
        }
        AccessorKind::Remove => {
            let keys = keys_arg(args, target, target_key)?;
            Ok(AccessorOutcome::Query(
                AssociationQuery::delete(through_table.clone())
                    .where_eq(foreign_key.clone(), value.clone())
                    .where_op(other_key.clone(), Op::In, Value::Array(keys)),
            ))
        }
        AccessorKind::Create => {
            let values = values_arg(args)?;
            let key = values.get(target_key).filter(|key| !key.is_null()).cloned();
            let mut queries = vec![AssociationQuery::insert(target.table_name()).values(values)];
            if let Some(key) = key {
                queries.push(link(key));
            }
            Ok(AccessorOutcome::Queries(queries))
        }
        _ => Err(unsupported(association, kind)),
    }
}

/// Column name of `attribute` on `model`
fn column(model: &ModelDefinition, attribute: &str) -> String {
    model
        .attribute(attribute)
        .map(|definition| definition.column().to_string())
        .unwrap_or_else(|| attribute.to_string())
}

fn target_primary_key(target: &ModelDefinition) -> AssociationResult<String> {
    target
        .primary_key_attribute()
        .ok_or_else(|| AssociationError::MissingPrimaryKey {
            model: target.name().to_string(),
        })
}

/// Key of an associated record: a bare key, or an object carrying `key`
fn key_of(value: &Value, model: &ModelDefinition, key: &str) -> AssociationResult<Value> {
    match value {
        Value::Object(record) => record
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| AssociationError::MissingKeyValue {
                model: model.name().to_string(),
                attribute: key.to_string(),
            }),
        other => Ok(other.clone()),
    }
}

/// Keys from the first argument, which may be one record or an array of them
fn keys_arg(args: &[Value], model: &ModelDefinition, key: &str) -> AssociationResult<Vec<Value>> {
    match args.first() {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(records)) => records.iter().map(|record| key_of(record, model, key)).collect(),
        Some(record) => Ok(vec![key_of(record, model, key)?]),
    }
}

fn values_arg(args: &[Value]) -> AssociationResult<Map<String, Value>> {
    match args.first() {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(values)) => Ok(values.clone()),
        Some(other) => Err(AssociationError::invalid_options(format!(
            "expected an object of attribute values, got {}",
            other
        ))),
    }
}

fn unsupported(association: &Association, kind: AccessorKind) -> AssociationError {
    AssociationError::UnknownMethod {
        model: association.source().name().to_string(),
        method: format!("{:?} accessor of {}", kind, association),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflection::EnglishInflector;
    use crate::model::{AttributeDefinition, DataType, ModelRef};
    use crate::relationships::options::{normalize_options, AssociationOptions};
    use serde_json::json;

    fn model(name: &str) -> ModelRef {
        ModelDefinition::builder(name)
            .attribute(AttributeDefinition::new("id", DataType::Integer).primary_key())
            .build()
    }

    fn has_many_posts(user: &ModelRef, post: &ModelRef) -> Arc<Association> {
        let options = normalize_options(
            AssociationType::HasMany,
            AssociationOptions::new().alias("posts"),
            user,
            post,
            &EnglishInflector,
        )
        .unwrap();
        Arc::new(Association::new(
            AssociationType::HasMany,
            user,
            post,
            options,
            None,
            "id".into(),
            "userId".into(),
        ))
    }

    #[test]
    fn test_injects_every_kind() {
        let (user, post) = (model("User"), model("Post"));
        let association = has_many_posts(&user, &post);

        let installed = inject_accessors(&association, AssociationType::HasMany.accessor_kinds(), COLLECTION_ALIASES);

        assert_eq!(installed.len(), 10);
        assert!(user.has_method("getPosts"));
        assert!(user.has_method("addPost"));
        assert!(user.has_method("countPosts"));
    }

    #[test]
    fn test_user_method_is_not_shadowed() {
        let (user, post) = (model("User"), model("Post"));
        user.define_method("getPosts", |_instance, _args| Ok(AccessorOutcome::Value(json!("mine"))));
        let association = has_many_posts(&user, &post);

        let installed = inject_accessors(&association, AssociationType::HasMany.accessor_kinds(), COLLECTION_ALIASES);
        assert!(!installed.contains(&"getPosts".to_string()));

        let mut instance = ModelInstance::new(&user);
        assert_eq!(instance.call("getPosts", &[]).unwrap(), AccessorOutcome::Value(json!("mine")));
    }

    #[test]
    fn test_aliased_kinds_share_implementation() {
        let (user, post) = (model("User"), model("Post"));
        let association = has_many_posts(&user, &post);
        inject_accessors(&association, AssociationType::HasMany.accessor_kinds(), COLLECTION_ALIASES);

        let mut instance = ModelInstance::new(&user);
        instance.set("id", json!(1));

        let single = instance.call("addPost", &[json!({ "id": 5 })]).unwrap();
        let multiple = instance.call("addPosts", &[json!([5])]).unwrap();
        assert_eq!(single, multiple);

        let query = single.query().unwrap();
        assert_eq!(query.values.get("userId"), Some(&json!(1)));
        assert_eq!(query.condition("id").unwrap().operator, Op::In);
    }

    #[test]
    fn test_missing_source_key_value() {
        let (user, post) = (model("User"), model("Post"));
        let association = has_many_posts(&user, &post);
        inject_accessors(&association, &[AccessorKind::Get], &[]);

        let mut instance = ModelInstance::new(&user);
        assert!(matches!(
            instance.call("getPosts", &[]),
            Err(AssociationError::MissingKeyValue { .. })
        ));
    }

    #[test]
    fn test_dropped_association() {
        let (user, post) = (model("User"), model("Post"));
        let association = has_many_posts(&user, &post);
        inject_accessors(&association, &[AccessorKind::Count], &[]);
        drop(association);

        let mut instance = ModelInstance::new(&user);
        instance.set("id", json!(1));
        assert!(matches!(
            instance.call("countPosts", &[]),
            Err(AssociationError::AssociationDropped { .. })
        ));
    }
}
