//! Association Options - Raw declaration options and their canonical form
//!
//! [`normalize_options`] turns whatever the caller passed into
//! [`NormalizedAssociationOptions`]: a resolved alias, both name forms and a
//! foreign-key descriptor that always carries a name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AssociationError, AssociationResult};
use crate::inflection::{camelize, Inflector};
use crate::model::{ModelDefinition, ModelName, ReferentialAction};

use super::association::AssociationType;

/// Option keys that moved, with the place they moved to
const RENAMED_OPTIONS: &[(&str, &str)] = &[
    ("onDelete", "foreignKey.onDelete"),
    ("onUpdate", "foreignKey.onUpdate"),
    ("constraints", "foreignKeyConstraints"),
    ("foreignKeyConstraint", "foreignKeyConstraints"),
];

/// `as`: a single name, or both forms spelled out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasOption {
    Name(String),
    Forms(ModelName),
}

impl From<&str> for AliasOption {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for AliasOption {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<ModelName> for AliasOption {
    fn from(names: ModelName) -> Self {
        Self::Forms(names)
    }
}

/// Foreign key as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForeignKeyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Older spelling of `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

/// `foreignKey`: a bare attribute name or a full descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKeyOption {
    Name(String),
    Options(RawForeignKeyOptions),
}

impl From<&str> for ForeignKeyOption {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ForeignKeyOption {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<RawForeignKeyOptions> for ForeignKeyOption {
    fn from(options: RawForeignKeyOptions) -> Self {
        Self::Options(options)
    }
}

/// Normalized foreign-key descriptor; `name` is always set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyOptions {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            allow_null: None,
            on_delete: None,
            on_update: None,
        }
    }

    /// Normalize a caller-supplied foreign key, `default_name` filling a missing name
    pub fn normalize(option: Option<ForeignKeyOption>, default_name: impl FnOnce() -> AssociationResult<String>) -> AssociationResult<Self> {
        match option {
            Some(ForeignKeyOption::Name(name)) => Ok(Self::named(name)),
            Some(ForeignKeyOption::Options(raw)) => {
                let name = match raw.name.or(raw.field_name) {
                    Some(name) => name,
                    None => default_name()?,
                };
                Ok(Self {
                    name,
                    field: raw.field,
                    allow_null: raw.allow_null,
                    on_delete: raw.on_delete,
                    on_update: raw.on_update,
                })
            }
            None => Ok(Self::named(default_name()?)),
        }
    }
}

/// Options for the paired association declared on the target
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InverseOptions {
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<AliasOption>,
}

/// Join model of a many-to-many association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughOptions {
    /// Registered model name; unknown names are defined as join models
    pub model: String,
    /// Alias of the source-side `hasMany` leg onto the join model
    #[serde(rename = "sourceAs", default, skip_serializing_if = "Option::is_none")]
    pub source_alias: Option<String>,
    /// Alias of the target-side `hasMany` leg onto the join model
    #[serde(rename = "targetAs", default, skip_serializing_if = "Option::is_none")]
    pub target_alias: Option<String>,
}

impl ThroughOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            source_alias: None,
            target_alias: None,
        }
    }

    pub fn source_alias(mut self, alias: impl Into<String>) -> Self {
        self.source_alias = Some(alias.into());
        self
    }

    pub fn target_alias(mut self, alias: impl Into<String>) -> Self {
        self.target_alias = Some(alias.into());
        self
    }
}

impl From<&str> for ThroughOptions {
    fn from(model: &str) -> Self {
        Self::new(model)
    }
}

impl From<String> for ThroughOptions {
    fn from(model: String) -> Self {
        Self::new(model)
    }
}

/// Association options as declared by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationOptions {
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<AliasOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_key: Option<ForeignKeyOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<ThroughOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_constraints: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<InverseOptions>,
    /// Any other key, compared structurally like the named ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object
    pub fn from_json(value: Value) -> AssociationResult<Self> {
        serde_json::from_value(value).map_err(|e| AssociationError::invalid_options(e.to_string()))
    }

    pub fn alias(mut self, alias: impl Into<AliasOption>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<ForeignKeyOption>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn other_key(mut self, other_key: impl Into<ForeignKeyOption>) -> Self {
        self.other_key = Some(other_key.into());
        self
    }

    pub fn source_key(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = Some(source_key.into());
        self
    }

    pub fn target_key(mut self, target_key: impl Into<String>) -> Self {
        self.target_key = Some(target_key.into());
        self
    }

    /// Join model name, or [`ThroughOptions`] with explicit leg aliases
    pub fn through(mut self, through: impl Into<ThroughOptions>) -> Self {
        self.through = Some(through.into());
        self
    }

    pub fn foreign_key_constraints(mut self, enabled: bool) -> Self {
        self.foreign_key_constraints = Some(enabled);
        self
    }

    pub fn hooks(mut self, enabled: bool) -> Self {
        self.hooks = Some(enabled);
        self
    }

    pub fn inverse(mut self, alias: impl Into<AliasOption>) -> Self {
        self.inverse = Some(InverseOptions {
            alias: Some(alias.into()),
        });
        self
    }

    /// Set an arbitrary option key
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Canonical options of one declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAssociationOptions {
    /// Registry key of the association on its source model
    #[serde(rename = "as")]
    pub alias: String,
    pub name: ModelName,
    pub foreign_key: ForeignKeyOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_key: Option<ForeignKeyOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<ThroughOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_constraints: Option<bool>,
    pub hooks: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<InverseOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedAssociationOptions {
    /// Sorted-key JSON form without the `inverse` back-reference
    pub fn canonical(&self) -> AssociationResult<Value> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| AssociationError::invalid_options(format!("options of '{}' are not serializable: {}", self.alias, e)))?;
        if let Value::Object(map) = &mut value {
            map.remove("inverse");
        }
        Ok(value)
    }

    /// Structural equality ignoring `inverse`
    pub fn equivalent(&self, other: &Self) -> AssociationResult<bool> {
        Ok(self.canonical()? == other.canonical()?)
    }
}

/// Resolve the alias, both name forms, and the foreign key of a declaration.
pub fn normalize_options(
    association_type: AssociationType,
    options: AssociationOptions,
    source: &ModelDefinition,
    target: &ModelDefinition,
    inflector: &dyn Inflector,
) -> AssociationResult<NormalizedAssociationOptions> {
    reject_renamed_options(&options.extra)?;

    let AssociationOptions {
        alias,
        foreign_key,
        other_key,
        source_key,
        target_key,
        through,
        foreign_key_constraints,
        hooks,
        inverse,
        mut extra,
    } = options;

    let (alias, name) = resolve_alias(association_type, alias, target, inflector)?;

    let foreign_key = ForeignKeyOptions::normalize(foreign_key, || match association_type {
        AssociationType::BelongsTo => {
            let key = key_or_primary(target_key.as_deref(), target)?;
            Ok(camelize(&[&name.singular, &key]))
        }
        AssociationType::HasOne | AssociationType::HasMany | AssociationType::BelongsToMany => {
            let key = key_or_primary(source_key.as_deref(), source)?;
            Ok(camelize(&[&source.names().singular, &key]))
        }
    })?;

    let other_key = match association_type {
        AssociationType::BelongsToMany => Some(ForeignKeyOptions::normalize(other_key, || {
            let key = key_or_primary(target_key.as_deref(), target)?;
            Ok(camelize(&[&name.singular, &key]))
        })?),
        _ if other_key.is_some() => {
            return Err(AssociationError::invalid_options(format!(
                "otherKey is only supported by belongsToMany, not {}",
                association_type.method_name()
            )))
        }
        _ => None,
    };

    // JSON has no `undefined`; null-valued keys are treated as absent
    extra.retain(|_, value| !value.is_null());

    let normalized = NormalizedAssociationOptions {
        alias,
        name,
        foreign_key,
        other_key,
        source_key,
        target_key,
        through,
        foreign_key_constraints,
        hooks: hooks.unwrap_or(false),
        inverse,
        extra,
    };

    let canonical = normalized.canonical()?;
    tracing::trace!(
        "Normalized {} options for {}.{}: {}",
        association_type.method_name(),
        source.name(),
        normalized.alias,
        canonical
    );

    Ok(normalized)
}

fn reject_renamed_options(extra: &Map<String, Value>) -> AssociationResult<()> {
    match RENAMED_OPTIONS.iter().find(|(old, _)| extra.contains_key(*old)) {
        Some((old, new)) => Err(AssociationError::RenamedOption {
            old: old.to_string(),
            new: new.to_string(),
        }),
        None => Ok(()),
    }
}

/// Registry key plus both name forms
pub fn resolve_alias(
    association_type: AssociationType,
    alias: Option<AliasOption>,
    target: &ModelDefinition,
    inflector: &dyn Inflector,
) -> AssociationResult<(String, ModelName)> {
    let multiple = association_type.is_multiple();

    let name = match alias {
        Some(AliasOption::Forms(name)) => name,
        Some(AliasOption::Name(alias)) if multiple => ModelName::new(inflector.singularize(&alias), alias),
        Some(AliasOption::Name(alias)) => ModelName::new(alias.clone(), inflector.pluralize(&alias)),
        None => target.names().clone(),
    };

    if name.singular.is_empty() || name.plural.is_empty() {
        return Err(AssociationError::invalid_options("the \"as\" option cannot be empty"));
    }

    let key = if multiple { name.plural.clone() } else { name.singular.clone() };
    Ok((key, name))
}

/// Explicit key, or the model's primary key
pub(crate) fn key_or_primary(key: Option<&str>, model: &ModelDefinition) -> AssociationResult<String> {
    match key {
        Some(key) => Ok(key.to_string()),
        None => model
            .primary_key_attribute()
            .ok_or_else(|| AssociationError::MissingPrimaryKey {
                model: model.name().to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflection::EnglishInflector;
    use crate::model::{AttributeDefinition, DataType, ModelRef};
    use serde_json::json;

    fn model(name: &str) -> ModelRef {
        ModelDefinition::builder(name)
            .attribute(AttributeDefinition::new("id", DataType::Integer).primary_key())
            .build()
    }

    fn normalize(association_type: AssociationType, options: AssociationOptions) -> AssociationResult<NormalizedAssociationOptions> {
        normalize_options(association_type, options, &model("User"), &model("Post"), &EnglishInflector)
    }

    #[test]
    fn test_renamed_options_are_rejected() {
        for (old, new) in RENAMED_OPTIONS {
            let options = AssociationOptions::new().option(*old, json!("CASCADE"));
            match normalize(AssociationType::HasMany, options) {
                Err(AssociationError::RenamedOption { old: o, new: n }) => {
                    assert_eq!(&o, old);
                    assert_eq!(&n, new);
                }
                other => panic!("expected RenamedOption, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_renamed_options_from_json() {
        let options = AssociationOptions::from_json(json!({ "as": "posts", "constraints": false })).unwrap();
        assert!(matches!(
            normalize(AssociationType::HasMany, options),
            Err(AssociationError::RenamedOption { .. })
        ));
    }

    #[test]
    fn test_string_alias_multi_valued() {
        let normalized = normalize(AssociationType::HasMany, AssociationOptions::new().alias("tags")).unwrap();
        assert_eq!(normalized.alias, "tags");
        assert_eq!(normalized.name.plural, "tags");
        assert_eq!(normalized.name.singular, EnglishInflector.singularize("tags"));
    }

    #[test]
    fn test_string_alias_single_valued() {
        let normalized = normalize(AssociationType::BelongsTo, AssociationOptions::new().alias("owner")).unwrap();
        assert_eq!(normalized.alias, "owner");
        assert_eq!(normalized.name.singular, "owner");
        assert_eq!(normalized.name.plural, EnglishInflector.pluralize("owner"));
    }

    #[test]
    fn test_object_alias_picks_form_by_kind() {
        let forms = ModelName::new("person", "people");
        let many = normalize(AssociationType::BelongsToMany, AssociationOptions::new().alias(forms.clone()).through("Membership")).unwrap();
        assert_eq!(many.alias, "people");

        let one = normalize(AssociationType::HasOne, AssociationOptions::new().alias(forms)).unwrap();
        assert_eq!(one.alias, "person");
    }

    #[test]
    fn test_missing_alias_uses_target_names() {
        let many = normalize(AssociationType::HasMany, AssociationOptions::new()).unwrap();
        assert_eq!(many.alias, "Posts");
        assert_eq!(many.name, ModelName::new("Post", "Posts"));

        let one = normalize(AssociationType::BelongsTo, AssociationOptions::new()).unwrap();
        assert_eq!(one.alias, "Post");
    }

    #[test]
    fn test_foreign_key_shorthand_matches_object_form() {
        let shorthand = normalize(AssociationType::HasMany, AssociationOptions::new().foreign_key("ownerId")).unwrap();
        let object = normalize(
            AssociationType::HasMany,
            AssociationOptions::new().foreign_key(RawForeignKeyOptions {
                name: Some("ownerId".to_string()),
                ..Default::default()
            }),
        )
        .unwrap();

        assert_eq!(shorthand.foreign_key, ForeignKeyOptions::named("ownerId"));
        assert_eq!(shorthand.foreign_key, object.foreign_key);
    }

    #[test]
    fn test_field_name_merged_into_name() {
        let options = AssociationOptions::from_json(json!({ "foreignKey": { "fieldName": "authorId" } })).unwrap();
        let normalized = normalize(AssociationType::HasMany, options).unwrap();

        assert_eq!(normalized.foreign_key.name, "authorId");
        let canonical = normalized.canonical().unwrap();
        assert!(canonical["foreignKey"].get("fieldName").is_none());
    }

    #[test]
    fn test_name_wins_over_field_name() {
        let options = AssociationOptions::from_json(json!({
            "foreignKey": { "name": "ownerId", "fieldName": "authorId" }
        }))
        .unwrap();
        assert_eq!(normalize(AssociationType::HasMany, options).unwrap().foreign_key.name, "ownerId");
    }

    #[test]
    fn test_default_foreign_keys() {
        let has_many = normalize(AssociationType::HasMany, AssociationOptions::new().alias("posts")).unwrap();
        assert_eq!(has_many.foreign_key.name, "userId");

        let belongs_to = normalize(AssociationType::BelongsTo, AssociationOptions::new().alias("owner")).unwrap();
        assert_eq!(belongs_to.foreign_key.name, "ownerId");

        let many_to_many = normalize(
            AssociationType::BelongsToMany,
            AssociationOptions::new().alias("favorites").through("Favorite"),
        )
        .unwrap();
        assert_eq!(many_to_many.foreign_key.name, "userId");
        assert_eq!(many_to_many.other_key.unwrap().name, "favoriteId");
    }

    #[test]
    fn test_other_key_outside_belongs_to_many() {
        let result = normalize(AssociationType::HasMany, AssociationOptions::new().other_key("tagId"));
        assert!(matches!(result, Err(AssociationError::InvalidOptions { .. })));
    }

    #[test]
    fn test_hooks_default_and_null_keys_removed() {
        let options = AssociationOptions::new().option("scope", Value::Null).option("onDeleteHint", json!(1));
        let normalized = normalize(AssociationType::HasMany, options).unwrap();

        assert!(!normalized.hooks);
        assert!(!normalized.extra.contains_key("scope"));
        assert!(normalized.extra.contains_key("onDeleteHint"));

        let canonical = normalized.canonical().unwrap();
        let object = canonical.as_object().unwrap();
        assert!(object.values().all(|value| !value.is_null()));
        assert!(!object.contains_key("sourceKey"));
    }

    #[test]
    fn test_equivalence_ignores_inverse() {
        let plain = normalize(AssociationType::HasMany, AssociationOptions::new().alias("posts")).unwrap();
        let with_inverse = normalize(AssociationType::HasMany, AssociationOptions::new().alias("posts").inverse("author")).unwrap();
        let other_key = normalize(AssociationType::HasMany, AssociationOptions::new().alias("posts").foreign_key("authorId")).unwrap();

        assert!(plain.equivalent(&with_inverse).unwrap());
        assert!(!plain.equivalent(&other_key).unwrap());
    }

    #[test]
    fn test_missing_primary_key_for_default_foreign_key() {
        let keyless = ModelDefinition::builder("Log").build();
        let result = normalize_options(
            AssociationType::BelongsTo,
            AssociationOptions::new(),
            &model("User"),
            &keyless,
            &EnglishInflector,
        );
        assert!(matches!(result, Err(AssociationError::MissingPrimaryKey { .. })));
    }
}
