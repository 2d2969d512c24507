//! Association - The persistent record of one declared relationship

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use crate::inflection::upper_first;
use crate::model::{ModelDefinition, ModelName, ModelRef};

use super::options::NormalizedAssociationOptions;

/// Kind of association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationType {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl AssociationType {
    /// Whether the association yields a collection
    pub fn is_multiple(self) -> bool {
        matches!(self, Self::HasMany | Self::BelongsToMany)
    }

    /// Name of the declaring method (`hasMany`)
    pub fn method_name(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::BelongsToMany => "belongsToMany",
        }
    }

    /// Accessor kinds exposed by this association type
    pub fn accessor_kinds(self) -> &'static [AccessorKind] {
        if self.is_multiple() {
            &[
                AccessorKind::Get,
                AccessorKind::Set,
                AccessorKind::AddMultiple,
                AccessorKind::Add,
                AccessorKind::Create,
                AccessorKind::Remove,
                AccessorKind::RemoveMultiple,
                AccessorKind::HasSingle,
                AccessorKind::HasAll,
                AccessorKind::Count,
            ]
        } else {
            &[AccessorKind::Get, AccessorKind::Set, AccessorKind::Create]
        }
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Logical accessor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessorKind {
    Get,
    Set,
    Create,
    Add,
    AddMultiple,
    Remove,
    RemoveMultiple,
    HasSingle,
    HasAll,
    Count,
}

impl AccessorKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Create => "create",
            Self::Add | Self::AddMultiple => "add",
            Self::Remove | Self::RemoveMultiple => "remove",
            Self::HasSingle | Self::HasAll => "has",
            Self::Count => "count",
        }
    }

    /// Method name for this kind under the given association names
    pub fn method_name(self, association_type: AssociationType, name: &ModelName) -> String {
        let noun = if !association_type.is_multiple() {
            &name.singular
        } else {
            match self {
                Self::Add | Self::Create | Self::Remove | Self::HasSingle => &name.singular,
                _ => &name.plural,
            }
        };
        format!("{}{}", self.prefix(), upper_first(noun))
    }
}

/// The two halves of a many-to-many association, both declared on the join model's
/// neighbours with the many-to-many association as parent
#[derive(Debug, Clone)]
pub struct ThroughLegs {
    pub through: ModelRef,
    pub from_source: Arc<Association>,
    pub from_target: Arc<Association>,
}

/// A declared association between two models
pub struct Association {
    association_type: AssociationType,
    source: ModelRef,
    target: ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<Weak<Association>>,
    /// Attribute on `source` used to join
    source_key: String,
    /// Attribute on `target` used to join
    target_key: String,
    accessors: BTreeMap<AccessorKind, String>,
    inverse_alias: OnceLock<String>,
    through: OnceLock<ThroughLegs>,
}

impl Association {
    pub(crate) fn new(
        association_type: AssociationType,
        source: &ModelRef,
        target: &ModelRef,
        options: NormalizedAssociationOptions,
        parent: Option<&Arc<Association>>,
        source_key: String,
        target_key: String,
    ) -> Self {
        let accessors = association_type
            .accessor_kinds()
            .iter()
            .map(|kind| (*kind, kind.method_name(association_type, &options.name)))
            .collect();

        Self {
            association_type,
            source: Arc::clone(source),
            target: Arc::clone(target),
            options,
            parent: parent.map(Arc::downgrade),
            source_key,
            target_key,
            accessors,
            inverse_alias: OnceLock::new(),
            through: OnceLock::new(),
        }
    }

    pub fn association_type(&self) -> AssociationType {
        self.association_type
    }

    pub fn source(&self) -> &ModelRef {
        &self.source
    }

    pub fn target(&self) -> &ModelRef {
        &self.target
    }

    /// Registry key on the source model
    pub fn alias(&self) -> &str {
        &self.options.alias
    }

    pub fn options(&self) -> &NormalizedAssociationOptions {
        &self.options
    }

    pub fn is_multiple(&self) -> bool {
        self.association_type.is_multiple()
    }

    pub fn foreign_key(&self) -> &str {
        &self.options.foreign_key.name
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }

    /// Method name for an accessor kind
    pub fn accessor(&self, kind: AccessorKind) -> Option<&str> {
        self.accessors.get(&kind).map(String::as_str)
    }

    pub fn accessors(&self) -> &BTreeMap<AccessorKind, String> {
        &self.accessors
    }

    /// Whether this association was declared as part of a composite one
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent_association(&self) -> Option<Arc<Association>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Outermost association of the composite chain, `self` when standalone
    pub fn root_association(self: &Arc<Self>) -> Arc<Association> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent_association() {
            current = parent;
        }
        current
    }

    /// Descriptions of the parent chain, innermost first
    pub fn parent_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut next = self.parent_association();
        while let Some(parent) = next {
            chain.push(parent.to_string());
            next = parent.parent_association();
        }
        chain
    }

    pub(crate) fn set_inverse_alias(&self, alias: &str) {
        let _ = self.inverse_alias.set(alias.to_string());
    }

    pub fn inverse_alias(&self) -> Option<&str> {
        self.inverse_alias.get().map(String::as_str)
    }

    /// Paired association on the target, looked up by alias
    pub fn inverse(&self) -> Option<Arc<Association>> {
        self.inverse_alias().and_then(|alias| self.target.association(alias))
    }

    pub(crate) fn set_through(&self, legs: ThroughLegs) {
        let _ = self.through.set(legs);
    }

    pub fn through(&self) -> Option<&ThroughLegs> {
        self.through.get()
    }

    /// Call-site-like description used in diagnostics
    pub fn describe(&self) -> String {
        describe(self.association_type, &self.source, &self.target, &self.options)
    }
}

/// `User.hasMany(Post, {...})`
pub fn describe(
    association_type: AssociationType,
    source: &ModelDefinition,
    target: &ModelDefinition,
    options: &NormalizedAssociationOptions,
) -> String {
    let options = match options.canonical() {
        Ok(canonical) => canonical.to_string(),
        Err(_) => format!("{{\"as\":\"{}\"}}", options.alias),
    };
    format!(
        "{}.{}({}, {})",
        source.name(),
        association_type.method_name(),
        target.name(),
        options
    )
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}) as {}",
            self.source.name(),
            self.association_type.method_name(),
            self.target.name(),
            self.alias()
        )
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("association_type", &self.association_type)
            .field("source", &self.source.name())
            .field("target", &self.target.name())
            .field("alias", &self.alias())
            .field("source_key", &self.source_key)
            .field("target_key", &self.target_key)
            .field("has_parent", &self.has_parent())
            .finish()
    }
}
