//! Model Definition - Attribute set, naming metadata and per-model state
//!
//! A model is shared as a [`ModelRef`]. Schema variants produced by
//! [`ModelDefinition::with_schema`] share the same state and initial id, so
//! they compare as the same initial model.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssociationResult;
use crate::inflection::{EnglishInflector, Inflector};
use crate::relationships::association::Association;
use crate::relationships::query::AccessorOutcome;

use super::hooks::HookRegistry;
use super::instance::{MethodFn, ModelInstance, ModelMethod};

/// Shared handle to a model
pub type ModelRef = Arc<ModelDefinition>;

/// Column data types, as far as foreign-key derivation needs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Integer,
    BigInt,
    Uuid,
    String,
    Text,
    Boolean,
    Date,
    Json,
}

/// Referential action for `ON DELETE` / `ON UPDATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl ReferentialAction {
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Target of a foreign-key constraint, consumed by the schema layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct References {
    pub table: String,
    pub key: String,
}

/// A declared attribute (column) of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    /// Column name when it differs from the attribute name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub data_type: DataType,
    pub allow_null: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<References>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            field: None,
            data_type,
            allow_null: true,
            primary_key: false,
            references: None,
            on_delete: None,
            on_update: None,
        }
    }

    /// Mark as primary key (primary keys are never nullable)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Column name, falling back to the attribute name
    pub fn column(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

/// Singular and plural forms of a name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelName {
    pub singular: String,
    pub plural: String,
}

impl ModelName {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }
}

/// State shared by a model and all of its schema variants
struct ModelState {
    initial_id: Uuid,
    name: String,
    names: ModelName,
    table_name: String,
    attributes: RwLock<BTreeMap<String, AttributeDefinition>>,
    associations: RwLock<BTreeMap<String, Arc<Association>>>,
    methods: RwLock<BTreeMap<String, ModelMethod>>,
    hooks: HookRegistry,
    registry_id: OnceLock<Uuid>,
}

/// Attributes, associations and methods of a model at one point in time
pub(crate) struct ModelSnapshot {
    attributes: BTreeMap<String, AttributeDefinition>,
    associations: BTreeMap<String, Arc<Association>>,
    methods: BTreeMap<String, ModelMethod>,
}

/// A model definition: name metadata, attributes, associations, methods and hooks
pub struct ModelDefinition {
    schema: Option<String>,
    state: Arc<ModelState>,
}

impl ModelDefinition {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Singular/plural naming metadata
    pub fn names(&self) -> &ModelName {
        &self.state.names
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Table name, schema-qualified when a schema is set
    pub fn table_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.state.table_name),
            None => self.state.table_name.clone(),
        }
    }

    /// Id shared by every variant derived from the same initial model
    pub fn initial_id(&self) -> Uuid {
        self.state.initial_id
    }

    /// Schema-qualified variant sharing this model's state
    pub fn with_schema(&self, schema: impl Into<String>) -> ModelRef {
        Arc::new(Self {
            schema: Some(schema.into()),
            state: Arc::clone(&self.state),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.state.registry_id.get().is_some()
    }

    pub(crate) fn registry_id(&self) -> Option<Uuid> {
        self.state.registry_id.get().copied()
    }

    /// Bind the model to a registry. Returns false if already bound elsewhere.
    pub(crate) fn mark_initialized(&self, registry_id: Uuid) -> bool {
        *self.state.registry_id.get_or_init(|| registry_id) == registry_id
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.state.hooks
    }

    // Attributes

    pub fn attribute(&self, name: &str) -> Option<AttributeDefinition> {
        read(&self.state.attributes).get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        read(&self.state.attributes).contains_key(name)
    }

    pub fn attributes(&self) -> BTreeMap<String, AttributeDefinition> {
        read(&self.state.attributes).clone()
    }

    /// Insert or replace an attribute
    pub fn set_attribute(&self, attribute: AttributeDefinition) {
        write(&self.state.attributes).insert(attribute.name.clone(), attribute);
    }

    pub fn remove_attribute(&self, name: &str) -> Option<AttributeDefinition> {
        write(&self.state.attributes).remove(name)
    }

    /// Primary-key attributes, in attribute-name order
    pub fn primary_keys(&self) -> Vec<AttributeDefinition> {
        read(&self.state.attributes)
            .values()
            .filter(|attribute| attribute.primary_key)
            .cloned()
            .collect()
    }

    /// Name of the first primary-key attribute
    pub fn primary_key_attribute(&self) -> Option<String> {
        read(&self.state.attributes)
            .values()
            .find(|attribute| attribute.primary_key)
            .map(|attribute| attribute.name.clone())
    }

    // Associations

    pub fn association(&self, alias: &str) -> Option<Arc<Association>> {
        read(&self.state.associations).get(alias).cloned()
    }

    pub fn has_association(&self, alias: &str) -> bool {
        read(&self.state.associations).contains_key(alias)
    }

    pub fn associations(&self) -> BTreeMap<String, Arc<Association>> {
        read(&self.state.associations).clone()
    }

    pub fn association_count(&self) -> usize {
        read(&self.state.associations).len()
    }

    pub(crate) fn register_association(&self, association: Arc<Association>) {
        write(&self.state.associations).insert(association.alias().to_string(), association);
    }

    /// Detach every association and the accessor methods installed for them
    pub fn clear_associations(&self) {
        let removed = std::mem::take(&mut *write(&self.state.associations));
        write(&self.state.methods).retain(|_, method| !method.is_accessor());
        tracing::debug!("Cleared {} associations from model {}", removed.len(), self.name());
    }

    /// Copy of the mutable metadata a declaration may touch
    pub(crate) fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            attributes: read(&self.state.attributes).clone(),
            associations: read(&self.state.associations).clone(),
            methods: read(&self.state.methods).clone(),
        }
    }

    /// Put back attributes, associations and methods taken by [`Self::snapshot`]
    pub(crate) fn restore(&self, snapshot: ModelSnapshot) {
        *write(&self.state.attributes) = snapshot.attributes;
        *write(&self.state.associations) = snapshot.associations;
        *write(&self.state.methods) = snapshot.methods;
    }

    // Methods

    /// Register a user-defined method. Accessors never replace user methods.
    pub fn define_method<F>(&self, name: impl Into<String>, method: F)
    where
        F: Fn(&mut ModelInstance, &[serde_json::Value]) -> AssociationResult<AccessorOutcome> + Send + Sync + 'static,
    {
        write(&self.state.methods).insert(name.into(), ModelMethod::user(Arc::new(method)));
    }

    pub fn has_method(&self, name: &str) -> bool {
        read(&self.state.methods).contains_key(name)
    }

    pub fn method_names(&self) -> Vec<String> {
        read(&self.state.methods).keys().cloned().collect()
    }

    pub(crate) fn method(&self, name: &str) -> Option<MethodFn> {
        read(&self.state.methods).get(name).map(ModelMethod::callable)
    }

    /// Install an accessor unless a method of that name already exists.
    /// Returns whether the accessor was installed.
    pub(crate) fn install_accessor(&self, name: &str, method: MethodFn) -> bool {
        let mut methods = write(&self.state.methods);
        if methods.contains_key(name) {
            return false;
        }
        methods.insert(name.to_string(), ModelMethod::accessor(method));
        true
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.state.name)
            .field("table_name", &self.table_name())
            .field("initial_id", &self.state.initial_id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl fmt::Display for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state.name)
    }
}

/// Whether two models derive from the same initial model
pub fn same_initial_model(a: &ModelDefinition, b: &ModelDefinition) -> bool {
    a.initial_id() == b.initial_id()
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for [`ModelDefinition`]
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    names: Option<ModelName>,
    table_name: Option<String>,
    attributes: Vec<AttributeDefinition>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            names: None,
            table_name: None,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Explicit singular/plural names instead of inflected ones
    pub fn names(mut self, names: ModelName) -> Self {
        self.names = Some(names);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Build with the default English inflector. The model still has to be
    /// attached to a registry before associations can be declared on it.
    pub fn build(self) -> ModelRef {
        self.build_with(&EnglishInflector)
    }

    pub fn build_with(self, inflector: &dyn Inflector) -> ModelRef {
        let names = self
            .names
            .unwrap_or_else(|| ModelName::new(inflector.singularize(&self.name), inflector.pluralize(&self.name)));
        let table_name = self.table_name.unwrap_or_else(|| names.plural.clone());
        let attributes = self
            .attributes
            .into_iter()
            .map(|attribute| (attribute.name.clone(), attribute))
            .collect();

        Arc::new(ModelDefinition {
            schema: None,
            state: Arc::new(ModelState {
                initial_id: Uuid::new_v4(),
                name: self.name,
                names,
                table_name,
                attributes: RwLock::new(attributes),
                associations: RwLock::new(BTreeMap::new()),
                methods: RwLock::new(BTreeMap::new()),
                hooks: HookRegistry::default(),
                registry_id: OnceLock::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ModelRef {
        ModelDefinition::builder("User")
            .attribute(AttributeDefinition::new("id", DataType::Integer).primary_key())
            .attribute(AttributeDefinition::new("email", DataType::String).not_null())
            .build()
    }

    #[test]
    fn test_default_names_and_table() {
        let model = user();
        assert_eq!(model.name(), "User");
        assert_eq!(model.names(), &ModelName::new("User", "Users"));
        assert_eq!(model.table_name(), "Users");
        assert!(!model.is_initialized());
    }

    #[test]
    fn test_explicit_names() {
        let model = ModelDefinition::builder("Person")
            .names(ModelName::new("person", "folks"))
            .table_name("people")
            .build();
        assert_eq!(model.names().plural, "folks");
        assert_eq!(model.table_name(), "people");
    }

    #[test]
    fn test_primary_keys() {
        let model = user();
        let keys = model.primary_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "id");
        assert!(!keys[0].allow_null);
        assert_eq!(model.primary_key_attribute().as_deref(), Some("id"));
    }

    #[test]
    fn test_schema_variant_is_same_initial_model() {
        let model = user();
        let tenant = model.with_schema("tenant_a");

        assert_eq!(tenant.table_name(), "tenant_a.Users");
        assert!(same_initial_model(&model, &tenant));
        assert!(!same_initial_model(&model, &user()));

        // state is shared between variants
        tenant.set_attribute(AttributeDefinition::new("nickname", DataType::String));
        assert!(model.has_attribute("nickname"));
    }

    #[test]
    fn test_restore_undoes_attribute_changes() {
        let model = user();
        let snapshot = model.snapshot();

        model.set_attribute(AttributeDefinition::new("teamId", DataType::Integer));
        model.remove_attribute("email");
        model.restore(snapshot);

        assert!(!model.has_attribute("teamId"));
        assert!(model.has_attribute("email"));
    }

    #[test]
    fn test_column_prefers_field() {
        let attribute = AttributeDefinition::new("ownerId", DataType::Integer).with_field("owner_id");
        assert_eq!(attribute.column(), "owner_id");
        assert_eq!(AttributeDefinition::new("id", DataType::Integer).column(), "id");
    }

    #[test]
    fn test_referential_action_sql() {
        assert_eq!(ReferentialAction::SetNull.to_string(), "SET NULL");
        assert_eq!(
            serde_json::to_value(ReferentialAction::Cascade).unwrap(),
            serde_json::json!("CASCADE")
        );
    }
}
