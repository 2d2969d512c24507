//! Model Registry - Mapping context that initializes models and resolves them by name
//!
//! Association declarations go through the registry: it owns the inflector
//! and the configuration the orchestrator needs, and only models attached to
//! it may take part in a declaration.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::AssociationConfig;
use crate::error::{AssociationError, AssociationResult};
use crate::inflection::{EnglishInflector, Inflector};
use crate::relationships::association::{Association, AssociationType};
use crate::relationships::declaration::declare;
use crate::relationships::options::AssociationOptions;

use super::definition::{ModelBuilder, ModelDefinition, ModelRef};

/// Target of a declaration: a model handle or a registered model name
#[derive(Debug, Clone)]
pub enum ModelTarget {
    Model(ModelRef),
    Named(String),
}

impl From<&ModelRef> for ModelTarget {
    fn from(model: &ModelRef) -> Self {
        Self::Model(Arc::clone(model))
    }
}

impl From<ModelRef> for ModelTarget {
    fn from(model: ModelRef) -> Self {
        Self::Model(model)
    }
}

impl From<&str> for ModelTarget {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ModelTarget {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Thread-safe registry of initialized models
pub struct ModelRegistry {
    id: Uuid,
    models: DashMap<String, ModelRef>,
    inflector: Arc<dyn Inflector>,
    config: AssociationConfig,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::with_config(AssociationConfig::default())
    }

    pub fn with_config(config: AssociationConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            models: DashMap::new(),
            inflector: Arc::new(EnglishInflector),
            config,
        }
    }

    /// Registry configured from `ELIF_ASSOCIATIONS_*` environment variables
    pub fn from_env() -> AssociationResult<Self> {
        Ok(Self::with_config(AssociationConfig::from_env()?))
    }

    /// Replace the inflector used for alias and model names
    pub fn with_inflector(mut self, inflector: impl Inflector + 'static) -> Self {
        self.inflector = Arc::new(inflector);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn inflector(&self) -> &dyn Inflector {
        self.inflector.as_ref()
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Build a model with this registry's inflector and attach it
    pub fn define(&self, builder: ModelBuilder) -> AssociationResult<ModelRef> {
        let model = builder.build_with(self.inflector());
        self.attach(&model)?;
        Ok(model)
    }

    /// Attach a built model, completing its initialization
    pub fn attach(&self, model: &ModelRef) -> AssociationResult<()> {
        if !model.mark_initialized(self.id) {
            return Err(AssociationError::AlreadyAttached {
                model: model.name().to_string(),
            });
        }
        self.models.insert(model.name().to_string(), Arc::clone(model));
        tracing::debug!("Attached model {} (table {})", model.name(), model.table_name());
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<ModelRef> {
        self.models.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model, or a new bare join model of that name
    pub fn resolve_or_define(&self, name: &str) -> AssociationResult<ModelRef> {
        match self.resolve(name) {
            Some(model) => Ok(model),
            None => {
                tracing::debug!("Defining join model {}", name);
                self.define(ModelDefinition::builder(name))
            }
        }
    }

    /// Detach a model and tear down its associations
    pub fn remove(&self, name: &str) -> Option<ModelRef> {
        let (_, model) = self.models.remove(name)?;
        model.clear_associations();
        tracing::debug!("Removed model {}", name);
        Some(model)
    }

    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn resolve_target(&self, target: ModelTarget) -> AssociationResult<ModelRef> {
        match target {
            ModelTarget::Model(model) => Ok(model),
            ModelTarget::Named(name) => self.resolve(&name).ok_or(AssociationError::NotAModel { name }),
        }
    }

    /// Declare an association of any type
    pub fn associate(
        &self,
        association_type: AssociationType,
        source: &ModelRef,
        target: impl Into<ModelTarget>,
        options: AssociationOptions,
    ) -> AssociationResult<Arc<Association>> {
        let target = self.resolve_target(target.into())?;
        declare(self, association_type, source, &target, options, None)
    }

    pub fn belongs_to(
        &self,
        source: &ModelRef,
        target: impl Into<ModelTarget>,
        options: AssociationOptions,
    ) -> AssociationResult<Arc<Association>> {
        self.associate(AssociationType::BelongsTo, source, target, options)
    }

    pub fn has_one(
        &self,
        source: &ModelRef,
        target: impl Into<ModelTarget>,
        options: AssociationOptions,
    ) -> AssociationResult<Arc<Association>> {
        self.associate(AssociationType::HasOne, source, target, options)
    }

    pub fn has_many(
        &self,
        source: &ModelRef,
        target: impl Into<ModelTarget>,
        options: AssociationOptions,
    ) -> AssociationResult<Arc<Association>> {
        self.associate(AssociationType::HasMany, source, target, options)
    }

    pub fn belongs_to_many(
        &self,
        source: &ModelRef,
        target: impl Into<ModelTarget>,
        options: AssociationOptions,
    ) -> AssociationResult<Arc<Association>> {
        self.associate(AssociationType::BelongsToMany, source, target, options)
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("id", &self.id)
            .field("models", &self.model_names())
            .field("config", &self.config)
            .finish()
    }
}
