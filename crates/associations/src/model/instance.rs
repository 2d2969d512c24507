//! Model instances and the per-model method table
//!
//! Accessors are not attached to a shared prototype. Each model owns a table
//! of named callables and instances dispatch through it, passing themselves
//! as the implicit first argument.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{AssociationError, AssociationResult};
use crate::relationships::query::AccessorOutcome;

use super::definition::ModelRef;

/// Callable stored in a model's method table
pub type MethodFn = Arc<dyn Fn(&mut ModelInstance, &[Value]) -> AssociationResult<AccessorOutcome> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ModelMethod {
    callable: MethodFn,
    accessor: bool,
}

impl ModelMethod {
    pub(crate) fn user(callable: MethodFn) -> Self {
        Self { callable, accessor: false }
    }

    pub(crate) fn accessor(callable: MethodFn) -> Self {
        Self { callable, accessor: true }
    }

    pub(crate) fn callable(&self) -> MethodFn {
        Arc::clone(&self.callable)
    }

    pub(crate) fn is_accessor(&self) -> bool {
        self.accessor
    }
}

/// A row-shaped value of a model
#[derive(Clone)]
pub struct ModelInstance {
    model: ModelRef,
    values: Map<String, Value>,
}

impl ModelInstance {
    pub fn new(model: &ModelRef) -> Self {
        Self {
            model: Arc::clone(model),
            values: Map::new(),
        }
    }

    pub fn with_values(model: &ModelRef, values: Map<String, Value>) -> Self {
        Self {
            model: Arc::clone(model),
            values,
        }
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.values.insert(attribute.into(), value);
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Non-null value of `attribute`, or `MissingKeyValue`
    pub fn require(&self, attribute: &str) -> AssociationResult<Value> {
        match self.values.get(attribute) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(AssociationError::MissingKeyValue {
                model: self.model.name().to_string(),
                attribute: attribute.to_string(),
            }),
        }
    }

    /// Invoke a method from the model's method table
    pub fn call(&mut self, method: &str, args: &[Value]) -> AssociationResult<AccessorOutcome> {
        let callable = self.model.method(method).ok_or_else(|| AssociationError::UnknownMethod {
            model: self.model.name().to_string(),
            method: method.to_string(),
        })?;
        callable(self, args)
    }
}

impl fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInstance")
            .field("model", &self.model.name())
            .field("values", &self.values)
            .finish()
    }
}
