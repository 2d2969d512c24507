//! Model System - Model definitions, instances, hooks and the model registry
//!
//! - `definition`: attribute set, naming metadata and per-model state
//! - `instance`: row values and method-table dispatch
//! - `hooks`: typed `beforeAssociate` / `afterAssociate` callbacks
//! - `registry`: mapping context that initializes and resolves models

pub mod definition;
pub mod hooks;
pub mod instance;
pub mod registry;

pub use definition::{
    same_initial_model, AttributeDefinition, DataType, ModelBuilder, ModelDefinition, ModelName, ModelRef,
    ReferentialAction, References,
};
pub use hooks::{AfterAssociateHook, AssociateContext, BeforeAssociateHook, HookEvent, HookRegistry};
pub use instance::{MethodFn, ModelInstance};
pub use registry::{ModelRegistry, ModelTarget};
