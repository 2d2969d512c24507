//! Shared fixtures for association integration tests

#![allow(dead_code)]

use elif_associations::{AttributeDefinition, DataType, ModelDefinition, ModelRef, ModelRegistry};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("elif_associations=debug")
        .with_test_writer()
        .try_init();
}

/// Define a model with an integer `id` primary key
pub fn define(registry: &ModelRegistry, name: &str) -> ModelRef {
    registry
        .define(ModelDefinition::builder(name).attribute(AttributeDefinition::new("id", DataType::Integer).primary_key()))
        .expect("model should attach")
}
