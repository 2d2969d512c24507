//! HasOne - Single-valued counterpart of hasMany

use std::sync::Arc;

use crate::error::AssociationResult;
use crate::model::{ModelRef, ModelRegistry};

use super::association::{Association, AssociationType};
use super::has_many::build_with_inverse;
use super::options::NormalizedAssociationOptions;

pub(crate) fn build(
    registry: &ModelRegistry,
    source: &ModelRef,
    target: &ModelRef,
    options: NormalizedAssociationOptions,
    parent: Option<&Arc<Association>>,
) -> AssociationResult<Arc<Association>> {
    build_with_inverse(registry, AssociationType::HasOne, source, target, options, parent)
}
