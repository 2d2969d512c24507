//! Foreign-key constraint inference
//!
//! Fills in `references` and the referential actions of a foreign-key
//! attribute from the primary keys of the model it points at. Composite
//! primary keys are not inferred: a key that is one of several primary keys
//! gets no `references`.

use crate::config::AssociationConfig;
use crate::model::{AttributeDefinition, ModelDefinition, ReferentialAction, References};

use super::options::NormalizedAssociationOptions;

/// Derive constraint metadata for `attribute`, which references `key` on `referenced`.
///
/// Values already present on the attribute (merged from the caller's
/// `foreignKey` options) always win over the derived defaults.
pub fn derive_foreign_key(
    attribute: &mut AttributeDefinition,
    referenced: &ModelDefinition,
    options: &NormalizedAssociationOptions,
    key: &str,
    config: &AssociationConfig,
) {
    let enabled = options
        .foreign_key_constraints
        .unwrap_or(config.foreign_key_constraints);
    if !enabled {
        tracing::trace!(
            "Skipping constraint inference for {}.{}",
            referenced.name(),
            attribute.name
        );
        return;
    }

    let primary_keys: Vec<String> = referenced
        .primary_keys()
        .iter()
        .map(|pk| pk.column().to_string())
        .collect();

    let key_column = referenced
        .attribute(key)
        .map(|attr| attr.column().to_string())
        .unwrap_or_else(|| key.to_string());

    if primary_keys.len() == 1 || !primary_keys.contains(&key_column) {
        attribute.references = Some(References {
            table: referenced.table_name(),
            key: key_column,
        });

        let on_delete = if attribute.allow_null {
            ReferentialAction::SetNull
        } else {
            ReferentialAction::Cascade
        };
        attribute.on_delete.get_or_insert(on_delete);
        attribute.on_update.get_or_insert(ReferentialAction::Cascade);
    }
}
