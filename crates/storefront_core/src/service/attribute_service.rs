//! Attribute catalog use-case service.
//!
//! # Responsibility
//! - Create, partially update, read and delete attribute definitions.
//! - Manage value options of selection-kind attributes.
//! - Block deletion, and switches between text and selection input kinds,
//!   while any item still carries the attribute.
//!
//! # Invariants
//! - Attribute names are trimmed and unique across all definitions.
//! - Updates write only fields that differ from stored state; an update with
//!   no effective change performs no write and keeps `updated_at`.
//! - Delete removes the definition and all of its value options together or
//!   not at all.
//! - Every mutation is checked with `verify_rows`.

use crate::config::CatalogConfig;
use crate::model::attribute::{
    AttributeChanges, AttributeClassification, AttributeDefinition, AttributeId,
    AttributeValueOption, AttributeWithValues, InputKind, ItemId, NewAttribute, NewValueOption,
    ValueId,
};
use crate::repo::catalog_repo::{AttributeListQuery, CatalogStore};
use crate::service::error::CatalogError;
use crate::service::now_epoch_ms;
use crate::service::write_guard::verify_rows;
use log::{debug, info, warn};

/// Request model for defining a new attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAttributeRequest {
    pub name: String,
    pub classification: AttributeClassification,
    pub input_kind: InputKind,
    pub required: bool,
    pub searchable: bool,
    pub visible: bool,
    pub sort_weight: i64,
}

impl CreateAttributeRequest {
    /// Visible, optional, non-searchable attribute with weight 0.
    pub fn new(
        name: impl Into<String>,
        classification: AttributeClassification,
        input_kind: InputKind,
    ) -> Self {
        Self {
            name: name.into(),
            classification,
            input_kind,
            required: false,
            searchable: false,
            visible: true,
            sort_weight: 0,
        }
    }
}

/// Request model for adding one value option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateValueOptionRequest {
    pub value: String,
    pub sort_weight: i64,
}

/// Attribute catalog service facade over a store gateway.
pub struct AttributeService<R: CatalogStore> {
    repo: R,
    config: CatalogConfig,
}

impl<R: CatalogStore> AttributeService<R> {
    /// Creates a service with default configuration.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, CatalogConfig::default())
    }

    /// Creates a service with explicit configuration.
    pub fn with_config(repo: R, config: CatalogConfig) -> Self {
        Self {
            repo,
            config: config.normalized(),
        }
    }

    /// Defines a new attribute.
    ///
    /// # Errors
    /// - `InvalidInput` when the name is blank.
    /// - `NameDuplicated` when another definition already uses the name.
    /// - `InternalInconsistency` when the insert does not report one row.
    pub fn create_attribute(
        &self,
        request: &CreateAttributeRequest,
    ) -> Result<AttributeDefinition, CatalogError> {
        let name = normalize_name(&request.name)?;

        let created = self.repo.atomically(|repo| -> Result<AttributeDefinition, CatalogError> {
            if repo.find_attribute_by_name(&name)?.is_some() {
                return Err(CatalogError::NameDuplicated(name.clone()));
            }

            let now = now_epoch_ms();
            let draft = NewAttribute {
                name: name.clone(),
                classification: request.classification,
                input_kind: request.input_kind,
                required: request.required,
                searchable: request.searchable,
                sort_weight: request.sort_weight,
                visible: request.visible,
                created_at: now,
                updated_at: now,
            };
            let inserted = repo.insert_attribute(&draft)?;
            verify_rows("attribute_insert", 1, inserted.rows)?;
            Ok(draft.into_definition(inserted.id))
        })?;

        info!(
            "event=attribute_create module=catalog status=ok attribute_id={} input_kind={}",
            created.id,
            created.input_kind.as_str()
        );
        Ok(created)
    }

    /// Applies the fields of `request` that differ from stored state.
    ///
    /// Returns without writing when nothing differs.
    ///
    /// # Errors
    /// - `NotFound` when the attribute does not exist.
    /// - `NameDuplicated` when a rename collides with another definition.
    /// - `ReferencedByItem` when the input kind switches between `Text` and a
    ///   selection kind while items still carry the attribute.
    pub fn update_attribute(
        &self,
        id: AttributeId,
        request: &AttributeChanges,
    ) -> Result<(), CatalogError> {
        let probe_limit = self.config.reference_probe_limit;
        let written = self.repo.atomically(|repo| -> Result<bool, CatalogError> {
            let current = repo
                .find_attribute_by_id(id)?
                .ok_or(CatalogError::NotFound(id))?;
            let changes = changed_fields(&current, request)?;
            if changes.is_empty() {
                return Ok(false);
            }

            // Stored assignments carry the payload shape of the current kind.
            if let Some(input_kind) = changes.input_kind {
                if input_kind.is_selection() != current.input_kind.is_selection() {
                    ensure_unreferenced(repo, id, probe_limit)?;
                }
            }

            if let Some(name) = changes.name.as_deref() {
                if let Some(existing) = repo.find_attribute_by_name(name)? {
                    if existing.id != id {
                        return Err(CatalogError::NameDuplicated(name.to_string()));
                    }
                }
            }

            let changed = repo.update_attribute(id, &changes, now_epoch_ms())?;
            verify_rows("attribute_update", 1, changed)?;
            Ok(true)
        })?;

        if written {
            info!("event=attribute_update module=catalog status=ok attribute_id={id}");
        } else {
            debug!("event=attribute_update module=catalog status=noop attribute_id={id}");
        }
        Ok(())
    }

    /// Deletes an unreferenced attribute together with its value options.
    ///
    /// # Errors
    /// - `NotFound` when the attribute does not exist.
    /// - `ReferencedByItem` when the bounded probe sees any assignment; the
    ///   error lists the item ids seen by the probe, not necessarily all.
    /// - `InternalInconsistency` when a delete count does not match.
    pub fn delete_attribute(&self, id: AttributeId) -> Result<(), CatalogError> {
        let probe_limit = self.config.reference_probe_limit;
        let result = self.repo.atomically(|repo| -> Result<usize, CatalogError> {
            if repo.find_attribute_by_id(id)?.is_none() {
                return Err(CatalogError::NotFound(id));
            }

            ensure_unreferenced(repo, id, probe_limit)?;

            verify_rows("attribute_delete", 1, repo.delete_attribute_by_id(id)?)?;

            let value_count = repo.count_value_options_by_attribute_id(id)?;
            if value_count > 0 {
                let deleted = repo.delete_value_options_by_attribute_id(id)?;
                verify_rows("value_option_cascade_delete", value_count, deleted)?;
            }
            Ok(value_count)
        });

        match &result {
            Ok(value_count) => info!(
                "event=attribute_delete module=catalog status=ok attribute_id={id} deleted_values={value_count}"
            ),
            Err(CatalogError::ReferencedByItem { item_ids, .. }) => warn!(
                "event=attribute_delete module=catalog status=blocked attribute_id={id} referencing_items={}",
                item_ids.len()
            ),
            Err(_) => {}
        }
        result.map(|_| ())
    }

    /// Loads one attribute definition.
    pub fn get_attribute(&self, id: AttributeId) -> Result<AttributeDefinition, CatalogError> {
        self.repo
            .find_attribute_by_id(id)?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Loads one attribute definition with its value options.
    ///
    /// Values are attached only for selection kinds, ordered by
    /// `sort_weight ASC, id ASC`.
    pub fn get_attribute_with_values(
        &self,
        id: AttributeId,
    ) -> Result<AttributeWithValues, CatalogError> {
        let definition = self.get_attribute(id)?;
        let values = self.values_for(&definition)?;
        Ok(AttributeWithValues { definition, values })
    }

    /// Lists value options of one attribute; empty for `InputKind::Text`.
    pub fn list_values_for_attribute(
        &self,
        id: AttributeId,
    ) -> Result<Vec<AttributeValueOption>, CatalogError> {
        let definition = self.get_attribute(id)?;
        self.values_for(&definition)
    }

    /// Loads one value option.
    pub fn get_value_option(&self, id: ValueId) -> Result<AttributeValueOption, CatalogError> {
        self.repo
            .find_value_option_by_id(id)?
            .ok_or(CatalogError::ValueNotFound(id))
    }

    /// Adds one value option to a selection-kind attribute.
    pub fn create_value_option(
        &self,
        attribute_id: AttributeId,
        request: &CreateValueOptionRequest,
    ) -> Result<AttributeValueOption, CatalogError> {
        let value = request.value.trim();
        if value.is_empty() {
            return Err(CatalogError::InvalidInput(
                "value option text must not be blank".to_string(),
            ));
        }

        let created = self
            .repo
            .atomically(|repo| -> Result<AttributeValueOption, CatalogError> {
                let definition = repo
                    .find_attribute_by_id(attribute_id)?
                    .ok_or(CatalogError::NotFound(attribute_id))?;
                if !definition.input_kind.is_selection() {
                    return Err(CatalogError::NotSelectionKind(attribute_id));
                }

                let draft = NewValueOption {
                    attribute_id,
                    value: value.to_string(),
                    sort_weight: request.sort_weight,
                };
                let inserted = repo.insert_value_option(&draft)?;
                verify_rows("value_option_insert", 1, inserted.rows)?;
                Ok(AttributeValueOption {
                    id: inserted.id,
                    attribute_id,
                    value: draft.value,
                    sort_weight: draft.sort_weight,
                })
            })?;

        debug!(
            "event=value_option_create module=catalog status=ok attribute_id={attribute_id} value_id={}",
            created.id
        );
        Ok(created)
    }

    /// Lists definitions ordered by `sort_weight ASC, id ASC`.
    pub fn list_attributes(
        &self,
        query: &AttributeListQuery,
    ) -> Result<Vec<AttributeDefinition>, CatalogError> {
        Ok(self.repo.list_attributes(query)?)
    }

    fn values_for(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<Vec<AttributeValueOption>, CatalogError> {
        if !definition.input_kind.is_selection() {
            return Ok(Vec::new());
        }
        Ok(self
            .repo
            .find_all_value_options_by_attribute_id(definition.id)?)
    }
}

/// Fails with `ReferencedByItem` when the bounded probe sees any assignment.
fn ensure_unreferenced<R: CatalogStore>(
    repo: &R,
    id: AttributeId,
    probe_limit: u32,
) -> Result<(), CatalogError> {
    let references = repo.find_assignments_by_attribute_id(id, 0, probe_limit)?;
    if references.is_empty() {
        return Ok(());
    }

    let mut item_ids: Vec<ItemId> = references
        .iter()
        .map(|assignment| assignment.item_id)
        .collect();
    item_ids.sort_unstable();
    item_ids.dedup();
    Err(CatalogError::ReferencedByItem {
        attribute_id: id,
        item_ids,
    })
}

fn normalize_name(name: &str) -> Result<String, CatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidInput(
            "attribute name must not be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Keeps only the requested fields whose value differs from `current`.
fn changed_fields(
    current: &AttributeDefinition,
    request: &AttributeChanges,
) -> Result<AttributeChanges, CatalogError> {
    let name = match request.name.as_deref() {
        Some(name) => Some(normalize_name(name)?).filter(|name| *name != current.name),
        None => None,
    };

    Ok(AttributeChanges {
        name,
        classification: request
            .classification
            .filter(|value| *value != current.classification),
        input_kind: request
            .input_kind
            .filter(|value| *value != current.input_kind),
        required: request.required.filter(|value| *value != current.required),
        searchable: request
            .searchable
            .filter(|value| *value != current.searchable),
        sort_weight: request
            .sort_weight
            .filter(|value| *value != current.sort_weight),
        visible: request.visible.filter(|value| *value != current.visible),
    })
}
