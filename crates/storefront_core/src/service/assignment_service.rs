//! Item attribute assignment reconciliation.
//!
//! # Responsibility
//! - Bring an item's stored attribute assignments in line with a desired
//!   list using the delete-current-then-insert-new diff.
//! - Validate the payload of every inserted assignment against its
//!   attribute's input kind.
//!
//! # Invariants
//! - Load, delete and insert run inside one atomic write boundary.
//! - An item with no stored assignments and an empty desired list causes no
//!   write at all.
//! - Selection kinds carry a value option owned by the same attribute; `Text`
//!   carries non-blank literal text.

use crate::model::attribute::{
    AttributeId, InputKind, ItemAttributeAssignment, ItemId, ValueId,
};
use crate::repo::catalog_repo::CatalogStore;
use crate::service::error::CatalogError;
use crate::service::now_epoch_ms;
use crate::service::write_guard::verify_rows;
use log::{debug, info};
use std::collections::BTreeSet;

/// Desired assignment of one attribute to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub attribute_id: AttributeId,
    /// Required for selection kinds.
    pub value_id: Option<ValueId>,
    /// Required for `InputKind::Text`.
    pub input_value: Option<String>,
}

impl AssignmentRequest {
    /// Assignment selecting one value option.
    pub fn selected(attribute_id: AttributeId, value_id: ValueId) -> Self {
        Self {
            attribute_id,
            value_id: Some(value_id),
            input_value: None,
        }
    }

    /// Assignment carrying literal text.
    pub fn text(attribute_id: AttributeId, input_value: impl Into<String>) -> Self {
        Self {
            attribute_id,
            value_id: None,
            input_value: Some(input_value.into()),
        }
    }
}

/// Row counts written by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub deleted: usize,
    pub inserted: usize,
}

/// Assignment reconciler facade over a store gateway.
pub struct AssignmentService<R: CatalogStore> {
    repo: R,
}

impl<R: CatalogStore> AssignmentService<R> {
    /// Creates a service using the provided store implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists the stored assignments of one item, ordered by attribute id.
    pub fn list_item_attributes(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<ItemAttributeAssignment>, CatalogError> {
        Ok(self.repo.find_assignments_by_item_id(item_id)?)
    }

    /// Reconciles the stored assignments of `item_id` with `desired`.
    ///
    /// With no stored assignments every desired entry is inserted. Otherwise
    /// the whole stored set is deleted and only entries whose attribute was
    /// not stored before are inserted, so an already-assigned attribute is
    /// left unassigned even when its desired value changed. Duplicate
    /// attribute ids in `desired` keep their first entry.
    ///
    /// Only entries that end up inserted are validated; entries dropped by
    /// the diff never fail the call.
    ///
    /// # Errors
    /// - `NotFound` / `ValueNotFound` / `InvalidAssignment` for a bad entry
    ///   that would be inserted; nothing is written in that case.
    /// - `InternalInconsistency` when a delete or insert count does not match.
    pub fn ensure_item_attributes(
        &self,
        item_id: ItemId,
        desired: &[AssignmentRequest],
    ) -> Result<ReconcileSummary, CatalogError> {
        let summary = self
            .repo
            .atomically(|repo| -> Result<ReconcileSummary, CatalogError> {
                let current = repo.find_assignments_by_item_id(item_id)?;
                let assigned: BTreeSet<AttributeId> = current
                    .iter()
                    .map(|assignment| assignment.attribute_id)
                    .collect();

                // TODO: reinsert assignments whose value changed once the
                // replace-vs-add product decision is made.
                let submitted = new_entries(item_id, desired, &assigned);

                let now = now_epoch_ms();
                let rows = submitted
                    .into_iter()
                    .map(|request| build_assignment(repo, item_id, request, now))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut summary = ReconcileSummary::default();
                if !assigned.is_empty() {
                    let assigned_ids: Vec<AttributeId> = assigned.iter().copied().collect();
                    let deleted =
                        repo.delete_assignments_by_item_and_attribute_ids(item_id, &assigned_ids)?;
                    verify_rows("assignment_delete", assigned_ids.len(), deleted)?;
                    summary.deleted = deleted;
                }

                if rows.is_empty() {
                    return Ok(summary);
                }

                let inserted = repo.batch_insert_assignments(&rows)?;
                verify_rows("assignment_batch_insert", rows.len(), inserted)?;
                summary.inserted = inserted;
                Ok(summary)
            })?;

        info!(
            "event=item_attributes_ensure module=catalog status=ok item_id={item_id} deleted={} inserted={}",
            summary.deleted, summary.inserted
        );
        Ok(summary)
    }
}

/// First desired entry per attribute id, minus attributes already assigned.
fn new_entries<'a>(
    item_id: ItemId,
    desired: &'a [AssignmentRequest],
    assigned: &BTreeSet<AttributeId>,
) -> Vec<&'a AssignmentRequest> {
    let mut seen = BTreeSet::new();
    let mut entries = Vec::with_capacity(desired.len());
    for request in desired {
        if !seen.insert(request.attribute_id) {
            debug!(
                "event=item_attributes_ensure module=catalog status=skip_duplicate item_id={item_id} attribute_id={}",
                request.attribute_id
            );
            continue;
        }
        if assigned.contains(&request.attribute_id) {
            continue;
        }
        entries.push(request);
    }
    entries
}

fn build_assignment<R: CatalogStore>(
    repo: &R,
    item_id: ItemId,
    request: &AssignmentRequest,
    created_at: i64,
) -> Result<ItemAttributeAssignment, CatalogError> {
    let attribute_id = request.attribute_id;
    let attribute = repo
        .find_attribute_by_id(attribute_id)?
        .ok_or(CatalogError::NotFound(attribute_id))?;

    let (value_id, input_value) = match attribute.input_kind {
        InputKind::SingleSelect | InputKind::MultiSelect => {
            let value_id = request
                .value_id
                .ok_or(CatalogError::InvalidAssignment {
                    attribute_id,
                    reason: "selection attribute requires a value option",
                })?;
            match repo.find_value_option_by_id(value_id)? {
                Some(option) if option.attribute_id == attribute_id => {}
                _ => return Err(CatalogError::ValueNotFound(value_id)),
            }
            (Some(value_id), None)
        }
        InputKind::Text => {
            let text = request
                .input_value
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .ok_or(CatalogError::InvalidAssignment {
                    attribute_id,
                    reason: "text attribute requires a non-blank input value",
                })?;
            (None, Some(text.to_string()))
        }
    };

    Ok(ItemAttributeAssignment {
        item_id,
        attribute_id,
        value_id,
        input_value,
        created_at,
    })
}
