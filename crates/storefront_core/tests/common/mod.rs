#![allow(dead_code)]

use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;
use storefront_core::db::open_db_in_memory;
use storefront_core::model::attribute::{NewAttribute, NewValueOption};
use storefront_core::{
    AttributeChanges, AttributeClassification, AttributeDefinition, AttributeId,
    AttributeListQuery, AttributeService, AttributeValueOption, CatalogStore,
    CreateAttributeRequest, CreateValueOptionRequest, InputKind, Inserted,
    ItemAttributeAssignment, ItemId, RepoError, RepoResult, SqliteCatalogStore, ValueId,
};

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn color_request() -> CreateAttributeRequest {
    let mut request = CreateAttributeRequest::new(
        "Color",
        AttributeClassification::Product,
        InputKind::Text,
    );
    request.required = true;
    request
}

/// Creates `Size` (single select) with options S, M, L.
pub fn create_size<R: CatalogStore>(
    service: &AttributeService<R>,
) -> (AttributeDefinition, Vec<AttributeValueOption>) {
    let size = service
        .create_attribute(&CreateAttributeRequest::new(
            "Size",
            AttributeClassification::Sku,
            InputKind::SingleSelect,
        ))
        .unwrap();
    let values = [("S", 10), ("M", 20), ("L", 30)]
        .into_iter()
        .map(|(value, sort_weight)| {
            service
                .create_value_option(
                    size.id,
                    &CreateValueOptionRequest {
                        value: value.to_string(),
                        sort_weight,
                    },
                )
                .unwrap()
        })
        .collect();
    (size, values)
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// Store wrapper that records gateway calls and can misreport row counts.
pub struct RecordingStore<'conn> {
    inner: SqliteCatalogStore<'conn>,
    calls: RefCell<Vec<&'static str>>,
    misreports: RefCell<HashMap<&'static str, usize>>,
}

impl<'conn> RecordingStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteCatalogStore::try_new(conn).unwrap(),
            calls: RefCell::new(Vec::new()),
            misreports: RefCell::new(HashMap::new()),
        }
    }

    /// Makes `operation` report `rows` regardless of what the store did.
    pub fn misreport(&self, operation: &'static str, rows: usize) {
        self.misreports.borrow_mut().insert(operation, rows);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls.borrow().iter().any(|call| *call == operation)
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, operation: &'static str) {
        self.calls.borrow_mut().push(operation);
    }

    fn reported(&self, operation: &'static str, rows: usize) -> usize {
        self.misreports
            .borrow()
            .get(operation)
            .copied()
            .unwrap_or(rows)
    }
}

impl CatalogStore for RecordingStore<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.record("atomically");
        self.inner.atomically(|_| work(self))
    }

    fn find_attribute_by_name(&self, name: &str) -> RepoResult<Option<AttributeDefinition>> {
        self.record("find_attribute_by_name");
        self.inner.find_attribute_by_name(name)
    }

    fn find_attribute_by_id(&self, id: AttributeId) -> RepoResult<Option<AttributeDefinition>> {
        self.record("find_attribute_by_id");
        self.inner.find_attribute_by_id(id)
    }

    fn list_attributes(&self, query: &AttributeListQuery) -> RepoResult<Vec<AttributeDefinition>> {
        self.record("list_attributes");
        self.inner.list_attributes(query)
    }

    fn insert_attribute(&self, attribute: &NewAttribute) -> RepoResult<Inserted> {
        self.record("insert_attribute");
        let inserted = self.inner.insert_attribute(attribute)?;
        Ok(Inserted {
            rows: self.reported("insert_attribute", inserted.rows),
            id: inserted.id,
        })
    }

    fn update_attribute(
        &self,
        id: AttributeId,
        changes: &AttributeChanges,
        updated_at: i64,
    ) -> RepoResult<usize> {
        self.record("update_attribute");
        let rows = self.inner.update_attribute(id, changes, updated_at)?;
        Ok(self.reported("update_attribute", rows))
    }

    fn delete_attribute_by_id(&self, id: AttributeId) -> RepoResult<usize> {
        self.record("delete_attribute_by_id");
        let rows = self.inner.delete_attribute_by_id(id)?;
        Ok(self.reported("delete_attribute_by_id", rows))
    }

    fn insert_value_option(&self, option: &NewValueOption) -> RepoResult<Inserted> {
        self.record("insert_value_option");
        let inserted = self.inner.insert_value_option(option)?;
        Ok(Inserted {
            rows: self.reported("insert_value_option", inserted.rows),
            id: inserted.id,
        })
    }

    fn find_value_option_by_id(&self, id: ValueId) -> RepoResult<Option<AttributeValueOption>> {
        self.record("find_value_option_by_id");
        self.inner.find_value_option_by_id(id)
    }

    fn find_all_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<Vec<AttributeValueOption>> {
        self.record("find_all_value_options_by_attribute_id");
        self.inner
            .find_all_value_options_by_attribute_id(attribute_id)
    }

    fn count_value_options_by_attribute_id(&self, attribute_id: AttributeId) -> RepoResult<usize> {
        self.record("count_value_options_by_attribute_id");
        self.inner.count_value_options_by_attribute_id(attribute_id)
    }

    fn delete_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<usize> {
        self.record("delete_value_options_by_attribute_id");
        let rows = self
            .inner
            .delete_value_options_by_attribute_id(attribute_id)?;
        Ok(self.reported("delete_value_options_by_attribute_id", rows))
    }

    fn find_assignments_by_item_id(
        &self,
        item_id: ItemId,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        self.record("find_assignments_by_item_id");
        self.inner.find_assignments_by_item_id(item_id)
    }

    fn find_assignments_by_attribute_id(
        &self,
        attribute_id: AttributeId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        self.record("find_assignments_by_attribute_id");
        self.inner
            .find_assignments_by_attribute_id(attribute_id, offset, limit)
    }

    fn delete_assignments_by_item_and_attribute_ids(
        &self,
        item_id: ItemId,
        attribute_ids: &[AttributeId],
    ) -> RepoResult<usize> {
        self.record("delete_assignments_by_item_and_attribute_ids");
        let rows = self
            .inner
            .delete_assignments_by_item_and_attribute_ids(item_id, attribute_ids)?;
        Ok(self.reported("delete_assignments_by_item_and_attribute_ids", rows))
    }

    fn batch_insert_assignments(&self, rows: &[ItemAttributeAssignment]) -> RepoResult<usize> {
        self.record("batch_insert_assignments");
        let inserted = self.inner.batch_insert_assignments(rows)?;
        Ok(self.reported("batch_insert_assignments", inserted))
    }
}
