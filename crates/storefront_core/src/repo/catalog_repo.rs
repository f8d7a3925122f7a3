//! Catalog store gateway contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide point lookups, inserts, updates, batch writes and bounded
//!   probes over `attributes`, `attribute_values` and `item_attributes`.
//! - Report the affected row count of every mutation so services can verify
//!   that a write really happened.
//! - Provide the atomic write boundary (`atomically`) used by multi-step
//!   service operations.
//!
//! # Invariants
//! - Mutations never interpret their own row counts; that is the caller's job.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Value option and assignment listings are deterministic.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::attribute::{
    AttributeChanges, AttributeClassification, AttributeDefinition, AttributeId,
    AttributeValueOption, InputKind, ItemAttributeAssignment, ItemId, NewAttribute,
    NewValueOption, ValueId,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ATTRIBUTES_DEFAULT_LIMIT: u32 = 20;
const ATTRIBUTES_LIMIT_MAX: u32 = 100;

const ATTRIBUTE_SELECT_SQL: &str = "SELECT
    id,
    name,
    classification,
    input_kind,
    required,
    searchable,
    sort_weight,
    visible,
    created_at,
    updated_at
FROM attributes";

const VALUE_SELECT_SQL: &str = "SELECT
    id,
    attribute_id,
    value,
    sort_weight
FROM attribute_values";

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    item_id,
    attribute_id,
    value_id,
    input_value,
    created_at
FROM item_attributes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Gateway-level error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "catalog store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "catalog store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "catalog store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of a single-row insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    /// Rows the store reports as written.
    pub rows: usize,
    /// Store-assigned identifier of the new row.
    pub id: i64,
}

/// Query options for listing attribute definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeListQuery {
    /// Optional exact classification filter.
    pub classification: Option<AttributeClassification>,
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Store gateway used by catalog services.
///
/// Every mutating method returns the affected row count reported by the
/// store. Implementations must not turn a zero count into an error.
pub trait CatalogStore {
    /// Runs `work` inside one atomic write boundary.
    ///
    /// Commits when `work` returns `Ok`; any `Err` rolls back every write made
    /// through `self` inside the closure. Boundaries do not nest.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;

    fn find_attribute_by_name(&self, name: &str) -> RepoResult<Option<AttributeDefinition>>;
    fn find_attribute_by_id(&self, id: AttributeId) -> RepoResult<Option<AttributeDefinition>>;
    fn list_attributes(&self, query: &AttributeListQuery) -> RepoResult<Vec<AttributeDefinition>>;
    fn insert_attribute(&self, attribute: &NewAttribute) -> RepoResult<Inserted>;
    /// Writes only the fields set in `changes`, plus `updated_at`.
    fn update_attribute(
        &self,
        id: AttributeId,
        changes: &AttributeChanges,
        updated_at: i64,
    ) -> RepoResult<usize>;
    fn delete_attribute_by_id(&self, id: AttributeId) -> RepoResult<usize>;

    fn insert_value_option(&self, option: &NewValueOption) -> RepoResult<Inserted>;
    fn find_value_option_by_id(&self, id: ValueId) -> RepoResult<Option<AttributeValueOption>>;
    /// Lists options ordered by `sort_weight ASC, id ASC`.
    fn find_all_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<Vec<AttributeValueOption>>;
    fn count_value_options_by_attribute_id(&self, attribute_id: AttributeId) -> RepoResult<usize>;
    fn delete_value_options_by_attribute_id(&self, attribute_id: AttributeId)
        -> RepoResult<usize>;

    fn find_assignments_by_item_id(
        &self,
        item_id: ItemId,
    ) -> RepoResult<Vec<ItemAttributeAssignment>>;
    /// Bounded probe for assignments referencing one attribute.
    fn find_assignments_by_attribute_id(
        &self,
        attribute_id: AttributeId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<Vec<ItemAttributeAssignment>>;
    fn delete_assignments_by_item_and_attribute_ids(
        &self,
        item_id: ItemId,
        attribute_ids: &[AttributeId],
    ) -> RepoResult<usize>;
    fn batch_insert_assignments(&self, rows: &[ItemAttributeAssignment]) -> RepoResult<usize>;
}

impl<S: CatalogStore> CatalogStore for &S {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        (**self).atomically(|_| work(self))
    }

    fn find_attribute_by_name(&self, name: &str) -> RepoResult<Option<AttributeDefinition>> {
        (**self).find_attribute_by_name(name)
    }

    fn find_attribute_by_id(&self, id: AttributeId) -> RepoResult<Option<AttributeDefinition>> {
        (**self).find_attribute_by_id(id)
    }

    fn list_attributes(&self, query: &AttributeListQuery) -> RepoResult<Vec<AttributeDefinition>> {
        (**self).list_attributes(query)
    }

    fn insert_attribute(&self, attribute: &NewAttribute) -> RepoResult<Inserted> {
        (**self).insert_attribute(attribute)
    }

    fn update_attribute(
        &self,
        id: AttributeId,
        changes: &AttributeChanges,
        updated_at: i64,
    ) -> RepoResult<usize> {
        (**self).update_attribute(id, changes, updated_at)
    }

    fn delete_attribute_by_id(&self, id: AttributeId) -> RepoResult<usize> {
        (**self).delete_attribute_by_id(id)
    }

    fn insert_value_option(&self, option: &NewValueOption) -> RepoResult<Inserted> {
        (**self).insert_value_option(option)
    }

    fn find_value_option_by_id(&self, id: ValueId) -> RepoResult<Option<AttributeValueOption>> {
        (**self).find_value_option_by_id(id)
    }

    fn find_all_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<Vec<AttributeValueOption>> {
        (**self).find_all_value_options_by_attribute_id(attribute_id)
    }

    fn count_value_options_by_attribute_id(&self, attribute_id: AttributeId) -> RepoResult<usize> {
        (**self).count_value_options_by_attribute_id(attribute_id)
    }

    fn delete_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<usize> {
        (**self).delete_value_options_by_attribute_id(attribute_id)
    }

    fn find_assignments_by_item_id(
        &self,
        item_id: ItemId,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        (**self).find_assignments_by_item_id(item_id)
    }

    fn find_assignments_by_attribute_id(
        &self,
        attribute_id: AttributeId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        (**self).find_assignments_by_attribute_id(attribute_id, offset, limit)
    }

    fn delete_assignments_by_item_and_attribute_ids(
        &self,
        item_id: ItemId,
        attribute_ids: &[AttributeId],
    ) -> RepoResult<usize> {
        (**self).delete_assignments_by_item_and_attribute_ids(item_id, attribute_ids)
    }

    fn batch_insert_assignments(&self, rows: &[ItemAttributeAssignment]) -> RepoResult<usize> {
        (**self).batch_insert_assignments(rows)
    }
}

/// SQLite-backed catalog store.
pub struct SqliteCatalogStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogStore<'conn> {
    /// Creates a store from a migrated connection.
    ///
    /// Fails when the schema version or required tables/columns are missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_catalog_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CatalogStore for SqliteCatalogStore<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        // IMMEDIATE takes the write lock up front, so two boundaries touching
        // the same item cannot interleave their read and write phases.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn find_attribute_by_name(&self, name: &str) -> RepoResult<Option<AttributeDefinition>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTRIBUTE_SELECT_SQL}
             WHERE name = ?1
             ORDER BY id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attribute_row(row)?));
        }
        Ok(None)
    }

    fn find_attribute_by_id(&self, id: AttributeId) -> RepoResult<Option<AttributeDefinition>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTRIBUTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attribute_row(row)?));
        }
        Ok(None)
    }

    fn list_attributes(&self, query: &AttributeListQuery) -> RepoResult<Vec<AttributeDefinition>> {
        let mut sql = format!("{ATTRIBUTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(classification) = query.classification {
            sql.push_str(" AND classification = ?");
            bind_values.push(Value::Text(classification.as_str().to_string()));
        }

        sql.push_str(" ORDER BY sort_weight ASC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_attribute_limit(
            query.limit,
        ))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut attributes = Vec::new();
        while let Some(row) = rows.next()? {
            attributes.push(parse_attribute_row(row)?);
        }
        Ok(attributes)
    }

    fn insert_attribute(&self, attribute: &NewAttribute) -> RepoResult<Inserted> {
        let rows = self.conn.execute(
            "INSERT INTO attributes (
                name,
                classification,
                input_kind,
                required,
                searchable,
                sort_weight,
                visible,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                attribute.name.as_str(),
                attribute.classification.as_str(),
                attribute.input_kind.as_str(),
                bool_to_int(attribute.required),
                bool_to_int(attribute.searchable),
                attribute.sort_weight,
                bool_to_int(attribute.visible),
                attribute.created_at,
                attribute.updated_at,
            ],
        )?;
        Ok(Inserted {
            rows,
            id: self.conn.last_insert_rowid(),
        })
    }

    fn update_attribute(
        &self,
        id: AttributeId,
        changes: &AttributeChanges,
        updated_at: i64,
    ) -> RepoResult<usize> {
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = changes.name.as_ref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(classification) = changes.classification {
            assignments.push("classification = ?");
            bind_values.push(Value::Text(classification.as_str().to_string()));
        }
        if let Some(input_kind) = changes.input_kind {
            assignments.push("input_kind = ?");
            bind_values.push(Value::Text(input_kind.as_str().to_string()));
        }
        if let Some(required) = changes.required {
            assignments.push("required = ?");
            bind_values.push(Value::Integer(bool_to_int(required)));
        }
        if let Some(searchable) = changes.searchable {
            assignments.push("searchable = ?");
            bind_values.push(Value::Integer(bool_to_int(searchable)));
        }
        if let Some(sort_weight) = changes.sort_weight {
            assignments.push("sort_weight = ?");
            bind_values.push(Value::Integer(sort_weight));
        }
        if let Some(visible) = changes.visible {
            assignments.push("visible = ?");
            bind_values.push(Value::Integer(bool_to_int(visible)));
        }

        assignments.push("updated_at = ?");
        bind_values.push(Value::Integer(updated_at));
        bind_values.push(Value::Integer(id));

        let sql = format!(
            "UPDATE attributes SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn delete_attribute_by_id(&self, id: AttributeId) -> RepoResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM attributes WHERE id = ?1;", [id])?;
        Ok(deleted)
    }

    fn insert_value_option(&self, option: &NewValueOption) -> RepoResult<Inserted> {
        let rows = self.conn.execute(
            "INSERT INTO attribute_values (attribute_id, value, sort_weight)
             VALUES (?1, ?2, ?3);",
            params![option.attribute_id, option.value.as_str(), option.sort_weight],
        )?;
        Ok(Inserted {
            rows,
            id: self.conn.last_insert_rowid(),
        })
    }

    fn find_value_option_by_id(&self, id: ValueId) -> RepoResult<Option<AttributeValueOption>> {
        let option = self
            .conn
            .query_row(
                &format!("{VALUE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_value_row,
            )
            .optional()?;
        Ok(option)
    }

    fn find_all_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<Vec<AttributeValueOption>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VALUE_SELECT_SQL}
             WHERE attribute_id = ?1
             ORDER BY sort_weight ASC, id ASC;"
        ))?;
        let options = stmt
            .query_map([attribute_id], parse_value_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }

    fn count_value_options_by_attribute_id(&self, attribute_id: AttributeId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attribute_values WHERE attribute_id = ?1;",
            [attribute_id],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative value option count `{count}`")))
    }

    fn delete_value_options_by_attribute_id(
        &self,
        attribute_id: AttributeId,
    ) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM attribute_values WHERE attribute_id = ?1;",
            [attribute_id],
        )?;
        Ok(deleted)
    }

    fn find_assignments_by_item_id(
        &self,
        item_id: ItemId,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE item_id = ?1
             ORDER BY attribute_id ASC;"
        ))?;
        let assignments = stmt
            .query_map([item_id], parse_assignment_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    fn find_assignments_by_attribute_id(
        &self,
        attribute_id: AttributeId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<Vec<ItemAttributeAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE attribute_id = ?1
             ORDER BY item_id ASC
             LIMIT ?2 OFFSET ?3;"
        ))?;
        let assignments = stmt
            .query_map(
                params![attribute_id, i64::from(limit), i64::from(offset)],
                parse_assignment_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    fn delete_assignments_by_item_and_attribute_ids(
        &self,
        item_id: ItemId,
        attribute_ids: &[AttributeId],
    ) -> RepoResult<usize> {
        if attribute_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; attribute_ids.len()].join(", ");
        let sql = format!(
            "DELETE FROM item_attributes WHERE item_id = ? AND attribute_id IN ({placeholders});"
        );
        let mut bind_values = Vec::with_capacity(attribute_ids.len() + 1);
        bind_values.push(Value::Integer(item_id));
        bind_values.extend(attribute_ids.iter().map(|id| Value::Integer(*id)));

        let deleted = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(deleted)
    }

    fn batch_insert_assignments(&self, rows: &[ItemAttributeAssignment]) -> RepoResult<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO item_attributes (
                item_id,
                attribute_id,
                value_id,
                input_value,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;

        let mut inserted = 0;
        for row in rows {
            inserted += stmt.execute(params![
                row.item_id,
                row.attribute_id,
                row.value_id,
                row.input_value.as_deref(),
                row.created_at,
            ])?;
        }
        Ok(inserted)
    }
}

/// Normalizes attribute list limit according to catalog contract.
pub fn normalize_attribute_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => ATTRIBUTES_DEFAULT_LIMIT,
        Some(value) if value > ATTRIBUTES_LIMIT_MAX => ATTRIBUTES_LIMIT_MAX,
        Some(value) => value,
    }
}

fn parse_attribute_row(row: &Row<'_>) -> RepoResult<AttributeDefinition> {
    let classification_text: String = row.get("classification")?;
    let classification =
        AttributeClassification::parse(&classification_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid classification `{classification_text}` in attributes.classification"
            ))
        })?;

    let input_kind_text: String = row.get("input_kind")?;
    let input_kind = InputKind::parse(&input_kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid input kind `{input_kind_text}` in attributes.input_kind"
        ))
    })?;

    Ok(AttributeDefinition {
        id: row.get("id")?,
        name: row.get("name")?,
        classification,
        input_kind,
        required: parse_flag(row, "required")?,
        searchable: parse_flag(row, "searchable")?,
        sort_weight: row.get("sort_weight")?,
        visible: parse_flag(row, "visible")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_value_row(row: &Row<'_>) -> rusqlite::Result<AttributeValueOption> {
    Ok(AttributeValueOption {
        id: row.get("id")?,
        attribute_id: row.get("attribute_id")?,
        value: row.get("value")?,
        sort_weight: row.get("sort_weight")?,
    })
}

fn parse_assignment_row(row: &Row<'_>) -> rusqlite::Result<ItemAttributeAssignment> {
    Ok(ItemAttributeAssignment {
        item_id: row.get("item_id")?,
        attribute_id: row.get("attribute_id")?,
        value_id: row.get("value_id")?,
        input_value: row.get("input_value")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_flag(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in attributes.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_catalog_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 3] = [
        (
            "attributes",
            &[
                "id",
                "name",
                "classification",
                "input_kind",
                "required",
                "searchable",
                "sort_weight",
                "visible",
                "created_at",
                "updated_at",
            ],
        ),
        ("attribute_values", &["id", "attribute_id", "value", "sort_weight"]),
        (
            "item_attributes",
            &["item_id", "attribute_id", "value_id", "input_value", "created_at"],
        ),
    ];

    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
