// ── Record store ──
//
// The registries persist through a narrow table interface: read (optionally
// filtered on one field), add, update, delete. Rows are named-field JSON
// objects, never positional tuples.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One record: column name to value.
pub type Row = serde_json::Map<String, Value>;

/// The two tables the registries use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Table {
    Sites,
    Devices,
}

/// Equality match on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Shorthand for the primary-key filter.
    pub fn id(id: impl ToString) -> Self {
        Self::eq("id", id.to_string())
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.field) == Some(&self.value)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.field, self.value)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {table} row matches {filter}")]
    NoMatch { table: Table, filter: String },

    #[error("constraint violation in {table}: {message}")]
    Constraint { table: Table, message: String },

    #[error("unknown column {column} in {table}")]
    UnknownColumn { table: Table, column: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence seam used by both registries.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows in insertion order, optionally restricted by `filter`.
    async fn read(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Row>, StoreError>;

    async fn add(&self, table: Table, row: Row) -> Result<(), StoreError>;

    /// Merge `body` into every row matching `filter`.
    async fn update(&self, table: Table, filter: &Filter, body: Row) -> Result<(), StoreError>;

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), StoreError>;

    async fn test_connection(&self) -> Result<(), StoreError>;
}

// ── In-memory table state ──────────────────────────────────────────────

/// Table contents held by [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    sites: Vec<Row>,
    devices: Vec<Row>,
}

impl Tables {
    fn rows(&self, table: Table) -> &Vec<Row> {
        match table {
            Table::Sites => &self.sites,
            Table::Devices => &self.devices,
        }
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        match table {
            Table::Sites => &mut self.sites,
            Table::Devices => &mut self.devices,
        }
    }

    pub(crate) fn select(&self, table: Table, filter: Option<&Filter>) -> Vec<Row> {
        self.rows(table)
            .iter()
            .filter(|row| filter.is_none_or(|f| f.matches(row)))
            .cloned()
            .collect()
    }

    pub(crate) fn insert(&mut self, table: Table, row: Row) -> Result<(), StoreError> {
        if let Some(id) = row.get("id") {
            if self.rows(table).iter().any(|r| r.get("id") == Some(id)) {
                return Err(StoreError::Constraint {
                    table,
                    message: format!("duplicate id {id}"),
                });
            }
        }
        self.rows_mut(table).push(row);
        Ok(())
    }

    pub(crate) fn merge(&mut self, table: Table, filter: &Filter, body: &Row) -> Result<(), StoreError> {
        let mut matched = 0usize;
        for row in self.rows_mut(table).iter_mut().filter(|r| filter.matches(r)) {
            for (key, value) in body {
                row.insert(key.clone(), value.clone());
            }
            matched += 1;
        }
        if matched == 0 {
            return Err(StoreError::NoMatch {
                table,
                filter: filter.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, table: Table, filter: &Filter) -> Result<(), StoreError> {
        let rows = self.rows_mut(table);
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        if rows.len() == before {
            return Err(StoreError::NoMatch {
                table,
                filter: filter.to_string(),
            });
        }
        Ok(())
    }
}
