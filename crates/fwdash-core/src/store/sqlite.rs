use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row as _, Sqlite};
use tracing::{debug, error};

use super::{Filter, RecordStore, Row, StoreError, Table};

const SITE_COLUMNS: &[&str] = &["id", "name"];

const DEVICE_COLUMNS: &[&str] = &[
    "id",
    "hostname",
    "site",
    "vendor",
    "type",
    "auth_type",
    "username",
    "secret",
    "salt",
    "token",
    "friendly_name",
    "serial",
    "ha_partner_serial",
];

/// SQLite-backed store.
///
/// The schema lives in `migrations/` and is applied on open. Uniqueness of
/// `id`, site `name` and device `hostname` is enforced by the database and
/// surfaces as [`StoreError::Constraint`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;

        debug!(path = %path.display(), "opened SQLite store");
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ── Query helpers ───────────────────────────────────────────────────

fn columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Sites => SITE_COLUMNS,
        Table::Devices => DEVICE_COLUMNS,
    }
}

/// Only whitelisted names ever reach the SQL text.
fn column(table: Table, name: &str) -> Result<&'static str, StoreError> {
    columns(table)
        .iter()
        .copied()
        .find(|c| *c == name)
        .ok_or_else(|| StoreError::UnknownColumn {
            table,
            column: name.to_owned(),
        })
}

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

fn bindable(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn push_where(
    query: &mut QueryBuilder<'_, Sqlite>,
    table: Table,
    filter: &Filter,
) -> Result<(), StoreError> {
    let field = column(table, &filter.field)?;
    query
        .push(" WHERE ")
        .push(quoted(field))
        .push(" = ")
        .push_bind(bindable(&filter.value));
    Ok(())
}

fn decode(table: Table, row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for name in columns(table) {
        let value: Option<String> = row
            .try_get(*name)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        out.insert((*name).to_owned(), value.map_or(Value::Null, Value::String));
    }
    Ok(out)
}

fn db_error(table: Table, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if !matches!(db.kind(), ErrorKind::Other) => {
            StoreError::Constraint {
                table,
                message: db.message().to_owned(),
            }
        }
        other => {
            error!(%table, error = %other, "SQLite call failed");
            StoreError::Unavailable(other.to_string())
        }
    }
}

fn no_match(table: Table, filter: &Filter) -> StoreError {
    StoreError::NoMatch {
        table,
        filter: filter.to_string(),
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn read(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Row>, StoreError> {
        debug!(%table, ?filter, "sqlite read");
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        {
            let mut select = query.separated(", ");
            for name in columns(table) {
                select.push(quoted(name));
            }
        }
        query.push(" FROM ").push(table.as_ref());
        if let Some(filter) = filter {
            push_where(&mut query, table, filter)?;
        }
        query.push(" ORDER BY rowid");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(table, e))?;
        rows.iter().map(|row| decode(table, row)).collect()
    }

    async fn add(&self, table: Table, row: Row) -> Result<(), StoreError> {
        debug!(%table, "sqlite insert");
        let mut names = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (name, value) in &row {
            names.push(column(table, name)?);
            values.push(bindable(value));
        }

        let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        query.push(table.as_ref()).push(" (");
        {
            let mut cols = query.separated(", ");
            for name in &names {
                cols.push(quoted(name));
            }
        }
        query.push(") VALUES (");
        {
            let mut binds = query.separated(", ");
            for value in values {
                binds.push_bind(value);
            }
        }
        query.push(")");

        query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(table, e))?;
        Ok(())
    }

    async fn update(&self, table: Table, filter: &Filter, body: Row) -> Result<(), StoreError> {
        debug!(%table, %filter, "sqlite update");
        if body.is_empty() {
            return if self.read(table, Some(filter)).await?.is_empty() {
                Err(no_match(table, filter))
            } else {
                Ok(())
            };
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE ");
        query.push(table.as_ref()).push(" SET ");
        {
            let mut sets = query.separated(", ");
            for (name, value) in &body {
                let name = column(table, name)?;
                sets.push(quoted(name))
                    .push_unseparated(" = ")
                    .push_bind_unseparated(bindable(value));
            }
        }
        push_where(&mut query, table, filter)?;

        let done = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(table, e))?;
        if done.rows_affected() == 0 {
            return Err(no_match(table, filter));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), StoreError> {
        debug!(%table, %filter, "sqlite delete");
        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM ");
        query.push(table.as_ref());
        push_where(&mut query, table, filter)?;

        let done = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(table, e))?;
        if done.rows_affected() == 0 {
            return Err(no_match(table, filter));
        }
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT COUNT(*) FROM sites")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn device(id: &str, hostname: &str, vendor: &str) -> Row {
        row(json!({
            "id": id,
            "hostname": hostname,
            "site": "s1",
            "vendor": vendor,
            "secret": "c2VjcmV0",
            "salt": "c2FsdA==",
            "serial": null
        }))
    }

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("fwdash.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fwdash.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store
            .add(Table::Sites, row(json!({"id": "s1", "name": "HQ"})))
            .await
            .unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        let sites = reopened.read(Table::Sites, None).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0]["name"], "HQ");
    }

    #[tokio::test]
    async fn read_filters_and_keeps_insertion_order() {
        let (_dir, store) = store().await;
        store.add(Table::Devices, device("c", "fw-c", "paloalto")).await.unwrap();
        store.add(Table::Devices, device("a", "fw-a", "junos")).await.unwrap();
        store.add(Table::Devices, device("b", "fw-b", "paloalto")).await.unwrap();

        let pa = store
            .read(Table::Devices, Some(&Filter::eq("vendor", "paloalto")))
            .await
            .unwrap();
        let ids: Vec<_> = pa.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("c"), json!("b")]);
        assert_eq!(pa[0]["serial"], Value::Null);
        assert_eq!(pa[0]["type"], Value::Null);
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let (_dir, store) = store().await;
        store
            .add(Table::Sites, row(json!({"id": "s1", "name": "HQ"})))
            .await
            .unwrap();

        let dup_id = store
            .add(Table::Sites, row(json!({"id": "s1", "name": "Branch"})))
            .await
            .unwrap_err();
        assert!(matches!(dup_id, StoreError::Constraint { .. }));

        let dup_name = store
            .add(Table::Sites, row(json!({"id": "s2", "name": "HQ"})))
            .await
            .unwrap_err();
        assert!(matches!(dup_name, StoreError::Constraint { .. }));

        store.add(Table::Devices, device("d1", "fw1", "paloalto")).await.unwrap();
        let dup_host = store
            .add(Table::Devices, device("d2", "fw1", "paloalto"))
            .await
            .unwrap_err();
        assert!(matches!(dup_host, StoreError::Constraint { .. }));
        assert_eq!(store.read(Table::Devices, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_and_reports_no_match() {
        let (_dir, store) = store().await;
        store.add(Table::Devices, device("d1", "fw1", "paloalto")).await.unwrap();

        store
            .update(
                Table::Devices,
                &Filter::id("d1"),
                row(json!({"serial": "0001", "ha_partner_serial": "0002"})),
            )
            .await
            .unwrap();
        let rows = store.read(Table::Devices, Some(&Filter::id("d1"))).await.unwrap();
        assert_eq!(rows[0]["serial"], "0001");
        assert_eq!(rows[0]["hostname"], "fw1");

        assert!(matches!(
            store
                .update(Table::Devices, &Filter::id("zz"), row(json!({"serial": "x"})))
                .await,
            Err(StoreError::NoMatch { .. })
        ));
        assert!(matches!(
            store.update(Table::Devices, &Filter::id("zz"), Row::new()).await,
            Err(StoreError::NoMatch { .. })
        ));
    }

    #[tokio::test]
    async fn delete_reports_no_match() {
        let (_dir, store) = store().await;
        store
            .add(Table::Sites, row(json!({"id": "s1", "name": "HQ"})))
            .await
            .unwrap();

        assert!(matches!(
            store.delete(Table::Sites, &Filter::id("zz")).await,
            Err(StoreError::NoMatch { .. })
        ));
        store.delete(Table::Sites, &Filter::id("s1")).await.unwrap();
        assert!(store.read(Table::Sites, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_column_never_reaches_sql() {
        let (_dir, store) = store().await;
        let err = store
            .read(Table::Sites, Some(&Filter::eq("name; DROP TABLE sites", "x")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));
        assert!(store.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn closed_pool_fails_connection_test() {
        let (_dir, store) = store().await;
        store.close().await;
        assert!(matches!(
            store.test_connection().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
