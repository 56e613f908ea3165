use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AssistantError, AssistantResult};
use crate::models::{join_list, AnswerValue, Response, StoredRecord};
use crate::schema::{Schema, Variant};

/// Append-only table of completed responses for one questionnaire variant.
/// The connection closes when the store is dropped.
pub struct ResponseStore {
    conn: Connection,
    path: Option<PathBuf>,
    variant: Variant,
}

impl ResponseStore {
    pub fn open(path: &Path, variant: Variant) -> AssistantResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AssistantError::StorageUnavailable(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| {
            AssistantError::StorageUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
            variant,
        };
        store.init()?;
        debug!(path = %path.display(), table = variant.table_name(), "response store opened");
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn schema(&self) -> &'static Schema {
        self.variant.schema()
    }

    fn init(&self) -> AssistantResult<()> {
        let columns: Vec<String> = self
            .schema()
            .fields()
            .iter()
            .map(|f| format!("    {} {}", f.id, f.kind.sql_type()))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n{}\n)",
            self.variant.table_name(),
            columns.join(",\n")
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Stores one response and returns its id. The row is committed before
    /// this returns.
    pub fn append(&self, response: Response) -> AssistantResult<i64> {
        if response.variant() != self.variant {
            return Err(AssistantError::StorageUnavailable(format!(
                "a {} response cannot be stored in the {} table",
                response.variant(),
                self.variant.table_name()
            )));
        }

        let columns: Vec<&str> = self.schema().columns().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.variant.table_name(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let values = column_values(&response, self.schema());
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, params_from_iter(values))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(id, table = self.variant.table_name(), "response stored");
        Ok(id)
    }

    pub fn count(&self) -> AssistantResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.variant.table_name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// All stored rows, oldest first.
    pub fn records(&self) -> AssistantResult<Vec<StoredRecord>> {
        let columns: Vec<&str> = self.schema().columns().collect();
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id",
            columns.join(", "),
            self.variant.table_name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                values.push((name.to_string(), row.get::<_, Value>(idx + 1)?));
            }
            Ok(StoredRecord {
                id: row.get(0)?,
                columns: values,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Closes the connection, surfacing any error instead of dropping it.
    pub fn close(self) -> AssistantResult<()> {
        self.conn.close().map_err(|(_, e)| AssistantError::from(e))
    }
}

#[cfg(test)]
impl ResponseStore {
    pub(crate) fn open_in_memory(variant: Variant) -> AssistantResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
            variant,
        };
        store.init()?;
        Ok(store)
    }
}

/// Positional column values for a response. Missing answers become NULL and
/// lists are joined with the variant's delimiter.
fn column_values(response: &Response, schema: &Schema) -> Vec<Value> {
    let delimiter = schema.variant().delimiter();
    schema
        .fields()
        .iter()
        .map(|field| match response.get(field.id) {
            None => Value::Null,
            Some(AnswerValue::Integer(n)) => Value::Integer(*n),
            Some(AnswerValue::Text(t)) => Value::Text(t.clone()),
            Some(AnswerValue::List(items)) => Value::Text(join_list(items, delimiter)),
        })
        .collect()
}
