use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;

use super::{FieldValue, RecordStore, Row, Scope, StoreError, Table};
use crate::mutation::UpdatePlan;

#[derive(Default)]
struct TableData {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

/// Process-local store used by tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, TableData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_json() -> Value {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn matches_scope(table: &Table, scope: Scope, row: &Row) -> bool {
    if row.get(table.primary_key) != Some(&Value::from(scope.id)) {
        return false;
    }
    match (table.owner, scope.owner) {
        (Some(column), Some(owner)) => row.get(column) == Some(&Value::from(owner)),
        _ => true,
    }
}

/// Rejects `candidate` when one of the table's unique columns collides with another row.
fn check_unique(table: &Table, data: &TableData, id: i64, candidate: &Row) -> Result<(), StoreError> {
    for column in table.unique {
        let Some(value) = candidate.get(*column).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = data
            .rows
            .iter()
            .any(|(other, row)| *other != id && row.get(*column) == Some(value));
        if taken {
            return Err(StoreError::Conflict(format!("{}.{}", table.name, column)));
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(
        &self,
        table: &'static Table,
        columns: Vec<(&'static str, FieldValue)>,
    ) -> Result<Row, StoreError> {
        let mut tables = self.tables.write().await;
        let data = tables.entry(table.name).or_default();

        let mut row = Row::new();
        for (column, value) in &columns {
            row.insert((*column).to_string(), value.to_json());
        }

        let id = match row.get(table.primary_key).and_then(Value::as_i64) {
            Some(id) => {
                if data.rows.contains_key(&id) {
                    return Err(StoreError::Conflict(format!(
                        "{}.{}",
                        table.name, table.primary_key
                    )));
                }
                id
            }
            None => {
                let id = data.last_id + 1;
                row.insert(table.primary_key.to_string(), Value::from(id));
                id
            }
        };
        data.last_id = data.last_id.max(id);

        let now = now_json();
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);

        check_unique(table, data, id, &row)?;
        data.rows.insert(id, row.clone());
        debug!(table = table.name, id, "row inserted");
        Ok(row)
    }

    async fn update_scoped(&self, plan: &UpdatePlan, scope: Scope) -> Result<u64, StoreError> {
        let table = plan.table();
        let mut tables = self.tables.write().await;
        let Some(data) = tables.get_mut(table.name) else {
            return Ok(0);
        };
        let Some(current) = data.rows.get(&scope.id).filter(|r| matches_scope(table, scope, r)) else {
            return Ok(0);
        };

        let mut updated = current.clone();
        for (column, value) in plan.assignments() {
            updated.insert((*column).to_string(), value.to_json());
        }
        updated.insert("updated_at".to_string(), now_json());

        check_unique(table, data, scope.id, &updated)?;
        data.rows.insert(scope.id, updated);
        Ok(1)
    }

    async fn find_by_id(
        &self,
        table: &'static Table,
        scope: Scope,
    ) -> Result<Option<Row>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table.name)
            .and_then(|data| data.rows.get(&scope.id))
            .filter(|row| matches_scope(table, scope, row))
            .cloned())
    }

    async fn find_by_owner(
        &self,
        table: &'static Table,
        owner: i64,
    ) -> Result<Vec<Row>, StoreError> {
        let Some(column) = table.owner else {
            return Ok(Vec::new());
        };
        self.find_by_column(table, column, FieldValue::Int(Some(owner)))
            .await
    }

    async fn find_by_column(
        &self,
        table: &'static Table,
        column: &'static str,
        value: FieldValue,
    ) -> Result<Vec<Row>, StoreError> {
        let wanted = value.to_json();
        let tables = self.tables.read().await;
        Ok(tables
            .get(table.name)
            .map(|data| {
                data.rows
                    .values()
                    .rev()
                    .filter(|row| row.get(column) == Some(&wanted))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, table: &'static Table, scope: Scope) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(data) = tables.get_mut(table.name) else {
            return Ok(0);
        };
        let owned = data
            .rows
            .get(&scope.id)
            .is_some_and(|row| matches_scope(table, scope, row));
        if !owned {
            return Ok(0);
        }
        data.rows.remove(&scope.id);
        Ok(1)
    }
}
