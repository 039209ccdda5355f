//! Sparse partial updates shared by every resource.
//!
//! A handler collects only the fields a client sent into [`Changes`];
//! [`UpdatePlan`] orders them by the table's updatable column list and renders
//! one parameterized `UPDATE`; [`update_record`] runs it and reads the
//! canonical row back.

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::store::{self, FieldValue, Record, RecordStore, Scope, StoreError, Table};

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("no fields provided for update")]
    NoFieldsProvided,
    #[error("field `{0}` cannot be updated")]
    UnknownField(&'static str),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fields a client asked to change, in the order they were set.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, replacing an earlier value for the same column.
    pub fn set(&mut self, column: &'static str, value: impl Into<FieldValue>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|entry| entry.0 == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Sets `column` only when a value was supplied; `None` leaves it unchanged.
    pub fn set_some<T: Into<FieldValue>>(
        &mut self,
        column: &'static str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// For nullable columns: outer `None` is "absent", `Some(None)` writes NULL.
    pub fn set_nullable<T>(&mut self, column: &'static str, value: Option<Option<T>>) -> &mut Self
    where
        Option<T>: Into<FieldValue>,
    {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// A validated update against one table.
#[derive(Debug)]
pub struct UpdatePlan {
    table: &'static Table,
    assignments: Vec<(&'static str, FieldValue)>,
}

impl UpdatePlan {
    pub fn build(table: &'static Table, changes: Changes) -> Result<Self, MutationError> {
        if changes.is_empty() {
            return Err(MutationError::NoFieldsProvided);
        }
        if let Some((column, _)) = changes
            .fields
            .iter()
            .find(|(c, _)| !table.updatable.contains(c))
        {
            return Err(MutationError::UnknownField(*column));
        }

        let mut fields = changes.fields;
        let assignments = table
            .updatable
            .iter()
            .filter_map(|column| {
                let idx = fields.iter().position(|(c, _)| c == column)?;
                Some(fields.swap_remove(idx))
            })
            .collect();

        Ok(Self { table, assignments })
    }

    pub fn table(&self) -> &'static Table {
        self.table
    }

    pub fn assignments(&self) -> &[(&'static str, FieldValue)] {
        &self.assignments
    }

    /// `UPDATE t SET a = $1, b = $2, updated_at = NOW() WHERE pk = $3 [AND owner = $4]`
    pub fn to_sql(&self, scope: Scope) -> (String, Vec<FieldValue>) {
        let mut sets: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", column, i + 1))
            .collect();
        sets.push("updated_at = NOW()".to_string());

        let (predicate, scope_params) = scope.where_clause(self.table, self.assignments.len() + 1);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table.name,
            sets.join(", "),
            predicate
        );

        let mut params: Vec<FieldValue> = self.assignments.iter().map(|(_, v)| v.clone()).collect();
        params.extend(scope_params);
        (sql, params)
    }
}

/// Applies `changes` to the row at `scope` and returns the row as stored afterwards.
pub async fn update_record<R: Record>(
    store: &dyn RecordStore,
    scope: Scope,
    changes: Changes,
) -> Result<R, MutationError> {
    let plan = UpdatePlan::build(R::TABLE, changes)?;
    let not_found = MutationError::NotFound {
        entity: R::TABLE.label,
        id: scope.id,
    };

    let affected = store.update_scoped(&plan, scope).await?;
    if affected == 0 {
        debug!(table = R::TABLE.name, id = scope.id, "update matched no rows");
        return Err(not_found);
    }
    debug!(
        table = R::TABLE.name,
        id = scope.id,
        fields = plan.assignments().len(),
        "record updated"
    );

    store::fetch_record::<R>(store, scope).await?.ok_or(not_found)
}

/// Deserializes a present key (including `null`) as `Some(..)`; pair with
/// `#[serde(default)]` so an absent key stays `None`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
