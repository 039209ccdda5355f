use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
    PgPool, Postgres, Row as _,
};
use tracing::debug;

use super::{FieldValue, RecordStore, Row, Scope, StoreError, Table};
use crate::mutation::UpdatePlan;

/// Relational backend. Every row is read back as a JSON object (see
/// [`row_json`]) so both backends hand the same shape to record decoding.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Text(v) => query.bind(v),
        FieldValue::Int(v) => query.bind(v),
        FieldValue::Decimal(v) => query.bind(v),
        FieldValue::Bool(v) => query.bind(v),
        FieldValue::Date(v) => query.bind(v),
        FieldValue::Timestamp(v) => query.bind(v),
        FieldValue::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

fn bind_all<'q>(sql: &'q str, params: Vec<FieldValue>) -> Query<'q, Postgres, PgArguments> {
    params
        .into_iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or("unique").to_string();
            return StoreError::Conflict(constraint);
        }
    }
    StoreError::Database(err)
}

/// JSON object for the row aliased `alias`. `to_jsonb` hands NUMERIC out as
/// JSON numbers, which lose their scale once parsed, so decimal columns are
/// overlaid as text.
fn row_json(table: &Table, alias: &str) -> String {
    if table.decimals.is_empty() {
        return format!("to_jsonb({})", alias);
    }
    let pairs: Vec<String> = table
        .decimals
        .iter()
        .map(|column| format!("'{column}', {alias}.{column}::text"))
        .collect();
    format!(
        "(to_jsonb({alias}) || jsonb_build_object({}))",
        pairs.join(", ")
    )
}

fn select_sql(table: &Table, predicate: &str, order: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} t WHERE {}",
        row_json(table, "t"),
        table.name,
        predicate
    );
    if order {
        sql.push_str(&format!(" ORDER BY t.{} DESC", table.primary_key));
    }
    sql
}

fn row_object(row: &PgRow) -> Result<Row, StoreError> {
    match row.try_get::<Value, _>(0)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(serde::de::Error::custom(format!(
            "expected a JSON object row, got {}",
            other
        )))),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert(
        &self,
        table: &'static Table,
        columns: Vec<(&'static str, FieldValue)>,
    ) -> Result<Row, StoreError> {
        let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "WITH inserted AS (INSERT INTO {} ({}) VALUES ({}) RETURNING *) \
             SELECT {} FROM inserted",
            table.name,
            names.join(", "),
            placeholders.join(", "),
            row_json(table, "inserted")
        );
        let params = columns.into_iter().map(|(_, v)| v).collect();

        let row = bind_all(&sql, params)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
        debug!(table = table.name, "row inserted");
        row_object(&row)
    }

    async fn update_scoped(&self, plan: &UpdatePlan, scope: Scope) -> Result<u64, StoreError> {
        let (sql, params) = plan.to_sql(scope);
        let result = bind_all(&sql, params)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(
        &self,
        table: &'static Table,
        scope: Scope,
    ) -> Result<Option<Row>, StoreError> {
        let (predicate, params) = scope.where_clause(table, 1);
        let sql = select_sql(table, &predicate, false);
        let row = bind_all(&sql, params)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(row_object).transpose()
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
        let sql = select_sql(table, &format!("t.{} = $1", column), true);
        let rows = bind_all(&sql, vec![value])
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        rows.iter().map(row_object).collect()
    }

    async fn delete(&self, table: &'static Table, scope: Scope) -> Result<u64, StoreError> {
        let (predicate, params) = scope.where_clause(table, 1);
        let sql = format!("DELETE FROM {} WHERE {}", table.name, predicate);
        let result = bind_all(&sql, params)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected())
    }
}
