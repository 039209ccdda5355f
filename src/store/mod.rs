use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};

use crate::mutation::UpdatePlan;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Static description of a table: where records live and which columns a
/// partial update may touch, in the order they are written.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub label: &'static str,
    pub primary_key: &'static str,
    pub owner: Option<&'static str>,
    pub updatable: &'static [&'static str],
    pub unique: &'static [&'static str],
    /// NUMERIC columns. They are read back as text so the stored scale survives.
    pub decimals: &'static [&'static str],
}

/// Identity of a single row, optionally qualified by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub id: i64,
    pub owner: Option<i64>,
}

impl Scope {
    pub fn id(id: i64) -> Self {
        Self { id, owner: None }
    }

    pub fn owned(id: i64, owner: i64) -> Self {
        Self {
            id,
            owner: Some(owner),
        }
    }

    /// Renders `pk = $n [AND owner = $n+1]` with placeholders starting at `first`.
    pub fn where_clause(&self, table: &Table, first: usize) -> (String, Vec<FieldValue>) {
        let mut clause = format!("{} = ${}", table.primary_key, first);
        let mut params = vec![FieldValue::Int(Some(self.id))];
        if let (Some(owner_col), Some(owner)) = (table.owner, self.owner) {
            clause.push_str(&format!(" AND {} = ${}", owner_col, first + 1));
            params.push(FieldValue::Int(Some(owner)));
        }
        (clause, params)
    }
}

/// A typed column value. `None` inside a variant is a typed SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Int(Option<i64>),
    Decimal(Option<Decimal>),
    Bool(Option<bool>),
    Date(Option<Date>),
    Timestamp(Option<OffsetDateTime>),
    Json(Value),
}

impl FieldValue {
    /// JSON form matching how records deserialize their columns.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(v) => v.clone().map(Value::String).unwrap_or(Value::Null),
            FieldValue::Int(v) => v.map(Value::from).unwrap_or(Value::Null),
            FieldValue::Decimal(v) => v
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null),
            FieldValue::Bool(v) => v.map(Value::Bool).unwrap_or(Value::Null),
            FieldValue::Date(v) => v
                .and_then(|d| date_format::format(d).ok())
                .map(Value::String)
                .unwrap_or(Value::Null),
            FieldValue::Timestamp(v) => v
                .and_then(|t| t.format(&Rfc3339).ok())
                .map(Value::String)
                .unwrap_or(Value::Null),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(Some(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(v: Option<String>) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(Some(v))
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(v: Option<i64>) -> Self {
        FieldValue::Int(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        FieldValue::Decimal(Some(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(Some(v))
    }
}

impl From<Date> for FieldValue {
    fn from(v: Date) -> Self {
        FieldValue::Date(Some(v))
    }
}

impl From<Option<Date>> for FieldValue {
    fn from(v: Option<Date>) -> Self {
        FieldValue::Date(v)
    }
}

impl From<OffsetDateTime> for FieldValue {
    fn from(v: OffsetDateTime) -> Self {
        FieldValue::Timestamp(Some(v))
    }
}

impl From<Option<OffsetDateTime>> for FieldValue {
    fn from(v: Option<OffsetDateTime>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Json(v)
    }
}

/// Lets text-backed enums be written as column values through `as_str`.
macro_rules! text_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for $crate::store::FieldValue {
                fn from(v: $ty) -> Self {
                    $crate::store::FieldValue::Text(Some(v.as_str().to_string()))
                }
            }
        )+
    };
}
pub(crate) use text_field;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("row decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage capability shared by the postgres and in-memory backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(
        &self,
        table: &'static Table,
        columns: Vec<(&'static str, FieldValue)>,
    ) -> Result<Row, StoreError>;

    /// Applies `plan` to the row at `scope`, returning the number of rows affected.
    async fn update_scoped(&self, plan: &UpdatePlan, scope: Scope) -> Result<u64, StoreError>;

    async fn find_by_id(&self, table: &'static Table, scope: Scope)
        -> Result<Option<Row>, StoreError>;

    /// Rows owned by `owner`, newest id first.
    async fn find_by_owner(&self, table: &'static Table, owner: i64)
        -> Result<Vec<Row>, StoreError>;

    /// Rows whose `column` equals `value`, newest id first.
    async fn find_by_column(
        &self,
        table: &'static Table,
        column: &'static str,
        value: FieldValue,
    ) -> Result<Vec<Row>, StoreError>;

    async fn delete(&self, table: &'static Table, scope: Scope) -> Result<u64, StoreError>;
}

/// A typed view over rows of one table.
pub trait Record: DeserializeOwned + Send {
    const TABLE: &'static Table;
}

pub fn decode<R: Record>(row: Row) -> Result<R, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub async fn insert_record<R: Record>(
    store: &dyn RecordStore,
    columns: Vec<(&'static str, FieldValue)>,
) -> Result<R, StoreError> {
    let row = store.insert(R::TABLE, columns).await?;
    decode(row)
}

pub async fn fetch_record<R: Record>(
    store: &dyn RecordStore,
    scope: Scope,
) -> Result<Option<R>, StoreError> {
    store
        .find_by_id(R::TABLE, scope)
        .await?
        .map(decode::<R>)
        .transpose()
}

pub async fn list_owned<R: Record>(
    store: &dyn RecordStore,
    owner: i64,
) -> Result<Vec<R>, StoreError> {
    store
        .find_by_owner(R::TABLE, owner)
        .await?
        .into_iter()
        .map(decode::<R>)
        .collect()
}

pub async fn find_records<R: Record>(
    store: &dyn RecordStore,
    column: &'static str,
    value: impl Into<FieldValue>,
) -> Result<Vec<R>, StoreError> {
    store
        .find_by_column(R::TABLE, column, value.into())
        .await?
        .into_iter()
        .map(decode::<R>)
        .collect()
}

/// Returns false when no row matched the scope.
pub async fn delete_record<R: Record>(
    store: &dyn RecordStore,
    scope: Scope,
) -> Result<bool, StoreError> {
    Ok(store.delete(R::TABLE, scope).await? > 0)
}

/// `YYYY-MM-DD` serde format for calendar dates.
pub mod date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn format(date: Date) -> Result<String, time::error::Format> {
        date.format(FORMAT)
    }

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = format(*date).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        Date::parse(&text, FORMAT).map_err(serde::de::Error::custom)
    }

    /// Date flavour of [`crate::mutation::nullable`]: `null` is `Some(None)`.
    pub fn nullable<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<Date>>, D::Error> {
        option::deserialize(deserializer).map(Some)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) => Date::parse(&text, super::FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
