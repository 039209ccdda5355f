use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use super::repo::TransactionType;
use crate::{
    error::AppError,
    mutation::{nullable, Changes},
    store::{date_format, FieldValue},
    validation,
};

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub account_id: i64,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
    #[serde(default, with = "date_format::option")]
    pub date: Option<Date>,
}

impl CreateTransactionRequest {
    pub fn into_columns(self, user_id: i64) -> Result<Vec<(&'static str, FieldValue)>, AppError> {
        let date = self
            .date
            .unwrap_or_else(|| OffsetDateTime::now_utc().date());
        Ok(vec![
            ("user_id", user_id.into()),
            ("account_id", self.account_id.into()),
            ("category_id", self.category_id.into()),
            ("amount", validation::positive("amount", self.amount)?.into()),
            ("type", self.kind.into()),
            (
                "description",
                self.description.unwrap_or_default().trim().to_string().into(),
            ),
            ("date", date.into()),
        ])
    }
}

/// `category_id: null` detaches the category; an absent key leaves it as is.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub account_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub description: Option<String>,
    #[serde(default, with = "date_format::option")]
    pub date: Option<Date>,
}

impl UpdateTransactionRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let amount = self
            .amount
            .map(|a| validation::positive("amount", a))
            .transpose()?;
        let mut changes = Changes::new();
        changes
            .set_some("account_id", self.account_id)
            .set_nullable("category_id", self.category_id)
            .set_some("amount", amount)
            .set_some("type", self.kind)
            .set_some("description", self.description.map(|d| d.trim().to_string()))
            .set_some("date", self.date);
        Ok(changes)
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionFilter {
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
}
