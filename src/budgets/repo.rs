use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::store::{date_format, text_field, Record, Table};

pub static BUDGETS: Table = Table {
    name: "budgets",
    label: "Budget",
    primary_key: "id",
    owner: Some("user_id"),
    updatable: &["category_id", "amount", "period", "start_date", "end_date"],
    unique: &[],
    decimals: &["amount"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }
}

text_field!(BudgetPeriod);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    #[serde(with = "date_format")]
    pub start_date: Date,
    #[serde(with = "date_format::option")]
    pub end_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Budget {
    const TABLE: &'static Table = &BUDGETS;
}
