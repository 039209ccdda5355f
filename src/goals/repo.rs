use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::store::{date_format, text_field, Record, Table};

pub static GOALS: Table = Table {
    name: "goals",
    label: "Goal",
    primary_key: "id",
    owner: Some("user_id"),
    updatable: &[
        "name",
        "target_amount",
        "current_amount",
        "deadline",
        "category_id",
        "status",
    ],
    unique: &[],
    decimals: &["target_amount", "current_amount"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Cancelled => "cancelled",
        }
    }
}

text_field!(GoalStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    #[serde(with = "date_format::option")]
    pub deadline: Option<Date>,
    pub category_id: Option<i64>,
    pub status: GoalStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Goal {
    const TABLE: &'static Table = &GOALS;
}
