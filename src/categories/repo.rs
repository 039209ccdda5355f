use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{text_field, Record, Table};

pub static CATEGORIES: Table = Table {
    name: "categories",
    label: "Category",
    primary_key: "id",
    owner: Some("user_id"),
    updatable: &["name", "type", "color", "icon"],
    unique: &[],
    decimals: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }
}

text_field!(CategoryType);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub color: String,
    pub icon: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Category {
    const TABLE: &'static Table = &CATEGORIES;
}
