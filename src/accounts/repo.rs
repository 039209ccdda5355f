use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{text_field, Record, Table};

pub static ACCOUNTS: Table = Table {
    name: "accounts",
    label: "Account",
    primary_key: "id",
    owner: Some("user_id"),
    updatable: &["name", "type", "balance", "currency"],
    unique: &[],
    decimals: &["balance"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
    Cash,
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
            AccountType::Cash => "cash",
            AccountType::Investment => "investment",
        }
    }
}

text_field!(AccountType);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountType,
    pub balance: Decimal,
    pub currency: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Account {
    const TABLE: &'static Table = &ACCOUNTS;
}
