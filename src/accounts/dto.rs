use rust_decimal::Decimal;
use serde::Deserialize;

use super::repo::AccountType;
use crate::{error::AppError, mutation::Changes, store::FieldValue, validation};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountType,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

impl CreateAccountRequest {
    pub fn into_columns(self, user_id: i64) -> Result<Vec<(&'static str, FieldValue)>, AppError> {
        let currency = match self.currency {
            Some(c) => validation::currency(&c)?,
            None => "USD".to_string(),
        };
        Ok(vec![
            ("user_id", user_id.into()),
            ("name", validation::required_text("name", &self.name)?.into()),
            ("type", self.kind.into()),
            ("balance", self.balance.unwrap_or(Decimal::ZERO).into()),
            ("currency", currency.into()),
        ])
    }
}

/// Sparse update. Credit accounts may carry a negative balance, so
/// `balance` is not sign checked.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AccountType>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

impl UpdateAccountRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let mut changes = Changes::new();
        changes
            .set_some("name", validation::optional_text("name", self.name)?)
            .set_some("type", self.kind)
            .set_some("balance", self.balance)
            .set_some("currency", self.currency.as_deref().map(validation::currency).transpose()?);
        Ok(changes)
    }
}
