use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use super::repo::GoalStatus;
use crate::{
    error::AppError,
    mutation::{nullable, Changes},
    store::{date_format, FieldValue},
    validation,
};

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Option<Decimal>,
    #[serde(default, with = "date_format::option")]
    pub deadline: Option<Date>,
    pub category_id: Option<i64>,
    pub status: Option<GoalStatus>,
}

impl CreateGoalRequest {
    pub fn into_columns(self, user_id: i64) -> Result<Vec<(&'static str, FieldValue)>, AppError> {
        let current = self.current_amount.unwrap_or(Decimal::ZERO);
        Ok(vec![
            ("user_id", user_id.into()),
            ("name", validation::required_text("name", &self.name)?.into()),
            (
                "target_amount",
                validation::positive("target_amount", self.target_amount)?.into(),
            ),
            (
                "current_amount",
                validation::non_negative("current_amount", current)?.into(),
            ),
            ("deadline", self.deadline.into()),
            ("category_id", self.category_id.into()),
            ("status", self.status.unwrap_or(GoalStatus::Active).into()),
        ])
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoalRequest {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "date_format::nullable")]
    pub deadline: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    pub status: Option<GoalStatus>,
}

impl UpdateGoalRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let target = self
            .target_amount
            .map(|v| validation::positive("target_amount", v))
            .transpose()?;
        let current = self
            .current_amount
            .map(|v| validation::non_negative("current_amount", v))
            .transpose()?;
        let mut changes = Changes::new();
        changes
            .set_some("name", validation::optional_text("name", self.name)?)
            .set_some("target_amount", target)
            .set_some("current_amount", current)
            .set_nullable("deadline", self.deadline)
            .set_nullable("category_id", self.category_id)
            .set_some("status", self.status);
        Ok(changes)
    }
}
