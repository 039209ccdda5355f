use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use super::repo::BudgetPeriod;
use crate::{
    error::AppError,
    mutation::Changes,
    store::{date_format, FieldValue},
    validation,
};

#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub category_id: i64,
    pub amount: Decimal,
    pub period: Option<BudgetPeriod>,
    #[serde(with = "date_format")]
    pub start_date: Date,
    #[serde(default, with = "date_format::option")]
    pub end_date: Option<Date>,
}

pub fn check_range(start: Date, end: Option<Date>) -> Result<(), AppError> {
    match end {
        Some(end) if end < start => Err(AppError::Validation(
            "end_date must not be before start_date".into(),
        )),
        _ => Ok(()),
    }
}

impl CreateBudgetRequest {
    pub fn into_columns(self, user_id: i64) -> Result<Vec<(&'static str, FieldValue)>, AppError> {
        check_range(self.start_date, self.end_date)?;
        Ok(vec![
            ("user_id", user_id.into()),
            ("category_id", self.category_id.into()),
            ("amount", validation::positive("amount", self.amount)?.into()),
            ("period", self.period.unwrap_or(BudgetPeriod::Monthly).into()),
            ("start_date", self.start_date.into()),
            ("end_date", self.end_date.into()),
        ])
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBudgetRequest {
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub period: Option<BudgetPeriod>,
    #[serde(default, with = "date_format::option")]
    pub start_date: Option<Date>,
    #[serde(default, deserialize_with = "date_format::nullable")]
    pub end_date: Option<Option<Date>>,
}

impl UpdateBudgetRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let amount = self
            .amount
            .map(|a| validation::positive("amount", a))
            .transpose()?;
        let mut changes = Changes::new();
        changes
            .set_some("category_id", self.category_id)
            .set_some("amount", amount)
            .set_some("period", self.period)
            .set_some("start_date", self.start_date)
            .set_nullable("end_date", self.end_date);
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn period_defaults_to_monthly() {
        let req: CreateBudgetRequest = serde_json::from_str(
            r#"{"category_id":4,"amount":"300","start_date":"2024-01-01"}"#,
        )
        .unwrap();
        let columns = req.into_columns(1).unwrap();
        let period = columns.iter().find(|(c, _)| *c == "period").map(|(_, v)| v);
        assert_eq!(period, Some(&FieldValue::from("monthly")));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let req: CreateBudgetRequest = serde_json::from_str(
            r#"{"category_id":4,"amount":"300","start_date":"2024-02-01","end_date":"2024-01-31"}"#,
        )
        .unwrap();
        assert!(req.into_columns(1).is_err());
    }

    #[test]
    fn end_date_null_clears_and_absent_keeps() {
        let req: UpdateBudgetRequest = serde_json::from_str(r#"{"end_date":null}"#).unwrap();
        assert_eq!(req.end_date, Some(None));
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.get("end_date"), Some(&FieldValue::Date(None)));

        let req: UpdateBudgetRequest =
            serde_json::from_str(r#"{"end_date":"2024-12-31"}"#).unwrap();
        assert_eq!(req.end_date, Some(Some(date!(2024 - 12 - 31))));

        let req: UpdateBudgetRequest = serde_json::from_str(r#"{"amount":"5"}"#).unwrap();
        assert!(req.end_date.is_none());
    }
}
