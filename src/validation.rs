//! Request field checks shared by the resource handlers.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::{
    error::AppError,
    store::{Record, RecordStore, Scope},
};

lazy_static! {
    static ref CURRENCY_RE: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();
    static ref COLOR_RE: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

/// Trimmed, non-empty text.
pub fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but only when the field was supplied.
pub fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    value.map(|v| required_text(field, &v)).transpose()
}

pub fn non_negative(field: &str, value: Decimal) -> Result<Decimal, AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation(format!("{} must not be negative", field)));
    }
    Ok(value)
}

pub fn positive(field: &str, value: Decimal) -> Result<Decimal, AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{} must be greater than zero", field)));
    }
    Ok(value)
}

/// ISO 4217 style code, normalized to upper case.
pub fn currency(value: &str) -> Result<String, AppError> {
    let code = value.trim().to_ascii_uppercase();
    if !CURRENCY_RE.is_match(&code) {
        return Err(AppError::Validation(
            "currency must be a three letter code".into(),
        ));
    }
    Ok(code)
}

pub fn hex_color(value: &str) -> Result<String, AppError> {
    let color = value.trim();
    if !COLOR_RE.is_match(color) {
        return Err(AppError::Validation("color must look like #1a2b3c".into()));
    }
    Ok(color.to_ascii_lowercase())
}

/// Fails unless `id` names a row of `R` owned by `owner`.
pub async fn ensure_owned<R: Record>(
    store: &dyn RecordStore,
    field: &str,
    id: i64,
    owner: i64,
) -> Result<(), AppError> {
    match store.find_by_id(R::TABLE, Scope::owned(id, owner)).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Validation(format!(
            "{} {} does not exist",
            field, id
        ))),
    }
}
