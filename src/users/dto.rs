use serde::Deserialize;

use crate::{
    auth::{
        password::digest_new_password,
        services::normalize_email,
    },
    error::AppError,
    mutation::Changes,
    validation,
};

/// Sparse profile update; absent and `null` fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateMeRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let mut changes = Changes::new();
        changes
            .set_some("name", validation::optional_text("name", self.name)?)
            .set_some("email", self.email.as_deref().map(normalize_email).transpose()?);
        if let Some(password) = self.password {
            changes.set("password_hash", digest_new_password(&password)?);
        }
        Ok(changes)
    }
}
