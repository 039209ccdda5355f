use serde::Deserialize;

use super::repo::Theme;
use crate::{error::AppError, mutation::Changes, validation};

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub currency: Option<String>,
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub notifications_enabled: Option<bool>,
}

impl UpdateSettingsRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let mut changes = Changes::new();
        changes
            .set_some("currency", self.currency.as_deref().map(validation::currency).transpose()?)
            .set_some("theme", self.theme)
            .set_some("language", validation::optional_text("language", self.language)?)
            .set_some("notifications_enabled", self.notifications_enabled);
        Ok(changes)
    }
}
