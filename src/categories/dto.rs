use serde::Deserialize;

use super::repo::CategoryType;
use crate::{error::AppError, mutation::Changes, store::FieldValue, validation};

const DEFAULT_COLOR: &str = "#6b7280";
const DEFAULT_ICON: &str = "tag";

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl CreateCategoryRequest {
    pub fn into_columns(self, user_id: i64) -> Result<Vec<(&'static str, FieldValue)>, AppError> {
        let color = match self.color {
            Some(c) => validation::hex_color(&c)?,
            None => DEFAULT_COLOR.to_string(),
        };
        let icon = validation::optional_text("icon", self.icon)?
            .unwrap_or_else(|| DEFAULT_ICON.to_string());
        Ok(vec![
            ("user_id", user_id.into()),
            ("name", validation::required_text("name", &self.name)?.into()),
            ("type", self.kind.into()),
            ("color", color.into()),
            ("icon", icon.into()),
        ])
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryType>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl UpdateCategoryRequest {
    pub fn into_changes(self) -> Result<Changes, AppError> {
        let mut changes = Changes::new();
        changes
            .set_some("name", validation::optional_text("name", self.name)?)
            .set_some("type", self.kind)
            .set_some("color", self.color.as_deref().map(validation::hex_color).transpose()?)
            .set_some("icon", validation::optional_text("icon", self.icon)?);
        Ok(changes)
    }
}
