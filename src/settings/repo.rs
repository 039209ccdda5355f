use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tracing::info;

use crate::store::{self, text_field, Record, RecordStore, Scope, StoreError, Table};

pub static SETTINGS: Table = Table {
    name: "settings",
    label: "Settings",
    primary_key: "user_id",
    owner: None,
    updatable: &["currency", "theme", "language", "notifications_enabled"],
    unique: &[],
    decimals: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

text_field!(Theme);

/// Per-user preferences, keyed by the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: i64,
    pub currency: String,
    pub theme: Theme,
    pub language: String,
    pub notifications_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Settings {
    const TABLE: &'static Table = &SETTINGS;
}

impl Settings {
    pub async fn create_default(
        store: &dyn RecordStore,
        user_id: i64,
    ) -> Result<Settings, StoreError> {
        store::insert_record(
            store,
            vec![
                ("user_id", user_id.into()),
                ("currency", "USD".into()),
                ("theme", Theme::System.into()),
                ("language", "en".into()),
                ("notifications_enabled", true.into()),
            ],
        )
        .await
    }

    /// The user's row, inserting the defaults when it does not exist yet.
    pub async fn fetch_or_create(
        store: &dyn RecordStore,
        user_id: i64,
    ) -> Result<Settings, StoreError> {
        if let Some(settings) = store::fetch_record::<Settings>(store, Scope::id(user_id)).await? {
            return Ok(settings);
        }
        info!(user_id, "creating default settings");
        match Settings::create_default(store, user_id).await {
            // Another request inserted the row first.
            Err(StoreError::Conflict(constraint)) => {
                store::fetch_record::<Settings>(store, Scope::id(user_id))
                    .await?
                    .ok_or(StoreError::Conflict(constraint))
            }
            other => other,
        }
    }
}
