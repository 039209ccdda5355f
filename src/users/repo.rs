use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{self, Record, RecordStore, StoreError, Table};

pub static USERS: Table = Table {
    name: "users",
    label: "User",
    primary_key: "id",
    owner: None,
    updatable: &["name", "email", "password_hash"],
    unique: &["email"],
    decimals: &[],
};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for User {
    const TABLE: &'static Table = &USERS;
}

impl User {
    pub async fn find_by_email(
        store: &dyn RecordStore,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut found = store::find_records::<User>(store, "email", email).await?;
        Ok(found.pop())
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        store: &dyn RecordStore,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        store::insert_record(
            store,
            vec![
                ("name", name.into()),
                ("email", email.into()),
                ("password_hash", password_hash.into()),
            ],
        )
        .await
    }
}
