use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::validation::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Regular,
    Lister,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Normal,
    Private,
    Flagged,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,                       // provider subject id
    pub email: String,                    // provider email, never updated
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<Date>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub interests: Vec<String>,
    pub avatar: Option<Vec<u8>>,
    pub avatar_name: Option<String>,
    pub avatar_mime: Option<String>,
    pub status: AccountStatus,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Every personal field is filled in.
    pub fn is_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.first_name)
            && filled(&self.last_name)
            && self.birth_date.is_some()
            && filled(&self.gender)
            && filled(&self.location)
            && !self.interests.is_empty()
    }
}

/// Profile columns after validation.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub location: String,
    pub interests: Vec<String>,
}
