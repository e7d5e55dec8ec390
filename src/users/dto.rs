use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{AccountStatus, Role, User};
use crate::{
    error::AppError,
    images::ImageView,
    search::Page,
    validation::format_date,
};

/// Full profile sent with `PUT /users/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// The caller's own profile, every field included.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub interests: Vec<String>,
    pub avatar: Option<ImageView>,
    pub role: Role,
    pub status: AccountStatus,
    pub complete: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MeResponse {
    pub fn new(user: User, role: Role) -> Self {
        let complete = user.is_complete();
        Self {
            avatar: avatar_view(&user),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            birth_date: user.birth_date.map(format_date),
            gender: user.gender,
            location: user.location,
            interests: user.interests,
            role,
            status: user.status,
            complete,
            created_at: user.created_at,
        }
    }
}

/// What other users may see. Non-normal accounts are replaced by a
/// placeholder that carries only the id.
#[derive(Debug, Serialize, PartialEq)]
pub struct PublicProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub interests: Vec<String>,
    pub avatar: Option<ImageView>,
    pub anonymized: bool,
}

impl PublicProfile {
    pub fn anonymous(id: String) -> Self {
        Self {
            id,
            first_name: "Anonymous".into(),
            last_name: "User".into(),
            gender: None,
            location: None,
            interests: Vec::new(),
            avatar: None,
            anonymized: true,
        }
    }
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        if user.status != AccountStatus::Normal {
            return PublicProfile::anonymous(user.id);
        }
        Self {
            avatar: avatar_view(&user),
            id: user.id,
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            gender: user.gender,
            location: user.location,
            interests: user.interests,
            anonymized: false,
        }
    }
}

fn avatar_view(user: &User) -> Option<ImageView> {
    let data = user.avatar.as_ref()?;
    Some(ImageView::encode(
        user.avatar_name.clone().unwrap_or_else(|| "avatar".into()),
        user.avatar_mime
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into()),
        data,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserListQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListerQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub name: Option<String>,
}

impl ListerQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: AccountStatus,
}
