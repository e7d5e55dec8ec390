use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::CommunityRow;
use crate::{error::AppError, images::ImageView, search::Page};

/// Body of `POST /communities`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommunityPayload {
    pub admin_id: String,
    pub name: String,
    pub description: String,
    pub user_ids: Vec<String>,
    pub property_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddMember {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkProperty {
    pub property_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CommunityView {
    pub id: Uuid,
    pub admin_id: String,
    pub name: String,
    pub description: String,
    pub user_ids: Vec<String>,
    pub property_ids: Vec<Uuid>,
    pub images: Vec<ImageView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl CommunityView {
    pub fn new(
        row: CommunityRow,
        user_ids: Vec<String>,
        property_ids: Vec<Uuid>,
        images: Vec<ImageView>,
    ) -> Self {
        Self {
            id: row.id,
            admin_id: row.admin_id,
            name: row.name,
            description: row.description,
            user_ids,
            property_ids,
            images,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedCommunity {
    pub id: Uuid,
    pub image_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommunityListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CommunityListQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_lists_default_to_empty() {
        let p: CommunityPayload =
            serde_json::from_str(r#"{"admin_id":"109237874690123","name":"Lakeside"}"#).unwrap();
        assert!(p.user_ids.is_empty());
        assert!(p.property_ids.is_empty());
        assert_eq!(p.description, "");
    }

    #[test]
    fn link_property_requires_uuid() {
        assert!(serde_json::from_str::<LinkProperty>(r#"{"property_id":"x"}"#).is_err());
        let id = Uuid::new_v4();
        let l: LinkProperty =
            serde_json::from_value(serde_json::json!({ "property_id": id })).unwrap();
        assert_eq!(l.property_id, id);
    }
}
