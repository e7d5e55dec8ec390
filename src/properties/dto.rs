use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::PropertyRow;
use crate::{error::AppError, images::ImageView, search::Page};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
}

/// Body of `POST /properties` and `PUT /properties/:id`. Missing fields fall
/// back to empty/zero so validation can name the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PropertyPayload {
    pub name: String,
    pub description: String,
    pub address: Address,
    pub square_feet: i64,
    pub bedrooms: i64,
    pub toilets: i64,
    pub showers: i64,
    pub cost_dollars: i64,
    pub cost_cents: i64,
    pub misc_note: String,
}

#[derive(Debug, Serialize)]
pub struct PropertyView {
    pub id: Uuid,
    pub lister_id: String,
    pub name: String,
    pub description: String,
    pub address: Address,
    pub square_feet: i32,
    pub bedrooms: i16,
    pub toilets: i16,
    pub showers: i16,
    pub cost_dollars: i64,
    pub cost_cents: i16,
    pub misc_note: String,
    pub images: Vec<ImageView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PropertyView {
    pub fn new(row: PropertyRow, images: Vec<ImageView>) -> Self {
        Self {
            id: row.id,
            lister_id: row.lister_id,
            name: row.name,
            description: row.description,
            address: Address {
                address1: row.address1,
                address2: row.address2,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
                country: row.country,
            },
            square_feet: row.square_feet,
            bedrooms: row.bedrooms,
            toilets: row.toilets,
            showers: row.showers,
            cost_dollars: row.cost_dollars,
            cost_cents: row.cost_cents,
            misc_note: row.misc_note,
            images,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedProperty {
    pub id: Uuid,
    pub image_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PropertyListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub address: Option<String>,
}

impl PropertyListQuery {
    pub fn page(&self) -> Result<Page, AppError> {
        Page::new(self.page, self.limit)
    }
}
