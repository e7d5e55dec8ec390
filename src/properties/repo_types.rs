use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::Address;

/// Validated property ready to be written.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub id: Uuid,
    pub lister_id: String,
    pub name: String,
    pub description: String,
    pub address: Address,
    pub address_key: String,
    pub square_feet: i32,
    pub bedrooms: i16,
    pub toilets: i16,
    pub showers: i16,
    pub cost_dollars: i64,
    pub cost_cents: i16,
    pub misc_note: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub lister_id: String,
    pub name: String,
    pub description: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub square_feet: i32,
    pub bedrooms: i16,
    pub toilets: i16,
    pub showers: i16,
    pub cost_dollars: i64,
    pub cost_cents: i16,
    pub misc_note: String,
    pub created_at: OffsetDateTime,
}
