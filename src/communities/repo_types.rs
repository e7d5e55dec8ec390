use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Validated community with its de-duplicated member and property lists.
#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub id: Uuid,
    pub admin_id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<String>,
    pub property_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommunityRow {
    pub id: Uuid,
    pub admin_id: String,
    pub name: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}
