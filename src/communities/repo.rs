use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::repo_types::{CommunityRow, NewCommunity};
use crate::{
    images::{delete_images_tx, insert_images_tx, ImageOwner, UploadItem},
    search::{Page, SearchPlan},
};

/// Creates the community with its members, property links and images in
/// one transaction.
pub async fn insert(
    db: &PgPool,
    c: &NewCommunity,
    images: &[UploadItem],
) -> sqlx::Result<Vec<Uuid>> {
    let mut tx = db.begin().await?;
    sqlx::query(
        "INSERT INTO communities (id, admin_id, name, description) VALUES ($1, $2, $3, $4)",
    )
    .bind(c.id)
    .bind(&c.admin_id)
    .bind(&c.name)
    .bind(&c.description)
    .execute(&mut *tx)
    .await?;

    for user_id in &c.members {
        sqlx::query("INSERT INTO community_users (community_id, user_id) VALUES ($1, $2)")
            .bind(c.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    for property_id in &c.property_ids {
        sqlx::query(
            "INSERT INTO community_properties (community_id, property_id) VALUES ($1, $2)",
        )
        .bind(c.id)
        .bind(property_id)
        .execute(&mut *tx)
        .await?;
    }

    let image_ids = insert_images_tx(&mut tx, ImageOwner::Community(c.id), images).await?;
    tx.commit().await?;
    info!(
        community_id = %c.id,
        members = c.members.len(),
        properties = c.property_ids.len(),
        "community created"
    );
    Ok(image_ids)
}

pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<CommunityRow> {
    sqlx::query_as::<_, CommunityRow>(
        "SELECT id, admin_id, name, description, created_at FROM communities WHERE id = $1",
    )
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn members(db: &PgPool, id: Uuid) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM community_users WHERE community_id = $1 ORDER BY joined_at, user_id",
    )
    .bind(id)
    .fetch_all(db)
    .await
}

pub async fn property_ids(db: &PgPool, id: Uuid) -> sqlx::Result<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT property_id FROM community_properties WHERE community_id = $1 \
         ORDER BY linked_at, property_id",
    )
    .bind(id)
    .fetch_all(db)
    .await
}

/// Returns false when the user already was a member.
pub async fn add_member(db: &PgPool, id: Uuid, user_id: &str) -> sqlx::Result<bool> {
    let res = sqlx::query(
        "INSERT INTO community_users (community_id, user_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Fails with `RowNotFound` when the user is not a member.
pub async fn remove_member(db: &PgPool, id: Uuid, user_id: &str) -> sqlx::Result<()> {
    let res = sqlx::query("DELETE FROM community_users WHERE community_id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn link_property(db: &PgPool, id: Uuid, property_id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(
        "INSERT INTO community_properties (community_id, property_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(property_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Deletes the community with its memberships, links, images and saved edges.
pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
    let mut tx = db.begin().await?;
    for sql in [
        "DELETE FROM saved_communities WHERE community_id = $1",
        "DELETE FROM community_users WHERE community_id = $1",
        "DELETE FROM community_properties WHERE community_id = $1",
    ] {
        sqlx::query(sql).bind(id).execute(&mut *tx).await?;
    }
    delete_images_tx(&mut tx, ImageOwner::Community(id)).await?;
    let res = sqlx::query("DELETE FROM communities WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    tx.commit().await?;
    info!(community_id = %id, "community deleted");
    Ok(())
}

pub async fn search(
    db: &PgPool,
    name: Option<&str>,
    description: Option<&str>,
    page: Page,
) -> sqlx::Result<Vec<Uuid>> {
    SearchPlan::communities(name, description, page)
        .fetch_ids(db)
        .await
}
