use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::repo_types::{NewProperty, PropertyRow};
use crate::{
    images::{delete_images_tx, insert_images_tx, ImageOwner, UploadItem},
    search::{Page, SearchPlan},
};

const PROPERTY_COLUMNS: &str = "id, lister_id, name, description, address1, address2, city, \
     state, zipcode, country, square_feet, bedrooms, toilets, showers, cost_dollars, cost_cents, \
     misc_note, created_at";

/// True when another property already uses the normalized address.
pub async fn address_taken(
    db: &PgPool,
    address_key: &str,
    except: Option<Uuid>,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM properties
            WHERE address_key = $1 AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(address_key)
    .bind(except)
    .fetch_one(db)
    .await
}

/// Inserts the property and its images in one transaction.
pub async fn insert(
    db: &PgPool,
    p: &NewProperty,
    images: &[UploadItem],
) -> sqlx::Result<Vec<Uuid>> {
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO properties (
            id, lister_id, name, description, address1, address2, city, state, zipcode,
            country, address_key, square_feet, bedrooms, toilets, showers, cost_dollars,
            cost_cents, misc_note
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(p.id)
    .bind(&p.lister_id)
    .bind(&p.name)
    .bind(&p.description)
    .bind(&p.address.address1)
    .bind(&p.address.address2)
    .bind(&p.address.city)
    .bind(&p.address.state)
    .bind(&p.address.zipcode)
    .bind(&p.address.country)
    .bind(&p.address_key)
    .bind(p.square_feet)
    .bind(p.bedrooms)
    .bind(p.toilets)
    .bind(p.showers)
    .bind(p.cost_dollars)
    .bind(p.cost_cents)
    .bind(&p.misc_note)
    .execute(&mut *tx)
    .await?;

    let image_ids = insert_images_tx(&mut tx, ImageOwner::Property(p.id), images).await?;
    tx.commit().await?;
    info!(property_id = %p.id, images = image_ids.len(), "property created");
    Ok(image_ids)
}

pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<PropertyRow> {
    sqlx::query_as::<_, PropertyRow>(&format!(
        "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn exists(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM properties WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
}

/// Overwrites every field. When `images` is given the stored images are
/// replaced by it, otherwise they are kept.
pub async fn update(
    db: &PgPool,
    p: &NewProperty,
    images: Option<&[UploadItem]>,
) -> sqlx::Result<()> {
    let mut tx = db.begin().await?;
    let res = sqlx::query(
        r#"
        UPDATE properties
           SET name = $2, description = $3, address1 = $4, address2 = $5, city = $6,
               state = $7, zipcode = $8, country = $9, address_key = $10, square_feet = $11,
               bedrooms = $12, toilets = $13, showers = $14, cost_dollars = $15,
               cost_cents = $16, misc_note = $17
         WHERE id = $1
        "#,
    )
    .bind(p.id)
    .bind(&p.name)
    .bind(&p.description)
    .bind(&p.address.address1)
    .bind(&p.address.address2)
    .bind(&p.address.city)
    .bind(&p.address.state)
    .bind(&p.address.zipcode)
    .bind(&p.address.country)
    .bind(&p.address_key)
    .bind(p.square_feet)
    .bind(p.bedrooms)
    .bind(p.toilets)
    .bind(p.showers)
    .bind(p.cost_dollars)
    .bind(p.cost_cents)
    .bind(&p.misc_note)
    .execute(&mut *tx)
    .await?;
    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    if let Some(images) = images {
        let owner = ImageOwner::Property(p.id);
        delete_images_tx(&mut tx, owner).await?;
        insert_images_tx(&mut tx, owner, images).await?;
    }
    tx.commit().await?;
    info!(property_id = %p.id, "property updated");
    Ok(())
}

/// Deletes the property with its images, community links and saved edges.
pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
    let mut tx = db.begin().await?;
    for sql in [
        "DELETE FROM saved_properties WHERE property_id = $1",
        "DELETE FROM community_properties WHERE property_id = $1",
    ] {
        sqlx::query(sql).bind(id).execute(&mut *tx).await?;
    }
    delete_images_tx(&mut tx, ImageOwner::Property(id)).await?;
    let res = sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    tx.commit().await?;
    info!(property_id = %id, "property deleted");
    Ok(())
}

pub async fn search(db: &PgPool, address: Option<&str>, page: Page) -> sqlx::Result<Vec<Uuid>> {
    SearchPlan::properties(address, page).fetch_ids(db).await
}
