use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::services::{ImageView, UploadItem};

/// Which aggregate a set of images belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwner {
    Property(Uuid),
    Community(Uuid),
}

impl ImageOwner {
    fn table(&self) -> &'static str {
        match self {
            ImageOwner::Property(_) => "property_images",
            ImageOwner::Community(_) => "community_images",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ImageOwner::Property(_) => "property_id",
            ImageOwner::Community(_) => "community_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            ImageOwner::Property(id) | ImageOwner::Community(id) => *id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ImageRow {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl From<ImageRow> for ImageView {
    fn from(r: ImageRow) -> Self {
        ImageView::encode(r.file_name, r.mime, &r.data)
    }
}

/// Inserts images in order, positions starting at zero.
pub async fn insert_images_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner: ImageOwner,
    images: &[UploadItem],
) -> sqlx::Result<Vec<Uuid>> {
    let sql = format!(
        "INSERT INTO {} (id, {}, position, file_name, mime, size, data) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        owner.table(),
        owner.column()
    );
    let mut ids = Vec::with_capacity(images.len());
    for (position, img) in images.iter().enumerate() {
        let id = Uuid::new_v4();
        sqlx::query(&sql)
            .bind(id)
            .bind(owner.id())
            .bind(position as i32)
            .bind(&img.file_name)
            .bind(&img.content_type)
            .bind(img.size())
            .bind(img.body.as_ref())
            .execute(&mut **tx)
            .await?;
        ids.push(id);
    }
    Ok(ids)
}

pub async fn delete_images_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner: ImageOwner,
) -> sqlx::Result<u64> {
    let sql = format!("DELETE FROM {} WHERE {} = $1", owner.table(), owner.column());
    let res = sqlx::query(&sql).bind(owner.id()).execute(&mut **tx).await?;
    Ok(res.rows_affected())
}

pub async fn list_images(db: &PgPool, owner: ImageOwner) -> sqlx::Result<Vec<ImageRow>> {
    let sql = format!(
        "SELECT file_name, mime, data FROM {} WHERE {} = $1 ORDER BY position ASC",
        owner.table(),
        owner.column()
    );
    sqlx::query_as::<_, ImageRow>(&sql)
        .bind(owner.id())
        .fetch_all(db)
        .await
}
