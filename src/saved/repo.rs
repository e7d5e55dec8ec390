use serde::Deserialize;
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres, Row};
use uuid::Uuid;

use crate::{
    search::Page,
    validation::{validate_provider_id, validate_uuid, ValidationError},
};

/// Which saved list a request addresses, taken from the `/saved/:kind` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedKind {
    Properties,
    Communities,
    Users,
}

impl SavedKind {
    fn table(self) -> &'static str {
        match self {
            SavedKind::Properties => "saved_properties",
            SavedKind::Communities => "saved_communities",
            SavedKind::Users => "saved_users",
        }
    }

    fn column(self) -> &'static str {
        match self {
            SavedKind::Properties => "property_id",
            SavedKind::Communities => "community_id",
            SavedKind::Users => "saved_user_id",
        }
    }

    fn target_table(self) -> &'static str {
        match self {
            SavedKind::Properties => "properties",
            SavedKind::Communities => "communities",
            SavedKind::Users => "users",
        }
    }

    /// Parses a raw path id into the id type the list stores.
    pub fn target(self, raw: &str) -> Result<SavedTarget, ValidationError> {
        match self {
            SavedKind::Properties => validate_uuid("id", raw).map(SavedTarget::Property),
            SavedKind::Communities => validate_uuid("id", raw).map(SavedTarget::Community),
            SavedKind::Users => {
                validate_provider_id("id", raw)?;
                Ok(SavedTarget::User(raw.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedTarget {
    Property(Uuid),
    Community(Uuid),
    User(String),
}

impl SavedTarget {
    pub fn kind(&self) -> SavedKind {
        match self {
            SavedTarget::Property(_) => SavedKind::Properties,
            SavedTarget::Community(_) => SavedKind::Communities,
            SavedTarget::User(_) => SavedKind::Users,
        }
    }

    fn bind<'q>(
        &'q self,
        q: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SavedTarget::Property(id) | SavedTarget::Community(id) => q.bind(*id),
            SavedTarget::User(id) => q.bind(id.as_str()),
        }
    }
}

pub async fn target_exists(db: &PgPool, target: &SavedTarget) -> sqlx::Result<bool> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        target.kind().target_table()
    );
    let row = target.bind(sqlx::query(&sql)).fetch_one(db).await?;
    row.try_get(0)
}

/// Returns false when the item was already saved.
pub async fn save(db: &PgPool, user_id: &str, target: &SavedTarget) -> sqlx::Result<bool> {
    let kind = target.kind();
    let sql = format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table(),
        kind.column()
    );
    let res = target
        .bind(sqlx::query(&sql).bind(user_id))
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Fails with `RowNotFound` when the item was not saved.
pub async fn remove(db: &PgPool, user_id: &str, target: &SavedTarget) -> sqlx::Result<()> {
    let kind = target.kind();
    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.column()
    );
    let res = target
        .bind(sqlx::query(&sql).bind(user_id))
        .execute(db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn clear(db: &PgPool, kind: SavedKind, user_id: &str) -> sqlx::Result<u64> {
    let sql = format!("DELETE FROM {} WHERE user_id = $1", kind.table());
    let res = sqlx::query(&sql).bind(user_id).execute(db).await?;
    Ok(res.rows_affected())
}

fn list_sql(kind: SavedKind) -> String {
    format!(
        "SELECT {col}::text FROM {table} WHERE user_id = $1 \
         ORDER BY created_at DESC, {col} ASC LIMIT $2 OFFSET $3",
        col = kind.column(),
        table = kind.table()
    )
}

/// Saved ids, newest first.
pub async fn list(
    db: &PgPool,
    kind: SavedKind,
    user_id: &str,
    page: Page,
) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(&list_sql(kind))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(db)
        .await
}
