use sqlx::PgPool;
use tracing::info;

use super::repo_types::{AccountStatus, ProfileChanges, Role, User};
use crate::{
    images::UploadItem,
    search::{Page, SearchPlan},
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, birth_date, gender, location, \
     interests, avatar, avatar_name, avatar_mime, status, created_at";

impl User {
    /// Fails with `RowNotFound` when the user does not exist.
    pub async fn find(db: &PgPool, id: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_one(db)
            .await
    }

    pub async fn find_optional(db: &PgPool, id: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn exists(db: &PgPool, id: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    /// Creates the user together with its default role row.
    pub async fn create(db: &PgPool, id: &str, email: &str) -> sqlx::Result<User> {
        let mut tx = db.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(Role::Regular)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(user_id = %id, "user created");
        Ok(user)
    }

    /// Overwrites the personal fields. The avatar is left untouched when
    /// `avatar` is `None`.
    pub async fn update_profile(
        db: &PgPool,
        id: &str,
        changes: &ProfileChanges,
        avatar: Option<&UploadItem>,
    ) -> sqlx::Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET first_name = $2,
                   last_name = $3,
                   birth_date = $4,
                   gender = $5,
                   location = $6,
                   interests = $7,
                   avatar = COALESCE($8, avatar),
                   avatar_name = COALESCE($9, avatar_name),
                   avatar_mime = COALESCE($10, avatar_mime),
                   avatar_size = COALESCE($11, avatar_size)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(changes.birth_date)
        .bind(changes.gender.as_str())
        .bind(&changes.location)
        .bind(&changes.interests)
        .bind(avatar.map(|a| a.body.to_vec()))
        .bind(avatar.map(|a| a.file_name.clone()))
        .bind(avatar.map(|a| a.content_type.clone()))
        .bind(avatar.map(UploadItem::size))
        .execute(db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Removes the user and everything it owns in one transaction: saved
    /// edges in both directions, memberships, owned communities, owned
    /// properties, the role row and finally the user row.
    pub async fn delete_cascade(db: &PgPool, id: &str) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;
        for sql in [
            "DELETE FROM saved_properties WHERE user_id = $1",
            "DELETE FROM saved_communities WHERE user_id = $1",
            "DELETE FROM saved_users WHERE user_id = $1 OR saved_user_id = $1",
            "DELETE FROM community_users WHERE user_id = $1",
            "DELETE FROM communities WHERE admin_id = $1",
            "DELETE FROM properties WHERE lister_id = $1",
            "DELETE FROM user_roles WHERE user_id = $1",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        }
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        tx.commit().await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn role(db: &PgPool, id: &str) -> sqlx::Result<Role> {
        sqlx::query_scalar::<_, Role>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(id)
            .fetch_one(db)
            .await
    }

    pub async fn set_role(db: &PgPool, id: &str, role: Role) -> sqlx::Result<()> {
        let res = sqlx::query("UPDATE user_roles SET role = $2 WHERE user_id = $1")
            .bind(id)
            .bind(role)
            .execute(db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn set_status(db: &PgPool, id: &str, status: AccountStatus) -> sqlx::Result<()> {
        let res = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn search_public(
        db: &PgPool,
        first_name: Option<&str>,
        last_name: Option<&str>,
        page: Page,
    ) -> sqlx::Result<Vec<String>> {
        SearchPlan::public_users(first_name, last_name, page)
            .fetch_ids(db)
            .await
    }

    pub async fn search_by_role(
        db: &PgPool,
        role: Role,
        name: Option<&str>,
        page: Page,
    ) -> sqlx::Result<Vec<String>> {
        SearchPlan::listers(role, name, page).fetch_ids(db).await
    }
}
