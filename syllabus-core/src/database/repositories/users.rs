use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::query::{Page, WhereClause, push_search, search_term};
use crate::users::{
    CreateUser, CreatorColumns, CreatorInput, CreatorProfile, UpdateUser, User, UserListQuery,
    UserWithCreator,
};

const NOT_FOUND: &str = "User not found";
const CREATOR_NOT_FOUND: &str = "Creator profile not found for this user";

async fn insert_profile(
    conn: &mut PgConnection,
    user_id: &str,
    columns: &CreatorColumns,
) -> Result<CreatorProfile> {
    let profile = sqlx::query_as(
        r#"
        INSERT INTO creator_profiles (user_id, marital_status, occupation, religion, total_years_experience)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(columns.marital_status)
    .bind(&columns.occupation)
    .bind(&columns.religion)
    .bind(columns.total_years_experience)
    .fetch_one(conn)
    .await?;
    Ok(profile)
}

/// Patch the existing profile, or create one when there is none and the
/// input carries at least one column.
async fn upsert_profile(
    conn: &mut PgConnection,
    user_id: &str,
    input: &CreatorInput,
) -> Result<Option<CreatorProfile>> {
    let current: Option<CreatorProfile> =
        sqlx::query_as("SELECT * FROM creator_profiles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        Some(mut profile) => {
            input.apply(&mut profile);
            let columns = CreatorColumns::from(&profile);
            let profile = sqlx::query_as(
                r#"
                UPDATE creator_profiles
                SET marital_status = $1, occupation = $2, religion = $3,
                    total_years_experience = $4, updated_at = NOW()
                WHERE id = $5
                RETURNING *
                "#,
            )
            .bind(columns.marital_status)
            .bind(&columns.occupation)
            .bind(&columns.religion)
            .bind(columns.total_years_experience)
            .bind(profile.id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(Some(profile))
        }
        None if input.is_empty() => Ok(None),
        None => insert_profile(conn, user_id, &input.columns()).await.map(Some),
    }
}

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
        let mut clause = WhereClause::new();
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["id", "name"], &term);
        }
    }

    pub async fn list(&self, query: &UserListQuery) -> Result<Page<User>> {
        let page = query.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        Self::push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        Self::push_filters(&mut select, query);
        select.push(" ORDER BY name ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn get(&self, id: &str) -> Result<UserWithCreator> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(NOT_FOUND))?;
        let creator_profile = sqlx::query_as("SELECT * FROM creator_profiles WHERE user_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(UserWithCreator {
            user,
            creator_profile,
        })
    }

    pub async fn create(&self, request: &CreateUser) -> Result<UserWithCreator> {
        let user = request.to_user();

        let mut tx = self.pool.begin().await?;
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(&user.id)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(CatalogError::invalid("id", "The id has already been taken."));
        }

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, phone, dob, country_code, country, state, district, town, profile_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.phone)
        .bind(&user.dob)
        .bind(&user.country_code)
        .bind(&user.country)
        .bind(&user.state)
        .bind(&user.district)
        .bind(&user.town)
        .bind(&user.profile_image)
        .fetch_one(&mut *tx)
        .await?;

        let creator_profile = match request.creator.as_ref().filter(|input| !input.is_empty()) {
            Some(input) => Some(insert_profile(&mut tx, &user.id, &input.columns()).await?),
            None => None,
        };
        tx.commit().await?;

        info!(
            target: "catalog::users",
            user_id = %user.id,
            creator = creator_profile.is_some(),
            "user created"
        );
        Ok(UserWithCreator {
            user,
            creator_profile,
        })
    }

    pub async fn update(&self, id: &str, patch: &UpdateUser) -> Result<UserWithCreator> {
        let mut tx = self.pool.begin().await?;
        let mut user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CatalogError::not_found(NOT_FOUND))?;
        patch.apply(&mut user);

        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, phone = $2, dob = $3, country_code = $4, country = $5, state = $6,
                district = $7, town = $8, profile_image = $9
            WHERE id = $10
            "#,
        )
        .bind(&user.name)
        .bind(user.phone)
        .bind(&user.dob)
        .bind(&user.country_code)
        .bind(&user.country)
        .bind(&user.state)
        .bind(&user.district)
        .bind(&user.town)
        .bind(&user.profile_image)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(input) = &patch.creator {
            upsert_profile(&mut tx, id, input).await?;
        }
        tx.commit().await?;

        info!(target: "catalog::users", user_id = %id, "user updated");
        self.get(id).await
    }

    /// Fails with a conflict while the user still owns courses.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(NOT_FOUND));
        }
        info!(target: "catalog::users", user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn delete_creator(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !found {
            return Err(CatalogError::not_found(NOT_FOUND));
        }

        let deleted = sqlx::query("DELETE FROM creator_profiles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(CREATOR_NOT_FOUND));
        }
        tx.commit().await?;

        info!(target: "catalog::users", user_id = %id, "creator profile deleted");
        Ok(())
    }
}
