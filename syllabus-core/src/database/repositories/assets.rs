//! One repository for all four media tables, generic over [`AssetFields`].

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::catalog::assets::SEARCH_COLUMNS;
use crate::catalog::{AssetFields, AssetInput, AssetListQuery, CourseAsset, CreateAsset, UpdateAsset};
use crate::database::scoped::{ensure_exists, find_in_scope, next_position};
use crate::database::slug_lookup::PgSlugLookup;
use crate::error::{CatalogError, Result};
use crate::query::{Page, WhereClause, push_search, search_term};
use crate::slug::{SlugScope, resolve_slug, update_source};

use super::courses::COURSE_NOT_FOUND;

const BASE_COLUMNS: &str = "section_id, title, slug, description, is_free_preview, position";

#[derive(Debug, Clone)]
pub struct PostgresAssetRepository {
    pool: PgPool,
}

/// `section_id` must name a section of the same course.
async fn check_section(conn: &mut PgConnection, course_id: i64, section_id: Option<i64>) -> Result<()> {
    let Some(section_id) = section_id else {
        return Ok(());
    };
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM course_sections WHERE id = $1 AND course_id = $2)",
    )
    .bind(section_id)
    .bind(course_id)
    .fetch_one(conn)
    .await?;
    if owned {
        Ok(())
    } else {
        Err(CatalogError::invalid(
            "section_id",
            "The selected section id is invalid.",
        ))
    }
}

impl PostgresAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        course_id: i64,
        query: &AssetListQuery,
    ) {
        let mut clause = WhereClause::new();
        clause.next(builder).push("course_id = ").push_bind(course_id);
        if let Some(section_id) = query.section_id {
            clause.next(builder).push("section_id = ").push_bind(section_id);
        }
        if query.free_only == Some(true) {
            clause.next(builder).push("is_free_preview = TRUE");
        }
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), SEARCH_COLUMNS, &term);
        }
    }

    pub async fn list<F: AssetFields>(
        &self,
        course_id: i64,
        query: &AssetListQuery,
    ) -> Result<Page<CourseAsset<F>>> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        let page = query.page_request();
        let table = F::KIND.table();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        count.push(table);
        Self::push_filters(&mut count, course_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM ");
        select.push(table);
        Self::push_filters(&mut select, course_id, query);
        select.push(" ORDER BY position ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CourseAsset<F>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    /// Every asset of one kind for a course, by position.
    pub async fn for_course<F: AssetFields>(&self, course_id: i64) -> Result<Vec<CourseAsset<F>>> {
        let sql = format!(
            "SELECT * FROM {} WHERE course_id = $1 ORDER BY position ASC, id ASC",
            F::KIND.table()
        );
        let items = sqlx::query_as::<_, CourseAsset<F>>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get<F: AssetFields>(&self, course_id: i64, id: i64) -> Result<CourseAsset<F>> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        find_in_scope(&self.pool, course_id, id).await
    }

    pub async fn create<F: AssetFields>(
        &self,
        course_id: i64,
        request: &CreateAsset<F::Input>,
    ) -> Result<CourseAsset<F>> {
        let kind = F::KIND;
        let title = request.title.as_deref().unwrap_or_default().trim();
        let source = request
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(title);

        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        check_section(&mut tx, course_id, request.section_id).await?;

        let slug = resolve_slug(
            &mut PgSlugLookup::new(&mut tx),
            SlugScope::CourseAssets { kind, course_id },
            source,
            None,
        )
        .await?;
        let position = match request.position {
            Some(position) => position,
            None => next_position(&mut tx, kind.table(), Some(("course_id", course_id)), 0).await?,
        };
        let fields = request.fields.build();

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO ");
        builder.push(kind.table()).push(" (course_id, ").push(BASE_COLUMNS);
        for column in F::COLUMNS {
            builder.push(", ").push(*column);
        }
        builder.push(") VALUES (");
        let mut values = builder.separated(", ");
        values
            .push_bind(course_id)
            .push_bind(request.section_id)
            .push_bind(title.to_string())
            .push_bind(slug.clone())
            .push_bind(request.description.clone())
            .push_bind(request.is_free_preview.unwrap_or(false))
            .push_bind(position);
        fields.push_values(&mut values);
        values.push_unseparated(") RETURNING *");

        let asset = builder
            .build_query_as::<CourseAsset<F>>()
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            target: "catalog::assets",
            kind = %kind,
            course_id,
            asset_id = asset.id,
            %slug,
            "asset created"
        );
        Ok(asset)
    }

    pub async fn update<F: AssetFields>(
        &self,
        course_id: i64,
        id: i64,
        patch: &UpdateAsset<F::Input>,
    ) -> Result<CourseAsset<F>> {
        let kind = F::KIND;
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let mut asset: CourseAsset<F> = find_in_scope(&mut *tx, course_id, id).await?;

        if let Some(section_id) = patch.section_id {
            check_section(&mut tx, course_id, section_id).await?;
        }

        let current_title = asset.title.clone();
        patch.apply(&mut asset);

        let explicit = patch.slug.as_ref().map(|slug| slug.as_deref());
        if let Some(source) = update_source(explicit, patch.title.as_deref(), &current_title) {
            asset.slug = resolve_slug(
                &mut PgSlugLookup::new(&mut tx),
                SlugScope::CourseAssets { kind, course_id },
                source,
                Some(id),
            )
            .await?;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE ");
        builder.push(kind.table()).push(" SET (").push(BASE_COLUMNS);
        for column in F::COLUMNS {
            builder.push(", ").push(*column);
        }
        builder.push(") = ROW(");
        let mut values = builder.separated(", ");
        values
            .push_bind(asset.section_id)
            .push_bind(asset.title.clone())
            .push_bind(asset.slug.clone())
            .push_bind(asset.description.clone())
            .push_bind(asset.is_free_preview)
            .push_bind(asset.position);
        asset.fields.push_values(&mut values);
        values.push_unseparated("), updated_at = NOW() WHERE id = ");
        builder
            .push_bind(id)
            .push(" AND course_id = ")
            .push_bind(course_id)
            .push(" RETURNING *");

        let updated = builder
            .build_query_as::<CourseAsset<F>>()
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(target: "catalog::assets", kind = %kind, course_id, asset_id = id, "asset updated");
        Ok(updated)
    }

    pub async fn delete<F: AssetFields>(&self, course_id: i64, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let asset: CourseAsset<F> = find_in_scope(&mut *tx, course_id, id).await?;

        let sql = format!("DELETE FROM {} WHERE id = $1", F::KIND.table());
        sqlx::query(&sql).bind(asset.id).execute(&mut *tx).await?;
        tx.commit().await?;

        info!(target: "catalog::assets", kind = %F::KIND, course_id, asset_id = id, "asset deleted");
        Ok(())
    }
}
