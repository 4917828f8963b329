use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::catalog::category::SORTABLE;
use crate::catalog::listing::CATEGORY_PAGE;
use crate::catalog::{
    Category, CategoryListQuery, CategoryWithCount, CreateCategory, Placement, UpdateCategory,
};
use crate::database::scoped::{apply_reorder, next_position};
use crate::database::slug_lookup::PgSlugLookup;
use crate::error::{CatalogError, Result};
use crate::query::{Page, SortKey, WhereClause, parse_sort, push_order_by, push_search, search_term};
use crate::slug::{SlugScope, resolve_slug, update_source};

const SELECT_WITH_COUNT: &str = "SELECT c.*, \
     (SELECT COUNT(*) FROM subcategories s WHERE s.category_id = c.id) AS subcategories_count \
     FROM categories c";

const DEFAULT_ORDER: &[SortKey] = &[SortKey::asc("position"), SortKey::asc("name")];

const NOT_FOUND: &str = "Category not found";

#[derive(Debug, Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CategoryListQuery) {
        let mut clause = WhereClause::new();
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["name", "slug", "description"], &term);
        }
        if let Some(active) = query.active {
            clause.next(builder).push("is_active = ").push_bind(active);
        }
    }

    pub async fn list(&self, query: &CategoryListQuery) -> Result<Page<CategoryWithCount>> {
        let page = query.page_request(CATEGORY_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories c");
        Self::push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_WITH_COUNT);
        Self::push_filters(&mut select, query);
        let sort = parse_sort(query.sort.as_deref(), SORTABLE);
        push_order_by(&mut select, &sort, DEFAULT_ORDER);
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CategoryWithCount>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn get(&self, id: i64) -> Result<CategoryWithCount> {
        let sql = format!("{SELECT_WITH_COUNT} WHERE c.id = $1");
        sqlx::query_as::<_, CategoryWithCount>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, request: &CreateCategory) -> Result<CategoryWithCount> {
        let name = request.name.as_deref().unwrap_or_default().trim();
        let source = request
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(name);

        let mut tx = self.pool.begin().await?;
        let slug = resolve_slug(
            &mut PgSlugLookup::new(&mut tx),
            SlugScope::Categories,
            source,
            None,
        )
        .await?;
        let position = match request.position {
            Some(position) => position,
            None => next_position(&mut tx, "categories", None, 0).await?,
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO categories (name, slug, description, position, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(&slug)
        .bind(&request.description)
        .bind(position)
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::categories", category_id = id, %slug, "category created");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, patch: &UpdateCategory) -> Result<CategoryWithCount> {
        let mut tx = self.pool.begin().await?;
        let mut category: Category =
            sqlx::query_as("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CatalogError::not_found(NOT_FOUND))?;

        let current_name = category.name.clone();
        patch.apply(&mut category);

        let explicit = patch.slug.as_ref().map(|slug| slug.as_deref());
        if let Some(source) = update_source(explicit, patch.name.as_deref(), &current_name) {
            category.slug = resolve_slug(
                &mut PgSlugLookup::new(&mut tx),
                SlugScope::Categories,
                source,
                Some(id),
            )
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE categories
            SET name = $1, slug = $2, description = $3, position = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.position)
        .bind(category.is_active)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::categories", category_id = id, slug = %category.slug, "category updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(NOT_FOUND));
        }
        info!(target: "catalog::categories", category_id = id, "category deleted");
        Ok(())
    }

    pub async fn reorder(&self, placements: &[Placement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        apply_reorder(&mut tx, "categories", None, placements, |id| {
            format!("Category {id} not found")
        })
        .await?;
        tx.commit().await?;
        info!(target: "catalog::categories", count = placements.len(), "categories reordered");
        Ok(())
    }
}
