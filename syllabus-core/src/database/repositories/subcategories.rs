use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::info;

use crate::catalog::listing::{CATEGORY_PAGE, NESTED_SUBCATEGORY_PAGE};
use crate::catalog::subcategory::SORTABLE;
use crate::catalog::{
    Category, CategoryListQuery, CreateSubcategory, Placement, Subcategory,
    SubcategoryWithCategory, UpdateSubcategory,
};
use crate::database::scoped::{apply_reorder, ensure_exists, exists, next_position};
use crate::database::slug_lookup::PgSlugLookup;
use crate::error::{CatalogError, Result};
use crate::query::{
    Page, PageRequest, SortKey, WhereClause, parse_sort, push_order_by, push_search, search_term,
};
use crate::slug::{SlugScope, resolve_slug, update_source};

const DEFAULT_ORDER: &[SortKey] = &[SortKey::asc("position"), SortKey::asc("name")];

const NOT_FOUND: &str = "Subcategory not found";
const CATEGORY_NOT_FOUND: &str = "Category not found";

#[derive(Debug, Clone)]
pub struct PostgresSubcategoryRepository {
    pool: PgPool,
}

impl PostgresSubcategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        category_id: Option<i64>,
        query: &CategoryListQuery,
    ) {
        let mut clause = WhereClause::new();
        if let Some(category_id) = category_id {
            clause.next(builder).push("category_id = ").push_bind(category_id);
        }
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["name", "slug", "description"], &term);
        }
        if let Some(active) = query.active {
            clause.next(builder).push("is_active = ").push_bind(active);
        }
    }

    async fn page(
        &self,
        category_id: Option<i64>,
        query: &CategoryListQuery,
        page: PageRequest,
    ) -> Result<Page<SubcategoryWithCategory>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM subcategories");
        Self::push_filters(&mut count, category_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM subcategories");
        Self::push_filters(&mut select, category_id, query);
        let sort = parse_sort(query.sort.as_deref(), SORTABLE);
        push_order_by(&mut select, &sort, DEFAULT_ORDER);
        page.push_limit_offset(&mut select);
        let rows = select
            .build_query_as::<Subcategory>()
            .fetch_all(&self.pool)
            .await?;

        let items = self.with_categories(rows).await?;
        Ok(Page::new(items, page, total))
    }

    /// Flat listing across categories, optionally filtered by `category_id`.
    pub async fn list(&self, query: &CategoryListQuery) -> Result<Page<SubcategoryWithCategory>> {
        self.page(query.category_id, query, query.page_request(CATEGORY_PAGE))
            .await
    }

    pub async fn list_for_category(
        &self,
        category_id: i64,
        query: &CategoryListQuery,
    ) -> Result<Page<SubcategoryWithCategory>> {
        ensure_exists(&self.pool, "categories", category_id, CATEGORY_NOT_FOUND).await?;
        self.page(
            Some(category_id),
            query,
            query.page_request(NESTED_SUBCATEGORY_PAGE),
        )
        .await
    }

    async fn with_categories(
        &self,
        rows: Vec<Subcategory>,
    ) -> Result<Vec<SubcategoryWithCategory>> {
        let mut ids: Vec<i64> = rows.iter().map(|row| row.category_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let categories: HashMap<i64, Category> =
            sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|category| (category.id, category))
                .collect();

        Ok(rows
            .into_iter()
            .map(|subcategory| SubcategoryWithCategory {
                category: categories.get(&subcategory.category_id).cloned(),
                subcategory,
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<SubcategoryWithCategory> {
        let row: Subcategory = sqlx::query_as("SELECT * FROM subcategories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(NOT_FOUND))?;
        let mut items = self.with_categories(vec![row]).await?;
        items
            .pop()
            .ok_or_else(|| CatalogError::not_found(NOT_FOUND))
    }

    pub async fn create(
        &self,
        category_id: i64,
        request: &CreateSubcategory,
    ) -> Result<SubcategoryWithCategory> {
        let name = request.name.as_deref().unwrap_or_default().trim();
        let source = request
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(name);

        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "categories", category_id, CATEGORY_NOT_FOUND).await?;
        let slug = resolve_slug(
            &mut PgSlugLookup::new(&mut tx),
            SlugScope::Subcategories { category_id },
            source,
            None,
        )
        .await?;
        let position = match request.position {
            Some(position) => position,
            None => next_position(&mut tx, "subcategories", Some(("category_id", category_id)), 0).await?,
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subcategories (category_id, name, slug, description, position, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(category_id)
        .bind(name)
        .bind(&slug)
        .bind(&request.description)
        .bind(position)
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::subcategories", subcategory_id = id, category_id, %slug, "subcategory created");
        self.get(id).await
    }

    /// Moving to another category re-resolves the slug there.
    pub async fn update(
        &self,
        id: i64,
        patch: &UpdateSubcategory,
    ) -> Result<SubcategoryWithCategory> {
        let mut tx = self.pool.begin().await?;
        let mut subcategory: Subcategory =
            sqlx::query_as("SELECT * FROM subcategories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CatalogError::not_found(NOT_FOUND))?;

        let moved = patch
            .category_id
            .is_some_and(|category_id| category_id != subcategory.category_id);
        if let Some(category_id) = patch.category_id.filter(|_| moved)
            && !exists(&mut *tx, "categories", category_id).await?
        {
            return Err(CatalogError::invalid(
                "category_id",
                "The selected category id is invalid.",
            ));
        }

        let current_name = subcategory.name.clone();
        let current_slug = subcategory.slug.clone();
        patch.apply(&mut subcategory);

        let explicit = patch.slug.as_ref().map(|slug| slug.as_deref());
        let source = update_source(explicit, patch.name.as_deref(), &current_name)
            .or_else(|| moved.then_some(current_slug.as_str()));
        if let Some(source) = source {
            subcategory.slug = resolve_slug(
                &mut PgSlugLookup::new(&mut tx),
                SlugScope::Subcategories {
                    category_id: subcategory.category_id,
                },
                source,
                Some(id),
            )
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE subcategories
            SET category_id = $1, name = $2, slug = $3, description = $4, position = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(subcategory.category_id)
        .bind(&subcategory.name)
        .bind(&subcategory.slug)
        .bind(&subcategory.description)
        .bind(subcategory.position)
        .bind(subcategory.is_active)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            target: "catalog::subcategories",
            subcategory_id = id,
            category_id = subcategory.category_id,
            moved,
            "subcategory updated"
        );
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(NOT_FOUND));
        }
        info!(target: "catalog::subcategories", subcategory_id = id, "subcategory deleted");
        Ok(())
    }

    pub async fn reorder(&self, category_id: i64, placements: &[Placement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "categories", category_id, CATEGORY_NOT_FOUND).await?;
        apply_reorder(
            &mut tx,
            "subcategories",
            Some(("category_id", category_id)),
            placements,
            |id| format!("Subcategory {id} not in this category"),
        )
        .await?;
        tx.commit().await?;
        info!(target: "catalog::subcategories", category_id, count = placements.len(), "subcategories reordered");
        Ok(())
    }
}
