use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::catalog::listing::SECTION_PAGE;
use crate::catalog::{ChildListQuery, CourseSection, CreateSection, Placement, UpdateSection};
use crate::database::scoped::{apply_reorder, ensure_exists, find_in_scope, next_position};
use crate::error::Result;
use crate::query::{Page, WhereClause, push_search, search_term};

use super::courses::COURSE_NOT_FOUND;

#[derive(Debug, Clone)]
pub struct PostgresSectionRepository {
    pool: PgPool,
}

impl PostgresSectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, course_id: i64, query: &ChildListQuery) {
        let mut clause = WhereClause::new();
        clause.next(builder).push("course_id = ").push_bind(course_id);
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["title"], &term);
        }
    }

    pub async fn list(&self, course_id: i64, query: &ChildListQuery) -> Result<Page<CourseSection>> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        let page = query.page_request(SECTION_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM course_sections");
        Self::push_filters(&mut count, course_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM course_sections");
        Self::push_filters(&mut select, course_id, query);
        select.push(" ORDER BY position ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CourseSection>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn get(&self, course_id: i64, id: i64) -> Result<CourseSection> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        find_in_scope(&self.pool, course_id, id).await
    }

    pub async fn create(&self, course_id: i64, request: &CreateSection) -> Result<CourseSection> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let position = match request.position {
            Some(position) => position,
            None => {
                next_position(&mut tx, "course_sections", Some(("course_id", course_id)), 0)
                    .await?
            }
        };

        let section: CourseSection = sqlx::query_as(
            "INSERT INTO course_sections (course_id, title, position) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(course_id)
        .bind(request.title.as_deref().unwrap_or_default().trim())
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::sections", course_id, section_id = section.id, position, "section created");
        Ok(section)
    }

    pub async fn update(&self, course_id: i64, id: i64, patch: &UpdateSection) -> Result<CourseSection> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let mut section: CourseSection = find_in_scope(&mut *tx, course_id, id).await?;
        patch.apply(&mut section);

        let section: CourseSection = sqlx::query_as(
            r#"
            UPDATE course_sections
            SET title = $1, position = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&section.title)
        .bind(section.position)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::sections", course_id, section_id = id, "section updated");
        Ok(section)
    }

    /// Media placed in the section stay with the course, unsectioned.
    pub async fn delete(&self, course_id: i64, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let section: CourseSection = find_in_scope(&mut *tx, course_id, id).await?;
        sqlx::query("DELETE FROM course_sections WHERE id = $1")
            .bind(section.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(target: "catalog::sections", course_id, section_id = id, "section deleted");
        Ok(())
    }

    pub async fn reorder(&self, course_id: i64, placements: &[Placement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        apply_reorder(
            &mut tx,
            "course_sections",
            Some(("course_id", course_id)),
            placements,
            |id| format!("Section {id} not in course"),
        )
        .await?;
        tx.commit().await?;
        info!(target: "catalog::sections", course_id, count = placements.len(), "sections reordered");
        Ok(())
    }
}
