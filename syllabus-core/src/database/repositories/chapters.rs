use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::catalog::chapter::FIRST_POSITION;
use crate::catalog::listing::CHAPTER_PAGE;
use crate::catalog::{ChildListQuery, CourseChapter, CreateChapter, UpdateChapter};
use crate::database::scoped::{ensure_exists, find_in_scope, next_position};
use crate::error::Result;
use crate::query::{Page, WhereClause, push_search, search_term};

use super::courses::COURSE_NOT_FOUND;

#[derive(Debug, Clone)]
pub struct PostgresChapterRepository {
    pool: PgPool,
}

impl PostgresChapterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, course_id: i64, query: &ChildListQuery) {
        let mut clause = WhereClause::new();
        clause.next(builder).push("course_id = ").push_bind(course_id);
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["title", "description"], &term);
        }
    }

    pub async fn list(&self, course_id: i64, query: &ChildListQuery) -> Result<Page<CourseChapter>> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        let page = query.page_request(CHAPTER_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM course_chapters");
        Self::push_filters(&mut count, course_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM course_chapters");
        Self::push_filters(&mut select, course_id, query);
        select.push(" ORDER BY position ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CourseChapter>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn get(&self, course_id: i64, id: i64) -> Result<CourseChapter> {
        ensure_exists(&self.pool, "courses", course_id, COURSE_NOT_FOUND).await?;
        find_in_scope(&self.pool, course_id, id).await
    }

    pub async fn create(&self, course_id: i64, request: &CreateChapter) -> Result<CourseChapter> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let position = match request.position {
            Some(position) => position,
            None => {
                next_position(
                    &mut tx,
                    "course_chapters",
                    Some(("course_id", course_id)),
                    FIRST_POSITION,
                )
                .await?
            }
        };

        let chapter: CourseChapter = sqlx::query_as(
            r#"
            INSERT INTO course_chapters (course_id, title, description, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(request.title.as_deref().unwrap_or_default().trim())
        .bind(&request.description)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::chapters", course_id, chapter_id = chapter.id, position, "chapter created");
        Ok(chapter)
    }

    pub async fn update(&self, course_id: i64, id: i64, patch: &UpdateChapter) -> Result<CourseChapter> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let mut chapter: CourseChapter = find_in_scope(&mut *tx, course_id, id).await?;
        patch.apply(&mut chapter);

        let chapter: CourseChapter = sqlx::query_as(
            r#"
            UPDATE course_chapters
            SET title = $1, description = $2, position = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&chapter.title)
        .bind(&chapter.description)
        .bind(chapter.position)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::chapters", course_id, chapter_id = id, "chapter updated");
        Ok(chapter)
    }

    pub async fn delete(&self, course_id: i64, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut *tx, "courses", course_id, COURSE_NOT_FOUND).await?;
        let chapter: CourseChapter = find_in_scope(&mut *tx, course_id, id).await?;
        sqlx::query("DELETE FROM course_chapters WHERE id = $1")
            .bind(chapter.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(target: "catalog::chapters", course_id, chapter_id = id, "chapter deleted");
        Ok(())
    }
}
