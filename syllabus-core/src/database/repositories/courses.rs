use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::catalog::course::SORTABLE;
use crate::catalog::{
    AssetFields, AudioFields, Course, CourseChapter, CourseDetail, CourseListQuery,
    CourseRelations, CourseSection, CourseStatus, CourseSummary, CreateCourse, DocumentFields,
    ImageFields, Subcategory, UpdateCourse, VideoFields,
};
use crate::database::scoped::exists;
use crate::database::slug_lookup::PgSlugLookup;
use crate::error::{CatalogError, Result};
use crate::query::{Page, SortKey, WhereClause, parse_sort, push_order_by, push_search, search_term};
use crate::slug::{SlugScope, resolve_slug, update_source};

use super::assets::PostgresAssetRepository;

pub(crate) const COURSE_NOT_FOUND: &str = "Course not found";

const SECTIONS_COUNT: &str =
    "(SELECT COUNT(*) FROM course_sections x WHERE x.course_id = c.id) AS sections_count";

const DEFAULT_ORDER: &[SortKey] = &[SortKey::desc("created_at")];

fn select_clause(with_counts: bool) -> String {
    let mut sql = format!("SELECT c.*, {SECTIONS_COUNT}");
    if with_counts {
        for (table, alias) in [
            (VideoFields::KIND.table(), "videos_count"),
            (DocumentFields::KIND.table(), "documents_count"),
            (AudioFields::KIND.table(), "audios_count"),
            (ImageFields::KIND.table(), "images_count"),
        ] {
            sql.push_str(&format!(
                ", (SELECT COUNT(*) FROM {table} x WHERE x.course_id = c.id) AS {alias}"
            ));
        }
    }
    sql.push_str(" FROM courses c");
    sql
}

async fn check_subcategory(conn: &mut PgConnection, subcategory_id: i64) -> Result<()> {
    if exists(&mut *conn, "subcategories", subcategory_id).await? {
        Ok(())
    } else {
        Err(CatalogError::invalid(
            "subcategory_id",
            "The selected subcategory id is invalid.",
        ))
    }
}

async fn check_user(conn: &mut PgConnection, user_id: &str) -> Result<()> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if found {
        Ok(())
    } else {
        Err(CatalogError::invalid(
            "user_id",
            "The selected user id is invalid.",
        ))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCourseRepository {
    pool: PgPool,
    assets: PostgresAssetRepository,
}

impl PostgresCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            assets: PostgresAssetRepository::new(pool.clone()),
            pool,
        }
    }

    fn push_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        query: &CourseListQuery,
        status: Option<CourseStatus>,
    ) {
        let mut clause = WhereClause::new();
        if let Some(subcategory_id) = query.subcategory_id {
            clause
                .next(builder)
                .push("c.subcategory_id = ")
                .push_bind(subcategory_id);
        }
        if let Some(category_id) = query.category_id {
            clause
                .next(builder)
                .push("c.subcategory_id IN (SELECT id FROM subcategories WHERE category_id = ")
                .push_bind(category_id)
                .push(")");
        }
        if let Some(status) = status {
            clause.next(builder).push("c.status = ").push_bind(status);
        }
        if let Some(approved) = query.approved {
            clause.next(builder).push("c.approved = ").push_bind(approved);
        }
        if let Some(is_premium) = query.is_premium {
            clause.next(builder).push("c.is_premium = ").push_bind(is_premium);
        }
        if let Some(language) = search_term(query.language.as_deref()) {
            clause.next(builder).push("c.language = ").push_bind(language);
        }
        if let Some(level) = search_term(query.level.as_deref()) {
            clause.next(builder).push("c.level = ").push_bind(level);
        }
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["c.title", "c.summary"], &term);
        }
    }

    pub async fn list(&self, query: &CourseListQuery) -> Result<Page<CourseSummary>> {
        let status = match search_term(query.status.as_deref()) {
            Some(raw) => Some(raw.parse::<CourseStatus>().map_err(|_| {
                CatalogError::invalid("status", "The selected status is invalid.")
            })?),
            None => None,
        };
        let page = query.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses c");
        Self::push_filters(&mut count, query, status);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(select_clause(query.with_counts()));
        Self::push_filters(&mut select, query, status);
        let sort = parse_sort(query.sort.as_deref(), SORTABLE);
        push_order_by(&mut select, &sort, DEFAULT_ORDER);
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CourseSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    pub async fn get(&self, id: i64) -> Result<CourseSummary> {
        let sql = format!("{} WHERE c.id = $1", select_clause(true));
        sqlx::query_as::<_, CourseSummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(COURSE_NOT_FOUND))
    }

    /// A course with the requested relations loaded, each ordered by position.
    pub async fn show(&self, id: i64, relations: CourseRelations) -> Result<CourseDetail> {
        let summary = self.get(id).await?;
        let subcategory_id = summary.course.subcategory_id;
        let mut detail = CourseDetail::bare(summary);

        if relations.subcategory {
            detail.subcategory = sqlx::query_as::<_, Subcategory>(
                "SELECT * FROM subcategories WHERE id = $1",
            )
            .bind(subcategory_id)
            .fetch_optional(&self.pool)
            .await?;
        }
        if relations.sections {
            detail.sections = Some(
                sqlx::query_as::<_, CourseSection>(
                    "SELECT * FROM course_sections WHERE course_id = $1 ORDER BY position, id",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?,
            );
        }
        if relations.chapters {
            detail.chapters = Some(
                sqlx::query_as::<_, CourseChapter>(
                    "SELECT * FROM course_chapters WHERE course_id = $1 ORDER BY position, id",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?,
            );
        }
        if relations.videos {
            detail.videos = Some(self.assets.for_course::<VideoFields>(id).await?);
        }
        if relations.documents {
            detail.documents = Some(self.assets.for_course::<DocumentFields>(id).await?);
        }
        if relations.audios {
            detail.audios = Some(self.assets.for_course::<AudioFields>(id).await?);
        }
        if relations.images {
            detail.images = Some(self.assets.for_course::<ImageFields>(id).await?);
        }

        Ok(detail)
    }

    pub async fn create(&self, request: &CreateCourse) -> Result<CourseSummary> {
        let subcategory_id = request.subcategory_id.unwrap_or_default();
        let user_id = request.user_id.as_deref().unwrap_or_default().trim();
        let title = request.title.as_deref().unwrap_or_default().trim();
        let source = request
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(title);

        let mut tx = self.pool.begin().await?;
        check_subcategory(&mut tx, subcategory_id).await?;
        check_user(&mut tx, user_id).await?;

        let slug = resolve_slug(
            &mut PgSlugLookup::new(&mut tx),
            SlugScope::Courses { subcategory_id },
            source,
            None,
        )
        .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO courses (
                subcategory_id, user_id, title, slug, summary, thumbnail_url, language,
                level, is_premium, status, approved, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(subcategory_id)
        .bind(user_id)
        .bind(title)
        .bind(&slug)
        .bind(&request.summary)
        .bind(&request.thumbnail_url)
        .bind(&request.language)
        .bind(&request.level)
        .bind(request.is_premium.unwrap_or(false))
        .bind(request.status())
        .bind(request.approved.unwrap_or(false))
        .bind(request.price.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(target: "catalog::courses", course_id = id, subcategory_id, %slug, "course created");
        self.get(id).await
    }

    /// Moving to another subcategory re-resolves the slug there.
    pub async fn update(&self, id: i64, patch: &UpdateCourse) -> Result<CourseSummary> {
        let mut tx = self.pool.begin().await?;
        let mut course: Course = sqlx::query_as("SELECT * FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CatalogError::not_found(COURSE_NOT_FOUND))?;

        let moved = patch
            .subcategory_id
            .is_some_and(|subcategory_id| subcategory_id != course.subcategory_id);
        if let Some(subcategory_id) = patch.subcategory_id.filter(|_| moved) {
            check_subcategory(&mut tx, subcategory_id).await?;
        }
        if let Some(user_id) = patch.user_id.as_deref().map(str::trim)
            && user_id != course.user_id
        {
            check_user(&mut tx, user_id).await?;
        }

        let current_title = course.title.clone();
        let current_slug = course.slug.clone();
        patch.apply(&mut course);

        let explicit = patch.slug.as_ref().map(|slug| slug.as_deref());
        let source = update_source(explicit, patch.title.as_deref(), &current_title)
            .or_else(|| moved.then_some(current_slug.as_str()));
        if let Some(source) = source {
            course.slug = resolve_slug(
                &mut PgSlugLookup::new(&mut tx),
                SlugScope::Courses {
                    subcategory_id: course.subcategory_id,
                },
                source,
                Some(id),
            )
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE courses
            SET subcategory_id = $1, user_id = $2, title = $3, slug = $4, summary = $5,
                thumbnail_url = $6, language = $7, level = $8, is_premium = $9,
                status = $10, approved = $11, price = $12, updated_at = NOW()
            WHERE id = $13
            "#,
        )
        .bind(course.subcategory_id)
        .bind(&course.user_id)
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.summary)
        .bind(&course.thumbnail_url)
        .bind(&course.language)
        .bind(&course.level)
        .bind(course.is_premium)
        .bind(course.status)
        .bind(course.approved)
        .bind(course.price)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            target: "catalog::courses",
            course_id = id,
            subcategory_id = course.subcategory_id,
            status = %course.status,
            moved,
            "course updated"
        );
        self.get(id).await
    }

    /// Chapters, sections and media go with the course.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(COURSE_NOT_FOUND));
        }
        info!(target: "catalog::courses", course_id = id, "course deleted");
        Ok(())
    }
}
