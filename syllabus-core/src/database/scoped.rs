//! Helpers shared by every nested resource: ownership checks, default
//! positions and batch reordering.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgExecutor, Postgres, QueryBuilder};
use std::collections::HashSet;

use crate::catalog::{
    AssetFields, CourseAsset, CourseChapter, CourseSection, Placement,
};
use crate::error::{CatalogError, Result};

/// A row that only exists underneath one parent row.
pub trait ScopedChild: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    fn table() -> &'static str;

    fn parent_column() -> &'static str;

    /// Message for a child that is missing or belongs to another parent.
    fn not_found() -> String;
}

impl ScopedChild for CourseChapter {
    fn table() -> &'static str {
        "course_chapters"
    }

    fn parent_column() -> &'static str {
        "course_id"
    }

    fn not_found() -> String {
        "Chapter not found for this course".to_string()
    }
}

impl ScopedChild for CourseSection {
    fn table() -> &'static str {
        "course_sections"
    }

    fn parent_column() -> &'static str {
        "course_id"
    }

    fn not_found() -> String {
        "Section not found in this course".to_string()
    }
}

impl<F: AssetFields> ScopedChild for CourseAsset<F> {
    fn table() -> &'static str {
        F::KIND.table()
    }

    fn parent_column() -> &'static str {
        "course_id"
    }

    fn not_found() -> String {
        format!("{} not found in this course", F::KIND.noun())
    }
}

/// Fetch `child_id` only if it belongs to `parent_id`.
pub async fn find_in_scope<'e, T, E>(executor: E, parent_id: i64, child_id: i64) -> Result<T>
where
    T: ScopedChild,
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT * FROM {} WHERE id = $1 AND {} = $2",
        T::table(),
        T::parent_column()
    );
    sqlx::query_as::<_, T>(&sql)
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CatalogError::not_found(T::not_found()))
}

pub async fn exists<'e, E>(executor: E, table: &str, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    let found: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(executor).await?;
    Ok(found)
}

/// Fail with a 404 carrying `message` unless row `id` exists in `table`.
pub async fn ensure_exists<'e, E>(executor: E, table: &str, id: i64, message: &str) -> Result<()>
where
    E: PgExecutor<'e>,
{
    if exists(executor, table, id).await? {
        Ok(())
    } else {
        Err(CatalogError::not_found(message))
    }
}

/// One past the highest position in scope, or `start` when the scope is empty.
pub async fn next_position(
    conn: &mut PgConnection,
    table: &str,
    parent: Option<(&str, i64)>,
    start: i32,
) -> Result<i32> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COALESCE(MAX(position) + 1, ");
    builder.push_bind(start);
    builder.push(") FROM ");
    builder.push(table);
    if let Some((column, id)) = parent {
        builder.push(" WHERE ").push(column).push(" = ").push_bind(id);
    }
    let position: i32 = builder.build_query_scalar().fetch_one(conn).await?;
    Ok(position)
}

/// Write every placement, or none of them.
///
/// All ids must exist within `parent` (or the whole table when `None`);
/// the first one that does not aborts the batch with a 422 on `orders`.
/// Run this on a transaction so a failed batch leaves positions untouched.
pub async fn apply_reorder(
    conn: &mut PgConnection,
    table: &str,
    parent: Option<(&str, i64)>,
    placements: &[Placement],
    outside_scope: impl Fn(i64) -> String,
) -> Result<()> {
    let ids: Vec<i64> = placements.iter().map(|placement| placement.id).collect();

    let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM ");
    builder.push(table).push(" WHERE id = ANY(").push_bind(ids).push(")");
    if let Some((column, id)) = parent {
        builder.push(" AND ").push(column).push(" = ").push_bind(id);
    }
    let found: HashSet<i64> = builder
        .build_query_scalar::<i64>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

    if let Some(stray) = placements.iter().find(|p| !found.contains(&p.id)) {
        return Err(CatalogError::invalid("orders", outside_scope(stray.id)));
    }

    let sql = format!("UPDATE {table} SET position = $1, updated_at = NOW() WHERE id = $2");
    for placement in placements {
        sqlx::query(&sql)
            .bind(placement.position)
            .bind(placement.id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VideoFields;

    #[test]
    fn asset_scope_uses_kind_table_and_noun() {
        assert_eq!(CourseAsset::<VideoFields>::table(), "course_videos");
        assert_eq!(
            CourseAsset::<VideoFields>::not_found(),
            "Video not found in this course"
        );
        assert_eq!(
            CourseSection::not_found(),
            "Section not found in this course"
        );
    }
}
