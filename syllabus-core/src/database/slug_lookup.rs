use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashSet;

use crate::error::Result;
use crate::slug::{SlugLookup, SlugScope};

/// Slug lookups on a caller-owned connection, usually the write transaction.
#[derive(Debug)]
pub struct PgSlugLookup<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgSlugLookup<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SlugLookup for PgSlugLookup<'_> {
    async fn taken_slugs(
        &mut self,
        scope: SlugScope,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<HashSet<String>> {
        // `base` is already normalized, so it holds no LIKE wildcards.
        let mut builder = QueryBuilder::<Postgres>::new("SELECT slug FROM ");
        builder
            .push(scope.table())
            .push(" WHERE (slug = ")
            .push_bind(base.to_string())
            .push(" OR slug LIKE ")
            .push_bind(format!("{base}-%"))
            .push(")");
        if let Some((column, id)) = scope.parent() {
            builder.push(" AND ").push(column).push(" = ").push_bind(id);
        }
        if let Some(id) = exclude_id {
            builder.push(" AND id <> ").push_bind(id);
        }

        let slugs: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(slugs.into_iter().collect())
    }
}
