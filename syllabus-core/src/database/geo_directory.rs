use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::error::Result;
use crate::geo::{Country, CountryKey, CountryScope, GeoDirectory, State, StateKey};
use crate::query::contains_pattern;

/// Geo lookups on a caller-owned connection.
#[derive(Debug)]
pub struct PgGeoDirectory<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgGeoDirectory<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GeoDirectory for PgGeoDirectory<'_> {
    async fn country_by(&mut self, key: CountryKey<'_>) -> Result<Option<Country>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM countries WHERE ");
        match key {
            CountryKey::Id(id) => {
                builder.push("id = ").push_bind(id);
            }
            CountryKey::NumericCode(code) => {
                let Ok(code) = i32::try_from(code) else {
                    return Ok(None);
                };
                builder.push("numeric_code = ").push_bind(code);
            }
            CountryKey::Iso2(code) => {
                builder.push("iso2 = upper(").push_bind(code.to_string()).push(")");
            }
            CountryKey::Iso3(code) => {
                builder.push("iso3 = upper(").push_bind(code.to_string()).push(")");
            }
            CountryKey::Name(name) => {
                builder.push("lower(name) = lower(").push_bind(name.to_string()).push(")");
            }
        }
        builder.push(" ORDER BY id LIMIT 1");

        let country = builder
            .build_query_as::<Country>()
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(country)
    }

    async fn state_by(
        &mut self,
        scope: CountryScope,
        key: StateKey<'_>,
    ) -> Result<Option<State>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM states WHERE ");
        if let Some(country_id) = scope.country_id() {
            builder.push("country_id = ").push_bind(country_id).push(" AND ");
        }
        match key {
            StateKey::Id(id) => {
                builder.push("id = ").push_bind(id);
            }
            StateKey::Iso3166_2(code) => {
                builder.push("iso3166_2 = upper(").push_bind(code.to_string()).push(")");
            }
            StateKey::Iso2(code) => {
                builder.push("iso2 = upper(").push_bind(code.to_string()).push(")");
            }
            StateKey::Name(name) => {
                builder.push("lower(name) = lower(").push_bind(name.to_string()).push(")");
            }
            StateKey::NameContains(part) => {
                builder.push("name ILIKE ").push_bind(contains_pattern(part));
            }
        }
        builder.push(" ORDER BY name, id LIMIT 1");

        let state = builder
            .build_query_as::<State>()
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(state)
    }
}
