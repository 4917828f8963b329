//! Geo reference data: listings, the unified search and bulk upserts.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::database::geo_directory::PgGeoDirectory;
use crate::database::scoped::exists;
use crate::error::{CatalogError, Result};
use crate::geo::requests::{CITY_PAGE, STATE_PAGE, TOWN_PAGE};
use crate::geo::resolver::missing;
use crate::geo::{
    CityDistrict, CityListQuery, CityUpsert, Country, CountryBrief, CountryListQuery,
    CountryScope, CountryUpsert, CountryWithCounts, GeoDefaults, GeoDirectory, GeoSearchResults,
    PlacementRefs, State, StateKey, StateListQuery, StateUpsert, StateWithCounts, Town,
    TownListQuery, TownUpsert, country_scope, resolve_country, resolve_defaults,
    resolve_placement, resolve_state,
};
use crate::query::{Page, PageRequest, WhereClause, contains_pattern, push_search, search_term};

const COUNTRY_NOT_FOUND: &str = "Country not found";
const STATE_NOT_FOUND: &str = "State not found";
const CITY_NOT_FOUND: &str = "City/District not found";

const COUNTRY_COUNTS: &str = ", \
     (SELECT COUNT(*) FROM states s WHERE s.country_id = c.id) AS states_count, \
     (SELECT COUNT(*) FROM city_districts d WHERE d.country_id = c.id) AS cities_count, \
     (SELECT COUNT(*) FROM towns t WHERE t.country_id = c.id) AS towns_count";

const STATE_COUNTS: &str = ", \
     (SELECT COUNT(*) FROM city_districts d WHERE d.state_id = s.id) AS cities_count, \
     (SELECT COUNT(*) FROM towns t WHERE t.state_id = s.id) AS towns_count";

/// Country and state scope of a city or town listing.
#[derive(Debug, Clone, Copy, Default)]
struct ListScope {
    country_id: Option<i64>,
    state_id: Option<i64>,
}

fn row_prefix(index: usize) -> String {
    format!("items.{index}")
}

fn state_upsert_key<'a>(
    iso3166_2: &'a Option<String>,
    iso2: &'a Option<String>,
    name: &'a str,
) -> StateKey<'a> {
    match (iso3166_2.as_deref(), iso2.as_deref()) {
        (Some(code), _) => StateKey::Iso3166_2(code),
        (None, Some(code)) => StateKey::Iso2(code),
        (None, None) => StateKey::Name(name),
    }
}

#[derive(Debug, Clone)]
pub struct PostgresGeoRepository {
    pool: PgPool,
}

impl PostgresGeoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_country_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CountryListQuery) {
        let mut clause = WhereClause::new();
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["c.name", "c.iso2", "c.iso3"], &term);
        }
        if let Some(region) = search_term(query.region.as_deref()) {
            clause
                .next(builder)
                .push("lower(c.region) = lower(")
                .push_bind(region)
                .push(")");
        }
        if let Some(subregion) = search_term(query.subregion.as_deref()) {
            clause
                .next(builder)
                .push("lower(c.subregion) = lower(")
                .push_bind(subregion)
                .push(")");
        }
    }

    pub async fn list_countries(&self, query: &CountryListQuery) -> Result<Page<CountryWithCounts>> {
        let page = query.page_request();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM countries c");
        Self::push_country_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT c.*");
        if query.with_counts.unwrap_or(false) {
            select.push(COUNTRY_COUNTS);
        }
        select.push(" FROM countries c");
        Self::push_country_filters(&mut select, query);
        select.push(" ORDER BY c.name ASC, c.id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CountryWithCounts>()
            .fetch_all(&self.pool)
            .await?;

        debug!(target: "catalog::geo", total, page = page.page, "countries listed");
        Ok(Page::new(items, page, total))
    }

    fn push_state_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        country_id: i64,
        query: &StateListQuery,
    ) {
        let mut clause = WhereClause::new();
        clause.next(builder).push("s.country_id = ").push_bind(country_id);
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["s.name", "s.iso2", "s.iso3166_2"], &term);
        }
    }

    /// States of one country; the resolved country is returned for `meta`.
    pub async fn list_states(
        &self,
        query: &StateListQuery,
    ) -> Result<(CountryBrief, Page<StateWithCounts>)> {
        let country = {
            let mut conn = self.pool.acquire().await?;
            let mut dir = PgGeoDirectory::new(&mut conn);
            match query.country.as_deref() {
                Some(raw) => resolve_country(&mut dir, raw).await?,
                None => None,
            }
        }
        .ok_or_else(|| CatalogError::not_found(COUNTRY_NOT_FOUND))?;

        let page = PageRequest::new(query.page, query.per_page, STATE_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM states s");
        Self::push_state_filters(&mut count, country.id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT s.*");
        if query.with_counts.unwrap_or(false) {
            select.push(STATE_COUNTS);
        }
        select.push(" FROM states s");
        Self::push_state_filters(&mut select, country.id, query);
        select.push(" ORDER BY s.name ASC, s.id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<StateWithCounts>()
            .fetch_all(&self.pool)
            .await?;

        Ok((CountryBrief::from(&country), Page::new(items, page, total)))
    }

    /// Resolve optional `country`/`state` tokens. A token that matches
    /// nothing is a 404, never a wider search.
    async fn list_scope(&self, country: Option<&str>, state: Option<&str>) -> Result<ListScope> {
        let mut conn = self.pool.acquire().await?;
        let mut dir = PgGeoDirectory::new(&mut conn);

        let scope = country_scope(&mut dir, country)
            .await?
            .ok_or_else(|| CatalogError::not_found(COUNTRY_NOT_FOUND))?;
        let state_id = match state.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(
                resolve_state(&mut dir, raw, scope)
                    .await?
                    .ok_or_else(|| CatalogError::not_found(STATE_NOT_FOUND))?
                    .id,
            ),
            None => None,
        };

        Ok(ListScope {
            country_id: scope.country_id(),
            state_id,
        })
    }

    fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, clause: &mut WhereClause, scope: ListScope) {
        if let Some(country_id) = scope.country_id {
            clause.next(builder).push("country_id = ").push_bind(country_id);
        }
        if let Some(state_id) = scope.state_id {
            clause.next(builder).push("state_id = ").push_bind(state_id);
        }
    }

    fn push_city_filters(builder: &mut QueryBuilder<'_, Postgres>, scope: ListScope, query: &CityListQuery) {
        let mut clause = WhereClause::new();
        Self::push_scope(builder, &mut clause, scope);
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["name"], &term);
        }
    }

    fn push_town_filters(builder: &mut QueryBuilder<'_, Postgres>, scope: ListScope, query: &TownListQuery) {
        let mut clause = WhereClause::new();
        Self::push_scope(builder, &mut clause, scope);
        if let Some(city_id) = query.city_id {
            clause.next(builder).push("city_district_id = ").push_bind(city_id);
        }
        if let Some(min_pop) = query.min_pop {
            clause.next(builder).push("population >= ").push_bind(min_pop);
        }
        if let Some(max_pop) = query.max_pop {
            clause.next(builder).push("population <= ").push_bind(max_pop);
        }
        if let Some(term) = search_term(query.q.as_deref()) {
            push_search(clause.next(builder), &["name"], &term);
        }
    }

    pub async fn list_cities(&self, query: &CityListQuery) -> Result<Page<CityDistrict>> {
        let scope = self
            .list_scope(query.country.as_deref(), query.state.as_deref())
            .await?;
        let page = PageRequest::new(query.page, query.per_page, CITY_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM city_districts");
        Self::push_city_filters(&mut count, scope, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM city_districts");
        Self::push_city_filters(&mut select, scope, query);
        select.push(" ORDER BY name ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<CityDistrict>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    /// Most populous first; towns without a population go last.
    pub async fn list_towns(&self, query: &TownListQuery) -> Result<Page<Town>> {
        let scope = self
            .list_scope(query.country.as_deref(), query.state.as_deref())
            .await?;
        if let Some(city_id) = query.city_id
            && !exists(&self.pool, "city_districts", city_id).await?
        {
            return Err(CatalogError::not_found(CITY_NOT_FOUND));
        }

        let page = PageRequest::new(query.page, query.per_page, TOWN_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM towns");
        Self::push_town_filters(&mut count, scope, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM towns");
        Self::push_town_filters(&mut select, scope, query);
        select.push(" ORDER BY population IS NULL, population DESC, name ASC, id ASC");
        page.push_limit_offset(&mut select);
        let items = select
            .build_query_as::<Town>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    /// Name matches across every geo table, `limit` per table.
    pub async fn search(&self, term: &str, limit: i64) -> Result<GeoSearchResults> {
        let pattern = contains_pattern(term);

        let countries = sqlx::query_as::<_, Country>(
            r#"
            SELECT * FROM countries
            WHERE name ILIKE $1 OR iso2 = upper($2) OR iso3 = upper($2)
            ORDER BY name, id
            LIMIT $3
            "#,
        )
        .bind(&pattern)
        .bind(term)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let states = sqlx::query_as::<_, State>(
            "SELECT * FROM states WHERE name ILIKE $1 ORDER BY name, id LIMIT $2",
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let cities = sqlx::query_as::<_, CityDistrict>(
            "SELECT * FROM city_districts WHERE name ILIKE $1 ORDER BY name, id LIMIT $2",
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let towns = sqlx::query_as::<_, Town>(
            "SELECT * FROM towns WHERE name ILIKE $1 \
             ORDER BY population IS NULL, population DESC, name, id LIMIT $2",
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(GeoSearchResults {
            countries,
            states,
            cities,
            towns,
        })
    }

    /// Insert or update on `iso2`. Columns missing from a row keep their
    /// stored value.
    pub async fn upsert_countries(&self, rows: &[CountryUpsert]) -> Result<Vec<Country>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(rows.len());

        for row in rows {
            let country: Country = sqlx::query_as(
                r#"
                INSERT INTO countries (
                    name, iso2, iso3, numeric_code, phonecode, capital, currency,
                    currency_name, currency_symbol, tld, native, region, region_id,
                    subregion, subregion_id, nationality, timezones, latitude, longitude,
                    emoji, emoji_u
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                        $16, $17, $18, $19, $20, $21)
                ON CONFLICT (iso2) DO UPDATE SET
                    name = EXCLUDED.name,
                    iso3 = COALESCE(EXCLUDED.iso3, countries.iso3),
                    numeric_code = COALESCE(EXCLUDED.numeric_code, countries.numeric_code),
                    phonecode = COALESCE(EXCLUDED.phonecode, countries.phonecode),
                    capital = COALESCE(EXCLUDED.capital, countries.capital),
                    currency = COALESCE(EXCLUDED.currency, countries.currency),
                    currency_name = COALESCE(EXCLUDED.currency_name, countries.currency_name),
                    currency_symbol = COALESCE(EXCLUDED.currency_symbol, countries.currency_symbol),
                    tld = COALESCE(EXCLUDED.tld, countries.tld),
                    native = COALESCE(EXCLUDED.native, countries.native),
                    region = COALESCE(EXCLUDED.region, countries.region),
                    region_id = COALESCE(EXCLUDED.region_id, countries.region_id),
                    subregion = COALESCE(EXCLUDED.subregion, countries.subregion),
                    subregion_id = COALESCE(EXCLUDED.subregion_id, countries.subregion_id),
                    nationality = COALESCE(EXCLUDED.nationality, countries.nationality),
                    timezones = COALESCE(EXCLUDED.timezones, countries.timezones),
                    latitude = COALESCE(EXCLUDED.latitude, countries.latitude),
                    longitude = COALESCE(EXCLUDED.longitude, countries.longitude),
                    emoji = COALESCE(EXCLUDED.emoji, countries.emoji),
                    emoji_u = COALESCE(EXCLUDED.emoji_u, countries.emoji_u)
                RETURNING *
                "#,
            )
            .bind(row.name.as_deref().unwrap_or_default().trim())
            .bind(row.iso2_upper())
            .bind(row.iso3_upper())
            .bind(row.numeric_code)
            .bind(row.phonecode)
            .bind(&row.capital)
            .bind(&row.currency)
            .bind(&row.currency_name)
            .bind(&row.currency_symbol)
            .bind(&row.tld)
            .bind(&row.native)
            .bind(&row.region)
            .bind(row.region_id)
            .bind(&row.subregion)
            .bind(row.subregion_id)
            .bind(&row.nationality)
            .bind(row.timezones())
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(&row.emoji)
            .bind(&row.emoji_u)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(country);
        }

        tx.commit().await?;
        info!(target: "catalog::geo", count = saved.len(), "countries upserted");
        Ok(saved)
    }

    /// States match within their country on the first key the row carries:
    /// iso3166_2, else iso2, else name. A miss on that key inserts.
    pub async fn upsert_states(
        &self,
        defaults: PlacementRefs<'_>,
        rows: &[StateUpsert],
    ) -> Result<Vec<State>> {
        let mut tx = self.pool.begin().await?;
        let defaults = resolve_defaults(&mut PgGeoDirectory::new(&mut tx), defaults).await?;
        let mut saved = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let prefix = row_prefix(index);
            let mut dir = PgGeoDirectory::new(&mut tx);
            let placement = resolve_placement(&mut dir, row.refs(), &defaults, &prefix).await?;
            let country = placement
                .country
                .ok_or_else(|| missing(&prefix, "country"))?;

            let name = row.name.as_deref().unwrap_or_default().trim().to_string();
            let iso2 = row.iso2_upper();
            let iso3166_2 = row.iso3166_2_upper();
            let scope = CountryScope::Id(country.id);
            let existing = dir.state_by(scope, state_upsert_key(&iso3166_2, &iso2, &name)).await?;

            if let Some(parent_id) = row.parent_id
                && !exists(&mut *tx, "states", parent_id).await?
            {
                return Err(CatalogError::invalid(
                    &format!("{prefix}.parent_id"),
                    "The selected parent id is invalid.",
                ));
            }

            let (country_code, country_name) = row.country_columns(&country);
            let state: State = match existing {
                Some(current) => sqlx::query_as(
                    r#"
                    UPDATE states SET
                        country_id = $1, country_code = $2, country_name = $3, name = $4,
                        iso2 = COALESCE($5, iso2), iso3166_2 = COALESCE($6, iso3166_2),
                        fips_code = COALESCE($7, fips_code), type = COALESCE($8, type),
                        level = COALESCE($9, level), parent_id = COALESCE($10, parent_id),
                        latitude = COALESCE($11, latitude), longitude = COALESCE($12, longitude),
                        timezone = COALESCE($13, timezone)
                    WHERE id = $14
                    RETURNING *
                    "#,
                )
                .bind(country.id)
                .bind(&country_code)
                .bind(&country_name)
                .bind(&name)
                .bind(&iso2)
                .bind(&iso3166_2)
                .bind(&row.fips_code)
                .bind(&row.kind)
                .bind(row.level)
                .bind(row.parent_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(&row.timezone)
                .bind(current.id)
                .fetch_one(&mut *tx)
                .await?,
                None => sqlx::query_as(
                    r#"
                    INSERT INTO states (
                        country_id, country_code, country_name, name, iso2, iso3166_2,
                        fips_code, type, level, parent_id, latitude, longitude, timezone
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    RETURNING *
                    "#,
                )
                .bind(country.id)
                .bind(&country_code)
                .bind(&country_name)
                .bind(&name)
                .bind(&iso2)
                .bind(&iso3166_2)
                .bind(&row.fips_code)
                .bind(&row.kind)
                .bind(row.level)
                .bind(row.parent_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(&row.timezone)
                .fetch_one(&mut *tx)
                .await?,
            };
            saved.push(state);
        }

        tx.commit().await?;
        info!(target: "catalog::geo", count = saved.len(), "states upserted");
        Ok(saved)
    }

    pub async fn upsert_cities(
        &self,
        defaults: PlacementRefs<'_>,
        rows: &[CityUpsert],
    ) -> Result<Vec<CityDistrict>> {
        let mut tx = self.pool.begin().await?;
        let defaults = resolve_defaults(&mut PgGeoDirectory::new(&mut tx), defaults).await?;
        let mut saved = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let prefix = row_prefix(index);
            let (country_id, state_id) =
                place_in_state(&mut tx, row.refs(), &defaults, &prefix).await?;
            let name = row.name.as_deref().unwrap_or_default().trim();

            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM city_districts WHERE state_id = $1 AND lower(name) = lower($2) \
                 ORDER BY id LIMIT 1",
            )
            .bind(state_id)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            let city: CityDistrict = match existing {
                Some(id) => sqlx::query_as(
                    r#"
                    UPDATE city_districts SET
                        country_id = $1, name = $2, type = COALESCE($3, type),
                        wikidata_id = COALESCE($4, wikidata_id),
                        latitude = COALESCE($5, latitude), longitude = COALESCE($6, longitude),
                        population = COALESCE($7, population)
                    WHERE id = $8
                    RETURNING *
                    "#,
                )
                .bind(country_id)
                .bind(name)
                .bind(&row.kind)
                .bind(&row.wikidata_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(row.population)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?,
                None => sqlx::query_as(
                    r#"
                    INSERT INTO city_districts (
                        country_id, state_id, name, type, wikidata_id, latitude, longitude,
                        population
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING *
                    "#,
                )
                .bind(country_id)
                .bind(state_id)
                .bind(name)
                .bind(&row.kind)
                .bind(&row.wikidata_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(row.population)
                .fetch_one(&mut *tx)
                .await?,
            };
            saved.push(city);
        }

        tx.commit().await?;
        info!(target: "catalog::geo", count = saved.len(), "cities upserted");
        Ok(saved)
    }

    /// A row's `city` is looked up by name inside the row's state.
    pub async fn upsert_towns(
        &self,
        defaults: PlacementRefs<'_>,
        rows: &[TownUpsert],
    ) -> Result<Vec<Town>> {
        let mut tx = self.pool.begin().await?;
        let defaults = resolve_defaults(&mut PgGeoDirectory::new(&mut tx), defaults).await?;
        let mut saved = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let prefix = row_prefix(index);
            let (country_id, state_id) =
                place_in_state(&mut tx, row.refs(), &defaults, &prefix).await?;
            let name = row.name.as_deref().unwrap_or_default().trim();

            let city_district_id = match (row.city_district_id, search_term(row.city.as_deref())) {
                (Some(id), _) => {
                    if !exists(&mut *tx, "city_districts", id).await? {
                        return Err(CatalogError::invalid(
                            &format!("{prefix}.city_district_id"),
                            "The selected city district id is invalid.",
                        ));
                    }
                    Some(id)
                }
                (None, Some(city)) => Some(
                    sqlx::query_scalar::<_, i64>(
                        "SELECT id FROM city_districts WHERE state_id = $1 \
                         AND lower(name) = lower($2) ORDER BY id LIMIT 1",
                    )
                    .bind(state_id)
                    .bind(&city)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| missing(&prefix, "city"))?,
                ),
                (None, None) => None,
            };

            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM towns WHERE state_id = $1 AND lower(name) = lower($2) \
                 ORDER BY id LIMIT 1",
            )
            .bind(state_id)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            let town: Town = match existing {
                Some(id) => sqlx::query_as(
                    r#"
                    UPDATE towns SET
                        country_id = $1, name = $2,
                        city_district_id = COALESCE($3, city_district_id),
                        wikidata_id = COALESCE($4, wikidata_id),
                        latitude = COALESCE($5, latitude), longitude = COALESCE($6, longitude),
                        population = COALESCE($7, population)
                    WHERE id = $8
                    RETURNING *
                    "#,
                )
                .bind(country_id)
                .bind(name)
                .bind(city_district_id)
                .bind(&row.wikidata_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(row.population)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?,
                None => sqlx::query_as(
                    r#"
                    INSERT INTO towns (
                        country_id, state_id, city_district_id, name, wikidata_id, latitude,
                        longitude, population
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING *
                    "#,
                )
                .bind(country_id)
                .bind(state_id)
                .bind(city_district_id)
                .bind(name)
                .bind(&row.wikidata_id)
                .bind(row.latitude)
                .bind(row.longitude)
                .bind(row.population)
                .fetch_one(&mut *tx)
                .await?,
            };
            saved.push(town);
        }

        tx.commit().await?;
        info!(target: "catalog::geo", count = saved.len(), "towns upserted");
        Ok(saved)
    }
}

/// Country and state ids for a city or town row. Both are required.
async fn place_in_state(
    conn: &mut PgConnection,
    refs: PlacementRefs<'_>,
    defaults: &GeoDefaults,
    prefix: &str,
) -> Result<(i64, i64)> {
    let placement =
        resolve_placement(&mut PgGeoDirectory::new(conn), refs, defaults, prefix).await?;
    let state = placement
        .state
        .as_ref()
        .ok_or_else(|| missing(prefix, "state"))?;
    let country_id = placement
        .country_id()
        .ok_or_else(|| missing(prefix, "country"))?;
    Ok((country_id, state.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_upsert_matches_on_the_first_key_present() {
        let full = Some("IN-KL".to_string());
        let short = Some("KL".to_string());
        assert_eq!(
            state_upsert_key(&full, &short, "Kerala"),
            StateKey::Iso3166_2("IN-KL")
        );
        assert_eq!(state_upsert_key(&None, &short, "Kerala"), StateKey::Iso2("KL"));
        assert_eq!(state_upsert_key(&None, &None, "Kerala"), StateKey::Name("Kerala"));
    }
}
