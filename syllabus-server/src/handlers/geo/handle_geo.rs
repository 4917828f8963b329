use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use syllabus_core::geo::{
    BulkPayload, CityDistrict, CityListQuery, CityUpsert, Country, CountryBrief,
    CountryListQuery, CountryUpsert, CountryWithCounts, GeoSearchQuery, GeoSearchResults,
    State as GeoState, StateListQuery, StateUpsert, StateWithCounts, Town, TownListQuery,
    TownUpsert,
};
use syllabus_core::query::PageMeta;

use crate::infra::{
    app_state::AppState,
    errors::ResultExt,
    extract::{ApiJson, ApiQuery},
    response::{ApiResponse, ApiResult},
};

/// State listings echo the resolved country next to the pagination.
#[derive(Debug, Serialize)]
struct StateListMeta {
    #[serde(flatten)]
    page: PageMeta,
    country: CountryBrief,
}

/// Served from the country cache; stale for up to the configured TTL.
pub async fn list_countries_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CountryListQuery>,
) -> ApiResult<Vec<CountryWithCounts>> {
    let geo = state.db.geo();
    let page = state
        .countries
        .get_or_load(query.cache_key(), || geo.list_countries(&query))
        .await
        .or_fail("retrieve countries")?;
    Ok(ApiResponse::page(Arc::unwrap_or_clone(page)))
}

/// `country` is required and resolved by id, ISO code or name.
pub async fn list_states_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StateListQuery>,
) -> ApiResult<Vec<StateWithCounts>> {
    let (country, page) = state
        .db
        .geo()
        .list_states(&query)
        .await
        .or_fail("retrieve states")?;
    let meta = StateListMeta {
        page: page.meta,
        country,
    };
    Ok(ApiResponse::success(page.items).with_meta(meta))
}

pub async fn list_cities_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CityListQuery>,
) -> ApiResult<Vec<CityDistrict>> {
    let page = state
        .db
        .geo()
        .list_cities(&query)
        .await
        .or_fail("retrieve cities")?;
    Ok(ApiResponse::page(page))
}

pub async fn list_towns_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TownListQuery>,
) -> ApiResult<Vec<Town>> {
    let page = state
        .db
        .geo()
        .list_towns(&query)
        .await
        .or_fail("retrieve towns")?;
    Ok(ApiResponse::page(page))
}

pub async fn search_geo_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GeoSearchQuery>,
) -> ApiResult<GeoSearchResults> {
    let (term, limit) = query.checked()?;
    let results = state
        .db
        .geo()
        .search(&term, limit)
        .await
        .or_fail("search geo records")?;
    Ok(ApiResponse::success(results))
}

fn upserted<T: Serialize>(rows: Vec<T>) -> ApiResponse<Vec<T>> {
    let count = rows.len();
    ApiResponse::created(rows).with_meta(json!({ "count": count }))
}

pub async fn upsert_countries_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Vec<Country>> {
    let payload = BulkPayload::parse(body, &[])?;
    let rows = payload.rows::<CountryUpsert>()?;
    let saved = state
        .db
        .geo()
        .upsert_countries(&rows)
        .await
        .or_fail("upsert countries")?;
    Ok(upserted(saved))
}

/// Body-level `country` applies to rows that name none.
pub async fn upsert_states_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Vec<GeoState>> {
    let payload = BulkPayload::parse(body, &["country"])?;
    let rows = payload.rows::<StateUpsert>()?;
    let saved = state
        .db
        .geo()
        .upsert_states(payload.defaults(), &rows)
        .await
        .or_fail("upsert states")?;
    Ok(upserted(saved))
}

pub async fn upsert_cities_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Vec<CityDistrict>> {
    let payload = BulkPayload::parse(body, &["country", "state"])?;
    let rows = payload.rows::<CityUpsert>()?;
    let saved = state
        .db
        .geo()
        .upsert_cities(payload.defaults(), &rows)
        .await
        .or_fail("upsert cities")?;
    Ok(upserted(saved))
}

pub async fn upsert_towns_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Vec<Town>> {
    let payload = BulkPayload::parse(body, &["country", "state"])?;
    let rows = payload.rows::<TownUpsert>()?;
    let saved = state
        .db
        .geo()
        .upsert_towns(payload.defaults(), &rows)
        .await
        .or_fail("upsert towns")?;
    Ok(upserted(saved))
}
