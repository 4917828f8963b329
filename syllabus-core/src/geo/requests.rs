//! Geo query strings and bulk upsert payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::models::{CityDistrict, Country, State, Town};
use super::resolver::PlacementRefs;
use crate::query::{PageLimits, PageRequest};
use crate::serde_ext::{blank_as_none, lenient_bool, token_text};
use crate::validation::{Validate, ValidationErrors, Validator};

pub const COUNTRY_PAGE: PageLimits = PageLimits::new(100, 200);
pub const STATE_PAGE: PageLimits = PageLimits::new(200, 500);
pub const CITY_PAGE: PageLimits = PageLimits::new(100, 500);
pub const TOWN_PAGE: PageLimits = PageLimits::new(100, 500);

pub const SEARCH_MIN_CHARS: usize = 2;
pub const SEARCH_DEFAULT_LIMIT: i64 = 10;
pub const SEARCH_MAX_LIMIT: i64 = 50;

const NAME_MAX: usize = 200;
const WIKIDATA_MAX: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryListQuery {
    pub q: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub with_counts: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl CountryListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, COUNTRY_PAGE)
    }

    /// Equivalent queries share a key: text is trimmed and lowercased and
    /// paging is taken after clamping.
    pub fn cache_key(&self) -> String {
        let norm = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_default()
        };
        let page = self.page_request();
        format!(
            "q={}|region={}|subregion={}|counts={}|page={}|per_page={}",
            norm(&self.q),
            norm(&self.region),
            norm(&self.subregion),
            self.with_counts.unwrap_or(false),
            page.page,
            page.per_page
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateListQuery {
    pub country: Option<String>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub with_counts: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityListQuery {
    pub country: Option<String>,
    pub state: Option<String>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TownListQuery {
    pub country: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub city_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_pop: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_pop: Option<i64>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoSearchQuery {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<i64>,
}

impl GeoSearchQuery {
    /// Trimmed term and clamped per-table limit.
    pub fn checked(&self) -> Result<(String, i64), ValidationErrors> {
        let term = self.q.as_deref().map(str::trim).unwrap_or_default();
        if term.chars().count() < SEARCH_MIN_CHARS {
            return Err(ValidationErrors::single(
                "q",
                format!("The q must be at least {SEARCH_MIN_CHARS} characters."),
            ));
        }
        let limit = self
            .limit
            .unwrap_or(SEARCH_DEFAULT_LIMIT)
            .clamp(1, SEARCH_MAX_LIMIT);
        Ok((term.to_string(), limit))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoSearchResults {
    pub countries: Vec<Country>,
    pub states: Vec<State>,
    pub cities: Vec<CityDistrict>,
    pub towns: Vec<Town>,
}

/// A bulk upsert body: one object, `{"items": [...]}` or a bare array.
///
/// Request-level `country`/`state` keys become defaults for every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkPayload {
    pub country: Option<String>,
    pub state: Option<String>,
    pub items: Vec<Value>,
}

fn take_token(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl BulkPayload {
    /// Split a body into defaults and rows. `default_keys` names which of
    /// `country`/`state` act as request-level defaults for this table.
    pub fn parse(body: Value, default_keys: &[&str]) -> Result<Self, ValidationErrors> {
        let mut payload = BulkPayload::default();
        let mut object = match body {
            Value::Array(items) => {
                payload.items = items;
                return payload.non_empty();
            }
            Value::Object(object) => object,
            _ => {
                return Err(ValidationErrors::single(
                    "items",
                    "The payload must be an object or an array of objects.",
                ));
            }
        };

        if default_keys.contains(&"country") {
            payload.country = take_token(&mut object, "country");
        }
        if default_keys.contains(&"state") {
            payload.state = take_token(&mut object, "state");
        }

        payload.items = match object.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ValidationErrors::single(
                    "items",
                    "The items must be an array.",
                ));
            }
            None => vec![Value::Object(object)],
        };
        payload.non_empty()
    }

    fn non_empty(self) -> Result<Self, ValidationErrors> {
        if self.items.is_empty() {
            return Err(ValidationErrors::single(
                "items",
                "The items field is required.",
            ));
        }
        Ok(self)
    }

    pub fn defaults(&self) -> PlacementRefs<'_> {
        PlacementRefs {
            country: self.country.as_deref(),
            state: self.state.as_deref(),
            ..PlacementRefs::default()
        }
    }

    /// Deserialize and validate every row, collecting failures under
    /// `items.<index>.<field>`.
    pub fn rows<T>(&self) -> Result<Vec<T>, ValidationErrors>
    where
        T: DeserializeOwned + Validate,
    {
        let mut errors = ValidationErrors::new();
        let mut rows = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let prefix = format!("items.{index}");
            if !item.is_object() {
                errors.add(&prefix, "Each item must be an object.");
                continue;
            }
            match serde_json::from_value::<T>(item.clone()) {
                Ok(row) => {
                    if let Err(row_errors) = row.validate() {
                        errors.merge_prefixed(&prefix, row_errors);
                    }
                    rows.push(row);
                }
                Err(err) => errors.add(&prefix, format!("The item is malformed: {err}")),
            }
        }
        errors.into_result().map(|()| rows)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryUpsert {
    pub name: Option<String>,
    pub iso2: Option<String>,
    pub iso3: Option<String>,
    pub numeric_code: Option<i32>,
    pub phonecode: Option<i32>,
    pub capital: Option<String>,
    pub currency: Option<String>,
    pub currency_name: Option<String>,
    pub currency_symbol: Option<String>,
    pub tld: Option<String>,
    pub native: Option<String>,
    pub region: Option<String>,
    pub region_id: Option<i64>,
    pub subregion: Option<String>,
    pub subregion_id: Option<i64>,
    pub nationality: Option<String>,
    pub timezones: Option<Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub emoji: Option<String>,
    #[serde(rename = "emojiU")]
    pub emoji_u: Option<String>,
}

impl Validate for CountryUpsert {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.required_exact("iso2", self.iso2.as_deref(), 2);
        v.required_exact("iso3", self.iso3.as_deref(), 3);
        v.optional_text("capital", self.capital.as_deref(), 200);
        v.optional_text("currency", self.currency.as_deref(), 50);
        v.optional_text("currency_name", self.currency_name.as_deref(), 100);
        v.optional_text("currency_symbol", self.currency_symbol.as_deref(), 20);
        v.optional_text("tld", self.tld.as_deref(), 20);
        v.optional_text("native", self.native.as_deref(), 200);
        v.optional_text("region", self.region.as_deref(), 100);
        v.optional_text("subregion", self.subregion.as_deref(), 100);
        v.optional_text("nationality", self.nationality.as_deref(), 120);
        v.optional_text("emoji", self.emoji.as_deref(), 10);
        v.optional_text("emojiU", self.emoji_u.as_deref(), 20);
        v.finish()
    }
}

impl CountryUpsert {
    pub fn iso2_upper(&self) -> String {
        upper(self.iso2.as_deref()).unwrap_or_default()
    }

    pub fn iso3_upper(&self) -> Option<String> {
        upper(self.iso3.as_deref())
    }

    /// Timezones as stored: a JSON-encoded string is decoded, anything else
    /// is kept as sent.
    pub fn timezones(&self) -> Option<Value> {
        match &self.timezones {
            Some(Value::String(raw)) => Some(
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
            ),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.clone()),
        }
    }
}

fn upper(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_ascii_uppercase)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateUpsert {
    pub name: Option<String>,
    pub iso2: Option<String>,
    pub iso3166_2: Option<String>,
    pub fips_code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub level: Option<i32>,
    pub parent_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "token_text")]
    pub country: Option<String>,
    pub country_id: Option<i64>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

impl Validate for StateUpsert {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("iso2", self.iso2.as_deref(), 20);
        v.optional_text("iso3166_2", self.iso3166_2.as_deref(), 20);
        v.optional_text("fips_code", self.fips_code.as_deref(), 10);
        v.optional_text("type", self.kind.as_deref(), 100);
        v.optional_text("timezone", self.timezone.as_deref(), 64);
        v.exact_chars("country_code", self.country_code.as_deref(), 2);
        v.optional_text("country_name", self.country_name.as_deref(), NAME_MAX);
        v.min("parent_id", self.parent_id, 1);
        v.min("country_id", self.country_id, 1);
        v.finish()
    }
}

impl StateUpsert {
    pub fn refs(&self) -> PlacementRefs<'_> {
        PlacementRefs {
            country_id: self.country_id,
            country: self.country.as_deref(),
            ..PlacementRefs::default()
        }
    }

    pub fn iso2_upper(&self) -> Option<String> {
        upper(self.iso2.as_deref())
    }

    pub fn iso3166_2_upper(&self) -> Option<String> {
        upper(self.iso3166_2.as_deref())
    }

    /// Denormalized country columns, filled from `country` when not sent.
    pub fn country_columns(&self, country: &Country) -> (String, String) {
        let code = upper(self.country_code.as_deref()).unwrap_or_else(|| country.iso2.clone());
        let name = self
            .country_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| country.name.clone(), str::to_string);
        (code, name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityUpsert {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub wikidata_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
    #[serde(default, deserialize_with = "token_text")]
    pub country: Option<String>,
    pub country_id: Option<i64>,
    #[serde(default, deserialize_with = "token_text")]
    pub state: Option<String>,
    pub state_id: Option<i64>,
}

impl Validate for CityUpsert {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("type", self.kind.as_deref(), 100);
        v.optional_text("wikidata_id", self.wikidata_id.as_deref(), WIKIDATA_MAX);
        v.min("population", self.population, 0);
        v.finish()
    }
}

impl CityUpsert {
    pub fn refs(&self) -> PlacementRefs<'_> {
        PlacementRefs {
            country_id: self.country_id,
            country: self.country.as_deref(),
            state_id: self.state_id,
            state: self.state.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TownUpsert {
    pub name: Option<String>,
    pub wikidata_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
    pub city_district_id: Option<i64>,
    /// City/district name, looked up within the row's state.
    pub city: Option<String>,
    #[serde(default, deserialize_with = "token_text")]
    pub country: Option<String>,
    pub country_id: Option<i64>,
    #[serde(default, deserialize_with = "token_text")]
    pub state: Option<String>,
    pub state_id: Option<i64>,
}

impl Validate for TownUpsert {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("wikidata_id", self.wikidata_id.as_deref(), WIKIDATA_MAX);
        v.optional_text("city", self.city.as_deref(), NAME_MAX);
        v.min("population", self.population, 0);
        v.min("city_district_id", self.city_district_id, 1);
        v.finish()
    }
}

impl TownUpsert {
    pub fn refs(&self) -> PlacementRefs<'_> {
        PlacementRefs {
            country_id: self.country_id,
            country: self.country.as_deref(),
            state_id: self.state_id,
            state: self.state.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_shapes_are_equivalent() {
        let single = BulkPayload::parse(json!({"name": "Mysuru", "state": "KA"}), &["country", "state"])
            .unwrap();
        assert_eq!(single.state.as_deref(), Some("KA"));
        assert_eq!(single.items, vec![json!({"name": "Mysuru"})]);

        let wrapped = BulkPayload::parse(
            json!({"country": 101, "items": [{"name": "A"}, {"name": "B"}]}),
            &["country"],
        )
        .unwrap();
        assert_eq!(wrapped.country.as_deref(), Some("101"));
        assert_eq!(wrapped.items.len(), 2);

        let raw = BulkPayload::parse(json!([{"name": "A"}]), &[]).unwrap();
        assert_eq!(raw.items.len(), 1);
        assert_eq!(raw.country, None);
    }

    #[test]
    fn country_rows_keep_their_country_key() {
        let payload = BulkPayload::parse(json!({"name": "India", "iso2": "in"}), &[]).unwrap();
        assert_eq!(payload.items[0]["iso2"], json!("in"));
    }

    #[test]
    fn bad_payloads_are_rejected() {
        assert!(BulkPayload::parse(json!("nope"), &[]).is_err());
        assert!(BulkPayload::parse(json!([]), &[]).is_err());
        assert!(BulkPayload::parse(json!({"items": 3}), &[]).is_err());
    }

    #[test]
    fn row_errors_are_indexed() {
        let payload = BulkPayload::parse(
            json!([
                {"name": "India", "iso2": "IN", "iso3": "IND"},
                {"name": "Nowhere", "iso2": "XYZ"},
                "not an object",
                {"name": "Bad", "iso2": "BD", "iso3": "BGD", "numeric_code": "x"}
            ]),
            &[],
        )
        .unwrap();
        let errors = payload.rows::<CountryUpsert>().unwrap_err();
        assert!(!errors.contains("items.0.name"));
        assert!(errors.contains("items.1.iso2"));
        assert!(errors.contains("items.1.iso3"));
        assert!(errors.contains("items.2"));
        assert!(errors.contains("items.3"));
    }

    #[test]
    fn timezones_accept_encoded_json() {
        let row: CountryUpsert = serde_json::from_value(json!({
            "timezones": "[{\"zoneName\":\"Asia/Kolkata\"}]"
        }))
        .unwrap();
        assert_eq!(row.timezones(), Some(json!([{"zoneName": "Asia/Kolkata"}])));
    }

    #[test]
    fn state_country_columns_are_hydrated() {
        let india = Country {
            id: 101,
            name: "India".into(),
            iso2: "IN".into(),
            ..Country::default()
        };
        let row: StateUpsert = serde_json::from_value(json!({"name": "Goa"})).unwrap();
        assert_eq!(row.country_columns(&india), ("IN".to_string(), "India".to_string()));

        let explicit: StateUpsert =
            serde_json::from_value(json!({"name": "Goa", "country_code": "in"})).unwrap();
        assert_eq!(explicit.country_columns(&india).0, "IN");
    }

    #[test]
    fn search_requires_two_characters() {
        let short = GeoSearchQuery {
            q: Some(" a ".into()),
            limit: None,
        };
        assert!(short.checked().is_err());

        let ok = GeoSearchQuery {
            q: Some("ka".into()),
            limit: Some(500),
        };
        assert_eq!(ok.checked().unwrap(), ("ka".to_string(), SEARCH_MAX_LIMIT));
    }

    #[test]
    fn cache_key_normalizes_text_and_paging() {
        let a = CountryListQuery {
            q: Some(" India ".into()),
            per_page: Some(1000),
            ..CountryListQuery::default()
        };
        let b = CountryListQuery {
            q: Some("india".into()),
            per_page: Some(200),
            page: Some(1),
            ..CountryListQuery::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
