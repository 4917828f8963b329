use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub iso2: String,
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

/// Country listing row; counts are only selected when asked for.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CountryWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub country: Country,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cities_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub towns_count: Option<i64>,
}

/// The country echoed in state listing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryBrief {
    pub id: i64,
    pub name: String,
    pub iso2: String,
}

impl From<&Country> for CountryBrief {
    fn from(country: &Country) -> Self {
        Self {
            id: country.id,
            name: country.name.clone(),
            iso2: country.iso2.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct State {
    pub id: i64,
    pub country_id: i64,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub name: String,
    pub iso2: Option<String>,
    pub iso3166_2: Option<String>,
    pub fips_code: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub level: Option<i32>,
    pub parent_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StateWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub state: State,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cities_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub towns_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CityDistrict {
    pub id: i64,
    pub country_id: i64,
    pub state_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub wikidata_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Town {
    pub id: i64,
    pub country_id: i64,
    pub state_id: i64,
    pub city_district_id: Option<i64>,
    pub name: String,
    pub wikidata_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
}
