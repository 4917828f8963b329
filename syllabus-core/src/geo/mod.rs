//! Geographic reference data: countries, states, cities/districts and towns.

pub mod models;
pub mod requests;
pub mod resolver;
pub mod token;

pub use models::{
    CityDistrict, Country, CountryBrief, CountryWithCounts, State, StateWithCounts, Town,
};
pub use requests::{
    BulkPayload, CityListQuery, CityUpsert, CountryListQuery, CountryUpsert, GeoSearchQuery,
    GeoSearchResults, StateListQuery, StateUpsert, TownListQuery, TownUpsert,
};
pub use resolver::{
    CountryKey, CountryScope, GeoDefaults, GeoDirectory, GeoPlacement, PlacementRefs,
    StateKey, country_scope, resolve_country, resolve_defaults, resolve_placement,
    resolve_state,
};
pub use token::GeoToken;
