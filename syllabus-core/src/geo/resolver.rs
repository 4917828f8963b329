//! Resolve free-form geo identifiers to stored records.
//!
//! A token is classified once ([`GeoToken`]) and then tried against a fixed
//! sequence of lookups; the first hit wins. State lookups are always run
//! inside an explicit [`CountryScope`].

use async_trait::async_trait;

use super::models::{Country, State};
use super::token::GeoToken;
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryKey<'a> {
    Id(i64),
    NumericCode(i64),
    Iso2(&'a str),
    Iso3(&'a str),
    /// Case-insensitive exact name.
    Name(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey<'a> {
    Id(i64),
    Iso3166_2(&'a str),
    Iso2(&'a str),
    /// Case-insensitive exact name.
    Name(&'a str),
    /// Case-insensitive substring; the first by name then id wins.
    NameContains(&'a str),
}

/// Which states a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryScope {
    Any,
    Id(i64),
}

impl CountryScope {
    pub fn country_id(&self) -> Option<i64> {
        match self {
            CountryScope::Any => None,
            CountryScope::Id(id) => Some(*id),
        }
    }
}

/// Lookup seam over the geo tables.
#[async_trait]
pub trait GeoDirectory: Send {
    async fn country_by(&mut self, key: CountryKey<'_>) -> Result<Option<Country>>;

    async fn state_by(&mut self, scope: CountryScope, key: StateKey<'_>)
    -> Result<Option<State>>;
}

/// Numeric tokens match `numeric_code`; codes try iso2, iso3 and then the
/// name; anything else is a name.
pub async fn resolve_country<D>(dir: &mut D, raw: &str) -> Result<Option<Country>>
where
    D: GeoDirectory + ?Sized,
{
    let Some(token) = GeoToken::parse(raw) else {
        return Ok(None);
    };

    let keys = match &token {
        GeoToken::Numeric { value, .. } => vec![CountryKey::NumericCode(*value)],
        GeoToken::Code { code, text } => vec![
            CountryKey::Iso2(code),
            CountryKey::Iso3(code),
            CountryKey::Name(text),
        ],
        GeoToken::Name(text) => vec![CountryKey::Name(text)],
    };

    for key in keys {
        if let Some(country) = dir.country_by(key).await? {
            return Ok(Some(country));
        }
    }
    Ok(None)
}

/// Numeric tokens try the primary key first and then fall through to the
/// code and name stages like any other token. Only name tokens get the
/// substring stage; a code that matches nothing is not found.
pub async fn resolve_state<D>(
    dir: &mut D,
    raw: &str,
    scope: CountryScope,
) -> Result<Option<State>>
where
    D: GeoDirectory + ?Sized,
{
    let Some(token) = GeoToken::parse(raw) else {
        return Ok(None);
    };

    let mut keys = Vec::with_capacity(5);
    match &token {
        GeoToken::Numeric { value, text } => {
            keys.push(StateKey::Id(*value));
            keys.push(StateKey::Iso3166_2(text));
            keys.push(StateKey::Iso2(text));
        }
        GeoToken::Code { code, .. } => {
            keys.push(StateKey::Iso3166_2(code));
            keys.push(StateKey::Iso2(code));
        }
        GeoToken::Name(_) => {}
    }
    keys.push(StateKey::Name(token.text()));
    if let GeoToken::Name(text) = &token {
        keys.push(StateKey::NameContains(text));
    }

    for key in keys {
        if let Some(state) = dir.state_by(scope, key).await? {
            return Ok(Some(state));
        }
    }
    Ok(None)
}

/// Turn an optional country token into a state scope.
///
/// Absent or blank input gives [`CountryScope::Any`]. `None` means a token
/// was supplied but matched no country; callers report that as not found
/// rather than widening the search.
pub async fn country_scope<D>(dir: &mut D, raw: Option<&str>) -> Result<Option<CountryScope>>
where
    D: GeoDirectory + ?Sized,
{
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(Some(CountryScope::Any)),
        Some(raw) => Ok(resolve_country(dir, raw)
            .await?
            .map(|country| CountryScope::Id(country.id))),
    }
}

/// Country/state references carried by one upsert row or by the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementRefs<'a> {
    pub country_id: Option<i64>,
    pub country: Option<&'a str>,
    pub state_id: Option<i64>,
    pub state: Option<&'a str>,
}

/// Request-level defaults, resolved once per bulk request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoDefaults {
    pub country: Option<Country>,
    pub state: Option<State>,
}

/// Where one upsert row lands.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPlacement {
    pub country: Option<Country>,
    pub state: Option<State>,
}

impl GeoPlacement {
    /// The state's country wins over any separately named country.
    pub fn country_id(&self) -> Option<i64> {
        self.state
            .as_ref()
            .map(|state| state.country_id)
            .or_else(|| self.country.as_ref().map(|country| country.id))
    }
}

fn unresolved(prefix: &str, field: &str) -> CatalogError {
    let path = if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    };
    CatalogError::invalid(&path, format!("{field} not resolved"))
}

async fn country_ref<D>(dir: &mut D, refs: &PlacementRefs<'_>, prefix: &str) -> Result<Option<Country>>
where
    D: GeoDirectory + ?Sized,
{
    if let Some(id) = refs.country_id {
        return match dir.country_by(CountryKey::Id(id)).await? {
            Some(country) => Ok(Some(country)),
            None => Err(unresolved(prefix, "country")),
        };
    }
    match refs.country.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => match resolve_country(dir, raw).await? {
            Some(country) => Ok(Some(country)),
            None => Err(unresolved(prefix, "country")),
        },
        None => Ok(None),
    }
}

async fn state_ref<D>(
    dir: &mut D,
    refs: &PlacementRefs<'_>,
    scope: CountryScope,
    prefix: &str,
) -> Result<Option<State>>
where
    D: GeoDirectory + ?Sized,
{
    if let Some(id) = refs.state_id {
        return match dir.state_by(scope, StateKey::Id(id)).await? {
            Some(state) => Ok(Some(state)),
            None => Err(unresolved(prefix, "state")),
        };
    }
    match refs.state.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => match resolve_state(dir, raw, scope).await? {
            Some(state) => Ok(Some(state)),
            None => Err(unresolved(prefix, "state")),
        },
        None => Ok(None),
    }
}

fn scope_of(country: Option<&Country>) -> CountryScope {
    country.map_or(CountryScope::Any, |country| CountryScope::Id(country.id))
}

/// Resolve the request-level `country`/`state` defaults. An explicit token
/// that matches nothing is an error.
pub async fn resolve_defaults<D>(dir: &mut D, refs: PlacementRefs<'_>) -> Result<GeoDefaults>
where
    D: GeoDirectory + ?Sized,
{
    let country = country_ref(dir, &refs, "").await?;
    let state = state_ref(dir, &refs, scope_of(country.as_ref()), "").await?;
    Ok(GeoDefaults { country, state })
}

/// Resolve one row's placement. Row references take precedence over the
/// defaults; a row state is looked up within the row's country, or the
/// default country when the row names none.
pub async fn resolve_placement<D>(
    dir: &mut D,
    row: PlacementRefs<'_>,
    defaults: &GeoDefaults,
    prefix: &str,
) -> Result<GeoPlacement>
where
    D: GeoDirectory + ?Sized,
{
    let country = match country_ref(dir, &row, prefix).await? {
        Some(country) => Some(country),
        None => defaults.country.clone(),
    };
    let state = match state_ref(dir, &row, scope_of(country.as_ref()), prefix).await? {
        Some(state) => Some(state),
        None => defaults.state.clone(),
    };
    Ok(GeoPlacement { country, state })
}

/// Error for a row that ended up without the scope its table needs.
pub fn missing(prefix: &str, field: &str) -> CatalogError {
    unresolved(prefix, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct FakeDirectory {
        countries: Vec<Country>,
        states: Vec<State>,
    }

    fn same(a: &Option<String>, b: &str) -> bool {
        a.as_deref() == Some(b)
    }

    #[async_trait]
    impl GeoDirectory for FakeDirectory {
        async fn country_by(&mut self, key: CountryKey<'_>) -> Result<Option<Country>> {
            let found = self.countries.iter().find(|c| match key {
                CountryKey::Id(id) => c.id == id,
                CountryKey::NumericCode(code) => c.numeric_code == Some(code as i32),
                CountryKey::Iso2(code) => c.iso2 == code,
                CountryKey::Iso3(code) => same(&c.iso3, code),
                CountryKey::Name(name) => c.name.eq_ignore_ascii_case(name),
            });
            Ok(found.cloned())
        }

        async fn state_by(
            &mut self,
            scope: CountryScope,
            key: StateKey<'_>,
        ) -> Result<Option<State>> {
            let mut candidates: Vec<&State> = self
                .states
                .iter()
                .filter(|s| scope.country_id().is_none_or(|id| s.country_id == id))
                .filter(|s| match key {
                    StateKey::Id(id) => s.id == id,
                    StateKey::Iso3166_2(code) => same(&s.iso3166_2, code),
                    StateKey::Iso2(code) => same(&s.iso2, code),
                    StateKey::Name(name) => s.name.eq_ignore_ascii_case(name),
                    StateKey::NameContains(part) => s
                        .name
                        .to_lowercase()
                        .contains(&part.to_lowercase()),
                })
                .collect();
            candidates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            Ok(candidates.first().map(|s| (*s).clone()))
        }
    }

    fn country(id: i64, name: &str, iso2: &str, iso3: &str, numeric: i32) -> Country {
        Country {
            id,
            name: name.into(),
            iso2: iso2.into(),
            iso3: Some(iso3.into()),
            numeric_code: Some(numeric),
            ..Country::default()
        }
    }

    fn state(id: i64, country_id: i64, name: &str, iso2: &str, full: &str) -> State {
        State {
            id,
            country_id,
            name: name.into(),
            iso2: Some(iso2.into()),
            iso3166_2: Some(full.into()),
            ..State::default()
        }
    }

    fn directory() -> FakeDirectory {
        FakeDirectory {
            countries: vec![
                country(101, "India", "IN", "IND", 356),
                country(233, "United States", "US", "USA", 840),
                country(158, "New Zealand", "NZ", "NZL", 554),
            ],
            states: vec![
                state(4026, 101, "Karnataka", "KA", "IN-KA"),
                state(4030, 101, "Kerala", "KL", "IN-KL"),
                state(1450, 233, "Kansas", "KS", "US-KS"),
                state(1452, 233, "Arkansas", "AR", "US-AR"),
                state(1400, 233, "Alaska", "AK", "US-AK"),
                state(1447, 233, "North Carolina", "NC", "US-NC"),
                state(1455, 233, "South Carolina", "SC", "US-SC"),
            ],
        }
    }

    #[tokio::test]
    async fn code_name_and_numeric_resolve_the_same_country() {
        let mut dir = directory();
        for raw in ["IN", "in", "IND", "India", "india", "356", " 356 "] {
            let found = resolve_country(&mut dir, raw).await.unwrap();
            assert_eq!(found.map(|c| c.id), Some(101), "token {raw:?}");
        }
        let nz = resolve_country(&mut dir, "new zealand").await.unwrap();
        assert_eq!(nz.map(|c| c.id), Some(158));
        assert!(resolve_country(&mut dir, "Atlantis").await.unwrap().is_none());
        assert!(resolve_country(&mut dir, "  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_lookup_respects_country_scope() {
        let mut dir = directory();
        let india = resolve_state(&mut dir, "KA", CountryScope::Id(101)).await.unwrap();
        assert_eq!(india.map(|s| s.id), Some(4026));

        let usa = resolve_state(&mut dir, "KA", CountryScope::Id(233)).await.unwrap();
        assert_eq!(usa, None);

        let full = resolve_state(&mut dir, "in-kl", CountryScope::Any).await.unwrap();
        assert_eq!(full.map(|s| s.id), Some(4030));
    }

    #[tokio::test]
    async fn numeric_state_prefers_primary_key_within_scope() {
        let mut dir = directory();
        let hit = resolve_state(&mut dir, "1450", CountryScope::Id(233)).await.unwrap();
        assert_eq!(hit.map(|s| s.name), Some("Kansas".to_string()));

        let miss = resolve_state(&mut dir, "1450", CountryScope::Id(101)).await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn substring_match_is_ordered_by_name() {
        let mut dir = directory();
        let hit = resolve_state(&mut dir, "h Carolina", CountryScope::Id(233)).await.unwrap();
        assert_eq!(hit.map(|s| s.name), Some("North Carolina".to_string()));
    }

    #[tokio::test]
    async fn codes_never_match_by_substring() {
        let mut dir = directory();
        // Alaska and Arkansas both contain "ka".
        for raw in ["KA", "ka", "in-ka", "ansas"] {
            let hit = resolve_state(&mut dir, raw, CountryScope::Id(233)).await.unwrap();
            assert_eq!(hit, None, "token {raw:?}");
        }
        let exact = resolve_state(&mut dir, "alaska", CountryScope::Id(233)).await.unwrap();
        assert_eq!(exact.map(|s| s.id), Some(1400));
    }

    #[tokio::test]
    async fn unknown_scope_token_is_not_widened() {
        let mut dir = directory();
        assert_eq!(
            country_scope(&mut dir, Some("Atlantis")).await.unwrap(),
            None
        );
        assert_eq!(
            country_scope(&mut dir, Some("  ")).await.unwrap(),
            Some(CountryScope::Any)
        );
        assert_eq!(
            country_scope(&mut dir, Some("US")).await.unwrap(),
            Some(CountryScope::Id(233))
        );
    }

    #[tokio::test]
    async fn row_references_override_defaults() {
        let mut dir = directory();
        let defaults = resolve_defaults(
            &mut dir,
            PlacementRefs {
                country: Some("IN"),
                state: Some("Karnataka"),
                ..PlacementRefs::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(defaults.state.as_ref().map(|s| s.id), Some(4026));

        let inherited = resolve_placement(&mut dir, PlacementRefs::default(), &defaults, "items.0")
            .await
            .unwrap();
        assert_eq!(inherited.country_id(), Some(101));
        assert_eq!(inherited.state.map(|s| s.id), Some(4026));

        let row = PlacementRefs {
            country: Some("US"),
            state: Some("KS"),
            ..PlacementRefs::default()
        };
        let own = resolve_placement(&mut dir, row, &defaults, "items.1")
            .await
            .unwrap();
        assert_eq!(own.country_id(), Some(233));
        assert_eq!(own.state.map(|s| s.id), Some(1450));
    }

    #[tokio::test]
    async fn state_alone_supplies_the_country() {
        let mut dir = directory();
        let row = PlacementRefs {
            state_id: Some(4030),
            ..PlacementRefs::default()
        };
        let placement = resolve_placement(&mut dir, row, &GeoDefaults::default(), "items.0")
            .await
            .unwrap();
        assert_eq!(placement.country, None);
        assert_eq!(placement.country_id(), Some(101));
    }

    #[tokio::test]
    async fn explicit_unknown_reference_is_reported_on_the_row() {
        let mut dir = directory();
        let row = PlacementRefs {
            country: Some("IN"),
            state: Some("Kansas"),
            ..PlacementRefs::default()
        };
        let err = resolve_placement(&mut dir, row, &GeoDefaults::default(), "items.3")
            .await
            .unwrap_err();
        match err {
            CatalogError::Validation(errors) => {
                assert_eq!(
                    errors.get("items.3.state"),
                    Some(&["state not resolved".to_string()][..])
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
