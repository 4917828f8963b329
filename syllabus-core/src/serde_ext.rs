//! Deserialization helpers shared by request payloads and query strings.

use serde::{Deserialize, Deserializer, de::Error as _};

/// Distinguish an absent key (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Parse a boolean the way form and query inputs send them.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accept `true`/`false`, `0`/`1` and their string forms. Blank strings and
/// `null` read as absent.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BoolLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolLike::Bool(value)) => Ok(Some(value)),
        Some(BoolLike::Int(0)) => Ok(Some(false)),
        Some(BoolLike::Int(1)) => Ok(Some(true)),
        Some(BoolLike::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(BoolLike::Text(text)) => parse_bool(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid boolean value '{text}'"))),
        Some(BoolLike::Int(other)) => Err(D::Error::custom(format!(
            "invalid boolean value '{other}'"
        ))),
    }
}

/// Query-string integer that tolerates a blank value.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntLike {
        Int(i64),
        Text(String),
    }

    match Option::<IntLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntLike::Int(value)) => Ok(Some(value)),
        Some(IntLike::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(IntLike::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid integer value '{text}'"))),
    }
}

/// Geo reference that may arrive as a string (`"IN"`) or a number (`101`).
pub fn token_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TokenLike {
        Int(i64),
        Text(String),
    }

    Ok(
        match Option::<TokenLike>::deserialize(deserializer)? {
            None => None,
            Some(TokenLike::Int(value)) => Some(value.to_string()),
            Some(TokenLike::Text(text)) if text.trim().is_empty() => None,
            Some(TokenLike::Text(text)) => Some(text.trim().to_string()),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
        #[serde(default, deserialize_with = "lenient_bool")]
        is_active: Option<bool>,
    }

    #[test]
    fn double_option_separates_null_from_missing() {
        let absent: Patch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.description, None);

        let cleared: Patch =
            serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch =
            serde_json::from_value(json!({"description": "Intro"})).unwrap();
        assert_eq!(set.description, Some(Some("Intro".to_string())));
    }

    #[test]
    fn lenient_bool_accepts_common_forms() {
        for (input, expected) in [
            (json!(true), Some(true)),
            (json!(0), Some(false)),
            (json!("1"), Some(true)),
            (json!("false"), Some(false)),
            (json!(""), None),
            (json!(null), None),
        ] {
            let patch: Patch =
                serde_json::from_value(json!({ "is_active": input })).unwrap();
            assert_eq!(patch.is_active, expected);
        }

        let err = serde_json::from_value::<Patch>(json!({"is_active": 7}));
        assert!(err.is_err());
    }
}
