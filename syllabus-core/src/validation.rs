//! Field-level request validation.
//!
//! Request types implement [`Validate`] by feeding their fields through a
//! [`Validator`], which accumulates every failure keyed by field path
//! (`name`, `orders.2.position`, `creator.occupation`, ...).

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const GENERIC_MESSAGE: &str = "The given data was invalid.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fold another set of errors in, prefixing each field (`items.3.name`).
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, messages) in other.0 {
            let key = format!("{prefix}.{field}");
            self.0.entry(key).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message().unwrap_or(GENERIC_MESSAGE))
    }
}

impl std::error::Error for ValidationErrors {}

/// Implemented by every request payload that carries input rules.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn label(field: &str) -> String {
    let leaf = field.rsplit('.').next().unwrap_or(field);
    leaf.replace('_', " ")
}

/// Accumulates rule failures for one payload.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn required<T>(&mut self, field: &str, value: Option<&T>) -> bool {
        if value.is_none() {
            self.fail(field, format!("The {} field is required.", label(field)));
            return false;
        }
        true
    }

    /// Required, non-blank string of at most `max` characters.
    pub fn required_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        match value {
            Some(text) if !text.trim().is_empty() => self.max_chars(field, text, max),
            _ => self.fail(field, format!("The {} field is required.", label(field))),
        }
    }

    /// Optional string; when present it must not be blank.
    pub fn present_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(text) = value {
            if text.trim().is_empty() {
                self.fail(
                    field,
                    format!("The {} field must not be empty.", label(field)),
                );
            } else {
                self.max_chars(field, text, max);
            }
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(text) = value {
            self.max_chars(field, text, max);
        }
    }

    pub fn max_chars(&mut self, field: &str, text: &str, max: usize) {
        if text.chars().count() > max {
            self.fail(
                field,
                format!(
                    "The {} may not be greater than {max} characters.",
                    label(field)
                ),
            );
        }
    }

    pub fn exact_chars(&mut self, field: &str, value: Option<&str>, len: usize) {
        if let Some(text) = value
            && text.trim().chars().count() != len
        {
            self.fail(
                field,
                format!("The {} must be {len} characters.", label(field)),
            );
        }
    }

    /// Required, non-blank string of exactly `len` characters.
    pub fn required_exact(&mut self, field: &str, value: Option<&str>, len: usize) {
        match value {
            Some(text) if !text.trim().is_empty() => self.exact_chars(field, Some(text), len),
            _ => self.fail(field, format!("The {} field is required.", label(field))),
        }
    }

    pub fn min<T>(&mut self, field: &str, value: Option<T>, min: T)
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if let Some(value) = value
            && value < min
        {
            self.fail(field, format!("The {} must be at least {min}.", label(field)));
        }
    }

    pub fn decimal_between(
        &mut self,
        field: &str,
        value: Option<Decimal>,
        min: Decimal,
        max: Decimal,
    ) {
        if let Some(value) = value
            && (value < min || value > max)
        {
            self.fail(
                field,
                format!("The {} must be between {min} and {max}.", label(field)),
            );
        }
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) {
        if let Some(value) = value
            && !allowed.contains(&value)
        {
            self.fail(field, format!("The selected {} is invalid.", label(field)));
        }
    }

    pub fn nest(&mut self, prefix: &str, nested: Result<(), ValidationErrors>) {
        if let Err(errors) = nested {
            self.errors.merge_prefixed(prefix, errors);
        }
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_missing_and_blank() {
        let mut v = Validator::new();
        v.required_text("name", None, 10);
        v.required_text("title", Some("   "), 10);
        let errors = v.finish().expect_err("both fields fail");
        assert_eq!(
            errors.get("name"),
            Some(&["The name field is required.".to_string()][..])
        );
        assert!(errors.contains("title"));
    }

    #[test]
    fn length_is_counted_in_characters() {
        let mut v = Validator::new();
        v.required_text("name", Some("ééééé"), 5);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.optional_text("mime_type", Some("abcdef"), 5);
        let errors = v.finish().expect_err("too long");
        assert_eq!(
            errors.first_message(),
            Some("The mime type may not be greater than 5 characters.")
        );
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let mut inner = Validator::new();
        inner.min("position", Some(-1), 0);

        let mut outer = Validator::new();
        outer.nest("orders.2", inner.finish());
        let errors = outer.finish().expect_err("nested failure");
        assert!(errors.contains("orders.2.position"));
        assert_eq!(
            errors.first_message(),
            Some("The position must be at least 0.")
        );
    }

    #[test]
    fn display_falls_back_to_generic_message() {
        assert_eq!(ValidationErrors::new().to_string(), GENERIC_MESSAGE);
        assert_eq!(
            ValidationErrors::single("q", "bad query").to_string(),
            "bad query"
        );
    }
}
