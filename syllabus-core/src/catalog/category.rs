use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::serde_ext::{double_option, lenient_bool};
use crate::validation::{Validate, ValidationErrors, Validator};

pub const NAME_MAX: usize = 120;
pub const SLUG_MAX: usize = 140;

/// Sortable columns for category listings.
pub const SORTABLE: &[&str] = &[
    "name",
    "slug",
    "position",
    "is_active",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub subcategories_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

impl Validate for CreateCategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("slug", self.slug.as_deref(), SLUG_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateCategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.present_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("slug", self.slug.as_ref().and_then(|s| s.as_deref()), SLUG_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

impl UpdateCategory {
    /// Apply every field except the slug, which is resolved separately.
    pub fn apply(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
        if let Some(position) = self.position {
            category.position = position;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_name() {
        let request: CreateCategory =
            serde_json::from_value(json!({"position": -1})).unwrap();
        let errors = request.validate().expect_err("invalid");
        assert!(errors.contains("name"));
        assert!(errors.contains("position"));
    }

    #[test]
    fn update_applies_only_present_fields() {
        let now = Utc::now();
        let mut category = Category {
            id: 1,
            name: "Design".into(),
            slug: "design".into(),
            description: Some("Visual".into()),
            position: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let patch: UpdateCategory = serde_json::from_value(json!({
            "description": null,
            "is_active": "0"
        }))
        .unwrap();
        patch.validate().expect("valid");
        patch.apply(&mut category);

        assert_eq!(category.name, "Design");
        assert_eq!(category.description, None);
        assert_eq!(category.position, 3);
        assert!(!category.is_active);
    }
}
