use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::category::{Category, NAME_MAX, SLUG_MAX};
use crate::serde_ext::{double_option, lenient_bool};
use crate::validation::{Validate, ValidationErrors, Validator};

pub use super::category::SORTABLE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subcategory with its parent category embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategoryWithCategory {
    #[serde(flatten)]
    pub subcategory: Subcategory,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubcategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

impl Validate for CreateSubcategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("slug", self.slug.as_deref(), SLUG_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubcategory {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateSubcategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.min("category_id", self.category_id, 1);
        v.present_text("name", self.name.as_deref(), NAME_MAX);
        v.optional_text("slug", self.slug.as_ref().and_then(|s| s.as_deref()), SLUG_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

impl UpdateSubcategory {
    /// Apply every field except the slug.
    pub fn apply(&self, subcategory: &mut Subcategory) {
        if let Some(category_id) = self.category_id {
            subcategory.category_id = category_id;
        }
        if let Some(name) = &self.name {
            subcategory.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            subcategory.description = description.clone();
        }
        if let Some(position) = self.position {
            subcategory.position = position;
        }
        if let Some(is_active) = self.is_active {
            subcategory.is_active = is_active;
        }
    }
}
