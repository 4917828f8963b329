//! Query strings accepted by the catalog listings.

use serde::Deserialize;

use crate::query::{PageLimits, PageRequest};
use crate::serde_ext::{blank_as_none, lenient_bool};

pub const CATEGORY_PAGE: PageLimits = PageLimits::new(20, 100);
pub const NESTED_SUBCATEGORY_PAGE: PageLimits = PageLimits::new(50, 100);
pub const COURSE_PAGE: PageLimits = PageLimits::new(20, 100);
pub const CHAPTER_PAGE: PageLimits = PageLimits::new(100, 200);
pub const SECTION_PAGE: PageLimits = PageLimits::new(100, 200);
pub const ASSET_PAGE: PageLimits = PageLimits::new(50, 100);

/// Shared by category and subcategory listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryListQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<i64>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl CategoryListQuery {
    pub fn page_request(&self, limits: PageLimits) -> PageRequest {
        PageRequest::new(self.page, self.per_page, limits)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub subcategory_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<i64>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub approved: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_premium: Option<bool>,
    pub language: Option<String>,
    pub level: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub with_counts: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl CourseListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, COURSE_PAGE)
    }

    /// Per-kind asset counts are included unless turned off.
    pub fn with_counts(&self) -> bool {
        self.with_counts.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseShowQuery {
    pub with: Option<String>,
}

/// Chapters and sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildListQuery {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl ChildListQuery {
    pub fn page_request(&self, limits: PageLimits) -> PageRequest {
        PageRequest::new(self.page, self.per_page, limits)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetListQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub section_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub free_only: Option<bool>,
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl AssetListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, ASSET_PAGE)
    }
}
