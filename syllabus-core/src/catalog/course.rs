use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::{
    assets::{CourseAudio, CourseDocument, CourseImage, CourseVideo},
    chapter::CourseChapter,
    section::CourseSection,
    subcategory::Subcategory,
};
use crate::serde_ext::{double_option, lenient_bool};
use crate::validation::{Validate, ValidationErrors, Validator};

pub const TITLE_MAX: usize = 180;
pub const SLUG_MAX: usize = 200;
pub const USER_ID_MAX: usize = 122;
pub const URL_MAX: usize = 255;
pub const LANGUAGE_MAX: usize = 40;
pub const LEVEL_MAX: usize = 40;

pub const SORTABLE: &[&str] = &[
    "title",
    "created_at",
    "updated_at",
    "status",
    "approved",
    "price",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "course_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub const ALL: [&'static str; 3] = ["draft", "published", "archived"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "draft" => Ok(CourseStatus::Draft),
            "published" => Ok(CourseStatus::Published),
            "archived" => Ok(CourseStatus::Archived),
            other => Err(format!("unknown course status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub subcategory_id: i64,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
    pub language: Option<String>,
    pub level: Option<String>,
    pub is_premium: bool,
    pub status: CourseStatus,
    pub approved: bool,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course row plus child counts computed at read time. Per-kind asset counts
/// are only present when requested.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CourseSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub sections_count: i64,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audios_count: Option<i64>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_count: Option<i64>,
}

/// Relations a course detail request may ask for with `with=a,b,c`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseRelations {
    pub subcategory: bool,
    pub sections: bool,
    pub chapters: bool,
    pub videos: bool,
    pub documents: bool,
    pub audios: bool,
    pub images: bool,
}

impl CourseRelations {
    /// Unknown names are ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut relations = Self::default();
        for name in raw.unwrap_or_default().split(',').map(str::trim) {
            match name {
                "subcategory" => relations.subcategory = true,
                "sections" => relations.sections = true,
                "chapters" => relations.chapters = true,
                "videos" => relations.videos = true,
                "documents" => relations.documents = true,
                "audios" => relations.audios = true,
                "images" => relations.images = true,
                _ => {}
            }
        }
        relations
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub summary: CourseSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<Subcategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<CourseSection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<CourseChapter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<CourseVideo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<CourseDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audios: Option<Vec<CourseAudio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<CourseImage>>,
}

impl CourseDetail {
    pub fn bare(summary: CourseSummary) -> Self {
        Self {
            summary,
            subcategory: None,
            sections: None,
            chapters: None,
            videos: None,
            documents: None,
            audios: None,
            images: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCourse {
    pub subcategory_id: Option<i64>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
    pub language: Option<String>,
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_premium: Option<bool>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub approved: Option<bool>,
    pub price: Option<Decimal>,
}

impl Validate for CreateCourse {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("subcategory_id", self.subcategory_id.as_ref());
        v.required_text("user_id", self.user_id.as_deref(), USER_ID_MAX);
        v.required_text("title", self.title.as_deref(), TITLE_MAX);
        v.optional_text("slug", self.slug.as_deref(), SLUG_MAX);
        v.optional_text("thumbnail_url", self.thumbnail_url.as_deref(), URL_MAX);
        v.optional_text("language", self.language.as_deref(), LANGUAGE_MAX);
        v.optional_text("level", self.level.as_deref(), LEVEL_MAX);
        v.one_of("status", self.status.as_deref(), &CourseStatus::ALL);
        v.min("price", self.price, Decimal::ZERO);
        v.finish()
    }
}

impl CreateCourse {
    pub fn status(&self) -> CourseStatus {
        self.status
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourse {
    pub subcategory_id: Option<i64>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub language: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub level: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_premium: Option<bool>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub approved: Option<bool>,
    pub price: Option<Decimal>,
}

impl Validate for UpdateCourse {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let flat = |value: &Option<Option<String>>| -> Option<String> {
            value.clone().flatten()
        };
        let mut v = Validator::new();
        v.present_text("user_id", self.user_id.as_deref(), USER_ID_MAX);
        v.present_text("title", self.title.as_deref(), TITLE_MAX);
        v.optional_text("slug", flat(&self.slug).as_deref(), SLUG_MAX);
        v.optional_text(
            "thumbnail_url",
            flat(&self.thumbnail_url).as_deref(),
            URL_MAX,
        );
        v.optional_text("language", flat(&self.language).as_deref(), LANGUAGE_MAX);
        v.optional_text("level", flat(&self.level).as_deref(), LEVEL_MAX);
        v.one_of("status", self.status.as_deref(), &CourseStatus::ALL);
        v.min("price", self.price, Decimal::ZERO);
        v.finish()
    }
}

impl UpdateCourse {
    /// Apply every field except the slug.
    pub fn apply(&self, course: &mut Course) {
        if let Some(subcategory_id) = self.subcategory_id {
            course.subcategory_id = subcategory_id;
        }
        if let Some(user_id) = &self.user_id {
            course.user_id = user_id.trim().to_string();
        }
        if let Some(title) = &self.title {
            course.title = title.trim().to_string();
        }
        if let Some(summary) = &self.summary {
            course.summary = summary.clone();
        }
        if let Some(thumbnail_url) = &self.thumbnail_url {
            course.thumbnail_url = thumbnail_url.clone();
        }
        if let Some(language) = &self.language {
            course.language = language.clone();
        }
        if let Some(level) = &self.level {
            course.level = level.clone();
        }
        if let Some(is_premium) = self.is_premium {
            course.is_premium = is_premium;
        }
        if let Some(status) = self.status.as_deref().and_then(|s| s.parse().ok()) {
            course.status = status;
        }
        if let Some(approved) = self.approved {
            course.approved = approved;
        }
        if let Some(price) = self.price {
            course.price = price;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_validates_every_rule() {
        let request: CreateCourse = serde_json::from_value(json!({
            "title": "x".repeat(181),
            "status": "live",
            "price": -1.5,
            "language": "en"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        for field in ["subcategory_id", "user_id", "title", "status", "price"] {
            assert!(errors.contains(field), "missing error for {field}");
        }
        assert!(!errors.contains("language"));
    }

    #[test]
    fn status_defaults_to_draft() {
        let request: CreateCourse = serde_json::from_value(json!({
            "subcategory_id": 1,
            "user_id": "u-1",
            "title": "Rust"
        }))
        .unwrap();
        request.validate().expect("valid");
        assert_eq!(request.status(), CourseStatus::Draft);
        assert_eq!("archived".parse::<CourseStatus>(), Ok(CourseStatus::Archived));
    }

    #[test]
    fn relations_ignore_unknown_names() {
        let relations = CourseRelations::parse(Some("sections, videos,reviews"));
        assert!(relations.sections && relations.videos);
        assert!(!relations.chapters && !relations.subcategory);
        assert_eq!(CourseRelations::parse(None), CourseRelations::default());
    }
}
