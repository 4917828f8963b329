//! Course media: videos, documents, audios and images.
//!
//! The four kinds share one row shape, [`CourseAsset<F>`], where `F` carries
//! the kind-specific columns. Repositories and handlers are written once
//! against [`AssetFields`] and instantiated per kind.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres, Row};
use std::fmt;

use crate::serde_ext::{double_option, lenient_bool};
use crate::validation::{Validate, ValidationErrors, Validator};

pub const TITLE_MAX: usize = 180;
pub const SLUG_MAX: usize = 200;
pub const URL_MAX: usize = 255;
pub const MIME_MAX: usize = 60;
pub const LANGUAGE_MAX: usize = 40;

/// Columns searched by `q` on every asset listing.
pub const SEARCH_COLUMNS: &[&str] = &["title", "slug", "description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Video,
    Document,
    Audio,
    Image,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Video,
        AssetKind::Document,
        AssetKind::Audio,
        AssetKind::Image,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            AssetKind::Video => "course_videos",
            AssetKind::Document => "course_documents",
            AssetKind::Audio => "course_audios",
            AssetKind::Image => "course_images",
        }
    }

    /// Lowercase noun, also the slug fallback.
    pub fn singular(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Document => "document",
            AssetKind::Audio => "audio",
            AssetKind::Image => "image",
        }
    }

    /// Path segment and relation name.
    pub fn plural(&self) -> &'static str {
        match self {
            AssetKind::Video => "videos",
            AssetKind::Document => "documents",
            AssetKind::Audio => "audios",
            AssetKind::Image => "images",
        }
    }

    /// Capitalized noun for messages.
    pub fn noun(&self) -> &'static str {
        match self {
            AssetKind::Video => "Video",
            AssetKind::Document => "Document",
            AssetKind::Audio => "Audio",
            AssetKind::Image => "Image",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Kind-specific columns of a media row.
pub trait AssetFields:
    Clone + fmt::Debug + Send + Sync + Unpin + Serialize + for<'r> FromRow<'r, PgRow> + 'static
{
    const KIND: AssetKind;
    /// Column names, in the order [`AssetFields::push_values`] binds them.
    const COLUMNS: &'static [&'static str];

    type Input: AssetInput<Fields = Self>;

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>);
}

/// Kind-specific part of a create or update payload.
pub trait AssetInput: DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync {
    type Fields;

    /// `creating` makes the kind's URL column mandatory.
    fn check(&self, v: &mut Validator, creating: bool);

    /// Columns for a new row. Only meaningful once `check(.., true)` passed.
    fn build(&self) -> Self::Fields;

    fn apply(&self, fields: &mut Self::Fields);
}

/// One media row. `fields` is flattened into the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAsset<F> {
    pub id: i64,
    pub course_id: i64,
    pub section_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_free_preview: bool,
    pub position: i32,
    #[serde(flatten)]
    pub fields: F,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, F> FromRow<'r, PgRow> for CourseAsset<F>
where
    F: FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            course_id: row.try_get("course_id")?,
            section_id: row.try_get("section_id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            is_free_preview: row.try_get("is_free_preview")?,
            position: row.try_get("position")?,
            fields: F::from_row(row)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub type CourseVideo = CourseAsset<VideoFields>;
pub type CourseDocument = CourseAsset<DocumentFields>;
pub type CourseAudio = CourseAsset<AudioFields>;
pub type CourseImage = CourseAsset<ImageFields>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAsset<I> {
    pub section_id: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_free_preview: Option<bool>,
    pub position: Option<i32>,
    #[serde(flatten)]
    pub fields: I,
}

impl<I: AssetInput> Validate for CreateAsset<I> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("title", self.title.as_deref(), TITLE_MAX);
        v.optional_text("slug", self.slug.as_deref(), SLUG_MAX);
        v.min("section_id", self.section_id, 1);
        v.min("position", self.position, 0);
        self.fields.check(&mut v, true);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAsset<I> {
    #[serde(default, deserialize_with = "double_option")]
    pub section_id: Option<Option<i64>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub slug: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_free_preview: Option<bool>,
    pub position: Option<i32>,
    #[serde(flatten)]
    pub fields: I,
}

impl<I: AssetInput> Validate for UpdateAsset<I> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.present_text("title", self.title.as_deref(), TITLE_MAX);
        v.optional_text("slug", text(&self.slug), SLUG_MAX);
        v.min("section_id", self.section_id.flatten(), 1);
        v.min("position", self.position, 0);
        self.fields.check(&mut v, false);
        v.finish()
    }
}

impl<I> UpdateAsset<I>
where
    I: AssetInput,
{
    /// Apply every field except the slug.
    pub fn apply(&self, asset: &mut CourseAsset<I::Fields>) {
        if let Some(section_id) = self.section_id {
            asset.section_id = section_id;
        }
        if let Some(title) = &self.title {
            asset.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            asset.description = description.clone();
        }
        if let Some(is_free_preview) = self.is_free_preview {
            asset.is_free_preview = is_free_preview;
        }
        if let Some(position) = self.position {
            asset.position = position;
        }
        self.fields.apply(&mut asset.fields);
    }
}

fn text(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().and_then(|inner| inner.as_deref())
}

fn url_rule(v: &mut Validator, field: &str, value: Option<&str>, creating: bool) {
    if creating {
        v.required_text(field, value, URL_MAX);
    } else {
        v.present_text(field, value, URL_MAX);
    }
}

fn assign<T: Clone>(target: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *target = value.clone();
    }
}

fn assign_url(target: &mut String, patch: &Option<String>) {
    if let Some(url) = patch {
        *target = url.trim().to_string();
    }
}

// ---- videos ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
pub struct VideoFields {
    pub playback_url: String,
    pub duration_seconds: Option<i32>,
    pub size_bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub mime_type: Option<String>,
    pub captions_json: Option<Value>,
    pub drm_license_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInput {
    pub playback_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_seconds: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub size_bytes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub width: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub height: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mime_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub captions_json: Option<Option<Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub drm_license_url: Option<Option<String>>,
}

impl VideoInput {
    /// Captions may arrive as JSON or as a string holding JSON. A blank
    /// string clears them.
    fn captions(&self) -> Option<Option<Value>> {
        self.captions_json.as_ref().map(|captions| match captions {
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(Value::String(raw)) => Some(
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
            ),
            other => other.clone(),
        })
    }
}

impl AssetInput for VideoInput {
    type Fields = VideoFields;

    fn check(&self, v: &mut Validator, creating: bool) {
        url_rule(v, "playback_url", self.playback_url.as_deref(), creating);
        v.min("duration_seconds", self.duration_seconds.flatten(), 0);
        v.min("size_bytes", self.size_bytes.flatten(), 0);
        v.min("width", self.width.flatten(), 0);
        v.min("height", self.height.flatten(), 0);
        v.optional_text("mime_type", text(&self.mime_type), MIME_MAX);
        v.optional_text("drm_license_url", text(&self.drm_license_url), URL_MAX);
        if let Some(Some(Value::String(raw))) = &self.captions_json
            && !raw.trim().is_empty()
            && serde_json::from_str::<Value>(raw).is_err()
        {
            v.fail("captions_json", "The captions json must be a valid JSON string.");
        }
    }

    fn build(&self) -> VideoFields {
        let mut fields = VideoFields {
            playback_url: self.playback_url.clone().unwrap_or_default(),
            ..VideoFields::default()
        };
        self.apply(&mut fields);
        fields
    }

    fn apply(&self, fields: &mut VideoFields) {
        assign_url(&mut fields.playback_url, &self.playback_url);
        assign(&mut fields.duration_seconds, &self.duration_seconds);
        assign(&mut fields.size_bytes, &self.size_bytes);
        assign(&mut fields.width, &self.width);
        assign(&mut fields.height, &self.height);
        assign(&mut fields.mime_type, &self.mime_type);
        assign(&mut fields.captions_json, &self.captions());
        assign(&mut fields.drm_license_url, &self.drm_license_url);
    }
}

impl AssetFields for VideoFields {
    const KIND: AssetKind = AssetKind::Video;
    const COLUMNS: &'static [&'static str] = &[
        "playback_url",
        "duration_seconds",
        "size_bytes",
        "width",
        "height",
        "mime_type",
        "captions_json",
        "drm_license_url",
    ];

    type Input = VideoInput;

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.playback_url.clone())
            .push_bind(self.duration_seconds)
            .push_bind(self.size_bytes)
            .push_bind(self.width)
            .push_bind(self.height)
            .push_bind(self.mime_type.clone())
            .push_bind(self.captions_json.clone())
            .push_bind(self.drm_license_url.clone());
    }
}

// ---- documents -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
pub struct DocumentFields {
    pub file_url: String,
    pub pages: Option<i32>,
    pub size_bytes: Option<i64>,
    pub mime_type: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    pub file_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub pages: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub size_bytes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mime_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub language: Option<Option<String>>,
}

impl AssetInput for DocumentInput {
    type Fields = DocumentFields;

    fn check(&self, v: &mut Validator, creating: bool) {
        url_rule(v, "file_url", self.file_url.as_deref(), creating);
        v.min("pages", self.pages.flatten(), 0);
        v.min("size_bytes", self.size_bytes.flatten(), 0);
        v.optional_text("mime_type", text(&self.mime_type), MIME_MAX);
        v.optional_text("language", text(&self.language), LANGUAGE_MAX);
    }

    fn build(&self) -> DocumentFields {
        let mut fields = DocumentFields {
            file_url: self.file_url.clone().unwrap_or_default(),
            ..DocumentFields::default()
        };
        self.apply(&mut fields);
        fields
    }

    fn apply(&self, fields: &mut DocumentFields) {
        assign_url(&mut fields.file_url, &self.file_url);
        assign(&mut fields.pages, &self.pages);
        assign(&mut fields.size_bytes, &self.size_bytes);
        assign(&mut fields.mime_type, &self.mime_type);
        assign(&mut fields.language, &self.language);
    }
}

impl AssetFields for DocumentFields {
    const KIND: AssetKind = AssetKind::Document;
    const COLUMNS: &'static [&'static str] =
        &["file_url", "pages", "size_bytes", "mime_type", "language"];

    type Input = DocumentInput;

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.file_url.clone())
            .push_bind(self.pages)
            .push_bind(self.size_bytes)
            .push_bind(self.mime_type.clone())
            .push_bind(self.language.clone());
    }
}

// ---- audios ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
pub struct AudioFields {
    pub playback_url: String,
    pub duration_seconds: Option<i32>,
    pub size_bytes: Option<i64>,
    pub mime_type: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioInput {
    pub playback_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_seconds: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub size_bytes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mime_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub language: Option<Option<String>>,
}

impl AssetInput for AudioInput {
    type Fields = AudioFields;

    fn check(&self, v: &mut Validator, creating: bool) {
        url_rule(v, "playback_url", self.playback_url.as_deref(), creating);
        v.min("duration_seconds", self.duration_seconds.flatten(), 0);
        v.min("size_bytes", self.size_bytes.flatten(), 0);
        v.optional_text("mime_type", text(&self.mime_type), MIME_MAX);
        v.optional_text("language", text(&self.language), LANGUAGE_MAX);
    }

    fn build(&self) -> AudioFields {
        let mut fields = AudioFields {
            playback_url: self.playback_url.clone().unwrap_or_default(),
            ..AudioFields::default()
        };
        self.apply(&mut fields);
        fields
    }

    fn apply(&self, fields: &mut AudioFields) {
        assign_url(&mut fields.playback_url, &self.playback_url);
        assign(&mut fields.duration_seconds, &self.duration_seconds);
        assign(&mut fields.size_bytes, &self.size_bytes);
        assign(&mut fields.mime_type, &self.mime_type);
        assign(&mut fields.language, &self.language);
    }
}

impl AssetFields for AudioFields {
    const KIND: AssetKind = AssetKind::Audio;
    const COLUMNS: &'static [&'static str] = &[
        "playback_url",
        "duration_seconds",
        "size_bytes",
        "mime_type",
        "language",
    ];

    type Input = AudioInput;

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.playback_url.clone())
            .push_bind(self.duration_seconds)
            .push_bind(self.size_bytes)
            .push_bind(self.mime_type.clone())
            .push_bind(self.language.clone());
    }
}

// ---- images ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
pub struct ImageFields {
    pub image_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size_bytes: Option<i64>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageInput {
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub width: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub height: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub size_bytes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mime_type: Option<Option<String>>,
}

impl AssetInput for ImageInput {
    type Fields = ImageFields;

    fn check(&self, v: &mut Validator, creating: bool) {
        url_rule(v, "image_url", self.image_url.as_deref(), creating);
        v.min("width", self.width.flatten(), 0);
        v.min("height", self.height.flatten(), 0);
        v.min("size_bytes", self.size_bytes.flatten(), 0);
        v.optional_text("mime_type", text(&self.mime_type), MIME_MAX);
    }

    fn build(&self) -> ImageFields {
        let mut fields = ImageFields {
            image_url: self.image_url.clone().unwrap_or_default(),
            ..ImageFields::default()
        };
        self.apply(&mut fields);
        fields
    }

    fn apply(&self, fields: &mut ImageFields) {
        assign_url(&mut fields.image_url, &self.image_url);
        assign(&mut fields.width, &self.width);
        assign(&mut fields.height, &self.height);
        assign(&mut fields.size_bytes, &self.size_bytes);
        assign(&mut fields.mime_type, &self.mime_type);
    }
}

impl AssetFields for ImageFields {
    const KIND: AssetKind = AssetKind::Image;
    const COLUMNS: &'static [&'static str] =
        &["image_url", "width", "height", "size_bytes", "mime_type"];

    type Input = ImageInput;

    fn push_values<'args>(&self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.image_url.clone())
            .push_bind(self.width)
            .push_bind(self.height)
            .push_bind(self.size_bytes)
            .push_bind(self.mime_type.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_map_to_tables_and_nouns() {
        assert_eq!(AssetKind::Audio.table(), "course_audios");
        assert_eq!(AssetKind::Image.plural(), "images");
        assert_eq!(VideoFields::KIND.noun(), "Video");
        assert_eq!(DocumentFields::COLUMNS.len(), 5);
    }

    #[test]
    fn create_requires_title_and_url() {
        let request: CreateAsset<VideoInput> =
            serde_json::from_value(json!({"width": -1})).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("playback_url"));
        assert!(errors.contains("width"));
    }

    #[test]
    fn update_does_not_require_url() {
        let request: UpdateAsset<ImageInput> =
            serde_json::from_value(json!({"mime_type": "image/png"})).unwrap();
        assert!(request.validate().is_ok());

        let blank: UpdateAsset<ImageInput> =
            serde_json::from_value(json!({"image_url": "  "})).unwrap();
        assert!(blank.validate().unwrap_err().contains("image_url"));
    }

    #[test]
    fn captions_accept_json_strings() {
        let request: CreateAsset<VideoInput> = serde_json::from_value(json!({
            "title": "Intro",
            "playback_url": "https://cdn.example.com/intro.m3u8",
            "captions_json": "[{\"lang\":\"en\"}]",
            "is_free_preview": "1"
        }))
        .unwrap();
        request.validate().expect("valid");
        assert_eq!(request.is_free_preview, Some(true));

        let fields = request.fields.build();
        assert_eq!(fields.captions_json, Some(json!([{"lang": "en"}])));
        assert_eq!(fields.playback_url, "https://cdn.example.com/intro.m3u8");
    }

    #[test]
    fn malformed_caption_string_is_rejected() {
        let request: CreateAsset<VideoInput> = serde_json::from_value(json!({
            "title": "Intro",
            "playback_url": "https://cdn.example.com/intro.m3u8",
            "captions_json": "{not json"
        }))
        .unwrap();
        assert!(request.validate().unwrap_err().contains("captions_json"));
    }

    #[test]
    fn update_clears_and_keeps_columns() {
        let mut fields = AudioFields {
            playback_url: "https://cdn.example.com/a.mp3".into(),
            duration_seconds: Some(90),
            size_bytes: Some(2048),
            mime_type: Some("audio/mpeg".into()),
            language: Some("en".into()),
        };
        let patch: AudioInput =
            serde_json::from_value(json!({"language": null, "duration_seconds": 120}))
                .unwrap();
        patch.apply(&mut fields);
        assert_eq!(fields.language, None);
        assert_eq!(fields.duration_seconds, Some(120));
        assert_eq!(fields.mime_type.as_deref(), Some("audio/mpeg"));
    }
}
