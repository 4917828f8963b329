use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::serde_ext::double_option;
use crate::validation::{Validate, ValidationErrors, Validator};

pub const TITLE_MAX: usize = 255;
/// Chapters are numbered from one.
pub const FIRST_POSITION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CourseChapter {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChapter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

impl Validate for CreateChapter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("title", self.title.as_deref(), TITLE_MAX);
        v.min("position", self.position, FIRST_POSITION);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChapter {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub position: Option<i32>,
}

impl Validate for UpdateChapter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.present_text("title", self.title.as_deref(), TITLE_MAX);
        v.min("position", self.position, FIRST_POSITION);
        v.finish()
    }
}

impl UpdateChapter {
    pub fn apply(&self, chapter: &mut CourseChapter) {
        if let Some(title) = &self.title {
            chapter.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            chapter.description = description.clone();
        }
        if let Some(position) = self.position {
            chapter.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn position_starts_at_one() {
        let request: CreateChapter =
            serde_json::from_value(json!({"title": "Intro", "position": 0})).unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(
            errors.first_message(),
            Some("The position must be at least 1.")
        );
    }

    #[test]
    fn explicit_null_clears_description() {
        let now = Utc::now();
        let mut chapter = CourseChapter {
            id: 1,
            course_id: 2,
            title: "Intro".into(),
            description: Some("Welcome".into()),
            position: 1,
            created_at: now,
            updated_at: now,
        };
        let patch: UpdateChapter =
            serde_json::from_value(json!({"description": null, "position": 4})).unwrap();
        patch.apply(&mut chapter);
        assert_eq!(chapter.description, None);
        assert_eq!(chapter.position, 4);
        assert_eq!(chapter.title, "Intro");
    }
}
