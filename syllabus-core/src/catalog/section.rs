use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::{Validate, ValidationErrors, Validator};

pub const TITLE_MAX: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CourseSection {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSection {
    pub title: Option<String>,
    pub position: Option<i32>,
}

impl Validate for CreateSection {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("title", self.title.as_deref(), TITLE_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSection {
    pub title: Option<String>,
    pub position: Option<i32>,
}

impl Validate for UpdateSection {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.present_text("title", self.title.as_deref(), TITLE_MAX);
        v.min("position", self.position, 0);
        v.finish()
    }
}

impl UpdateSection {
    pub fn apply(&self, section: &mut CourseSection) {
        if let Some(title) = &self.title {
            section.title = title.trim().to_string();
        }
        if let Some(position) = self.position {
            section.position = position;
        }
    }
}
