//! Users and their optional creator profile.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::query::{PageLimits, PageRequest};
use crate::serde_ext::{blank_as_none, double_option};
use crate::validation::{Validate, ValidationErrors, Validator};

pub const ID_MAX: usize = 122;
pub const NAME_MAX: usize = 15;
pub const PLACE_MAX: usize = 122;
pub const OCCUPATION_MAX: usize = 120;
pub const RELIGION_MAX: usize = 80;

pub const USER_PAGE: PageLimits = PageLimits::new(20, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "marital_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub const ALL: [&'static str; 4] = ["single", "married", "divorced", "widowed"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "single" => Some(Self::Single),
            "married" => Some(Self::Married),
            "divorced" => Some(Self::Divorced),
            "widowed" => Some(Self::Widowed),
            _ => None,
        }
    }
}

/// Users are keyed by an externally issued string id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: i64,
    pub dob: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub town: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CreatorProfile {
    pub id: i64,
    pub user_id: String,
    pub marital_status: Option<MaritalStatus>,
    pub occupation: Option<String>,
    pub religion: Option<String>,
    pub total_years_experience: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithCreator {
    #[serde(flatten)]
    pub user: User,
    pub creator_profile: Option<CreatorProfile>,
}

/// Creator profile columns sent with a user create or update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatorInput {
    #[serde(default, deserialize_with = "double_option")]
    pub marital_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub occupation: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub religion: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub total_years_experience: Option<Option<Decimal>>,
}

impl Validate for CreatorInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.one_of(
            "marital_status",
            self.marital_status.clone().flatten().as_deref(),
            &MaritalStatus::ALL,
        );
        v.optional_text(
            "occupation",
            self.occupation.clone().flatten().as_deref(),
            OCCUPATION_MAX,
        );
        v.optional_text(
            "religion",
            self.religion.clone().flatten().as_deref(),
            RELIGION_MAX,
        );
        v.decimal_between(
            "total_years_experience",
            self.total_years_experience.flatten(),
            Decimal::ZERO,
            Decimal::new(9999, 1),
        );
        v.finish()
    }
}

impl CreatorInput {
    /// No profile column was sent.
    pub fn is_empty(&self) -> bool {
        self.marital_status.is_none()
            && self.occupation.is_none()
            && self.religion.is_none()
            && self.total_years_experience.is_none()
    }

    fn status(&self) -> Option<Option<MaritalStatus>> {
        self.marital_status
            .as_ref()
            .map(|status| status.as_deref().and_then(MaritalStatus::parse))
    }

    /// Column values for a new profile.
    pub fn columns(&self) -> CreatorColumns {
        CreatorColumns {
            marital_status: self.status().flatten(),
            occupation: self.occupation.clone().flatten(),
            religion: self.religion.clone().flatten(),
            total_years_experience: self.total_years_experience.flatten(),
        }
    }

    pub fn apply(&self, profile: &mut CreatorProfile) {
        if let Some(status) = self.status() {
            profile.marital_status = status;
        }
        if let Some(occupation) = &self.occupation {
            profile.occupation = occupation.clone();
        }
        if let Some(religion) = &self.religion {
            profile.religion = religion.clone();
        }
        if let Some(years) = self.total_years_experience {
            profile.total_years_experience = years;
        }
    }
}

/// Writable creator profile columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatorColumns {
    pub marital_status: Option<MaritalStatus>,
    pub occupation: Option<String>,
    pub religion: Option<String>,
    pub total_years_experience: Option<Decimal>,
}

impl From<&CreatorProfile> for CreatorColumns {
    fn from(profile: &CreatorProfile) -> Self {
        Self {
            marital_status: profile.marital_status,
            occupation: profile.occupation.clone(),
            religion: profile.religion.clone(),
            total_years_experience: profile.total_years_experience,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<i64>,
    pub dob: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub town: Option<String>,
    pub profile_image: Option<String>,
    pub creator: Option<CreatorInput>,
}

fn place_rules(v: &mut Validator, fields: [(&str, Option<&str>); 5]) {
    for (field, value) in fields {
        v.optional_text(field, value, PLACE_MAX);
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required_text("id", self.id.as_deref(), ID_MAX);
        v.required_text("name", self.name.as_deref(), NAME_MAX);
        v.required("phone", self.phone.as_ref());
        place_rules(
            &mut v,
            [
                ("dob", self.dob.as_deref()),
                ("country", self.country.as_deref()),
                ("state", self.state.as_deref()),
                ("district", self.district.as_deref()),
                ("town", self.town.as_deref()),
            ],
        );
        if let Some(creator) = &self.creator {
            v.nest("creator", creator.validate());
        }
        v.finish()
    }
}

impl CreateUser {
    /// The row to insert. Only meaningful after validation passed.
    pub fn to_user(&self) -> User {
        let text = |value: &Option<String>| value.as_deref().map(str::trim).map(str::to_string);
        User {
            id: text(&self.id).unwrap_or_default(),
            name: text(&self.name).unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            dob: self.dob.clone(),
            country_code: self.country_code.clone(),
            country: self.country.clone(),
            state: self.state.clone(),
            district: self.district.clone(),
            town: self.town.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<i64>,
    pub dob: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub town: Option<String>,
    pub profile_image: Option<String>,
    pub creator: Option<CreatorInput>,
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.present_text("name", self.name.as_deref(), NAME_MAX);
        place_rules(
            &mut v,
            [
                ("dob", self.dob.as_deref()),
                ("country", self.country.as_deref()),
                ("state", self.state.as_deref()),
                ("district", self.district.as_deref()),
                ("town", self.town.as_deref()),
            ],
        );
        if let Some(creator) = &self.creator {
            v.nest("creator", creator.validate());
        }
        v.finish()
    }
}

impl UpdateUser {
    /// The id is never changed.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        let replace = |target: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                *target = value.clone();
            }
        };
        replace(&mut user.dob, &self.dob);
        replace(&mut user.country_code, &self.country_code);
        replace(&mut user.country, &self.country);
        replace(&mut user.state, &self.state);
        replace(&mut user.district, &self.district);
        replace(&mut user.town, &self.town);
        replace(&mut user.profile_image, &self.profile_image);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub per_page: Option<i64>,
}

impl UserListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, USER_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_validates_user_and_creator() {
        let request: CreateUser = serde_json::from_value(json!({
            "id": "firebase-uid-1",
            "name": "a name that is far too long",
            "creator": {
                "marital_status": "complicated",
                "total_years_experience": 1000
            }
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("phone"));
        assert!(errors.contains("creator.marital_status"));
        assert!(errors.contains("creator.total_years_experience"));
        assert!(!errors.contains("id"));
    }

    #[test]
    fn phone_accepts_numeric_strings() {
        let request: CreateUser = serde_json::from_value(json!({
            "id": "u1",
            "name": "Asha",
            "phone": "9876543210"
        }))
        .unwrap();
        request.validate().expect("valid");
        assert_eq!(request.to_user().phone, 9_876_543_210);
    }

    #[test]
    fn creator_patch_keeps_unsent_columns() {
        let now = Utc::now();
        let mut profile = CreatorProfile {
            id: 1,
            user_id: "u1".into(),
            marital_status: Some(MaritalStatus::Single),
            occupation: Some("Teacher".into()),
            religion: None,
            total_years_experience: Some(Decimal::new(45, 1)),
            created_at: now,
            updated_at: now,
        };
        let patch: CreatorInput = serde_json::from_value(json!({
            "marital_status": "married",
            "occupation": null
        }))
        .unwrap();
        patch.validate().expect("valid");
        patch.apply(&mut profile);
        assert_eq!(profile.marital_status, Some(MaritalStatus::Married));
        assert_eq!(profile.occupation, None);
        assert_eq!(profile.total_years_experience, Some(Decimal::new(45, 1)));
        assert!(CreatorInput::default().is_empty());
    }
}
