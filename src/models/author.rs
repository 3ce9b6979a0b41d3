//! Author model and related types

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    repository::{Collection, Entity, Projection},
    validation::{CrossRule, Draft, FormRules, Rule, Validated},
};

pub const AUTHORS_URL: &str = "/catalog/authors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub first_name: String,
    pub family_name: String,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_of_death: Option<DateTime<Utc>>,
}

impl Author {
    pub fn url(&self) -> String {
        Self::url_for(self.id)
    }

    pub fn url_for(id: Uuid) -> String {
        format!("/catalog/author/{}", id)
    }
}

impl Entity for Author {
    const COLLECTION: Collection = Collection::Authors;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Names only, for choice lists and populated references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub id: Uuid,
    pub first_name: String,
    pub family_name: String,
}

impl AuthorName {
    /// "Family, First" as shown in lists
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.family_name, self.first_name)
    }
}

impl Projection for AuthorName {
    const COLLECTION: Collection = Collection::Authors;
    const FIELDS: &'static [&'static str] = &["first_name", "family_name"];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorDraft {
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<DateTime<FixedOffset>>,
    pub date_of_death: Option<DateTime<FixedOffset>>,
}

static AUTHOR_RULES: Lazy<FormRules> = Lazy::new(|| {
    FormRules::new()
        .field(
            "first_name",
            vec![
                Rule::Trim,
                Rule::Required("First name must be specified."),
                Rule::Alphanumeric("First name has non-alphanumeric characters."),
                Rule::Escape,
            ],
        )
        .field(
            "family_name",
            vec![
                Rule::Trim,
                Rule::Required("Family name must be specified."),
                Rule::Alphanumeric("Family name has non-alphanumeric characters."),
                Rule::Escape,
            ],
        )
        .field(
            "date_of_birth",
            vec![
                Rule::Trim,
                Rule::Optional,
                Rule::IsDate("Invalid date of birth"),
                Rule::LocalizeDate,
                Rule::BeforeNow("Date of birth must not be in the future"),
            ],
        )
        .field(
            "date_of_death",
            vec![
                Rule::Trim,
                Rule::Optional,
                Rule::IsDate("Invalid date of death"),
                Rule::LocalizeDate,
                Rule::BeforeNow("Date of death must not be in the future"),
            ],
        )
        .cross(CrossRule::NotBefore {
            field: "date_of_death",
            other: "date_of_birth",
            message: "Date of death must not be before date of birth",
        })
});

impl Draft for AuthorDraft {
    fn rules() -> &'static FormRules {
        &AUTHOR_RULES
    }

    fn from_validated(values: &Validated) -> Self {
        Self {
            first_name: values.text("first_name"),
            family_name: values.text("family_name"),
            date_of_birth: values.instant("date_of_birth"),
            date_of_death: values.instant("date_of_death"),
        }
    }
}

impl AuthorDraft {
    pub fn into_author(self, id: Uuid) -> Author {
        Author {
            id,
            first_name: self.first_name,
            family_name: self.family_name,
            date_of_birth: self.date_of_birth.map(|d| d.with_timezone(&Utc)),
            date_of_death: self.date_of_death.map(|d| d.with_timezone(&Utc)),
        }
    }
}

impl From<&Author> for AuthorDraft {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            family_name: author.family_name.clone(),
            date_of_birth: author.date_of_birth.map(|d| d.fixed_offset()),
            date_of_death: author.date_of_death.map(|d| d.fixed_offset()),
        }
    }
}
