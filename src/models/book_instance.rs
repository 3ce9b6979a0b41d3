//! Book instance (physical copy) model and related types

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_reference;
use crate::{
    error::{AppError, AppResult},
    repository::{Collection, Entity},
    validation::{Draft, FormRules, Rule, Validated},
};

pub const BOOK_INSTANCES_URL: &str = "/catalog/bookinstances";

/// Shelf status of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BookStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl BookStatus {
    pub const NAMES: &'static [&'static str] = &["Available", "Maintenance", "Loaned", "Reserved"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Maintenance => "Maintenance",
            BookStatus::Loaned => "Loaned",
            BookStatus::Reserved => "Reserved",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(BookStatus::Available),
            "Maintenance" => Ok(BookStatus::Maintenance),
            "Loaned" => Ok(BookStatus::Loaned),
            "Reserved" => Ok(BookStatus::Reserved),
            other => Err(AppError::BadRequest(format!("Unknown status {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInstance {
    pub id: Uuid,
    pub book: Uuid,
    pub imprint: String,
    #[serde(default)]
    pub status: BookStatus,
    pub due_back: DateTime<Utc>,
}

impl BookInstance {
    pub fn url(&self) -> String {
        Self::url_for(self.id)
    }

    pub fn url_for(id: Uuid) -> String {
        format!("/catalog/bookinstance/{}", id)
    }

    /// Due date for display, e.g. "June 2nd, 2024"
    pub fn due_back_formatted(&self) -> String {
        let day = self.due_back.day();
        let suffix = match (day % 10, day % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        format!("{} {}{}, {}", self.due_back.format("%B"), day, suffix, self.due_back.year())
    }

    /// Due date as a `YYYY-MM-DD` form value
    pub fn due_back_iso8601(&self) -> String {
        self.due_back.format("%Y-%m-%d").to_string()
    }
}

impl Entity for BookInstance {
    const COLLECTION: Collection = Collection::BookInstances;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookInstanceDraft {
    pub book: String,
    pub imprint: String,
    /// Empty when the form left the status unset
    pub status: String,
    pub due_back: Option<DateTime<FixedOffset>>,
}

static BOOK_INSTANCE_RULES: Lazy<FormRules> = Lazy::new(|| {
    FormRules::new()
        .field(
            "book",
            vec![
                Rule::Trim,
                Rule::Required("Book must be specified"),
                Rule::Reference("Book must be specified"),
            ],
        )
        .field(
            "imprint",
            vec![Rule::Trim, Rule::Required("Imprint must be specified"), Rule::Escape],
        )
        .field(
            "status",
            vec![
                Rule::Trim,
                Rule::Optional,
                Rule::OneOf(BookStatus::NAMES, "Status must be one of Available, Maintenance, Loaned, Reserved"),
            ],
        )
        .field(
            "dueBack",
            vec![
                Rule::Trim,
                Rule::Optional,
                Rule::IsDate("Invalid date"),
                Rule::LocalizeDate,
                Rule::AfterNow("Date must be after current date"),
            ],
        )
});

impl Draft for BookInstanceDraft {
    fn rules() -> &'static FormRules {
        &BOOK_INSTANCE_RULES
    }

    fn from_validated(values: &Validated) -> Self {
        Self {
            book: values.text("book"),
            imprint: values.text("imprint"),
            status: values.text("status"),
            due_back: values.instant("dueBack"),
        }
    }
}

impl BookInstanceDraft {
    /// Build the stored copy. Unset status means Maintenance and unset
    /// due date means `now`.
    pub fn into_book_instance(self, id: Uuid, now: DateTime<Utc>) -> AppResult<BookInstance> {
        let status = if self.status.is_empty() {
            BookStatus::default()
        } else {
            self.status.parse()?
        };

        Ok(BookInstance {
            id,
            book: parse_reference("book", &self.book)?,
            imprint: self.imprint,
            status,
            due_back: self.due_back.map_or(now, |d| d.with_timezone(&Utc)),
        })
    }
}

impl From<&BookInstance> for BookInstanceDraft {
    fn from(instance: &BookInstance) -> Self {
        Self {
            book: instance.book.to_string(),
            imprint: instance.imprint.clone(),
            status: instance.status.to_string(),
            due_back: Some(instance.due_back.fixed_offset()),
        }
    }
}
