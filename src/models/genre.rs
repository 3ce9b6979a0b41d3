//! Genre model

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    repository::{Collection, Entity},
    validation::{Draft, FormRules, Rule, Validated},
};

pub const GENRES_URL: &str = "/catalog/genres";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
}

impl Genre {
    pub fn url(&self) -> String {
        Self::url_for(self.id)
    }

    pub fn url_for(id: Uuid) -> String {
        format!("/catalog/genre/{}", id)
    }
}

impl Entity for Genre {
    const COLLECTION: Collection = Collection::Genres;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenreDraft {
    pub name: String,
}

static GENRE_RULES: Lazy<FormRules> = Lazy::new(|| {
    FormRules::new().field(
        "name",
        vec![Rule::Trim, Rule::Required("Genre name required"), Rule::Escape],
    )
});

impl Draft for GenreDraft {
    fn rules() -> &'static FormRules {
        &GENRE_RULES
    }

    fn from_validated(values: &Validated) -> Self {
        Self {
            name: values.text("name"),
        }
    }
}

impl GenreDraft {
    pub fn into_genre(self, id: Uuid) -> Genre {
        Genre { id, name: self.name }
    }
}

impl From<&Genre> for GenreDraft {
    fn from(genre: &Genre) -> Self {
        Self {
            name: genre.name.clone(),
        }
    }
}
