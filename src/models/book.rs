//! Book (catalog entry) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book record as stored. `isbn` is the key; every other field except
/// `copy_count` is fixed once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// ISBN-10 of the form ddd-ddd-ddd-d
    #[schema(example = "123-456-789-0")]
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pages: i32,
    pub year: i32,
    pub publisher: String,
    /// Copies available for checkout
    #[serde(rename = "nCopies")]
    pub copy_count: i32,
}

/// Validated add-book request
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewBook {
    #[validate(regex(path = *crate::validation::ISBN, message = "isbn must be of the form \"ddd-ddd-ddd-d\""))]
    pub isbn: String,
    #[validate(length(min = 1, message = "must be non-empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "must have one or more authors"))]
    pub authors: Vec<String>,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub pages: i32,
    pub year: i32,
    #[validate(length(min = 1, message = "must be non-empty"))]
    pub publisher: String,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub copy_count: Option<i32>,
}

impl NewBook {
    /// Number of copies being added (defaults to one)
    pub fn copies(&self) -> i32 {
        self.copy_count.unwrap_or(1)
    }

    pub fn into_book(self) -> Book {
        let copy_count = self.copies();
        Book {
            isbn: self.isbn,
            title: self.title,
            authors: self.authors,
            pages: self.pages,
            year: self.year,
            publisher: self.publisher,
            copy_count,
        }
    }
}

impl Book {
    /// Return the first immutable field on which `incoming` disagrees with this record
    pub fn inconsistent_field(&self, incoming: &NewBook) -> Option<&'static str> {
        if self.title != incoming.title {
            return Some("title");
        }
        if self.authors != incoming.authors {
            return Some("authors");
        }
        if self.pages != incoming.pages {
            return Some("pages");
        }
        if self.year != incoming.year {
            return Some("year");
        }
        if self.publisher != incoming.publisher {
            return Some("publisher");
        }
        None
    }

    /// Title and authors as one text, the haystack for catalog search
    pub fn search_text(&self) -> String {
        let mut text = self.title.clone();
        for author in &self.authors {
            text.push(' ');
            text.push_str(author);
        }
        text
    }
}
