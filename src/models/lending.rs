//! Checkout (lending) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A patron currently holding one copy of a title. `(isbn, patron_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRow, ToSchema, Validate)]
pub struct Lend {
    #[schema(example = "123-456-789-0")]
    #[validate(regex(path = *crate::validation::ISBN, message = "isbn must be of the form \"ddd-ddd-ddd-d\""))]
    pub isbn: String,
    #[serde(rename = "patronId")]
    #[validate(length(min = 1, message = "must be non-empty"))]
    pub patron_id: String,
}

impl Lend {
    pub fn new(isbn: impl Into<String>, patron_id: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            patron_id: patron_id.into(),
        }
    }
}
