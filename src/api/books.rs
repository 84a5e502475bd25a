//! Book (catalog) endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Number, Value};

use crate::{error::AppResult, models::Book};

/// Query-string values are text; numeric paging fields become JSON numbers
/// so the validator sees them with their intended type.
fn search_request(params: HashMap<String, String>) -> Value {
    let mut req = Map::new();
    for (key, value) in params {
        let value = match key.as_str() {
            "index" | "count" => parse_number(&value).unwrap_or(Value::String(value)),
            _ => Value::String(value),
        };
        req.insert(key, value);
    }
    Value::Object(req)
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Find books matching every word of `search`
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("search" = String, Query, description = "Words to find in title or authors"),
        ("index" = Option<i64>, Query, description = "Index of first result (default: 0)"),
        ("count" = Option<i64>, Query, description = "Number of results (default: 5)")
    ),
    responses(
        (status = 200, description = "Matching books sorted by title", body = Vec<Book>),
        (status = 400, description = "Invalid search", body = crate::error::ErrorResponse)
    )
)]
pub async fn find_books(
    State(state): State<crate::AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .services
        .lending
        .find_books(&search_request(params))
        .await?;
    Ok(Json(books))
}

/// Get book details by isbn
#[utoipa::path(
    get,
    path = "/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.lending.get_book(&isbn).await?;
    Ok(Json(book))
}

/// Add copies of a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = Book,
    responses(
        (status = 201, description = "Book added or copies merged", body = Book),
        (status = 400, description = "Invalid or inconsistent book", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<crate::AppState>,
    Json(req): Json<Value>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.lending.add_book(&req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Remove all books and checkouts
#[utoipa::path(
    delete,
    path = "/books",
    tag = "books",
    responses(
        (status = 204, description = "Library cleared")
    )
)]
pub async fn clear_books(State(state): State<crate::AppState>) -> AppResult<StatusCode> {
    state.services.lending.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
