//! Checkout and return endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{error::AppResult, models::Lend};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LendingsQuery {
    /// Book ISBN
    pub isbn: String,
}

/// Check out a book to a patron
#[utoipa::path(
    put,
    path = "/lendings/checkout",
    tag = "lendings",
    request_body = Lend,
    responses(
        (status = 204, description = "Book checked out"),
        (status = 400, description = "Invalid request, unknown book, no copies or already checked out",
            body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout_book(
    State(state): State<crate::AppState>,
    Json(req): Json<Value>,
) -> AppResult<StatusCode> {
    state.services.lending.checkout_book(&req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return a book checked out by a patron
#[utoipa::path(
    put,
    path = "/lendings/return",
    tag = "lendings",
    request_body = Lend,
    responses(
        (status = 204, description = "Book returned"),
        (status = 400, description = "Invalid request, unknown book or not checked out",
            body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Json(req): Json<Value>,
) -> AppResult<StatusCode> {
    state.services.lending.return_book(&req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List current borrowers of a book
#[utoipa::path(
    get,
    path = "/lendings",
    tag = "lendings",
    params(LendingsQuery),
    responses(
        (status = 200, description = "Current checkouts of the book", body = Vec<Lend>)
    )
)]
pub async fn find_lendings(
    State(state): State<crate::AppState>,
    Query(query): Query<LendingsQuery>,
) -> AppResult<Json<Vec<Lend>>> {
    let lendings = state.services.lending.find_lendings(&query.isbn).await?;
    Ok(Json(lendings))
}
