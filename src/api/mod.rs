//! API handlers for the lending library REST endpoints

pub mod books;
pub mod health;
pub mod lendings;
pub mod openapi;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books (catalog)
        .route(
            "/books",
            get(books::find_books)
                .post(books::add_book)
                .delete(books::clear_books),
        )
        .route("/books/:isbn", get(books::get_book))
        // Lendings
        .route("/lendings", get(lendings::find_lendings))
        .route("/lendings/checkout", put(lendings::checkout_book))
        .route("/lendings/return", put(lendings::return_book))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
