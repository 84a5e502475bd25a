//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, lendings};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending Library API",
        version = "1.0.0",
        description = "Book inventory, catalog search and checkouts"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::find_books,
        books::get_book,
        books::add_book,
        books::clear_books,
        // Lendings
        lendings::checkout_book,
        lendings::return_book,
        lendings::find_lendings,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::Lend,
            health::HealthResponse,
            health::ReadinessResponse,
            crate::config::StoreBackend,
            // Errors
            crate::error::ErrorCode,
            crate::error::FieldError,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management and search"),
        (name = "lendings", description = "Checkouts and returns")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
