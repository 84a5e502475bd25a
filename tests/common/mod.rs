//! Shared test setup: fixture loading and a service over the in-memory store

#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use serde_json::Value;

use lending_library::{
    api,
    config::AppConfig,
    repository::InMemoryLibraryStore,
    services::{lending::LendingService, Services},
    AppState,
};

/// Book requests from `tests/data/books.json`
pub fn load_test_books() -> Vec<Value> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/books.json");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    serde_json::from_str(&text).expect("books.json should be a JSON array")
}

pub fn empty_service() -> LendingService {
    LendingService::new(Arc::new(InMemoryLibraryStore::new()))
}

/// Service whose catalog holds every fixture book
pub async fn loaded_service() -> LendingService {
    let service = empty_service();
    for book in load_test_books() {
        service.add_book(&book).await.expect("fixture book should be valid");
    }
    service
}

/// Application state over an empty in-memory store
pub fn app_state() -> AppState {
    let store = Arc::new(InMemoryLibraryStore::new());
    AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(Services::new(store)),
    }
}

pub fn app() -> axum::Router {
    api::create_router(app_state())
}
