//! Persistence port and its storage backends

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Book, BookQuery, Lend},
};

pub use memory::InMemoryLibraryStore;
pub use postgres::PgLibraryStore;

/// Result of the atomic checkout operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Checkout recorded and one copy taken
    Applied,
    /// No copy left; nothing changed
    NoCopies,
    /// The patron already holds this title; nothing changed
    AlreadyCheckedOut,
}

/// Result of the atomic return operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Checkout removed and one copy given back
    Applied,
    /// The patron does not hold this title; nothing changed
    NotCheckedOut,
    /// The copy count is already at its maximum; nothing changed
    TooManyCopies,
}

/// Record store for books (keyed by isbn) and checkouts (keyed by patron and isbn).
///
/// Every call may fail with a database error, which callers propagate as-is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Remove all books and checkouts
    async fn clear(&self) -> AppResult<()>;

    /// Insert a new book. Fails with `Conflict` if the isbn is already stored.
    async fn add(&self, book: &Book) -> AppResult<Book>;

    /// Fails with `NotFound` if no book has this isbn
    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book>;

    /// Books matching every query word in title or authors, sorted by
    /// title then isbn and sliced by the store.
    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    async fn get_checkout(&self, patron_id: &str, isbn: &str) -> AppResult<Option<Lend>>;

    /// Fails with `Conflict` if the patron already holds the title
    async fn insert_checkout(&self, lend: &Lend) -> AppResult<()>;

    /// Fails with `NotFound` if there is no such checkout
    async fn delete_checkout(&self, lend: &Lend) -> AppResult<()>;

    /// Add `delta` to the copy count. Fails with `Conflict` if the count
    /// would become negative or overflow, and `NotFound` for an unknown isbn.
    async fn adjust_copy_count(&self, isbn: &str, delta: i32) -> AppResult<()>;

    async fn get_checkouts_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>>;

    /// Insert the checkout and take one copy as a single atomic unit
    async fn checkout(&self, lend: &Lend) -> AppResult<CheckoutOutcome>;

    /// Delete the checkout and give back one copy as a single atomic unit
    async fn return_book(&self, lend: &Lend) -> AppResult<ReturnOutcome>;
}
