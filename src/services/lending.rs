//! Lending engine: catalog and checkout rules on top of the library store

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, Lend, NewBook, SearchQuery},
    repository::{CheckoutOutcome, LibraryStore, ReturnOutcome},
    validation::{validate, Operation},
};

/// Attempts at inserting a first copy before merging into the record a
/// concurrent add created
const ADD_ATTEMPTS: usize = 2;

fn no_book(isbn: &str) -> AppError {
    AppError::bad_request("isbn", format!("no book for isbn '{}'", isbn))
}

fn no_copies(isbn: &str) -> AppError {
    AppError::bad_request("isbn", format!("not enough copies for book '{}'", isbn))
}

fn already_checked_out(lend: &Lend) -> AppError {
    AppError::bad_request(
        "isbn",
        format!("patron {} already has book {} checked out", lend.patron_id, lend.isbn),
    )
}

fn not_checked_out(lend: &Lend) -> AppError {
    AppError::bad_request(
        "isbn",
        format!("patron {} does not have book {} checked out", lend.patron_id, lend.isbn),
    )
}

fn too_many_copies(isbn: &str) -> AppError {
    AppError::bad_request("nCopies", format!("too many copies of book {}", isbn))
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LibraryStore>,
}

impl LendingService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Remove every book and checkout
    pub async fn clear(&self) -> AppResult<()> {
        self.store.clear().await?;
        tracing::info!("Library cleared");
        Ok(())
    }

    /// Add one or more copies of a book.
    ///
    /// Adding an isbn that is already stored merges the copies into the
    /// existing record, provided every other field matches it exactly.
    pub async fn add_book(&self, req: &Value) -> AppResult<Book> {
        let book: NewBook = validate(Operation::AddBook, req)?;

        for _ in 0..ADD_ATTEMPTS {
            match self.store.get_by_isbn(&book.isbn).await {
                Ok(existing) => return self.merge_copies(&existing, &book).await,
                Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            match self.store.add(&book.clone().into_book()).await {
                Ok(created) => {
                    tracing::info!("Added book {} ({} copies)", created.isbn, created.copy_count);
                    return Ok(created);
                }
                // another request created the record first
                Err(AppError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        let existing = self.store.get_by_isbn(&book.isbn).await?;
        self.merge_copies(&existing, &book).await
    }

    async fn merge_copies(&self, existing: &Book, book: &NewBook) -> AppResult<Book> {
        if let Some(field) = existing.inconsistent_field(book) {
            tracing::warn!("Rejected add of book {}: inconsistent {}", book.isbn, field);
            return Err(AppError::bad_request(
                field,
                format!("inconsistent {} data for book {}", field, book.isbn),
            ));
        }

        if existing.copy_count.checked_add(book.copies()).is_none() {
            tracing::warn!("Rejected add of book {}: copy count overflow", book.isbn);
            return Err(too_many_copies(&book.isbn));
        }

        self.store.adjust_copy_count(&book.isbn, book.copies()).await?;
        let updated = self.store.get_by_isbn(&book.isbn).await?;
        tracing::info!(
            "Added {} copies of book {} (now {})",
            book.copies(),
            updated.isbn,
            updated.copy_count
        );
        Ok(updated)
    }

    /// Get a book by isbn
    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        if isbn.is_empty() {
            return Err(AppError::bad_request("isbn", "isbn is required"));
        }
        self.store.get_by_isbn(isbn).await
    }

    /// Books whose title and authors contain every word of the search text,
    /// sorted by title and sliced to `[index, index + count)`.
    pub async fn find_books(&self, req: &Value) -> AppResult<Vec<Book>> {
        let query: SearchQuery = validate(Operation::FindBooks, req)?;
        let query = BookQuery::from(&query);
        tracing::debug!(
            "Searching books for {:?} [{}, +{})",
            query.words,
            query.index,
            query.count
        );
        self.store.search(&query).await
    }

    /// Check out one copy of a book to a patron
    pub async fn checkout_book(&self, req: &Value) -> AppResult<()> {
        let lend: Lend = validate(Operation::CheckoutBook, req)?;

        let book = self.existing_book(&lend.isbn).await?;
        if book.copy_count < 1 {
            tracing::warn!("Checkout of {} by {} rejected: no copies", lend.isbn, lend.patron_id);
            return Err(no_copies(&lend.isbn));
        }
        if self.store.get_checkout(&lend.patron_id, &lend.isbn).await?.is_some() {
            tracing::warn!("Checkout of {} by {} rejected: already held", lend.isbn, lend.patron_id);
            return Err(already_checked_out(&lend));
        }

        // Checks above are re-enforced atomically by the store
        match self.store.checkout(&lend).await? {
            CheckoutOutcome::Applied => {
                tracing::info!("Book {} checked out by {}", lend.isbn, lend.patron_id);
                Ok(())
            }
            CheckoutOutcome::NoCopies => {
                tracing::warn!("Checkout of {} by {} lost race: no copies", lend.isbn, lend.patron_id);
                Err(no_copies(&lend.isbn))
            }
            CheckoutOutcome::AlreadyCheckedOut => {
                tracing::warn!("Checkout of {} by {} lost race: already held", lend.isbn, lend.patron_id);
                Err(already_checked_out(&lend))
            }
        }
    }

    /// Return a copy of a book a patron has checked out
    pub async fn return_book(&self, req: &Value) -> AppResult<()> {
        let lend: Lend = validate(Operation::ReturnBook, req)?;

        self.existing_book(&lend.isbn).await?;
        if self.store.get_checkout(&lend.patron_id, &lend.isbn).await?.is_none() {
            tracing::warn!("Return of {} by {} rejected: not held", lend.isbn, lend.patron_id);
            return Err(not_checked_out(&lend));
        }

        match self.store.return_book(&lend).await? {
            ReturnOutcome::Applied => {
                tracing::info!("Book {} returned by {}", lend.isbn, lend.patron_id);
                Ok(())
            }
            ReturnOutcome::NotCheckedOut => Err(not_checked_out(&lend)),
            ReturnOutcome::TooManyCopies => {
                tracing::warn!("Return of {} by {} rejected: copy count at maximum", lend.isbn, lend.patron_id);
                Err(AppError::bad_request(
                    "isbn",
                    format!("book {} cannot hold any more copies", lend.isbn),
                ))
            }
        }
    }

    /// Current checkouts of a book
    pub async fn find_lendings(&self, isbn: &str) -> AppResult<Vec<Lend>> {
        self.store.get_checkouts_by_isbn(isbn).await
    }

    /// Unknown isbns are a bad request on the isbn field for lending operations
    async fn existing_book(&self, isbn: &str) -> AppResult<Book> {
        match self.store.get_by_isbn(isbn).await {
            Ok(book) => Ok(book),
            Err(AppError::NotFound(_)) => Err(no_book(isbn)),
            Err(e) => Err(e),
        }
    }
}
