//! In-process store. Each operation takes the lock once, so compound
//! operations are atomic and serialized across tasks.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CheckoutOutcome, LibraryStore, ReturnOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{search::words, Book, BookQuery, Lend},
};

#[derive(Default)]
struct Tables {
    books: BTreeMap<String, Book>,
    checkouts: BTreeSet<Lend>,
}

impl Tables {
    fn book_mut(&mut self, isbn: &str) -> AppResult<&mut Book> {
        self.books
            .get_mut(isbn)
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }
}

#[derive(Default)]
pub struct InMemoryLibraryStore {
    tables: RwLock<Tables>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn book_matches(book: &Book, query_words: &[String]) -> bool {
    let book_words: HashSet<String> = words(&book.search_text()).into_iter().collect();
    query_words.iter().all(|w| book_words.contains(w))
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn clear(&self) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.books.clear();
        tables.checkouts.clear();
        Ok(())
    }

    async fn add(&self, book: &Book) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        if tables.books.contains_key(&book.isbn) {
            return Err(AppError::Conflict(format!("book {} already exists", book.isbn)));
        }
        tables.books.insert(book.isbn.clone(), book.clone());
        Ok(book.clone())
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        self.tables
            .read()
            .await
            .books
            .get(isbn)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        if query.words.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        let mut found: Vec<&Book> = tables
            .books
            .values()
            .filter(|book| book_matches(book, &query.words))
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(found
            .into_iter()
            .skip(to_usize(query.index))
            .take(to_usize(query.count))
            .cloned()
            .collect())
    }

    async fn get_checkout(&self, patron_id: &str, isbn: &str) -> AppResult<Option<Lend>> {
        let lend = Lend::new(isbn, patron_id);
        let tables = self.tables.read().await;
        Ok(tables.checkouts.get(&lend).cloned())
    }

    async fn insert_checkout(&self, lend: &Lend) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.checkouts.insert(lend.clone()) {
            return Err(AppError::Conflict(format!(
                "patron {} already has book {} checked out",
                lend.patron_id, lend.isbn
            )));
        }
        Ok(())
    }

    async fn delete_checkout(&self, lend: &Lend) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.checkouts.remove(lend) {
            return Err(AppError::NotFound(format!(
                "patron {} does not have book {} checked out",
                lend.patron_id, lend.isbn
            )));
        }
        Ok(())
    }

    async fn adjust_copy_count(&self, isbn: &str, delta: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let book = tables.book_mut(isbn)?;
        match book.copy_count.checked_add(delta) {
            Some(count) if count >= 0 => {
                book.copy_count = count;
                Ok(())
            }
            _ => Err(AppError::Conflict(format!(
                "cannot adjust copies of book {} by {}",
                isbn, delta
            ))),
        }
    }

    async fn get_checkouts_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>> {
        let tables = self.tables.read().await;
        Ok(tables
            .checkouts
            .iter()
            .filter(|lend| lend.isbn == isbn)
            .cloned()
            .collect())
    }

    async fn checkout(&self, lend: &Lend) -> AppResult<CheckoutOutcome> {
        let mut tables = self.tables.write().await;
        if tables.book_mut(&lend.isbn)?.copy_count < 1 {
            return Ok(CheckoutOutcome::NoCopies);
        }
        if tables.checkouts.contains(lend) {
            return Ok(CheckoutOutcome::AlreadyCheckedOut);
        }
        tables.checkouts.insert(lend.clone());
        tables.book_mut(&lend.isbn)?.copy_count -= 1;
        Ok(CheckoutOutcome::Applied)
    }

    async fn return_book(&self, lend: &Lend) -> AppResult<ReturnOutcome> {
        let mut tables = self.tables.write().await;
        // everything that can fail is checked before the checkout set changes
        let returned = tables.book_mut(&lend.isbn)?.copy_count.checked_add(1);
        if !tables.checkouts.contains(lend) {
            return Ok(ReturnOutcome::NotCheckedOut);
        }
        let Some(count) = returned else {
            return Ok(ReturnOutcome::TooManyCopies);
        };
        tables.checkouts.remove(lend);
        tables.book_mut(&lend.isbn)?.copy_count = count;
        Ok(ReturnOutcome::Applied)
    }
}
