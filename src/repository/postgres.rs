//! PostgreSQL store

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{CheckoutOutcome, LibraryStore, ReturnOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, Lend},
};

const BOOK_COLUMNS: &str = "isbn, title, authors, pages, year, publisher, copy_count";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct PgLibraryStore {
    pool: Pool<Postgres>,
}

impl PgLibraryStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for PgLibraryStore {
    async fn clear(&self) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM checkouts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM books").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add(&self, book: &Book) -> AppResult<Book> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO books (isbn, title, authors, pages, year, publisher, copy_count, search_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.authors)
        .bind(book.pages)
        .bind(book.year)
        .bind(&book.publisher)
        .bind(book.copy_count)
        .bind(book.search_text())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(book.clone()),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict(format!("book {} already exists", book.isbn)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        if query.words.is_empty() {
            return Ok(Vec::new());
        }
        // plainto_tsquery ANDs the words
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE to_tsvector('simple', search_text) @@ plainto_tsquery('simple', $1)
            ORDER BY title, isbn
            OFFSET $2
            LIMIT $3
            "#,
            BOOK_COLUMNS
        ))
        .bind(query.words.join(" "))
        .bind(query.index)
        .bind(query.count)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn get_checkout(&self, patron_id: &str, isbn: &str) -> AppResult<Option<Lend>> {
        let lend = sqlx::query_as::<_, Lend>(
            "SELECT isbn, patron_id FROM checkouts WHERE patron_id = $1 AND isbn = $2",
        )
        .bind(patron_id)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lend)
    }

    async fn insert_checkout(&self, lend: &Lend) -> AppResult<()> {
        let inserted = sqlx::query("INSERT INTO checkouts (isbn, patron_id) VALUES ($1, $2)")
            .bind(&lend.isbn)
            .bind(&lend.patron_id)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "patron {} already has book {} checked out",
                lend.patron_id, lend.isbn
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_checkout(&self, lend: &Lend) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM checkouts WHERE isbn = $1 AND patron_id = $2")
            .bind(&lend.isbn)
            .bind(&lend.patron_id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "patron {} does not have book {} checked out",
                lend.patron_id, lend.isbn
            )));
        }
        Ok(())
    }

    async fn adjust_copy_count(&self, isbn: &str, delta: i32) -> AppResult<()> {
        // widened so an overflowing sum fails the guard instead of raising
        let updated = sqlx::query(
            r#"
            UPDATE books SET copy_count = copy_count + $2
            WHERE isbn = $1 AND copy_count::BIGINT + $2 BETWEEN 0 AND 2147483647
            "#,
        )
        .bind(isbn)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // distinguish an unknown isbn from a guarded update
            self.get_by_isbn(isbn).await?;
            return Err(AppError::Conflict(format!(
                "cannot adjust copies of book {} by {}",
                isbn, delta
            )));
        }
        Ok(())
    }

    async fn get_checkouts_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>> {
        let lends = sqlx::query_as::<_, Lend>(
            "SELECT isbn, patron_id FROM checkouts WHERE isbn = $1 ORDER BY patron_id",
        )
        .bind(isbn)
        .fetch_all(&self.pool)
        .await?;

        Ok(lends)
    }

    async fn checkout(&self, lend: &Lend) -> AppResult<CheckoutOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the book serializes concurrent checkouts of the same isbn
        let taken = sqlx::query(
            "UPDATE books SET copy_count = copy_count - 1 WHERE isbn = $1 AND copy_count >= 1",
        )
        .bind(&lend.isbn)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CheckoutOutcome::NoCopies);
        }

        let inserted = sqlx::query(
            "INSERT INTO checkouts (isbn, patron_id) VALUES ($1, $2) ON CONFLICT (isbn, patron_id) DO NOTHING",
        )
        .bind(&lend.isbn)
        .bind(&lend.patron_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CheckoutOutcome::AlreadyCheckedOut);
        }

        tx.commit().await?;
        Ok(CheckoutOutcome::Applied)
    }

    async fn return_book(&self, lend: &Lend) -> AppResult<ReturnOutcome> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM checkouts WHERE isbn = $1 AND patron_id = $2")
            .bind(&lend.isbn)
            .bind(&lend.patron_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ReturnOutcome::NotCheckedOut);
        }

        let given_back = sqlx::query(
            "UPDATE books SET copy_count = copy_count + 1 WHERE isbn = $1 AND copy_count < $2",
        )
        .bind(&lend.isbn)
        .bind(i32::MAX)
        .execute(&mut *tx)
        .await?;

        if given_back.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ReturnOutcome::TooManyCopies);
        }

        tx.commit().await?;
        Ok(ReturnOutcome::Applied)
    }
}
