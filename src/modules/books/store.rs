//! SQL for the `books` table.

use sqlx::SqliteConnection;

use super::models::{BookInput, BookRecord};
use crate::error::DomainError;

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        title     TEXT NOT NULL CHECK (length(trim(title)) > 0),
        genre     TEXT,
        author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_books_author_id ON books(author_id);
"#;

pub async fn insert(
    conn: &mut SqliteConnection,
    input: &BookInput,
) -> Result<BookRecord, DomainError> {
    sqlx::query_as::<_, BookRecord>(
        "INSERT INTO books (title, genre, author_id) VALUES (?, ?, ?) \
         RETURNING id, title, genre, author_id",
    )
    .bind(&input.title)
    .bind(&input.genre)
    .bind(input.author_id)
    .fetch_one(conn)
    .await
    .map_err(|e| DomainError::from_book_write(e, input.author_id))
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<BookRecord>, DomainError> {
    let book = sqlx::query_as::<_, BookRecord>(
        "SELECT id, title, genre, author_id FROM books WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(book)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<BookRecord>, DomainError> {
    let books =
        sqlx::query_as::<_, BookRecord>("SELECT id, title, genre, author_id FROM books ORDER BY id")
            .fetch_all(conn)
            .await?;
    Ok(books)
}

/// Books owned by one author, in id order.
pub async fn list_by_author(
    conn: &mut SqliteConnection,
    author_id: i64,
) -> Result<Vec<BookRecord>, DomainError> {
    let books = sqlx::query_as::<_, BookRecord>(
        "SELECT id, title, genre, author_id FROM books WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(conn)
    .await?;
    Ok(books)
}

/// Overwrite every editable field; `None` when no book has `id`.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    input: &BookInput,
) -> Result<Option<BookRecord>, DomainError> {
    sqlx::query_as::<_, BookRecord>(
        "UPDATE books SET title = ?, genre = ?, author_id = ? WHERE id = ? \
         RETURNING id, title, genre, author_id",
    )
    .bind(&input.title)
    .bind(&input.genre)
    .bind(input.author_id)
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(|e| DomainError::from_book_write(e, input.author_id))
}

/// Returns whether a row was removed.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, DomainError> {
    let removed = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?
        .rows_affected();
    Ok(removed > 0)
}
