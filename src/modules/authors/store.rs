//! SQL for the `authors` table. Every function runs on a caller-supplied
//! connection so handlers decide the transaction boundary.

use sqlx::SqliteConnection;

use super::models::{AuthorInput, AuthorRecord};
use crate::error::DomainError;

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS authors (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        name    TEXT NOT NULL CHECK (length(trim(name)) > 0),
        country TEXT NOT NULL CHECK (length(trim(country)) > 0)
    );
"#;

pub async fn insert(
    conn: &mut SqliteConnection,
    input: &AuthorInput,
) -> Result<AuthorRecord, DomainError> {
    let author = sqlx::query_as::<_, AuthorRecord>(
        "INSERT INTO authors (name, country) VALUES (?, ?) RETURNING id, name, country",
    )
    .bind(&input.name)
    .bind(&input.country)
    .fetch_one(conn)
    .await?;
    Ok(author)
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<AuthorRecord>, DomainError> {
    let author =
        sqlx::query_as::<_, AuthorRecord>("SELECT id, name, country FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(author)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<AuthorRecord>, DomainError> {
    let authors =
        sqlx::query_as::<_, AuthorRecord>("SELECT id, name, country FROM authors ORDER BY id")
            .fetch_all(conn)
            .await?;
    Ok(authors)
}

/// Overwrite every editable field; `None` when no author has `id`.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    input: &AuthorInput,
) -> Result<Option<AuthorRecord>, DomainError> {
    let author = sqlx::query_as::<_, AuthorRecord>(
        "UPDATE authors SET name = ?, country = ? WHERE id = ? RETURNING id, name, country",
    )
    .bind(&input.name)
    .bind(&input.country)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(author)
}

/// Delete the author and every book it owns. Returns the number of books
/// removed, or `None` when no author has `id`.
pub async fn delete_cascade(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<u64>, DomainError> {
    let books = sqlx::query("DELETE FROM books WHERE author_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let removed = sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok((removed > 0).then_some(books))
}
