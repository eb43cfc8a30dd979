use bookstore_http::extract::{require_text, Validate};
use serde::{Deserialize, Serialize};

/// Row in the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub genre: Option<String>,
    /// Owning author. A lookup key only; the author controls the book's lifecycle.
    pub author_id: i64,
}

/// Editable book fields, shared by create and full-replacement update.
#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    /// Title of the book
    pub title: String,
    /// Optional genre; omitted means none
    #[serde(default)]
    pub genre: Option<String>,
    /// Id of the owning author
    pub author_id: i64,
}

pub type CreateBook = BookInput;
pub type UpdateBook = BookInput;

impl Validate for BookInput {
    fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();
        require_text("title", &self.title, &mut details);
        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

/// Flat book representation returned over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub genre: Option<String>,
    pub author_id: i64,
}

impl From<BookRecord> for BookResponse {
    fn from(book: BookRecord) -> Self {
        Self {
            id: book.id,
            title: book.title,
            genre: book.genre,
            author_id: book.author_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_defaults_to_none() {
        let input: BookInput = serde_json::from_str(r#"{"title":"X","author_id":1}"#).unwrap();
        assert_eq!(input.genre, None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn author_id_is_required() {
        let parsed = serde_json::from_str::<BookInput>(r#"{"title":"X"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_title_fails_validation() {
        let input = BookInput {
            title: "\t".to_string(),
            genre: Some("Drama".to_string()),
            author_id: 1,
        };
        let details = input.validate().unwrap_err();
        assert_eq!(details[0]["field"], "title");
    }
}
