use bookstore_http::extract::{require_text, Validate};
use serde::{Deserialize, Serialize};

use crate::modules::books::models::{BookRecord, BookResponse};

/// Row in the `authors` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthorRecord {
    pub id: i64,
    pub name: String,
    pub country: String,
}

/// Editable author fields, shared by create and full-replacement update.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorInput {
    /// Display name of the author
    pub name: String,
    /// Country the author is associated with
    pub country: String,
}

pub type CreateAuthor = AuthorInput;
pub type UpdateAuthor = AuthorInput;

impl Validate for AuthorInput {
    fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();
        require_text("name", &self.name, &mut details);
        require_text("country", &self.country, &mut details);
        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

/// Author as returned over the wire, with its books nested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub books: Vec<BookResponse>,
}

impl AuthorResponse {
    pub fn new(author: AuthorRecord, books: Vec<BookRecord>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            country: author.country,
            books: books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_reported_individually() {
        let input = AuthorInput {
            name: " ".to_string(),
            country: String::new(),
        };
        let details = input.validate().unwrap_err();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], "name");
        assert_eq!(details[1]["field"], "country");
    }

    #[test]
    fn response_nests_books_without_author() {
        let author = AuthorRecord {
            id: 1,
            name: "Jane".to_string(),
            country: "UK".to_string(),
        };
        let book = BookRecord {
            id: 4,
            title: "X".to_string(),
            genre: None,
            author_id: 1,
        };

        let json = serde_json::to_value(AuthorResponse::new(author, vec![book])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "name": "Jane",
                "country": "UK",
                "books": [{"id": 4, "title": "X", "genre": null, "author_id": 1}]
            })
        );
    }
}
