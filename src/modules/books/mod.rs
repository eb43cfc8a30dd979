pub mod models;
pub mod store;

use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use bookstore_db::Database;
use bookstore_http::{ValidJson, ValidPath};
use bookstore_kernel::{InitCtx, Migration, Module};
use sqlx::SqliteConnection;

use super::authors::{self, models::AuthorRecord};
use super::Acknowledgement;
use crate::error::{DomainError, Entity};
use models::{BookResponse, CreateBook, UpdateBook};

/// Books module: owns the `books` table and the `/books` routes
pub struct BooksModule {
    db: Database,
}

impl BooksModule {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books/", post(create_book).get(list_books))
            .route("/books", post(create_book).get(list_books))
            .route(
                "/books/{id}",
                get(get_book).put(update_book).delete(delete_book),
            )
            .with_state(self.db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
            })
        };
        let book = serde_json::json!({
            "description": "Book",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
        });
        let body = serde_json::json!({
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookInput" } } }
        });
        let id_param = serde_json::json!([{
            "name": "id", "in": "path", "required": true, "schema": { "type": "integer" }
        }]);

        Some(serde_json::json!({
            "paths": {
                "/books/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "List of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book for an existing author",
                        "tags": ["Books"],
                        "requestBody": body,
                        "responses": {
                            "200": book,
                            "404": error("Author not found"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": { "200": book, "404": error("Book not found") }
                    },
                    "put": {
                        "summary": "Replace a book's fields",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "requestBody": body,
                        "responses": {
                            "200": book,
                            "404": error("Book or author not found"),
                            "422": error("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "Deleted",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Acknowledgement" } } }
                            },
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string" },
                            "genre": { "type": ["string", "null"] },
                            "author_id": { "type": "integer" }
                        },
                        "required": ["id", "title", "author_id"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1 },
                            "genre": { "type": ["string", "null"] },
                            "author_id": { "type": "integer" }
                        },
                        "required": ["title", "author_id"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: store::SCHEMA,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Resolve the author a book points at
async fn owning_author(
    conn: &mut SqliteConnection,
    author_id: i64,
) -> Result<AuthorRecord, DomainError> {
    authors::store::find(conn, author_id)
        .await?
        .ok_or(DomainError::ReferenceViolation { author_id })
}

async fn create_book(
    State(db): State<Database>,
    ValidJson(input): ValidJson<CreateBook>,
) -> Result<Json<BookResponse>, DomainError> {
    let mut tx = db.begin().await?;
    let author = owning_author(&mut tx, input.author_id).await?;
    let book = store::insert(&mut tx, &input).await?;
    tx.commit().await?;

    tracing::info!(book_id = book.id, author_id = author.id, "book created");
    Ok(Json(book.into()))
}

async fn list_books(State(db): State<Database>) -> Result<Json<Vec<BookResponse>>, DomainError> {
    let mut conn = db.acquire().await?;
    let books = store::list(&mut conn).await?;

    tracing::debug!(count = books.len(), "books listed");
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

async fn get_book(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<BookResponse>, DomainError> {
    let mut conn = db.acquire().await?;
    let book = store::find(&mut conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found(Entity::Book, id))?;

    Ok(Json(book.into()))
}

async fn update_book(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<UpdateBook>,
) -> Result<Json<BookResponse>, DomainError> {
    let mut tx = db.begin().await?;
    if store::find(&mut tx, id).await?.is_none() {
        return Err(DomainError::not_found(Entity::Book, id));
    }
    owning_author(&mut tx, input.author_id).await?;
    let book = store::update(&mut tx, id, &input)
        .await?
        .ok_or_else(|| DomainError::not_found(Entity::Book, id))?;
    tx.commit().await?;

    tracing::info!(book_id = id, author_id = book.author_id, "book updated");
    Ok(Json(book.into()))
}

async fn delete_book(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Acknowledgement>, DomainError> {
    let mut tx = db.begin().await?;
    if !store::delete(&mut tx, id).await? {
        return Err(DomainError::not_found(Entity::Book, id));
    }
    tx.commit().await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(Json(Acknowledgement::new("Book deleted successfully")))
}

/// Create a new instance of the books module
pub fn create_module(db: Database) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(db))
}
