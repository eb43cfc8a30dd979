pub mod models;
pub mod store;

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use bookstore_db::Database;
use bookstore_http::{ValidJson, ValidPath};
use bookstore_kernel::{InitCtx, Migration, Module};

use super::books::{self, models::BookRecord};
use super::Acknowledgement;
use crate::error::{DomainError, Entity};
use models::{AuthorResponse, CreateAuthor, UpdateAuthor};

/// Authors module: owns the `authors` table and the `/authors` routes
pub struct AuthorsModule {
    db: Database,
}

impl AuthorsModule {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/authors/", post(create_author).get(list_authors))
            .route("/authors", post(create_author).get(list_authors))
            .route(
                "/authors/{id}",
                get(get_author).put(update_author).delete(delete_author),
            )
            .with_state(self.db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let not_found = serde_json::json!({
            "description": "Author not found",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let invalid = serde_json::json!({
            "description": "Validation error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let author = serde_json::json!({
            "description": "Author",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Author" } } }
        });
        let body = serde_json::json!({
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/AuthorInput" } } }
        });
        let id_param = serde_json::json!([{
            "name": "id", "in": "path", "required": true, "schema": { "type": "integer" }
        }]);

        Some(serde_json::json!({
            "paths": {
                "/authors/": {
                    "get": {
                        "summary": "List authors with their books",
                        "tags": ["Authors"],
                        "responses": {
                            "200": {
                                "description": "List of authors",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Author" } }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "requestBody": body,
                        "responses": { "200": author, "422": invalid }
                    }
                },
                "/authors/{id}": {
                    "get": {
                        "summary": "Get an author",
                        "tags": ["Authors"],
                        "parameters": id_param,
                        "responses": { "200": author, "404": not_found }
                    },
                    "put": {
                        "summary": "Replace an author's fields",
                        "tags": ["Authors"],
                        "parameters": id_param,
                        "requestBody": body,
                        "responses": { "200": author, "404": not_found, "422": invalid }
                    },
                    "delete": {
                        "summary": "Delete an author and all of their books",
                        "tags": ["Authors"],
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "Deleted",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Acknowledgement" } } }
                            },
                            "404": not_found
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" },
                            "country": { "type": "string" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } }
                        },
                        "required": ["id", "name", "country", "books"]
                    },
                    "AuthorInput": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "minLength": 1 },
                            "country": { "type": "string", "minLength": 1 }
                        },
                        "required": ["name", "country"]
                    },
                    "Acknowledgement": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
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
        tracing::info!(module = self.name(), "authors module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module stopped");
        Ok(())
    }
}

async fn create_author(
    State(db): State<Database>,
    ValidJson(input): ValidJson<CreateAuthor>,
) -> Result<Json<AuthorResponse>, DomainError> {
    let mut tx = db.begin().await?;
    let author = store::insert(&mut tx, &input).await?;
    tx.commit().await?;

    tracing::info!(author_id = author.id, "author created");
    Ok(Json(AuthorResponse::new(author, Vec::new())))
}

async fn list_authors(State(db): State<Database>) -> Result<Json<Vec<AuthorResponse>>, DomainError> {
    // One transaction so authors and books come from the same snapshot
    let mut tx = db.begin_read().await?;
    let authors = store::list(&mut tx).await?;

    let mut owned: HashMap<i64, Vec<BookRecord>> = HashMap::new();
    for book in books::store::list(&mut tx).await? {
        owned.entry(book.author_id).or_default().push(book);
    }
    tx.commit().await?;

    let response = authors
        .into_iter()
        .map(|author| {
            let books = owned.remove(&author.id).unwrap_or_default();
            AuthorResponse::new(author, books)
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = response.len(), "authors listed");
    Ok(Json(response))
}

async fn get_author(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<AuthorResponse>, DomainError> {
    let mut conn = db.acquire().await?;
    let author = store::find(&mut conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found(Entity::Author, id))?;
    let books = books::store::list_by_author(&mut conn, id).await?;

    Ok(Json(AuthorResponse::new(author, books)))
}

async fn update_author(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<UpdateAuthor>,
) -> Result<Json<AuthorResponse>, DomainError> {
    let mut tx = db.begin().await?;
    let author = store::update(&mut tx, id, &input)
        .await?
        .ok_or_else(|| DomainError::not_found(Entity::Author, id))?;
    let books = books::store::list_by_author(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(author_id = id, "author updated");
    Ok(Json(AuthorResponse::new(author, books)))
}

async fn delete_author(
    State(db): State<Database>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Acknowledgement>, DomainError> {
    let mut tx = db.begin().await?;
    let books_removed = store::delete_cascade(&mut tx, id)
        .await?
        .ok_or_else(|| DomainError::not_found(Entity::Author, id))?;
    tx.commit().await?;

    tracing::info!(author_id = id, books_removed, "author deleted");
    Ok(Json(Acknowledgement::new("Author deleted successfully")))
}

/// Create a new instance of the authors module
pub fn create_module(db: Database) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new(db))
}
