pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use repository::BookStore;
use service::BooksService;

/// The book catalog: CRUD over the `books` table
pub struct BooksModule {
    service: BooksService,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            service: BooksService::new(store),
        }
    }
}

/// Schema owned by the books module
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                name   TEXT    NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND 100),
                genre  INTEGER NOT NULL CHECK (genre BETWEEN 1 AND 3),
                price  REAL    NOT NULL CHECK (price >= 0),
                amount INTEGER NOT NULL CHECK (amount >= 0)
            );
            "#,
    }]
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
            hide_out_of_stock = ctx.settings.books.hide_out_of_stock,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{}", schema) }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    });
    let book_body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "genre",
                            "in": "query",
                            "required": false,
                            "description": "Required as soon as any filter is given",
                            "schema": { "type": "integer", "minimum": 1, "maximum": 3 }
                        },
                        {
                            "name": "name",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string", "maxLength": 100 }
                        }
                    ],
                    "responses": {
                        "200": json_response("Matching books", "BookList"),
                        "400": error_response("Invalid filter condition"),
                        "500": error_response("Store failure")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body.clone(),
                    "responses": {
                        "200": json_response("Id assigned to the new book", "BookId"),
                        "400": error_response("Validation failure or malformed body"),
                        "500": error_response("Store failure")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Fetch a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": json_response("The book", "Book"),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("No such book"),
                        "500": error_response("Store failure")
                    }
                },
                "put": {
                    "summary": "Replace every field of a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": book_body,
                    "responses": {
                        "200": json_response("Id of the updated book", "BookId"),
                        "400": error_response("Invalid book ID, validation failure or malformed body"),
                        "404": error_response("No such book"),
                        "500": error_response("Store failure")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "400": error_response("Invalid book ID"),
                        "404": error_response("No such book"),
                        "500": error_response("Store failure")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string", "minLength": 1, "maxLength": 100 },
                        "genre": { "type": "integer", "minimum": 1, "maximum": 3 },
                        "price": { "type": "number", "minimum": 0 },
                        "amount": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["id", "name", "genre", "price", "amount"]
                },
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1, "maxLength": 100 },
                        "genre": { "type": "integer", "minimum": 1, "maximum": 3 },
                        "price": { "type": "number", "minimum": 0 },
                        "amount": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["name", "genre", "price", "amount"]
                },
                "BookList": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        }
                    },
                    "required": ["books"]
                },
                "BookId": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" }
                    },
                    "required": ["id"]
                }
            }
        }
    })
}

/// Create the books module around an already constructed store
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
