//! HTTP handlers for the books module.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;

use bookshelf_http::error::AppError;

use super::models::{Book, BookFilter, BookId, BookInput, BookList};
use super::repository::BookStoreError;
use super::service::BooksService;
use super::validation::{validate, ValidationError};

pub fn router(service: BooksService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

impl From<BookStoreError> for AppError {
    fn from(err: BookStoreError) -> Self {
        match err {
            BookStoreError::NotFound(_) => AppError::not_found(err.to_string()),
            BookStoreError::Database(source) => AppError::Internal(source.into()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(vec![json!({ "field": err.field() })], err.to_string())
    }
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request("invalid book ID"))
}

/// Unwrap a JSON body and run the field rules on it
fn valid_input(body: Result<Json<BookInput>, JsonRejection>) -> Result<BookInput, AppError> {
    let Json(input) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    validate(&input)?;
    Ok(input)
}

async fn list_books(
    State(service): State<BooksService>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<BookList>, AppError> {
    let filter = BookFilter::from_query(&params).map_err(|err| AppError::bad_request(err.to_string()))?;
    let books = service.list_books(&filter).await?;
    Ok(Json(books))
}

async fn create_book(
    State(service): State<BooksService>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<BookId>, AppError> {
    let input = valid_input(body)?;
    let id = service.create_book(&input).await?;
    tracing::info!(id, name = %input.name, "book created");
    Ok(Json(BookId { id }))
}

async fn get_book(
    State(service): State<BooksService>,
    Path(raw_id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(&raw_id)?;
    let book = service.get_book(id).await?;
    Ok(Json(book))
}

async fn update_book(
    State(service): State<BooksService>,
    Path(raw_id): Path<String>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<BookId>, AppError> {
    let id = parse_id(&raw_id)?;
    let input = valid_input(body)?;
    let id = service.update_book(id, &input).await?;
    tracing::info!(id, "book updated");
    Ok(Json(BookId { id }))
}

async fn delete_book(
    State(service): State<BooksService>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&raw_id)?;
    service.delete_book(id).await?;
    tracing::info!(id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}
