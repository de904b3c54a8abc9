use std::sync::Arc;

use super::models::{Book, BookFilter, BookInput, BookList};
use super::repository::{BookStore, BookStoreError};

/// Entry point for the HTTP handlers; forwards every call to the store.
#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn BookStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<BookList, BookStoreError> {
        tracing::debug!(name = ?filter.name, genre = ?filter.genre, "listing books");
        self.store.list(filter).await
    }

    pub async fn create_book(&self, book: &BookInput) -> Result<i64, BookStoreError> {
        tracing::debug!(name = %book.name, "creating book");
        self.store.create(book).await
    }

    pub async fn get_book(&self, id: i64) -> Result<Book, BookStoreError> {
        tracing::debug!(id, "fetching book");
        self.store.get_by_id(id).await
    }

    pub async fn delete_book(&self, id: i64) -> Result<(), BookStoreError> {
        tracing::debug!(id, "deleting book");
        self.store.delete_by_id(id).await
    }

    pub async fn update_book(&self, id: i64, book: &BookInput) -> Result<i64, BookStoreError> {
        tracing::debug!(id, name = %book.name, "updating book");
        self.store.update_by_id(id, book).await
    }
}
