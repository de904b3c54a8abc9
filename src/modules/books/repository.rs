//! Persistence for books.
//!
//! `BookStore` is the seam between the service and the database; `SqlBookStore`
//! is the SQLite implementation used by the running service.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;

use bookshelf_kernel::settings::BooksSettings;

use super::models::{Book, BookFilter, BookInput, BookList};

const SELECT_BOOKS: &str = "SELECT id, name, genre, price, amount FROM books";

#[derive(Debug, Error)]
pub enum BookStoreError {
    /// No row matched the requested id
    #[error("no matching record for book {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether list queries show books that are out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPolicy {
    ShowAll,
    HideOutOfStock,
}

impl From<&BooksSettings> for StockPolicy {
    fn from(settings: &BooksSettings) -> Self {
        if settings.hide_out_of_stock {
            Self::HideOutOfStock
        } else {
            Self::ShowAll
        }
    }
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Books matching `filter`, newest first
    async fn list(&self, filter: &BookFilter) -> Result<BookList, BookStoreError>;

    /// Insert a book and return the id the store assigned to it
    async fn create(&self, book: &BookInput) -> Result<i64, BookStoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Book, BookStoreError>;

    async fn delete_by_id(&self, id: i64) -> Result<(), BookStoreError>;

    /// Overwrite every mutable field of the book, returning its id
    async fn update_by_id(&self, id: i64, book: &BookInput) -> Result<i64, BookStoreError>;
}

/// Assemble the list query: optional exact-match predicates on name and
/// genre, the stock policy, then newest first.
pub fn build_list_query(filter: &BookFilter, policy: StockPolicy) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(SELECT_BOOKS);
    let mut separator = " WHERE ";

    if let Some(name) = &filter.name {
        query.push(separator).push("name = ").push_bind(name.clone());
        separator = " AND ";
    }

    if let Some(genre) = filter.genre {
        query.push(separator).push("genre = ").push_bind(genre);
        separator = " AND ";
    }

    if policy == StockPolicy::HideOutOfStock {
        query.push(separator).push("amount > 0");
    }

    query.push(" ORDER BY id DESC");
    query
}

#[derive(Clone)]
pub struct SqlBookStore {
    pool: SqlitePool,
    policy: StockPolicy,
}

impl SqlBookStore {
    pub fn new(pool: SqlitePool, policy: StockPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl BookStore for SqlBookStore {
    async fn list(&self, filter: &BookFilter) -> Result<BookList, BookStoreError> {
        let mut query = build_list_query(filter, self.policy);
        let books = query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(BookList { books })
    }

    async fn create(&self, book: &BookInput) -> Result<i64, BookStoreError> {
        let id = sqlx::query_scalar(
            "INSERT INTO books (name, genre, price, amount) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&book.name)
        .bind(book.genre)
        .bind(book.price)
        .bind(book.amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Book, BookStoreError> {
        sqlx::query_as::<_, Book>(&format!("{SELECT_BOOKS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BookStoreError::NotFound(id))
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), BookStoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn update_by_id(&self, id: i64, book: &BookInput) -> Result<i64, BookStoreError> {
        sqlx::query_scalar(
            "UPDATE books SET name = ?, genre = ?, price = ?, amount = ? WHERE id = ? RETURNING id",
        )
        .bind(&book.name)
        .bind(book.genre)
        .bind(book.price)
        .bind(book.amount)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BookStoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::migrations;
    use bookshelf_kernel::settings::DatabaseSettings;

    async fn store(policy: StockPolicy) -> SqlBookStore {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        };
        let pool = bookshelf_db::connect(&settings).await.unwrap();
        let migrations: Vec<(String, _)> = migrations()
            .into_iter()
            .map(|migration| ("books".to_string(), migration))
            .collect();
        bookshelf_db::run_migrations(&pool, &migrations).await.unwrap();
        SqlBookStore::new(pool, policy)
    }

    fn input(name: &str, genre: i64, price: f64, amount: i64) -> BookInput {
        BookInput {
            name: name.to_string(),
            genre,
            price,
            amount,
        }
    }

    async fn seed(store: &SqlBookStore) -> Vec<i64> {
        let mut ids = Vec::new();
        for book in [
            input("book1", 1, 3.7, 1),
            input("book2", 2, 4.7, 2),
            input("book3", 3, 5.7, 0),
            input("book4", 2, 6.7, 4),
        ] {
            ids.push(store.create(&book).await.unwrap());
        }
        ids
    }

    fn names(list: &BookList) -> Vec<&str> {
        list.books.iter().map(|book| book.name.as_str()).collect()
    }

    #[test]
    fn unfiltered_query_shows_everything_newest_first() {
        let query = build_list_query(&BookFilter::default(), StockPolicy::ShowAll);
        assert_eq!(
            query.sql(),
            "SELECT id, name, genre, price, amount FROM books ORDER BY id DESC"
        );
    }

    #[test]
    fn stock_policy_alone_opens_the_where_clause() {
        let query = build_list_query(&BookFilter::default(), StockPolicy::HideOutOfStock);
        assert_eq!(
            query.sql(),
            "SELECT id, name, genre, price, amount FROM books WHERE amount > 0 ORDER BY id DESC"
        );
    }

    #[test]
    fn predicates_are_joined_with_and() {
        let filter = BookFilter {
            name: Some("Dune".to_string()),
            genre: Some(1),
        };
        let query = build_list_query(&filter, StockPolicy::HideOutOfStock);
        assert_eq!(
            query.sql(),
            "SELECT id, name, genre, price, amount FROM books \
             WHERE name = ? AND genre = ? AND amount > 0 ORDER BY id DESC"
        );
    }

    #[test]
    fn genre_only_filter() {
        let filter = BookFilter {
            name: None,
            genre: Some(2),
        };
        let query = build_list_query(&filter, StockPolicy::ShowAll);
        assert_eq!(
            query.sql(),
            "SELECT id, name, genre, price, amount FROM books WHERE genre = ? ORDER BY id DESC"
        );
    }

    #[tokio::test]
    async fn create_then_get_returns_the_input() {
        let store = store(StockPolicy::ShowAll).await;
        let dune = input("Dune", 1, 12.5, 3);

        let id = store.create(&dune).await.unwrap();
        let book = store.get_by_id(id).await.unwrap();

        assert_eq!(book, dune.with_id(id));
    }

    #[tokio::test]
    async fn ids_are_assigned_by_the_store() {
        let store = store(StockPolicy::ShowAll).await;
        let ids = seed(&store).await;
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn list_hides_out_of_stock_books_newest_first() {
        let store = store(StockPolicy::HideOutOfStock).await;
        seed(&store).await;

        let list = store.list(&BookFilter::default()).await.unwrap();
        assert_eq!(names(&list), vec!["book4", "book2", "book1"]);
    }

    #[tokio::test]
    async fn list_can_show_out_of_stock_books() {
        let store = store(StockPolicy::ShowAll).await;
        seed(&store).await;

        let list = store.list(&BookFilter::default()).await.unwrap();
        assert_eq!(names(&list), vec!["book4", "book3", "book2", "book1"]);
    }

    #[tokio::test]
    async fn list_by_genre() {
        let store = store(StockPolicy::ShowAll).await;
        seed(&store).await;

        let filter = BookFilter {
            name: None,
            genre: Some(2),
        };
        let list = store.list(&filter).await.unwrap();
        assert_eq!(names(&list), vec!["book4", "book2"]);
        assert!(list.books.iter().all(|book| book.genre == 2));
    }

    #[tokio::test]
    async fn list_by_name_and_genre() {
        let store = store(StockPolicy::ShowAll).await;
        seed(&store).await;

        let matching = BookFilter {
            name: Some("book2".to_string()),
            genre: Some(2),
        };
        assert_eq!(names(&store.list(&matching).await.unwrap()), vec!["book2"]);

        let wrong_genre = BookFilter {
            name: Some("book2".to_string()),
            genre: Some(1),
        };
        assert!(store.list(&wrong_genre).await.unwrap().books.is_empty());
    }

    #[tokio::test]
    async fn empty_table_lists_as_empty_vec() {
        let store = store(StockPolicy::HideOutOfStock).await;
        let list = store.list(&BookFilter::default()).await.unwrap();
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"{"books":[]}"#);
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let store = store(StockPolicy::ShowAll).await;
        let err = store.get_by_id(42).await.unwrap_err();
        assert!(matches!(err, BookStoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = store(StockPolicy::ShowAll).await;
        let ids = seed(&store).await;

        store.delete_by_id(ids[0]).await.unwrap();

        assert!(matches!(
            store.get_by_id(ids[0]).await,
            Err(BookStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_by_id(ids[0]).await,
            Err(BookStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_overwrites_every_field() {
        let store = store(StockPolicy::ShowAll).await;
        let ids = seed(&store).await;
        let data = input("book1, second edition", 3, 9.99, 12);

        let id = store.update_by_id(ids[0], &data).await.unwrap();

        assert_eq!(id, ids[0]);
        assert_eq!(store.get_by_id(id).await.unwrap(), data.with_id(id));
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let store = store(StockPolicy::ShowAll).await;
        let err = store
            .update_by_id(7, &input("ghost", 1, 1.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookStoreError::NotFound(7)));
    }

    #[tokio::test]
    async fn duplicate_name_is_a_database_error() {
        let store = store(StockPolicy::ShowAll).await;
        store.create(&input("hello", 1, 67.88, 7)).await.unwrap();

        let err = store
            .create(&input("hello", 2, 1.0, 1))
            .await
            .unwrap_err();
        match err {
            BookStoreError::Database(e) => assert!(e.to_string().contains("UNIQUE")),
            other => panic!("expected a database error, got {other:?}"),
        }
    }
}
