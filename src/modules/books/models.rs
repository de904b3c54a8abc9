use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validation::MAX_NAME_LEN;

/// A catalog item, one row of the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Store-assigned identifier
    pub id: i64,
    pub name: String,
    /// Closed enumeration, 1 to 3
    pub genre: i64,
    pub price: f64,
    /// Copies in stock
    pub amount: i64,
}

/// Request body for create and update: every mutable field of a book.
///
/// Missing fields decode to zero values so the validator reports them; an
/// `id` in the body is ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookInput {
    pub name: String,
    pub genre: i64,
    pub price: f64,
    pub amount: i64,
}

impl BookInput {
    pub fn with_id(self, id: i64) -> Book {
        Book {
            id,
            name: self.name,
            genre: self.genre,
            price: self.price,
            amount: self.amount,
        }
    }
}

/// List response envelope, newest book first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookId {
    pub id: i64,
}

/// Exact-match constraints for a list query. `None` leaves the field unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookFilter {
    pub name: Option<String>,
    pub genre: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter condition")]
pub struct FilterError;

impl BookFilter {
    /// Build a filter from raw query parameters.
    ///
    /// No parameters at all means "everything". As soon as any parameter is
    /// given, `genre` becomes mandatory and must be 1, 2 or 3. An empty `name`
    /// places no constraint on the name.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, FilterError> {
        if params.is_empty() {
            return Ok(Self::default());
        }

        let genre = params
            .get("genre")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|genre| (1..=3).contains(genre))
            .ok_or(FilterError)?;

        let name = match params.get("name").map(String::as_str) {
            None | Some("") => None,
            Some(name) if name.chars().count() > MAX_NAME_LEN => return Err(FilterError),
            Some(name) => Some(name.to_string()),
        };

        Ok(Self {
            name,
            genre: Some(genre),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.genre.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_parameters_is_an_empty_filter() {
        let filter = BookFilter::from_query(&HashMap::new()).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn genre_and_name_are_both_kept() {
        let filter = BookFilter::from_query(&params(&[("genre", "2"), ("name", "Dune")])).unwrap();
        assert_eq!(
            filter,
            BookFilter {
                name: Some("Dune".to_string()),
                genre: Some(2),
            }
        );
    }

    #[test]
    fn empty_name_is_no_constraint() {
        let filter = BookFilter::from_query(&params(&[("genre", "3"), ("name", "")])).unwrap();
        assert_eq!(filter.name, None);
        assert_eq!(filter.genre, Some(3));
    }

    #[test]
    fn name_without_genre_is_rejected() {
        assert_eq!(
            BookFilter::from_query(&params(&[("name", "Dune")])),
            Err(FilterError)
        );
    }

    #[test]
    fn unknown_parameter_still_requires_genre() {
        assert_eq!(
            BookFilter::from_query(&params(&[("page", "2")])),
            Err(FilterError)
        );
    }

    #[test]
    fn genre_must_be_an_integer_in_range() {
        for raw in ["0", "4", "-1", "two", "1.5", ""] {
            assert_eq!(
                BookFilter::from_query(&params(&[("genre", raw)])),
                Err(FilterError),
                "genre={raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            BookFilter::from_query(&params(&[("genre", "1"), ("name", &name)])),
            Err(FilterError)
        );
    }

    #[test]
    fn book_serializes_with_flat_fields() {
        let book = BookInput {
            name: "Dune".to_string(),
            genre: 1,
            price: 12.5,
            amount: 3,
        }
        .with_id(1);

        assert_eq!(
            serde_json::to_string(&book).unwrap(),
            r#"{"id":1,"name":"Dune","genre":1,"price":12.5,"amount":3}"#
        );
    }

    #[test]
    fn input_defaults_missing_fields_and_ignores_id() {
        let input: BookInput = serde_json::from_str(r#"{"id": 7, "price": 67.88, "genre": 1}"#).unwrap();
        assert_eq!(
            input,
            BookInput {
                name: String::new(),
                genre: 1,
                price: 67.88,
                amount: 0,
            }
        );
    }
}
