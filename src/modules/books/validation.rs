use thiserror::Error;

use super::models::BookInput;

pub const MAX_NAME_LEN: usize = 100;
pub const GENRES: std::ops::RangeInclusive<i64> = 1..=3;

/// First rule a book violates. Variants are listed in checking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is a required field")]
    EmptyName,
    #[error("name has to be less than 100 characters")]
    NameTooLong,
    #[error("price can't be less than 0")]
    NegativePrice,
    #[error("genre has to be between 1 and 3")]
    GenreOutOfRange,
    #[error("amount can't be less than 0")]
    NegativeAmount,
}

impl ValidationError {
    /// Field the rule is about, for error details
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong => "name",
            Self::NegativePrice => "price",
            Self::GenreOutOfRange => "genre",
            Self::NegativeAmount => "amount",
        }
    }
}

/// Check a book against the field rules, reporting only the first failure.
pub fn validate(book: &BookInput) -> Result<(), ValidationError> {
    if book.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if book.name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if book.price.is_nan() || book.price < 0.0 {
        return Err(ValidationError::NegativePrice);
    }
    if !GENRES.contains(&book.genre) {
        return Err(ValidationError::GenreOutOfRange);
    }
    if book.amount < 0 {
        return Err(ValidationError::NegativeAmount);
    }
    Ok(())
}
