//! Numeric business error codes for the wardrobe API.
//!
//! Every `AppError` carries one of these codes. The number is what clients
//! see in `error.error_code`; it is stable and independent of the HTTP
//! status, which is chosen from the error's classification instead.
//! Add new codes here; never pass ad-hoc integers as error codes.

use core::fmt;

/// Centralized business error codes.
///
/// The generic codes reuse the number of the HTTP status they usually travel
/// with; domain specific codes use five digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Successful envelope
    Success,

    // Generic, one per classification
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    Conflict,
    PayloadTooLarge,
    Internal,

    // Request validation
    /// Wardrobe name missing
    NameEmpty,
    /// Wardrobe color missing
    ColorEmpty,
    /// Wardrobe size missing
    SizeEmpty,
    /// Path id missing or not a UUID
    InvalidId,
    /// Price missing or negative
    PriceEmpty,
    /// Stock missing or negative
    StockEmpty,
    /// Request body is not the expected JSON shape
    InvalidBody,
    /// Query parameter could not be parsed
    InvalidQuery,

    // Resource state
    /// Wardrobe item not found
    WardrobeNotFound,
    /// Stock would drop below zero
    InsufficientStock,
    /// Unique constraint violation
    DuplicateEntry,

    // System
    /// Database error
    DbError,
    /// Startup or driver configuration error
    ConfigError,
    /// Transaction could not be opened, committed or was abandoned
    TransactionError,
}

impl ErrorCode {
    /// Returns the numeric code sent to clients.
    pub const fn as_u32(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RequestTimeout => 408,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::Internal => 500,

            Self::NameEmpty => 40001,
            Self::ColorEmpty => 40002,
            Self::SizeEmpty => 40003,
            Self::InvalidId => 40004,
            Self::WardrobeNotFound => 40005,
            Self::PriceEmpty => 40006,
            Self::StockEmpty => 40007,
            Self::InsufficientStock => 40008,
            Self::InvalidBody => 40009,
            Self::InvalidQuery => 40010,
            Self::DuplicateEntry => 40901,

            Self::DbError => 50001,
            Self::ConfigError => 50002,
            Self::TransactionError => 50003,
        }
    }

    /// Default human message used when an error is built without one.
    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden resource",
            Self::NotFound => "not found",
            Self::RequestTimeout => "request timeout",
            Self::Conflict => "conflict",
            Self::PayloadTooLarge => "request entity too large",
            Self::Internal => "internal server error",

            Self::NameEmpty => "Name is empty",
            Self::ColorEmpty => "Color is empty",
            Self::SizeEmpty => "Size is empty",
            Self::InvalidId => "invalid id",
            Self::WardrobeNotFound => "Not Found",
            Self::PriceEmpty => "Price is empty",
            Self::StockEmpty => "Stock is empty",
            Self::InsufficientStock => "insufficient stock",
            Self::InvalidBody => "invalid request body",
            Self::InvalidQuery => "invalid query parameter",
            Self::DuplicateEntry => "duplicate entry",

            Self::DbError => "database error",
            Self::ConfigError => "configuration error",
            Self::TransactionError => "transaction error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_codes_match_status() {
        assert_eq!(ErrorCode::BadRequest.as_u32(), 400);
        assert_eq!(ErrorCode::NotFound.as_u32(), 404);
        assert_eq!(ErrorCode::RequestTimeout.as_u32(), 408);
        assert_eq!(ErrorCode::PayloadTooLarge.as_u32(), 413);
        assert_eq!(ErrorCode::Internal.as_u32(), 500);
    }

    #[test]
    fn test_wardrobe_codes() {
        assert_eq!(ErrorCode::NameEmpty.as_u32(), 40001);
        assert_eq!(ErrorCode::WardrobeNotFound.as_u32(), 40005);
        assert_eq!(ErrorCode::WardrobeNotFound.default_message(), "Not Found");
    }

    #[test]
    fn test_display_trait() {
        assert_eq!(format!("{}", ErrorCode::ColorEmpty), "40002");
        assert_eq!(format!("{}", ErrorCode::Conflict), "409");
    }
}
