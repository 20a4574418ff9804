use thiserror::Error;

use crate::date::Epoch;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a date that doesn't follow the `DD-MMM-YYYY` layout.
    #[error("Incorrect date {0:?}, dates must be in DD-MMM-YYYY format, e.g. 27-Aug-2024")]
    InvalidDateFormat(String),

    /// Represents a reference to a book that doesn't exist.
    #[error("No book with ID {0} exists")]
    NotFound(String),

    /// Represents a search that matched no books.
    #[error("No books found")]
    NoMatchingBooks,

    /// Represents a creation or update colliding with an existing book.
    #[error("{title} by {author} already exists")]
    DuplicateBook { title: String, author: String },

    /// Represents an attempt to start a book that has already been started.
    #[error("Book {0} is already started")]
    AlreadyStarted(String),

    /// Represents an operation that requires the book to be in progress.
    #[error("Book {0} is not started or is finished")]
    NotInProgress(String),

    /// Represents an attempt to restart a book that isn't finished.
    #[error("Book {0} is not finished")]
    NotFinished(String),

    /// Represents a finishing date earlier than the starting date.
    #[error("Finishing date cannot be earlier than starting date")]
    DateOutOfOrder { started: Epoch, finished: Epoch },

    /// Represents a page count outside the range the book allows.
    #[error("Read pages ({pages}) must be at least 0 and less than total pages ({total})")]
    PagesOutOfRange { pages: i32, total: i32 },

    /// Represents a required text field that is empty after sanitization.
    #[error("The {0} must not be empty")]
    EmptyField(&'static str),

    /// Represents a total page count that isn't positive.
    #[error("Total pages must be positive, not {0}")]
    InvalidPageCount(i32),

    /// Represents a malformed book ID.
    #[error("Invalid ID {0:?}")]
    InvalidId(String),

    /// Represents an unknown status name.
    #[error("Invalid status {0:?}, must be one of unread, reading, finished")]
    InvalidStatus(String),

    /// Represents an error with the request.
    #[error("Incorrect parameters, please provide all required parameters")]
    BadRequest,

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a newly generated ID that is already taken.
    #[error("ID already exists")]
    IdAlreadyExists,

    /// Represents a stored row that breaks the record invariants.
    #[error("Stored record {0} is inconsistent")]
    CorruptRecord(String),

    /// Represents a storage backend that can no longer be used.
    #[error("Storage unavailable")]
    StorageUnavailable,

    /// Represents an error generating the URL of a book.
    #[error("Failed to generate URL")]
    FailedToGenerateUrl { source: url::ParseError },
}

/// The broad classes of failure a handler has to tell apart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    BadInput,
    NotFound,
    Conflict,
    Internal,
}

impl BackendError {
    pub fn class(&self) -> ErrorClass {
        use BackendError::*;

        match self {
            InvalidDateFormat(..)
            | DateOutOfOrder { .. }
            | PagesOutOfRange { .. }
            | EmptyField(..)
            | InvalidPageCount(..)
            | InvalidId(..)
            | InvalidStatus(..)
            | BadRequest => ErrorClass::BadInput,
            NotFound(..) | NoMatchingBooks => ErrorClass::NotFound,
            DuplicateBook { .. } | AlreadyStarted(..) | NotInProgress(..) | NotFinished(..) => {
                ErrorClass::Conflict
            }
            Sqlx { .. }
            | IdAlreadyExists
            | CorruptRecord(..)
            | StorageUnavailable
            | FailedToGenerateUrl { .. } => ErrorClass::Internal,
        }
    }

    /// A stable identifier for the error, included in error responses.
    pub fn code(&self) -> &'static str {
        use BackendError::*;

        match self {
            InvalidDateFormat(..) => "invalid_date_format",
            NotFound(..) => "not_found",
            NoMatchingBooks => "no_matching_books",
            DuplicateBook { .. } => "duplicate_book",
            AlreadyStarted(..) => "already_started",
            NotInProgress(..) => "not_in_progress",
            NotFinished(..) => "not_finished",
            DateOutOfOrder { .. } => "date_out_of_order",
            PagesOutOfRange { .. } => "pages_out_of_range",
            EmptyField(..) => "empty_field",
            InvalidPageCount(..) => "invalid_page_count",
            InvalidId(..) => "invalid_id",
            InvalidStatus(..) => "invalid_status",
            BadRequest => "bad_request",
            Sqlx { .. } | IdAlreadyExists | CorruptRecord(..) | StorageUnavailable => "storage",
            FailedToGenerateUrl { .. } => "internal",
        }
    }
}
