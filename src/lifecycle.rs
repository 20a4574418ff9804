//! Decides whether a requested change to a book is allowed and what the
//! book looks like afterwards.
//!
//! ```text
//! Unread --start--> Reading --finish--> Finished --restart--> Unread
//! Reading --update_progress--> Reading
//! ```
//!
//! Every function here is pure: it either returns the new state of the
//! book or the reason the change was refused, and the caller persists
//! the result. All checks happen before any field is changed.

use serde::Deserialize;

use crate::book::{self, Book, Progress, Status};
use crate::date;
use crate::errors::BackendError;
use crate::sanitization::{self, sanitize};

/// The user-supplied details of a book.
#[derive(Clone, Debug, Deserialize)]
pub struct BookDraft {
    /// The title. Sanitized.
    #[serde(deserialize_with = "sanitization::deserialize")]
    pub(crate) title: String,

    /// The author. Sanitized.
    #[serde(deserialize_with = "sanitization::deserialize")]
    pub(crate) author: String,

    /// The number of pages.
    pub(crate) total_pages: i32,
}

impl BookDraft {
    pub fn new(title: impl AsRef<str>, author: impl AsRef<str>, total_pages: i32) -> Self {
        BookDraft {
            title: sanitize(title),
            author: sanitize(author),
            total_pages,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn total_pages(&self) -> i32 {
        self.total_pages
    }

    fn validate(&self) -> Result<(), BackendError> {
        if self.title.is_empty() {
            return Err(BackendError::EmptyField("title"));
        }

        if self.author.is_empty() {
            return Err(BackendError::EmptyField("author"));
        }

        if self.total_pages <= 0 {
            return Err(BackendError::InvalidPageCount(self.total_pages));
        }

        Ok(())
    }

    fn duplicate_error(&self) -> BackendError {
        BackendError::DuplicateBook {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Creates an unread book. `existing` is whatever book already has the
/// same title and author.
pub fn create(draft: BookDraft, existing: Option<&Book>) -> Result<Book, BackendError> {
    draft.validate()?;

    if existing.is_some() {
        return Err(draft.duplicate_error());
    }

    Ok(Book {
        id: book::new_id(),
        title: draft.title,
        author: draft.author,
        total_pages: draft.total_pages,
        read_pages: 0,
        progress: Progress::Unread,
        notes: String::new(),
    })
}

/// Replaces the title, author and page count. `existing` is whatever
/// book already has the same title, author and page count; the book
/// itself doesn't count.
///
/// A finished book keeps all its pages read. An unfinished book can't
/// shrink to the pages already read.
pub fn update_details(
    book: &Book,
    draft: BookDraft,
    existing: Option<&Book>,
) -> Result<Book, BackendError> {
    draft.validate()?;

    if existing.map_or(false, |other| other.id != book.id) {
        return Err(draft.duplicate_error());
    }

    let read_pages = match book.status() {
        Status::Finished => draft.total_pages,
        _ if book.read_pages >= draft.total_pages => {
            return Err(BackendError::PagesOutOfRange {
                pages: book.read_pages,
                total: draft.total_pages,
            })
        }
        _ => book.read_pages,
    };

    Ok(Book {
        title: draft.title,
        author: draft.author,
        total_pages: draft.total_pages,
        read_pages,
        ..book.clone()
    })
}

/// Starts an unread book on the given date.
pub fn start(book: &Book, date: &str) -> Result<Book, BackendError> {
    let started = date::parse(date)?;

    match book.progress {
        Progress::Unread => Ok(Book {
            progress: Progress::Reading { started },
            ..book.clone()
        }),
        _ => Err(BackendError::AlreadyStarted(book.id.clone())),
    }
}

/// Finishes a book in progress on the given date, marking every page
/// read.
pub fn finish(book: &Book, date: &str) -> Result<Book, BackendError> {
    let finished = date::parse(date)?;

    if let Some(started) = book.progress.started() {
        if finished < started {
            return Err(BackendError::DateOutOfOrder { started, finished });
        }
    }

    match book.progress {
        Progress::Reading { started } => Ok(Book {
            progress: Progress::Finished { started, finished },
            read_pages: book.total_pages,
            ..book.clone()
        }),
        _ => Err(BackendError::NotInProgress(book.id.clone())),
    }
}

/// Records how many pages of a book in progress have been read. Only
/// `finish` can mark the last page read.
pub fn update_progress(book: &Book, pages: i32) -> Result<Book, BackendError> {
    if pages < 0 || pages >= book.total_pages {
        return Err(BackendError::PagesOutOfRange {
            pages,
            total: book.total_pages,
        });
    }

    match book.progress {
        Progress::Reading { .. } => Ok(Book {
            read_pages: pages,
            ..book.clone()
        }),
        _ => Err(BackendError::NotInProgress(book.id.clone())),
    }
}

/// Returns a finished book to unread.
pub fn restart(book: &Book) -> Result<Book, BackendError> {
    match book.progress {
        Progress::Finished { .. } => Ok(Book {
            progress: Progress::Unread,
            read_pages: 0,
            ..book.clone()
        }),
        _ => Err(BackendError::NotFinished(book.id.clone())),
    }
}

/// Replaces the notes.
pub fn add_note(book: &Book, text: &str) -> Result<Book, BackendError> {
    Ok(Book {
        notes: sanitize(text),
        ..book.clone()
    })
}

/// Appends to the notes, always separated by one space, even when there
/// were no notes before.
pub fn append_note(book: &Book, text: &str) -> Result<Book, BackendError> {
    Ok(Book {
        notes: format!("{} {}", book.notes, sanitize(text)),
        ..book.clone()
    })
}
