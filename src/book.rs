use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::date::{self, Epoch, SECONDS_PER_DAY};
use crate::errors::BackendError;

/// The length of a book ID.
pub const ID_LENGTH: usize = 32;

/// Generates a new book ID: 32 lowercase hexadecimal characters.
pub fn new_id() -> String {
    Uuid::new_v4().to_simple().to_string()
}

/// Checks that `id` looks like something `new_id` could have generated.
pub fn parse_id(id: &str) -> Result<&str, BackendError> {
    let well_formed = id.len() == ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if well_formed {
        Ok(id)
    } else {
        Err(BackendError::InvalidId(id.to_owned()))
    }
}

/// Where a book is in its lifecycle. This is never stored directly; it
/// follows from the starting and finishing dates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unread,
    Reading,
    Finished,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unread => "unread",
            Status::Reading => "reading",
            Status::Finished => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Status::Unread),
            "reading" => Ok(Status::Reading),
            "finished" => Ok(Status::Finished),
            _ => Err(BackendError::InvalidStatus(s.to_owned())),
        }
    }
}

/// The dates a book was started and finished on. A book can't be
/// finished without having been started.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Progress {
    Unread,
    Reading { started: Epoch },
    Finished { started: Epoch, finished: Epoch },
}

impl Progress {
    /// Rebuilds the progress from the two stored date columns.
    pub fn from_dates(started: Option<Epoch>, finished: Option<Epoch>) -> Option<Self> {
        match (started, finished) {
            (None, None) => Some(Progress::Unread),
            (Some(started), None) => Some(Progress::Reading { started }),
            (Some(started), Some(finished)) if started <= finished => {
                Some(Progress::Finished { started, finished })
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Progress::Unread => Status::Unread,
            Progress::Reading { .. } => Status::Reading,
            Progress::Finished { .. } => Status::Finished,
        }
    }

    pub fn started(&self) -> Option<Epoch> {
        match *self {
            Progress::Unread => None,
            Progress::Reading { started } | Progress::Finished { started, .. } => Some(started),
        }
    }

    pub fn finished(&self) -> Option<Epoch> {
        match *self {
            Progress::Finished { finished, .. } => Some(finished),
            _ => None,
        }
    }
}

/// A single book in the database.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Book {
    /// The ID of the book.
    pub(crate) id: String,

    /// The sanitized title. Unique together with the author when created.
    pub(crate) title: String,

    /// The sanitized author.
    pub(crate) author: String,

    /// The number of pages, always positive.
    pub(crate) total_pages: i32,

    /// The number of pages read so far, between 0 and `total_pages`.
    pub(crate) read_pages: i32,

    /// When it was started and finished.
    pub(crate) progress: Progress,

    /// Free-text notes.
    pub(crate) notes: String,
}

impl Book {
    /// Rebuilds a book from stored fields, rejecting combinations the
    /// lifecycle can never produce.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: String,
        title: String,
        author: String,
        total_pages: i32,
        read_pages: i32,
        date_started: Option<Epoch>,
        date_finished: Option<Epoch>,
        notes: String,
    ) -> Result<Self, BackendError> {
        let progress = Progress::from_dates(date_started, date_finished)
            .ok_or_else(|| BackendError::CorruptRecord(id.clone()))?;

        let finished = progress.status() == Status::Finished;
        let pages_consistent = total_pages > 0
            && read_pages >= 0
            && read_pages <= total_pages
            && (read_pages == total_pages) == finished;

        if !pages_consistent {
            return Err(BackendError::CorruptRecord(id));
        }

        Ok(Book {
            id,
            title,
            author,
            total_pages,
            read_pages,
            progress,
            notes,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
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

    pub fn read_pages(&self) -> i32 {
        self.read_pages
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn status(&self) -> Status {
        self.progress.status()
    }

    pub fn date_started(&self) -> Option<Epoch> {
        self.progress.started()
    }

    pub fn date_finished(&self) -> Option<Epoch> {
        self.progress.finished()
    }

    pub fn remaining_pages(&self) -> i32 {
        self.total_pages - self.read_pages
    }

    /// The share of pages read, rounded to a whole percentage.
    pub fn percentage_finished(&self) -> f64 {
        (self.read_fraction() * 100.0).round()
    }

    /// The share of pages left, rounded on its own rather than derived
    /// from `percentage_finished`. The two can disagree by one.
    pub fn percentage_left(&self) -> f64 {
        (100.0 - self.read_fraction() * 100.0).round()
    }

    /// Whole days between starting and finishing, at least one.
    pub fn days_read(&self) -> Option<i64> {
        match self.progress {
            Progress::Finished { started, finished } => {
                let days = (finished - started) / SECONDS_PER_DAY;
                Some(if days == 0 { 1 } else { days })
            }
            _ => None,
        }
    }

    fn read_fraction(&self) -> f64 {
        f64::from(self.read_pages) / f64::from(self.total_pages)
    }
}

/// Every detail of a book, as returned by the API.
#[derive(Clone, Debug, Serialize)]
pub struct BookDetails {
    id: String,
    title: String,
    author: String,
    status: Status,
    total_pages: i32,
    read_pages: i32,
    remaining_pages: i32,
    percentage_finished: f64,
    percentage_left: f64,
    #[serde(serialize_with = "date::serialize_option")]
    date_started: Option<Epoch>,
    #[serde(serialize_with = "date::serialize_option")]
    date_finished: Option<Epoch>,
    days_read: Option<i64>,
    notes: String,
}

impl From<&Book> for BookDetails {
    fn from(book: &Book) -> Self {
        BookDetails {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            status: book.status(),
            total_pages: book.total_pages,
            read_pages: book.read_pages,
            remaining_pages: book.remaining_pages(),
            percentage_finished: book.percentage_finished(),
            percentage_left: book.percentage_left(),
            date_started: book.date_started(),
            date_finished: book.date_finished(),
            days_read: book.days_read(),
            notes: book.notes.clone(),
        }
    }
}

/// A minimal version of a book.
#[derive(Clone, Debug, Serialize)]
pub struct PartialBook {
    id: String,
    title: String,
    author: String,
}

impl From<&Book> for PartialBook {
    fn from(book: &Book) -> Self {
        PartialBook {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
        }
    }
}

/// A book in progress with how far along it is.
#[derive(Clone, Debug, Serialize)]
pub struct ReadingBook {
    id: String,
    title: String,
    author: String,
    #[serde(serialize_with = "date::serialize_option")]
    date_started: Option<Epoch>,
    total_pages: i32,
    read_pages: i32,
    remaining_pages: i32,
    percentage_finished: f64,
    percentage_left: f64,
}

impl From<&Book> for ReadingBook {
    fn from(book: &Book) -> Self {
        ReadingBook {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            date_started: book.date_started(),
            total_pages: book.total_pages,
            read_pages: book.read_pages,
            remaining_pages: book.remaining_pages(),
            percentage_finished: book.percentage_finished(),
            percentage_left: book.percentage_left(),
        }
    }
}

/// A finished book with how long it took.
#[derive(Clone, Debug, Serialize)]
pub struct FinishedBook {
    id: String,
    title: String,
    author: String,
    #[serde(serialize_with = "date::serialize_option")]
    date_started: Option<Epoch>,
    #[serde(serialize_with = "date::serialize_option")]
    date_finished: Option<Epoch>,
    days_read: Option<i64>,
}

impl From<&Book> for FinishedBook {
    fn from(book: &Book) -> Self {
        FinishedBook {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            date_started: book.date_started(),
            date_finished: book.date_finished(),
            days_read: book.days_read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(read_pages: i32, total_pages: i32, started: Option<Epoch>, finished: Option<Epoch>) -> Book {
        Book::from_storage(
            new_id(),
            "Dune".to_owned(),
            "Herbert".to_owned(),
            total_pages,
            read_pages,
            started,
            finished,
            String::new(),
        )
        .unwrap()
    }

    #[test]
    fn generated_ids_are_well_formed() {
        let a = new_id();
        let b = new_id();

        assert_eq!(a.len(), ID_LENGTH);
        assert!(parse_id(&a).is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for id in &["", "xyz", "ABCDEF0123456789ABCDEF0123456789", "0123456789abcdef0123456789abcde"] {
            assert!(matches!(parse_id(id), Err(BackendError::InvalidId(_))), "{:?}", id);
        }
    }

    #[test]
    fn status_follows_dates() {
        assert_eq!(Progress::from_dates(None, None).unwrap().status(), Status::Unread);
        assert_eq!(Progress::from_dates(Some(0), None).unwrap().status(), Status::Reading);
        assert_eq!(Progress::from_dates(Some(0), Some(0)).unwrap().status(), Status::Finished);
        assert_eq!(Progress::from_dates(None, Some(0)), None);
        assert_eq!(Progress::from_dates(Some(SECONDS_PER_DAY), Some(0)), None);
    }

    #[test]
    fn status_names_round_trip() {
        for status in &[Status::Unread, Status::Reading, Status::Finished] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), *status);
        }

        assert!(matches!("Reading".parse::<Status>(), Err(BackendError::InvalidStatus(_))));
    }

    #[test]
    fn inconsistent_rows_are_rejected() {
        let load = |read, total, started, finished| {
            Book::from_storage(
                new_id(),
                "t".to_owned(),
                "a".to_owned(),
                total,
                read,
                started,
                finished,
                String::new(),
            )
        };

        assert!(matches!(load(10, 10, Some(0), None), Err(BackendError::CorruptRecord(_))));
        assert!(matches!(load(5, 10, Some(0), Some(0)), Err(BackendError::CorruptRecord(_))));
        assert!(matches!(load(-1, 10, None, None), Err(BackendError::CorruptRecord(_))));
        assert!(matches!(load(0, 0, None, None), Err(BackendError::CorruptRecord(_))));
        assert!(matches!(load(0, 10, None, Some(0)), Err(BackendError::CorruptRecord(_))));
    }

    #[test]
    fn progress_figures() {
        let reading = book(300, 600, Some(0), None);

        assert_eq!(reading.remaining_pages(), 300);
        assert_eq!(reading.percentage_finished(), 50.0);
        assert_eq!(reading.percentage_left(), 50.0);
        assert_eq!(reading.days_read(), None);
    }

    #[test]
    fn percentages_round_independently() {
        // 1/8 is 12.5%: both halves round away from zero
        let reading = book(1, 8, Some(0), None);

        assert_eq!(reading.percentage_finished(), 13.0);
        assert_eq!(reading.percentage_left(), 88.0);
    }

    #[test]
    fn days_read_has_a_floor_of_one() {
        let same_day = book(600, 600, Some(0), Some(0));
        let nine_days = book(600, 600, Some(0), Some(9 * SECONDS_PER_DAY));

        assert_eq!(same_day.days_read(), Some(1));
        assert_eq!(nine_days.days_read(), Some(9));
    }

    #[test]
    fn details_render_unset_dates_as_null() {
        let unread = book(0, 600, None, None);
        let json = serde_json::to_value(BookDetails::from(&unread)).unwrap();

        assert_eq!(json["status"], "unread");
        assert!(json["date_started"].is_null());
        assert!(json["date_finished"].is_null());

        let finished = book(600, 600, Some(1_704_067_200), Some(1_704_844_800));
        let json = serde_json::to_value(FinishedBook::from(&finished)).unwrap();

        assert_eq!(json["date_started"], "01-Jan-2024");
        assert_eq!(json["date_finished"], "10-Jan-2024");
        assert_eq!(json["days_read"], 9);
    }
}
