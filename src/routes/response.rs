use serde::Serialize;

use crate::book::{BookDetails, FinishedBook, PartialBook, ReadingBook};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Book(BookDetails),
    Books { books: Vec<BookDetails> },
    Finished { books: Vec<FinishedBook> },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Id { id: String },
    Partial { books: Vec<PartialBook> },
    Reading { books: Vec<ReadingBook> },
}
