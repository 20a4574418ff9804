use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{Db, Transition};
use crate::book::{Book, Status};
use crate::date::Epoch;
use crate::errors::BackendError;
use crate::lifecycle::{self, BookDraft};

type Books = HashMap<String, Book>;

/// Keeps books in memory for as long as the process runs.
#[derive(Debug, Default)]
pub struct MemoryDb {
    books: RwLock<Books>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<Books>, BackendError> {
        self.books.read().map_err(|_| BackendError::StorageUnavailable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<Books>, BackendError> {
        self.books.write().map_err(|_| BackendError::StorageUnavailable)
    }

    fn filter<F>(&self, predicate: F) -> Result<Vec<Book>, BackendError>
    where F: Fn(&Book) -> bool {
        Ok(self.read()?.values().filter(|b| predicate(*b)).cloned().collect())
    }
}

impl Db for MemoryDb {
    fn retrieve(&self, id: &str) -> BoxFuture<Result<Option<Book>, BackendError>> {
        let id = id.to_owned();

        async move { Ok(self.read()?.get(&id).cloned()) }.boxed()
    }

    fn find_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> BoxFuture<Result<Option<Book>, BackendError>> {
        let title = title.to_owned();
        let author = author.to_owned();

        async move {
            let books = self.read()?;
            Ok(find(&books, |b| b.title == title && b.author == author))
        }
        .boxed()
    }

    fn find_by_title_author_pages(
        &self,
        title: &str,
        author: &str,
        total_pages: i32,
    ) -> BoxFuture<Result<Option<Book>, BackendError>> {
        let title = title.to_owned();
        let author = author.to_owned();

        async move {
            let books = self.read()?;
            Ok(find(&books, |b| {
                b.title == title && b.author == author && b.total_pages == total_pages
            }))
        }
        .boxed()
    }

    fn create(&self, draft: BookDraft) -> BoxFuture<Result<Book, BackendError>> {
        async move {
            let mut books = self.write()?;

            let existing = find(&books, |b| b.title == draft.title && b.author == draft.author);
            let book = lifecycle::create(draft, existing.as_ref())?;

            if books.contains_key(&book.id) {
                return Err(BackendError::IdAlreadyExists);
            }

            books.insert(book.id.clone(), book.clone());
            Ok(book)
        }
        .boxed()
    }

    fn update_details(&self, id: &str, draft: BookDraft) -> BoxFuture<Result<Book, BackendError>> {
        let id = id.to_owned();

        async move {
            let mut books = self.write()?;

            let book = books
                .get(&id)
                .ok_or_else(|| BackendError::NotFound(id.clone()))?;
            let existing = find(&books, |b| {
                b.title == draft.title && b.author == draft.author && b.total_pages == draft.total_pages
            });
            let updated = lifecycle::update_details(book, draft, existing.as_ref())?;

            books.insert(id, updated.clone());
            Ok(updated)
        }
        .boxed()
    }

    fn modify(&self, id: &str, transition: Transition) -> BoxFuture<Result<Book, BackendError>> {
        let id = id.to_owned();

        async move {
            let mut books = self.write()?;

            let book = books
                .get_mut(&id)
                .ok_or_else(|| BackendError::NotFound(id.clone()))?;
            let updated = transition(&*book)?;

            *book = updated.clone();
            Ok(updated)
        }
        .boxed()
    }

    fn delete(&self, id: &str) -> BoxFuture<Result<(), BackendError>> {
        let id = id.to_owned();

        async move {
            match self.write()?.remove(&id) {
                Some(_) => Ok(()),
                None => Err(BackendError::NotFound(id)),
            }
        }
        .boxed()
    }

    fn retrieve_all(&self) -> BoxFuture<Result<Vec<Book>, BackendError>> {
        async move { self.filter(|_| true) }.boxed()
    }

    fn retrieve_by_status(&self, status: Status) -> BoxFuture<Result<Vec<Book>, BackendError>> {
        async move { self.filter(|b| b.status() == status) }.boxed()
    }

    fn retrieve_by_author(&self, author: &str) -> BoxFuture<Result<Vec<Book>, BackendError>> {
        let author = author.to_owned();

        async move { self.filter(|b| b.author == author) }.boxed()
    }

    fn retrieve_in_period(
        &self,
        from: Epoch,
        to: Epoch,
    ) -> BoxFuture<Result<Vec<Book>, BackendError>> {
        let within = move |date: Option<Epoch>| date.map_or(false, |d| from <= d && d <= to);

        async move { self.filter(|b| within(b.date_started()) && within(b.date_finished())) }.boxed()
    }
}

fn find<F>(books: &Books, predicate: F) -> Option<Book>
where F: Fn(&Book) -> bool {
    books.values().find(|b| predicate(*b)).cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use futures::executor::block_on;

    use super::*;
    use crate::date;

    fn dune() -> BookDraft {
        BookDraft::new("Dune", "Herbert", 600)
    }

    fn start(date: &'static str) -> Transition {
        Box::new(move |book: &Book| lifecycle::start(book, date))
    }

    fn finish(date: &'static str) -> Transition {
        Box::new(move |book: &Book| lifecycle::finish(book, date))
    }

    #[test]
    fn created_books_can_be_found() {
        let db = MemoryDb::new();
        let book = block_on(db.create(dune())).unwrap();

        assert_eq!(block_on(db.retrieve(book.id())).unwrap(), Some(book.clone()));
        assert_eq!(
            block_on(db.find_by_title_author("Dune", "Herbert")).unwrap(),
            Some(book.clone())
        );
        assert_eq!(
            block_on(db.find_by_title_author_pages("Dune", "Herbert", 601)).unwrap(),
            None
        );
        assert_eq!(block_on(db.retrieve_all()).unwrap(), vec![book]);
    }

    #[test]
    fn duplicates_are_refused() {
        let db = MemoryDb::new();
        block_on(db.create(dune())).unwrap();

        assert!(matches!(
            block_on(db.create(BookDraft::new("Dune", "Herbert", 412))),
            Err(BackendError::DuplicateBook { .. })
        ));
        assert_eq!(block_on(db.retrieve_all()).unwrap().len(), 1);
    }

    #[test]
    fn updating_details_checks_other_books() {
        let db = MemoryDb::new();
        let dune = block_on(db.create(dune())).unwrap();
        block_on(db.create(BookDraft::new("Emma", "Austen", 474))).unwrap();

        assert!(matches!(
            block_on(db.update_details(dune.id(), BookDraft::new("Emma", "Austen", 474))),
            Err(BackendError::DuplicateBook { .. })
        ));

        let updated = block_on(db.update_details(dune.id(), BookDraft::new("Dune", "Herbert", 612))).unwrap();
        assert_eq!(updated.total_pages(), 612);
        assert_eq!(block_on(db.retrieve(dune.id())).unwrap(), Some(updated));
    }

    #[test]
    fn missing_books_are_not_found() {
        let db = MemoryDb::new();
        let id = crate::book::new_id();

        assert!(matches!(block_on(db.modify(&id, start("01-Jan-2024"))), Err(BackendError::NotFound(_))));
        assert!(matches!(block_on(db.delete(&id)), Err(BackendError::NotFound(_))));
        assert!(matches!(
            block_on(db.update_details(&id, dune())),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn refused_transitions_leave_the_book_alone() {
        let db = MemoryDb::new();
        let book = block_on(db.create(dune())).unwrap();

        assert!(block_on(db.modify(book.id(), finish("10-Jan-2024"))).is_err());
        assert_eq!(block_on(db.retrieve(book.id())).unwrap(), Some(book));
    }

    #[test]
    fn listings_filter_books() {
        let db = MemoryDb::new();
        let dune = block_on(db.create(dune())).unwrap();
        let emma = block_on(db.create(BookDraft::new("Emma", "Austen", 474))).unwrap();
        let persuasion = block_on(db.create(BookDraft::new("Persuasion", "Austen", 249))).unwrap();

        block_on(db.modify(emma.id(), start("01-Jan-2024"))).unwrap();
        block_on(db.modify(persuasion.id(), start("01-Jan-2024"))).unwrap();
        block_on(db.modify(persuasion.id(), finish("10-Jan-2024"))).unwrap();

        let ids = |books: Vec<Book>| {
            let mut ids: Vec<String> = books.into_iter().map(|b| b.id).collect();
            ids.sort();
            ids
        };
        let sorted = |mut ids: Vec<&str>| {
            ids.sort();
            ids.into_iter().map(str::to_owned).collect::<Vec<_>>()
        };

        assert_eq!(ids(block_on(db.retrieve_by_status(Status::Unread)).unwrap()), sorted(vec![dune.id()]));
        assert_eq!(ids(block_on(db.retrieve_by_status(Status::Reading)).unwrap()), sorted(vec![emma.id()]));
        assert_eq!(
            ids(block_on(db.retrieve_by_status(Status::Finished)).unwrap()),
            sorted(vec![persuasion.id()])
        );
        assert_eq!(
            ids(block_on(db.retrieve_by_author("Austen")).unwrap()),
            sorted(vec![emma.id(), persuasion.id()])
        );
        assert!(block_on(db.retrieve_by_author("austen")).unwrap().is_empty());

        let from = date::parse("01-Jan-2024").unwrap();
        let to = date::parse("10-Jan-2024").unwrap();
        assert_eq!(
            ids(block_on(db.retrieve_in_period(from, to)).unwrap()),
            sorted(vec![persuasion.id()])
        );
        assert!(block_on(db.retrieve_in_period(from, to - 1)).unwrap().is_empty());
    }

    #[test]
    fn concurrent_finishes_apply_once() {
        let db = Arc::new(MemoryDb::new());
        let book = block_on(db.create(dune())).unwrap();
        block_on(db.modify(book.id(), start("01-Jan-2024"))).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                let id = book.id().to_owned();
                thread::spawn(move || block_on(db.modify(&id, finish("10-Jan-2024"))))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BackendError::NotInProgress(_))));
    }

    #[test]
    fn concurrent_creations_leave_one_book() {
        let db = Arc::new(MemoryDb::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || block_on(db.create(BookDraft::new("Dune", "Herbert", 600))))
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(created, 1);
        assert_eq!(block_on(db.retrieve_all()).unwrap().len(), 1);
    }
}
