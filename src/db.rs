use futures::future::BoxFuture;

use crate::book::{Book, Status};
use crate::date::Epoch;
use crate::errors::BackendError;
use crate::lifecycle::BookDraft;

pub mod memory;

/// A change to a single book, applied while no other change to that
/// book can run.
pub type Transition = Box<dyn FnOnce(&Book) -> Result<Book, BackendError> + Send>;

/// Durable storage for books.
///
/// Listings come back in whatever order the storage produces.
pub trait Db {
    fn retrieve(&self, id: &str) -> BoxFuture<Result<Option<Book>, BackendError>>;

    fn find_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> BoxFuture<Result<Option<Book>, BackendError>>;

    fn find_by_title_author_pages(
        &self,
        title: &str,
        author: &str,
        total_pages: i32,
    ) -> BoxFuture<Result<Option<Book>, BackendError>>;

    /// Creates a book unless one with the same title and author exists.
    fn create(&self, draft: BookDraft) -> BoxFuture<Result<Book, BackendError>>;

    /// Replaces the details of a book unless another book already has
    /// exactly those details.
    fn update_details(&self, id: &str, draft: BookDraft)
        -> BoxFuture<Result<Book, BackendError>>;

    /// Loads a book, runs `transition` on it and saves the result, as
    /// one step with respect to other changes to the same book.
    fn modify(&self, id: &str, transition: Transition) -> BoxFuture<Result<Book, BackendError>>;

    fn delete(&self, id: &str) -> BoxFuture<Result<(), BackendError>>;

    fn retrieve_all(&self) -> BoxFuture<Result<Vec<Book>, BackendError>>;

    fn retrieve_by_status(&self, status: Status) -> BoxFuture<Result<Vec<Book>, BackendError>>;

    fn retrieve_by_author(&self, author: &str) -> BoxFuture<Result<Vec<Book>, BackendError>>;

    /// Retrieves the books both started and finished between `from` and
    /// `to`, inclusive.
    fn retrieve_in_period(
        &self,
        from: Epoch,
        to: Epoch,
    ) -> BoxFuture<Result<Vec<Book>, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
        Postgres, Transaction,
    };

    use super::Transition;
    use crate::book::{Book, Status};
    use crate::date::Epoch;
    use crate::errors::BackendError;
    use crate::lifecycle::{self, BookDraft};

    const BOOKS_ID_CONSTRAINT: &str = "books_primary_key";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn retrieve(&self, id: &str) -> BoxFuture<Result<Option<Book>, BackendError>> {
            let id = id.to_owned();

            async move {
                let book = sqlx::query(include_str!("queries/retrieve.sql"))
                    .bind(&id)
                    .try_map(book_from_row)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(book)
            }
            .boxed()
        }

        fn find_by_title_author(
            &self,
            title: &str,
            author: &str,
        ) -> BoxFuture<Result<Option<Book>, BackendError>> {
            let title = title.to_owned();
            let author = author.to_owned();

            async move {
                let book = sqlx::query(include_str!("queries/retrieve_by_title_author.sql"))
                    .bind(&title)
                    .bind(&author)
                    .try_map(book_from_row)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(book)
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
                let book = sqlx::query(include_str!("queries/retrieve_by_title_author_pages.sql"))
                    .bind(&title)
                    .bind(&author)
                    .bind(total_pages)
                    .try_map(book_from_row)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(book)
            }
            .boxed()
        }

        fn create(&self, draft: BookDraft) -> BoxFuture<Result<Book, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                lock_title_author(&mut tx, &draft.title, &draft.author).await?;

                let existing = sqlx::query(include_str!("queries/retrieve_by_title_author.sql"))
                    .bind(&draft.title)
                    .bind(&draft.author)
                    .try_map(book_from_row)
                    .fetch_optional(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                let book = lifecycle::create(draft, existing.as_ref())?;

                sqlx::query(include_str!("queries/create.sql"))
                    .bind(&book.id)
                    .bind(&book.title)
                    .bind(&book.author)
                    .bind(book.total_pages)
                    .bind(book.read_pages)
                    .bind(book.date_started())
                    .bind(book.date_finished())
                    .bind(&book.notes)
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(book)
            }
            .boxed()
        }

        fn update_details(
            &self,
            id: &str,
            draft: BookDraft,
        ) -> BoxFuture<Result<Book, BackendError>> {
            let id = id.to_owned();

            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                // always lock the title and author before the row
                lock_title_author(&mut tx, &draft.title, &draft.author).await?;
                let book = retrieve_for_update(&mut tx, &id).await?;

                let existing =
                    sqlx::query(include_str!("queries/retrieve_by_title_author_pages.sql"))
                        .bind(&draft.title)
                        .bind(&draft.author)
                        .bind(draft.total_pages)
                        .try_map(book_from_row)
                        .fetch_optional(&mut tx)
                        .await
                        .map_err(map_sqlx_error)?;

                let updated = lifecycle::update_details(&book, draft, existing.as_ref())?;

                save(&mut tx, &updated).await?;
                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(updated)
            }
            .boxed()
        }

        fn modify(&self, id: &str, transition: Transition) -> BoxFuture<Result<Book, BackendError>> {
            let id = id.to_owned();

            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let book = retrieve_for_update(&mut tx, &id).await?;
                let updated = transition(&book)?;

                save(&mut tx, &updated).await?;
                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(updated)
            }
            .boxed()
        }

        fn delete(&self, id: &str) -> BoxFuture<Result<(), BackendError>> {
            let id = id.to_owned();

            async move {
                let count = sqlx::query(include_str!("queries/delete.sql"))
                    .bind(&id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NotFound(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn retrieve_all(&self) -> BoxFuture<Result<Vec<Book>, BackendError>> {
            async move {
                let books = sqlx::query(include_str!("queries/retrieve_all.sql"))
                    .try_map(book_from_row)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(books)
            }
            .boxed()
        }

        fn retrieve_by_status(&self, status: Status) -> BoxFuture<Result<Vec<Book>, BackendError>> {
            let sql = match status {
                Status::Unread => include_str!("queries/retrieve_unread.sql"),
                Status::Reading => include_str!("queries/retrieve_reading.sql"),
                Status::Finished => include_str!("queries/retrieve_finished.sql"),
            };

            async move {
                let books = sqlx::query(sql)
                    .try_map(book_from_row)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(books)
            }
            .boxed()
        }

        fn retrieve_by_author(&self, author: &str) -> BoxFuture<Result<Vec<Book>, BackendError>> {
            let author = author.to_owned();

            async move {
                let books = sqlx::query(include_str!("queries/retrieve_by_author.sql"))
                    .bind(&author)
                    .try_map(book_from_row)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(books)
            }
            .boxed()
        }

        fn retrieve_in_period(
            &self,
            from: Epoch,
            to: Epoch,
        ) -> BoxFuture<Result<Vec<Book>, BackendError>> {
            async move {
                let books = sqlx::query(include_str!("queries/retrieve_in_period.sql"))
                    .bind(from)
                    .bind(to)
                    .try_map(book_from_row)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(books)
            }
            .boxed()
        }
    }

    /// Serializes creations and detail updates that share a title and
    /// author until the transaction ends.
    async fn lock_title_author(
        tx: &mut Transaction<'_, Postgres>,
        title: &str,
        author: &str,
    ) -> Result<(), BackendError> {
        sqlx::query(include_str!("queries/lock_title_author.sql"))
            .bind(title)
            .bind(author)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn retrieve_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Book, BackendError> {
        let book = sqlx::query(include_str!("queries/retrieve_for_update.sql"))
            .bind(id)
            .try_map(book_from_row)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        book.ok_or_else(|| BackendError::NotFound(id.to_owned()))
    }

    async fn save(tx: &mut Transaction<'_, Postgres>, book: &Book) -> Result<(), BackendError> {
        sqlx::query(include_str!("queries/update.sql"))
            .bind(&book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.total_pages)
            .bind(book.read_pages)
            .bind(book.date_started())
            .bind(book.date_finished())
            .bind(&book.notes)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    fn book_from_row(row: PgRow) -> Result<Book, sqlx::Error> {
        let id: String = try_get(&row, "id")?;

        Book::from_storage(
            id,
            try_get(&row, "title")?,
            try_get(&row, "author")?,
            try_get(&row, "total_pages")?,
            try_get(&row, "read_pages")?,
            try_get(&row, "date_started")?,
            try_get(&row, "date_finished")?,
            try_get(&row, "notes")?,
        )
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    fn try_get<'a, T: sqlx::Type<Postgres> + sqlx::decode::Decode<'a, Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(BOOKS_ID_CONSTRAINT) => {
                BackendError::IdAlreadyExists
            }
            _ => BackendError::Sqlx { source: error },
        }
    }

}
