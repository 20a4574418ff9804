use std::time::{Duration, Instant};

use log::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::book::{parse_id, Book, BookDetails, FinishedBook, PartialBook, ReadingBook, Status};
use crate::date;
use crate::db::Transition;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::lifecycle::{self, BookDraft};
use crate::routes::{
    query::{AuthorQuery, DateRequest, LookupQuery, NoteRequest, PeriodQuery, ProgressRequest},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {{
        let start = Instant::now();

        // errors return early, so they go out without the header
        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn create(environment: Environment, draft: BookDraft) -> RouteResult {
    timed! {
        let context = Context::create(draft.title(), draft.author());
        let error_handler = |e: BackendError| Rejection::new(context.clone(), e);

        debug!(environment.logger, "Creating book..."; "title" => draft.title(), "author" => draft.author());
        let book = environment.db.create(draft).await.map_err(error_handler)?;

        let location = environment
            .urls
            .book(book.id())
            .map_err(|source| BackendError::FailedToGenerateUrl { source })
            .map_err(error_handler)?;
        debug!(environment.logger, "Created book"; "id" => book.id());

        with_header(
            with_status(
                json(&SuccessResponse::Id { id: book.id().to_owned() }),
                StatusCode::CREATED,
            ),
            "location",
            location.as_str(),
        )
    }
}

pub async fn list_all(environment: Environment) -> RouteResult {
    timed! {
        let books = environment
            .db
            .retrieve_all()
            .await
            .map_err(|e| Rejection::new(Context::list_all(), e))?;

        json(&SuccessResponse::Books { books: books.iter().map(BookDetails::from).collect() })
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Retrieving book..."; "id" => id);

        let book = environment
            .db
            .retrieve(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::NotFound(id.to_owned())))?;

        json(&SuccessResponse::Book(BookDetails::from(&book)))
    }
}

pub async fn update_details(environment: Environment, id: String, draft: BookDraft) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update_details(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Updating book details..."; "id" => id);

        let book = environment
            .db
            .update_details(id, draft)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Book(BookDetails::from(&book)))
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Deleting book..."; "id" => id);

        environment.db.delete(id).await.map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn start(environment: Environment, id: String, request: DateRequest) -> RouteResult {
    let DateRequest { date } = request;
    let transition: Transition = Box::new(move |book: &Book| lifecycle::start(book, &date));

    modify(environment, Context::start(id.clone()), id, transition).await
}

pub async fn finish(environment: Environment, id: String, request: DateRequest) -> RouteResult {
    let DateRequest { date } = request;
    let transition: Transition = Box::new(move |book: &Book| lifecycle::finish(book, &date));

    modify(environment, Context::finish(id.clone()), id, transition).await
}

pub async fn update_progress(
    environment: Environment,
    id: String,
    request: ProgressRequest,
) -> RouteResult {
    let ProgressRequest { pages } = request;
    let transition: Transition = Box::new(move |book: &Book| lifecycle::update_progress(book, pages));

    modify(environment, Context::update_progress(id.clone()), id, transition).await
}

pub async fn restart(environment: Environment, id: String) -> RouteResult {
    let transition: Transition = Box::new(|book: &Book| lifecycle::restart(book));

    modify(environment, Context::restart(id.clone()), id, transition).await
}

pub async fn add_note(environment: Environment, id: String, request: NoteRequest) -> RouteResult {
    let NoteRequest { note } = request;
    let transition: Transition = Box::new(move |book: &Book| lifecycle::add_note(book, &note));

    modify(environment, Context::add_note(id.clone()), id, transition).await
}

pub async fn append_note(environment: Environment, id: String, request: NoteRequest) -> RouteResult {
    let NoteRequest { note } = request;
    let transition: Transition = Box::new(move |book: &Book| lifecycle::append_note(book, &note));

    modify(environment, Context::append_note(id.clone()), id, transition).await
}

pub async fn lookup(environment: Environment, query: LookupQuery) -> RouteResult {
    timed! {
        let LookupQuery { title, author } = query;
        debug!(environment.logger, "Looking up book..."; "title" => &title, "author" => &author);

        let error_handler = |e: BackendError| Rejection::new(Context::lookup(title.clone(), author.clone()), e);

        let book = environment
            .db
            .find_by_title_author(&title, &author)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::NoMatchingBooks))?;

        json(&SuccessResponse::Id { id: book.id().to_owned() })
    }
}

pub async fn list_by_status(environment: Environment, status: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::list_by_status(status.clone()), e);

        let status: Status = status.parse().map_err(error_handler)?;
        debug!(environment.logger, "Listing books..."; "status" => %status);

        let books = environment
            .db
            .retrieve_by_status(status)
            .await
            .map_err(error_handler)?;

        let response = match status {
            Status::Unread => SuccessResponse::Partial {
                books: books.iter().map(PartialBook::from).collect(),
            },
            Status::Reading => SuccessResponse::Reading {
                books: books.iter().map(ReadingBook::from).collect(),
            },
            Status::Finished => SuccessResponse::Finished {
                books: books.iter().map(FinishedBook::from).collect(),
            },
        };

        json(&response)
    }
}

pub async fn list_by_author(environment: Environment, query: AuthorQuery) -> RouteResult {
    timed! {
        let AuthorQuery { author } = query;
        let error_handler = |e: BackendError| Rejection::new(Context::list_by_author(author.clone()), e);

        let books = environment
            .db
            .retrieve_by_author(&author)
            .await
            .map_err(error_handler)?;

        if books.is_empty() {
            return Err(error_handler(BackendError::NoMatchingBooks).into());
        }

        json(&SuccessResponse::Partial { books: books.iter().map(PartialBook::from).collect() })
    }
}

pub async fn list_in_period(environment: Environment, query: PeriodQuery) -> RouteResult {
    timed! {
        let PeriodQuery { from, to } = query;
        let error_handler = |e: BackendError| Rejection::new(Context::list_in_period(from.clone(), to.clone()), e);

        let start_of_period = date::parse(&from).map_err(error_handler)?;
        let end_of_period = date::parse(&to).map_err(error_handler)?;

        let books = environment
            .db
            .retrieve_in_period(start_of_period, end_of_period)
            .await
            .map_err(error_handler)?;

        if books.is_empty() {
            return Err(error_handler(BackendError::NoMatchingBooks).into());
        }

        json(&SuccessResponse::Finished { books: books.iter().map(FinishedBook::from).collect() })
    }
}

async fn modify(
    environment: Environment,
    context: Context,
    id: String,
    transition: Transition,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(context.clone(), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Modifying book..."; "id" => id, "context" => ?context);

        let book = environment
            .db
            .modify(id, transition)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Book(BookDetails::from(&book)))
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
