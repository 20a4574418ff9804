use std::sync::Arc;

use log::{debug, error, Logger};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{self, InvalidQuery};
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::{BackendError, ErrorClass};

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// Builds every book route, with rejections turned into JSON errors.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_create_route(environment.clone())
        .or(make_list_all_route(environment.clone()))
        .or(make_retrieve_route(environment.clone()))
        .or(make_update_details_route(environment.clone()))
        .or(make_delete_route(environment.clone()))
        .or(make_start_route(environment.clone()))
        .or(make_finish_route(environment.clone()))
        .or(make_progress_route(environment.clone()))
        .or(make_restart_route(environment.clone()))
        .or(make_add_note_route(environment.clone()))
        .or(make_append_note_route(environment.clone()))
        .or(make_lookup_route(environment.clone()))
        .or(make_status_route(environment.clone()))
        .or(make_author_route(environment.clone()))
        .or(make_period_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    let malformed = rej
        .find::<BodyDeserializeError>()
        .map(ToString::to_string)
        .or_else(|| rej.find::<InvalidQuery>().map(ToString::to_string));

    if let Some(reason) = malformed {
        debug!(logger, "Malformed request"; "reason" => reason);
        let r = rejection::Rejection::new(rejection::Context::request(), BackendError::BadRequest);

        return Ok(with_status(json(&r.flatten()), StatusCode::BAD_REQUEST));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    match e.class() {
        ErrorClass::BadInput => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::body::json;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q};
    use crate::environment::Environment;
    use crate::lifecycle::BookDraft;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
        ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
        ($route_variable:ident; $first:expr, $($rest:expr),+) => (
            let $route_variable = $route_variable.and($first);
            route_filter!($route_variable; $($rest),+);
        )
    }

    macro_rules! route {
        ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
            pub fn $name(environment: Environment) -> Route {
                let r = environment.urls.books_path.clone();

                let $route_variable = warp::any()
                    .map(move || environment.clone())
                    .and(p(r));

                route_filter!($route_variable; $($filters),+);

                $route_variable.and_then(handlers::$handler)
                    .boxed()
            }
        );
    }

    route!(make_create_route => create, rt; end(), post(), json::<BookDraft>());
    route!(make_list_all_route => list_all, rt; end(), g());
    route!(make_retrieve_route => retrieve, rt; p("id"), par::<String>(), end(), g());
    route!(make_update_details_route => update_details, rt; p("id"), par::<String>(), end(), put(), json::<BookDraft>());
    route!(make_delete_route => delete, rt; p("id"), par::<String>(), end(), delete());
    route!(make_start_route => start, rt; p("id"), par::<String>(), p("start"), end(), post(), json::<q::DateRequest>());
    route!(make_finish_route => finish, rt; p("id"), par::<String>(), p("finish"), end(), post(), json::<q::DateRequest>());
    route!(make_progress_route => update_progress, rt; p("id"), par::<String>(), p("progress"), end(), post(), json::<q::ProgressRequest>());
    route!(make_restart_route => restart, rt; p("id"), par::<String>(), p("restart"), end(), post());
    route!(make_add_note_route => add_note, rt; p("id"), par::<String>(), p("notes"), end(), put(), json::<q::NoteRequest>());
    route!(make_append_note_route => append_note, rt; p("id"), par::<String>(), p("notes"), end(), post(), json::<q::NoteRequest>());
    route!(make_lookup_route => lookup, rt; p("lookup"), end(), g(), query::<q::LookupQuery>());
    route!(make_status_route => list_by_status, rt; p("status"), par::<String>(), end(), g());
    route!(make_author_route => list_by_author, rt; p("author"), end(), g(), query::<q::AuthorQuery>());
    route!(make_period_route => list_in_period, rt; p("period"), end(), g(), query::<q::PeriodQuery>());
}

#[cfg(test)]
mod tests {
    use warp::http::StatusCode;

    use super::status_code_for;
    use crate::errors::BackendError;

    #[test]
    fn error_classes_map_to_status_codes() {
        assert_eq!(
            status_code_for(&BackendError::InvalidDateFormat("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code_for(&BackendError::PagesOutOfRange { pages: 600, total: 600 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code_for(&BackendError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code_for(&BackendError::AlreadyStarted("x".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code_for(&BackendError::StorageUnavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
