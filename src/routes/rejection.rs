use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            code: self.error.code(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) code: &'static str,
    pub(crate) message: String,
}

/// The operation that failed and what it was working on.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Context {
    AddNote { id: String },
    AppendNote { id: String },
    Create { title: String, author: String },
    Delete { id: String },
    Finish { id: String },
    ListAll,
    ListByAuthor { author: String },
    ListByStatus { status: String },
    ListInPeriod { from: String, to: String },
    Lookup { title: String, author: String },
    Request,
    Restart { id: String },
    Retrieve { id: String },
    Start { id: String },
    UpdateDetails { id: String },
    UpdateProgress { id: String },
}

impl Context {
    pub fn add_note(id: String) -> Context {
        Context::AddNote { id }
    }

    pub fn append_note(id: String) -> Context {
        Context::AppendNote { id }
    }

    pub fn create(title: &str, author: &str) -> Context {
        Context::Create {
            title: title.to_owned(),
            author: author.to_owned(),
        }
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn finish(id: String) -> Context {
        Context::Finish { id }
    }

    pub fn list_all() -> Context {
        Context::ListAll
    }

    pub fn list_by_author(author: String) -> Context {
        Context::ListByAuthor { author }
    }

    pub fn list_by_status(status: String) -> Context {
        Context::ListByStatus { status }
    }

    pub fn list_in_period(from: String, to: String) -> Context {
        Context::ListInPeriod { from, to }
    }

    pub fn lookup(title: String, author: String) -> Context {
        Context::Lookup { title, author }
    }

    /// A request that couldn't be decoded before reaching any operation.
    pub fn request() -> Context {
        Context::Request
    }

    pub fn restart(id: String) -> Context {
        Context::Restart { id }
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn start(id: String) -> Context {
        Context::Start { id }
    }

    pub fn update_details(id: String) -> Context {
        Context::UpdateDetails { id }
    }

    pub fn update_progress(id: String) -> Context {
        Context::UpdateProgress { id }
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, Rejection};
    use crate::errors::BackendError;

    #[test]
    fn flattened_rejections_carry_context_code_and_message() {
        let rejection = Rejection::new(
            Context::start("0123456789abcdef0123456789abcdef".to_owned()),
            BackendError::AlreadyStarted("0123456789abcdef0123456789abcdef".to_owned()),
        );
        let json = serde_json::to_value(rejection.flatten()).unwrap();

        assert_eq!(json["operation"], "start");
        assert_eq!(json["id"], "0123456789abcdef0123456789abcdef");
        assert_eq!(json["code"], "already_started");
        assert_eq!(
            json["message"],
            "Book 0123456789abcdef0123456789abcdef is already started"
        );
    }

    #[test]
    fn contexts_without_fields_still_name_the_operation() {
        let rejection = Rejection::new(Context::request(), BackendError::BadRequest);
        let json = serde_json::to_value(rejection.flatten()).unwrap();

        assert_eq!(json["operation"], "request");
        assert_eq!(json["code"], "bad_request");
    }

    #[test]
    fn rejections_convert_into_warp_rejections() {
        let converted: warp::Rejection =
            Rejection::new(Context::delete("x".to_owned()), BackendError::NotFound("x".to_owned()))
                .into();

        let found = converted.find::<Rejection>().unwrap();
        assert_eq!(found.error.code(), "not_found");
        assert_eq!(found.flatten().code, "not_found");
    }
}
