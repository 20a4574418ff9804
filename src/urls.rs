use url::{ParseError, Url};

/// Convenience wrapper for URL generation functions.
#[derive(Clone, Debug)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path for all book-related actions.
    pub(crate) books_path: String,

    /// Prefix for all book-related actions.
    books_prefix: String,
}

impl Urls {
    /// Create a new instance. `books_path` should *not* include a trailing slash.
    pub fn new(base: impl AsRef<str>, books_path: impl Into<String>) -> Result<Self, ParseError> {
        let base = Url::parse(base.as_ref())?;
        let books_path = books_path.into();
        let books_prefix = format!("{}/", books_path);

        Ok(Urls {
            base,
            books_path,
            books_prefix,
        })
    }

    pub fn books(&self) -> Result<Url, ParseError> {
        self.base.join(&self.books_prefix)
    }

    pub fn book(&self, id: &str) -> Result<Url, ParseError> {
        self.books()?.join("id/")?.join(id)
    }
}

#[cfg(test)]
mod tests {
    use super::Urls;

    #[test]
    fn book_urls_live_under_the_books_path() {
        let urls = Urls::new("https://example.com/api/", "books").unwrap();

        assert_eq!(urls.books().unwrap().as_str(), "https://example.com/api/books/");
        assert_eq!(
            urls.book("0123456789abcdef0123456789abcdef").unwrap().as_str(),
            "https://example.com/api/books/id/0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        assert!(Urls::new("not a url", "books").is_err());
    }
}
