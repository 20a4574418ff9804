//! Build metadata shared by the server and its helper programs.

/// The crate version the binaries were built from.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The source revision, when the build environment provides one.
pub const REVISION: Option<&str> = option_env!("BOOKSHELF_REVISION");

/// When the binaries were built, when the build environment provides it.
pub const BUILD_TIMESTAMP: Option<&str> = option_env!("BUILD_TIMESTAMP");
