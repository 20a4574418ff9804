pub mod book;
pub mod config;
pub mod date;
pub mod db;
pub mod environment;
pub mod errors;
pub mod lifecycle;
pub mod routes;
pub mod sanitization;
pub mod urls;
