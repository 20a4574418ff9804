use serde::Deserialize;

use crate::sanitization;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(deserialize_with = "sanitization::deserialize")]
    pub title: String,
    #[serde(deserialize_with = "sanitization::deserialize")]
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    #[serde(deserialize_with = "sanitization::deserialize")]
    pub author: String,
}

/// Both dates are `DD-MMM-YYYY`.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct DateRequest {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub pages: i32,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}
