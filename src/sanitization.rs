use serde::{Deserialize, Deserializer};

/// Sanitizes free text by stripping angle brackets, collapsing each run
/// of whitespace into a single space and trimming both ends.
///
/// ```
/// use bookshelf::sanitization::sanitize;
/// assert_eq!(sanitize("  <b>Dune</b>\n\t Messiah "), "bDune/b Messiah");
/// ```
pub fn sanitize(text: impl AsRef<str>) -> String {
    text.as_ref()
        .split(|c: char| c == '<' || c == '>')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deserializes a `String` after running it through `sanitize`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(sanitize(s))
}
