//! Parses post source file names of the form `YYYY-MM-DD-title.md` into a
//! publish date and a slug.

use chrono::NaiveDate;
use std::fmt;
use std::path::Path;

/// The file extensions recognized as post sources.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = "YYYY-MM-DD".len();

/// The information carried by a post's file name.
#[derive(Clone, Debug, PartialEq)]
pub struct PostName {
    /// The date prefix of the file name.
    pub date: NaiveDate,

    /// The part of the file name after the date, with dashes turned into
    /// spaces. Used as the post title when the frontmatter has none.
    pub title: String,

    /// `{date}-{slugified title}`, e.g., `2021-03-27-hello-world`. Two file
    /// names that differ only in case or punctuation share a slug.
    pub slug: String,
}

impl PostName {
    /// Parses a file name (not a path) such as `2021-03-27-Hello-World.md`.
    pub fn parse(file_name: &str) -> Result<PostName, InvalidFileNameError> {
        let invalid = || InvalidFileNameError(file_name.to_owned());

        let path = Path::new(file_name);
        if !is_markdown(path) {
            return Err(invalid());
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;

        let date = stem
            .get(..DATE_LEN)
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .ok_or_else(invalid)?;
        let title = stem
            .get(DATE_LEN..)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(invalid)?;

        let normalized = slug::slugify(title);
        if normalized.is_empty() {
            return Err(invalid());
        }

        Ok(PostName {
            date,
            title: title.replace('-', " ").trim().to_owned(),
            slug: format!("{}-{}", date.format(DATE_FORMAT), normalized),
        })
    }
}

/// Returns true if `path` has one of the [`MARKDOWN_EXTENSIONS`].
pub fn is_markdown(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => MARKDOWN_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Returned when a post's file name does not follow the
/// `YYYY-MM-DD-title.md` convention.
#[derive(Debug)]
pub struct InvalidFileNameError(pub String);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid post file name `{}`: expected `YYYY-MM-DD-title.md`",
            &self.0
        )
    }
}

impl std::error::Error for InvalidFileNameError {}
