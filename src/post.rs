//! Defines the [`Post`] type and the logic for constructing one from a source
//! file's name and contents.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::category::Category;
use crate::filename::{InvalidFileNameError, PostName};
use crate::frontmatter::{Frontmatter, MalformedFrontMatterError};

/// Represents a blog post. Posts are created once per build by the
/// [`crate::registry`] loader and are immutable afterwards.
#[derive(Clone, Debug)]
pub struct Post {
    /// The unique identifier of the post, derived from its file name (e.g.,
    /// `2021-03-27-hello-world`).
    pub slug: String,

    /// The title of the post.
    pub title: String,

    /// The date of the post, taken from its file name.
    pub publish_date: NaiveDate,

    /// The categories associated with the post.
    pub categories: BTreeSet<Category>,

    /// The layout requested in the frontmatter, if any.
    pub layout: Option<String>,

    /// The raw Markdown body.
    pub body: String,

    /// The path of the source file.
    pub source_path: PathBuf,

    /// Frontmatter keys other than `layout`, `title` and `categories`.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Post {
    /// Builds a post from the path of its source file and the file's
    /// contents. Only the file name of `source_path` is significant; the
    /// rest is kept for error reporting.
    pub fn from_source(source_path: &Path, contents: &str) -> Result<Post> {
        let file_name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                InvalidFileNameError(source_path.display().to_string())
            })?;
        let name = PostName::parse(file_name)?;
        let (frontmatter, body) = Frontmatter::parse(contents)?;

        let mut categories = BTreeSet::new();
        for raw in &frontmatter.categories {
            match Category::new(raw) {
                Some(category) => {
                    categories.insert(category);
                }
                None => log::warn!(
                    "{}: ignoring category `{}` with an empty slug",
                    source_path.display(),
                    raw
                ),
            }
        }

        Ok(Post {
            slug: name.slug,
            title: match frontmatter.title {
                Some(title) if !title.trim().is_empty() => title,
                _ => name.title,
            },
            publish_date: name.date,
            categories,
            layout: frontmatter.layout,
            body: body.to_owned(),
            source_path: source_path.to_owned(),
            extra: frontmatter.extra,
        })
    }

    /// The publish date formatted as `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.publish_date.format("%Y-%m-%d").to_string()
    }

    /// Orders posts newest first, breaking ties by slug ascending. This is
    /// the order of the registry, the main index and every category index.
    pub fn newest_first(a: &Post, b: &Post) -> Ordering {
        b.publish_date
            .cmp(&a.publish_date)
            .then_with(|| a.slug.cmp(&b.slug))
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when the frontmatter block is missing, unterminated or
    /// invalid.
    MalformedFrontMatter(MalformedFrontMatterError),

    /// Returned when the file name does not carry a date and a title.
    InvalidFileName(InvalidFileNameError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedFrontMatter(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedFrontMatter(err) => err.source(),
            Error::InvalidFileName(_) => None,
        }
    }
}

impl From<MalformedFrontMatterError> for Error {
    fn from(err: MalformedFrontMatterError) -> Error {
        Error::MalformedFrontMatter(err)
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}
