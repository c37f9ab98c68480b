//! Defines the [`Category`] type, which represents a [`crate::post::Post`]
//! category.

use gtmpl::Value;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use url::{ParseError, Url};

/// Represents a [`crate::post::Post`] category. Categories are compared,
/// hashed and ordered by their slug so e.g., `ASP.NET Core` and
/// `asp.net core` resolve to the same category.
#[derive(Clone, Debug)]
pub struct Category {
    /// The category's name as first written in a post's frontmatter.
    pub name: String,

    /// The slugified name. Safe to drop into a [`Url`] or a file path.
    pub slug: String,
}

impl Category {
    /// Creates a category from its name. Returns [`None`] if the name
    /// slugifies to nothing (e.g., it is all punctuation).
    pub fn new(name: &str) -> Option<Category> {
        let slug = slug::slugify(name);
        match slug.is_empty() {
            true => None,
            false => Some(Category {
                name: name.trim().to_owned(),
                slug,
            }),
        }
    }

    /// The URL for the category's first index page, i.e.,
    /// `{categories_url}/{slug}/index.html`.
    pub fn url(&self, categories_url: &Url) -> Result<Url, ParseError> {
        // `categories_url.join(slug).join("index.html")` would drop the slug
        // since it has no trailing slash.
        categories_url.join(&format!("{}/index.html", self.slug))
    }

    /// Converts the category into a template [`Value`] with fields `name`,
    /// `slug` and `url`.
    pub fn to_value(&self, categories_url: &Url) -> Result<Value, ParseError> {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(self.name.clone()));
        m.insert("slug".to_owned(), Value::String(self.slug.clone()));
        m.insert(
            "url".to_owned(),
            Value::String(self.url(categories_url)?.to_string()),
        );
        Ok(Value::Object(m))
    }
}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for Category {}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slug.cmp(&other.slug)
    }
}
