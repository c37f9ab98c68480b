//! Turns posts and category indices into output pages. Everything is
//! rendered into memory as [`Output`]s; nothing here touches the output
//! directory, so a failure leaves the previously built site intact.
//!
//! The site is made up of:
//!
//! 1. One page per post at `posts/{slug}.html`
//! 2. The main index, paginated at `pages/index.html`, `pages/1.html`, etc.,
//!    with a copy of its first page at `index.html`
//! 3. One paginated index per category at `categories/{slug}/index.html`,
//!    `categories/{slug}/1.html`, etc.
//! 4. The Atom feed at `feed.atom`

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use gtmpl::Value;
use url::{ParseError, Url};

use crate::category::Category;
use crate::config::Author;
use crate::feed::{self, Error as FeedError};
use crate::index::CategoryIndex;
use crate::layout::{Error as LayoutError, Layouts};
use crate::markdown::{self, Error as MarkdownError};
use crate::post::Post;
use crate::registry::Registry;

/// Site-wide values made available to every layout as `.site`.
#[derive(Clone, Debug)]
pub struct Site {
    pub title: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub posts_url: Url,
    pub index_url: Url,
    pub categories_url: Url,
    pub static_url: Url,
    pub feed_url: Url,
}

impl Site {
    /// Derives the site URLs from `site_root`, which must end in a slash.
    /// `home_page` is relative to `site_root`.
    pub fn new(
        title: &str,
        author: Option<Author>,
        site_root: &Url,
        home_page: &str,
    ) -> Result<Site> {
        Ok(Site {
            title: title.to_owned(),
            author,
            home_page: site_root.join(home_page)?,
            posts_url: site_root.join("posts/")?,
            index_url: site_root.join("pages/")?,
            categories_url: site_root.join("categories/")?,
            static_url: site_root.join("static/")?,
            feed_url: site_root.join(FEED_FILE)?,
        })
    }

    fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("home_page".to_owned(), url_value(&self.home_page));
        m.insert("posts_url".to_owned(), url_value(&self.posts_url));
        m.insert("index_url".to_owned(), url_value(&self.index_url));
        m.insert("categories_url".to_owned(), url_value(&self.categories_url));
        m.insert("static_url".to_owned(), url_value(&self.static_url));
        m.insert("feed_url".to_owned(), url_value(&self.feed_url));
        m.insert(
            "author".to_owned(),
            match &self.author {
                Some(author) => Value::String(author.name.clone()),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

const POSTS_DIRECTORY: &str = "posts";
const INDEX_DIRECTORY: &str = "pages";
const CATEGORIES_DIRECTORY: &str = "categories";
const HOME_FILE: &str = "index.html";
const FEED_FILE: &str = "feed.atom";

/// A rendered file, relative to the output directory.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// A [`Post`] whose Markdown body has been converted to HTML.
pub struct RenderedPost<'p> {
    pub post: &'p Post,
    pub url: Url,
    pub html: String,
}

impl RenderedPost<'_> {
    /// The body up to the `<!-- more -->` marker, and whether anything was
    /// cut off.
    pub fn summary(&self) -> (&str, bool) {
        markdown::summarize(&self.html)
    }

    /// Converts the post into a template [`Value`] with fields `slug`,
    /// `title`, `date`, `url`, `layout`, `categories`, `body`, `summary`,
    /// `summarized`, `extra` and `params`. Residual frontmatter keys appear
    /// twice: `extra` is a list of `{key, value}` objects sorted by key, for
    /// ranging over; `params` maps keys to values, for lookups only, since
    /// ranging over a template object yields its keys in arbitrary order.
    fn to_value(&self, categories_url: &Url) -> Result<Value> {
        let post = self.post;
        let (summary, summarized) = self.summary();

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), Value::String(post.slug.clone()));
        m.insert("title".to_owned(), Value::String(post.title.clone()));
        m.insert("date".to_owned(), Value::String(post.date_string()));
        m.insert("url".to_owned(), url_value(&self.url));
        m.insert(
            "layout".to_owned(),
            match &post.layout {
                Some(layout) => Value::String(layout.clone()),
                None => Value::Nil,
            },
        );
        m.insert(
            "categories".to_owned(),
            Value::Array(
                post.categories
                    .iter()
                    .map(|c| c.to_value(categories_url))
                    .collect::<std::result::Result<_, _>>()?,
            ),
        );
        m.insert("body".to_owned(), Value::String(self.html.clone()));
        m.insert("summary".to_owned(), Value::String(summary.to_owned()));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        m.insert(
            "extra".to_owned(),
            entries_value(post.extra.iter().map(|(k, v)| (k.as_str(), v))),
        );
        m.insert(
            "params".to_owned(),
            Value::Object(
                post.extra
                    .iter()
                    .map(|(k, v)| (k.clone(), yaml_to_value(v)))
                    .collect(),
            ),
        );
        Ok(Value::Object(m))
    }
}

/// Applies layouts to posts and index pages.
pub struct Renderer<'a> {
    pub layouts: &'a Layouts,
    pub site: &'a Site,

    /// The layout for posts whose frontmatter names none.
    pub post_layout: &'a str,

    /// The layout for the main index pages.
    pub index_layout: &'a str,

    /// The layout for category index pages.
    pub category_layout: &'a str,

    /// The number of posts per index page.
    pub index_page_size: usize,
}

impl<'a> Renderer<'a> {
    /// Renders a single post with the named layout. The layout sees the
    /// post's fields (`title`, `date`, `categories`, `body`, ...) at the top
    /// level, plus `site`, `prev` and `next`.
    pub fn render(&self, post: &Post, layout: &str) -> Result<String> {
        let rendered = self.render_markdown(post)?;
        self.render_post_page(&rendered, layout, None, None)
    }

    /// Converts a post's Markdown body to HTML.
    pub fn render_markdown<'p>(&self, post: &'p Post) -> Result<RenderedPost<'p>> {
        let url = self.site.posts_url.join(&format!("{}.html", post.slug))?;
        let source_name = post
            .source_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}.md", post.slug));

        let mut html = String::new();
        markdown::to_html(
            &mut html,
            &self.site.posts_url,
            &source_name,
            &post.body,
            url.as_str(),
        )
        .map_err(|err| Error::Markdown {
            path: post.source_path.clone(),
            err,
        })?;

        Ok(RenderedPost { post, url, html })
    }

    /// The layout a post is rendered with.
    fn layout_for<'p>(&'p self, post: &'p Post) -> &'p str {
        post.layout.as_deref().unwrap_or(self.post_layout)
    }

    fn apply(
        &self,
        layout: &str,
        page: &str,
        source: Option<&Path>,
        value: Value,
    ) -> Result<String> {
        if !self.layouts.contains(layout) {
            return Err(Error::UnknownLayout(UnknownLayoutError {
                layout: layout.to_owned(),
                page: page.to_owned(),
                source: source.map(Path::to_owned),
            }));
        }
        self.layouts
            .apply(layout, value)
            .map_err(|err| Error::Layout {
                page: page.to_owned(),
                err,
            })
    }

    fn render_post_page(
        &self,
        rendered: &RenderedPost,
        layout: &str,
        prev: Option<&Url>,
        next: Option<&Url>,
    ) -> Result<String> {
        let mut value = rendered.to_value(&self.site.categories_url)?;
        if let Value::Object(m) = &mut value {
            m.insert("site".to_owned(), self.site.to_value());
            m.insert("prev".to_owned(), option_url_value(prev));
            m.insert("next".to_owned(), option_url_value(next));
        }
        self.apply(
            layout,
            &rendered.post.slug,
            Some(&rendered.post.source_path),
            value,
        )
    }

    /// Renders every page of the site plus the Atom feed. Posts are taken
    /// from `registry` in its (newest first) order.
    pub fn render_site(
        &self,
        registry: &Registry,
        index: &CategoryIndex,
    ) -> Result<Vec<Output>> {
        let rendered: Vec<RenderedPost> = registry
            .iter()
            .map(|post| self.render_markdown(post))
            .collect::<Result<_>>()?;
        let by_slug: HashMap<&str, &RenderedPost> = rendered
            .iter()
            .map(|r| (r.post.slug.as_str(), r))
            .collect();

        let mut outputs = Vec::new();

        // post pages, `prev` being the newer neighbor
        for (i, post) in rendered.iter().enumerate() {
            let prev = match i {
                0 => None,
                _ => Some(&rendered[i - 1].url),
            };
            let next = rendered.get(i + 1).map(|r| &r.url);
            let layout = self.layout_for(post.post);
            let html = self.render_post_page(post, layout, prev, next)?;
            outputs.push(Output {
                path: Path::new(POSTS_DIRECTORY).join(format!("{}.html", post.post.slug)),
                contents: html.into_bytes(),
            });
        }

        // main index
        let all: Vec<&RenderedPost> = rendered.iter().collect();
        let main_index = self.index_pages(
            &all,
            &self.site.index_url,
            Path::new(INDEX_DIRECTORY),
            self.index_layout,
            None,
        )?;
        if let Some(first) = main_index.first() {
            outputs.push(Output {
                path: PathBuf::from(HOME_FILE),
                contents: first.contents.clone(),
            });
        }
        outputs.extend(main_index);

        // category indices
        for entry in index.iter() {
            let posts: Vec<&RenderedPost> = entry
                .posts
                .iter()
                .filter_map(|p| by_slug.get(p.slug.as_str()).copied())
                .collect();
            let slug = &entry.category.slug;
            outputs.extend(self.index_pages(
                &posts,
                &self.site.categories_url.join(&format!("{}/", slug))?,
                &Path::new(CATEGORIES_DIRECTORY).join(slug),
                self.category_layout,
                Some(entry.category),
            )?);
        }

        // feed
        let mut atom = Vec::new();
        feed::write_feed(self.site, &rendered, &mut atom)?;
        outputs.push(Output {
            path: PathBuf::from(FEED_FILE),
            contents: atom,
        });

        Ok(outputs)
    }

    /// Paginates `posts` into index pages under `base_directory`. An empty
    /// list still yields a single (empty) page.
    fn index_pages(
        &self,
        posts: &[&RenderedPost],
        base_url: &Url,
        base_directory: &Path,
        layout: &str,
        category: Option<&Category>,
    ) -> Result<Vec<Output>> {
        let page_size = self.index_page_size.max(1);
        let chunks: Vec<&[&RenderedPost]> = match posts.is_empty() {
            true => vec![posts],
            false => posts.chunks(page_size).collect(),
        };
        let total_pages = chunks.len();

        let category_value = match category {
            Some(category) => category.to_value(&self.site.categories_url)?,
            None => Value::Nil,
        };
        let title = match category {
            Some(category) => category.name.clone(),
            None => self.site.title.clone(),
        };

        let mut pages = Vec::with_capacity(total_pages);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let path = base_directory.join(page_file_name(i));
            let prev = match i {
                0 => None,
                _ => Some(base_url.join(&page_file_name(i - 1))?),
            };
            let next = match i + 1 < total_pages {
                true => Some(base_url.join(&page_file_name(i + 1))?),
                false => None,
            };

            let mut m: HashMap<String, Value> = HashMap::new();
            m.insert("title".to_owned(), Value::String(title.clone()));
            m.insert(
                "posts".to_owned(),
                Value::Array(
                    chunk
                        .iter()
                        .map(|p| p.to_value(&self.site.categories_url))
                        .collect::<Result<_>>()?,
                ),
            );
            m.insert("category".to_owned(), category_value.clone());
            m.insert("prev".to_owned(), option_url_value(prev.as_ref()));
            m.insert("next".to_owned(), option_url_value(next.as_ref()));
            m.insert("site".to_owned(), self.site.to_value());

            let page = path.display().to_string();
            let html = self.apply(layout, &page, None, Value::Object(m))?;
            pages.push(Output {
                path,
                contents: html.into_bytes(),
            });
        }
        Ok(pages)
    }
}

fn page_file_name(i: usize) -> String {
    match i {
        0 => String::from("index.html"),
        _ => format!("{}.html", i),
    }
}

fn url_value(url: &Url) -> Value {
    Value::String(url.to_string())
}

fn option_url_value(url: Option<&Url>) -> Value {
    match url {
        Some(url) => url_value(url),
        None => Value::Nil,
    }
}

/// Converts residual frontmatter values for templating. Numbers become
/// strings; mappings become `{key, value}` lists sorted by key, dropping keys
/// that aren't strings.
fn yaml_to_value(value: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => Value::String(n.to_string()),
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(seq) => {
            Value::Array(seq.iter().map(yaml_to_value).collect())
        }
        Yaml::Mapping(mapping) => entries_value(
            mapping
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k, v))),
        ),
    }
}

/// Builds a list of `{key, value}` objects ordered by key.
fn entries_value<'v, I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'v str, &'v serde_yaml::Value)>,
{
    let sorted: BTreeMap<&str, &serde_yaml::Value> = entries.into_iter().collect();
    Value::Array(
        sorted
            .into_iter()
            .map(|(key, value)| {
                let mut m: HashMap<String, Value> = HashMap::new();
                m.insert("key".to_owned(), Value::String(key.to_owned()));
                m.insert("value".to_owned(), yaml_to_value(value));
                Value::Object(m)
            })
            .collect(),
    )
}

/// Returned when a page asks for a layout that is not registered.
#[derive(Debug)]
pub struct UnknownLayoutError {
    /// The requested layout name.
    pub layout: String,

    /// The post slug or index page path being rendered.
    pub page: String,

    /// The source file of the post, if the page is a post.
    pub source: Option<PathBuf>,
}

impl fmt::Display for UnknownLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown layout `{}` for `{}`", self.layout, self.page)?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownLayoutError {}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rendering pages.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page asks for an unregistered layout.
    UnknownLayout(UnknownLayoutError),

    /// Returned when a layout fails to execute.
    Layout { page: String, err: LayoutError },

    /// Returned when a post body cannot be converted to HTML.
    Markdown { path: PathBuf, err: MarkdownError },

    /// Returned when there is a problem joining URLs.
    UrlParse(ParseError),

    /// Returned for errors generating the feed.
    Feed(FeedError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownLayout(err) => err.fmt(f),
            Error::Layout { page, err } => {
                write!(f, "rendering `{}`: {}", page, err)
            }
            Error::Markdown { path, err } => {
                write!(f, "rendering markdown in `{}`: {}", path.display(), err)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownLayout(err) => Some(err),
            Error::Layout { err, .. } => Some(err),
            Error::Markdown { err, .. } => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Feed(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<FeedError> for Error {
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}
