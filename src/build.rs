//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the posts
//! ([`crate::registry`]), indexing them by category ([`crate::index`]),
//! rendering every page into memory ([`crate::render`]), and finally writing
//! the pages and static assets to disk ([`crate::write`]).
//!
//! Nothing is written until every page has rendered, so a failed build leaves
//! the previous output untouched.

use crate::config::Config;
use crate::index::CategoryIndex;
use crate::layout::{Error as LayoutError, Layouts};
use crate::registry::{self, Error as LoadError};
use crate::render::{Error as RenderError, Output, Renderer, Site};
use crate::write::{self, Error as WriteError};
use std::fmt;

/// Counts of what a build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub posts: usize,
    pub categories: usize,
    pub pages: usize,
    pub static_files: usize,
}

/// Everything a single build needs besides the posts themselves. Created at
/// the start of a build and dropped at its end.
pub struct BuildContext<'c> {
    pub config: &'c Config,
    pub site: Site,
    pub layouts: Layouts,
}

impl<'c> BuildContext<'c> {
    /// Derives the site URLs and loads the layouts directory.
    pub fn new(config: &'c Config) -> Result<BuildContext<'c>> {
        let site = config
            .site()
            .map_err(|err| Error::Site(format!("{:#}", err)))?;
        let layouts = Layouts::load(&config.layouts_directory)?;
        log::info!(
            "loaded layouts [{}] from {}",
            layouts.names().collect::<Vec<_>>().join(", "),
            config.layouts_directory.display()
        );
        Ok(BuildContext {
            config,
            site,
            layouts,
        })
    }

    /// A [`Renderer`] over this context's layouts and site.
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer {
            layouts: &self.layouts,
            site: &self.site,
            post_layout: &self.config.post_layout,
            index_layout: &self.config.index_layout,
            category_layout: &self.config.category_layout,
            index_page_size: self.config.index_page_size,
        }
    }
}

/// Renders the whole site described by `config` without touching the output
/// directory. Returns the outputs alongside post and category counts.
pub fn render_site(config: &Config) -> Result<(Vec<Output>, BuildStats)> {
    let registry = registry::load(&config.posts_source_directory, config.threads)?;
    log::info!(
        "loaded {} posts from {}",
        registry.len(),
        config.posts_source_directory.display()
    );

    let index = CategoryIndex::build(&registry);
    log::info!("indexed {} categories", index.len());

    let context = BuildContext::new(config)?;
    let outputs = context.renderer().render_site(&registry, &index)?;
    log::info!("rendered {} pages", outputs.len());

    let stats = BuildStats {
        posts: registry.len(),
        categories: index.len(),
        pages: outputs.len(),
        static_files: 0,
    };
    Ok((outputs, stats))
}

/// Builds the site from a [`Config`]: renders everything, then replaces the
/// previous build's output and copies the static directory.
pub fn build_site(config: &Config) -> Result<BuildStats> {
    let (outputs, mut stats) = render_site(config)?;

    let out = &config.output_directory;
    write::clean(out)?;
    write::write_outputs(out, &outputs)?;
    stats.static_files =
        write::copy_dir(&config.static_source_directory, &out.join("static"))?;
    log::info!(
        "wrote {} pages and {} static files to {}",
        stats.pages,
        stats.static_files,
        out.display()
    );

    Ok(stats)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can occur while loading posts,
/// loading layouts, rendering pages or writing them out.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading posts into the registry.
    Load(LoadError),

    /// Returned for errors loading the layouts directory.
    Layout(LayoutError),

    /// Returned when the site URLs can't be derived from the configuration.
    Site(String),

    /// Returned for errors rendering pages.
    Render(RenderError),

    /// Returned for errors writing the output directory.
    Write(WriteError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Load(err) => err.fmt(f),
            Error::Layout(err) => err.fmt(f),
            Error::Site(err) => write!(f, "deriving site urls: {}", err),
            Error::Render(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Load(err) => Some(err),
            Error::Layout(err) => Some(err),
            Error::Site(_) => None,
            Error::Render(err) => Some(err),
            Error::Write(err) => Some(err),
        }
    }
}

impl From<LoadError> for Error {
    /// Converts [`LoadError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: LoadError) -> Error {
        Error::Load(err)
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Error {
        Error::Layout(err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}
