//! Loads the project configuration (`skald.yaml`) and resolves the paths
//! and URLs a build needs.
//!
//! A project directory looks like this:
//!
//! ```text
//! skald.yaml
//! _posts/2021-03-27-kubernetes.md
//! _layouts/_base.html
//! _layouts/post.html
//! _layouts/index.html
//! _layouts/category.html
//! static/style.css
//! ```

use crate::render::Site;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "skald.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct LayoutNames {
    post: String,
    index: String,
    category: String,
}

impl Default for LayoutNames {
    fn default() -> Self {
        LayoutNames {
            post: String::from("post"),
            index: String::from("index"),
            category: String::from("category"),
        }
    }
}

fn default_home_page() -> String {
    String::from("index.html")
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    pub title: String,
    pub site_root: Url,

    #[serde(default = "default_home_page")]
    pub home_page: String,

    #[serde(default)]
    pub author: Option<Author>,

    #[serde(default)]
    pub index_page_size: PageSize,

    #[serde(default)]
    pub layouts: LayoutNames,
}

/// The author of the site, used in the Atom feed.
#[derive(Clone, Debug, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// Everything a build needs to know.
#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub author: Option<Author>,

    /// The URL the output directory is served from. Always ends in a slash.
    pub site_root: Url,

    /// The home page, relative to `site_root`.
    pub home_page: String,

    pub posts_source_directory: PathBuf,
    pub layouts_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,

    pub index_page_size: usize,
    pub post_layout: String,
    pub index_layout: String,
    pub category_layout: String,

    /// The number of threads posts are parsed on.
    pub threads: usize,
}

impl Config {
    /// Searches `dir` and its ancestors for a [`PROJECT_FILE`] and loads it.
    pub fn from_directory(
        dir: &Path,
        output_directory: Option<&Path>,
        threads: Option<usize>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory, threads)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, threads),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads a project file. Source directories are resolved relative to
    /// the file; the output directory defaults to `_site` next to it.
    pub fn from_project_file(
        path: &Path,
        output_directory: Option<&Path>,
        threads: Option<usize>,
    ) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        if project.index_page_size.0 == 0 {
            return Err(anyhow!("`index_page_size` must be at least 1"));
        }

        let config = Config {
            title: project.title,
            author: project.author,
            site_root: with_trailing_slash(project.site_root),
            home_page: project.home_page,
            posts_source_directory: project_root.join("_posts"),
            layouts_directory: project_root.join("_layouts"),
            static_source_directory: project_root.join("static"),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("_site"),
            },
            index_page_size: project.index_page_size.0,
            post_layout: project.layouts.post,
            index_layout: project.layouts.index,
            category_layout: project.layouts.category,
            threads: match threads {
                None => num_cpus::get(),
                Some(threads) => threads,
            },
        };
        config.check_output_directory()?;
        Ok(config)
    }

    /// Rejects an output directory that overlaps a source directory. Cleaning
    /// such an output would delete sources (e.g., `static/` when the output
    /// is the project root).
    fn check_output_directory(&self) -> Result<()> {
        let output = match self.output_directory.canonicalize() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Resolving output directory `{}`",
                        self.output_directory.display()
                    )
                })
            }
        };

        for source in &[
            &self.posts_source_directory,
            &self.layouts_directory,
            &self.static_source_directory,
        ] {
            let source = match source.canonicalize() {
                Ok(source) => source,
                Err(_) => continue,
            };
            if source.starts_with(&output) || output.starts_with(&source) {
                return Err(anyhow!(
                    "Output directory `{}` overlaps source directory `{}`",
                    self.output_directory.display(),
                    source.display()
                ));
            }
        }
        Ok(())
    }

    /// Derives the site-wide URLs handed to templates.
    pub fn site(&self) -> Result<Site> {
        Ok(Site::new(
            &self.title,
            self.author.clone(),
            &self.site_root,
            &self.home_page,
        )?)
    }
}

/// [`Url::join`] treats the last path segment as a file name unless the path
/// ends in a slash, so `https://example.org/blog` must become
/// `https://example.org/blog/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
