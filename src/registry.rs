//! Defines the [`Registry`] which owns every [`Post`] of a build, and the
//! [`load`] function which parses post source files from the file system
//! into a registry, optionally on several worker threads.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::filename::is_markdown;
use crate::post::{Error as PostError, Post};

/// The authoritative collection of [`Post`]s, keyed by slug.
#[derive(Debug, Default)]
pub struct Registry {
    posts: HashMap<String, Post>,

    /// Slugs ordered by [`Post::newest_first`]. Kept sorted on insert so
    /// enumeration never depends on insertion order.
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Inserts a post. Fails if another post already has the same slug, in
    /// which case the registry is left unchanged.
    pub fn insert(&mut self, post: Post) -> std::result::Result<(), DuplicateSlugError> {
        if let Some(existing) = self.posts.get(&post.slug) {
            return Err(DuplicateSlugError::new(
                &post.slug,
                &existing.source_path,
                &post.source_path,
            ));
        }

        let posts = &self.posts;
        let position = match self
            .order
            .binary_search_by(|slug| Post::newest_first(&posts[slug], &post))
        {
            Ok(i) | Err(i) => i,
        };
        self.order.insert(position, post.slug.clone());
        self.posts.insert(post.slug.clone(), post);
        Ok(())
    }

    /// Looks up a post by slug.
    pub fn get(&self, slug: &str) -> Option<&Post> {
        self.posts.get(slug)
    }

    /// Enumerates the posts newest first. Each call starts a fresh pass.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            posts: &self.posts,
            slugs: self.order.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// An iterator over the posts of a [`Registry`], newest first.
#[derive(Clone)]
pub struct Iter<'a> {
    posts: &'a HashMap<String, Post>,
    slugs: std::slice::Iter<'a, String>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Post;

    fn next(&mut self) -> Option<&'a Post> {
        let posts = self.posts;
        self.slugs.next().and_then(|slug| posts.get(slug))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slugs.size_hint()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Post;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Searches `source_directory` (recursively) for post files and parses them
/// into a [`Registry`]. With `threads >= 2`, files are parsed on that many
/// worker threads. The first error aborts the load.
pub fn load(source_directory: &Path, threads: usize) -> Result<Registry> {
    let sources = sources(source_directory)?;
    log::debug!(
        "found {} post sources in {}",
        sources.len(),
        source_directory.display()
    );
    if threads < 2 || sources.len() < 2 {
        load_sequential(&sources)
    } else {
        load_parallel(&sources, threads)
    }
}

/// Lists the Markdown files under `dir`, sorted by path.
fn sources(dir: &Path) -> Result<Vec<PathBuf>> {
    use walkdir::WalkDir;

    let mut sources = Vec::new();
    for result in WalkDir::new(dir).sort_by_file_name() {
        let entry = result?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

fn load_post(path: &Path) -> Result<Post> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;
    log::debug!("parsing {}", path.display());
    Post::from_source(path, &contents).map_err(|err| Error::Parse {
        path: path.to_owned(),
        err,
    })
}

fn load_sequential(sources: &[PathBuf]) -> Result<Registry> {
    let mut registry = Registry::new();
    for path in sources {
        registry.insert(load_post(path)?)?;
    }
    Ok(registry)
}

fn load_parallel(sources: &[PathBuf], threads: usize) -> Result<Registry> {
    use crossbeam_channel::unbounded;

    let registry = Mutex::new(Registry::new());
    let failed = AtomicBool::new(false);

    let (tx, rx) = unbounded::<&Path>();
    for path in sources {
        tx.send(path.as_path()).map_err(|_| Error::Worker("post queue closed"))?;
    }
    drop(tx);

    let results: Vec<Result<()>> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let rx = rx.clone();
                let registry = &registry;
                let failed = &failed;
                scope.spawn(move || -> Result<()> {
                    for path in rx {
                        if failed.load(Ordering::Relaxed) {
                            break;
                        }
                        let inserted = load_post(path).and_then(|post| {
                            registry
                                .lock()
                                .map_err(|_| Error::Worker("registry lock poisoned"))?
                                .insert(post)
                                .map_err(Error::from)
                        });
                        if inserted.is_err() {
                            failed.store(true, Ordering::Relaxed);
                            return inserted;
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or(Err(Error::Worker("worker thread panicked")))
            })
            .collect()
    });

    for result in results {
        result?;
    }
    registry
        .into_inner()
        .map_err(|_| Error::Worker("registry lock poisoned"))
}

/// Returned when two post source files normalize to the same slug.
#[derive(Debug)]
pub struct DuplicateSlugError {
    pub slug: String,
    pub paths: (PathBuf, PathBuf),
}

impl DuplicateSlugError {
    /// The paths are stored sorted so the message does not depend on which
    /// file was parsed first.
    fn new(slug: &str, a: &Path, b: &Path) -> DuplicateSlugError {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        DuplicateSlugError {
            slug: slug.to_owned(),
            paths: (a.to_owned(), b.to_owned()),
        }
    }
}

impl fmt::Display for DuplicateSlugError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "duplicate slug `{}`: `{}` and `{}`",
            self.slug,
            self.paths.0.display(),
            self.paths.1.display()
        )
    }
}

impl std::error::Error for DuplicateSlugError {}

/// Represents the result of a registry operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading posts into a [`Registry`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file cannot be parsed into a [`Post`].
    Parse { path: PathBuf, err: PostError },

    /// Returned when two posts share a slug.
    DuplicateSlug(DuplicateSlugError),

    /// Returned when a source file cannot be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned for errors walking the source directory.
    WalkDir(walkdir::Error),

    /// Returned when the worker pool breaks down.
    Worker(&'static str),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse { path, err } => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
            Error::DuplicateSlug(err) => err.fmt(f),
            Error::Io { path, err } => {
                write!(f, "reading post `{}`: {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Worker(msg) => write!(f, "loading posts: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse { err, .. } => Some(err),
            Error::DuplicateSlug(err) => Some(err),
            Error::Io { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Worker(_) => None,
        }
    }
}

impl From<DuplicateSlugError> for Error {
    fn from(err: DuplicateSlugError) -> Error {
        Error::DuplicateSlug(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn post(file_name: &str) -> Post {
        Post::from_source(Path::new(file_name), "---\n---\n").unwrap()
    }

    #[test]
    fn test_insert_and_get() -> std::result::Result<(), DuplicateSlugError> {
        let mut registry = Registry::new();
        registry.insert(post("2021-03-27-a.md"))?;
        assert_eq!(1, registry.len());
        assert_eq!(
            Path::new("2021-03-27-a.md"),
            registry.get("2021-03-27-a").unwrap().source_path
        );
        assert!(registry.get("2021-03-27-b").is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_slug() {
        let mut registry = Registry::new();
        registry.insert(post("2021-03-27-Hello-World.md")).unwrap();
        let err = registry.insert(post("2021-03-27-hello_world.md")).unwrap_err();
        assert_eq!("2021-03-27-hello-world", err.slug);
        assert_eq!(
            (
                PathBuf::from("2021-03-27-Hello-World.md"),
                PathBuf::from("2021-03-27-hello_world.md")
            ),
            err.paths
        );
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_iter_is_ordered_and_restartable() {
        let mut registry = Registry::new();
        for name in &[
            "2021-03-27-a.md",
            "2021-05-01-c.md",
            "2021-04-03-b.md",
            "2021-04-03-a.md",
        ] {
            registry.insert(post(name)).unwrap();
        }
        let wanted = vec![
            "2021-05-01-c",
            "2021-04-03-a",
            "2021-04-03-b",
            "2021-03-27-a",
        ];
        for _ in 0..2 {
            assert_eq!(
                wanted,
                registry.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>()
            );
        }
    }

    fn write_sources(dir: &Path, count: usize) {
        for i in 0..count {
            fs::write(
                dir.join(format!("2021-01-{:02}-post-{}.md", i % 28 + 1, i)),
                format!("---\ntitle: Post {}\ncategories: [x]\n---\nbody\n", i),
            )
            .unwrap();
        }
        fs::write(dir.join("notes.txt"), "not a post").unwrap();
    }

    #[test]
    fn test_load_sequential_and_parallel_agree() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path(), 40);

        let sequential = load(dir.path(), 1)?;
        let parallel = load(dir.path(), 4)?;
        assert_eq!(40, sequential.len());
        assert_eq!(
            sequential.iter().map(|p| &p.slug).collect::<Vec<_>>(),
            parallel.iter().map(|p| &p.slug).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn test_load_reports_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path(), 8);
        let bad = dir.path().join("2021-02-01-broken.md");
        fs::write(&bad, "---\ntitle: never closed\n").unwrap();

        for threads in &[1, 4] {
            match load(dir.path(), *threads) {
                Err(Error::Parse { path, .. }) => assert_eq!(bad, path),
                other => panic!("wanted parse error; found {:?}", other),
            }
        }
    }

    #[test]
    fn test_load_duplicate_slug() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2021-03-27-a-b.md"), "---\n---\n").unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts/2021-03-27-A B.md"), "---\n---\n").unwrap();

        for threads in &[1, 2] {
            assert!(matches!(
                load(dir.path(), *threads),
                Err(Error::DuplicateSlug(_))
            ));
        }
    }
}
