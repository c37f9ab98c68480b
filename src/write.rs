//! Writes rendered [`Output`]s and static assets to the output directory.

use crate::render::Output;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The entries of the output directory a build owns. Only these are removed
/// before writing, so pointing the output at the wrong directory does not
/// wipe it.
const MANAGED_ENTRIES: [&str; 6] = [
    "posts",
    "pages",
    "categories",
    "static",
    "index.html",
    "feed.atom",
];

/// Removes the entries a previous build left in `output_directory`.
pub fn clean(output_directory: &Path) -> Result<()> {
    for entry in MANAGED_ENTRIES.iter() {
        let path = output_directory.join(entry);
        let result = match path.is_dir() {
            true => std::fs::remove_dir_all(&path),
            false => std::fs::remove_file(&path),
        };
        match result {
            Ok(()) => log::debug!("removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (),
            Err(err) => return Err(Error::Clean { path, err }),
        }
    }
    Ok(())
}

/// Writes every output below `output_directory`, creating directories as
/// needed.
pub fn write_outputs(output_directory: &Path, outputs: &[Output]) -> Result<()> {
    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for output in outputs {
        let path = output_directory.join(&output.path);
        if let Some(dir) = path.parent() {
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir).map_err(|err| Error::Write {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        std::fs::write(&path, &output.contents).map_err(|err| Error::Write {
            path: path.clone(),
            err,
        })?;
    }
    Ok(())
}

/// Recursively copies `src` into `dst`. A missing `src` is not an error; a
/// site without static assets is fine.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    use walkdir::WalkDir;

    if !src.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for result in WalkDir::new(src).sort_by_file_name() {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|err| Error::Write {
                path: target.clone(),
                err,
            })?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|err| Error::Copy {
                src: entry.path().to_owned(),
                dst: target.clone(),
                err,
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// The result of a fallible writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing the site to disk.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: io::Error },

    /// Returned for I/O problems while writing an output file or directory.
    Write { path: PathBuf, err: io::Error },

    /// Returned for I/O problems while copying a static file.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: io::Error,
    },

    /// Returned for errors walking the static directory.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Clean { path, err } => {
                write!(f, "cleaning '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "writing '{}': {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "copying '{}' to '{}': {}",
                src.display(),
                dst.display(),
                err
            ),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Clean { err, .. } => Some(err),
            Error::Write { err, .. } => Some(err),
            Error::Copy { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
