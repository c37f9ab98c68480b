//! Defines [`Layouts`], the set of named templates pages are rendered with.
//! Templates use Go's `text/template` syntax (see [`gtmpl`]).

use gtmpl::{Context, Template, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Layout files whose name starts with this prefix are partials: they are
/// prepended to every layout so they can `define` shared blocks.
const PARTIAL_PREFIX: char = '_';

/// The named layouts of a site.
#[derive(Default)]
pub struct Layouts {
    templates: BTreeMap<String, Template>,
}

impl Layouts {
    /// Loads every file in `dir`. A file `post.html` registers the layout
    /// `post`; a file `_base.html` is a partial.
    pub fn load(dir: &Path) -> Result<Layouts> {
        let mut paths = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|err| Error::Open {
            path: dir.to_owned(),
            err,
        })?;
        for result in entries {
            let entry = result?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut partials = String::new();
        let mut layouts = Vec::new();
        for path in paths {
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) => name.to_owned(),
                None => continue,
            };
            let contents =
                std::fs::read_to_string(&path).map_err(|err| Error::Open {
                    path: path.clone(),
                    err,
                })?;
            if name.starts_with(PARTIAL_PREFIX) {
                partials.push_str(&contents);
                partials.push(' ');
            } else {
                layouts.push((name, contents));
            }
        }

        log::debug!("loaded {} layouts from {}", layouts.len(), dir.display());
        Layouts::from_sources(
            &partials,
            layouts.iter().map(|(n, c)| (n.as_str(), c.as_str())),
        )
    }

    /// Parses layouts from `(name, source)` pairs, each prefixed with
    /// `partials`.
    pub fn from_sources<'s, I>(partials: &str, layouts: I) -> Result<Layouts>
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let mut templates = BTreeMap::new();
        for (name, source) in layouts {
            let mut template = Template::default();
            template
                .parse(format!("{}{}", partials, source))
                .map_err(|err| Error::Parse {
                    layout: name.to_owned(),
                    err: err.to_string(),
                })?;
            templates.insert(name.to_owned(), template);
        }
        Ok(Layouts { templates })
    }

    /// Returns true if a layout named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// The registered layout names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Renders `value` with the layout named `name`.
    pub fn apply(&self, name: &str, value: Value) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::Unknown(name.to_owned()))?;
        let execute = |err: String| Error::Execute {
            layout: name.to_owned(),
            err,
        };

        let context = Context::from(value).map_err(|e| execute(e.to_string()))?;
        let mut out: Vec<u8> = Vec::new();
        template
            .execute(&mut out, &context)
            .map_err(|e| execute(e.to_string()))?;
        String::from_utf8(out).map_err(|e| execute(e.to_string()))
    }
}

/// The result of a fallible layout operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or applying a layout.
#[derive(Debug)]
pub enum Error {
    /// Returned when no layout with the given name is registered.
    Unknown(String),

    /// Returned for I/O problems while opening layout files.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing layout files.
    Parse { layout: String, err: String },

    /// Returned for errors executing a layout.
    Execute { layout: String, err: String },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Unknown(name) => write!(f, "unknown layout `{}`", name),
            Error::Open { path, err } => {
                write!(f, "opening layout file '{}': {}", path.display(), err)
            }
            Error::Parse { layout, err } => {
                write!(f, "parsing layout `{}`: {}", layout, err)
            }
            Error::Execute { layout, err } => {
                write!(f, "executing layout `{}`: {}", layout, err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn object(fields: &[(&str, &str)]) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        for (k, v) in fields {
            m.insert(k.to_string(), Value::String(v.to_string()));
        }
        Value::Object(m)
    }

    #[test]
    fn test_apply_with_partials() -> Result<()> {
        let layouts = Layouts::from_sources(
            r#"{{ define "header" }}<h1>{{ .title }}</h1>{{ end }}"#,
            vec![("post", r#"{{ template "header" . }}{{ .body }}"#)],
        )?;
        assert!(layouts.contains("post"));
        assert_eq!(
            "<h1>Hi</h1><p>there</p>",
            layouts
                .apply("post", object(&[("title", "Hi"), ("body", "<p>there</p>")]))?
                .trim()
        );
        Ok(())
    }

    #[test]
    fn test_apply_unknown() {
        let layouts = Layouts::default();
        assert!(matches!(
            layouts.apply("missing", Value::Nil),
            Err(Error::Unknown(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("_base.html"),
            r#"{{ define "footer" }}fin{{ end }}"#,
        )?;
        std::fs::write(
            dir.path().join("post.html"),
            r#"{{ .title }} {{ template "footer" }}"#,
        )?;
        std::fs::write(dir.path().join("index.html"), "index")?;

        let layouts = Layouts::load(dir.path())?;
        assert_eq!(vec!["index", "post"], layouts.names().collect::<Vec<_>>());
        assert_eq!("Hi fin", layouts.apply("post", object(&[("title", "Hi")]))?.trim());
        Ok(())
    }

    #[test]
    fn test_load_missing_directory() {
        assert!(matches!(
            Layouts::load(Path::new("./does/not/exist")),
            Err(Error::Open { .. })
        ));
    }
}
