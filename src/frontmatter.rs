//! Defines the [`Frontmatter`] type and the logic for splitting a post source
//! file into its YAML frontmatter block and its Markdown body.
//!
//! A post source file is structured as follows:
//!
//! 1. Initial frontmatter fence (`---`)
//! 2. YAML frontmatter with optional fields `layout`, `title` and
//!    `categories`, plus any number of other keys
//! 3. Terminal frontmatter fence (`---` or `...`)
//! 4. Post body
//!
//! For example:
//!
//! ```md
//! ---
//! layout: post
//! title: Streaming with gRPC
//! categories: [grpc, aspnetcore]
//! ---
//! # Hello
//!
//! World
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

const FENCE: &str = "---";
const END_FENCES: [&str; 2] = ["---", "..."];

/// The typed frontmatter of a post. Keys other than the known ones are kept
/// in [`Frontmatter::extra`] so templates can still reach them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Frontmatter {
    /// The name of the layout the post is rendered with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// The title of the post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The categories associated with the post, as written.
    #[serde(
        default,
        deserialize_with = "deserialize_categories",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub categories: Vec<String>,

    /// Every other key in the block.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Frontmatter {
    /// Parses the frontmatter block at the top of `input` and returns it
    /// along with the remaining body text.
    pub fn parse(input: &str) -> Result<(Frontmatter, &str)> {
        let (yaml, body) = split(input)?;
        if yaml.trim().is_empty() {
            return Ok((Frontmatter::default(), body));
        }
        Ok((serde_yaml::from_str(yaml)?, body))
    }

    /// Serializes the frontmatter back into the YAML that goes between the
    /// fences. Parsing the result yields an equal [`Frontmatter`].
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        let mut yaml = match yaml.strip_prefix("---\n") {
            Some(rest) => rest.to_owned(),
            None => yaml,
        };
        if !yaml.ends_with('\n') {
            yaml.push('\n');
        }
        Ok(yaml)
    }
}

/// Splits `input` into the text between the frontmatter fences and the body
/// text following the terminal fence.
pub fn split(input: &str) -> Result<(&str, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == FENCE => {
            let yaml_start = first.len();
            let mut yaml_stop = yaml_start;
            for line in lines {
                if END_FENCES.contains(&line.trim_end()) {
                    let body_start = yaml_stop + line.len();
                    return Ok((
                        &input[yaml_start..yaml_stop],
                        &input[body_start..],
                    ));
                }
                yaml_stop += line.len();
            }
            Err(MalformedFrontMatterError::MissingEndFence)
        }
        _ => Err(MalformedFrontMatterError::MissingStartFence),
    }
}

/// Accepts either a YAML list of categories or a single string of
/// whitespace-separated categories.
fn deserialize_categories<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Categories {
        List(Vec<String>),
        Words(String),
    }

    Ok(match Option::<Categories>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Categories::List(list)) => list,
        Some(Categories::Words(words)) => {
            words.split_whitespace().map(str::to_owned).collect()
        }
    })
}

/// Represents the result of a frontmatter operation.
pub type Result<T> = std::result::Result<T, MalformedFrontMatterError>;

/// Returned when a post's frontmatter block is missing, unterminated, or not
/// valid YAML.
#[derive(Debug)]
pub enum MalformedFrontMatterError {
    /// The source file does not begin with `---`.
    MissingStartFence,

    /// The starting fence was found but the terminal one was not.
    MissingEndFence,

    /// The block between the fences is not a valid YAML mapping.
    Yaml(serde_yaml::Error),
}

impl fmt::Display for MalformedFrontMatterError {
    /// Displays a [`MalformedFrontMatterError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MalformedFrontMatterError::MissingStartFence => {
                write!(f, "post must begin with `---`")
            }
            MalformedFrontMatterError::MissingEndFence => {
                write!(f, "frontmatter is missing its closing `---`")
            }
            MalformedFrontMatterError::Yaml(err) => {
                write!(f, "invalid frontmatter: {}", err)
            }
        }
    }
}

impl std::error::Error for MalformedFrontMatterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MalformedFrontMatterError::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for MalformedFrontMatterError {
    /// Converts a [`serde_yaml::Error`] into a [`MalformedFrontMatterError`].
    /// It allows us to use the `?` operator for [`serde_yaml`] functions.
    fn from(err: serde_yaml::Error) -> MalformedFrontMatterError {
        MalformedFrontMatterError::Yaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split() -> Result<()> {
        let (yaml, body) = split("---\ntitle: Hello\n---\n# Body\n")?;
        assert_eq!("title: Hello\n", yaml);
        assert_eq!("# Body\n", body);
        Ok(())
    }

    #[test]
    fn test_split_dots_terminator_and_crlf() -> Result<()> {
        let (yaml, body) = split("---\r\ntitle: Hello\r\n...\r\nbody")?;
        assert_eq!("title: Hello\r\n", yaml);
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_split_ignores_dashes_inside_body() -> Result<()> {
        let (_, body) = split("---\ntitle: a\n---\nfoo\n---\nbar\n")?;
        assert_eq!("foo\n---\nbar\n", body);
        Ok(())
    }

    #[test]
    fn test_missing_start_fence() {
        assert!(matches!(
            split("title: Hello\n---\n"),
            Err(MalformedFrontMatterError::MissingStartFence)
        ));
        assert!(matches!(
            split(""),
            Err(MalformedFrontMatterError::MissingStartFence)
        ));
    }

    #[test]
    fn test_missing_end_fence() {
        assert!(matches!(
            Frontmatter::parse("---\ntitle: Hello\n# no closing fence\n"),
            Err(MalformedFrontMatterError::MissingEndFence)
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Frontmatter::parse("---\ntitle: [unclosed\n---\nbody"),
            Err(MalformedFrontMatterError::Yaml(_))
        ));
        assert!(matches!(
            Frontmatter::parse("---\n- just\n- a list\n---\nbody"),
            Err(MalformedFrontMatterError::Yaml(_))
        ));
    }

    #[test]
    fn test_parse_known_and_extra_keys() -> Result<()> {
        let (frontmatter, body) = Frontmatter::parse(
            "---\nlayout: post\ntitle: Options pattern\n\
             categories: [aspnetcore, configuration]\ncomments: true\n---\nbody",
        )?;
        assert_eq!(Some("post"), frontmatter.layout.as_deref());
        assert_eq!(Some("Options pattern"), frontmatter.title.as_deref());
        assert_eq!(vec!["aspnetcore", "configuration"], frontmatter.categories);
        assert_eq!(
            Some(&serde_yaml::Value::Bool(true)),
            frontmatter.extra.get("comments")
        );
        assert!(!frontmatter.extra.contains_key("title"));
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_parse_space_separated_categories() -> Result<()> {
        let (frontmatter, _) =
            Frontmatter::parse("---\ncategories: dotnet  kubernetes\n---\n")?;
        assert_eq!(vec!["dotnet", "kubernetes"], frontmatter.categories);
        Ok(())
    }

    #[test]
    fn test_parse_empty_block() -> Result<()> {
        let (frontmatter, body) = Frontmatter::parse("---\n---\nbody")?;
        assert_eq!(Frontmatter::default(), frontmatter);
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_yaml_round_trip() -> Result<()> {
        let (frontmatter, _) = Frontmatter::parse(
            "---\nlayout: post\ntitle: \"ValueTask: when to use it\"\n\
             categories: [dotnet, performance]\nauthor:\n  name: someone\n---\n",
        )?;
        let yaml = frontmatter.to_yaml()?;
        let doc = format!("---\n{}---\n", yaml);
        let (reparsed, body) = Frontmatter::parse(&doc)?;
        assert_eq!(frontmatter, reparsed);
        assert_eq!("", body);
        Ok(())
    }
}
