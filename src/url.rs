//! Rewrites link targets found in post bodies. Links to other posts' source
//! files (e.g., `2021-03-27-options.md`) become links to those posts' output
//! pages (e.g., `{posts_url}/2021-03-27-options.html`); every other relative
//! link is resolved against the posts URL.

use crate::filename::{is_markdown, PostName};
use std::path::Path;
use url::{ParseError, Url};

const HTML_EXTENSION: &str = ".html";

pub struct Converter<'a> {
    posts_root: &'a Url,
    base: Url,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`
    ///
    /// # Arguments
    ///
    /// * `posts_root` - the URL prefix for posts. Must end in a slash.
    /// * `base` - the path of the source file relative to the posts source
    ///   directory; relative links are resolved against it.
    pub fn new(posts_root: &'a Url, base: &str) -> Result<Converter<'a>> {
        Ok(Converter {
            posts_root,
            base: posts_root.join(base)?,
        })
    }

    fn convert_absolute(&self, mut absolute: Url) -> Result<Url> {
        let fragment = absolute.fragment().map(str::to_owned);
        absolute.set_fragment(None);

        if let Some(relative) = self.posts_root.make_relative(&absolute) {
            let file_name = relative.rsplit('/').next().unwrap_or(&relative);
            if !relative.starts_with("../") && is_markdown(Path::new(file_name))
            {
                if let Ok(name) = PostName::parse(file_name) {
                    absolute = self
                        .posts_root
                        .join(&format!("{}{}", name.slug, HTML_EXTENSION))?;
                }
            }
        }

        absolute.set_fragment(fragment.as_deref());
        Ok(absolute)
    }

    fn convert_unknown(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => self.convert_absolute(absolute),
            Err(ParseError::RelativeUrlWithoutBase) => {
                self.convert_absolute(self.base.join(url)?)
            }
            Err(e) => Err(e),
        }
    }

    /// Converts a link target. Pure fragments (`#section`) are left alone so
    /// they keep pointing into the current page.
    pub fn convert(&self, url: &str) -> Result<String> {
        if url.starts_with('#') {
            return Ok(url.to_owned());
        }
        Ok(self.convert_unknown(url)?.to_string())
    }
}

type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convert_relative_post() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options.html",
            "2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_relative_post_leading_dotslash() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options.html",
            "./2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_relative_post_is_slugified() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options-pattern.html",
            "2021-03-27-Options_Pattern.md",
        )
    }

    #[test]
    fn test_convert_relative_post_redundancies() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options.html",
            "../posts/2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_relative_post_keeps_fragment() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options.html#binding",
            "2021-03-27-options.md#binding",
        )
    }

    #[test]
    fn test_convert_relative_post_in_subdirectory() -> Result<()> {
        fixture(
            "dotnet/2021-04-03-grpc.md",
            "https://example.org/posts/2021-03-27-options.html",
            "2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_relative_markdown_without_date() -> Result<()> {
        fixture_basic("https://example.org/posts/README.md", "README.md")
    }

    #[test]
    fn test_convert_relative_asset() -> Result<()> {
        fixture_basic("https://example.org/posts/relative.jpg", "relative.jpg")
    }

    #[test]
    fn test_convert_relative_asset_redundancies() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/relative.jpg",
            "../posts/relative.jpg",
        )
    }

    #[test]
    fn test_convert_fragment_only() -> Result<()> {
        fixture_basic("#top", "#top")
    }

    #[test]
    fn test_convert_absolute_post() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/2021-03-27-options.html",
            "https://example.org/posts/2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_absolute_asset() -> Result<()> {
        fixture_basic(
            "https://example.org/posts/absolute.jpg",
            "https://example.org/posts/absolute.jpg",
        )
    }

    #[test]
    fn test_convert_remote_markdown() -> Result<()> {
        fixture_basic(
            "https://remote.org/2021-03-27-options.md",
            "https://remote.org/2021-03-27-options.md",
        )
    }

    #[test]
    fn test_convert_remote_markdown_redundancies() -> Result<()> {
        fixture_basic(
            "https://remote.org/posts/2021-03-27-options.md",
            "https://remote.org/posts/../posts/2021-03-27-options.md",
        )
    }

    fn fixture_basic(wanted: &str, target: &str) -> Result<()> {
        fixture("2021-01-01-base.md", wanted, target)
    }

    fn fixture(base: &str, wanted: &str, target: &str) -> Result<()> {
        assert_eq!(
            wanted,
            Converter::new(&Url::parse("https://example.org/posts/")?, base)?
                .convert(target)?,
        );
        Ok(())
    }
}
