//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::render::{RenderedPost, Site};
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use std::fmt;
use std::io::Write;

/// Creates a feed for `site` from a list of [`RenderedPost`]s (newest first)
/// and writes the result to a [`std::io::Write`].
pub fn write_feed<W: Write>(site: &Site, posts: &[RenderedPost], w: W) -> Result<()> {
    feed(site, posts)?.write_to(w)?;
    Ok(())
}

fn feed(site: &Site, posts: &[RenderedPost]) -> Result<Feed> {
    let mut feed = Feed::default();
    feed.set_title(site.title.as_str());
    feed.set_id(site.home_page.as_str());
    feed.set_authors(author_to_people(site.author.as_ref()));
    feed.set_links(vec![
        link(site.home_page.as_str(), "alternate"),
        link(site.feed_url.as_str(), "self"),
    ]);

    // The feed is as fresh as its newest post. Using the wall clock would
    // make two builds of the same sources differ.
    let updated = match posts.iter().map(|p| p.post.publish_date).max() {
        Some(date) => midnight_utc(date)?,
        None => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or(Error::InvalidDate)?;
            midnight_utc(epoch)?
        }
    };
    feed.set_updated(updated);
    feed.set_entries(feed_entries(site, posts)?);
    Ok(feed)
}

fn feed_entries(site: &Site, posts: &[RenderedPost]) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::with_capacity(posts.len());

    for rendered in posts {
        let (summary, _) = rendered.summary();
        let date = midnight_utc(rendered.post.publish_date)?;

        let mut entry = Entry::default();
        entry.set_id(rendered.url.as_str());
        entry.set_title(rendered.post.title.as_str());
        entry.set_updated(date);
        entry.set_published(Some(date));
        entry.set_authors(author_to_people(site.author.as_ref()));
        entry.set_links(vec![link(rendered.url.as_str(), "alternate")]);
        entry.set_summary(Some(Text::html(summary)));
        entries.push(entry);
    }
    Ok(entries)
}

/// Posts only carry a date; their timestamp is midnight UTC on that date.
fn midnight_utc(date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(0).ok_or(Error::InvalidDate)?;
    let naive = date.and_hms_opt(0, 0, 0).ok_or(Error::InvalidDate)?;
    Ok(offset.from_utc_datetime(&naive))
}

fn link(href: &str, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants inlude Atom and date-time
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a post's date cannot be turned into a timestamp.
    InvalidDate,
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => write!(f, "writing feed: {}", err),
            Error::InvalidDate => write!(f, "writing feed: invalid post date"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
            Error::InvalidDate => None,
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
