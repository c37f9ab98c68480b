//! Defines the [`CategoryIndex`], which groups the posts of a
//! [`crate::registry::Registry`] by category.

use std::collections::BTreeMap;

use crate::category::Category;
use crate::post::Post;

/// The posts carrying a single category, newest first.
#[derive(Debug)]
pub struct Entry<'a> {
    /// The category as it appears on the first post (in enumeration order)
    /// that carries it.
    pub category: &'a Category,

    /// The posts carrying the category, ordered by [`Post::newest_first`].
    pub posts: Vec<&'a Post>,
}

/// A mapping from category slug to the posts carrying that category. Posts
/// are borrowed from the registry that owns them.
#[derive(Debug, Default)]
pub struct CategoryIndex<'a> {
    entries: BTreeMap<&'a str, Entry<'a>>,
}

impl<'a> CategoryIndex<'a> {
    /// Indexes `posts` in a single pass. A category that no post carries has
    /// no entry.
    pub fn build<I>(posts: I) -> CategoryIndex<'a>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let mut entries: BTreeMap<&'a str, Entry<'a>> = BTreeMap::new();
        for post in posts {
            for category in &post.categories {
                entries
                    .entry(category.slug.as_str())
                    .or_insert_with(|| Entry {
                        category,
                        posts: Vec::new(),
                    })
                    .posts
                    .push(post);
            }
        }

        for entry in entries.values_mut() {
            entry.posts.sort_by(|a, b| Post::newest_first(a, b));
        }

        CategoryIndex { entries }
    }

    /// Returns the posts carrying the category with the given slug.
    pub fn get(&self, slug: &str) -> Option<&[&'a Post]> {
        self.entries.get(slug).map(|entry| entry.posts.as_slice())
    }

    /// Enumerates the entries ordered by category slug.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<'a>> {
        self.entries.values()
    }

    /// The number of distinct categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
