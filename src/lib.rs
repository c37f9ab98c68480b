//! The library code for the `skald` static blog generator. A build runs in
//! two phases:
//!
//! 1. Rendering, entirely in memory:
//!    1. Load every post under `_posts/` into a [`registry::Registry`] keyed by
//!       slug ([`crate::frontmatter`], [`crate::post`])
//!    2. Group posts by category ([`crate::index`])
//!    3. Apply the named layouts to posts and paginated indices, and generate
//!       the Atom feed ([`crate::render`])
//! 2. Writing: replace the previous output and copy static assets
//!    ([`crate::write`])
//!
//! Any error in the first phase aborts the build before the output directory
//! is touched. Given the same sources, two builds produce byte-identical
//! output.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod category;
pub mod config;
pub mod feed;
pub mod filename;
pub mod frontmatter;
mod htmlrenderer;
pub mod index;
pub mod layout;
pub mod markdown;
pub mod post;
pub mod registry;
pub mod render;
pub mod url;
pub mod write;
