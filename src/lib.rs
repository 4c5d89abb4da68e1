//! The library code for the `inkpress` blog toolkit. The site build can be
//! generally broken down into three distinct steps:
//!
//! 1. Parsing content nodes from source files on disk ([`crate::post`])
//! 2. Generating the page set from the nodes ([`crate::generate`])
//! 3. Rendering the pages through the theme templates and writing the
//!    output tree ([`crate::write`]), plus the RSS feed ([`crate::feed`])
//!
//! The second step is an explicit pipeline of named stages, each a pure
//! function from the immutable node collection to a batch of pages: post
//! pages for categorized nodes, tag listing pages for every distinct tag,
//! and (in development mode) the social-card render targets.
//!
//! Alongside the build live two authoring utilities: [`crate::cover`]
//! captures social-card screenshots of a locally served post through a
//! headless browser, and [`crate::import`] reshapes editor-exported
//! bundles into the posts tree.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod cover;
pub mod feed;
pub mod generate;
pub mod import;
pub mod post;
pub mod slug;
pub mod write;
