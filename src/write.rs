//! Responsible for templating generated [`Page`]s and writing the output
//! tree to disk. Every route renders to `<output>/<route>/index.html` so the
//! site serves clean URLs without a rewrite layer. The conversions from
//! pages into template [`Value`]s live here too; they are the contract
//! between the generation pass and the theme's templates.

use crate::generate::{Page, Platform};
use crate::post::{Asset, Node, Post};
use crate::slug;
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use url::Url;

/// Renders pages through the theme templates and writes them (plus any
/// bundle assets) under the output directory.
pub struct Writer<'a> {
    /// The template for post pages.
    pub post_template: &'a Template,

    /// The template for tag listing pages.
    pub tag_template: &'a Template,

    /// The template for social-card pages. Card pages carry a `no_layout`
    /// context flag so the template can suppress the site chrome.
    pub card_template: &'a Template,

    /// The root of the output tree.
    pub output_directory: &'a Path,

    /// The URL for the site's home page. Made available to every template,
    /// typically as the destination for the site-header link.
    pub home_page: &'a Url,

    /// The site title. Made available to every template.
    pub site_title: &'a str,
}

impl Writer<'_> {
    /// Takes the generated page set, templates each page, and writes it to
    /// disk.
    pub fn write_pages(&self, pages: &[Page]) -> Result<()> {
        for page in pages {
            self.write_page(page)?;
        }
        Ok(())
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page_value(page);
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "site_title".to_owned(),
                Value::String(self.site_title.to_owned()),
            );
        }

        let template = match page {
            Page::Post { .. } => self.post_template,
            Page::Card { .. } => self.card_template,
            Page::Tag { .. } => self.tag_template,
        };

        let file_path = self.output_directory.join(page.route()).join("index.html");
        // there should always be a dir
        std::fs::create_dir_all(file_path.parent().unwrap())?;
        template.execute(
            &mut std::fs::File::create(&file_path)?,
            &gtmpl::Context::from(value).unwrap(),
        )?;
        Ok(())
    }

    /// Copies bundle asset files next to their post's output page.
    pub fn copy_assets(&self, assets: &[Asset]) -> Result<()> {
        for (source, route) in assets {
            let destination = self.output_directory.join(route);
            // asset routes always start with the post's slug directory
            std::fs::create_dir_all(destination.parent().unwrap())?;
            std::fs::copy(source, &destination)?;
        }
        Ok(())
    }
}

/// Converts a [`Page`] into the [`Value`] handed to its template.
fn page_value(page: &Page) -> Value {
    match page {
        Page::Post { post, .. } => post_value(post),
        Page::Card { node, platform, .. } => card_value(node, *platform),
        Page::Tag { tag, nodes, .. } => listing_value(tag, nodes),
    }
}

/// The context for a post page: the post's renderable fields plus its tags
/// as `{tag, url}` pairs.
fn post_value(post: &Post) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), Value::String(post.slug.clone()));
    m.insert("title".to_owned(), Value::String(post.title.clone()));
    m.insert("date".to_owned(), Value::String(post.date.clone()));
    m.insert("category".to_owned(), Value::String(post.category.clone()));
    m.insert("emoji".to_owned(), option_value(post.emoji.as_deref()));
    m.insert(
        "cover_image".to_owned(),
        option_value(post.cover_image.as_deref()),
    );
    m.insert(
        "tags".to_owned(),
        Value::Array(post.tags.iter().map(|tag| tag_value(tag)).collect()),
    );
    m.insert("body".to_owned(), Value::String(post.body.clone()));
    Value::Object(m)
}

/// The context for a social-card page. `no_layout` tells the template to
/// suppress the surrounding site chrome; `is_twitter` discriminates the
/// platform-specific card layout.
fn card_value(node: &Node, platform: Platform) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), Value::String(node.slug().to_owned()));
    m.insert("title".to_owned(), Value::String(node.title().to_owned()));
    m.insert("emoji".to_owned(), option_value(node.emoji()));
    m.insert("cover_image".to_owned(), option_value(node.cover_image()));
    m.insert(
        "is_twitter".to_owned(),
        Value::Bool(platform == Platform::Twitter),
    );
    m.insert("no_layout".to_owned(), Value::Bool(true));
    Value::Object(m)
}

/// The context for a tag listing page: the raw tag string plus a summary of
/// every node carrying the tag.
fn listing_value(tag: &str, nodes: &[&Node]) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("tag".to_owned(), Value::String(tag.to_owned()));
    m.insert(
        "posts".to_owned(),
        Value::Array(nodes.iter().map(|node| summary_value(node)).collect()),
    );
    Value::Object(m)
}

fn summary_value(node: &Node) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), Value::String(node.slug().to_owned()));
    m.insert(
        "url".to_owned(),
        Value::String(format!("/{}/", node.slug())),
    );
    m.insert("title".to_owned(), Value::String(node.title().to_owned()));
    m.insert("date".to_owned(), Value::String(node.date().to_owned()));
    m.insert("emoji".to_owned(), option_value(node.emoji()));
    Value::Object(m)
}

fn tag_value(tag: &str) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("tag".to_owned(), Value::String(tag.to_owned()));
    m.insert(
        "url".to_owned(),
        Value::String(format!("/{}/", slug::tag_path(tag))),
    );
    Value::Object(m)
}

fn option_value(opt: Option<&str>) -> Value {
    match opt {
        Some(s) => Value::String(s.to_owned()),
        None => Value::Nil,
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}
