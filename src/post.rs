//! Defines the content [`Node`] types and the logic for parsing them from
//! the file system. A node is one markdown source file plus its derived
//! fields; nodes are discriminated at parse time into [`Node::Post`]
//! (categorized content that gets its own post page) and [`Node::Page`]
//! (uncategorized content) rather than leaving consumers to probe optional
//! fields. Nodes are parsed once per build from the filesystem snapshot and
//! are immutable afterwards.

use std::collections::HashSet;
use std::fmt;
use std::fs::{read_dir, File};
use std::path::{Path, PathBuf};

use pulldown_cmark::{html, Options, Parser};
use serde::Deserialize;

use crate::slug;

/// The front matter block at the top of a content file, delimited by `---`
/// fences. Only `title` and `date` are required; a missing required field is
/// a parse error that fails the build.
#[derive(Deserialize, Clone)]
struct Frontmatter {
    title: String,

    date: String,

    #[serde(default)]
    tags: Vec<String>,

    /// Presence of a non-empty category is what makes a node a post.
    #[serde(default)]
    category: Option<String>,

    #[serde(default)]
    emoji: Option<String>,

    #[serde(default, rename = "coverImage")]
    cover_image: Option<String>,

    /// Opt-out flag for social-card screenshot capture.
    #[serde(default = "default_true", rename = "generate-card")]
    generate_card: bool,
}

fn default_true() -> bool {
    true
}

/// A parsed content file. The variant is decided once, at parse time, by the
/// presence of a non-empty `category` front matter field.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Post(Post),
    Page(Page),
}

/// A categorized content node. Every post gets a post page at its slug.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub category: String,
    pub tags: Vec<String>,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub generate_card: bool,
    pub body: String,
}

/// An uncategorized content node. It gets no post page of its own, but its
/// tags still count toward the tag listing pages.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    pub body: String,
}

impl Node {
    fn from_parts(slug: String, frontmatter: Frontmatter, body: String) -> Node {
        match frontmatter.category {
            Some(category) if !category.is_empty() => Node::Post(Post {
                slug,
                title: frontmatter.title,
                date: frontmatter.date,
                category,
                tags: frontmatter.tags,
                emoji: frontmatter.emoji,
                cover_image: frontmatter.cover_image,
                generate_card: frontmatter.generate_card,
                body,
            }),
            _ => Node::Page(Page {
                slug,
                title: frontmatter.title,
                date: frontmatter.date,
                tags: frontmatter.tags,
                body,
            }),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Node::Post(post) => &post.slug,
            Node::Page(page) => &page.slug,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Post(post) => &post.title,
            Node::Page(page) => &page.title,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            Node::Post(post) => &post.date,
            Node::Page(page) => &page.date,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Node::Post(post) => &post.tags,
            Node::Page(page) => &page.tags,
        }
    }

    pub fn emoji(&self) -> Option<&str> {
        match self {
            Node::Post(post) => post.emoji.as_deref(),
            Node::Page(_) => None,
        }
    }

    pub fn cover_image(&self) -> Option<&str> {
        match self {
            Node::Post(post) => post.cover_image.as_deref(),
            Node::Page(_) => None,
        }
    }

    /// Whether screenshot capture is enabled for this node. Only posts carry
    /// the opt-out flag; it defaults on.
    pub fn generate_card(&self) -> bool {
        match self {
            Node::Post(post) => post.generate_card,
            Node::Page(_) => true,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Node::Post(post) => Some(post),
            Node::Page(_) => None,
        }
    }
}

/// Parses a single [`Node`] from a slug and the contents of its source file.
/// The file must be structured as follows:
///
/// 1. Initial frontmatter fence (`---`)
/// 2. YAML frontmatter with fields `title`, `date`, and optionally `tags`,
///    `category`, `emoji`, `coverImage`, and `generate-card`
/// 3. Terminal frontmatter fence (`---`)
/// 4. Markdown body
///
/// For example:
///
/// ```md
/// ---
/// title: Hello, world!
/// date: 2021-04-16
/// tags: [greet]
/// category: blog
/// ---
/// # Hello
///
/// World
/// ```
pub fn parse_node(slug: &str, input: &str) -> Result<Node> {
    fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
        const FENCE: &str = "---";
        if !input.starts_with(FENCE) {
            return Err(Error::FrontmatterMissingStartFence);
        }
        match input[FENCE.len()..].find("---") {
            None => Err(Error::FrontmatterMissingEndFence),
            Some(offset) => Ok((
                FENCE.len(),                        // yaml_start
                FENCE.len() + offset,               // yaml_stop
                FENCE.len() + offset + FENCE.len(), // body_start
            )),
        }
    }

    let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
    let frontmatter: Frontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
    let mut body = String::new();
    render_markdown(&mut body, &input[body_start..]);
    Ok(Node::from_parts(slug.to_owned(), frontmatter, body))
}

/// Renders a markdown body to HTML. Embedded component markup passes through
/// untouched as inline HTML.
fn render_markdown(dest: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    html::push_html(dest, Parser::new_ext(markdown, options));
}

/// Searches `source_directory` for content files and returns the parsed
/// nodes sorted by date (most recent first) and capped at `max_nodes`, plus
/// the bundle asset files to copy into the output tree. Content files are
/// either `<name>.md` at the top level or `<name>/index.md` inside a bundle
/// directory that may carry sibling assets (`.mdx` works in both layouts).
pub fn scan(source_directory: &Path, max_nodes: usize) -> Result<Nodes> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut assets: Vec<Asset> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for result in read_dir(source_directory)? {
        let entry = result?;
        let os_file_name = entry.file_name();
        let file_name = os_file_name.to_string_lossy();
        let node = if entry.file_type()?.is_dir() {
            match bundle_index(&entry.path())? {
                Some(index) => {
                    // strip_prefix can't fail; `index` is inside
                    // `source_directory` by construction
                    let relative = index.strip_prefix(source_directory).unwrap();
                    let node = parse_node_file(source_directory, relative)?;
                    collect_assets(&entry.path(), node.slug(), &mut assets)?;
                    Some(node)
                }
                None => None,
            }
        } else if is_markdown(&file_name) {
            Some(parse_node_file(source_directory, Path::new(file_name.as_ref()))?)
        } else {
            None
        };

        if let Some(node) = node {
            if !seen.insert(node.slug().to_owned()) {
                return Err(Error::DuplicateSlug(node.slug().to_owned()));
            }
            nodes.push(node);
        }
    }

    nodes.sort_by(|a, b| b.date().cmp(a.date()));
    if nodes.len() > max_nodes {
        nodes.truncate(max_nodes);
        let kept: HashSet<&str> = nodes.iter().map(Node::slug).collect();
        assets.retain(|(_, route)| match route.components().next() {
            Some(first) => kept.contains(&*first.as_os_str().to_string_lossy()),
            None => false,
        });
    }
    Ok((nodes, assets))
}

fn is_markdown(file_name: &str) -> bool {
    file_name.ends_with(".md") || file_name.ends_with(".mdx")
}

/// Returns the path of the bundle's index file, if `dir` is a bundle.
fn bundle_index(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    for name in &["index.md", "index.mdx"] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn parse_node_file(source_directory: &Path, relative_path: &Path) -> Result<Node> {
    match read_node_file(source_directory, relative_path) {
        Ok(node) => Ok(node),
        Err(e) => Err(Error::Annotated(
            format!("parsing `{}`", relative_path.display()),
            Box::new(e),
        )),
    }
}

fn read_node_file(source_directory: &Path, relative_path: &Path) -> Result<Node> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(source_directory.join(relative_path))?.read_to_string(&mut contents)?;
    parse_node(&slug::derive(relative_path), &contents)
}

/// Collects the non-markdown files of a bundle directory. The destination
/// paths are relative to the output root so the writer can place each asset
/// next to its post's output page.
fn collect_assets(
    bundle_directory: &Path,
    slug: &str,
    assets: &mut Vec<Asset>,
) -> Result<()> {
    use walkdir::WalkDir;
    let route = PathBuf::from(slug);
    for result in WalkDir::new(bundle_directory) {
        let entry = result?;
        if entry.file_type().is_file() && !is_markdown(&entry.file_name().to_string_lossy()) {
            assets.push((
                entry.path().to_owned(),
                // strip_prefix can't fail; WalkDir only yields paths under
                // `bundle_directory`
                route.join(entry.path().strip_prefix(bundle_directory).unwrap()),
            ));
        }
    }
    Ok(())
}

/// The parsed content set: all nodes plus the bundle asset files to copy.
pub type Nodes = (Vec<Node>, Vec<Asset>);

/// A bundle asset as a (source path, output-root-relative destination) pair.
pub type Asset = (PathBuf, PathBuf);

/// Represents the result of a [`Node`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing content [`Node`]s.
#[derive(Debug)]
pub enum Error {
    /// Returned when a content file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a content file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one
    /// was missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when two content files derive the same slug.
    DuplicateSlug(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Content file must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::DuplicateSlug(slug) => {
                write!(f, "Multiple content files derive the slug `{}`", slug)
            }
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::DuplicateSlug(_) => None,
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
