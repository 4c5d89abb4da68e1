//! Exports the [`build_site`] function which stitches together the
//! high-level steps of building the output static site: parsing the content
//! nodes ([`crate::post`]), running the page-generation pipeline
//! ([`crate::generate`]), rendering the page set to disk ([`crate::write`]),
//! copying static assets, and generating the RSS feed ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{self, Error as FeedError, FeedConfig};
use crate::generate;
use crate::post::{self, Error as ParseError};
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Builds the site from a [`Config`] object. In development mode the page
/// set additionally contains the social-card render targets the screenshot
/// utility navigates to.
pub fn build_site(config: &Config, development: bool) -> Result<()> {
    // collect all content nodes
    let (nodes, assets) = post::scan(&config.posts_source_directory, config.max_posts)?;
    log::info!("parsed {} content nodes", nodes.len());

    // Parse the template files.
    let post_template = parse_template(config.post_template.iter())?;
    let tag_template = parse_template(config.tag_template.iter())?;
    let card_template = parse_template(config.card_template.iter())?;

    // Blow away the old output directory so we don't have any collisions
    // with pages from a previous build.
    rmdir(&config.output_directory)?;

    // generate and write the page set
    let pages = generate::pages(&nodes, development);
    let writer = Writer {
        post_template: &post_template,
        tag_template: &tag_template,
        card_template: &card_template,
        output_directory: &config.output_directory,
        home_page: &config.site_root,
        site_title: &config.title,
    };
    writer.write_pages(&pages)?;
    log::info!("wrote {} pages", pages.len());

    // copy bundle assets and the static source directory
    writer.copy_assets(&assets)?;
    copy_dir(
        &config.static_source_directory,
        &config.output_directory,
    )?;

    // create the RSS feed
    feed::write_feed(
        FeedConfig {
            title: config.title.clone(),
            description: config.description.clone(),
            home_page: config.site_root.clone(),
            author: config.author.clone(),
        },
        &nodes,
        File::create(config.output_directory.join("rss.xml"))?,
    )?;
    log::info!("wrote rss.xml");

    Ok(())
}

/// Recursively copies `src` into `dst`. A missing `src` is fine; the static
/// tree is optional for a site that has no assets yet.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing,
/// writing, cleaning the output directory, parsing template files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors rendering pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn project(root: &Path) -> Config {
        write_file(
            root,
            "posts/alpha/index.md",
            "---\ntitle: Alpha\ndate: 2021-04-16\ntags: [go]\ncategory: blog\n---\nbody",
        );
        write_file(root, "posts/alpha/photo.png", "bytes");
        write_file(root, "static/background.png", "pixels");
        write_file(root, "theme/post.html", "{{.title}}");
        write_file(root, "theme/tag.html", "{{.tag}}");
        write_file(root, "theme/card.html", "{{.slug}}");

        Config {
            title: String::from("Example"),
            description: String::from("An example blog"),
            site_root: Url::parse("https://example.com/").unwrap(),
            author: None,
            dev_port: 8000,
            max_posts: 2000,
            default_category: String::from("blog"),
            browser: None,
            posts_source_directory: root.join("posts"),
            static_source_directory: root.join("static"),
            scripts_directory: root.join("scripts"),
            post_template: vec![root.join("theme/post.html")],
            tag_template: vec![root.join("theme/tag.html")],
            card_template: vec![root.join("theme/card.html")],
            output_directory: root.join("public"),
        }
    }

    #[test]
    fn test_build_site() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = project(dir.path());
        build_site(&config, false)?;

        let output = &config.output_directory;
        assert!(output.join("alpha/index.html").is_file());
        assert!(output.join("tags/go/index.html").is_file());
        assert!(output.join("alpha/photo.png").is_file());
        assert!(output.join("background.png").is_file());
        assert!(output.join("rss.xml").is_file());
        assert!(!output.join("alpha/image_tw/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_build_site_development_emits_cards() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = project(dir.path());
        build_site(&config, true)?;

        let output = &config.output_directory;
        assert!(output.join("alpha/image_tw/index.html").is_file());
        assert!(output.join("alpha/image_dev/index.html").is_file());
        Ok(())
    }
}
