//! Project configuration. A project is a directory containing a `site.yaml`
//! file (discovered by walking up from the starting directory), a `posts/`
//! content tree, a `static/` asset tree, a `scripts/` inbox for editor
//! exports, and a `theme/` directory whose `theme.yaml` names the template
//! file chains.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Deserialize)]
struct DevPort(u16);
impl Default for DevPort {
    fn default() -> Self {
        DevPort(8000)
    }
}

#[derive(Deserialize)]
struct MaxPosts(usize);
impl Default for MaxPosts {
    fn default() -> Self {
        MaxPosts(2000)
    }
}

#[derive(Deserialize)]
struct DefaultCategory(String);
impl Default for DefaultCategory {
    fn default() -> Self {
        DefaultCategory(String::from("blog"))
    }
}

/// The site author, used for feed metadata.
#[derive(Deserialize, Clone)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    title: String,
    description: String,

    /// The absolute base URL the site is served from. The trailing slash is
    /// significant for URL joining.
    site_root: Url,

    #[serde(default)]
    author: Option<Author>,

    /// The local port the framework dev server listens on; the screenshot
    /// utility navigates against it.
    #[serde(default)]
    dev_port: DevPort,

    /// Cap on the number of content nodes considered by page generation.
    #[serde(default)]
    max_posts: MaxPosts,

    /// The category the import utility stamps into generated front matter.
    #[serde(default)]
    default_category: DefaultCategory,

    /// Explicit headless-browser binary for the screenshot utility. When
    /// unset, the utility searches `PATH` for a known browser.
    #[serde(default)]
    browser: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Theme {
    post_template: Vec<PathBuf>,
    tag_template: Vec<PathBuf>,
    card_template: Vec<PathBuf>,
}

pub struct Config {
    pub title: String,
    pub description: String,
    pub site_root: Url,
    pub author: Option<Author>,
    pub dev_port: u16,
    pub max_posts: usize,
    pub default_category: String,
    pub browser: Option<PathBuf>,
    pub posts_source_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub scripts_directory: PathBuf,
    pub post_template: Vec<PathBuf>,
    pub tag_template: Vec<PathBuf>,
    pub card_template: Vec<PathBuf>,
    pub output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its parent directories for a `site.yaml` project
    /// file and loads the configuration from the first one found.
    /// `output_directory` overrides the default output location
    /// (`<project>/public`).
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join("site.yaml");
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `site.yaml` in any parent directory"
                )),
            }
        }
    }

    /// Loads the configuration from a specific project file.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path `{}`",
                path.display()
            )
        })?;

        let theme_dir = project_root.join("theme");
        let theme: Theme = serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let prefix =
            |files: Vec<PathBuf>| files.iter().map(|relpath| theme_dir.join(relpath)).collect();

        Ok(Config {
            title: project.title,
            description: project.description,
            site_root: project.site_root,
            author: project.author,
            dev_port: project.dev_port.0,
            max_posts: project.max_posts.0,
            default_category: project.default_category.0,
            browser: project.browser,
            posts_source_directory: project_root.join("posts"),
            static_source_directory: project_root.join("static"),
            scripts_directory: project_root.join("scripts"),
            post_template: prefix(theme.post_template),
            tag_template: prefix(theme.tag_template),
            card_template: prefix(theme.card_template),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("public"),
            },
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

#[cfg(test)]
mod test {
    use super::*;

    const PROJECT: &str = "---
title: Example
description: An example blog
site_root: https://example.com/
author:
  name: Someone
dev_port: 9000
";

    const THEME: &str = "---
post_template: [base.html, post.html]
tag_template: [base.html, tag.html]
card_template: [card.html]
";

    fn write_project(root: &Path, project: &str) {
        std::fs::write(root.join("site.yaml"), project).unwrap();
        std::fs::create_dir_all(root.join("theme")).unwrap();
        std::fs::write(root.join("theme/theme.yaml"), THEME).unwrap();
    }

    #[test]
    fn test_from_directory_walks_up() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_project(dir.path(), PROJECT);
        let nested = dir.path().join("posts/my-post");
        std::fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested, None)?;
        assert_eq!("Example", config.title);
        assert_eq!(9000, config.dev_port);
        assert_eq!(2000, config.max_posts);
        assert_eq!("blog", config.default_category);
        assert_eq!(dir.path().join("posts"), config.posts_source_directory);
        assert_eq!(dir.path().join("public"), config.output_directory);
        assert_eq!(
            vec![
                dir.path().join("theme/base.html"),
                dir.path().join("theme/post.html"),
            ],
            config.post_template
        );
        Ok(())
    }

    #[test]
    fn test_missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_directory(dir.path(), None).is_err());
    }
}
