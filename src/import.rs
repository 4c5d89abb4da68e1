//! Imports a text-editor export into the posts tree. The editor exports a
//! `.textbundle` bundle: a directory carrying the body in `text.md`, images
//! under `assets/`, and an `info.json` metadata file. The utility reshapes
//! one such bundle into `<posts>/<slug>/index.md` plus sibling images and
//! stamps a generated front-matter block onto the body. The migration is in
//! place and not transactional; a failure partway leaves a partially
//! migrated directory, which is acceptable for a trusted single-user
//! authoring tool.

use anyhow::{bail, Context, Result};
use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

const BUNDLE_EXTENSION: &str = "textbundle";
const BODY_FILE: &str = "text.md";
const POST_FILE: &str = "index.md";
const METADATA_FILE: &str = "info.json";
const ASSETS_DIRECTORY: &str = "assets";

/// Imports the bundle found under the project's scripts directory and
/// returns the new post directory.
pub fn import_bundle(config: &Config) -> Result<PathBuf> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    import_from(
        &config.scripts_directory,
        &config.posts_source_directory,
        &config.default_category,
        &today,
    )
}

fn import_from(
    scripts_directory: &Path,
    posts_directory: &Path,
    category: &str,
    date: &str,
) -> Result<PathBuf> {
    let bundle = find_bundle(scripts_directory)?;
    // bundles always have a file stem; find_bundle matched on the extension
    let slug = bundle.file_stem().unwrap().to_string_lossy().into_owned();

    let destination = posts_directory.join(&slug);
    if destination.exists() {
        bail!("post directory `{}` already exists", destination.display());
    }
    fs::create_dir_all(posts_directory)?;
    fs::rename(&bundle, &destination).with_context(|| {
        format!(
            "moving `{}` to `{}`",
            bundle.display(),
            destination.display()
        )
    })?;

    relocate_assets(&destination)?;
    remove_metadata(&destination)?;
    fs::rename(destination.join(BODY_FILE), destination.join(POST_FILE)).with_context(|| {
        format!("renaming `{}` in `{}`", BODY_FILE, destination.display())
    })?;
    rewrite_body(&destination.join(POST_FILE), &slug, category, date)?;
    Ok(destination)
}

/// Locates the bundle to import. One bundle is the expected case; when
/// several have piled up, the first (in path order) wins with a warning.
fn find_bundle(scripts_directory: &Path) -> Result<PathBuf> {
    let mut bundles: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(scripts_directory)
        .with_context(|| format!("reading `{}`", scripts_directory.display()))?
    {
        let path = entry?.path();
        if path
            .extension()
            .map(|extension| extension == BUNDLE_EXTENSION)
            .unwrap_or(false)
        {
            bundles.push(path);
        }
    }
    bundles.sort();

    if bundles.is_empty() {
        bail!(
            "no `.{}` bundle under `{}`",
            BUNDLE_EXTENSION,
            scripts_directory.display()
        );
    }
    if bundles.len() > 1 {
        log::warn!(
            "found {} bundles; importing `{}`",
            bundles.len(),
            bundles[0].display()
        );
    }
    Ok(bundles.swap_remove(0))
}

/// Moves every bundled asset to the post directory root and removes the
/// emptied `assets/` subdirectory.
fn relocate_assets(post_directory: &Path) -> Result<()> {
    let assets = post_directory.join(ASSETS_DIRECTORY);
    if !assets.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(&assets)? {
        let entry = entry?;
        fs::rename(entry.path(), post_directory.join(entry.file_name()))?;
    }
    fs::remove_dir(&assets)?;
    Ok(())
}

fn remove_metadata(post_directory: &Path) -> Result<()> {
    match fs::remove_file(post_directory.join(METADATA_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn rewrite_body(path: &Path, slug: &str, category: &str, date: &str) -> Result<()> {
    let contents = fs::read_to_string(path)?;

    // `[](assets/img.png)` becomes `[](./img.png)` now that the images live
    // next to the body file
    let assets_prefix = Regex::new(r"\]\(assets/").unwrap();
    let contents = assets_prefix.replace_all(&contents, "](./").into_owned();

    let (title, body) = split_title(&contents, slug);
    fs::write(
        path,
        format!("{}{}", front_matter(&title, date, category), body),
    )?;
    Ok(())
}

/// Takes the title from the body's leading `# ` heading, removing the
/// heading line; the post template renders the front-matter title instead.
/// A body without a leading heading falls back to the slug.
fn split_title<'a>(contents: &'a str, slug: &str) -> (String, &'a str) {
    match contents.strip_prefix("# ") {
        Some(rest) => match rest.find('\n') {
            Some(i) => (rest[..i].trim().to_owned(), &rest[i..]),
            None => (rest.trim().to_owned(), ""),
        },
        None => (slug.to_owned(), contents),
    }
}

fn front_matter(title: &str, date: &str, category: &str) -> String {
    format!(
        "---\ntitle: \"{}\"\ndate: {}\ntags: []\ncategory: \"{}\"\nemoji:\ncoverImage: ''\n---\n",
        title.replace('"', "\\\""),
        date,
        category,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::{parse_node, Node};

    fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_import_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let scripts = dir.path().join("scripts");
        let posts = dir.path().join("posts");
        write_file(
            &scripts,
            "my-post.textbundle/text.md",
            "# My Post\n\nHello ![](assets/pic.png)\n",
        );
        write_file(&scripts, "my-post.textbundle/assets/pic.png", "png");
        write_file(&scripts, "my-post.textbundle/info.json", "{}");

        let created = import_from(&scripts, &posts, "blog", "2021-04-16")?;
        assert_eq!(posts.join("my-post"), created);

        let index = fs::read_to_string(created.join("index.md"))?;
        assert_eq!(
            "---\ntitle: \"My Post\"\ndate: 2021-04-16\ntags: []\ncategory: \"blog\"\n\
             emoji:\ncoverImage: ''\n---\n\nHello ![](./pic.png)\n",
            index
        );
        assert!(created.join("pic.png").is_file());
        assert!(!created.join("assets").exists());
        assert!(!created.join("info.json").exists());
        assert!(!scripts.join("my-post.textbundle").exists());

        // the generated file parses straight back into a categorized node
        match parse_node("my-post", &index) {
            Ok(Node::Post(post)) => {
                assert_eq!("My Post", post.title);
                assert_eq!("blog", post.category);
                assert!(post.tags.is_empty());
            }
            other => panic!("unexpected parse result: {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[test]
    fn test_import_without_heading_falls_back_to_slug() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let scripts = dir.path().join("scripts");
        let posts = dir.path().join("posts");
        write_file(&scripts, "untitled.textbundle/text.md", "Just a body.\n");

        let created = import_from(&scripts, &posts, "blog", "2021-04-16")?;
        let index = fs::read_to_string(created.join("index.md"))?;
        assert!(index.starts_with("---\ntitle: \"untitled\"\n"));
        assert!(index.ends_with("---\nJust a body.\n"));
        Ok(())
    }

    #[test]
    fn test_import_no_bundle() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        assert!(import_from(
            &dir.path().join("scripts"),
            &dir.path().join("posts"),
            "blog",
            "2021-04-16",
        )
        .is_err());
    }

    #[test]
    fn test_import_refuses_to_clobber_existing_post() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        let posts = dir.path().join("posts");
        write_file(&scripts, "my-post.textbundle/text.md", "# My Post\n");
        write_file(&posts, "my-post/index.md", "existing");

        assert!(import_from(&scripts, &posts, "blog", "2021-04-16").is_err());
        // the bundle stays put for the author to sort out
        assert!(scripts.join("my-post.textbundle").exists());
    }

    #[test]
    fn test_front_matter_escapes_quotes() {
        assert!(front_matter("a \"b\"", "2021-04-16", "blog")
            .contains("title: \"a \\\"b\\\"\""));
    }
}
