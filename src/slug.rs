//! Slug derivation. A slug is the URL path segment that identifies a single
//! content item; it's derived from the item's source file location relative
//! to the content root. Tag listing paths get their own normalization since
//! tags are free-form front matter strings rather than file paths.

use std::path::Path;

const EXTENSIONS: &[&str] = &["md", "mdx"];

/// Derives a slug from a content file's path relative to the content root.
/// Directory separators are preserved, the markdown extension is stripped,
/// any trailing slash is removed, and a file named `index` collapses to its
/// parent directory (e.g., `my-post/index.md` and `my-post.md` both derive
/// `my-post`). Given the convention that each post lives in its own
/// directory, the result is unique per content file.
pub fn derive(relative_path: &Path) -> String {
    let mut path = relative_path.to_owned();
    if let Some(extension) = path.extension() {
        if EXTENSIONS.iter().any(|e| extension == *e) {
            path = path.with_extension("");
        }
    }
    if path.file_name().map(|name| name == "index").unwrap_or(false) {
        path = match path.parent() {
            Some(parent) => parent.to_owned(),
            None => path,
        };
    }

    let mut slug = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    while slug.ends_with('/') {
        slug.pop();
    }
    slug
}

/// Returns the listing-page route for a tag: `tags/<kebab-case(tag)>`. The
/// kebab-casing means e.g. `Unit Testing` and `unit testing` share a single
/// listing page route even though the raw tag strings differ.
pub fn tag_path(tag: &str) -> String {
    format!("tags/{}", slug::slugify(tag))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derive_plain_file() {
        assert_eq!("my-post", derive(Path::new("my-post.md")));
    }

    #[test]
    fn test_derive_bundle_index() {
        assert_eq!("my-post", derive(Path::new("my-post/index.md")));
    }

    #[test]
    fn test_derive_mdx() {
        assert_eq!("my-post", derive(Path::new("my-post/index.mdx")));
    }

    #[test]
    fn test_derive_nested() {
        assert_eq!("notes/scratch", derive(Path::new("notes/scratch.md")));
    }

    #[test]
    fn test_derive_idempotent() {
        let first = derive(Path::new("my-post/index.md"));
        assert_eq!(first, derive(Path::new(&first)));
    }

    #[test]
    fn test_tag_path_kebab_case() {
        assert_eq!("tags/unit-testing", tag_path("Unit Testing"));
    }

    #[test]
    fn test_tag_path_plain() {
        assert_eq!("tags/go", tag_path("go"));
    }
}
