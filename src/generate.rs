//! The page-generation pass. Generation is an explicit ordered pipeline of
//! named [`Stage`]s; each stage is a pure function from the immutable
//! collection of content nodes to a batch of output [`Page`]s. The stages
//! are:
//!
//! 1. `posts` — one post page per categorized node, at the node's slug
//! 2. `cards` — two social-card pages per node (development mode only)
//! 3. `tags` — one listing page per distinct tag across all nodes
//!
//! A [`Page`] is only a route bound to a template discriminator and a
//! context; rendering the page set to disk is [`crate::write`]'s job.

use std::collections::BTreeSet;

use crate::post::{Node, Post};
use crate::slug;

/// The sharing platform a social-card page targets. The platform picks the
/// page's route suffix and the pixel dimensions of the captured card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Twitter,
    Dev,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Twitter, Platform::Dev];

    /// The route suffix of the card page for this platform, appended below
    /// the post's slug.
    pub fn route_suffix(self) -> &'static str {
        match self {
            Platform::Twitter => "image_tw",
            Platform::Dev => "image_dev",
        }
    }

    /// The suffix of the captured screenshot's file name
    /// (`<slug>-<suffix>.png`).
    pub fn file_suffix(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Dev => "dev",
        }
    }

    /// The (width, height) crop of the captured screenshot, sized for the
    /// platform's link-preview renderer.
    pub fn crop(self) -> (u32, u32) {
        match self {
            Platform::Twitter => (800, 418),
            Platform::Dev => (1000, 420),
        }
    }
}

/// An output route bound to a template and its context. Each variant maps
/// onto one of the theme's templates.
#[derive(Debug)]
pub enum Page<'a> {
    /// A post page at the post's slug.
    Post { route: String, post: &'a Post },

    /// A social-card render target for one platform, with layout chrome
    /// suppressed. Development mode only.
    Card {
        route: String,
        node: &'a Node,
        platform: Platform,
    },

    /// A tag listing page. `nodes` are exactly the nodes whose tag list
    /// contains the raw `tag` string.
    Tag {
        route: String,
        tag: String,
        nodes: Vec<&'a Node>,
    },
}

impl Page<'_> {
    pub fn route(&self) -> &str {
        match self {
            Page::Post { route, .. } => route,
            Page::Card { route, .. } => route,
            Page::Tag { route, .. } => route,
        }
    }
}

/// A named step of the generation pipeline.
pub struct Stage {
    pub name: &'static str,
    run: for<'a> fn(&'a [Node]) -> Vec<Page<'a>>,
}

impl Stage {
    pub fn run<'a>(&self, nodes: &'a [Node]) -> Vec<Page<'a>> {
        (self.run)(nodes)
    }
}

/// Returns the generation pipeline. The `cards` stage only exists in
/// development mode; the card pages are render targets for the screenshot
/// utility and have no business in a production build.
pub fn pipeline(development: bool) -> Vec<Stage> {
    let mut stages = vec![Stage {
        name: "posts",
        run: post_pages,
    }];
    if development {
        stages.push(Stage {
            name: "cards",
            run: card_pages,
        });
    }
    stages.push(Stage {
        name: "tags",
        run: tag_pages,
    });
    stages
}

/// Runs the pipeline over `nodes` and returns the full page set. Generation
/// is a single pass with no partial-failure semantics; anything wrong with a
/// page (say, a context field its template needs) surfaces later when the
/// page renders.
pub fn pages(nodes: &[Node], development: bool) -> Vec<Page> {
    let mut pages = Vec::new();
    for stage in pipeline(development) {
        let batch = stage.run(nodes);
        log::debug!("stage `{}` emitted {} pages", stage.name, batch.len());
        pages.extend(batch);
    }
    pages
}

/// Emits exactly one post page per categorized node, routed at the node's
/// slug. Uncategorized nodes emit nothing.
fn post_pages(nodes: &[Node]) -> Vec<Page> {
    nodes
        .iter()
        .filter_map(Node::as_post)
        .map(|post| Page::Post {
            route: post.slug.clone(),
            post,
        })
        .collect()
}

/// Emits the two social-card pages for every node, at `<slug>/image_tw` and
/// `<slug>/image_dev`.
fn card_pages(nodes: &[Node]) -> Vec<Page> {
    nodes
        .iter()
        .flat_map(|node| {
            Platform::ALL.iter().map(move |&platform| Page::Card {
                route: format!("{}/{}", node.slug(), platform.route_suffix()),
                node,
                platform,
            })
        })
        .collect()
}

/// Walks all nodes' tag lists, accumulates the de-duplicated tag registry,
/// and emits one listing page per distinct tag at `tags/<kebab-case(tag)>`.
/// The registry only lives for the duration of this stage.
fn tag_pages(nodes: &[Node]) -> Vec<Page> {
    let registry: BTreeSet<&str> = nodes
        .iter()
        .flat_map(|node| node.tags().iter().map(String::as_str))
        .collect();

    registry
        .into_iter()
        .map(|tag| Page::Tag {
            route: slug::tag_path(tag),
            tag: tag.to_owned(),
            nodes: nodes
                .iter()
                .filter(|node| node.tags().iter().any(|t| t == tag))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_node;

    fn node(slug: &str, category: Option<&str>, tags: &[&str]) -> Node {
        let category = match category {
            Some(c) => format!("category: {}\n", c),
            None => String::new(),
        };
        let input = format!(
            "---\ntitle: {}\ndate: 2021-04-16\ntags: [{}]\n{}---\nbody",
            slug,
            tags.join(", "),
            category,
        );
        parse_node(slug, &input).unwrap()
    }

    fn routes<'a>(pages: &'a [Page<'a>]) -> Vec<&'a str> {
        pages.iter().map(Page::route).collect()
    }

    #[test]
    fn test_post_pages_only_for_categorized_nodes() {
        let nodes = vec![
            node("a", Some("blog"), &["go"]),
            node("b", None, &["go", "rust"]),
        ];
        assert_eq!(vec!["a"], routes(&post_pages(&nodes)));
    }

    #[test]
    fn test_card_pages_per_node_and_platform() {
        let nodes = vec![node("a", Some("blog"), &[])];
        assert_eq!(
            vec!["a/image_tw", "a/image_dev"],
            routes(&card_pages(&nodes))
        );
    }

    #[test]
    fn test_tag_pages_exact_membership() {
        let nodes = vec![
            node("a", Some("blog"), &["go"]),
            node("b", None, &["go", "rust"]),
        ];
        let pages = tag_pages(&nodes);
        assert_eq!(vec!["tags/go", "tags/rust"], routes(&pages));
        match &pages[0] {
            Page::Tag { tag, nodes, .. } => {
                assert_eq!("go", tag.as_str());
                assert_eq!(
                    vec!["a", "b"],
                    nodes.iter().map(|n| n.slug()).collect::<Vec<_>>()
                );
            }
            other => panic!("expected a tag page, got {:?}", other),
        }
        match &pages[1] {
            Page::Tag { tag, nodes, .. } => {
                assert_eq!("rust", tag.as_str());
                assert_eq!(
                    vec!["b"],
                    nodes.iter().map(|n| n.slug()).collect::<Vec<_>>()
                );
            }
            other => panic!("expected a tag page, got {:?}", other),
        }
    }

    #[test]
    fn test_tag_routes_are_kebab_cased() {
        let nodes = vec![node("a", Some("blog"), &["Unit Testing"])];
        assert_eq!(vec!["tags/unit-testing"], routes(&tag_pages(&nodes)));
    }

    #[test]
    fn test_tag_registry_deduplicates() {
        let nodes = vec![
            node("a", Some("blog"), &["go"]),
            node("b", Some("blog"), &["go"]),
        ];
        assert_eq!(vec!["tags/go"], routes(&tag_pages(&nodes)));
    }

    #[test]
    fn test_pages_development_adds_cards() {
        let nodes = vec![node("a", Some("blog"), &["go"])];
        assert_eq!(
            vec!["a", "a/image_tw", "a/image_dev", "tags/go"],
            routes(&pages(&nodes, true))
        );
        assert_eq!(vec!["a", "tags/go"], routes(&pages(&nodes, false)));
    }

    /// Only categorized nodes get post pages, but every node's tags count
    /// toward the listings.
    #[test]
    fn test_pages_end_to_end() {
        let nodes = vec![
            node("a", Some("blog"), &["go"]),
            node("b", None, &["go", "rust"]),
        ];
        assert_eq!(
            vec!["a", "tags/go", "tags/rust"],
            routes(&pages(&nodes, false))
        );
    }
}
