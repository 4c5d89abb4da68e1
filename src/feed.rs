//! Support for creating the site's RSS feed from the parsed content nodes.
//! Only [`Node::Post`]s become feed items; uncategorized pages stay out of
//! the feed just like they stay off the post listings.

use crate::config::Author;
use crate::post::Node;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, ParseError, TimeZone};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    pub home_page: Url,
    pub author: Option<Author>,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and the content
/// nodes and writes the result to a [`std::io::Write`]. This function takes
/// ownership of the provided [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, nodes: &[Node], w: W) -> Result<()> {
    channel(config, nodes)?.write_to(w)?;
    Ok(())
}

fn channel(config: FeedConfig, nodes: &[Node]) -> Result<Channel> {
    let items = feed_items(&config, nodes)?;
    Ok(ChannelBuilder::default()
        .title(config.title)
        .link(config.home_page.to_string())
        .description(config.description)
        .items(items)
        .build())
}

fn feed_items(config: &FeedConfig, nodes: &[Node]) -> Result<Vec<Item>> {
    let mut items: Vec<Item> = Vec::new();

    for post in nodes.iter().filter_map(Node::as_post) {
        // chrono can't parse a full DateTime out of a bare `YYYY-MM-DD`
        // date, so build one from naive parts and pin the offset to UTC.
        let naive_date = NaiveDate::parse_from_str(&post.date, "%Y-%m-%d")?;
        let naive_time = NaiveTime::from_hms(0, 0, 0);
        let date = FixedOffset::east(0).from_utc_datetime(&NaiveDateTime::new(naive_date, naive_time));

        // the trailing slash keeps `join` from treating the last path
        // segment as a file name
        let link = config.home_page.join(&format!("{}/", post.slug))?;

        items.push(
            ItemBuilder::default()
                .title(Some(post.title.clone()))
                .link(Some(link.to_string()))
                .guid(Some(
                    GuidBuilder::default()
                        .value(link.to_string())
                        .permalink(true)
                        .build(),
                ))
                .pub_date(Some(date.to_rfc2822()))
                .description(Some(post.body.clone()))
                .author(config.author.as_ref().and_then(|author| author.email.clone()))
                .build(),
        );
    }
    Ok(items)
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, RSS, URL, and
/// date-time parsing issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an RSS-related error.
    Rss(rss::Error),

    /// Returned when there is an issue parsing a post's date.
    DateTimeParse(ParseError),

    /// Returned when there is an issue joining a post's URL.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Rss(err) => err.fmt(f),
            Error::DateTimeParse(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Rss(err) => Some(err),
            Error::DateTimeParse(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<rss::Error> for Error {
    /// Converts [`rss::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: rss::Error) -> Error {
        Error::Rss(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: ParseError) -> Error {
        Error::DateTimeParse(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_node;

    fn config() -> FeedConfig {
        FeedConfig {
            title: String::from("Example"),
            description: String::from("An example blog"),
            home_page: Url::parse("https://example.com/").unwrap(),
            author: None,
        }
    }

    #[test]
    fn test_feed_contains_posts_only() -> Result<()> {
        let nodes = vec![
            parse_node(
                "alpha",
                "---\ntitle: Alpha\ndate: 2021-04-16\ncategory: blog\n---\nbody",
            )
            .unwrap(),
            parse_node("about", "---\ntitle: About\ndate: 2021-01-01\n---\nhi").unwrap(),
        ];

        let channel = channel(config(), &nodes)?;
        assert_eq!(1, channel.items().len());
        let item = &channel.items()[0];
        assert_eq!(Some("Alpha"), item.title());
        assert_eq!(Some("https://example.com/alpha/"), item.link());
        assert_eq!(Some("Fri, 16 Apr 2021 00:00:00 +0000"), item.pub_date());
        Ok(())
    }

    #[test]
    fn test_write_feed() -> Result<()> {
        let nodes = vec![parse_node(
            "alpha",
            "---\ntitle: Alpha\ndate: 2021-04-16\ncategory: blog\n---\nbody",
        )
        .unwrap()];

        let mut out = Vec::new();
        write_feed(config(), &nodes, &mut out)?;
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<title>Alpha</title>"));
        assert!(xml.contains("<link>https://example.com/alpha/</link>"));
        Ok(())
    }
}
