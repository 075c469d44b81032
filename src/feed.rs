//! RSS, Atom and JSON Feed documents, read with `feed-rs`.
//!
//! Each `feed_rs::model::Entry` is flattened into a [`FeedItem`] carrying
//! only what the sources need: title, link, summary, dates, id, authors and
//! image-bearing media.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser::{self, ParseFeedError};
use scraper::Html;

use crate::utils::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime: Option<String>,
}

impl Enclosure {
    pub fn is_image(&self) -> bool {
        self.mime
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("image/"))
    }
}

/// One `<item>` (RSS) or `<entry>` (Atom).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

impl FeedItem {
    /// First enclosure that declares an `image/*` type.
    pub fn image(&self) -> Option<&str> {
        self.enclosures
            .iter()
            .find(|e| e.is_image())
            .map(|e| e.url.as_str())
    }

    /// Summary, falling back to full content, with markup stripped.
    pub fn plain_summary(&self) -> String {
        self.summary
            .as_deref()
            .or(self.content.as_deref())
            .map(strip_html)
            .unwrap_or_default()
    }

    /// Published date, else last update.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.updated)
    }
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_html(s: &str) -> String {
    let fragment = Html::parse_fragment(s);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

fn non_blank(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

/// The page link: `rel="alternate"` or unqualified, else the first one.
fn page_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .and_then(non_blank)
}

/// `<enclosure>`, `media:content`, `media:thumbnail` and
/// `<link rel="enclosure">`, in document order.
fn enclosures(entry: &Entry) -> Vec<Enclosure> {
    let mut found = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                found.push(Enclosure {
                    url: url.to_string(),
                    mime: content.content_type.as_ref().map(|m| m.to_string()),
                });
            }
        }
        // thumbnails carry no type
        for thumb in &media.thumbnails {
            found.push(Enclosure {
                url: thumb.image.uri.clone(),
                mime: Some("image/*".to_string()),
            });
        }
    }
    for link in entry.links.iter().filter(|l| l.rel.as_deref() == Some("enclosure")) {
        found.push(Enclosure {
            url: link.href.clone(),
            mime: link.media_type.clone(),
        });
    }
    found
}

impl From<Entry> for FeedItem {
    fn from(entry: Entry) -> Self {
        Self {
            title: entry
                .title
                .as_ref()
                .map(|t| strip_html(&t.content))
                .and_then(non_blank),
            link: page_link(&entry.links),
            summary: entry.summary.as_ref().map(|t| t.content.clone()).and_then(non_blank),
            content: entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .and_then(non_blank),
            published: entry.published,
            updated: entry.updated,
            authors: entry
                .authors
                .iter()
                .map(|p| collapse_whitespace(&p.name))
                .filter(|n| !n.is_empty())
                .collect(),
            enclosures: enclosures(&entry),
            id: non_blank(entry.id),
        }
    }
}

/// Parse an RSS, Atom or JSON Feed document into its items.
///
/// Anything that is not a feed is an error; callers may try another format.
pub fn parse_feed(body: &str) -> Result<Vec<FeedItem>, ParseFeedError> {
    let feed = parser::parse(body.as_bytes())?;
    Ok(feed.entries.into_iter().map(FeedItem::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Channel title is ignored</title>
    <link>https://example.com/</link>
    <description>Channel</description>
    <item>
      <title>GPT &amp; friends</title>
      <link>https://example.com/a</link>
      <description><![CDATA[<p>Big <b>news</b></p>]]></description>
      <pubDate>Thu, 02 Jan 2025 03:04:05 +0000</pubDate>
      <enclosure url="https://example.com/a.mp3" type="audio/mpeg" length="1"/>
      <enclosure url="https://example.com/a.jpg" type="image/jpeg" length="1"/>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/b</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv query results</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2025-01-02T03:04:05Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2501.01234v2</id>
    <published>2025-01-02T03:04:05Z</published>
    <updated>2025-01-03T00:00:00Z</updated>
    <title>Attention
      Is Still All You Need</title>
    <summary>  We revisit
 attention.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2501.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2501.01234v2" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>tag:example.com,2025:2</id>
    <title type="html">Hello &lt;b&gt;x&lt;/b&gt; world</title>
    <updated>2025-01-04T00:00:00Z</updated>
    <link href="https://example.com/2"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items.len(), 2);

        let a = &items[0];
        assert_eq!(a.title.as_deref(), Some("GPT & friends"));
        assert_eq!(a.link.as_deref(), Some("https://example.com/a"));
        assert_eq!(a.plain_summary(), "Big news");
        assert_eq!(a.published, Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(a.image(), Some("https://example.com/a.jpg"));

        assert_eq!(items[1].image(), None);
        assert_eq!(items[1].plain_summary(), "");
    }

    #[test]
    fn test_parse_atom_entries() {
        let items = parse_feed(ATOM).unwrap();
        assert_eq!(items.len(), 2);

        let e = &items[0];
        assert_eq!(e.id.as_deref(), Some("http://arxiv.org/abs/2501.01234v2"));
        assert_eq!(e.title.as_deref(), Some("Attention Is Still All You Need"));
        assert_eq!(e.plain_summary(), "We revisit attention.");
        assert_eq!(e.timestamp(), Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(e.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(e.link.as_deref(), Some("http://arxiv.org/abs/2501.01234v2"));
        assert!(e.enclosures.is_empty());

        let html_title = &items[1];
        assert_eq!(html_title.title.as_deref(), Some("Hello x world"));
        assert_eq!(html_title.timestamp(), Some(Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_non_feed_is_error() {
        assert!(parse_feed("<html><body><p>hello</p></body></html>").is_err());
        assert!(parse_feed("plain text").is_err());
    }

    #[test]
    fn test_strip_html_keeps_every_text_node() {
        assert_eq!(strip_html("Hello <b>x</b> and <i>y</i>"), "Hello x and y");
        assert_eq!(strip_html("<p>a &amp; b</p>\n\n<p>c</p>"), "a & b c");
    }
}
