use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;

/// Feed-level metadata plus the items we care about.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    /// The site the feed belongs to (RSS `<channel><link>`).
    pub site_url: Option<String>,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub title: String,
    pub url: String,
    pub published: Option<DateTime<Utc>>,
    /// HTML body: full content when present, otherwise the description.
    pub body: String,
}

pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)?;

    // Prefer the alternate (site) link over rel="self" and friends
    let site_url = feed
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| feed.links.first())
        .map(|l| l.href.clone());

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let published = entry.published.or(entry.updated);
            let body = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            ParsedItem {
                title,
                url,
                published,
                body,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title,
        site_url,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
    <title>Example Blog</title>
    <link>https://blog.example.com/</link>
    <description>Things</description>
    <item>
        <title>Assorted links</title>
        <link>https://blog.example.com/2024/01/assorted-links.html</link>
        <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
        <description>Short teaser</description>
        <content:encoded><![CDATA[<p>Full <a href="https://news.example/">body</a></p>]]></content:encoded>
    </item>
    <item>
        <title>Description only</title>
        <link>https://blog.example.com/2024/01/second.html</link>
        <description><![CDATA[<p>See <a href="https://other.example/">here</a></p>]]></description>
    </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_feed_metadata() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example Blog");
        assert_eq!(feed.site_url.as_deref(), Some("https://blog.example.com/"));
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn test_content_preferred_over_description() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        let item = &feed.items[0];
        assert_eq!(item.title, "Assorted links");
        assert_eq!(
            item.url,
            "https://blog.example.com/2024/01/assorted-links.html"
        );
        assert!(item.body.contains("https://news.example/"));
        assert_eq!(
            item.published.map(|d| d.to_rfc3339()),
            Some("2024-01-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_description_fallback() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        let item = &feed.items[1];
        assert!(item.body.contains("https://other.example/"));
        assert!(item.published.is_none());
    }

    #[test]
    fn test_missing_channel_link() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>No link</title></channel></rss>"#;
        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert!(feed.site_url.is_none());
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_invalid_xml_is_error() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }
}
