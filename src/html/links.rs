use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{Html, Node};
use thiserror::Error;

use super::flatten::{flatten, TextFlattener};
use super::walker::{walk, Continue, Visit, Visitor};
use crate::feed::Link;
use crate::util::href_host;

/// Largest item body we are willing to build a tree for.
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024; // 2MB

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Body exceeds [`MAX_BODY_SIZE`]
    #[error("Item body too large: {0} bytes")]
    TooLarge(usize),
}

/// Collects every anchor with a usable `href`, in document order.
///
/// The anchor's own descendants are delegated to a nested [`TextFlattener`]
/// so the link text is captured in the same pass.
#[derive(Debug, Default)]
pub struct LinkExtractor {
    links: Vec<Link>,
    anchor_text: TextFlattener,
    in_anchor: bool,
}

impl LinkExtractor {
    pub fn into_links(self) -> Vec<Link> {
        self.links
    }
}

impl<'a> Visitor<'a> for LinkExtractor {
    fn visit(&mut self, event: Visit<'a>) -> Continue<'_, 'a> {
        let node = match event {
            Visit::Enter(node) => node,
            Visit::Leave => {
                // Descendants of an anchor go to `anchor_text`, so the first
                // Leave seen afterwards closes that anchor.
                if self.in_anchor {
                    self.in_anchor = false;
                    let text = self.anchor_text.take();
                    if let Some(link) = self.links.last_mut() {
                        link.text = text;
                    }
                }
                return Continue::Descend;
            }
        };

        let Some(element) = node.value().as_element() else {
            return Continue::Descend;
        };
        if element.name() != "a" {
            return Continue::Descend;
        }
        let Some(href) = attr(element, "href").filter(|href| !href.is_empty()) else {
            return Continue::Descend;
        };
        let Some(domain) = href_host(href) else {
            tracing::trace!(href = %href, "Skipping anchor with unparseable href");
            return Continue::Descend;
        };

        let context = node.parent().map(flatten).unwrap_or_default();
        self.links.push(Link::new(href, domain, context));
        self.in_anchor = true;
        Continue::Delegate(&mut self.anchor_text)
    }
}

/// Attribute lookup with a case-insensitive name match.
fn attr<'e>(element: &'e Element, name: &str) -> Option<&'e str> {
    element
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Extract the links in an already parsed subtree.
pub fn extract_links(node: NodeRef<'_, Node>) -> Vec<Link> {
    let mut extractor = LinkExtractor::default();
    walk(node, &mut extractor);
    extractor.into_links()
}

/// Parse an HTML fragment from a feed item and extract its links.
///
/// The parser recovers from malformed markup the way a browser would; the
/// recovered errors are only logged.
pub fn find_links(body: &str) -> Result<Vec<Link>, ExtractError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(ExtractError::TooLarge(body.len()));
    }

    let document = Html::parse_document(body);
    if !document.errors.is_empty() {
        tracing::trace!(errors = document.errors.len(), "Recovered from markup errors");
    }

    Ok(extract_links(document.tree.root()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_links_in_document_order() {
        let links = find_links(
            r#"<p>First <a href="https://one.example/">one</a> then
               <a href="https://two.example/x">two</a></p>
               <ul><li><a href="https://three.example:8443/">three</a></li></ul>"#,
        )
        .unwrap();

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://one.example/",
                "https://two.example/x",
                "https://three.example:8443/"
            ]
        );
        let domains: Vec<&str> = links.iter().map(|l| l.domain.as_str()).collect();
        assert_eq!(domains, vec!["one.example", "two.example", "three.example:8443"]);
    }

    #[test]
    fn test_context_is_parent_text() {
        let links =
            find_links(r#"<p>A study on <a href="https://x.org/s">sleep</a> in cats.</p>"#).unwrap();
        assert_eq!(links.len(), 1);
        let words: Vec<&str> = links[0].context.split_whitespace().collect();
        assert_eq!(words, vec!["A", "study", "on", "sleep", "in", "cats."]);
        assert_eq!(links[0].text.trim(), "sleep");
    }

    #[test]
    fn test_anchor_text_includes_nested_markup() {
        let links =
            find_links(r#"<p><a href="https://x.org/"><b>bold</b> and <i>italic</i></a></p>"#)
                .unwrap();
        let words: Vec<&str> = links[0].text.split_whitespace().collect();
        assert_eq!(words, vec!["bold", "and", "italic"]);
    }

    #[test]
    fn test_anchor_text_does_not_leak_between_links() {
        let links = find_links(
            r#"<p><a href="https://a.org/">alpha</a> middle <a href="https://b.org/">beta</a></p>"#,
        )
        .unwrap();
        assert_eq!(links[0].text.trim(), "alpha");
        assert_eq!(links[1].text.trim(), "beta");
    }

    #[test]
    fn test_missing_and_empty_href_skipped() {
        let links = find_links(
            r#"<a name="top">anchor</a><a href="">empty</a><a href="https://ok.example/">ok</a>"#,
        )
        .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://ok.example/");
    }

    #[test]
    fn test_href_attribute_name_case_insensitive() {
        let links = find_links(r#"<A HREF="https://upper.example/">x</A>"#).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].domain, "upper.example");
    }

    #[test]
    fn test_malformed_href_skipped_silently() {
        let links = find_links(
            r#"<a href="http://[broken">bad</a><a href="https://fine.example/">good</a>"#,
        )
        .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://fine.example/");
    }

    #[test]
    fn test_relative_href_kept_without_domain() {
        let links = find_links(r#"<a href="/2024/01/older-post">older</a>"#).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "/2024/01/older-post");
        assert_eq!(links[0].domain, "");
    }

    #[test]
    fn test_href_kept_verbatim() {
        let links = find_links(r#"<a href="https://Example.com/a%20b?q=1#frag">x</a>"#).unwrap();
        assert_eq!(links[0].url, "https://Example.com/a%20b?q=1#frag");
        assert_eq!(links[0].domain, "example.com");
    }

    #[test]
    fn test_no_anchors() {
        assert!(find_links("<p>Nothing to see here.</p>").unwrap().is_empty());
        assert!(find_links("").unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_markup_recovered() {
        let links = find_links(r#"<div><p>see <a href="https://r.example/">this"#).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text.trim(), "this");
    }

    #[test]
    fn test_oversized_body_rejected() {
        let body = "a".repeat(MAX_BODY_SIZE + 1);
        assert!(matches!(find_links(&body), Err(ExtractError::TooLarge(_))));
    }

    #[test]
    fn test_extracted_links_are_not_queued() {
        let links = find_links(r#"<a href="https://x.org/">x</a>"#).unwrap();
        assert!(!links[0].queued);
        assert!(links[0].queued_at.is_none());
    }

    proptest! {
        #[test]
        fn prop_one_link_per_anchor_with_href(
            hosts in proptest::collection::vec("[a-z]{1,10}", 0..15),
            empty in proptest::collection::vec(any::<bool>(), 15),
        ) {
            let mut markup = String::from("<div>");
            let mut expected = Vec::new();
            for (i, host) in hosts.iter().enumerate() {
                if empty[i] {
                    markup.push_str("<p><a href=\"\">none</a></p>");
                } else {
                    let url = format!("https://{host}.example/{i}");
                    markup.push_str(&format!("<p>ctx <a href=\"{url}\">{host}</a></p>"));
                    expected.push(url);
                }
            }
            markup.push_str("</div>");

            let got: Vec<String> = find_links(&markup).unwrap().into_iter().map(|l| l.url).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
