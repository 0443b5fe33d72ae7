//! Merge a freshly fetched article list with persisted operator state.

use anyhow::{Context, Result};

use crate::feed::Article;
use crate::storage::Database;

/// Build the list shown to the operator.
///
/// Dismissed articles are dropped, links with a queue record are annotated,
/// and the result is sorted newest first (undated articles last). `fresh` is
/// never modified; retained articles are cloned.
///
/// # Errors
///
/// Any state lookup failure aborts the build. A missing record is not an
/// error.
pub async fn build_view(fresh: &[Article], db: &Database) -> Result<Vec<Article>> {
    let mut view = Vec::with_capacity(fresh.len());

    for article in fresh {
        let state = db
            .find_article(&article.url)
            .await
            .with_context(|| format!("looking up article state for {}", article.url))?;
        if state.as_ref().is_some_and(|s| s.is_dismissed()) {
            tracing::debug!(url = %article.url, "Skipping dismissed article");
            continue;
        }

        let mut article = article.clone();
        for link in &mut article.links {
            let queued = db
                .find_link(&link.url)
                .await
                .with_context(|| format!("looking up link state for {}", link.url))?;
            if let Some(state) = queued {
                link.queued = true;
                link.queued_at = Some(state.queued_at);
            }
        }
        view.push(article);
    }

    view.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Link;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    fn article(url: &str, date: Option<DateTime<Utc>>, links: &[&str]) -> Article {
        Article {
            title: format!("Post at {url}"),
            url: url.to_string(),
            links: links
                .iter()
                .map(|l| Link::new(l.to_string(), "b.example".to_string(), String::new()))
                .collect(),
            feed: "Test Feed".to_string(),
            date,
        }
    }

    #[tokio::test]
    async fn test_dismissed_articles_are_excluded() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![
            article("https://a.example/1", date(2023, 1, 1), &["https://b.example/1"]),
            article("https://a.example/2", date(2023, 1, 2), &["https://b.example/2"]),
        ];
        db.mark_article_dismissed("https://a.example/2").await.unwrap();

        let view = build_view(&fresh, &db).await.unwrap();
        let urls: Vec<&str> = view.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/1"]);
    }

    #[tokio::test]
    async fn test_queued_links_are_annotated() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![article(
            "https://a.example/1",
            date(2023, 1, 1),
            &["https://b.example/queued", "https://b.example/fresh"],
        )];
        let at = db
            .mark_link_queued("https://b.example/queued", Some("https://a.example/1"))
            .await
            .unwrap();

        let view = build_view(&fresh, &db).await.unwrap();
        let links = &view[0].links;
        assert!(links[0].queued);
        assert_eq!(
            links[0].queued_at.map(|t| t.timestamp_millis()),
            Some(at.timestamp_millis())
        );
        assert!(!links[1].queued);
        assert_eq!(links[1].queued_at, None);
    }

    #[tokio::test]
    async fn test_fresh_list_is_not_mutated() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![article(
            "https://a.example/1",
            date(2023, 1, 1),
            &["https://b.example/queued"],
        )];
        db.mark_link_queued("https://b.example/queued", None).await.unwrap();

        let view = build_view(&fresh, &db).await.unwrap();
        assert!(view[0].links[0].queued);
        assert!(!fresh[0].links[0].queued);
    }

    #[tokio::test]
    async fn test_sorted_newest_first() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![
            article("https://a.example/2021", date(2021, 1, 1), &["https://b.example/1"]),
            article("https://a.example/2023", date(2023, 6, 1), &["https://b.example/2"]),
            article("https://a.example/2022", date(2022, 3, 1), &["https://b.example/3"]),
        ];

        let view = build_view(&fresh, &db).await.unwrap();
        let dates: Vec<_> = view.iter().map(|a| a.date).collect();
        assert_eq!(dates, vec![date(2023, 6, 1), date(2022, 3, 1), date(2021, 1, 1)]);
    }

    #[tokio::test]
    async fn test_undated_articles_sort_last() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![
            article("https://a.example/undated", None, &["https://b.example/1"]),
            article("https://a.example/dated", date(2020, 1, 1), &["https://b.example/2"]),
        ];

        let view = build_view(&fresh, &db).await.unwrap();
        assert_eq!(view[0].url, "https://a.example/dated");
        assert_eq!(view[1].url, "https://a.example/undated");
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts() {
        let db = Database::open(":memory:").await.unwrap();
        let fresh = vec![article("https://a.example/1", date(2023, 1, 1), &[])];
        db.close().await;

        let err = build_view(&fresh, &db).await.unwrap_err();
        assert!(err.to_string().contains("https://a.example/1"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let db = Database::open(":memory:").await.unwrap();
        assert!(build_view(&[], &db).await.unwrap().is_empty());
    }
}
