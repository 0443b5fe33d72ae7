use anyhow::Result;
use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{ArticleState, ArticleStateRow, LinkState, LinkStateRow};

impl Database {
    // ========================================================================
    // Article State
    // ========================================================================

    /// Look up persisted state for an article URL. Keys are compared
    /// verbatim; no URL normalization is applied.
    pub async fn find_article(&self, url: &str) -> Result<Option<ArticleState>> {
        let row: Option<ArticleStateRow> =
            sqlx::query_as("SELECT url, dismissed_at FROM article_state WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(ArticleStateRow::into_state))
    }

    /// Record the article as dismissed now. Dismissing again overwrites the
    /// previous timestamp.
    pub async fn mark_article_dismissed(&self, url: &str) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        sqlx::query(
            r#"
                INSERT INTO article_state (url, dismissed_at) VALUES (?, ?)
                ON CONFLICT(url) DO UPDATE SET dismissed_at = excluded.dismissed_at
            "#,
        )
        .bind(url)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;
        tracing::debug!(url = %url, "Article dismissed");
        Ok(now)
    }

    // ========================================================================
    // Link State
    // ========================================================================

    /// Look up persisted state for a link URL.
    pub async fn find_link(&self, url: &str) -> Result<Option<LinkState>> {
        let row: Option<LinkStateRow> =
            sqlx::query_as("SELECT url, article_url, queued_at FROM link_state WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(LinkStateRow::into_state))
    }

    /// Record the link as queued now, remembering which article it came from.
    pub async fn mark_link_queued(
        &self,
        url: &str,
        article_url: Option<&str>,
    ) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        sqlx::query(
            r#"
                INSERT INTO link_state (url, article_url, queued_at) VALUES (?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET
                    article_url = COALESCE(excluded.article_url, link_state.article_url),
                    queued_at = excluded.queued_at
            "#,
        )
        .bind(url)
        .bind(article_url)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;
        tracing::debug!(url = %url, "Link queued");
        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_article_has_no_state() {
        let db = test_db().await;
        assert!(db.find_article("https://a.example/post").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dismiss_then_find() {
        let db = test_db().await;
        let at = db.mark_article_dismissed("https://a.example/post").await.unwrap();

        let state = db.find_article("https://a.example/post").await.unwrap().unwrap();
        assert!(state.is_dismissed());
        assert_eq!(
            state.dismissed_at.map(|d| d.timestamp_millis()),
            Some(at.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_dismiss_twice_keeps_latest() {
        let db = test_db().await;
        let first = db.mark_article_dismissed("https://a.example/post").await.unwrap();
        let second = db.mark_article_dismissed("https://a.example/post").await.unwrap();
        assert!(second >= first);

        let state = db.find_article("https://a.example/post").await.unwrap().unwrap();
        assert_eq!(
            state.dismissed_at.map(|d| d.timestamp_millis()),
            Some(second.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_keys_are_verbatim() {
        let db = test_db().await;
        db.mark_article_dismissed("https://a.example/post").await.unwrap();

        assert!(db.find_article("https://a.example/post/").await.unwrap().is_none());
        assert!(db.find_article("https://A.example/post").await.unwrap().is_none());
        assert!(db.find_link("https://a.example/post").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queue_link_records_article() {
        let db = test_db().await;
        db.mark_link_queued("https://b.example/x", Some("https://a.example/post"))
            .await
            .unwrap();

        let state = db.find_link("https://b.example/x").await.unwrap().unwrap();
        assert_eq!(state.url, "https://b.example/x");
        assert_eq!(state.article_url.as_deref(), Some("https://a.example/post"));
    }

    #[tokio::test]
    async fn test_requeue_without_article_keeps_origin() {
        let db = test_db().await;
        db.mark_link_queued("https://b.example/x", Some("https://a.example/post"))
            .await
            .unwrap();
        let again = db.mark_link_queued("https://b.example/x", None).await.unwrap();

        let state = db.find_link("https://b.example/x").await.unwrap().unwrap();
        assert_eq!(state.article_url.as_deref(), Some("https://a.example/post"));
        assert_eq!(state.queued_at.timestamp_millis(), again.timestamp_millis());
    }

    #[tokio::test]
    async fn test_closed_database_reports_error() {
        let db = test_db().await;
        db.close().await;
        assert!(db.find_article("https://a.example/post").await.is_err());
        assert!(db.mark_link_queued("https://b.example/x", None).await.is_err());
    }
}
