use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::{FeedClient, HttpFeedClient};
use crate::models::StoredPost;
use crate::sync::{InboxSync, RoundOutcome};

pub struct App {
    pub repository: Repository,
    inbox: Option<InboxSync>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;

        // Local commands work without credentials; only syncing needs them.
        let inbox = match HttpFeedClient::from_config(config) {
            Ok(client) => {
                let client: Arc<dyn FeedClient> = Arc::new(client);
                Some(InboxSync::new(client, repository.clone(), config.max_pages))
            }
            Err(e) => {
                tracing::debug!("Sync unavailable: {}", e);
                None
            }
        };

        Ok(Self { repository, inbox })
    }

    pub async fn sync(&self) -> Result<RoundOutcome> {
        let inbox = self
            .inbox
            .as_ref()
            .ok_or_else(|| AppError::Config("account_token is not set".to_string()))?;
        Ok(inbox.sync_outcome().await)
    }

    pub async fn posts(&self, subscription_id: Option<&str>) -> Result<Vec<StoredPost>> {
        self.repository.list_posts(subscription_id).await
    }

    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        match self.repository.get_post_by_str(id).await? {
            Some(stored) => self.repository.mark_post_read(stored.post.id).await,
            None => Ok(false),
        }
    }

    pub async fn receive_push_file(&self, path: &Path) -> Result<bool> {
        let content = tokio::fs::read_to_string(path).await?;
        let payload: serde_json::Value = serde_json::from_str(&content)?;
        self.repository.receive_from_push(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn app(dir: &tempfile::TempDir, token: Option<&str>) -> App {
        let config = Config {
            db_path: dir.path().join("inbox.db").to_string_lossy().to_string(),
            account_token: token.map(str::to_string),
            ..Config::default()
        };
        App::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn sync_without_token_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, None).await;
        assert!(matches!(app.sync().await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn push_file_then_mark_read() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Some("token")).await;
        let id = uuid::Uuid::new_v4();

        let push_path = dir.path().join("push.json");
        let payload = serde_json::json!({
            "rover": { "post": {
                "id": id.to_string(),
                "subject": "Doors open",
                "previewText": "Gates open at noon",
                "receivedAt": "2025-03-01T12:00:00Z",
                "url": "https://example.com/doors",
                "subscriptionID": "game-day",
            }}
        });
        std::fs::write(&push_path, payload.to_string()).unwrap();

        assert!(app.receive_push_file(&push_path).await.unwrap());
        assert_eq!(app.repository.unread_count().await.unwrap(), 1);

        assert!(app.mark_read(&id.to_string()).await.unwrap());
        assert!(!app.mark_read("bogus").await.unwrap());
        assert_eq!(app.repository.unread_count().await.unwrap(), 0);
        assert_eq!(app.posts(Some("game-day")).await.unwrap().len(), 1);
    }
}
