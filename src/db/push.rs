use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Post;

use super::Repository;

/// Post as carried inside a push notification payload. Stricter than the
/// feed DTO: everything but the cover image is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushPost {
    id: Uuid,
    subject: String,
    preview_text: String,
    received_at: DateTime<Utc>,
    url: url::Url,
    #[serde(default, rename = "coverImageURL")]
    cover_image_url: Option<String>,
    #[serde(rename = "subscriptionID")]
    subscription_id: String,
    #[serde(default)]
    is_read: bool,
}

impl From<PushPost> for Post {
    fn from(p: PushPost) -> Self {
        Post {
            id: p.id,
            subject: p.subject,
            preview_text: p.preview_text,
            received_at: p.received_at,
            url: Some(p.url.to_string()),
            cover_image_url: p.cover_image_url.filter(|u| url::Url::parse(u).is_ok()),
            subscription_id: Some(p.subscription_id),
            is_read: p.is_read,
        }
    }
}

impl Repository {
    /// Stores the post carried by a push payload (`{"rover": {"post": {...}}}`).
    ///
    /// Returns `Ok(false)` when the payload is not a post push or the post is
    /// malformed; store failures are errors.
    pub async fn receive_from_push(&self, payload: &Value) -> Result<bool> {
        let Some(raw) = payload.get("rover").and_then(|rover| rover.get("post")) else {
            return Ok(false);
        };

        let post: Post = match serde_json::from_value::<PushPost>(raw.clone()) {
            Ok(post) => post.into(),
            Err(e) => {
                tracing::warn!("Received post push, but it is not a valid post: {}", e);
                return Ok(false);
            }
        };

        tracing::debug!("Storing post {} received from push", post.id);
        self.merge_posts(vec![post]).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(post: Value) -> Value {
        json!({ "aps": { "alert": "hi" }, "rover": { "post": post } })
    }

    fn valid_post(id: Uuid) -> Value {
        json!({
            "id": id.to_string(),
            "subject": "Halftime",
            "previewText": "Jets lead at the half",
            "receivedAt": "2025-03-01T12:00:00.123Z",
            "url": "https://example.com/halftime",
            "subscriptionID": "scores",
        })
    }

    #[tokio::test]
    async fn stores_post_and_placeholder() {
        let repo = Repository::in_memory().await.unwrap();
        let id = Uuid::new_v4();

        assert!(repo.receive_from_push(&payload(valid_post(id))).await.unwrap());

        let stored = repo.get_post(id).await.unwrap().unwrap();
        assert_eq!(stored.post.subject, "Halftime");
        assert!(!stored.post.is_read);
        assert!(repo.get_subscription("scores").await.unwrap().is_some());
        assert_eq!(repo.unread_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ignores_non_post_payloads() {
        let repo = Repository::in_memory().await.unwrap();
        let handled = repo
            .receive_from_push(&json!({ "aps": { "alert": "hi" } }))
            .await
            .unwrap();
        assert!(!handled);
    }

    #[tokio::test]
    async fn rejects_incomplete_post() {
        let repo = Repository::in_memory().await.unwrap();
        let mut post = valid_post(Uuid::new_v4());
        post.as_object_mut().unwrap().remove("subscriptionID");

        assert!(!repo.receive_from_push(&payload(post)).await.unwrap());
        assert!(repo.list_posts(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_identifier() {
        let repo = Repository::in_memory().await.unwrap();
        let mut post = valid_post(Uuid::new_v4());
        post["id"] = json!("not-a-uuid");

        assert!(!repo.receive_from_push(&payload(post)).await.unwrap());
    }
}
