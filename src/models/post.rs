use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub subject: String,
    pub preview_text: String,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "coverImageURL")]
    pub cover_image_url: Option<String>,
    #[serde(default, rename = "subscriptionID")]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

/// One page of the posts feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    pub posts: Vec<Post>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A post as read back from the store, with its subscription's name.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub post: Post,
    pub subscription_name: Option<String>,
}
