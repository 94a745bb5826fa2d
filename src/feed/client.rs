use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PostsPage, Subscription};

/// Remote side of the inbox: a subscriptions listing and a paginated posts feed.
///
/// Implementations hold no state between calls.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>>;

    /// Fetches one page; `None` asks for the first page.
    async fn get_posts(&self, cursor: Option<&str>) -> Result<PostsPage>;
}
