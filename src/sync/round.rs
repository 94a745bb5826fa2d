use std::fmt;
use std::sync::Arc;

use crate::db::Repository;
use crate::feed::FeedClient;

use super::walker::walk_posts;

/// How one phase of a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseResult {
    Synced { received: usize, inserted: usize },
    Failed(String),
}

impl PhaseResult {
    pub fn is_synced(&self) -> bool {
        matches!(self, PhaseResult::Synced { .. })
    }
}

impl fmt::Display for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseResult::Synced { received, inserted } => {
                write!(f, "{received} received, {inserted} new")
            }
            PhaseResult::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of one round, shared by every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub subscriptions: PhaseResult,
    pub posts: PhaseResult,
}

impl RoundOutcome {
    /// A round that never got to finish (cancelled or panicked).
    pub fn aborted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            subscriptions: PhaseResult::Failed(reason.clone()),
            posts: PhaseResult::Failed(reason),
        }
    }

    /// True when the posts phase committed a non-empty batch. The
    /// subscriptions phase has no say in this.
    pub fn new_posts(&self) -> bool {
        matches!(self.posts, PhaseResult::Synced { received, .. } if received > 0)
    }
}

/// Runs rounds: subscriptions first (best effort), then a full posts walk.
pub struct RoundCoordinator {
    client: Arc<dyn FeedClient>,
    repository: Repository,
    max_pages: usize,
}

impl RoundCoordinator {
    pub fn new(client: Arc<dyn FeedClient>, repository: Repository, max_pages: usize) -> Self {
        Self {
            client,
            repository,
            max_pages,
        }
    }

    pub async fn run(&self) -> RoundOutcome {
        tracing::debug!("Sync started");

        let subscriptions = self.sync_subscriptions().await;
        let posts = self.sync_posts().await;

        tracing::debug!("Sync finished: subscriptions {}, posts {}", subscriptions, posts);
        RoundOutcome {
            subscriptions,
            posts,
        }
    }

    async fn sync_subscriptions(&self) -> PhaseResult {
        let subscriptions = match self.client.get_subscriptions().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                // Posts still sync without fresh subscriptions; placeholders cover the gap.
                tracing::error!("Failed to sync subscriptions: {}", e);
                return PhaseResult::Failed(e.to_string());
            }
        };

        let received = subscriptions.len();
        match self.repository.upsert_subscriptions(subscriptions).await {
            Ok(inserted) => {
                tracing::debug!("Synced {} subscriptions", received);
                PhaseResult::Synced { received, inserted }
            }
            Err(e) => {
                tracing::error!("Failed to store subscriptions: {}", e);
                PhaseResult::Failed(e.to_string())
            }
        }
    }

    async fn sync_posts(&self) -> PhaseResult {
        // Every round walks from page one; an interrupted walk leaves no checkpoint.
        let walk = match walk_posts(self.client.as_ref(), None, self.max_pages).await {
            Ok(walk) => walk,
            Err(e) => {
                tracing::error!("Failed to sync posts: {}", e);
                return PhaseResult::Failed(e.to_string());
            }
        };

        let received = walk.posts.len();
        match self.repository.merge_posts_and_clear_cursor(walk.posts).await {
            Ok(inserted) => {
                tracing::debug!(
                    "Retrieved {} posts over {} pages, {} new",
                    received,
                    walk.pages,
                    inserted
                );
                PhaseResult::Synced { received, inserted }
            }
            Err(e) => {
                tracing::error!("Failed to store posts: {}", e);
                PhaseResult::Failed(e.to_string())
            }
        }
    }
}
