//! Scripted feed client shared by the sync tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::feed::FeedClient;
use crate::models::{Post, PostsPage, Subscription, SubscriptionStatus};

type Scripted<T> = std::result::Result<T, String>;

/// Feed client answering from a script and logging every request in the
/// order it was issued.
pub struct MockFeedClient {
    subscriptions: Mutex<Scripted<Vec<Subscription>>>,
    pages: Mutex<HashMap<Option<String>, Scripted<PostsPage>>>,
    calls: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
}

impl MockFeedClient {
    /// Empty subscriptions list, no pages scripted.
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Ok(Vec::new())),
            pages: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    pub fn subscriptions(&self, subscriptions: Vec<Subscription>) {
        *self.subscriptions.lock().unwrap() = Ok(subscriptions);
    }

    pub fn failing_subscriptions(&self) {
        *self.subscriptions.lock().unwrap() = Err("subscriptions unavailable".to_string());
    }

    pub fn set_page(&self, cursor: Option<&str>, page: PostsPage) {
        self.pages
            .lock()
            .unwrap()
            .insert(cursor.map(str::to_string), Ok(page));
    }

    pub fn page(&self, cursor: Option<&str>, posts: Vec<Post>, next: Option<&str>, has_more: bool) {
        self.set_page(
            cursor,
            PostsPage {
                posts,
                next_cursor: next.map(str::to_string),
                has_more,
            },
        );
    }

    pub fn failing_page(&self, cursor: Option<&str>) {
        self.pages.lock().unwrap().insert(
            cursor.map(str::to_string),
            Err(format!("page {} unavailable", cursor.unwrap_or("nil"))),
        );
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscription_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == "getSubscriptions")
            .count()
    }

    pub fn posts_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("getPosts"))
            .count()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl FeedClient for MockFeedClient {
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.calls.lock().unwrap().push("getSubscriptions".to_string());
        self.delay().await;

        let scripted = self.subscriptions.lock().unwrap().clone();
        scripted.map_err(|e| AppError::Other(anyhow::anyhow!(e)))
    }

    async fn get_posts(&self, cursor: Option<&str>) -> Result<PostsPage> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("getPosts(cursor: {})", cursor.unwrap_or("nil")));
        self.delay().await;

        let scripted = self
            .pages
            .lock()
            .unwrap()
            .get(&cursor.map(str::to_string))
            .cloned()
            .unwrap_or_else(|| Err(format!("no page scripted for {cursor:?}")));
        scripted.map_err(|e| AppError::Other(anyhow::anyhow!(e)))
    }
}

/// Scripts `pages` pages of `per_page` posts, chained by cursors `page-1`, `page-2`, ...
pub fn paged_feed(client: &MockFeedClient, pages: usize, per_page: usize) -> Vec<Post> {
    let mut all = Vec::with_capacity(pages * per_page);
    for index in 0..pages {
        let cursor = (index > 0).then(|| format!("page-{index}"));
        let next = (index + 1 < pages).then(|| format!("page-{}", index + 1));
        let posts = test_posts(per_page, None);
        all.extend(posts.iter().cloned());
        client.page(cursor.as_deref(), posts, next.as_deref(), index + 1 < pages);
    }
    all
}

/// Posts spread over `subscription-0..2` unless a subscription is given.
pub fn test_posts(count: usize, subscription_id: Option<&str>) -> Vec<Post> {
    (0..count)
        .map(|index| {
            let subscription = subscription_id
                .map(str::to_string)
                .unwrap_or_else(|| format!("subscription-{}", index % 3));
            test_post(Uuid::new_v4(), &subscription, false)
        })
        .collect()
}

pub fn test_post(id: Uuid, subscription_id: &str, is_read: bool) -> Post {
    Post {
        id,
        subject: format!("Test Post {id}"),
        preview_text: "This is the preview text".to_string(),
        received_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        url: Some(format!("https://example.com/post/{id}")),
        cover_image_url: Some(format!("https://example.com/images/{id}.jpg")),
        subscription_id: Some(subscription_id.to_string()),
        is_read,
    }
}

pub fn test_subscriptions(count: usize) -> Vec<Subscription> {
    (0..count)
        .map(|index| Subscription {
            id: format!("subscription-{index}"),
            name: Some(format!("Test Subscription {index}")),
            description: Some(format!("Description for Test Subscription {index}")),
            opt_in: index % 2 == 0,
            status: if index % 3 == 0 {
                SubscriptionStatus::Published
            } else {
                SubscriptionStatus::Unpublished
            },
        })
        .collect()
}
