mod post;
mod subscription;

pub use post::{Post, PostsPage, StoredPost};
pub use subscription::{Subscription, SubscriptionStatus, SubscriptionsResponse};
