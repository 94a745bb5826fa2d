mod client;
mod http;

pub use client::FeedClient;
pub use http::HttpFeedClient;
