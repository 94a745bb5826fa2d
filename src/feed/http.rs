use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{PostsPage, Subscription, SubscriptionsResponse};

use super::FeedClient;

const ACCOUNT_TOKEN_HEADER: &str = "x-rover-account-token";

pub struct HttpFeedClient {
    client: Client,
    endpoint: Url,
    device_identifier: String,
}

impl HttpFeedClient {
    pub fn new(endpoint: &str, account_token: &str, device_identifier: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(
            ACCOUNT_TOKEN_HEADER,
            HeaderValue::from_str(account_token)
                .map_err(|e| AppError::Config(format!("invalid account token: {e}")))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("inbox-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        // Url::join replaces the last segment unless the base ends in '/'.
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            client,
            endpoint,
            device_identifier: device_identifier.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .account_token
            .as_deref()
            .ok_or_else(|| AppError::Config("account_token is not set".to_string()))?;
        Self::new(&config.engage_endpoint, token, &config.device_identifier)
    }

    fn posts_url(&self, cursor: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint.join("posts")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("deviceIdentifier", &self.device_identifier);
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.client.get(url.clone()).send().await?;
        let bytes = check_status(response).await?.bytes().await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(
                "Failed to decode response from {}: {}, body: {}",
                url,
                e,
                String::from_utf8_lossy(&bytes)
            );
            AppError::Decode(e.to_string())
        })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Server {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        let url = self.endpoint.join("subscriptions")?;
        tracing::debug!("Retrieving subscriptions");

        let response: SubscriptionsResponse = self.get_json(url).await?;
        Ok(response.subscriptions)
    }

    async fn get_posts(&self, cursor: Option<&str>) -> Result<PostsPage> {
        let url = self.posts_url(cursor)?;
        tracing::debug!("Retrieving a page of posts with cursor: {}", cursor.unwrap_or("nil"));

        self.get_json(url).await
    }
}
