use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Published,
    Unpublished,
    Archived,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Published => "published",
            SubscriptionStatus::Unpublished => "unpublished",
            SubscriptionStatus::Archived => "archived",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to `Published`, matching placeholder defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unpublished" => SubscriptionStatus::Unpublished,
            "archived" => SubscriptionStatus::Archived,
            _ => SubscriptionStatus::Published,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_opt_in")]
    pub opt_in: bool,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

fn default_opt_in() -> bool {
    true
}

impl Subscription {
    /// Stand-in for a subscription a post references before the
    /// subscriptions feed has delivered it.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            opt_in: true,
            status: SubscriptionStatus::Published,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_format() {
        let json = r#"{"subscriptions":[{"id":"sub-1","name":"Scores","description":null,"optIn":false,"status":"archived"}]}"#;
        let response: SubscriptionsResponse = serde_json::from_str(json).unwrap();

        let sub = &response.subscriptions[0];
        assert_eq!(sub.id, "sub-1");
        assert_eq!(sub.name.as_deref(), Some("Scores"));
        assert!(!sub.opt_in);
        assert_eq!(sub.status, SubscriptionStatus::Archived);
    }

    #[test]
    fn placeholder_defaults() {
        let sub = Subscription::placeholder("sub-x");
        assert_eq!(sub.id, "sub-x");
        assert!(sub.name.is_none());
        assert!(sub.opt_in);
        assert_eq!(sub.status, SubscriptionStatus::Published);
    }

    #[test]
    fn unknown_status_reads_as_published() {
        assert_eq!(
            "draft".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Published
        );
        assert_eq!(
            "unpublished".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Unpublished
        );
    }
}
