// SPDX-License-Identifier: MIT

//! HTTP client for a central rule server
//!
//! Speaks to the admin API served by [`crate::server`]. The request timeout
//! is the only bound on a fetch; the rule cache adds none of its own.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::store::{RuleStore, TreeRuleSource};
use super::types::{Rule, TreeRule};
use crate::error::{RuleError, RuleResult};

const ACTIVE_RULES_PATH: &str = "api/rules/active";
const ACTIVE_RULES_TREE_PATH: &str = "api/rules/active/tree";

#[derive(Debug, Clone)]
pub struct HttpRuleClient {
    client: Client,
    base_url: Url,
}

impl HttpRuleClient {
    pub fn new(base_url: &str, timeout: Duration) -> RuleResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| RuleError::config(format!("invalid rule server URL '{}': {}", base_url, e)))?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        log::info!(
            "Rule client: base_url={}, timeout={}s",
            base_url,
            timeout.as_secs()
        );

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RuleResult<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RuleError::config(format!("invalid request path '{}': {}", path, e)))?;

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RuleError::api(
                self.base_url.as_str(),
                format!("{}: {}", status, body),
            ));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl RuleStore for HttpRuleClient {
    async fn list_active_rules(&self) -> RuleResult<Vec<Rule>> {
        self.get_json(ACTIVE_RULES_PATH).await
    }
}

#[async_trait]
impl TreeRuleSource for HttpRuleClient {
    async fn list_active_rules_tree(&self) -> RuleResult<Vec<TreeRule>> {
        self.get_json(ACTIVE_RULES_TREE_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let client = HttpRuleClient::new("http://rules.local:8080/central", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://rules.local:8080/central/");
        assert_eq!(
            client.base_url().join(ACTIVE_RULES_PATH).unwrap().as_str(),
            "http://rules.local:8080/central/api/rules/active"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = HttpRuleClient::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RuleError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = HttpRuleClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.list_active_rules().await,
            Err(RuleError::Http(_))
        ));
    }
}
