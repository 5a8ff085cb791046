use anyhow::anyhow;
use base64::{engine::general_purpose, Engine as _};
use log::info;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::{RelicError, Result};
use crate::jira_client::JiraConfig;

/// Created (or existing) wiki page.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfluencePage {
    pub id: String,
    pub title: String,
}

/// Client for the wiki publishing API. Shares the tracking-API
/// credentials: Confluence lives under the same organization URL.
pub struct ConfluenceClient {
    client: Client,
    config: JiraConfig,
}

pub fn space_payload(space_key: &str, space_name: &str) -> serde_json::Value {
    json!({
        "key": space_key,
        "name": space_name,
        "description": {
            "plain": {
                "value": "Summary space for generated meeting notes.",
                "representation": "plain"
            }
        }
    })
}

pub fn page_payload(space_key: &str, title: &str, content: &str) -> serde_json::Value {
    json!({
        "type": "page",
        "title": title,
        "space": { "key": space_key },
        "body": {
            "storage": {
                "value": content,
                "representation": "storage"
            }
        }
    })
}

impl ConfluenceClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RelicError::upstream("create HTTP client", e))?;

        Ok(Self { client, config })
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.email, self.config.api_token);
        format!("Basic {}", general_purpose::STANDARD.encode(credentials))
    }

    /// Make sure the target space exists, creating it when the lookup
    /// comes back 404.
    pub async fn ensure_space(&self, space_key: &str, space_name: &str) -> Result<()> {
        let url = format!(
            "{}/wiki/rest/api/space/{}",
            self.config.base_url, space_key
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RelicError::upstream("check wiki space", e))?;

        match response.status() {
            status if status.is_success() => {
                info!("Wiki space {} already exists", space_key);
                Ok(())
            }
            StatusCode::NOT_FOUND => self.create_space(space_key, space_name).await,
            status => Err(RelicError::upstream(
                "check wiki space",
                anyhow!("HTTP {}", status),
            )),
        }
    }

    async fn create_space(&self, space_key: &str, space_name: &str) -> Result<()> {
        let url = format!("{}/wiki/rest/api/space", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&space_payload(space_key, space_name))
            .send()
            .await
            .map_err(|e| RelicError::upstream("create wiki space", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RelicError::upstream(
                "create wiki space",
                anyhow!("HTTP {}: {}", status, body),
            ));
        }

        info!("Created wiki space {} ({})", space_key, space_name);
        Ok(())
    }

    /// Create a page under a space, with the content in storage
    /// representation.
    pub async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        content: &str,
    ) -> Result<ConfluencePage> {
        let url = format!("{}/wiki/rest/api/content", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&page_payload(space_key, title, content))
            .send()
            .await
            .map_err(|e| RelicError::upstream("create wiki page", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RelicError::upstream(
                "create wiki page",
                anyhow!("HTTP {}: {}", status, body),
            ));
        }

        let page: ConfluencePage = response
            .json()
            .await
            .map_err(|e| RelicError::upstream("create wiki page", e))?;
        info!("Created wiki page {} (id {})", page.title, page.id);
        Ok(page)
    }

    /// Ensure the space exists, then publish the page into it.
    pub async fn publish(
        &self,
        space_key: &str,
        space_name: &str,
        title: &str,
        content: &str,
    ) -> Result<ConfluencePage> {
        self.ensure_space(space_key, space_name).await?;
        self.create_page(space_key, title, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_payload_shape() {
        let payload = space_payload("REL", "Meeting Notes");

        assert_eq!(payload["key"], "REL");
        assert_eq!(payload["name"], "Meeting Notes");
        assert_eq!(payload["description"]["plain"]["representation"], "plain");
    }

    #[test]
    fn test_page_payload_shape() {
        let payload = page_payload("REL", "Sprint 12 notes", "<div>notes</div>");

        assert_eq!(payload["type"], "page");
        assert_eq!(payload["title"], "Sprint 12 notes");
        assert_eq!(payload["space"]["key"], "REL");
        assert_eq!(payload["body"]["storage"]["value"], "<div>notes</div>");
        assert_eq!(payload["body"]["storage"]["representation"], "storage");
    }
}
