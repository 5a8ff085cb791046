use anyhow::anyhow;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::comments::CommentNode;
use crate::error::{RelicError, Result};
use crate::settings::Settings;
use crate::summarizer::StoryPointSource;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Jira API client configuration.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub timeout_seconds: u64,
}

impl JiraConfig {
    /// Build a client configuration from the saved settings, failing with
    /// the specific missing field.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.jira_org_url.trim().is_empty() {
            return Err(RelicError::ConfigurationMissing(
                "JIRA organization URL is not set".to_string(),
            ));
        }
        if settings.jira_auth_user_email.trim().is_empty() {
            return Err(RelicError::ConfigurationMissing(
                "JIRA auth user email is not set".to_string(),
            ));
        }
        if settings.jira_api_key.trim().is_empty() {
            return Err(RelicError::ConfigurationMissing(
                "JIRA API key is not set".to_string(),
            ));
        }
        Ok(Self {
            base_url: settings.jira_org_url.trim_end_matches('/').to_string(),
            email: settings.jira_auth_user_email.clone(),
            api_token: settings.jira_api_key.clone(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        })
    }
}

/// Jira project listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    pub name: String,
}

/// Agile board, scoped to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: String,
}

#[derive(Debug, Deserialize)]
struct BoardList {
    values: Option<Vec<Board>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SprintList {
    values: Option<Vec<Sprint>>,
}

/// Issue as returned by the search and sprint-issue endpoints, restricted
/// to the fields the pipeline projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub timespent: Option<i64>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub comment: Option<CommentContainer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueStatus {
    #[serde(rename = "statusCategory", default)]
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCategory {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentContainer {
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub body: CommentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub content: Vec<CommentNode>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    issues: Option<Vec<Issue>>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResults {
    issues: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct EstimationField {
    #[serde(rename = "fieldId")]
    field_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueFieldValues {
    fields: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Member of a project role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleMembers {
    actors: Option<Vec<Member>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "accountType", default)]
    pub account_type: Option<String>,
}

/// Thin authenticated client for the tracking API. Performs exactly one
/// HTTP call per operation; retry policy stays with the caller.
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RelicError::upstream("create HTTP client", e))?;

        Ok(Self { client, config })
    }

    /// Basic-auth header value, recomputed per call.
    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.email, self.config.api_token);
        format!("Basic {}", general_purpose::STANDARD.encode(credentials))
    }

    async fn get_json<T>(&self, operation: &str, url: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelicError::upstream(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RelicError::upstream(
                operation,
                anyhow!("HTTP {}: {}", status, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RelicError::upstream(operation, e))
    }

    /// List every project in the organization.
    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{}/rest/api/3/project", self.config.base_url);
        let projects: Vec<Project> = self.get_json("fetch projects", &url, &[]).await?;
        info!("Fetched {} projects from the tracking API", projects.len());
        Ok(projects)
    }

    /// List agile boards, optionally filtered to one project.
    pub async fn get_boards(&self, project_key: Option<&str>) -> Result<Vec<Board>> {
        let url = format!("{}/rest/agile/1.0/board", self.config.base_url);
        let query: Vec<(&str, String)> = match project_key {
            Some(key) => vec![("projectKey", key.to_string())],
            None => Vec::new(),
        };

        let list: BoardList = self.get_json("fetch boards", &url, &query).await?;
        list.values.ok_or_else(|| {
            RelicError::upstream(
                "fetch boards",
                anyhow!("response is missing the values collection"),
            )
        })
    }

    /// List sprints for a board. Boards with no sprints yield an empty list.
    pub async fn get_sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
        let operation = format!("fetch sprints for board {}", board_id);
        let url = format!(
            "{}/rest/agile/1.0/board/{}/sprint",
            self.config.base_url, board_id
        );

        let list: SprintList = self.get_json(&operation, &url, &[]).await?;
        list.values.ok_or_else(|| {
            RelicError::upstream(
                operation.clone(),
                anyhow!("response is missing the values collection"),
            )
        })
    }

    /// Search issues by JQL with an explicit field projection.
    pub async fn search_issues(&self, jql: &str, fields: &[&str]) -> Result<Vec<Issue>> {
        let url = format!("{}/rest/api/3/search", self.config.base_url);
        let query = vec![
            ("jql", jql.to_string()),
            ("fields", fields.join(",")),
        ];

        let results: SearchResults = self.get_json("search issues", &url, &query).await?;
        let issues = results.issues.ok_or_else(|| {
            RelicError::upstream(
                "search issues",
                anyhow!("response is missing the issues collection"),
            )
        })?;
        info!("Issue search returned {} issues", issues.len());
        Ok(issues)
    }

    /// Same search, but returning the raw payload per issue. Used by the
    /// export flow, whose projection carries fields the typed model does
    /// not track.
    pub async fn search_issues_raw(
        &self,
        jql: &str,
        fields: &[&str],
    ) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/rest/api/3/search", self.config.base_url);
        let query = vec![
            ("jql", jql.to_string()),
            ("fields", fields.join(",")),
        ];

        let results: RawSearchResults = self.get_json("search issues", &url, &query).await?;
        results.issues.ok_or_else(|| {
            RelicError::upstream(
                "search issues",
                anyhow!("response is missing the issues collection"),
            )
        })
    }

    /// List the issues belonging to a sprint.
    pub async fn get_sprint_issues(&self, sprint_id: &str) -> Result<Vec<Issue>> {
        let operation = format!("fetch issues for sprint {}", sprint_id);
        let url = format!(
            "{}/rest/agile/1.0/sprint/{}/issue",
            self.config.base_url, sprint_id
        );

        let results: SearchResults = self.get_json(&operation, &url, &[]).await?;
        results.issues.ok_or_else(|| {
            RelicError::upstream(
                operation.clone(),
                anyhow!("response is missing the issues collection"),
            )
        })
    }

    /// Resolve the board-specific estimation field id for an issue.
    pub async fn get_estimation_field(&self, issue_key: &str, board_id: u64) -> Result<String> {
        let operation = format!("fetch estimation field for issue {}", issue_key);
        let url = format!(
            "{}/rest/agile/1.0/issue/{}/estimation",
            self.config.base_url, issue_key
        );
        let query = vec![("boardId", board_id.to_string())];

        let estimation: EstimationField = self.get_json(&operation, &url, &query).await?;
        estimation.field_id.ok_or_else(|| {
            RelicError::upstream(operation.clone(), anyhow!("no story point field data found"))
        })
    }

    /// Fetch one field's value for an issue. Absent fields come back as
    /// JSON null.
    pub async fn get_issue_field(
        &self,
        issue_key: &str,
        field_id: &str,
    ) -> Result<serde_json::Value> {
        let operation = format!("fetch field {} for issue {}", field_id, issue_key);
        let url = format!(
            "{}/rest/agile/1.0/issue/{}",
            self.config.base_url, issue_key
        );
        let query = vec![("fields", field_id.to_string())];

        let values: IssueFieldValues = self.get_json(&operation, &url, &query).await?;
        let mut fields = values.fields.ok_or_else(|| {
            RelicError::upstream(operation.clone(), anyhow!("no field data found"))
        })?;
        Ok(fields
            .remove(field_id)
            .unwrap_or(serde_json::Value::Null))
    }

    /// Map role name to role URL for a project.
    pub async fn get_project_roles(&self, project_key: &str) -> Result<HashMap<String, String>> {
        let operation = format!("fetch roles for project {}", project_key);
        let url = format!(
            "{}/rest/api/3/project/{}/role",
            self.config.base_url, project_key
        );
        self.get_json(&operation, &url, &[]).await
    }

    /// Fetch the members behind a role URL (the URL is absolute, handed
    /// back by the role listing).
    pub async fn get_role_members(&self, role_url: &str) -> Result<Vec<Member>> {
        let members: RoleMembers = self.get_json("fetch role members", role_url, &[]).await?;
        Ok(members.actors.unwrap_or_default())
    }

    /// List user accounts, excluding app-type accounts.
    pub async fn get_users(&self) -> Result<Vec<User>> {
        let url = format!("{}/rest/api/3/users/search", self.config.base_url);
        let users: Vec<User> = self.get_json("fetch users", &url, &[]).await?;
        Ok(users
            .into_iter()
            .filter(|user| user.account_type.as_deref() != Some("app"))
            .collect())
    }
}

/// Interpret a raw estimation field value as story points. Null and
/// non-numeric values mean "not estimated".
pub fn coerce_story_points(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[async_trait]
impl StoryPointSource for JiraClient {
    /// Two sequential calls: resolve the board's estimation field id,
    /// then read that field off the issue.
    async fn story_points(&self, issue_key: &str, board_id: u64) -> Result<Option<f64>> {
        let field_id = self.get_estimation_field(issue_key, board_id).await?;
        debug!("Estimation field for issue {}: {}", issue_key, field_id);

        let value = self.get_issue_field(issue_key, &field_id).await?;
        Ok(coerce_story_points(&value))
    }
}
