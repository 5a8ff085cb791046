use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RelicError, Result};
use crate::jira_client::{Issue, JiraClient};

/// Field projection for the summarization pipeline.
pub const WORK_LOG_FIELDS: [&str; 6] = [
    "key",
    "summary",
    "comment",
    "timespent",
    "assignee",
    "status",
];

/// Extended projection used by the raw-export flow.
pub const EXPORT_FIELDS: [&str; 11] = [
    "key",
    "summary",
    "timespent",
    "status",
    "comment",
    "assignee",
    "reporter",
    "priority",
    "issuetype",
    "labels",
    "project",
];

/// Date-range query: issues in the project with logged work inside the
/// range and a non-zero time spent.
pub fn date_range_jql(project_key: &str, start_date: &str, end_date: &str) -> String {
    format!(
        "project = {} AND worklogDate >= {} AND worklogDate <= {} AND timespent > 0",
        project_key, start_date, end_date
    )
}

/// Membership query over explicit issue keys. `None` when there are no
/// keys: `issueKey in ()` is not a valid query and must never be sent.
pub fn membership_jql(issue_keys: &[String]) -> Option<String> {
    if issue_keys.is_empty() {
        None
    } else {
        Some(format!("issueKey in ({})", issue_keys.join(",")))
    }
}

/// Fetch the issues carrying work logs for a project and date range,
/// optionally scoped to a sprint.
///
/// The sprint path first lists the sprint's issue keys and queries by
/// membership; a sprint without issues short-circuits to an empty result.
pub async fn fetch_work_logs(
    jira: &JiraClient,
    project_key: &str,
    start_date: &str,
    end_date: &str,
    sprint_id: Option<&str>,
) -> Result<Vec<Issue>> {
    if project_key.is_empty() || start_date.is_empty() || end_date.is_empty() {
        return Err(RelicError::Validation(
            "project key, start date and end date are required".to_string(),
        ));
    }

    info!(
        "Fetching work log data: project={} range={}..{} sprint={}",
        project_key,
        start_date,
        end_date,
        sprint_id.unwrap_or("-")
    );

    let jql = match sprint_id.filter(|id| !id.is_empty()) {
        Some(sprint_id) => {
            let sprint_issues = jira.get_sprint_issues(sprint_id).await?;
            let keys: Vec<String> = sprint_issues.into_iter().map(|issue| issue.key).collect();
            match membership_jql(&keys) {
                Some(jql) => jql,
                None => {
                    info!("Sprint {} has no issues; returning an empty work log", sprint_id);
                    return Ok(Vec::new());
                }
            }
        }
        None => date_range_jql(project_key, start_date, end_date),
    };

    jira.search_issues(&jql, &WORK_LOG_FIELDS).await
}

/// Fetch work logs across all projects with the extended projection and
/// save the raw payload as JSON under `out_dir`. Returns the file path.
pub async fn export_work_logs(
    jira: &JiraClient,
    start_date: &str,
    end_date: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    if start_date.is_empty() || end_date.is_empty() {
        return Err(RelicError::Validation(
            "start and end dates are required".to_string(),
        ));
    }

    let jql = format!(
        "worklogDate >= \"{}\" AND worklogDate <= \"{}\"",
        start_date, end_date
    );
    let issues = jira.search_issues_raw(&jql, &EXPORT_FIELDS).await?;

    fs::create_dir_all(out_dir)
        .map_err(|e| RelicError::upstream("create export directory", e))?;
    let path = out_dir.join("jiraWorkLogResponse.json");
    let contents = serde_json::to_string_pretty(&issues)
        .map_err(|e| RelicError::upstream("serialize work log export", e))?;
    fs::write(&path, contents).map_err(|e| RelicError::upstream("write work log export", e))?;

    info!("Saved {} issues to {}", issues.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira_client::{JiraConfig, DEFAULT_TIMEOUT_SECONDS};

    #[test]
    fn test_date_range_jql() {
        assert_eq!(
            date_range_jql("APL", "2024-06-01", "2024-06-14"),
            "project = APL AND worklogDate >= 2024-06-01 AND worklogDate <= 2024-06-14 \
             AND timespent > 0"
        );
    }

    #[test]
    fn test_membership_jql() {
        let keys = vec!["APL-1".to_string(), "APL-2".to_string()];
        assert_eq!(
            membership_jql(&keys).unwrap(),
            "issueKey in (APL-1,APL-2)"
        );
    }

    #[test]
    fn test_membership_jql_empty_is_none() {
        assert_eq!(membership_jql(&[]), None);
    }

    #[test]
    fn test_fetch_work_logs_validates_before_any_call() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let jira = JiraClient::new(JiraConfig {
            // Unroutable on purpose; validation must fire first.
            base_url: "http://localhost:1".to_string(),
            email: "dev@example.com".to_string(),
            api_token: "token123".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        })
        .unwrap();

        let result = runtime.block_on(fetch_work_logs(&jira, "APL", "", "2024-06-14", None));
        assert!(matches!(result.unwrap_err(), RelicError::Validation(_)));
    }
}
