use log::info;

use crate::document::{render_table, HtmlElement};
use crate::error::{RelicError, Result};
use crate::fanout;
use crate::jira_client::{JiraClient, JiraConfig};
use crate::llama_client::{LlamaClient, LlamaConfig};
use crate::resolver;
use crate::settings::Settings;
use crate::summarizer::{self, group_by_assignee, SummaryRecord};
use crate::worklog;

/// Parameters for one meeting-notes generation run.
#[derive(Debug, Clone, Default)]
pub struct NoteRequest {
    /// Project name as shown in the tracking system.
    pub project: String,
    /// Board name, needed for the story point estimation lookup.
    pub board: String,
    pub sprint_id: Option<String>,
    pub start_date: String,
    pub end_date: String,
    /// Optional assignee filter; empty means everyone.
    pub users: Vec<String>,
}

impl NoteRequest {
    pub fn validate(&self) -> Result<()> {
        if self.project.is_empty() {
            return Err(RelicError::Validation("project name is required".to_string()));
        }
        if self.board.is_empty() {
            return Err(RelicError::Validation("board name is required".to_string()));
        }
        if self.start_date.is_empty() || self.end_date.is_empty() {
            return Err(RelicError::Validation(
                "start and end dates are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run the full pipeline and return the flat summary records:
/// resolve names, fetch work logs, then enrich per issue.
pub async fn generate_summary(
    settings: &Settings,
    request: &NoteRequest,
) -> Result<Vec<SummaryRecord>> {
    request.validate()?;

    let jira = JiraClient::new(JiraConfig::from_settings(settings)?)?;
    let llama = LlamaClient::new(LlamaConfig::from_settings(settings)?)?;

    let project_key = resolver::resolve_project_key(&jira, &request.project).await?;
    let board_id = resolver::resolve_board_id(&jira, &request.board).await?;

    let issues = worklog::fetch_work_logs(
        &jira,
        &project_key,
        &request.start_date,
        &request.end_date,
        request.sprint_id.as_deref(),
    )
    .await?;

    let mut records = summarizer::summarize(
        &issues,
        board_id,
        &jira,
        &llama,
        fanout::DEFAULT_CONCURRENCY,
    )
    .await;

    if !request.users.is_empty() {
        records.retain(|record| request.users.iter().any(|user| user == &record.assignee));
        info!(
            "Filtered summary down to {} records for the selected users",
            records.len()
        );
    }

    Ok(records)
}

pub fn notes_title(request: &NoteRequest) -> String {
    format!(
        "{} work log summary ({} to {})",
        request.project, request.start_date, request.end_date
    )
}

/// Assemble the notes document: a title heading, then one section per
/// assignee with that assignee's table. The assignee column is dropped
/// inside per-assignee tables and one empty column is appended for
/// manual remarks.
pub fn build_notes_document(title: &str, records: Vec<SummaryRecord>) -> HtmlElement {
    let grouped = group_by_assignee(records);

    let mut body = HtmlElement::new("div").child(HtmlElement::new("h1").child(title));

    if grouped.is_empty() {
        return body.child(
            HtmlElement::new("p").child("No work logs were found for the selected range."),
        );
    }

    for (assignee, records) in grouped.iter() {
        let heading = if assignee.is_empty() { "Unassigned" } else { assignee };
        body = body
            .child(HtmlElement::new("h3").child(heading))
            .child(render_table(records, &["assignee"], 1));
    }

    body
}

/// Generate the meeting notes markup for a request.
pub async fn generate_meeting_notes(settings: &Settings, request: &NoteRequest) -> Result<String> {
    let records = generate_summary(settings, request).await?;
    let document = build_notes_document(&notes_title(request), records);
    Ok(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NoteRequest {
        NoteRequest {
            project: "Apollo".to_string(),
            board: "Apollo board".to_string(),
            sprint_id: None,
            start_date: "2024-06-01".to_string(),
            end_date: "2024-06-14".to_string(),
            users: Vec::new(),
        }
    }

    fn record(key: &str, assignee: &str) -> SummaryRecord {
        SummaryRecord {
            key: key.to_string(),
            summary: format!("Summary of {}", key),
            assignee: assignee.to_string(),
            spent_time: 3600,
            story_point: Some(3.0),
            status: "Done".to_string(),
            ai_remarks: String::new(),
        }
    }

    #[test]
    fn test_validate_requires_dates() {
        let mut req = request();
        req.end_date = String::new();

        let error = req.validate().unwrap_err();
        assert!(matches!(error, RelicError::Validation(_)));
        assert!(error.to_string().contains("start and end dates"));
    }

    #[test]
    fn test_validate_requires_project_and_board() {
        let mut req = request();
        req.project = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.board = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_notes_title() {
        assert_eq!(
            notes_title(&request()),
            "Apollo work log summary (2024-06-01 to 2024-06-14)"
        );
    }

    #[test]
    fn test_build_notes_document_sections_follow_first_seen_order() {
        let markup = build_notes_document(
            "Apollo work log summary",
            vec![
                record("APL-1", "Dana Park"),
                record("APL-2", "Ola Marsh"),
                record("APL-3", "Dana Park"),
            ],
        )
        .to_string();

        let dana = markup.find("<h3>Dana Park</h3>").unwrap();
        let ola = markup.find("<h3>Ola Marsh</h3>").unwrap();
        assert!(dana < ola);
        assert!(markup.starts_with("<div><h1>Apollo work log summary</h1>"));
        // The assignee column is skipped inside per-assignee tables.
        assert!(!markup.contains("<th>ASSIGNEE</th>"));
    }

    #[test]
    fn test_build_notes_document_empty() {
        let markup = build_notes_document("Apollo work log summary", Vec::new()).to_string();
        assert!(markup.contains("No work logs were found"));
        assert!(!markup.contains("<table>"));
    }

    #[test]
    fn test_build_notes_document_unassigned_heading() {
        let markup = build_notes_document("Notes", vec![record("APL-9", "")]).to_string();
        assert!(markup.contains("<h3>Unassigned</h3>"));
    }
}
