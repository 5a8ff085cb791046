use async_trait::async_trait;
use log::{debug, error, info};
use serde::Serialize;

use crate::comments;
use crate::document::{Cell, TableRecord};
use crate::error::Result;
use crate::fanout;
use crate::jira_client::Issue;

/// Story-point lookup seam, implemented by the tracking-API client.
#[async_trait]
pub trait StoryPointSource: Send + Sync {
    /// `None` means the issue carries no estimation on this board.
    async fn story_points(&self, issue_key: &str, board_id: u64) -> Result<Option<f64>>;
}

/// AI remark seam, implemented by the local model client.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, summary: &str, status: &str, comments: &str) -> Result<String>;
}

/// Flattened per-issue join of tracking data, story points and AI remark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub key: String,
    pub summary: String,
    pub assignee: String,
    pub spent_time: i64,
    pub story_point: Option<f64>,
    pub status: String,
    pub ai_remarks: String,
}

const SUMMARY_COLUMNS: [&str; 7] = [
    "key",
    "summary",
    "assignee",
    "spentTime",
    "storyPoint",
    "status",
    "aiRemarks",
];

impl TableRecord for SummaryRecord {
    fn columns() -> &'static [&'static str] {
        &SUMMARY_COLUMNS
    }

    fn cell(&self, column: &str) -> Cell {
        match column {
            "key" => Cell::Text(self.key.clone()),
            "summary" => Cell::Text(self.summary.clone()),
            "assignee" => Cell::Text(self.assignee.clone()),
            "spentTime" => Cell::Duration(self.spent_time),
            "storyPoint" => Cell::Points(self.story_point),
            "status" => Cell::Text(self.status.clone()),
            "aiRemarks" => Cell::Text(self.ai_remarks.clone()),
            _ => Cell::Text(String::new()),
        }
    }
}

/// Join per-issue data into summary records, fanning out across issues
/// under a concurrency bound.
///
/// Failures are isolated per issue: a failing issue is logged and omitted
/// from the result, every other issue is unaffected. Output order follows
/// input order.
pub async fn summarize<P, A>(
    issues: &[Issue],
    board_id: u64,
    points: &P,
    annotator: &A,
    concurrency: usize,
) -> Vec<SummaryRecord>
where
    P: StoryPointSource,
    A: Annotator,
{
    info!("Summarizing {} issues", issues.len());

    let tasks: Vec<_> = issues
        .iter()
        .map(|issue| summarize_issue(issue, board_id, points, annotator))
        .collect();
    let results = fanout::best_effort(tasks, concurrency).await;

    let records: Vec<SummaryRecord> = results
        .into_iter()
        .zip(issues)
        .filter_map(|(result, issue)| match result {
            Ok(record) => Some(record),
            Err(e) => {
                error!("Skipping issue {} after a summarization failure: {}", issue.key, e);
                None
            }
        })
        .collect();

    info!("Completed processing {} of {} issues", records.len(), issues.len());
    records
}

async fn summarize_issue<P, A>(
    issue: &Issue,
    board_id: u64,
    points: &P,
    annotator: &A,
) -> Result<SummaryRecord>
where
    P: StoryPointSource,
    A: Annotator,
{
    debug!("Processing issue {}", issue.key);

    let summary = issue.fields.summary.clone().unwrap_or_default();
    let assignee = issue
        .fields
        .assignee
        .as_ref()
        .and_then(|a| a.display_name.clone())
        .unwrap_or_default();
    let spent_time = issue.fields.timespent.unwrap_or(0);
    let status = issue
        .fields
        .status
        .as_ref()
        .and_then(|s| s.status_category.as_ref())
        .and_then(|c| c.name.clone())
        .unwrap_or_default();

    let story_point = points.story_points(&issue.key, board_id).await?;

    let comments = comments::extract_issue_comments(issue);
    let ai_remarks = if comments.is_empty() {
        String::new()
    } else {
        annotator.annotate(&summary, &status, &comments).await?
    };

    Ok(SummaryRecord {
        key: issue.key.clone(),
        summary,
        assignee,
        spent_time,
        story_point,
        status,
        ai_remarks,
    })
}

/// Summary records partitioned by assignee, preserving the first-seen
/// order of assignee values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSummary {
    groups: Vec<(String, Vec<SummaryRecord>)>,
}

impl GroupedSummary {
    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn get(&self, assignee: &str) -> Option<&[SummaryRecord]> {
        self.groups
            .iter()
            .find(|(key, _)| key == assignee)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SummaryRecord])> {
        self.groups
            .iter()
            .map(|(key, records)| (key.as_str(), records.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Stable grouping by assignee name.
pub fn group_by_assignee(records: Vec<SummaryRecord>) -> GroupedSummary {
    let mut groups: Vec<(String, Vec<SummaryRecord>)> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|(key, _)| *key == record.assignee) {
            Some((_, bucket)) => bucket.push(record),
            None => groups.push((record.assignee.clone(), vec![record])),
        }
    }

    GroupedSummary { groups }
}
