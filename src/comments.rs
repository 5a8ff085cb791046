use serde::{Deserialize, Serialize};

use crate::jira_client::Issue;

/// One node of the rich-document tree Jira uses for comment bodies.
/// Nodes carry a type plus either literal text or nested content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<CommentNode>>,
}

/// Recursively flatten a comment body into plain text, skipping code
/// blocks. Siblings and nested children are joined with single spaces.
pub fn extract_text(nodes: &[CommentNode]) -> String {
    nodes
        .iter()
        .map(|node| {
            if node.node_type == "codeBlock" {
                return String::new();
            }
            if node.node_type == "text" {
                return node.text.clone().unwrap_or_default();
            }
            if let Some(children) = &node.content {
                return extract_text(children);
            }
            String::new()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flatten every comment on an issue into one labelled string:
/// `Comment-1: ... Comment-2: ...`. Issues without comments yield an
/// empty string.
pub fn extract_issue_comments(issue: &Issue) -> String {
    let Some(container) = &issue.fields.comment else {
        return String::new();
    };

    container
        .comments
        .iter()
        .enumerate()
        .map(|(index, comment)| {
            let text = extract_text(&comment.body.content);
            format!("Comment-{}: {}", index + 1, text)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
