//! Meeting-notes generation from tracking-API work logs: identifier
//! resolution, work-log fetching, AI-enriched per-issue summarization,
//! and document rendering/publishing.

pub mod cli;
pub mod comments;
pub mod confluence;
pub mod document;
pub mod error;
pub mod fanout;
pub mod jira_client;
pub mod llama_client;
pub mod notes;
pub mod resolver;
pub mod router;
pub mod settings;
pub mod summarizer;
pub mod worklog;
