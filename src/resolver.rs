use log::{info, warn};
use serde::Serialize;

use crate::error::{RelicError, Result};
use crate::fanout;
use crate::jira_client::{Board, JiraClient, Member, Project, Sprint};

/// Roles whose members count as project members.
const MEMBER_ROLES: [&str; 2] = ["Administrator", "Member"];

/// Boards of one project, for the hierarchical selection listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBoards {
    pub project_key: String,
    pub boards: Vec<Board>,
}

/// Sprints of one board, annotated with the owning project.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSprints {
    pub project_key: String,
    pub board_id: u64,
    pub board_name: String,
    pub sprints: Vec<Sprint>,
}

/// Find the key of the project whose name matches exactly.
pub fn find_project_key<'a>(projects: &'a [Project], name: &str) -> Result<&'a str> {
    projects
        .iter()
        .find(|project| project.name == name)
        .map(|project| project.key.as_str())
        .ok_or_else(|| RelicError::NotFound(format!("project with name {}", name)))
}

/// Find the id of the board whose name matches exactly.
pub fn find_board_id(boards: &[Board], name: &str) -> Result<u64> {
    boards
        .iter()
        .find(|board| board.name == name)
        .map(|board| board.id)
        .ok_or_else(|| RelicError::NotFound(format!("board with name {}", name)))
}

/// Resolve a project name to its key via the full project listing.
pub async fn resolve_project_key(jira: &JiraClient, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(RelicError::Validation("project name is required".to_string()));
    }

    let projects = jira.get_projects().await?;
    let key = find_project_key(&projects, name)?.to_string();
    info!("Resolved project {} to key {}", name, key);
    Ok(key)
}

/// Resolve a board name to its id via the full board listing.
pub async fn resolve_board_id(jira: &JiraClient, name: &str) -> Result<u64> {
    if name.is_empty() {
        return Err(RelicError::Validation("board name is required".to_string()));
    }

    let boards = jira.get_boards(None).await?;
    let id = find_board_id(&boards, name)?;
    info!("Resolved board {} to id {}", name, id);
    Ok(id)
}

/// List boards for every project, one concurrent board-list call per
/// project. A single project's failure (including a project without any
/// boards) fails the whole listing.
pub async fn list_boards_for_all_projects(jira: &JiraClient) -> Result<Vec<ProjectBoards>> {
    let projects = jira.get_projects().await?;

    let tasks: Vec<_> = projects
        .into_iter()
        .map(|project| {
            let key = project.key;
            async move {
                let boards = jira.get_boards(Some(&key)).await?;
                if boards.is_empty() {
                    return Err(RelicError::NotFound(format!(
                        "boards for project with key {}",
                        key
                    )));
                }
                Ok(ProjectBoards {
                    project_key: key,
                    boards,
                })
            }
        })
        .collect();

    fanout::all_succeed(tasks, fanout::DEFAULT_CONCURRENCY).await
}

/// List sprints for every board of every project, one concurrent
/// sprint-list call per board. Boards that yield no sprints (or fail to
/// list them) are omitted from the result.
pub async fn list_sprints_for_all_boards(jira: &JiraClient) -> Result<Vec<BoardSprints>> {
    let project_boards = list_boards_for_all_projects(jira).await?;

    let flat: Vec<(String, u64, String)> = project_boards
        .into_iter()
        .flat_map(|entry| {
            let project_key = entry.project_key;
            entry
                .boards
                .into_iter()
                .map(move |board| (project_key.clone(), board.id, board.name))
        })
        .collect();

    let tasks: Vec<_> = flat
        .into_iter()
        .map(|(project_key, board_id, board_name)| async move {
            let sprints = jira.get_sprints(board_id).await?;
            Ok(BoardSprints {
                project_key,
                board_id,
                board_name,
                sprints,
            })
        })
        .collect();

    let mut segments = Vec::new();
    for result in fanout::best_effort(tasks, fanout::DEFAULT_CONCURRENCY).await {
        match result {
            Ok(segment) if !segment.sprints.is_empty() => segments.push(segment),
            Ok(_) => {}
            Err(e) => warn!("Skipping a board in the sprint listing: {}", e),
        }
    }
    Ok(segments)
}

/// List the members of a project: Administrator and Member role
/// memberships, concatenated.
pub async fn list_project_members(jira: &JiraClient, project_key: &str) -> Result<Vec<Member>> {
    if project_key.is_empty() {
        return Err(RelicError::Validation("project key is required".to_string()));
    }

    let roles = jira.get_project_roles(project_key).await?;
    let mut role_urls: Vec<(String, String)> = roles
        .into_iter()
        .filter(|(name, _)| MEMBER_ROLES.contains(&name.as_str()))
        .collect();
    // The role listing is an unordered map; keep the lookup order stable.
    role_urls.sort();

    let mut members = Vec::new();
    for (_, url) in role_urls {
        members.extend(jira.get_role_members(&url).await?);
    }

    info!(
        "Fetched {} members for project {}",
        members.len(),
        project_key
    );
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects() -> Vec<Project> {
        vec![
            Project {
                key: "APL".to_string(),
                name: "Apollo".to_string(),
            },
            Project {
                key: "ZPH".to_string(),
                name: "Zephyr".to_string(),
            },
        ]
    }

    #[test]
    fn test_find_project_key() {
        assert_eq!(find_project_key(&projects(), "Zephyr").unwrap(), "ZPH");
    }

    #[test]
    fn test_find_project_key_not_found() {
        let error = find_project_key(&projects(), "Titan").unwrap_err();
        assert!(matches!(error, RelicError::NotFound(_)));
        assert_eq!(error.to_string(), "project with name Titan not found");
    }

    #[test]
    fn test_find_project_key_is_case_sensitive() {
        let error = find_project_key(&projects(), "zephyr").unwrap_err();
        assert!(matches!(error, RelicError::NotFound(_)));
    }

    #[test]
    fn test_find_board_id() {
        let boards = vec![
            Board {
                id: 11,
                name: "Apollo board".to_string(),
                board_type: "scrum".to_string(),
            },
            Board {
                id: 12,
                name: "Zephyr board".to_string(),
                board_type: "kanban".to_string(),
            },
        ];

        assert_eq!(find_board_id(&boards, "Zephyr board").unwrap(), 12);
        assert!(matches!(
            find_board_id(&boards, "Missing board").unwrap_err(),
            RelicError::NotFound(_)
        ));
    }
}
