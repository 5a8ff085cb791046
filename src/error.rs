use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the work-log pipeline.
///
/// Lower-level failures are wrapped with the operation that issued them
/// before they surface; see [`RelicError::upstream`].
#[derive(Debug, Error)]
pub enum RelicError {
    /// A required setting is absent or blank.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    /// Malformed caller input, raised before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Transport failure, non-2xx status, or malformed payload from the
    /// tracking API or the AI service.
    #[error("{operation} failed: {source}")]
    Upstream {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// A name-to-id resolution miss.
    #[error("{0} not found")]
    NotFound(String),
}

impl RelicError {
    /// Wrap an underlying cause with the name of the operation that failed.
    pub fn upstream(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        RelicError::Upstream {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelicError>;

/// Structured outcome handed to the CLI/UI layer: a status code and a
/// human-readable message instead of a propagated error.
#[derive(Debug, Serialize)]
pub struct ActionResult<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

/// Run an operation and fold its outcome into an [`ActionResult`].
///
/// Upstream failures map to 500, everything else the caller did wrong
/// (validation, missing config, resolution misses) maps to 400.
pub async fn handle_action<T, F>(operation: F) -> ActionResult<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match operation.await {
        Ok(data) => ActionResult {
            status: 200,
            message: "Operation successful".to_string(),
            data: Some(data),
        },
        Err(error) => {
            let status = match error {
                RelicError::Upstream { .. } => 500,
                _ => 400,
            };
            ActionResult {
                status,
                message: error.to_string(),
                data: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_action_success() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(handle_action(async { Ok(42) }));

        assert_eq!(result.status, 200);
        assert_eq!(result.message, "Operation successful");
        assert_eq!(result.data, Some(42));
    }

    #[test]
    fn test_handle_action_caller_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result: ActionResult<()> = runtime.block_on(handle_action(async {
            Err(RelicError::Validation("start and end dates are required".to_string()))
        }));

        assert_eq!(result.status, 400);
        assert!(result.message.contains("start and end dates are required"));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_handle_action_upstream_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result: ActionResult<()> = runtime.block_on(handle_action(async {
            Err(RelicError::upstream(
                "fetch projects",
                anyhow::anyhow!("HTTP 503"),
            ))
        }));

        assert_eq!(result.status, 500);
        assert!(result.message.contains("fetch projects"));
    }

    #[test]
    fn test_not_found_message() {
        let error = RelicError::NotFound("project with name Apollo".to_string());
        assert_eq!(error.to_string(), "project with name Apollo not found");
    }
}
