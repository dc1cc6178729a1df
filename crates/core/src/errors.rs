use thiserror::Error;

/// Failures raised by the data-access collaborators behind capability modules.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("upstream service failure: {0}")]
    Upstream(String),
    #[error("upstream service timeout after {0}s")]
    UpstreamTimeout(u64),
}

/// Failures a capability module may return to the dispatcher.
///
/// These are values, never panics: the dispatcher converts them into the
/// uniform result envelope so nothing above it sees a raised error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::{StoreError, ToolError};

    #[test]
    fn store_errors_flow_into_tool_errors() {
        let error = ToolError::from(StoreError::NotFound("deal D-404".to_string()));
        assert_eq!(error.to_string(), "record not found: deal D-404");
    }

    #[test]
    fn upstream_timeout_message_mentions_timeout() {
        let error = ToolError::from(StoreError::UpstreamTimeout(30));
        assert!(error.to_string().contains("timeout"));
    }
}
