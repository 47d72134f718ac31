use crate::tools::ToolError;

/// Failures raised across the orchestration engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine was invoked again without being re-armed after its
    /// termination condition fired. Always a caller bug.
    #[error("termination condition has already been reached")]
    AlreadyTerminated,

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("invalid engine state: {0}")]
    InvalidState(String),

    #[error("exchange cancelled")]
    Cancelled,

    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Contract violations are fatal to the exchange in which they occur.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::AlreadyTerminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            EngineError::AlreadyTerminated.to_string(),
            "termination condition has already been reached"
        );
        let err = EngineError::from(ToolError::InvalidArguments("missing id".into()));
        assert_eq!(err.to_string(), "tool error: invalid arguments: missing id");
    }

    #[test]
    fn contract_violation_classification() {
        assert!(EngineError::AlreadyTerminated.is_contract_violation());
        assert!(!EngineError::Cancelled.is_contract_violation());
    }
}
