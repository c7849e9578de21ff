use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned for invalid executor configuration.
#[derive(Debug, Error)]
pub enum ExecutorConfigError {
    #[error("app_name must not be empty")]
    EmptyAppName,
    #[error("user_id must not be blank when set")]
    BlankUserId,
    #[error("max_events_per_run must be greater than 0")]
    ZeroEventLimit,
    #[error("failed to parse executor config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime configuration for the A2A executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub app_name: String,
    /// Fixed user id for agent runs; derived from the context id when unset.
    pub user_id: Option<String>,
    /// Forward partial (streaming) events as artifact updates.
    pub emit_partial_artifacts: bool,
    pub max_events_per_run: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            app_name: "tau-agent".to_string(),
            user_id: None,
            emit_partial_artifacts: false,
            max_events_per_run: None,
        }
    }
}

impl ExecutorConfig {
    /// Parses and validates a JSON config document. Missing keys use defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ExecutorConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExecutorConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ExecutorConfigError::EmptyAppName);
        }
        if self
            .user_id
            .as_deref()
            .is_some_and(|user_id| user_id.trim().is_empty())
        {
            return Err(ExecutorConfigError::BlankUserId);
        }
        if self.max_events_per_run == Some(0) {
            return Err(ExecutorConfigError::ZeroEventLimit);
        }
        Ok(())
    }

    /// User id for the run in `context_id`.
    pub fn resolve_user_id(&self, context_id: &str) -> String {
        match &self.user_id {
            Some(user_id) => user_id.clone(),
            None => format!("A2A_USER_{context_id}"),
        }
    }
}
