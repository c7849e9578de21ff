//! Long-running call tracking and `input-required` resumption checks.
//!
//! A run that hits a long-running function call ends its turn with a single
//! final `input-required` status update. The update's message lists every
//! long-running call (and any response to one already seen) so a later
//! request can be checked for a response to each pending call.

use serde_json::Map;
use tau_ai::{Content, Event, Part, Role};
use thiserror::Error;

use crate::parts::{to_a2a_parts, to_runtime_parts, PartConversionError};
use crate::protocol::{
    DataPartKind, Message, MessageRole, RequestContext, Task, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};

/// Errors raised while building or checking the `input-required` state.
#[derive(Debug, Error)]
pub enum InputRequiredError {
    #[error("failed to convert input required parts to A2A parts: {0}")]
    SnapshotConversion(#[source] PartConversionError),
    #[error("failed to parse task status message: {0}")]
    StatusMessageParse(#[source] PartConversionError),
    #[error("no input provided for function call ID {call_id:?}")]
    MissingFunctionResponse { call_id: String },
}

/// Accumulates the `input-required` status update for one run.
///
/// One processor per run, fed every event of that run in order.
#[derive(Debug, Clone)]
pub struct InputRequiredProcessor {
    task_id: String,
    context_id: String,
    snapshot: Option<TaskStatusUpdateEvent>,
}

impl InputRequiredProcessor {
    pub fn new(request: &RequestContext) -> Self {
        Self {
            task_id: request.task_id.clone(),
            context_id: request.context_id.clone(),
            snapshot: None,
        }
    }

    /// Records the long-running calls of `event` and responses to calls
    /// already recorded.
    ///
    /// A response counts when its call is in the snapshot or appeared earlier
    /// in the same event; a response placed before its call is ignored.
    pub fn process(&mut self, event: &Event) -> Result<(), InputRequiredError> {
        let mut pending_parts = Vec::new();
        let mut long_running_ids = Vec::new();
        for part in event.parts() {
            match part {
                Part::FunctionCall(call) if event.is_long_running(&call.id) => {
                    pending_parts.push(part.clone());
                    long_running_ids.push(call.id.clone());
                }
                Part::FunctionResponse(response)
                    if self.is_response_to_long_running(&response.id)
                        || long_running_ids.contains(&response.id) =>
                {
                    pending_parts.push(part.clone());
                }
                _ => {}
            }
        }

        if pending_parts.is_empty() {
            return Ok(());
        }

        let a2a_parts = to_a2a_parts(&pending_parts, &long_running_ids)
            .map_err(InputRequiredError::SnapshotConversion)?;

        if let Some(snapshot) = self.snapshot.as_mut() {
            tracing::debug!(
                task_id = %self.task_id,
                event_id = %event.id,
                appended_parts = a2a_parts.len(),
                "extending input-required status"
            );
            snapshot
                .status
                .message
                .get_or_insert_with(|| Message::new(MessageRole::Agent, Vec::new()))
                .parts
                .extend(a2a_parts);
            return Ok(());
        }

        tracing::debug!(
            task_id = %self.task_id,
            event_id = %event.id,
            pending_calls = ?long_running_ids,
            "run suspended on long-running function call"
        );
        let mut message = Message::new(MessageRole::Agent, a2a_parts);
        message.task_id = Some(self.task_id.clone());
        message.context_id = Some(self.context_id.clone());
        self.snapshot = Some(TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status: TaskStatus::new(TaskState::InputRequired, Some(message)),
            is_final: true,
            metadata: Map::new(),
        });
        Ok(())
    }

    fn is_response_to_long_running(&self, call_id: &str) -> bool {
        let Some(message) = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.status.message.as_ref())
        else {
            return false;
        };
        message
            .parts
            .iter()
            .filter_map(|part| part.as_data())
            .any(|data| data.is_kind(DataPartKind::FunctionCall) && data.call_id() == Some(call_id))
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&TaskStatusUpdateEvent> {
        self.snapshot.as_ref()
    }

    pub fn into_snapshot(self) -> Option<TaskStatusUpdateEvent> {
        self.snapshot
    }

    /// Ids of the function calls recorded in the snapshot, in recorded order.
    pub fn pending_call_ids(&self) -> Vec<&str> {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.status.message.as_ref())
            .map(|message| {
                message
                    .parts
                    .iter()
                    .filter_map(|part| part.as_data())
                    .filter(|data| data.is_kind(DataPartKind::FunctionCall))
                    .filter_map(|data| data.call_id())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Checks that `content` answers every function call recorded in the stored
/// task's `input-required` status message.
///
/// Passes trivially when there is no stored task, when it is in another state,
/// or when it has no status message. Calls are checked in stored order and the
/// first one without a response is reported.
pub fn validate_input_required_resumption(
    stored_task: Option<&Task>,
    content: &Content,
) -> Result<(), InputRequiredError> {
    let Some(task) = stored_task else {
        return Ok(());
    };
    if task.status.state != TaskState::InputRequired {
        return Ok(());
    }
    let Some(status_message) = task.status.message.as_ref() else {
        return Ok(());
    };

    let stored = Content::new(
        Role::Model,
        to_runtime_parts(&status_message.parts).map_err(InputRequiredError::StatusMessageParse)?,
    );

    for call in stored.function_calls() {
        if !content.has_function_response(&call.id) {
            return Err(InputRequiredError::MissingFunctionResponse {
                call_id: call.id.clone(),
            });
        }
    }
    Ok(())
}
