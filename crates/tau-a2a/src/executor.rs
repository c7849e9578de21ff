//! Drives one agent run for an A2A request and writes the resulting task updates.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{Map, Value};
use tau_ai::{Content, Event, Role};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{ExecutorConfig, ExecutorConfigError};
use crate::input_required::{
    validate_input_required_resumption, InputRequiredError, InputRequiredProcessor,
};
use crate::parts::{to_a2a_parts, to_runtime_parts, PartConversionError};
use crate::protocol::{
    next_id, Message, MessageRole, Part, RequestContext, TaskEvent, TaskState,
};

/// Ordered runtime events of a single agent run.
pub type EventStream = BoxStream<'static, anyhow::Result<Event>>;

/// Errors returned by [`Executor::execute`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ExecutorConfigError),
    #[error("failed to convert request message: {0}")]
    InvalidRequestMessage(#[source] PartConversionError),
    #[error(transparent)]
    InputRequired(#[from] InputRequiredError),
    #[error("failed to convert event parts: {0}")]
    EventConversion(#[source] PartConversionError),
    #[error("task event sink closed")]
    SinkClosed,
    #[error("failed to write task event: {0}")]
    SinkWrite(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Parameters for starting an agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub content: Content,
}

/// Starts agent runs and exposes their event streams.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn run(&self, request: RunRequest) -> anyhow::Result<EventStream>;
}

#[async_trait]
impl<T> EventSource for Arc<T>
where
    T: EventSource + ?Sized,
{
    async fn run(&self, request: RunRequest) -> anyhow::Result<EventStream> {
        (**self).run(request).await
    }
}

/// Destination for task updates produced while executing a request.
#[async_trait]
pub trait TaskEventSink: Send {
    async fn write(&mut self, event: TaskEvent) -> Result<(), ExecutorError>;
}

#[async_trait]
impl TaskEventSink for Vec<TaskEvent> {
    async fn write(&mut self, event: TaskEvent) -> Result<(), ExecutorError> {
        self.push(event);
        Ok(())
    }
}

#[async_trait]
impl TaskEventSink for mpsc::UnboundedSender<TaskEvent> {
    async fn write(&mut self, event: TaskEvent) -> Result<(), ExecutorError> {
        self.send(event).map_err(|_| ExecutorError::SinkClosed)
    }
}

/// How a run ended from the task's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    InputRequired,
    Failed,
}

/// Executes A2A requests against an [`EventSource`].
pub struct Executor<S> {
    config: ExecutorConfig,
    source: S,
}

impl<S: EventSource> Executor<S> {
    pub fn new(config: ExecutorConfig, source: S) -> Result<Self, ExecutorError> {
        config.validate()?;
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs the agent for `request` and writes status and artifact updates.
    ///
    /// A request resuming an `input-required` task must answer every pending
    /// call; otherwise the error is returned before anything is written.
    /// Runner failures end the task with a final `failed` status unless the
    /// run has already suspended, in which case the `input-required` status
    /// is written instead. A suspended run is not read past its turn-complete
    /// event.
    #[tracing::instrument(
        name = "tau_a2a.executor.execute",
        skip(self, request, sink),
        fields(
            task_id = %request.task_id,
            context_id = %request.context_id,
            resumed = request.stored_task.is_some()
        )
    )]
    pub async fn execute<K>(
        &self,
        request: &RequestContext,
        sink: &mut K,
    ) -> Result<ExecutionOutcome, ExecutorError>
    where
        K: TaskEventSink + ?Sized,
    {
        let parts = to_runtime_parts(&request.message.parts)
            .map_err(ExecutorError::InvalidRequestMessage)?;
        let content = Content::new(Role::User, parts);
        validate_input_required_resumption(request.stored_task.as_ref(), &content)?;

        let metadata = self.run_metadata(request);
        if request.stored_task.is_none() {
            self.write_status(request, sink, &metadata, TaskState::Submitted, None)
                .await?;
        }
        self.write_status(request, sink, &metadata, TaskState::Working, None)
            .await?;

        let run_request = RunRequest {
            app_name: self.config.app_name.clone(),
            user_id: self.config.resolve_user_id(&request.context_id),
            session_id: request.context_id.clone(),
            content,
        };
        let mut events = match self.source.run(run_request).await {
            Ok(events) => events,
            Err(error) => {
                return self
                    .fail(
                        request,
                        sink,
                        &metadata,
                        format!("failed to start agent run: {error:#}"),
                    )
                    .await;
            }
        };

        let mut processor = InputRequiredProcessor::new(request);
        let artifact_id = next_id("artifact");
        let mut artifact_started = false;
        let mut processed = 0usize;
        let mut stopped = None;
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(error) => {
                    stopped = Some(format!("agent run failed: {error:#}"));
                    break;
                }
            };
            processed += 1;
            if let Some(limit) = self.config.max_events_per_run {
                if processed > limit {
                    stopped = Some(format!("agent run exceeded max_events_per_run ({limit})"));
                    break;
                }
            }

            // Partial chunks are repeated in full by a later event.
            if !event.partial {
                if let Err(error) = processor.process(&event) {
                    if processor.has_snapshot() {
                        stopped = Some(error.to_string());
                        break;
                    }
                    self.fail(request, sink, &metadata, error.to_string())
                        .await?;
                    return Err(error.into());
                }
            }

            let emit = !event.parts().is_empty()
                && (!event.partial || self.config.emit_partial_artifacts);
            if emit {
                let long_running_ids = event
                    .long_running_tool_ids
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>();
                let parts = match to_a2a_parts(event.parts(), &long_running_ids) {
                    Ok(parts) => parts,
                    Err(error) if processor.has_snapshot() => {
                        stopped = Some(error.to_string());
                        break;
                    }
                    Err(error) => {
                        self.fail(request, sink, &metadata, error.to_string())
                            .await?;
                        return Err(ExecutorError::EventConversion(error));
                    }
                };
                let mut update =
                    request.artifact_update(artifact_id.clone(), parts, artifact_started, false);
                update.metadata = metadata.clone();
                sink.write(TaskEvent::ArtifactUpdate(update)).await?;
                artifact_started = true;
            }

            if event.turn_complete && processor.has_snapshot() {
                tracing::debug!(
                    task_id = %request.task_id,
                    event_id = %event.id,
                    "suspended turn complete; not advancing the run"
                );
                break;
            }
        }

        if let Some(reason) = stopped {
            if !processor.has_snapshot() {
                return self.fail(request, sink, &metadata, reason).await;
            }
            tracing::warn!(
                task_id = %request.task_id,
                reason = %reason,
                "agent run stopped after suspension; keeping input-required status"
            );
        }

        if let Some(mut snapshot) = processor.into_snapshot() {
            tracing::debug!(
                task_id = %request.task_id,
                processed_events = processed,
                "agent run ended waiting for input"
            );
            snapshot.metadata = metadata;
            sink.write(TaskEvent::StatusUpdate(snapshot)).await?;
            return Ok(ExecutionOutcome::InputRequired);
        }

        if artifact_started {
            let mut update = request.artifact_update(artifact_id, Vec::new(), true, true);
            update.metadata = metadata.clone();
            sink.write(TaskEvent::ArtifactUpdate(update)).await?;
        }
        tracing::debug!(
            task_id = %request.task_id,
            processed_events = processed,
            "agent run completed"
        );
        self.write_status(request, sink, &metadata, TaskState::Completed, None)
            .await?;
        Ok(ExecutionOutcome::Completed)
    }

    fn run_metadata(&self, request: &RequestContext) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert(
            "adk_app_name".to_string(),
            Value::String(self.config.app_name.clone()),
        );
        metadata.insert(
            "adk_user_id".to_string(),
            Value::String(self.config.resolve_user_id(&request.context_id)),
        );
        metadata.insert(
            "adk_session_id".to_string(),
            Value::String(request.context_id.clone()),
        );
        metadata
    }

    async fn write_status<K>(
        &self,
        request: &RequestContext,
        sink: &mut K,
        metadata: &Map<String, Value>,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<(), ExecutorError>
    where
        K: TaskEventSink + ?Sized,
    {
        let mut update = request.status_update(state, message);
        update.metadata = metadata.clone();
        sink.write(TaskEvent::StatusUpdate(update)).await
    }

    async fn fail<K>(
        &self,
        request: &RequestContext,
        sink: &mut K,
        metadata: &Map<String, Value>,
        reason: String,
    ) -> Result<ExecutionOutcome, ExecutorError>
    where
        K: TaskEventSink + ?Sized,
    {
        tracing::warn!(task_id = %request.task_id, reason = %reason, "agent run failed");
        let message = Message::new(MessageRole::Agent, vec![Part::text(reason)]);
        self.write_status(request, sink, metadata, TaskState::Failed, Some(message))
            .await?;
        Ok(ExecutionOutcome::Failed)
    }
}
