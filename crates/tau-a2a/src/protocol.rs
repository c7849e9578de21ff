//! A2A task protocol model: messages, parts, task status and update events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Lifecycle state of an A2A task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    #[default]
    Unknown,
}

impl TaskState {
    /// Returns true when no further execution is expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Failed | Self::Rejected
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    User,
    Agent,
}

/// Marker stored under `adk_type` identifying what a data part encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPartKind {
    FunctionCall,
    FunctionResponse,
    CodeExecutionResult,
    ExecutableCode,
}

impl DataPartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FunctionCall => "function_call",
            Self::FunctionResponse => "function_response",
            Self::CodeExecutionResult => "code_execution_result",
            Self::ExecutableCode => "executable_code",
        }
    }
}

/// Part metadata. Known keys are typed; anything else is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartMetadata {
    #[serde(rename = "adk_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DataPartKind>,
    #[serde(
        rename = "adk_is_long_running",
        default,
        skip_serializing_if = "is_false"
    )]
    pub long_running: bool,
    #[serde(rename = "adk_thought", default, skip_serializing_if = "is_false")]
    pub thought: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PartMetadata {
    pub fn of_kind(kind: DataPartKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && !self.long_running && !self.thought && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "PartMetadata::is_empty")]
    pub metadata: PartMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
/// File payload carried either inline (base64) or by reference.
pub enum FileContent {
    #[serde(rename_all = "camelCase")]
    Bytes {
        bytes: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Uri {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePart {
    pub file: FileContent,
    #[serde(default, skip_serializing_if = "PartMetadata::is_empty")]
    pub metadata: PartMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "PartMetadata::is_empty")]
    pub metadata: PartMetadata,
}

impl DataPart {
    /// The `id` stored in the payload of a function call/response data part.
    pub fn call_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn is_kind(&self, kind: DataPartKind) -> bool {
        self.metadata.kind == Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Enumerates supported A2A `Part` values.
pub enum Part {
    Text(TextPart),
    File(FilePart),
    Data(DataPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart {
            text: text.into(),
            metadata: PartMetadata::default(),
        })
    }

    pub fn as_data(&self) -> Option<&DataPart> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Message {
    pub fn new(role: MessageRole, parts: Vec<Part>) -> Self {
        Self {
            message_id: next_id("msg"),
            role,
            parts,
            task_id: None,
            context_id: None,
            metadata: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Persisted unit of work tracked by the A2A protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Task {
    /// Creates a task in the submitted state.
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Submitted, None),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Folds an update event into the task the way a task store persists it.
    ///
    /// A replaced status message is moved into `history`. Artifact updates
    /// with `append` extend the artifact with the same id, otherwise replace it.
    pub fn apply(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::StatusUpdate(update) => {
                let previous = std::mem::replace(&mut self.status, update.status.clone());
                if let Some(message) = previous.message {
                    self.history.push(message);
                }
            }
            TaskEvent::ArtifactUpdate(update) => {
                let existing = self
                    .artifacts
                    .iter_mut()
                    .find(|artifact| artifact.artifact_id == update.artifact.artifact_id);
                match existing {
                    Some(artifact) if update.append => {
                        artifact.parts.extend(update.artifact.parts.iter().cloned());
                    }
                    Some(artifact) => *artifact = update.artifact.clone(),
                    None => self.artifacts.push(update.artifact.clone()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub last_chunk: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
/// Update emitted while a task executes.
pub enum TaskEvent {
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl TaskEvent {
    pub fn as_status_update(&self) -> Option<&TaskStatusUpdateEvent> {
        match self {
            Self::StatusUpdate(update) => Some(update),
            Self::ArtifactUpdate(_) => None,
        }
    }

    pub fn as_artifact_update(&self) -> Option<&TaskArtifactUpdateEvent> {
        match self {
            Self::ArtifactUpdate(update) => Some(update),
            Self::StatusUpdate(_) => None,
        }
    }
}

/// Incoming request addressed to a task, with the stored task when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
    pub stored_task: Option<Task>,
}

impl RequestContext {
    /// Builds a status update for this request's task. The message, when
    /// present, is bound to the task and context ids.
    pub fn status_update(
        &self,
        state: TaskState,
        message: Option<Message>,
    ) -> TaskStatusUpdateEvent {
        let message = message.map(|mut message| {
            message.task_id = Some(self.task_id.clone());
            message.context_id = Some(self.context_id.clone());
            message
        });
        TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status: TaskStatus::new(state, message),
            is_final: state.is_terminal() || state == TaskState::InputRequired,
            metadata: Map::new(),
        }
    }

    pub fn artifact_update(
        &self,
        artifact_id: impl Into<String>,
        parts: Vec<Part>,
        append: bool,
        last_chunk: bool,
    ) -> TaskArtifactUpdateEvent {
        TaskArtifactUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            artifact: Artifact {
                artifact_id: artifact_id.into(),
                parts,
                metadata: Map::new(),
            },
            append,
            last_chunk,
            metadata: Map::new(),
        }
    }
}

pub(crate) fn next_id(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let value = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{now_ns}-{value}")
}
