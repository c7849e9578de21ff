//! A2A task bridge for Tau agent runs.
//!
//! Translates runtime events into A2A task updates, records long-running
//! function calls in a single final `input-required` status, and checks that a
//! request resuming such a task answers every pending call.
//!
//! # Examples
//!
//! ```
//! use tau_a2a::{validate_input_required_resumption, InputRequiredProcessor};
//! use tau_a2a::protocol::{Message, MessageRole, RequestContext, Task, TaskEvent};
//! use tau_ai::{Content, Event, Part};
//!
//! let request = RequestContext {
//!     task_id: "task-1".to_string(),
//!     context_id: "ctx-1".to_string(),
//!     message: Message::new(MessageRole::User, Vec::new()),
//!     stored_task: None,
//! };
//! let mut processor = InputRequiredProcessor::new(&request);
//! let event = Event::new("inv-1", "agent")
//!     .with_content(Content::model(vec![Part::function_call(
//!         "call-1",
//!         "request_approval",
//!         Default::default(),
//!     )]))
//!     .with_long_running_tool_ids(["call-1"]);
//! processor.process(&event).unwrap();
//!
//! let mut task = Task::new("task-1", "ctx-1");
//! task.apply(&TaskEvent::StatusUpdate(processor.into_snapshot().unwrap()));
//!
//! let missing = validate_input_required_resumption(Some(&task), &Content::user_text("ok"));
//! assert!(missing.is_err());
//! ```

mod config;
mod executor;
mod input_required;
mod parts;
pub mod protocol;

pub use config::{ExecutorConfig, ExecutorConfigError};
pub use executor::{
    EventSource, EventStream, ExecutionOutcome, Executor, ExecutorError, RunRequest,
    TaskEventSink,
};
pub use input_required::{
    validate_input_required_resumption, InputRequiredError, InputRequiredProcessor,
};
pub use parts::{to_a2a_parts, to_runtime_parts, PartConversionError};
