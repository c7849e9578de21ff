//! Runtime content and event model emitted by Tau agent runs.
//!
//! Parts are a closed sum type over text, inline/file data, function calls and
//! function responses; events carry the ids of calls the runtime flagged as
//! long-running for that increment.
mod event;
mod types;

pub use event::Event;
pub use types::{Blob, Content, FileData, FunctionCall, FunctionResponse, Part, Role};
