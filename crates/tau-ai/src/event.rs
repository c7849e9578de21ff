use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{Content, Part};

/// One increment of model or tool activity emitted by an agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub invocation_id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Function call ids the runtime flagged as not resolvable within this turn.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub long_running_tool_ids: BTreeSet<String>,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub turn_complete: bool,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: next_event_id(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            timestamp: Utc::now(),
            content: None,
            long_running_tool_ids: BTreeSet::new(),
            partial: false,
            turn_complete: false,
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_long_running_tool_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.long_running_tool_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Parts of the event content; empty when the event carries no content.
    pub fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    pub fn is_long_running(&self, call_id: &str) -> bool {
        self.long_running_tool_ids.contains(call_id)
    }
}

fn next_event_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let value = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("evt-{now_ns}-{value}")
}
