#![no_main]

use libfuzzer_sys::fuzz_target;
use tau_a2a::protocol::{Message, MessageRole, RequestContext};
use tau_a2a::InputRequiredProcessor;
use tau_ai::Event;

fuzz_target!(|data: &[u8]| {
    let Ok(events) = serde_json::from_slice::<Vec<Event>>(data) else {
        return;
    };
    let request = RequestContext {
        task_id: "fuzz-task".to_string(),
        context_id: "fuzz-context".to_string(),
        message: Message::new(MessageRole::User, Vec::new()),
        stored_task: None,
    };
    let mut processor = InputRequiredProcessor::new(&request);
    let mut recorded_parts = 0usize;
    for event in &events {
        if processor.process(event).is_err() {
            continue;
        }
        let parts = processor
            .snapshot()
            .and_then(|snapshot| snapshot.status.message.as_ref())
            .map(|message| message.parts.len())
            .unwrap_or_default();
        assert!(parts >= recorded_parts, "snapshot parts must only grow");
        recorded_parts = parts;
    }
    if let Some(snapshot) = processor.snapshot() {
        assert!(snapshot.is_final);
        assert!(!processor.pending_call_ids().is_empty());
    }
});
