#![no_main]

use libfuzzer_sys::fuzz_target;
use tau_a2a::protocol::{Message, Task, TaskState, TaskStatus};
use tau_a2a::{to_runtime_parts, validate_input_required_resumption, InputRequiredError};
use tau_ai::Content;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = serde_json::from_slice::<Message>(data) else {
        return;
    };
    let parsed = to_runtime_parts(&message.parts);

    let mut task = Task::new("fuzz-task", "fuzz-context");
    task.status = TaskStatus::new(TaskState::InputRequired, Some(message));
    let empty_input = Content::user_text("");

    match (parsed, validate_input_required_resumption(Some(&task), &empty_input)) {
        (Err(_), Err(error)) => {
            assert!(matches!(error, InputRequiredError::StatusMessageParse(_)));
        }
        (Ok(parts), Ok(())) => {
            assert!(parts.iter().all(|part| part.as_function_call().is_none()));
        }
        (Ok(parts), Err(InputRequiredError::MissingFunctionResponse { call_id })) => {
            assert!(parts
                .iter()
                .filter_map(|part| part.as_function_call())
                .any(|call| call.id == call_id));
        }
        (parsed, result) => panic!("inconsistent outcome: {parsed:?} vs {result:?}"),
    }
});
