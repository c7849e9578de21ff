use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde_json::{json, Map, Value};
use tau_a2a::protocol::{
    Message, MessageRole, Part as A2aPart, RequestContext, Task, TaskEvent, TaskState,
};
use tau_a2a::{
    to_a2a_parts, EventSource, EventStream, ExecutionOutcome, Executor, ExecutorConfig,
    ExecutorError, InputRequiredError, InputRequiredProcessor, RunRequest,
};
use tau_ai::{Content, Event, Part};
use tokio::sync::Mutex as AsyncMutex;

struct ScriptedRunner {
    runs: AsyncMutex<VecDeque<Vec<Event>>>,
    requests: AsyncMutex<Vec<RunRequest>>,
}

impl ScriptedRunner {
    fn new(runs: Vec<Vec<Event>>) -> Self {
        Self {
            runs: AsyncMutex::new(VecDeque::from(runs)),
            requests: AsyncMutex::new(Vec::new()),
        }
    }

    async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl EventSource for ScriptedRunner {
    async fn run(&self, request: RunRequest) -> anyhow::Result<EventStream> {
        self.requests.lock().await.push(request);
        let events = self
            .runs
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted run queue exhausted"))?;
        Ok(stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn long_running_call_event(call_id: &str) -> Event {
    Event::new("inv-1", "billing_agent")
        .with_content(Content::model(vec![
            Part::text("I need a manager to approve this refund."),
            Part::function_call(call_id, "request_approval", object(json!({ "amount": 120 }))),
        ]))
        .with_long_running_tool_ids([call_id])
}

fn call_response_event(call_id: &str) -> Event {
    Event::new("inv-1", "billing_agent").with_content(Content::model(vec![
        Part::function_response(
            call_id,
            "request_approval",
            object(json!({ "status": "pending", "ticket": "T-42" })),
        ),
    ]))
}

fn request(task_id: &str, parts: Vec<A2aPart>, stored_task: Option<Task>) -> RequestContext {
    RequestContext {
        task_id: task_id.to_string(),
        context_id: format!("ctx-{task_id}"),
        message: Message::new(MessageRole::User, parts),
        stored_task,
    }
}

fn persist(task_id: &str, events: &[TaskEvent]) -> Task {
    let mut task = Task::new(task_id, format!("ctx-{task_id}"));
    for event in events {
        task.apply(event);
    }
    let stored = serde_json::to_string(&task).expect("task should serialize");
    serde_json::from_str(&stored).expect("task should deserialize")
}

#[test]
fn integration_call_and_response_share_one_snapshot() {
    let request = request("task-1", vec![A2aPart::text("refund order 7")], None);
    let mut processor = InputRequiredProcessor::new(&request);

    processor
        .process(&long_running_call_event("call-1"))
        .expect("first event should process");
    let first = processor.snapshot().cloned().expect("snapshot after event 1");
    assert!(first.is_final);
    assert_eq!(first.status.state, TaskState::InputRequired);
    assert_eq!(
        first.status.message.as_ref().map(|message| message.parts.len()),
        Some(1)
    );

    processor
        .process(&call_response_event("call-1"))
        .expect("second event should process");
    let second = processor.snapshot().expect("snapshot after event 2");
    let message = second.status.message.as_ref().expect("status message");
    assert_eq!(message.parts.len(), 2);
    assert_eq!(
        message.message_id,
        first
            .status
            .message
            .as_ref()
            .map(|message| message.message_id.clone())
            .unwrap_or_default()
    );
    assert_eq!(processor.pending_call_ids(), vec!["call-1"]);
}

#[tokio::test]
async fn integration_suspended_task_resumes_only_with_matching_response() {
    let runner = Arc::new(ScriptedRunner::new(vec![
        vec![long_running_call_event("call-1")],
        vec![Event::new("inv-2", "billing_agent")
            .with_content(Content::model(vec![Part::text("Refund approved and issued.")]))],
    ]));
    let executor =
        Executor::new(ExecutorConfig::default(), Arc::clone(&runner)).expect("executor");

    let mut first_run = Vec::new();
    let outcome = executor
        .execute(
            &request("task-1", vec![A2aPart::text("refund order 7")], None),
            &mut first_run,
        )
        .await
        .expect("first run");
    assert_eq!(outcome, ExecutionOutcome::InputRequired);
    let suspended = persist("task-1", &first_run);
    assert_eq!(suspended.status.state, TaskState::InputRequired);

    let mut rejected_run = Vec::new();
    let error = executor
        .execute(
            &request(
                "task-1",
                vec![A2aPart::text("any update?")],
                Some(suspended.clone()),
            ),
            &mut rejected_run,
        )
        .await
        .expect_err("resumption without a response must be rejected");
    assert!(matches!(
        error,
        ExecutorError::InputRequired(InputRequiredError::MissingFunctionResponse { ref call_id })
            if call_id == "call-1"
    ));
    assert!(rejected_run.is_empty());
    assert_eq!(runner.request_count().await, 1);

    let mut parts = vec![A2aPart::text("manager approved")];
    parts.extend(
        to_a2a_parts(
            &[Part::function_response(
                "call-1",
                "request_approval",
                object(json!({ "status": "approved" })),
            )],
            &[],
        )
        .expect("response parts"),
    );
    let mut resumed_run = Vec::new();
    let outcome = executor
        .execute(
            &request("task-1", parts, Some(suspended.clone())),
            &mut resumed_run,
        )
        .await
        .expect("resumed run");
    assert_eq!(outcome, ExecutionOutcome::Completed);

    let mut task = suspended;
    for event in &resumed_run {
        task.apply(event);
    }
    assert_eq!(task.status.state, TaskState::Completed);
    assert_eq!(task.history.len(), 1);
    assert_eq!(runner.request_count().await, 2);
}

#[tokio::test]
async fn integration_parallel_runs_keep_independent_snapshots() {
    let mut handles = Vec::new();
    for (task_id, call_id) in [("task-a", "call-a"), ("task-b", "call-b")] {
        handles.push(tokio::spawn(async move {
            let runner = ScriptedRunner::new(vec![vec![
                long_running_call_event(call_id),
                call_response_event(call_id),
            ]]);
            let executor = Executor::new(ExecutorConfig::default(), runner).expect("executor");
            let mut sink = Vec::new();
            let outcome = executor
                .execute(
                    &request(task_id, vec![A2aPart::text("refund")], None),
                    &mut sink,
                )
                .await
                .expect("run");
            (task_id, call_id, outcome, persist(task_id, &sink))
        }));
    }

    for handle in handles {
        let (task_id, call_id, outcome, task) = handle.await.expect("join");
        assert_eq!(outcome, ExecutionOutcome::InputRequired);
        assert_eq!(task.id, task_id);
        let message = task.status.message.expect("status message");
        assert_eq!(message.task_id.as_deref(), Some(task_id));
        let ids = message
            .parts
            .iter()
            .filter_map(A2aPart::as_data)
            .filter_map(|data| data.call_id())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![call_id, call_id]);
    }
}

#[tokio::test]
async fn integration_recorded_fixture_replays_to_input_required_and_resumes() {
    let events: Vec<Event> = serde_json::from_str(include_str!(
        "../../../scripts/dev/fixtures/a2a-replay/long-running-events.json"
    ))
    .expect("fixture events should parse");
    let resume: Message = serde_json::from_str(include_str!(
        "../../../scripts/dev/fixtures/a2a-replay/resume-message.json"
    ))
    .expect("fixture message should parse");

    let runner = ScriptedRunner::new(vec![
        events,
        vec![Event::new("inv-2", "billing_agent")
            .with_content(Content::model(vec![Part::text("Refund issued.")]))],
    ]);
    let executor = Executor::new(ExecutorConfig::default(), runner).expect("executor");

    let mut first_run = Vec::new();
    let outcome = executor
        .execute(
            &request("task-7", vec![A2aPart::text("refund order 7")], None),
            &mut first_run,
        )
        .await
        .expect("replay");
    assert_eq!(outcome, ExecutionOutcome::InputRequired);
    let suspended = persist("task-7", &first_run);
    let message = suspended.status.message.as_ref().expect("status message");
    assert_eq!(message.parts.len(), 2);

    let resume_request = RequestContext {
        task_id: "task-7".to_string(),
        context_id: "ctx-task-7".to_string(),
        message: resume,
        stored_task: Some(suspended),
    };
    let mut resumed_run = Vec::new();
    let outcome = executor
        .execute(&resume_request, &mut resumed_run)
        .await
        .expect("resume");
    assert_eq!(outcome, ExecutionOutcome::Completed);
}
