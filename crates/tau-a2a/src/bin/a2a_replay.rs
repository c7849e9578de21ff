use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::{fs, sync::Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use futures_util::{stream, StreamExt};
use tau_a2a::protocol::{Message, MessageRole, Part, RequestContext, Task, TaskEvent};
use tau_a2a::{
    EventSource, EventStream, Executor, ExecutorConfig, ExecutorError, RunRequest, TaskEventSink,
};
use tau_ai::Event;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Replays a recorded runtime event log through the A2A executor and prints
/// the resulting task updates as NDJSON.
#[derive(Debug, Parser)]
#[command(name = "tau-a2a-replay")]
struct Cli {
    #[arg(long, help = "JSON array of runtime events to replay")]
    events: PathBuf,

    #[arg(long = "task-id", default_value = "replay-task")]
    task_id: String,

    #[arg(long = "context-id", default_value = "replay-context")]
    context_id: String,

    #[arg(
        long = "message-json",
        help = "JSON A2A message for the request; defaults to an empty user message"
    )]
    message_json: Option<PathBuf>,

    #[arg(
        long = "stored-task",
        help = "JSON task the request resumes; omitted for a new task"
    )]
    stored_task: Option<PathBuf>,

    #[arg(long, env = "TAU_A2A_CONFIG", help = "JSON executor config")]
    config: Option<PathBuf>,
}

struct ReplaySource {
    events: Mutex<Option<Vec<Event>>>,
}

#[async_trait]
impl EventSource for ReplaySource {
    async fn run(&self, request: RunRequest) -> Result<EventStream> {
        tracing::debug!(
            app_name = %request.app_name,
            session_id = %request.session_id,
            "replaying recorded run"
        );
        let events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("replay event log lock poisoned"))?
            .take()
            .context("recorded run already replayed")?;
        Ok(stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

/// Writes each task event as one JSON line.
struct NdjsonSink<W> {
    writer: W,
}

#[async_trait]
impl<W: Write + Send> TaskEventSink for NdjsonSink<W> {
    async fn write(&mut self, event: TaskEvent) -> Result<(), ExecutorError> {
        let line =
            serde_json::to_string(&event).map_err(|error| ExecutorError::SinkWrite(error.into()))?;
        writeln!(self.writer, "{line}").map_err(|error| ExecutorError::SinkWrite(error.into()))?;
        self.writer
            .flush()
            .map_err(|error| ExecutorError::SinkWrite(error.into()))
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {label} '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {label} '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            ExecutorConfig::from_json_str(&raw)?
        }
        None => ExecutorConfig::default(),
    };
    let events: Vec<Event> = read_json(&cli.events, "event log")?;
    let message = match &cli.message_json {
        Some(path) => read_json::<Message>(path, "request message")?,
        None => Message::new(MessageRole::User, vec![Part::text("")]),
    };
    let stored_task = cli
        .stored_task
        .as_ref()
        .map(|path| read_json::<Task>(path, "stored task"))
        .transpose()?;

    let request = RequestContext {
        task_id: cli.task_id,
        context_id: cli.context_id,
        message,
        stored_task,
    };
    let source = ReplaySource {
        events: Mutex::new(Some(events)),
    };
    let executor = Executor::new(config, source)?;
    tracing::debug!(
        app_name = %executor.config().app_name,
        task_id = %request.task_id,
        "replaying run"
    );
    let mut sink = NdjsonSink {
        writer: io::stdout(),
    };
    let outcome = executor.execute(&request, &mut sink).await?;
    tracing::info!(outcome = ?outcome, "replay finished");
    Ok(())
}
