//! Runs the intake engine over a line-delimited JSON command feed read from
//! stdin and prints every public event as one JSON line on stdout.
//!
//! Environment:
//! - `INTAKE_CONFIG`: engine config (default `intake.toml`)
//! - `INTAKE_REFERENCE`: reference data (default `reference.toml`)
//! - `INTAKE_DOCUMENTS`: root that material file handles resolve under
//!   (default `documents`)
//! - `MAILGUN_*`: used when `features.notifications` is on

use engine::config::load_config;
use engine::feed::{dispatch, FeedCommand};
use engine::local::{LocalCaseManagement, LocalDocumentStore, LogNotifier};
use engine::mailgun::MailgunNotifier;
use engine::telemetry::init_logging;
use engine::{BroadcastSink, Collaborators, IntakeEngine, Notifier, StaticReferenceData, TokioScheduler};
use shared_types::{AppError, Visibility};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let config = load_config();

    let reference = StaticReferenceData::load(env_or("INTAKE_REFERENCE", "reference.toml"))?;
    let notifier: Arc<dyn Notifier> = if config.features.notifications {
        Arc::new(MailgunNotifier::new(config.notifications.subject_prefix.clone()))
    } else {
        Arc::new(LogNotifier)
    };
    let (scheduler, fired) = TokioScheduler::new();
    let collaborators = Collaborators {
        reference: Arc::new(reference),
        documents: Arc::new(LocalDocumentStore::new(env_or("INTAKE_DOCUMENTS", "documents"))),
        cms: Arc::new(LocalCaseManagement::new()),
        notifier,
        scheduler: Arc::new(scheduler),
    };

    let sink = BroadcastSink::new(1024);
    let mut events = sink.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.visibility == Visibility::Public => {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::error!(error = %e, event = %event.name, "Event not printable"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let engine = IntakeEngine::new(config, collaborators, Arc::new(sink));
    let timers = engine.spawn_timer_pump(fired);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AppError::internal(format!("Cannot read feed: {}", e)))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let command = match FeedCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(error = %e, "Feed line skipped");
                continue;
            }
        };
        let name = command.name();
        match dispatch(&engine, command).await {
            Ok(result) => tracing::debug!(command = name, result = %result, "Command applied"),
            Err(e) => tracing::warn!(command = name, error = %e, "Command failed"),
        }
        processed += 1;
    }

    tracing::info!(processed, "Feed drained, waiting on material timers until interrupted");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for interrupt");
    }
    timers.abort();
    drop(engine);
    printer.abort();
    Ok(())
}
