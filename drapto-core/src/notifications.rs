// ============================================================================
// drapto-core/src/notifications.rs
// ============================================================================
//
// NOTIFIER (§4.16, ambient)
//
// Optional push notifications on terminal job state, via ntfy.sh. Grounded
// almost verbatim in the teacher's own `notifications.rs` (`Notifier` trait,
// `NtfyNotifier::send`'s URL parsing/dispatcher/payload construction),
// narrowed to the spec's fixed event set and the rule that a notifier
// failure is logged and never affects the job result.
//
// AI-ASSISTANT-INFO: Notifier trait + ntfy-backed/no-op impls, one-call-per-
// terminal-state dispatch.

use ntfy::error::Error as NtfyError;
use ntfy::payload::{Payload, Priority as NtfyPriority};
use ntfy::DispatcherBuilder;
use thiserror::Error;
use url::Url;

use crate::state::EncodingJobStats;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("invalid ntfy topic url '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("ntfy dispatcher error for {0}: {1}")]
    DispatcherFailed(String, String),

    #[error("failed to send ntfy notification to {0}: {1}")]
    SendFailed(String, String),
}

/// One of the terminal-state events the orchestrator notifies on (§4.16).
/// Never fired for intermediate progress.
#[derive(Debug, Clone)]
pub enum NotificationEvent<'a> {
    JobStarted { job_id: &'a str },
    JobCompleted { job_id: &'a str, stats: &'a EncodingJobStats },
    JobFailed { job_id: &'a str, error: &'a str },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &NotificationEvent<'_>) -> Result<(), NotificationError>;
}

/// Default notifier when no topic is configured: never attempts a network
/// call (§8's documented property).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &NotificationEvent<'_>) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// ntfy.sh-backed notifier, one topic per instance.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    topic_url: String,
}

impl NtfyNotifier {
    pub fn new(topic_url: impl Into<String>) -> Self {
        NtfyNotifier { topic_url: topic_url.into() }
    }

    fn send(&self, message: &str, title: &str, priority: u8, tags: &str) -> Result<(), NotificationError> {
        let parsed_url = Url::parse(&self.topic_url)
            .map_err(|e| NotificationError::InvalidUrl(self.topic_url.clone(), e.to_string()))?;

        let host = match parsed_url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(NotificationError::InvalidUrl(self.topic_url.clone(), "missing host".into())),
        };
        let base_url = format!("{}://{}", parsed_url.scheme(), host);
        let topic = parsed_url.path().trim_start_matches('/');
        if topic.is_empty() {
            return Err(NotificationError::InvalidUrl(self.topic_url.clone(), "missing topic path".into()));
        }

        let dispatcher = DispatcherBuilder::new(&base_url)
            .build_blocking()
            .map_err(|e: NtfyError| NotificationError::DispatcherFailed(base_url.clone(), e.to_string()))?;

        let mut payload = Payload::new(topic).message(message).title(title);
        if let Some(ntfy_priority) = map_priority(priority) {
            payload = payload.priority(ntfy_priority);
        }
        let mut final_tags: Vec<String> = tags.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        if !final_tags.iter().any(|t| t == "drapto") {
            final_tags.push("drapto".to_string());
        }
        payload = payload.tags(final_tags);

        dispatcher
            .send(&payload)
            .map_err(|e: NtfyError| NotificationError::SendFailed(self.topic_url.clone(), e.to_string()))
    }
}

fn map_priority(p: u8) -> Option<NtfyPriority> {
    match p {
        1 => Some(NtfyPriority::Min),
        2 => Some(NtfyPriority::Low),
        3 => Some(NtfyPriority::Default),
        4 => Some(NtfyPriority::High),
        5 => Some(NtfyPriority::Max),
        _ => None,
    }
}

impl Notifier for NtfyNotifier {
    fn notify(&self, event: &NotificationEvent<'_>) -> Result<(), NotificationError> {
        match event {
            NotificationEvent::JobStarted { job_id } => {
                self.send(&format!("Job {job_id} started"), "drapto", 3, "hourglass")
            }
            NotificationEvent::JobCompleted { job_id, stats } => self.send(
                &format!(
                    "Job {job_id} completed: {} bytes -> {} bytes",
                    stats.input_size, stats.output_size
                ),
                "drapto",
                3,
                "white_check_mark,success",
            ),
            NotificationEvent::JobFailed { job_id, error } => {
                self.send(&format!("Job {job_id} failed: {error}"), "drapto", 4, "x,failure")
            }
        }
    }
}

/// Dispatches `event` and logs (never propagates) any failure, per §4.16's
/// "never affects job result" rule.
pub fn notify_best_effort(notifier: &dyn Notifier, event: NotificationEvent<'_>) {
    if let Err(err) = notifier.notify(&event) {
        log::warn!("notification dispatch failed: {err}");
    }
}
