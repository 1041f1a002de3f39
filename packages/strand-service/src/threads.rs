use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use strand_storage::{MessageEvent, ThreadSummary};

use crate::{Error, Result, StrandService};

/// Hook for the thread-closing collaborator: flags a thread resolved and optionally attaches
/// its summary.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CloseThreadRequest {
	pub user_id: String,
	pub thread_id: String,
	#[serde(default)]
	pub summary: Option<ThreadSummary>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CloseThreadResponse {
	pub thread_id: String,
	pub events_resolved: usize,
	#[serde(with = "time::serde::rfc3339")]
	pub resolved_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ThreadMessage {
	pub event_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	pub message_text: String,
	pub topic: String,
	pub topic_nuance: String,
	pub subtopics: Vec<String>,
	pub sentiment: String,
	pub resolved: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub summary: Option<ThreadSummary>,
}
impl From<MessageEvent> for ThreadMessage {
	fn from(event: MessageEvent) -> Self {
		Self {
			event_id: event.event_id,
			timestamp: event.timestamp,
			message_text: event.message_text,
			topic: event.topic,
			topic_nuance: event.topic_nuance,
			subtopics: event.subtopics,
			sentiment: event.sentiment,
			resolved: event.resolved,
			summary: event.summary,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ThreadMessagesResponse {
	pub user_id: String,
	pub thread_id: String,
	/// Oldest first.
	pub messages: Vec<ThreadMessage>,
}

impl StrandService {
	pub async fn close_thread(&self, req: CloseThreadRequest) -> Result<CloseThreadResponse> {
		require("user_id", &req.user_id)?;
		require("thread_id", &req.thread_id)?;

		let _guard = self.locks.lock(&req.user_id).await;
		let resolved_at = req.resolved_at.unwrap_or_else(OffsetDateTime::now_utc);
		let events_resolved =
			self.log.mark_thread_resolved(&req.user_id, &req.thread_id, resolved_at)?;

		if let Some(summary) = req.summary {
			self.log.attach_summary(&req.user_id, &req.thread_id, summary)?;
		}

		tracing::info!(
			user_id = %req.user_id,
			thread_id = %req.thread_id,
			events_resolved,
			"Thread closed."
		);

		Ok(CloseThreadResponse { thread_id: req.thread_id, events_resolved, resolved_at })
	}

	pub fn thread_messages(
		&self,
		user_id: &str,
		thread_id: &str,
	) -> Result<ThreadMessagesResponse> {
		require("user_id", user_id)?;
		require("thread_id", thread_id)?;

		let mut events = self.log.thread_events(user_id, thread_id)?;

		if events.is_empty() {
			return Err(Error::NotFound { message: format!("Thread {thread_id} not found.") });
		}

		events.reverse();

		Ok(ThreadMessagesResponse {
			user_id: user_id.to_string(),
			thread_id: thread_id.to_string(),
			messages: events.into_iter().map(ThreadMessage::from).collect(),
		})
	}
}

pub(crate) fn require(field: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::InvalidRequest { message: format!("{field} must be non-empty.") });
	}

	Ok(())
}
