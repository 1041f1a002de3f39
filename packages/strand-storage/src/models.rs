use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One ingested message. Immutable once appended, except for `resolved`, `resolved_at`, and
/// `summary`, which only the thread-closing hooks touch.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MessageEvent {
	pub event_id: Uuid,
	pub user_id: String,
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	pub thread_id: String,
	pub message_text: String,
	pub topic: String,
	pub topic_nuance: String,
	pub subtopics: Vec<String>,
	pub sentiment: String,
	/// Unit-length embedding, or empty when none was available at ingestion.
	pub embedding: Vec<f32>,
	pub resolved: bool,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub resolved_at: Option<OffsetDateTime>,
	pub content_hash: String,
	#[serde(default)]
	pub summary: Option<ThreadSummary>,
}

/// Summary fields attached by the thread-closing collaborator to a thread's latest event.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ThreadSummary {
	pub current_state: String,
	pub next_step: String,
	pub change: String,
}
