use time::OffsetDateTime;

use crate::{MessageEvent, Result, ThreadSummary};

/// Filter for a user's events. Results are always most-recent first.
#[derive(Clone, Debug)]
pub struct EventQuery<'a> {
	pub user_id: &'a str,
	pub topic: Option<&'a str>,
	/// Inclusive lower bound on the event timestamp.
	pub since: Option<OffsetDateTime>,
	pub limit: Option<usize>,
}
impl<'a> EventQuery<'a> {
	pub fn for_user(user_id: &'a str) -> Self {
		Self { user_id, topic: None, since: None, limit: None }
	}

	pub fn topic(mut self, topic: &'a str) -> Self {
		self.topic = Some(topic);

		self
	}

	pub fn since(mut self, since: OffsetDateTime) -> Self {
		self.since = Some(since);

		self
	}

	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);

		self
	}

	pub fn matches(&self, event: &MessageEvent) -> bool {
		if event.user_id != self.user_id {
			return false;
		}
		if let Some(topic) = self.topic
			&& event.topic != topic
		{
			return false;
		}
		if let Some(since) = self.since
			&& event.timestamp < since
		{
			return false;
		}

		true
	}
}

/// Storage contract for the append-only, per-user, timestamp-ordered event log.
pub trait EventLog
where
	Self: Send + Sync,
{
	/// Every user with at least one event, in ascending order.
	fn user_ids(&self) -> Result<Vec<String>>;

	fn user_events(&self, query: &EventQuery<'_>) -> Result<Vec<MessageEvent>>;

	/// Events of one thread, most-recent first.
	fn thread_events(&self, user_id: &str, thread_id: &str) -> Result<Vec<MessageEvent>>;

	fn find_by_hash(&self, user_id: &str, content_hash: &str) -> Result<Option<MessageEvent>>;

	fn append(&self, event: MessageEvent) -> Result<()>;

	/// Flags every event of the thread as resolved. Returns the number of events touched.
	fn mark_thread_resolved(
		&self,
		user_id: &str,
		thread_id: &str,
		resolved_at: OffsetDateTime,
	) -> Result<usize>;

	/// Attaches summary fields to the thread's latest event.
	fn attach_summary(&self, user_id: &str, thread_id: &str, summary: ThreadSummary) -> Result<()>;

	fn latest_thread_event(&self, user_id: &str, thread_id: &str) -> Result<Option<MessageEvent>> {
		Ok(self.thread_events(user_id, thread_id)?.into_iter().next())
	}

	fn thread_exists(&self, user_id: &str, thread_id: &str) -> Result<bool> {
		Ok(self.latest_thread_event(user_id, thread_id)?.is_some())
	}
}
