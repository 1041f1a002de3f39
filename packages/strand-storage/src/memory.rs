use std::{
	collections::{HashMap, HashSet},
	sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use time::OffsetDateTime;

use crate::{Error, EventLog, EventQuery, MessageEvent, Result, ThreadSummary};

/// In-process event log. Each user's events are kept sorted by timestamp; events sharing a
/// timestamp keep their append order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
	users: RwLock<HashMap<String, Vec<MessageEvent>>>,
}
impl MemoryEventLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.read().values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.write().clear();
	}

	/// Distinct thread ids owned by the user.
	pub fn user_threads(&self, user_id: &str) -> HashSet<String> {
		self.read()
			.get(user_id)
			.map(|events| events.iter().map(|event| event.thread_id.clone()).collect())
			.unwrap_or_default()
	}

	fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<MessageEvent>>> {
		self.users.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<MessageEvent>>> {
		self.users.write().unwrap_or_else(|err| err.into_inner())
	}
}
impl EventLog for MemoryEventLog {
	fn user_ids(&self) -> Result<Vec<String>> {
		let mut user_ids: Vec<String> = self
			.read()
			.iter()
			.filter(|(_, events)| !events.is_empty())
			.map(|(user_id, _)| user_id.clone())
			.collect();

		user_ids.sort();

		Ok(user_ids)
	}

	fn user_events(&self, query: &EventQuery<'_>) -> Result<Vec<MessageEvent>> {
		let users = self.read();
		let Some(events) = users.get(query.user_id) else { return Ok(Vec::new()) };
		let matching = events.iter().rev().filter(|event| query.matches(event)).cloned();

		Ok(match query.limit {
			Some(limit) => matching.take(limit).collect(),
			None => matching.collect(),
		})
	}

	fn thread_events(&self, user_id: &str, thread_id: &str) -> Result<Vec<MessageEvent>> {
		let users = self.read();
		let Some(events) = users.get(user_id) else { return Ok(Vec::new()) };

		Ok(events.iter().rev().filter(|event| event.thread_id == thread_id).cloned().collect())
	}

	fn find_by_hash(&self, user_id: &str, content_hash: &str) -> Result<Option<MessageEvent>> {
		let users = self.read();

		Ok(users
			.get(user_id)
			.and_then(|events| events.iter().find(|event| event.content_hash == content_hash))
			.cloned())
	}

	fn append(&self, event: MessageEvent) -> Result<()> {
		if event.user_id.trim().is_empty() {
			return Err(Error::InvalidArgument("user_id must be non-empty.".to_string()));
		}
		if event.thread_id.trim().is_empty() {
			return Err(Error::InvalidArgument("thread_id must be non-empty.".to_string()));
		}

		let mut users = self.write();
		let events = users.entry(event.user_id.clone()).or_default();

		if events.iter().any(|existing| existing.event_id == event.event_id) {
			return Err(Error::Conflict(format!("Event {} already exists.", event.event_id)));
		}
		if !event.content_hash.is_empty()
			&& events.iter().any(|existing| existing.content_hash == event.content_hash)
		{
			return Err(Error::Conflict("Duplicate message content for user.".to_string()));
		}

		let position = events.partition_point(|existing| existing.timestamp <= event.timestamp);

		tracing::debug!(
			user_id = %event.user_id,
			thread_id = %event.thread_id,
			event_id = %event.event_id,
			"Event appended."
		);

		events.insert(position, event);

		Ok(())
	}

	fn mark_thread_resolved(
		&self,
		user_id: &str,
		thread_id: &str,
		resolved_at: OffsetDateTime,
	) -> Result<usize> {
		let mut users = self.write();
		let Some(events) = users.get_mut(user_id) else {
			return Err(Error::NotFound(format!("No events for user {user_id}.")));
		};
		let mut touched = 0;

		for event in events.iter_mut().filter(|event| event.thread_id == thread_id) {
			event.resolved = true;
			event.resolved_at = Some(resolved_at);
			touched += 1;
		}

		if touched == 0 {
			return Err(Error::NotFound(format!("Thread {thread_id} not found.")));
		}

		Ok(touched)
	}

	fn attach_summary(&self, user_id: &str, thread_id: &str, summary: ThreadSummary) -> Result<()> {
		let mut users = self.write();
		let latest = users
			.get_mut(user_id)
			.and_then(|events| events.iter_mut().rev().find(|event| event.thread_id == thread_id));
		let Some(latest) = latest else {
			return Err(Error::NotFound(format!("Thread {thread_id} not found.")));
		};

		latest.summary = Some(summary);

		Ok(())
	}
}
