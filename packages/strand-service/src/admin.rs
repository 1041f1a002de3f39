use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use strand_index::{IndexStats, MessageRef};
use strand_storage::EventQuery;

use crate::{Result, StrandService};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RebuildReport {
	pub messages: usize,
	pub signatures: usize,
	/// Events stored without an embedding.
	pub skipped: usize,
}

impl StrandService {
	pub fn index_stats(&self) -> IndexStats {
		self.indexes().stats()
	}

	/// Drops every indexed vector. The event log is untouched.
	pub fn reset_indexes(&self) -> IndexStats {
		let mut indexes = self.indexes_mut();

		indexes.reset();

		indexes.stats()
	}

	/// Rebuilds both indexes from the event log: every stored embedding goes into the message
	/// index, and each thread's first event becomes its signature when it carries one.
	pub fn rebuild_indexes(&self) -> Result<RebuildReport> {
		let mut indexes = self.indexes_mut();
		let mut report = RebuildReport { messages: 0, signatures: 0, skipped: 0 };

		indexes.reset();

		for user_id in self.log.user_ids()? {
			let mut events = self.log.user_events(&EventQuery::for_user(&user_id))?;
			let mut seen = HashSet::new();

			events.reverse();

			for event in events {
				let first_in_thread = seen.insert(event.thread_id.clone());

				if event.embedding.is_empty() {
					report.skipped += 1;

					continue;
				}

				indexes.insert_message_embedding(
					&event.embedding,
					MessageRef {
						event_id: event.event_id,
						user_id: event.user_id.clone(),
						thread_id: event.thread_id.clone(),
						text: event.message_text.clone(),
					},
				)?;
				report.messages += 1;

				if first_in_thread
					&& indexes.insert_thread_signature(
						&event.thread_id,
						&event.user_id,
						&event.embedding,
					)? {
					report.signatures += 1;
				}
			}
		}

		tracing::info!(
			messages = report.messages,
			signatures = report.signatures,
			skipped = report.skipped,
			"Vector indexes rebuilt from the event log."
		);

		Ok(report)
	}
}
