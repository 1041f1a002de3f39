use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{Result, VectorIndex};

/// Over-fetch factor for message search, since user/thread filtering and text de-duplication
/// happen after the nearest-neighbor scan.
const MESSAGE_SEARCH_OVERFETCH: usize = 3;

#[derive(Clone, Debug)]
pub struct MessageRef {
	pub event_id: Uuid,
	pub user_id: String,
	pub thread_id: String,
	pub text: String,
}

#[derive(Clone, Debug)]
pub struct SignatureRef {
	pub thread_id: String,
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SignatureMatch {
	pub thread_id: String,
	pub similarity: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageMatch {
	pub event_id: Uuid,
	pub thread_id: String,
	pub text: String,
	pub similarity: f32,
}

#[derive(Clone, Debug, Default)]
pub struct MessageFilter<'a> {
	pub user_id: Option<&'a str>,
	pub thread_id: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct IndexStats {
	pub dim: usize,
	pub messages: usize,
	pub signatures: usize,
}

/// The two index instances the resolver works with: one entry per ingested message, and one
/// signature per thread built from the thread's first message.
#[derive(Debug)]
pub struct Indexes {
	messages: VectorIndex<MessageRef>,
	signatures: VectorIndex<SignatureRef>,
	signed_threads: HashSet<(String, String)>,
}
impl Indexes {
	pub fn new(dim: usize) -> Result<Self> {
		Ok(Self {
			messages: VectorIndex::new(dim)?,
			signatures: VectorIndex::new(dim)?,
			signed_threads: HashSet::new(),
		})
	}

	pub fn dim(&self) -> usize {
		self.messages.dim()
	}

	pub fn messages(&self) -> &VectorIndex<MessageRef> {
		&self.messages
	}

	pub fn signatures(&self) -> &VectorIndex<SignatureRef> {
		&self.signatures
	}

	pub fn reset(&mut self) {
		self.messages.reset();
		self.signatures.reset();
		self.signed_threads.clear();

		tracing::info!(dim = self.dim(), "Vector indexes reset.");
	}

	pub fn stats(&self) -> IndexStats {
		IndexStats {
			dim: self.dim(),
			messages: self.messages.len(),
			signatures: self.signatures.len(),
		}
	}

	pub fn insert_message_embedding(&mut self, vector: &[f32], reference: MessageRef) -> Result<()> {
		let user_id = reference.user_id.clone();
		let thread_id = reference.thread_id.clone();

		self.messages.insert(vector, reference)?;

		tracing::debug!(
			user_id = %user_id,
			thread_id = %thread_id,
			messages = self.messages.len(),
			"Message embedding indexed."
		);

		Ok(())
	}

	/// Adds the thread's signature. Returns `false` when the thread already has one.
	pub fn insert_thread_signature(
		&mut self,
		thread_id: &str,
		user_id: &str,
		vector: &[f32],
	) -> Result<bool> {
		let key = (user_id.to_string(), thread_id.to_string());

		if self.signed_threads.contains(&key) {
			tracing::warn!(user_id, thread_id, "Thread already has a signature.");

			return Ok(false);
		}

		self.signatures.insert(
			vector,
			SignatureRef { thread_id: thread_id.to_string(), user_id: user_id.to_string() },
		)?;
		self.signed_threads.insert(key);

		tracing::debug!(
			user_id,
			thread_id,
			signatures = self.signatures.len(),
			"Thread signature indexed."
		);

		Ok(true)
	}

	pub fn has_signature(&self, user_id: &str, thread_id: &str) -> bool {
		self.signed_threads.contains(&(user_id.to_string(), thread_id.to_string()))
	}

	/// Closest thread signatures owned by `user_id`.
	pub fn search_thread_signatures(
		&self,
		query: &[f32],
		user_id: &str,
		k: usize,
	) -> Result<Vec<SignatureMatch>> {
		let hits =
			self.signatures.search_filtered(query, k, |reference| reference.user_id == user_id)?;

		Ok(hits
			.into_iter()
			.map(|hit| SignatureMatch {
				thread_id: hit.reference.thread_id.clone(),
				similarity: hit.similarity,
			})
			.collect())
	}

	/// Closest indexed messages, optionally scoped to a user and thread, without repeated texts.
	pub fn search_messages(
		&self,
		query: &[f32],
		filter: &MessageFilter<'_>,
		k: usize,
	) -> Result<Vec<MessageMatch>> {
		let hits = self.messages.search(query, k.saturating_mul(MESSAGE_SEARCH_OVERFETCH))?;
		let mut seen_texts = HashSet::new();
		let mut out = Vec::new();

		for hit in hits {
			let reference = hit.reference;

			if filter.user_id.is_some_and(|user_id| reference.user_id != user_id) {
				continue;
			}
			if filter.thread_id.is_some_and(|thread_id| reference.thread_id != thread_id) {
				continue;
			}
			if !seen_texts.insert(reference.text.as_str()) {
				continue;
			}

			out.push(MessageMatch {
				event_id: reference.event_id,
				thread_id: reference.thread_id.clone(),
				text: reference.text.clone(),
				similarity: hit.similarity,
			});

			if out.len() >= k {
				break;
			}
		}

		Ok(out)
	}
}
