use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use strand_domain::{content_hash, subtopics};
use strand_index::{MessageRef, vector};
use strand_storage::MessageEvent;

use crate::{
	Error, Result, StrandService,
	resolve::{
		self, DecisionState, ResolutionMethod, ResolutionTrace, ResolveContext, ResolveInput,
		ResolverOverrides, ResolverPolicy, ThreadDecision,
	},
};

/// A message with its classifier labels already attached.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestMessageRequest {
	pub user_id: String,
	pub message_text: String,
	pub topic: String,
	#[serde(default)]
	pub topic_nuance: String,
	#[serde(default)]
	pub subtopics: Vec<String>,
	#[serde(default)]
	pub sentiment: String,
	/// Defaults to the time of ingestion.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub timestamp: Option<OffsetDateTime>,
	/// Computed by the embedding provider when absent.
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub overrides: ResolverOverrides,
	#[serde(default)]
	pub trace: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestMessageResponse {
	pub event_id: Uuid,
	pub thread_id: String,
	pub intensifying: bool,
	pub reference_past_issue: bool,
	/// The same text was already ingested for this user; nothing was written.
	pub duplicate: bool,
	pub first_message: bool,
	pub state: DecisionState,
	pub method: Option<ResolutionMethod>,
	pub score: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trace: Option<ResolutionTrace>,
}
impl IngestMessageResponse {
	fn duplicate_of(existing: &MessageEvent) -> Self {
		Self {
			event_id: existing.event_id,
			thread_id: existing.thread_id.clone(),
			intensifying: false,
			reference_past_issue: false,
			duplicate: true,
			first_message: false,
			state: DecisionState::Accepted,
			method: None,
			score: None,
			trace: None,
		}
	}
}

/// Decision-only request; nothing is persisted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResolveThreadRequest {
	pub user_id: String,
	pub message_text: String,
	pub topic: String,
	#[serde(default)]
	pub topic_nuance: String,
	#[serde(default)]
	pub subtopics: Vec<String>,
	#[serde(default)]
	pub sentiment: String,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub timestamp: Option<OffsetDateTime>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub overrides: ResolverOverrides,
	#[serde(default)]
	pub trace: bool,
}

impl StrandService {
	/// Rejects duplicates, resolves the thread, then appends the event and updates the indexes.
	///
	/// Resolution and commit run under the user's lock, and the decision is complete before the
	/// first write.
	pub async fn ingest_message(&self, req: IngestMessageRequest) -> Result<IngestMessageResponse> {
		validate_message(&req.user_id, &req.message_text)?;

		let policy = ResolverPolicy::new(&self.cfg.resolver, &req.overrides)?;
		let hash = content_hash::content_hash(&req.user_id, &req.message_text).ok_or_else(|| {
			Error::InvalidRequest { message: "message_text must be non-empty.".to_string() }
		})?;

		if let Some(existing) = self.log.find_by_hash(&req.user_id, &hash)? {
			tracing::info!(
				user_id = %req.user_id,
				thread_id = %existing.thread_id,
				"Duplicate message skipped."
			);

			return Ok(IngestMessageResponse::duplicate_of(&existing));
		}

		let embedding = self.message_embedding(req.embedding.as_deref(), &req.message_text).await?;
		let timestamp = req.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
		let _guard = self.locks.lock(&req.user_id).await;

		if let Some(existing) = self.log.find_by_hash(&req.user_id, &hash)? {
			return Ok(IngestMessageResponse::duplicate_of(&existing));
		}

		let decision = {
			let indexes = self.indexes();
			let ctx = ResolveContext {
				log: self.log.as_ref(),
				indexes: &indexes,
				policy: &policy,
				minter: self.minter.as_ref(),
			};
			let input = ResolveInput {
				user_id: &req.user_id,
				message_text: &req.message_text,
				topic: req.topic.trim(),
				topic_nuance: req.topic_nuance.trim(),
				subtopics: &req.subtopics,
				sentiment: req.sentiment.trim(),
				embedding: embedding.as_deref(),
				timestamp,
			};

			resolve::resolve_thread(&ctx, &input, req.trace)?
		};
		let unit = embedding.as_deref().and_then(vector::try_normalize);
		let first_message = !self.log.thread_exists(&req.user_id, &decision.thread_id)?;
		let event = MessageEvent {
			event_id: Uuid::new_v4(),
			user_id: req.user_id.clone(),
			timestamp,
			thread_id: decision.thread_id.clone(),
			message_text: req.message_text.clone(),
			topic: req.topic.trim().to_string(),
			topic_nuance: req.topic_nuance.trim().to_string(),
			subtopics: subtopics::normalize_subtopics(&req.subtopics),
			sentiment: req.sentiment.trim().to_string(),
			embedding: unit.clone().unwrap_or_default(),
			resolved: false,
			resolved_at: None,
			content_hash: hash,
			summary: None,
		};
		let event_id = event.event_id;

		self.log.append(event)?;

		if let Some(unit) = unit.as_deref() {
			let mut indexes = self.indexes_mut();

			indexes.insert_message_embedding(
				unit,
				MessageRef {
					event_id,
					user_id: req.user_id.clone(),
					thread_id: decision.thread_id.clone(),
					text: req.message_text.clone(),
				},
			)?;

			if first_message {
				indexes.insert_thread_signature(&decision.thread_id, &req.user_id, unit)?;
			}
		}

		tracing::info!(
			user_id = %req.user_id,
			thread_id = %decision.thread_id,
			%event_id,
			first_message,
			"Message ingested."
		);

		Ok(ingested(event_id, first_message, decision))
	}

	/// Runs resolution without persisting anything.
	pub async fn resolve_only(&self, req: ResolveThreadRequest) -> Result<ThreadDecision> {
		validate_message(&req.user_id, &req.message_text)?;

		let policy = ResolverPolicy::new(&self.cfg.resolver, &req.overrides)?;
		let embedding = self.message_embedding(req.embedding.as_deref(), &req.message_text).await?;
		let timestamp = req.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
		let indexes = self.indexes();
		let ctx = ResolveContext {
			log: self.log.as_ref(),
			indexes: &indexes,
			policy: &policy,
			minter: self.minter.as_ref(),
		};
		let input = ResolveInput {
			user_id: &req.user_id,
			message_text: &req.message_text,
			topic: req.topic.trim(),
			topic_nuance: req.topic_nuance.trim(),
			subtopics: &req.subtopics,
			sentiment: req.sentiment.trim(),
			embedding: embedding.as_deref(),
			timestamp,
		};

		resolve::resolve_thread(&ctx, &input, req.trace)
	}

	/// Caller-supplied embedding, else the provider's. Supplied vectors must match the index
	/// dimension.
	async fn message_embedding(
		&self,
		supplied: Option<&[f32]>,
		text: &str,
	) -> Result<Option<Vec<f32>>> {
		match supplied {
			Some(embedding) if !embedding.is_empty() => {
				let dim = self.cfg.index.vector_dim as usize;

				if embedding.len() != dim {
					return Err(Error::InvalidRequest {
						message: format!("embedding must have {dim} dimensions."),
					});
				}

				Ok(Some(embedding.to_vec()))
			},
			_ => self.embed_text(text).await,
		}
	}
}

fn validate_message(user_id: &str, message_text: &str) -> Result<()> {
	if user_id.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "user_id must be non-empty.".to_string() });
	}
	if message_text.trim().is_empty() {
		return Err(Error::InvalidRequest {
			message: "message_text must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn ingested(
	event_id: Uuid,
	first_message: bool,
	decision: ThreadDecision,
) -> IngestMessageResponse {
	IngestMessageResponse {
		event_id,
		thread_id: decision.thread_id,
		intensifying: decision.intensifying,
		reference_past_issue: decision.reference_past_issue,
		duplicate: false,
		first_message,
		state: decision.state,
		method: Some(decision.method),
		score: decision.score,
		trace: decision.trace,
	}
}
