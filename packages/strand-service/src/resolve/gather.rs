use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use strand_index::Indexes;
use strand_storage::{EventLog, EventQuery, MessageEvent};

use crate::{
	Error, Result,
	resolve::{ResolveInput, ResolverPolicy},
};

/// Where a candidate thread came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
	FastPath,
	Signature,
	Recent,
	Latest,
}

/// A thread under consideration, represented by its most recent event.
#[derive(Clone, Debug)]
pub struct Candidate {
	pub thread_id: String,
	pub latest: MessageEvent,
	pub sources: Vec<CandidateSource>,
	pub signature_similarity: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct SkippedCandidate {
	pub thread_id: String,
	pub sources: Vec<CandidateSource>,
	pub latest_timestamp: Option<OffsetDateTime>,
	pub reason: &'static str,
}

/// Gathered candidates in iteration order, including the ones dropped before scoring.
#[derive(Clone, Debug)]
pub enum CandidateSlot {
	Live(Candidate),
	Skipped(SkippedCandidate),
}

pub(crate) enum Gathered {
	/// Same-topic event inside the window; its thread is the only candidate.
	FastPath(MessageEvent),
	Candidates(Vec<CandidateSlot>),
}

#[derive(Default)]
struct CandidateSet {
	order: Vec<(String, Vec<CandidateSource>, Option<f32>)>,
	positions: HashMap<String, usize>,
}
impl CandidateSet {
	fn add(&mut self, thread_id: &str, source: CandidateSource, similarity: Option<f32>) {
		if let Some(&position) = self.positions.get(thread_id) {
			let (_, sources, existing) = &mut self.order[position];

			if !sources.contains(&source) {
				sources.push(source);
			}
			if existing.is_none() {
				*existing = similarity;
			}

			return;
		}

		self.positions.insert(thread_id.to_string(), self.order.len());
		self.order.push((thread_id.to_string(), vec![source], similarity));
	}
}

/// Oldest timestamp still inside the recency window. Fails instead of overflowing when the
/// window reaches past the representable date range.
pub(crate) fn window_start(
	policy: &ResolverPolicy,
	now: OffsetDateTime,
) -> Result<OffsetDateTime> {
	policy.recency_window().and_then(|window| now.checked_sub(window)).ok_or_else(|| {
		Error::InvalidRequest {
			message: format!(
				"A recency window of {} days before {now} is out of range.",
				policy.recency_window_days
			),
		}
	})
}

pub(crate) fn gather_candidates(
	log: &dyn EventLog,
	indexes: &Indexes,
	policy: &ResolverPolicy,
	input: &ResolveInput<'_>,
	embedding: Option<&[f32]>,
) -> Result<Gathered> {
	let since = window_start(policy, input.timestamp)?;

	if !input.topic.trim().is_empty() {
		let query = EventQuery::for_user(input.user_id).topic(input.topic).since(since).limit(1);

		if let Some(event) = log.user_events(&query)?.into_iter().next() {
			return Ok(Gathered::FastPath(event));
		}
	}

	let mut set = CandidateSet::default();

	if let Some(embedding) = embedding
		&& !indexes.signatures().is_empty()
	{
		for hit in
			indexes.search_thread_signatures(embedding, input.user_id, policy.signature_top_k)?
		{
			set.add(&hit.thread_id, CandidateSource::Signature, Some(hit.similarity));
		}
	}

	let recent_query =
		EventQuery::for_user(input.user_id).since(since).limit(policy.recent_event_limit);

	for event in log.user_events(&recent_query)? {
		set.add(&event.thread_id, CandidateSource::Recent, None);
	}

	if policy.include_latest_thread {
		let latest_query = EventQuery::for_user(input.user_id).since(since).limit(1);

		if let Some(event) = log.user_events(&latest_query)?.into_iter().next() {
			set.add(&event.thread_id, CandidateSource::Latest, None);
		}
	}

	let mut slots = Vec::with_capacity(set.order.len());

	for (thread_id, sources, signature_similarity) in set.order {
		let slot = match log.latest_thread_event(input.user_id, &thread_id)? {
			Some(latest) if latest.timestamp >= since =>
				CandidateSlot::Live(Candidate { thread_id, latest, sources, signature_similarity }),
			Some(latest) => CandidateSlot::Skipped(SkippedCandidate {
				thread_id,
				sources,
				latest_timestamp: Some(latest.timestamp),
				reason: "outside_recency_window",
			}),
			None => CandidateSlot::Skipped(SkippedCandidate {
				thread_id,
				sources,
				latest_timestamp: None,
				reason: "no_events",
			}),
		};

		slots.push(slot);
	}

	tracing::debug!(
		user_id = input.user_id,
		candidates = slots.iter().filter(|slot| matches!(slot, CandidateSlot::Live(_))).count(),
		gathered = slots.len(),
		"Thread candidates gathered."
	);

	Ok(Gathered::Candidates(slots))
}
