//! Thread resolution: gather candidate threads for a message, score them, and either accept the
//! best one or mint a new thread id.

pub mod gather;
pub mod policy;
pub mod score;
pub mod trace;

pub use gather::{Candidate, CandidateSlot, CandidateSource, SkippedCandidate};
pub use policy::{DecisionState, ResolverOverrides, ResolverPolicy, accepts};
pub use score::SignalScores;
pub use trace::{
	CandidateTrace, ResolutionMethod, ResolutionTrace, ScoreTerm,
	THREAD_RESOLUTION_TRACE_SCHEMA_V1,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use strand_domain::{reference, subtopics};
use strand_index::{Indexes, vector};
use strand_storage::{EventLog, MessageEvent};

use crate::{
	Result, ThreadIdMinter,
	resolve::{
		gather::Gathered,
		score::ScoreContext,
		trace::TraceRecorder,
	},
};

/// Classifier output and context for the message being resolved.
#[derive(Clone, Debug)]
pub struct ResolveInput<'a> {
	pub user_id: &'a str,
	pub message_text: &'a str,
	pub topic: &'a str,
	pub topic_nuance: &'a str,
	pub subtopics: &'a [String],
	pub sentiment: &'a str,
	/// Raw message embedding. Empty, zero, or non-finite vectors count as missing.
	pub embedding: Option<&'a [f32]>,
	pub timestamp: OffsetDateTime,
}

/// Read-only collaborators for one resolution call.
pub struct ResolveContext<'a> {
	pub log: &'a dyn EventLog,
	pub indexes: &'a Indexes,
	pub policy: &'a ResolverPolicy,
	pub minter: &'a dyn ThreadIdMinter,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadDecision {
	pub thread_id: String,
	/// The accepted thread's latest sentiment differs from the message's.
	pub intensifying: bool,
	pub reference_past_issue: bool,
	pub method: ResolutionMethod,
	pub state: DecisionState,
	/// Composite score of the accepted candidate. `None` for the fast path and new threads.
	pub score: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trace: Option<ResolutionTrace>,
}
impl ThreadDecision {
	pub fn is_new_thread(&self) -> bool {
		self.state == DecisionState::NewThread
	}
}

/// Resolves the thread for one message. Nothing is written; the caller commits the decision.
pub fn resolve_thread(
	ctx: &ResolveContext<'_>,
	input: &ResolveInput<'_>,
	record_trace: bool,
) -> Result<ThreadDecision> {
	let unit = message_embedding(ctx.indexes, input.embedding)?;
	let subtopics = subtopics::normalize_subtopics(input.subtopics);
	let ambiguous_term = reference::find_ambiguous_reference(input.message_text);
	let mut recorder =
		record_trace.then(|| TraceRecorder::new(input.user_id, ctx.policy, unit.is_some()));

	if let Some(recorder) = recorder.as_mut() {
		recorder.ambiguous_reference(ambiguous_term);
	}

	let slots = match gather::gather_candidates(
		ctx.log,
		ctx.indexes,
		ctx.policy,
		input,
		unit.as_deref(),
	)? {
		Gathered::FastPath(event) => return Ok(fast_path(input, &event, recorder)),
		Gathered::Candidates(slots) => slots,
	};
	let score_ctx = ScoreContext {
		input,
		subtopics: &subtopics,
		embedding: unit.as_deref(),
		ambiguous_term,
		policy: ctx.policy,
	};
	let mut state = DecisionState::NoCandidate;
	let mut best: Option<(usize, &Candidate, SignalScores)> = None;
	let mut best_score = 0.0_f32;
	let mut traces = Vec::with_capacity(slots.len());

	for (position, slot) in slots.iter().enumerate() {
		let candidate = match slot {
			CandidateSlot::Live(candidate) => candidate,
			CandidateSlot::Skipped(skipped) => {
				if recorder.is_some() {
					traces.push(skipped_trace(skipped, input.timestamp));
				}

				continue;
			},
		};

		state = DecisionState::Scoring;

		let scores = score::score_candidate(&score_ctx, &candidate.latest);

		if let Some(recorder) = recorder.as_mut()
			&& unit.is_some()
		{
			recorder.similarity(scores.embedding_similarity);
		}

		tracing::trace!(
			user_id = input.user_id,
			thread_id = %candidate.thread_id,
			composite = scores.composite,
			"Candidate scored."
		);

		if recorder.is_some() {
			traces.push(CandidateTrace {
				thread_id: candidate.thread_id.clone(),
				sources: candidate.sources.clone(),
				age_days: Some(age_days(&candidate.latest, input.timestamp)),
				terms: scores.terms.clone(),
				reasons: scores.reasons.clone(),
				composite: Some(scores.composite),
				emotion_shift: scores.emotion_shift,
				accepted: false,
				skipped: None,
			});
		}

		if accepts(scores.composite, best_score, ctx.policy.guardrail_score) {
			best_score = scores.composite;
			best = Some((position, candidate, scores));
		}
	}

	let decision = match best {
		Some((position, candidate, scores)) => {
			if let Some(trace) = traces.get_mut(position) {
				trace.accepted = true;
			}

			let reason = if scores.reasons.is_empty() {
				"accepted".to_string()
			} else {
				scores.reasons.join("; ")
			};
			let trace = recorder.map(|mut recorder| {
				traces.into_iter().for_each(|trace| recorder.candidate(trace));

				recorder.finish(
					Some((candidate.thread_id.as_str(), best_score)),
					DecisionState::Accepted,
					reason,
				)
			});

			ThreadDecision {
				thread_id: candidate.thread_id.clone(),
				intensifying: scores.emotion_shift,
				reference_past_issue: candidate.latest.resolved,
				method: ResolutionMethod::Scored,
				state: DecisionState::Accepted,
				score: Some(best_score),
				trace,
			}
		},
		None => {
			let thread_id = policy::mint_thread_id(ctx.log, input.user_id, ctx.minter)?;
			let reason = if state == DecisionState::NoCandidate {
				"no candidate threads in the recency window"
			} else {
				"no candidate cleared the guardrail"
			};
			let trace = recorder.map(|mut recorder| {
				traces.into_iter().for_each(|trace| recorder.candidate(trace));

				recorder.finish(None, DecisionState::NewThread, reason.to_string())
			});

			ThreadDecision {
				thread_id,
				intensifying: false,
				reference_past_issue: false,
				method: ResolutionMethod::Scored,
				state: DecisionState::NewThread,
				score: None,
				trace,
			}
		},
	};

	tracing::info!(
		user_id = input.user_id,
		thread_id = %decision.thread_id,
		state = ?decision.state,
		score = ?decision.score,
		"Thread resolved."
	);

	Ok(decision)
}

fn fast_path(
	input: &ResolveInput<'_>,
	event: &MessageEvent,
	recorder: Option<TraceRecorder>,
) -> ThreadDecision {
	let intensifying = score::emotion_shift(input.sentiment, &event.sentiment);
	let trace = recorder.map(|mut recorder| {
		recorder.method(ResolutionMethod::FastPath);
		recorder.candidate(CandidateTrace {
			thread_id: event.thread_id.clone(),
			sources: vec![CandidateSource::FastPath],
			age_days: Some(age_days(event, input.timestamp)),
			terms: Vec::new(),
			reasons: vec!["same topic within the recency window".to_string()],
			composite: None,
			emotion_shift: intensifying,
			accepted: true,
			skipped: None,
		});

		recorder.finish(
			None,
			DecisionState::Accepted,
			"recent thread with the same topic".to_string(),
		)
	});

	tracing::info!(
		user_id = input.user_id,
		thread_id = %event.thread_id,
		topic = input.topic,
		"Thread resolved by topic fast path."
	);

	ThreadDecision {
		thread_id: event.thread_id.clone(),
		intensifying,
		reference_past_issue: true,
		method: ResolutionMethod::FastPath,
		state: DecisionState::Accepted,
		score: None,
		trace,
	}
}

/// Unit-length message embedding, or `None` when the message has no usable vector.
///
/// A non-empty vector of the wrong dimension means the embedding model does not match the
/// indexes, which is a configuration error rather than a missing signal.
fn message_embedding(indexes: &Indexes, embedding: Option<&[f32]>) -> Result<Option<Vec<f32>>> {
	let Some(embedding) = embedding.filter(|embedding| !embedding.is_empty()) else {
		return Ok(None);
	};

	if embedding.len() != indexes.dim() {
		return Err(strand_index::Error::DimensionMismatch {
			expected: indexes.dim(),
			actual: embedding.len(),
		}
		.into());
	}

	Ok(vector::try_normalize(embedding))
}

fn skipped_trace(skipped: &SkippedCandidate, now: OffsetDateTime) -> CandidateTrace {
	CandidateTrace {
		thread_id: skipped.thread_id.clone(),
		sources: skipped.sources.clone(),
		age_days: skipped.latest_timestamp.map(|timestamp| days_between(timestamp, now)),
		terms: Vec::new(),
		reasons: Vec::new(),
		composite: None,
		emotion_shift: false,
		accepted: false,
		skipped: Some(skipped.reason.to_string()),
	}
}

fn age_days(event: &MessageEvent, now: OffsetDateTime) -> f32 {
	days_between(event.timestamp, now)
}

fn days_between(then: OffsetDateTime, now: OffsetDateTime) -> f32 {
	((now - then).as_seconds_f64() / 86_400.0) as f32
}
