use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolve::{CandidateSource, DecisionState, ResolverPolicy};

pub const THREAD_RESOLUTION_TRACE_SCHEMA_V1: &str = "thread_resolution_trace/v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
	FastPath,
	Scored,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreTerm {
	pub name: String,
	pub value: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<BTreeMap<String, Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateTrace {
	pub thread_id: String,
	pub sources: Vec<CandidateSource>,
	pub age_days: Option<f32>,
	pub terms: Vec<ScoreTerm>,
	pub reasons: Vec<String>,
	pub composite: Option<f32>,
	pub emotion_shift: bool,
	pub accepted: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub skipped: Option<String>,
}

/// Observational record of one resolution call. Building it never changes the decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolutionTrace {
	pub schema: String,
	pub user_id: String,
	pub method: ResolutionMethod,
	pub recency_window_days: i64,
	pub embedding_threshold: f32,
	pub guardrail_score: f32,
	pub has_embedding: bool,
	pub ambiguous_reference: bool,
	pub ambiguous_term: Option<String>,
	pub best_similarity: Option<f32>,
	pub candidates: Vec<CandidateTrace>,
	pub selected_thread_id: Option<String>,
	pub selected_score: Option<f32>,
	pub final_state: DecisionState,
	pub reason: String,
}

pub(crate) struct TraceRecorder {
	trace: ResolutionTrace,
}
impl TraceRecorder {
	pub(crate) fn new(user_id: &str, policy: &ResolverPolicy, has_embedding: bool) -> Self {
		Self {
			trace: ResolutionTrace {
				schema: THREAD_RESOLUTION_TRACE_SCHEMA_V1.to_string(),
				user_id: user_id.to_string(),
				method: ResolutionMethod::Scored,
				recency_window_days: policy.recency_window_days,
				embedding_threshold: policy.embedding_threshold,
				guardrail_score: policy.guardrail_score,
				has_embedding,
				ambiguous_reference: false,
				ambiguous_term: None,
				best_similarity: None,
				candidates: Vec::new(),
				selected_thread_id: None,
				selected_score: None,
				final_state: DecisionState::NoCandidate,
				reason: String::new(),
			},
		}
	}

	pub(crate) fn method(&mut self, method: ResolutionMethod) {
		self.trace.method = method;
	}

	pub(crate) fn ambiguous_reference(&mut self, term: Option<&str>) {
		self.trace.ambiguous_reference = term.is_some();
		self.trace.ambiguous_term = term.map(str::to_string);
	}

	pub(crate) fn similarity(&mut self, similarity: f32) {
		let best = self.trace.best_similarity.get_or_insert(similarity);

		if similarity > *best {
			*best = similarity;
		}
	}

	pub(crate) fn candidate(&mut self, candidate: CandidateTrace) {
		self.trace.candidates.push(candidate);
	}

	pub(crate) fn finish(
		mut self,
		selected: Option<(&str, f32)>,
		final_state: DecisionState,
		reason: String,
	) -> ResolutionTrace {
		if let Some((thread_id, score)) = selected {
			self.trace.selected_thread_id = Some(thread_id.to_string());
			self.trace.selected_score = Some(score);
		}

		self.trace.final_state = final_state;
		self.trace.reason = reason;

		self.trace
	}
}

pub(crate) fn term(name: &str, value: f32, inputs: BTreeMap<String, Value>) -> ScoreTerm {
	ScoreTerm {
		name: name.to_string(),
		value,
		inputs: if inputs.is_empty() { None } else { Some(inputs) },
	}
}
