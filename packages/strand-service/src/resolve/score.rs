use std::collections::BTreeMap;

use serde_json::json;

use strand_domain::{
	nuance::{self, NuanceSimilarity},
	subtopics,
};
use strand_index::vector;
use strand_storage::MessageEvent;

use crate::resolve::{ResolveInput, ResolverPolicy, ScoreTerm, trace};

/// Every signal computed for one candidate against its most recent event.
#[derive(Clone, Debug)]
pub struct SignalScores {
	pub topic_match: bool,
	pub subtopic_overlap: usize,
	pub nuance: NuanceSimilarity,
	pub nuance_applied: bool,
	pub ambiguous_applied: bool,
	pub embedding_similarity: f32,
	pub embedding_dominant: bool,
	pub emotion_shift: bool,
	pub composite: f32,
	pub reasons: Vec<String>,
	pub terms: Vec<ScoreTerm>,
}

pub(crate) struct ScoreContext<'a> {
	pub(crate) input: &'a ResolveInput<'a>,
	pub(crate) subtopics: &'a [String],
	/// Unit-length message embedding, when one is usable.
	pub(crate) embedding: Option<&'a [f32]>,
	pub(crate) ambiguous_term: Option<&'a str>,
	pub(crate) policy: &'a ResolverPolicy,
}

pub(crate) fn score_candidate(ctx: &ScoreContext<'_>, latest: &MessageEvent) -> SignalScores {
	let policy = ctx.policy;
	let weights = &policy.weights;
	let mut composite = 0.0_f32;
	let mut reasons = Vec::new();
	let mut terms = Vec::with_capacity(5);

	let topic_match = latest.topic == ctx.input.topic;
	let topic_value = if topic_match { weights.topic_match } else { 0.0 };

	if topic_match {
		composite += topic_value;
		reasons.push("topic match".to_string());
	}

	terms.push(trace::term(
		"topic",
		topic_value,
		BTreeMap::from([
			("current".to_string(), json!(ctx.input.topic)),
			("candidate".to_string(), json!(latest.topic)),
		]),
	));

	let candidate_subtopics = subtopics::normalize_subtopics(&latest.subtopics);
	let subtopic_overlap = subtopics::count_overlap(ctx.subtopics, &candidate_subtopics);
	let subtopic_value = if subtopic_overlap > 0 && subtopic_overlap >= policy.min_subtopic_overlap
	{
		weights.subtopic_overlap * subtopic_overlap as f32
	} else {
		0.0
	};

	if subtopic_value > 0.0 {
		composite += subtopic_value;
		reasons.push(format!("{subtopic_overlap} shared subtopics"));
	}

	terms.push(trace::term(
		"subtopic_overlap",
		subtopic_value,
		BTreeMap::from([
			("overlap".to_string(), json!(subtopic_overlap)),
			(
				"shared".to_string(),
				json!(subtopics::shared_subtopics(ctx.subtopics, &candidate_subtopics)),
			),
			("min_overlap".to_string(), json!(policy.min_subtopic_overlap)),
		]),
	));

	let nuance =
		nuance::nuance_similarity(ctx.input.topic_nuance, &latest.topic_nuance, &policy.nuance);
	let nuance_applied = nuance.score >= policy.nuance.threshold;
	let ambiguous_applied = !nuance_applied && ctx.ambiguous_term.is_some();

	if nuance_applied {
		composite += nuance.score;
		reasons.push(format!("nuance aligned ({:.3})", nuance.score));
	} else if let Some(term) = ctx.ambiguous_term {
		composite += weights.ambiguous_reference;
		reasons.push(format!("ambiguous reference \"{term}\""));
	}

	terms.push(trace::term(
		"nuance",
		if nuance_applied { nuance.score } else { 0.0 },
		BTreeMap::from([
			("raw_ratio".to_string(), json!(nuance.raw_ratio)),
			("boost".to_string(), json!(nuance.boost)),
			("score".to_string(), json!(nuance.score)),
			("threshold".to_string(), json!(policy.nuance.threshold)),
		]),
	));
	terms.push(trace::term(
		"ambiguous_reference",
		if ambiguous_applied { weights.ambiguous_reference } else { 0.0 },
		BTreeMap::from([("term".to_string(), json!(ctx.ambiguous_term))]),
	));

	let embedding_similarity = ctx
		.embedding
		.map(|embedding| vector::cosine_similarity(embedding, &latest.embedding))
		.unwrap_or(0.0);
	let embedding_dominant =
		ctx.embedding.is_some() && embedding_similarity >= policy.embedding_threshold;
	let additive = composite;

	if embedding_dominant {
		composite = composite.max(embedding_similarity);
		reasons.push(format!("embedding similarity {embedding_similarity:.3}"));
	}

	terms.push(trace::term(
		"embedding_dominance",
		composite - additive,
		BTreeMap::from([
			("similarity".to_string(), json!(embedding_similarity)),
			("threshold".to_string(), json!(policy.embedding_threshold)),
			("additive_score".to_string(), json!(additive)),
		]),
	));

	SignalScores {
		topic_match,
		subtopic_overlap,
		nuance,
		nuance_applied,
		ambiguous_applied,
		embedding_similarity,
		embedding_dominant,
		emotion_shift: emotion_shift(ctx.input.sentiment, &latest.sentiment),
		composite,
		reasons,
		terms,
	}
}

pub(crate) fn emotion_shift(current: &str, previous: &str) -> bool {
	current != previous
}
