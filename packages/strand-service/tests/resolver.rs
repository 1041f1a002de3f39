use std::sync::atomic::{AtomicUsize, Ordering};

use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use strand_index::Indexes;
use strand_service::{
	DecisionState, Error, ResolutionMethod, ResolveContext, ResolveInput, ResolverPolicy, Result,
	ThreadDecision, ThreadIdMinter, resolve::CandidateSource, resolve_thread,
};
use strand_storage::{EventLog, MemoryEventLog, MessageEvent};

const NOW: OffsetDateTime = datetime!(2026-05-10 12:00 UTC);
const DIM: usize = 3;

#[derive(Default)]
struct SequentialIds(AtomicUsize);
impl ThreadIdMinter for SequentialIds {
	fn mint(&self) -> String {
		format!("new-{}", self.0.fetch_add(1, Ordering::SeqCst))
	}
}

struct Fixture {
	log: MemoryEventLog,
	indexes: Indexes,
	policy: ResolverPolicy,
	minter: SequentialIds,
}
impl Fixture {
	fn new() -> Self {
		Self {
			log: MemoryEventLog::new(),
			indexes: Indexes::new(DIM).expect("indexes"),
			policy: ResolverPolicy::default(),
			minter: SequentialIds::default(),
		}
	}

	fn seed(&mut self, prior: Prior<'_>) {
		let event = MessageEvent {
			event_id: Uuid::new_v4(),
			user_id: prior.user_id.to_string(),
			timestamp: NOW - Duration::days(prior.days_ago),
			thread_id: prior.thread_id.to_string(),
			message_text: format!("{} message", prior.thread_id),
			topic: prior.topic.to_string(),
			topic_nuance: prior.nuance.to_string(),
			subtopics: prior.subtopics.iter().map(|s| s.to_string()).collect(),
			sentiment: prior.sentiment.to_string(),
			embedding: prior.embedding.to_vec(),
			resolved: prior.resolved,
			resolved_at: None,
			content_hash: Uuid::new_v4().to_string(),
			summary: None,
		};
		let first = !self.log.thread_exists(prior.user_id, prior.thread_id).expect("exists");

		self.log.append(event).expect("append");

		if first && !prior.embedding.is_empty() {
			self.indexes
				.insert_thread_signature(prior.thread_id, prior.user_id, prior.embedding)
				.expect("signature");
		}
	}

	fn resolve(&self, message: &Message<'_>) -> Result<ThreadDecision> {
		self.resolve_with(message, true)
	}

	fn resolve_with(&self, message: &Message<'_>, record_trace: bool) -> Result<ThreadDecision> {
		let ctx = ResolveContext {
			log: &self.log,
			indexes: &self.indexes,
			policy: &self.policy,
			minter: &self.minter,
		};
		let subtopics: Vec<String> = message.subtopics.iter().map(|s| s.to_string()).collect();
		let input = ResolveInput {
			user_id: message.user_id,
			message_text: message.text,
			topic: message.topic,
			topic_nuance: message.nuance,
			subtopics: &subtopics,
			sentiment: message.sentiment,
			embedding: message.embedding,
			timestamp: NOW,
		};

		resolve_thread(&ctx, &input, record_trace)
	}
}

#[derive(Clone, Copy)]
struct Prior<'a> {
	user_id: &'a str,
	thread_id: &'a str,
	days_ago: i64,
	topic: &'a str,
	nuance: &'a str,
	subtopics: &'a [&'a str],
	sentiment: &'a str,
	embedding: &'a [f32],
	resolved: bool,
}
impl Default for Prior<'_> {
	fn default() -> Self {
		Self {
			user_id: "u1",
			thread_id: "t1",
			days_ago: 1,
			topic: "work",
			nuance: "deadline stress",
			subtopics: &[],
			sentiment: "anxious",
			embedding: &[],
			resolved: false,
		}
	}
}

#[derive(Clone, Copy)]
struct Message<'a> {
	user_id: &'a str,
	text: &'a str,
	topic: &'a str,
	nuance: &'a str,
	subtopics: &'a [&'a str],
	sentiment: &'a str,
	embedding: Option<&'a [f32]>,
}
impl Default for Message<'_> {
	fn default() -> Self {
		Self {
			user_id: "u1",
			text: "Feeling drained again today.",
			topic: "health",
			nuance: "feeling drained",
			subtopics: &[],
			sentiment: "anxious",
			embedding: None,
		}
	}
}

const CLOSE: &[f32] = &[0.9, 0.435_889_9, 0.0];
const AXIS: &[f32] = &[1.0, 0.0, 0.0];

#[test]
fn fast_path_returns_latest_same_topic_thread_without_scoring() {
	let mut fx = Fixture::new();

	fx.seed(Prior { thread_id: "t1", topic: "sleep", days_ago: 5, ..Prior::default() });
	fx.seed(Prior { thread_id: "t2", topic: "sleep", days_ago: 2, ..Prior::default() });

	let decision = fx
		.resolve(&Message { topic: "sleep", sentiment: "hopeful", ..Message::default() })
		.expect("resolve");
	let trace = decision.trace.expect("trace");

	assert_eq!(decision.thread_id, "t2");
	assert_eq!(decision.method, ResolutionMethod::FastPath);
	assert_eq!(decision.state, DecisionState::Accepted);
	assert!(decision.reference_past_issue);
	assert!(decision.intensifying);
	assert_eq!(decision.score, None);
	assert_eq!(trace.candidates.len(), 1);
	assert_eq!(trace.candidates[0].sources, vec![CandidateSource::FastPath]);
	assert!(trace.candidates[0].terms.is_empty());
}

#[test]
fn events_outside_the_window_produce_no_candidates() {
	let mut fx = Fixture::new();

	fx.seed(Prior { topic: "sleep", days_ago: 45, embedding: AXIS, ..Prior::default() });

	let decision = fx
		.resolve(&Message { topic: "sleep", embedding: Some(AXIS), ..Message::default() })
		.expect("resolve");
	let trace = decision.trace.expect("trace");

	assert_eq!(decision.thread_id, "new-0");
	assert_eq!(decision.state, DecisionState::NewThread);
	assert!(!decision.intensifying);
	assert_eq!(trace.candidates.len(), 1);
	assert_eq!(trace.candidates[0].skipped.as_deref(), Some("outside_recency_window"));
	assert_eq!(trace.candidates[0].sources, vec![CandidateSource::Signature]);
}

#[test]
fn guardrail_accepts_exact_score_and_rejects_just_below() {
	let message =
		Message { text: "Is it getting worse?", nuance: "headache", ..Message::default() };
	let mut fx = Fixture::new();

	fx.seed(Prior::default());
	fx.policy.weights.ambiguous_reference = 0.75;

	let accepted = fx.resolve(&message).expect("resolve");

	assert_eq!(accepted.thread_id, "t1");
	assert_eq!(accepted.score, Some(0.75));
	assert!(accepted.trace.expect("trace").ambiguous_reference);

	fx.policy.weights.ambiguous_reference = 0.749;

	let rejected = fx.resolve(&message).expect("resolve");

	assert_eq!(rejected.state, DecisionState::NewThread);
	assert_eq!(rejected.thread_id, "new-0");
}

#[test]
fn embedding_dominance_respects_the_threshold() {
	let mut fx = Fixture::new();

	fx.seed(Prior { embedding: AXIS, ..Prior::default() });

	let message = Message { embedding: Some(CLOSE), ..Message::default() };
	let accepted = fx.resolve(&message).expect("resolve");
	let score = accepted.score.expect("score");
	let trace = accepted.trace.expect("trace");

	assert_eq!(accepted.thread_id, "t1");
	assert!((score - 0.9).abs() < 1e-4);
	assert!(!accepted.intensifying);
	assert!(trace.candidates[0].accepted);
	assert_eq!(
		trace.candidates[0].sources,
		vec![CandidateSource::Signature, CandidateSource::Recent, CandidateSource::Latest]
	);
	assert!((trace.best_similarity.expect("similarity") - 0.9).abs() < 1e-4);

	fx.policy.embedding_threshold = 0.95;

	let stricter = fx.resolve(&message).expect("resolve");

	assert_eq!(stricter.state, DecisionState::NewThread);
}

#[test]
fn missing_or_unusable_embeddings_score_zero() {
	let mut fx = Fixture::new();

	fx.seed(Prior { embedding: AXIS, ..Prior::default() });

	let missing = fx.resolve(&Message::default()).expect("resolve");
	let zero = fx.resolve(&Message { embedding: Some(&[0.0, 0.0, 0.0][..]), ..Message::default() });
	let empty = fx.resolve(&Message { embedding: Some(&[][..]), ..Message::default() });

	assert_eq!(missing.state, DecisionState::NewThread);
	assert!(!missing.trace.expect("trace").has_embedding);
	assert_eq!(zero.expect("resolve").state, DecisionState::NewThread);
	assert_eq!(empty.expect("resolve").state, DecisionState::NewThread);
}

#[test]
fn embedding_dimension_mismatch_is_fatal() {
	let mut fx = Fixture::new();

	fx.seed(Prior { embedding: AXIS, ..Prior::default() });

	let err = fx
		.resolve(&Message { embedding: Some(&[1.0, 0.0][..]), ..Message::default() })
		.expect_err("mismatch");

	assert!(matches!(err, Error::Index { .. }));
}

#[test]
fn additive_signals_accept_and_report_thread_state() {
	let mut fx = Fixture::new();

	fx.seed(Prior {
		topic: "sleep",
		nuance: "trouble falling asleep at night",
		subtopics: &["caffeine", "naps", "routine"],
		resolved: true,
		..Prior::default()
	});

	let decision = fx
		.resolve(&Message {
			topic: "rest",
			nuance: "trouble falling asleep",
			subtopics: &["caffeine", "naps"],
			sentiment: "frustrated",
			..Message::default()
		})
		.expect("resolve");
	let score = decision.score.expect("score");

	assert_eq!(decision.thread_id, "t1");
	assert!((score - (0.2 + 0.830_188_7 + 0.15)).abs() < 1e-4);
	assert!(decision.intensifying);
	assert!(decision.reference_past_issue);

	let reasons = &decision.trace.expect("trace").candidates[0].reasons;

	assert!(reasons.iter().any(|reason| reason == "2 shared subtopics"));
}

#[test]
fn subtopic_minimum_gates_the_overlap_term() {
	let mut fx = Fixture::new();

	fx.seed(Prior { subtopics: &["caffeine", "naps"], ..Prior::default() });
	fx.policy.weights.subtopic_overlap = 0.4;

	let message = Message { subtopics: &["caffeine", "naps"], ..Message::default() };

	assert_eq!(fx.resolve(&message).expect("resolve").score, Some(0.8));

	fx.policy.min_subtopic_overlap = 3;

	assert_eq!(fx.resolve(&message).expect("resolve").state, DecisionState::NewThread);
}

#[test]
fn ties_keep_the_first_candidate() {
	let mut fx = Fixture::new();

	fx.seed(Prior { thread_id: "t1", days_ago: 3, embedding: AXIS, ..Prior::default() });
	fx.seed(Prior { thread_id: "t2", days_ago: 1, embedding: AXIS, ..Prior::default() });

	let decision =
		fx.resolve(&Message { embedding: Some(CLOSE), ..Message::default() }).expect("resolve");
	let trace = decision.trace.expect("trace");

	assert_eq!(decision.thread_id, "t1");
	assert_eq!(trace.candidates.len(), 2);
	assert_eq!(trace.candidates[0].composite, trace.candidates[1].composite);
	assert!(trace.candidates[0].accepted);
	assert!(!trace.candidates[1].accepted);
}

#[test]
fn other_users_threads_are_never_candidates() {
	let mut fx = Fixture::new();

	fx.seed(Prior { user_id: "u2", topic: "health", embedding: AXIS, ..Prior::default() });

	let decision =
		fx.resolve(&Message { embedding: Some(AXIS), ..Message::default() }).expect("resolve");

	assert_eq!(decision.state, DecisionState::NewThread);
	assert!(decision.trace.expect("trace").candidates.is_empty());
}

#[test]
fn minted_ids_never_collide_with_existing_threads() {
	let mut fx = Fixture::new();

	fx.seed(Prior { thread_id: "new-0", days_ago: 90, ..Prior::default() });

	let decision = fx.resolve(&Message::default()).expect("resolve");

	assert_eq!(decision.thread_id, "new-1");
}

#[test]
fn resolution_is_deterministic_for_existing_threads() {
	let mut fx = Fixture::new();

	fx.seed(Prior { embedding: AXIS, ..Prior::default() });
	fx.seed(Prior {
		thread_id: "t2",
		topic: "finance",
		embedding: &[0.0, 1.0, 0.0],
		..Prior::default()
	});

	let message = Message { embedding: Some(CLOSE), ..Message::default() };
	let first = fx.resolve(&message).expect("resolve");
	let second = fx.resolve(&message).expect("resolve");

	assert_eq!(first.thread_id, second.thread_id);
	assert_eq!(first.score, second.score);
}

#[test]
fn trace_recording_does_not_change_decisions() {
	let seeded = || {
		let mut fx = Fixture::new();

		fx.seed(Prior {
			thread_id: "t1",
			topic: "sleep",
			nuance: "trouble falling asleep",
			embedding: AXIS,
			days_ago: 2,
			..Prior::default()
		});
		fx.seed(Prior {
			thread_id: "t2",
			topic: "work",
			embedding: &[0.0, 0.0, 1.0],
			days_ago: 1,
			..Prior::default()
		});

		fx
	};
	let cases = [
		(
			Message { topic: "sleep", sentiment: "hopeful", ..Message::default() },
			DecisionState::Accepted,
		),
		(Message { embedding: Some(CLOSE), ..Message::default() }, DecisionState::Accepted),
		(
			Message {
				topic: "finance",
				nuance: "rent went up",
				embedding: Some(&[0.0, 1.0, 0.0][..]),
				..Message::default()
			},
			DecisionState::NewThread,
		),
	];

	for (message, expected_state) in cases {
		let traced = seeded().resolve_with(&message, true).expect("resolve");
		let untraced = seeded().resolve_with(&message, false).expect("resolve");

		assert_eq!(traced.state, expected_state);
		assert!(traced.trace.is_some());
		assert!(untraced.trace.is_none());
		assert_eq!(traced.thread_id, untraced.thread_id);
		assert_eq!(traced.score, untraced.score);
		assert_eq!(traced.intensifying, untraced.intensifying);
		assert_eq!(traced.reference_past_issue, untraced.reference_past_issue);
		assert_eq!(traced.method, untraced.method);
		assert_eq!(traced.state, untraced.state);
	}
}
