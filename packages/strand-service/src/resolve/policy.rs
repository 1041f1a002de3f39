use serde::{Deserialize, Serialize};
use time::Duration;

use strand_config::{Resolver, ResolverNuance, ResolverWeights};
use strand_storage::EventLog;

use crate::{Error, Result, ThreadIdMinter};

const MAX_MINT_ATTEMPTS: usize = 8;

/// Per-call adjustments on top of the configured resolver policy.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ResolverOverrides {
	pub embedding_threshold: Option<f32>,
	pub recency_window_days: Option<i64>,
	pub guardrail_score: Option<f32>,
	pub min_subtopic_overlap: Option<u32>,
}

/// Every weight and threshold one resolution call uses.
#[derive(Clone, Debug)]
pub struct ResolverPolicy {
	pub embedding_threshold: f32,
	pub recency_window_days: i64,
	pub guardrail_score: f32,
	pub min_subtopic_overlap: usize,
	pub signature_top_k: usize,
	pub recent_event_limit: usize,
	pub include_latest_thread: bool,
	pub nuance: ResolverNuance,
	pub weights: ResolverWeights,
}
impl ResolverPolicy {
	pub fn new(cfg: &Resolver, overrides: &ResolverOverrides) -> Result<Self> {
		let mut resolver = cfg.clone();

		if let Some(threshold) = overrides.embedding_threshold {
			resolver.embedding_threshold = threshold;
		}
		if let Some(days) = overrides.recency_window_days {
			resolver.recency_window_days = days;
		}
		if let Some(guardrail) = overrides.guardrail_score {
			resolver.guardrail_score = guardrail;
		}
		if let Some(min_overlap) = overrides.min_subtopic_overlap {
			resolver.min_subtopic_overlap = min_overlap;
		}

		strand_config::validate_resolver(&resolver)?;

		Ok(Self::from(resolver))
	}

	/// `None` when the day count does not fit a `Duration`.
	pub fn recency_window(&self) -> Option<Duration> {
		i32::try_from(self.recency_window_days)
			.ok()
			.and_then(|days| Duration::DAY.checked_mul(days))
	}
}
impl From<Resolver> for ResolverPolicy {
	fn from(cfg: Resolver) -> Self {
		Self {
			embedding_threshold: cfg.embedding_threshold,
			recency_window_days: cfg.recency_window_days,
			guardrail_score: cfg.guardrail_score,
			min_subtopic_overlap: cfg.min_subtopic_overlap as usize,
			signature_top_k: cfg.signature_top_k as usize,
			recent_event_limit: cfg.recent_event_limit as usize,
			include_latest_thread: cfg.include_latest_thread,
			nuance: cfg.nuance,
			weights: cfg.weights,
		}
	}
}
impl Default for ResolverPolicy {
	fn default() -> Self {
		Self::from(Resolver::default())
	}
}

/// Resolution state machine. Calls start in `NoCandidate` and end in `Accepted` or `NewThread`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
	NoCandidate,
	Scoring,
	Accepted,
	NewThread,
}
impl DecisionState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Accepted | Self::NewThread)
	}
}

/// Guardrail rule: the score must clear the floor and beat the best accepted score so far.
pub fn accepts(score: f32, best_score: f32, guardrail: f32) -> bool {
	score >= guardrail && score > best_score
}

/// Mints a thread id the user does not own yet.
pub(crate) fn mint_thread_id(
	log: &dyn EventLog,
	user_id: &str,
	minter: &dyn ThreadIdMinter,
) -> Result<String> {
	for _ in 0..MAX_MINT_ATTEMPTS {
		let thread_id = minter.mint();

		if !log.thread_exists(user_id, &thread_id)? {
			return Ok(thread_id);
		}

		tracing::warn!(user_id, thread_id = %thread_id, "Minted thread id collides; retrying.");
	}

	Err(Error::Conflict {
		message: format!("Could not mint an unused thread id for user {user_id}."),
	})
}
