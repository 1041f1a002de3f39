use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub resolver: Resolver,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	/// Optional. Admin routes are mounted on the main listener when unset.
	pub admin_bind: Option<String>,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Index {
	pub vector_dim: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	/// Optional. Without a provider, callers must supply embeddings or resolve without them.
	pub embedding: Option<EmbeddingProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Thread resolution policy. Every weight and threshold used by the scorer lives here.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Resolver {
	pub embedding_threshold: f32,
	pub recency_window_days: i64,
	pub guardrail_score: f32,
	pub min_subtopic_overlap: u32,
	pub signature_top_k: u32,
	pub recent_event_limit: u32,
	pub include_latest_thread: bool,
	pub nuance: ResolverNuance,
	pub weights: ResolverWeights,
}
impl Default for Resolver {
	fn default() -> Self {
		Self {
			embedding_threshold: 0.82,
			recency_window_days: 30,
			guardrail_score: 0.75,
			min_subtopic_overlap: 1,
			signature_top_k: 5,
			recent_event_limit: 10,
			include_latest_thread: true,
			nuance: ResolverNuance::default(),
			weights: ResolverWeights::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverNuance {
	pub threshold: f32,
	pub short_boost: f32,
	pub short_max_words: u32,
	pub boost_min_ratio: f32,
}
impl Default for ResolverNuance {
	fn default() -> Self {
		Self { threshold: 0.6, short_boost: 0.15, short_max_words: 5, boost_min_ratio: 0.5 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverWeights {
	pub topic_match: f32,
	pub subtopic_overlap: f32,
	pub ambiguous_reference: f32,
}
impl Default for ResolverWeights {
	fn default() -> Self {
		Self { topic_match: 0.5, subtopic_overlap: 0.1, ambiguous_reference: 0.3 }
	}
}
