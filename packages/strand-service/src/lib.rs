pub mod admin;
pub mod ingest;
pub mod resolve;
pub mod search;
pub mod threads;

mod error;
mod locks;

pub use admin::RebuildReport;
pub use error::{Error, Result};
pub use ingest::{IngestMessageRequest, IngestMessageResponse, ResolveThreadRequest};
pub use resolve::{
	DecisionState, ResolutionMethod, ResolutionTrace, ResolveContext, ResolveInput,
	ResolverOverrides, ResolverPolicy, ThreadDecision, resolve_thread,
};
pub use search::{SearchMessageItem, SearchMessagesRequest, SearchMessagesResponse};
pub use strand_index::IndexStats;
pub use threads::{
	CloseThreadRequest, CloseThreadResponse, ThreadMessage, ThreadMessagesResponse,
};

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use strand_config::{Config, EmbeddingProviderConfig};
use strand_index::Indexes;
use strand_providers::embedding;
use strand_storage::EventLog;

use crate::locks::UserLocks;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Source of fresh thread ids.
pub trait ThreadIdMinter
where
	Self: Send + Sync,
{
	fn mint(&self) -> String;
}

/// UUID v4 thread ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomThreadIds;
impl ThreadIdMinter for RandomThreadIds {
	fn mint(&self) -> String {
		uuid::Uuid::new_v4().to_string()
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

pub struct StrandService {
	pub cfg: Config,
	pub log: Arc<dyn EventLog>,
	pub providers: Providers,
	indexes: RwLock<Indexes>,
	minter: Arc<dyn ThreadIdMinter>,
	locks: UserLocks,
}
impl StrandService {
	pub fn new(cfg: Config, log: Arc<dyn EventLog>, providers: Providers) -> Result<Self> {
		let indexes = Indexes::new(cfg.index.vector_dim as usize)?;

		Ok(Self {
			cfg,
			log,
			providers,
			indexes: RwLock::new(indexes),
			minter: Arc::new(RandomThreadIds),
			locks: UserLocks::default(),
		})
	}

	pub fn with_minter(mut self, minter: Arc<dyn ThreadIdMinter>) -> Self {
		self.minter = minter;

		self
	}

	pub(crate) fn indexes(&self) -> RwLockReadGuard<'_, Indexes> {
		self.indexes.read().unwrap_or_else(|err| err.into_inner())
	}

	pub(crate) fn indexes_mut(&self) -> RwLockWriteGuard<'_, Indexes> {
		self.indexes.write().unwrap_or_else(|err| err.into_inner())
	}

	/// Embeds one text with the configured provider. `None` when no provider is configured.
	pub(crate) async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>> {
		let Some(cfg) = self.cfg.providers.embedding.as_ref() else { return Ok(None) };
		let texts = vec![text.to_string()];
		let mut vectors = self.providers.embedding.embed(cfg, &texts).await?;

		if vectors.len() != 1 {
			return Err(Error::Provider {
				message: format!("Expected one embedding, got {}.", vectors.len()),
			});
		}

		Ok(vectors.pop())
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
