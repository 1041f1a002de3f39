use serde::{Deserialize, Serialize};

use strand_index::{MessageFilter, MessageMatch, vector};

use crate::{Error, Result, StrandService, threads};

const DEFAULT_TOP_K: u32 = 5;
const MAX_TOP_K: u32 = 100;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchMessagesRequest {
	pub user_id: String,
	#[serde(default)]
	pub thread_id: Option<String>,
	/// Embedded with the provider when `embedding` is absent.
	#[serde(default)]
	pub query: Option<String>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchMessagesResponse {
	pub items: Vec<SearchMessageItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchMessageItem {
	pub event_id: uuid::Uuid,
	pub thread_id: String,
	pub text: String,
	pub similarity: f32,
}
impl From<MessageMatch> for SearchMessageItem {
	fn from(hit: MessageMatch) -> Self {
		Self {
			event_id: hit.event_id,
			thread_id: hit.thread_id,
			text: hit.text,
			similarity: hit.similarity,
		}
	}
}

impl StrandService {
	/// Nearest indexed messages of one user, optionally within one thread.
	pub async fn search_messages(
		&self,
		req: SearchMessagesRequest,
	) -> Result<SearchMessagesResponse> {
		threads::require("user_id", &req.user_id)?;

		let top_k = req.top_k.unwrap_or(DEFAULT_TOP_K);

		if top_k == 0 || top_k > MAX_TOP_K {
			return Err(Error::InvalidRequest {
				message: format!("top_k must be between 1 and {MAX_TOP_K}."),
			});
		}

		let query = match (req.embedding, req.query.as_deref().map(str::trim)) {
			(Some(embedding), _) if !embedding.is_empty() => embedding,
			(_, Some(text)) if !text.is_empty() => self.embed_text(text).await?.ok_or_else(|| {
				Error::InvalidRequest {
					message: "No embedding provider is configured; supply an embedding."
						.to_string(),
				}
			})?,
			_ => {
				return Err(Error::InvalidRequest {
					message: "Either query or embedding is required.".to_string(),
				});
			},
		};
		let dim = self.cfg.index.vector_dim as usize;

		if query.len() != dim {
			return Err(Error::InvalidRequest {
				message: format!("embedding must have {dim} dimensions."),
			});
		}

		let query = vector::try_normalize(&query).ok_or_else(|| Error::InvalidRequest {
			message: "embedding must be finite and non-zero.".to_string(),
		})?;
		let filter =
			MessageFilter { user_id: Some(&req.user_id), thread_id: req.thread_id.as_deref() };
		let hits = self.indexes().search_messages(&query, &filter, top_k as usize)?;

		let items = hits.into_iter().map(SearchMessageItem::from).collect();

		Ok(SearchMessagesResponse { items })
	}
}
