use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use strand_service::{
	CloseThreadRequest, CloseThreadResponse, Error, IndexStats, IngestMessageRequest,
	IngestMessageResponse, RebuildReport, ResolveThreadRequest, SearchMessagesRequest,
	SearchMessagesResponse, ThreadDecision, ThreadMessagesResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/messages", post(ingest_message))
		.route("/v1/messages/search", post(search_messages))
		.route("/v1/threads/resolve", post(resolve_thread))
		.route("/v1/threads/close", post(close_thread))
		.route("/v1/users/{user_id}/threads/{thread_id}/messages", get(thread_messages))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/reset_indexes", post(reset_indexes))
		.route("/v1/admin/rebuild_indexes", post(rebuild_indexes))
		.route("/v1/admin/index_stats", get(index_stats))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn ingest_message(
	State(state): State<AppState>,
	Json(payload): Json<IngestMessageRequest>,
) -> Result<Json<IngestMessageResponse>, ApiError> {
	let response = state.service.ingest_message(payload).await?;

	Ok(Json(response))
}

async fn resolve_thread(
	State(state): State<AppState>,
	Json(payload): Json<ResolveThreadRequest>,
) -> Result<Json<ThreadDecision>, ApiError> {
	let response = state.service.resolve_only(payload).await?;

	Ok(Json(response))
}

async fn close_thread(
	State(state): State<AppState>,
	Json(payload): Json<CloseThreadRequest>,
) -> Result<Json<CloseThreadResponse>, ApiError> {
	let response = state.service.close_thread(payload).await?;

	Ok(Json(response))
}

async fn thread_messages(
	State(state): State<AppState>,
	Path((user_id, thread_id)): Path<(String, String)>,
) -> Result<Json<ThreadMessagesResponse>, ApiError> {
	let response = state.service.thread_messages(&user_id, &thread_id)?;

	Ok(Json(response))
}

async fn search_messages(
	State(state): State<AppState>,
	Json(payload): Json<SearchMessagesRequest>,
) -> Result<Json<SearchMessagesResponse>, ApiError> {
	let response = state.service.search_messages(payload).await?;

	Ok(Json(response))
}

async fn reset_indexes(State(state): State<AppState>) -> Json<IndexStats> {
	Json(state.service.reset_indexes())
}

async fn rebuild_indexes(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let response = state.service.rebuild_indexes()?;

	Ok(Json(response))
}

async fn index_stats(State(state): State<AppState>) -> Json<IndexStats> {
	Json(state.service.index_stats())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			Error::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None),
			Error::Storage { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message, None),
			Error::Index { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "INDEX_ERROR", message, None),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
