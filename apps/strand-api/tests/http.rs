use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use strand_api::{routes, state::AppState};
use strand_config::{Config, Index, Providers, Resolver, Service};

fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: None,
			log_level: "info".to_string(),
		},
		index: Index { vector_dim: 3 },
		providers: Providers { embedding: None },
		resolver: Resolver::default(),
	}
}

fn app() -> Router {
	let state = AppState::new(test_config()).expect("Failed to initialize app state.");

	routes::router(state.clone()).merge(routes::admin_router(state))
}

async fn call(
	app: &Router,
	method: &str,
	uri: &str,
	payload: Option<Value>,
) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match payload {
		Some(payload) => builder
			.header("content-type", "application/json")
			.body(Body::from(payload.to_string())),
		None => builder.body(Body::empty()),
	}
	.expect("Failed to build request.");
	let response = app.clone().oneshot(request).await.expect("Failed to call the router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if body.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&body).expect("Failed to parse response.")
	};

	(status, json)
}

fn message(text: &str, topic: &str, timestamp: &str, embedding: [f32; 3]) -> Value {
	serde_json::json!({
		"user_id": "u1",
		"message_text": text,
		"topic": topic,
		"topic_nuance": "trouble falling asleep",
		"subtopics": ["caffeine"],
		"sentiment": "anxious",
		"timestamp": timestamp,
		"embedding": embedding,
	})
}

#[tokio::test]
async fn health_ok() {
	let (status, _) = call(&app(), "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ingest_then_continue_and_list_thread() {
	let app = app();
	let (status, first) = call(
		&app,
		"POST",
		"/v1/messages",
		Some(message("I can't sleep.", "sleep", "2026-07-01T22:00:00Z", [1.0, 0.0, 0.0])),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(first["state"], "new_thread");
	assert_eq!(first["first_message"], true);

	let thread_id = first["thread_id"].as_str().expect("thread_id").to_string();
	let (status, second) = call(
		&app,
		"POST",
		"/v1/messages",
		Some(message("Still awake at 3am.", "sleep", "2026-07-02T03:00:00Z", [1.0, 0.1, 0.0])),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(second["thread_id"], thread_id.as_str());
	assert_eq!(second["method"], "fast_path");
	assert_eq!(second["reference_past_issue"], true);

	let (status, listing) =
		call(&app, "GET", &format!("/v1/users/u1/threads/{thread_id}/messages"), None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(listing["messages"].as_array().map(Vec::len), Some(2));
	assert_eq!(listing["messages"][0]["message_text"], "I can't sleep.");

	let (status, stats) = call(&app, "GET", "/v1/admin/index_stats", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(stats["messages"], 2);
	assert_eq!(stats["signatures"], 1);
}

#[tokio::test]
async fn duplicate_messages_are_flagged() {
	let app = app();
	let payload = message("I can't sleep.", "sleep", "2026-07-01T22:00:00Z", [1.0, 0.0, 0.0]);
	let (_, first) = call(&app, "POST", "/v1/messages", Some(payload.clone())).await;
	let (status, second) = call(&app, "POST", "/v1/messages", Some(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(second["duplicate"], true);
	assert_eq!(second["thread_id"], first["thread_id"]);
}

#[tokio::test]
async fn empty_message_is_a_bad_request() {
	let app = app();
	let (status, body) = call(
		&app,
		"POST",
		"/v1/messages",
		Some(message("   ", "sleep", "2026-07-01T22:00:00Z", [1.0, 0.0, 0.0])),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn resolve_returns_a_trace_without_persisting() {
	let app = app();
	let mut payload = message("Rent again.", "finance", "2026-07-01T22:00:00Z", [0.0, 0.0, 1.0]);

	payload["trace"] = Value::Bool(true);

	let (status, decision) = call(&app, "POST", "/v1/threads/resolve", Some(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(decision["state"], "new_thread");
	assert_eq!(decision["trace"]["schema"], "thread_resolution_trace/v1");

	let (_, stats) = call(&app, "GET", "/v1/admin/index_stats", None).await;

	assert_eq!(stats["messages"], 0);
}

#[tokio::test]
async fn closing_an_unknown_thread_is_not_found() {
	let app = app();
	let payload = serde_json::json!({ "user_id": "u1", "thread_id": "missing" });
	let (status, body) = call(&app, "POST", "/v1/threads/close", Some(payload)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn reset_clears_indexes() {
	let app = app();

	call(
		&app,
		"POST",
		"/v1/messages",
		Some(message("I can't sleep.", "sleep", "2026-07-01T22:00:00Z", [1.0, 0.0, 0.0])),
	)
	.await;

	let (status, stats) = call(&app, "POST", "/v1/admin/reset_indexes", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(stats["messages"], 0);

	let (status, report) = call(&app, "POST", "/v1/admin/rebuild_indexes", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(report["messages"], 1);
	assert_eq!(report["signatures"], 1);
}

#[tokio::test]
async fn message_search_by_embedding() {
	let app = app();

	call(
		&app,
		"POST",
		"/v1/messages",
		Some(message("I can't sleep.", "sleep", "2026-07-01T22:00:00Z", [1.0, 0.0, 0.0])),
	)
	.await;

	let payload = serde_json::json!({ "user_id": "u1", "embedding": [1.0, 0.0, 0.0], "top_k": 3 });
	let (status, body) = call(&app, "POST", "/v1/messages/search", Some(payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["items"][0]["text"], "I can't sleep.");
}
