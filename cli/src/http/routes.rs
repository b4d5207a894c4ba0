//! HTTP route handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use futures::{Stream, StreamExt};
use ocbridge_core::api::{CompletionError, CompletionStream};
use uuid::Uuid;

use crate::http::{models::*, prompt::build_prompt, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions_handler))
        .route("/v1/models", get(models_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn new_completion_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..8])
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

fn fail(state: &AppState, e: CompletionError) -> HttpServerError {
    state.record_error();
    tracing::error!(target: "ocbridge.http", code = e.code(), error = %e, "completion failed");
    HttpServerError::Completion(e)
}

/// POST /v1/chat/completions
#[tracing::instrument(
    name = "chat_completions",
    skip_all,
    fields(completion_id = tracing::field::Empty, stream = tracing::field::Empty)
)]
async fn chat_completions_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, HttpServerError> {
    state.record_request("/v1/chat/completions");

    let Json(req) = payload.map_err(|rejection| {
        state.record_error();
        HttpServerError::InvalidRequest(rejection.body_text())
    })?;

    let completion_id = new_completion_id();
    let span = tracing::Span::current();
    span.record("completion_id", completion_id.as_str());
    span.record("stream", req.is_stream());

    let prompt = build_prompt(&req.messages);
    tracing::info!(
        target: "ocbridge.http",
        requested_model = %req.model,
        model = %state.model(),
        messages = req.messages.len(),
        prompt_len = prompt.len(),
        "chat completion request"
    );
    if req.temperature.is_some() || req.max_tokens.is_some() || req.tools.is_some() {
        tracing::debug!(target: "ocbridge.http", "sampling and tool parameters are ignored");
    }

    let mut stream = state.driver.produce_completion(&prompt);

    if req.is_stream() {
        // Wait for the first character so a failed launch is still a plain 500
        // rather than an event stream that ends immediately.
        let first = match stream.next().await {
            Some(Ok(ch)) => Some(ch),
            Some(Err(e)) => return Err(fail(&state, e)),
            None => None,
        };
        let body = sse_events(completion_id, req.model, first, stream);
        return Ok(Sse::new(body).into_response());
    }

    let mut content = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(ch) => content.push(ch),
            Err(e) if content.is_empty() => return Err(fail(&state, e)),
            Err(e) => {
                tracing::warn!(target: "ocbridge.http", error = %e, "completion ended early");
                break;
            }
        }
    }
    tracing::info!(target: "ocbridge.http", chars = content.chars().count(), "completion finished");

    Ok(Json(ChatCompletion::new(completion_id, req.model, unix_now(), content)).into_response())
}

/// Role chunk, one chunk per character, stop chunk, then `[DONE]`.
///
/// Dropping the returned stream (client gone) drops `rest`, which terminates
/// the opencode process.
fn sse_events(
    id: String,
    model: String,
    first: Option<char>,
    mut rest: CompletionStream,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let created = unix_now();
    async_stream::stream! {
        yield Event::default().json_data(ChatCompletionChunk::role(&id, &model, created));

        let mut sent = 0u64;
        if let Some(ch) = first {
            yield Event::default().json_data(ChatCompletionChunk::content(&id, &model, created, ch));
            sent += 1;
            while let Some(item) = rest.next().await {
                match item {
                    Ok(ch) => {
                        yield Event::default().json_data(ChatCompletionChunk::content(&id, &model, created, ch));
                        sent += 1;
                    }
                    Err(e) => {
                        // No error frame exists mid-stream; end it cleanly.
                        tracing::warn!(target: "ocbridge.http", completion_id = %id, error = %e, "stream ended early");
                        break;
                    }
                }
            }
        }

        yield Event::default().json_data(ChatCompletionChunk::stop(&id, &model, created));
        yield Ok(Event::default().data("[DONE]"));
        tracing::info!(target: "ocbridge.http", completion_id = %id, chars = sent, "stream finished");
    }
}

/// GET /v1/models
async fn models_handler(State(state): State<AppState>) -> Json<ModelList> {
    state.record_request("/v1/models");
    Json(ModelList {
        object: "list",
        data: vec![ModelCard {
            id: state.model().to_string(),
            object: "model",
            created: unix_now(),
            owned_by: "opencode",
        }],
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.stats();

    Json(HealthResponse {
        status: "healthy".into(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total,
        requests_by_endpoint: stats.requests_by_endpoint.clone(),
        errors_total: stats.errors_total,
        timestamp: Local::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_ids_are_short_hex() {
        let id = new_completion_id();
        let suffix = id.strip_prefix("chatcmpl-").expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_completion_id());
    }
}
