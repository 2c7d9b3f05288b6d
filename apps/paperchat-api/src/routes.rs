use axum::{
	Json, Router,
	body::Bytes,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{
		IntoResponse, Response,
		sse::{Event, KeepAlive, Sse},
	},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};
use uuid::Uuid;

use crate::state::AppState;
use paperchat_service::{
	AskRequest, AskResponse, DeleteRequest, DeleteResponse, DeletionStep, Error,
	ListMessagesRequest, ListMessagesResponse, ListRequest, ListResponse, SubscribeRequest,
	UploadRequest, UploadResponse,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/documents", post(upload).get(list))
		.route("/v1/documents/{id}", delete(delete_document))
		.route("/v1/documents/{id}/ask", post(ask))
		.route("/v1/documents/{id}/messages", get(messages))
		.route("/v1/documents/{id}/events", get(events))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct UploadParams {
	name: String,
	mime_type: String,
}

async fn upload(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(params): Query<UploadParams>,
	body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let response = state
		.service
		.upload(
			UploadRequest {
				owner_id,
				name: params.name,
				mime_type: params.mime_type,
				data: body.to_vec(),
			},
			None,
		)
		.await?;

	Ok(Json(response))
}

async fn list(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ListResponse>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let response = state.service.list_documents(ListRequest { owner_id }).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct AskBody {
	question: String,
}

async fn ask(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(document_id): Path<Uuid>,
	Json(body): Json<AskBody>,
) -> Result<Json<AskResponse>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let response =
		state.service.ask(AskRequest { owner_id, document_id, question: body.question }).await?;

	Ok(Json(response))
}

async fn messages(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(document_id): Path<Uuid>,
) -> Result<Json<ListMessagesResponse>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let response =
		state.service.list_messages(ListMessagesRequest { owner_id, document_id }).await?;

	Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
struct DeleteBody {
	steps: Option<Vec<DeletionStep>>,
}

async fn delete_document(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(document_id): Path<Uuid>,
	body: Option<Json<DeleteBody>>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let steps = body.and_then(|Json(body)| body.steps);
	let response = state.service.delete(DeleteRequest { owner_id, document_id, steps }).await?;

	Ok(Json(response))
}

async fn events(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(document_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
	let owner_id = owner_from_headers(&state, &headers)?;
	let receiver = state.service.subscribe(SubscribeRequest { owner_id, document_id }).await?;
	let stream = WatchStream::new(receiver)
		.map(|snapshot| Event::default().event("snapshot").json_data(&snapshot));

	Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// The fronting session verifier injects `x-owner-id`; a blank or absent
/// header is an unauthenticated request. An optional static bearer token
/// additionally gates every route when configured.
fn owner_from_headers(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
	if let Some(expected) = state.service.cfg.security.api_auth_token.as_deref() {
		let authorized = headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(|token| token == expected)
			.unwrap_or(false);

		if !authorized {
			return Err(json_error(
				StatusCode::UNAUTHORIZED,
				"unauthenticated",
				"Missing or invalid bearer token.",
			));
		}
	}

	let owner_id = headers
		.get("x-owner-id")
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.unwrap_or_default();

	if owner_id.is_empty() {
		return Err(json_error(
			StatusCode::UNAUTHORIZED,
			"unauthenticated",
			"Missing x-owner-id header.",
		));
	}

	Ok(owner_id.to_string())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	upgrade_required: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	failed_steps: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	upgrade_required: Option<bool>,
	failed_steps: Option<Vec<String>>,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError {
		status,
		error_code: code.to_string(),
		message: message.into(),
		upgrade_required: None,
		failed_steps: None,
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::Unauthenticated =>
				json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string()),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message),
			Error::QuotaExceeded { denial } => ApiError {
				status: StatusCode::FORBIDDEN,
				error_code: "quota_exceeded".to_string(),
				message: denial.reason(),
				upgrade_required: Some(denial.upgrade_required()),
				failed_steps: None,
			},
			Error::Upstream { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "upstream_unavailable", err.to_string()),
			Error::PartialDeletion { failed } => ApiError {
				status: StatusCode::BAD_GATEWAY,
				error_code: "partial_deletion".to_string(),
				message: "Deletion left residue; retry the failed steps.".to_string(),
				upgrade_required: None,
				failed_steps: Some(
					failed.iter().map(|step| step.as_str().to_string()).collect(),
				),
			},
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::Storage { .. } | Error::Vector { .. } => {
				tracing::error!(error = %err, "Internal storage failure.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal",
					"Internal server error.",
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			upgrade_required: self.upgrade_required,
			failed_steps: self.failed_steps,
		};

		(self.status, Json(body)).into_response()
	}
}
