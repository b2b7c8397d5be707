//! HTTP surface: the submission endpoint and a health probe.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lettre::message::Mailbox;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::delivery::{DeliveryResult, Mailer, OutboundEmail};
use crate::draft::ContentDeriver;
use crate::error::{DraftError, ValidationError};
use crate::request::{EmailAddress, IncomingRequest, Upload};

/// Submission endpoint path.
pub const SUBMIT_PATH: &str = "/generate-and-send-opra/";

/// Application state shared across handlers. Immutable.
#[derive(Clone)]
pub struct AppState {
    pub deriver: Arc<dyn ContentDeriver>,
    pub mailer: Mailer,
    pub sender: Mailbox,
}

/// Build the Axum router.
pub fn opra_routes(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(generate_and_send))
        .route(SUBMIT_PATH.trim_end_matches('/'), post(generate_and_send))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "opra-mailer",
        "mode": state.deriver.mode(),
    }))
}

// ── Submission ──────────────────────────────────────────────────────────

/// Errors raised before delivery. Delivery failures are never errors here;
/// they come back as a `200` with `status: error`.
#[derive(Debug, thiserror::Error)]
enum ApiError {
    /// Unreadable or oversized body; carries axum's status for it.
    #[error("Malformed multipart body: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self {
        Self::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Multipart { status, .. } => *status,
            Self::Validation(_) | Self::Draft(DraftError::MissingField(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Draft(DraftError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Draft(DraftError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Draft(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(DeliveryResult::error(self.to_string()))).into_response()
    }
}

async fn generate_and_send(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let span = info_span!("opra_request", request_id = %Uuid::new_v4());
    match process(state, multipart).instrument(span).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DeliveryResult, ApiError> {
    let request = read_form(multipart?).await.inspect_err(|e| {
        warn!(error = %e, "Rejected submission");
    })?;

    info!(
        recipient = %request.recipient,
        filename = %request.document.filename,
        bytes = request.document.bytes.len(),
        mode = %state.deriver.mode(),
        "Received OPRA submission"
    );

    let draft = state.deriver.derive(&request).await.inspect_err(|e| {
        warn!(error = %e, "Content derivation failed");
    })?;

    let IncomingRequest {
        recipient,
        document,
        ..
    } = request;
    let email = OutboundEmail::new(state.sender.clone(), recipient, draft, document);

    Ok(state.mailer.deliver(email).await)
}

/// Collect the multipart fields into an [`IncomingRequest`].
///
/// The file part is read fully into memory.
async fn read_form(mut multipart: Multipart) -> Result<IncomingRequest, ApiError> {
    let mut clerk_email = None;
    let mut county = None;
    let mut municipality = None;
    let mut clerk_name = None;
    let mut document = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "clerk_email" => clerk_email = Some(field.text().await?),
            "county" => county = Some(field.text().await?),
            "municipality" => municipality = Some(field.text().await?),
            "clerk_name" => clerk_name = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    document = Some(Upload::new(filename, bytes.to_vec()));
                }
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let recipient =
        EmailAddress::new(clerk_email.ok_or(ValidationError::MissingField("clerk_email"))?)?;
    let document = document.ok_or(ValidationError::MissingFile)?;

    Ok(IncomingRequest {
        recipient,
        county,
        municipality,
        clerk_name,
        document,
    })
}
