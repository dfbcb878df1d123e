//! HTTP surface: the `/emails` API and the inbox page.

use crate::client::MailboxClient;
use crate::error::Error;
use crate::message::{EmailDetail, Inbox};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// The inbox page, compiled into the binary.
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Body returned for every IMAP-side failure. The cause is logged only.
pub const FETCH_FAILED: &str = "Failed to fetch emails";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<MailboxClient>,
}

impl AppState {
    #[must_use]
    pub fn new(client: MailboxClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(|| async { "ok" }))
        .route("/emails", get(get_emails))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct EmailsQuery {
    uid: Option<String>,
}

/// Response for `GET /emails`: the listing, or one message (possibly
/// absent) when `uid` was given.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EmailsResponse {
    List(Inbox),
    Detail { email: Option<EmailDetail> },
}

/// Failure of a `GET /emails` request.
#[derive(Debug)]
pub enum ApiError {
    /// The `uid` parameter is not a valid UID.
    BadUid(String),
    /// Anything that went wrong talking to the IMAP server.
    Mailbox(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Mailbox(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadUid(raw) => (StatusCode::BAD_REQUEST, format!("Invalid uid: {raw}")),
            Self::Mailbox(e) => {
                error!("IMAP error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /emails[?uid=N]`
///
/// Without `uid` (or with an empty one) lists the inbox. With `uid`
/// returns `{ "email": ... }`, where `null` means no such message.
///
/// # Errors
///
/// [`ApiError::BadUid`] for a malformed `uid`, [`ApiError::Mailbox`]
/// for any IMAP failure.
pub async fn get_emails(
    State(state): State<AppState>,
    Query(query): Query<EmailsQuery>,
) -> Result<Json<EmailsResponse>, ApiError> {
    match parse_uid(query.uid.as_deref())? {
        Some(uid) => {
            let email = state.client.fetch_detail(uid).await?;
            info!(uid, found = email.is_some(), "served message detail");
            Ok(Json(EmailsResponse::Detail { email }))
        }
        None => {
            let inbox = state.client.list_inbox().await?;
            info!(
                count = inbox.emails.len(),
                total = inbox.total,
                "served inbox listing"
            );
            Ok(Json(EmailsResponse::List(inbox)))
        }
    }
}

fn parse_uid(raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadUid(value.to_string())),
    }
}
