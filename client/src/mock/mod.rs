//! Mock collaborator server.
//!
//! Serves the three routes of the drafting service with canned answers so
//! the client can be developed and tested without the real backend.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                       |
//! |--------|---------------------------------|-----------------------------------|
//! | GET    | `/health`                       | Health check                      |
//! | POST   | `/api/services/email-draft/`    | Multipart `file` → two sample leads |
//! | POST   | `/api/services/email-refactor/` | Echo the email with the instruction |
//! | POST   | `/api/services/send-email/`     | 422 without recipient, else 200   |
//! | GET    | `/api/logs`                     | SSE stream of handled requests    |

use axum::{
    body::Bytes,
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use crate::config::{DRAFT_PATH, REFACTOR_PATH, SEND_PATH};
use crate::error::ServerResult;
use crate::logs::{log_info, log_info_indent, log_warning, LOG_BROADCASTER};
use crate::models::{RefactorRequest, SendRequest};

type ApiError = (StatusCode, Json<Value>);

/// Routes of the mock service.
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(DRAFT_PATH, post(draft))
        .route(REFACTOR_PATH, post(refactor))
        .route(SEND_PATH, post(send))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener) -> ServerResult<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Bind `0.0.0.0:port` and serve until killed.
pub async fn start_server(port: u16) -> ServerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    println!("🚀 Mock email service running on http://localhost:{}", port);
    println!("   POST {}  - Draft emails from a spreadsheet", DRAFT_PATH);
    println!("   POST {} - Rewrite an email", REFACTOR_PATH);
    println!("   POST {}    - Send an email", SEND_PATH);
    println!("   GET  /api/logs                     - SSE request log");
    println!("   GET  /health                       - Health check");

    serve(listener).await
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "leadmail-mock",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn error(status: StatusCode, detail: &str) -> ApiError {
    log_warning(format!("{} {}", status.as_u16(), detail));
    (status, Json(json!({ "detail": detail })))
}

async fn draft(mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut file: Option<(String, usize)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("unknown").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("Read error: {}", e)))?;
            file = Some((name, bytes.len()));
        }
    }

    let (name, size) = file.ok_or_else(|| error(StatusCode::BAD_REQUEST, "No file provided"))?;
    log_info(format!("📄 Draft request: {} ({} bytes)", name, size));

    Ok(Json(sample_drafts()))
}

/// Two leads, one per email encoding the real service produces.
pub fn sample_drafts() -> Value {
    json!({
        "Response": [
            {
                "lead_data": {
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "company_name": "Analytical Engines Ltd",
                    "job_title": "CTO",
                    "industry": "Computing",
                    "lead_type": "Warm",
                    "notes_event": "Met at the Difference Engine meetup"
                },
                "drafted_email": {
                    "To": "ada@analytical-engines.example",
                    "subject": "Following up on the meetup",
                    "body": "Hi Ada,\n\nIt was great meeting you at the Difference Engine meetup. \
                             I'd love to show you how we help engineering teams ship faster.\n\n\
                             Would you have 20 minutes next week?\n\nBest regards"
                }
            },
            {
                "lead_data": {
                    "first_name": "Grace",
                    "last_name": "Hopper",
                    "company_name": "Compiler Works",
                    "job_title": "Head of Engineering",
                    "industry": "Software",
                    "lead_type": "Cold",
                    "notes_event": "Downloaded the compiler whitepaper"
                },
                "drafted_email": "Subject: Your compiler whitepaper download\n\
                                  Hi Grace,\n\nThanks for downloading our whitepaper. \
                                  Happy to walk you through the benchmarks.\n\nCheers"
            }
        ]
    })
}

async fn refactor(body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: RefactorRequest = serde_json::from_slice(&body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("Invalid refactor request: {}", e)))?;

    log_info("✏️  Refactor request");
    log_info_indent(format!("Instruction: {}", request.user_prompt), 1);

    let original = request.original_email;
    let rewritten = json!({
        "To": original.to,
        "subject": original.subject,
        "body": format!("{}\n\n(rewritten: {})", original.body.trim(), request.user_prompt.trim()),
    });

    // The real service returns the email serialized inside a string
    Ok(Json(json!({ "rewritten_email": rewritten.to_string() })))
}

async fn send(body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: SendRequest = serde_json::from_slice(&body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("Invalid send request: {}", e)))?;

    let email = request.email_data;
    if email.to.trim().is_empty() {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "Recipient address is required"));
    }

    let message_id = uuid::Uuid::new_v4().to_string();
    log_info(format!("📤 Sent '{}' to {} ({})", email.subject, email.to, message_id));

    Ok(Json(json!({ "status": "sent", "message_id": message_id })))
}
