//! # Leadmail - review and send AI-drafted lead emails
//!
//! Leadmail uploads a spreadsheet of leads to a remote drafting service,
//! shows the lead/email pairs it returns, and lets the user rewrite, edit and
//! send each email one row at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────────┐
//! │  XLSX File  │────▶│   Session   │────▶│ Draft / Refactor / Send  │
//! │  (untouched)│     │ (row edits) │◀────│   services (HTTP, JSON)  │
//! └─────────────┘     └─────────────┘     └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leadmail::{HttpEmailService, Session, SpreadsheetUpload, EmailField};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpEmailService::from_env()?;
//!     let mut session = Session::new();
//!
//!     let upload = SpreadsheetUpload::from_path("leads.xlsx").await?;
//!     session.process_file(&service, &upload).await?;
//!
//!     session.open_editor(0)?;
//!     session.request_rewrite(&service, 0, "make it shorter").await?;
//!     session.update_field(0, EmailField::Body, "Shorter text")?;
//!     session.send_email(&service, 0).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Endpoints and environment configuration
//! - [`models`] - Leads, emails and wire types
//! - [`email`] - Normalization of structured and legacy email payloads
//! - [`service`] - HTTP client for the drafting service
//! - [`session`] - Row editing session
//! - [`console`] - Interactive console and text rendering
//! - [`logs`] - User-facing log messages
//! - [`mock`] - Mock drafting service

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Email handling
pub mod email;

// Remote services
pub mod service;

// Editing workflow
pub mod session;

// Presentation
pub mod console;
pub mod logs;

// Local mock of the remote services
pub mod mock;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    CliError, CliResult, ConfigError, ServerError, ServiceError, ServiceResult, SessionError,
    SessionResult,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::ClientConfig;

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{EmailDraft, EmailField, LeadDraft, LeadRecord};

// =============================================================================
// Re-exports - Email normalization
// =============================================================================

pub use email::{normalize_email, normalize_email_str};

// =============================================================================
// Re-exports - Services
// =============================================================================

pub use service::{EmailService, HttpEmailService, SpreadsheetUpload};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use session::{LoadOutcome, RowState, Session};

// =============================================================================
// Re-exports - Logs
// =============================================================================

pub use logs::{log_error, log_info, log_success, log_warning, LogEntry, LogLevel};

// Server
pub mod server {
    pub use crate::mock::start_server;
}
