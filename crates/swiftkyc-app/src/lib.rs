#![warn(missing_docs)]
//! # swiftkyc-app
//!
//! ## Purpose
//! Orchestrates the onboarding wizard, document/selfie submissions, and the
//! moderation console for `swiftkyc`.
//!
//! ## Responsibilities
//! - Sequence wizard views and gate every step on a session id.
//! - Run local input validation before any request is sent.
//! - Submit artifacts on a worker thread and branch on the server's next-step
//!   directive, redisplaying the upload step after failures.
//! - Release camera streams on every view change and lifecycle signal.
//! - Drive the moderation list, detail modal, and approve/reject actions.
//!
//! ## Data flow
//! Driver event -> [`KycApp`] operation -> local validation ->
//! [`swiftkyc_remote::api::KycApi`] call -> [`swiftkyc_ui::UiState`] update and
//! navigation. Deferred work (progress ticks, upload redisplay, detail refresh)
//! is queued in a [`TimerQueue`] and run by [`KycApp::tick`].
//!
//! ## Ownership and lifetimes
//! `KycApp` owns the media slot, timers, and UI state. Submissions run on
//! detached worker threads that own clones of the API handle and artifact and
//! report back over a channel; navigating away drops the receiver.
//!
//! ## Error model
//! Every operation converts failures into a view-local
//! [`swiftkyc_ui::Notice`] and also returns them as [`AppError`] so drivers and
//! tests can branch on the kind.
//! Nothing is fatal to the process.
//!
//! ## Security and privacy notes
//! - Image bytes are never logged; artifacts are traced by SHA-256 fingerprint.
//! - Server failure reasons pass through [`redact_sensitive`] before logging.
//!
//! ## Example
//! ```rust
//! use swiftkyc_app::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! assert!(policy.allows_redisplay(100));
//! assert_eq!(policy.delay_for(1), 1_200);
//! ```

pub mod config;
mod moderation;
pub mod retry;
pub mod store;
mod telemetry;
pub mod timers;
mod upload;
mod wizard;

use swiftkyc_capture::MediaError;
use swiftkyc_core::{CoreError, InputError};
use swiftkyc_remote::RemoteError;
use thiserror::Error;

pub use config::AppConfig;
pub use retry::RetryPolicy;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
pub use telemetry::{init_tracing, redact_sensitive};
pub use timers::{TimerEvent, TimerQueue};
pub use wizard::KycApp;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SWIFTKYC_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Local form validation failed; no request was sent.
    #[error("{0}")]
    Input(#[from] InputError),
    /// No session id exists for a step that needs one.
    #[error("No active session. Please start a new verification.")]
    MissingSession,
    /// Submit was pressed without a captured image.
    #[error("Please choose or capture an image first.")]
    MissingArtifact,
    /// A submission is still outstanding.
    #[error("Please wait for the current submission to finish.")]
    SubmissionPending,
    /// Action is not offered in the current state.
    #[error("{0}")]
    ActionUnavailable(String),
    /// Automatic redisplay budget is spent.
    #[error("Upload failed {attempts} times. Please restart verification.")]
    RetriesExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },
    /// Artifact or identifier error.
    #[error("{0}")]
    Core(#[from] CoreError),
    /// Remote call failure.
    #[error("{0}")]
    Remote(#[from] RemoteError),
    /// Camera failure.
    #[error("camera error: {0}")]
    Media(#[from] MediaError),
    /// Session storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Submission worker could not be started.
    #[error("worker error: {0}")]
    Worker(String),
}
