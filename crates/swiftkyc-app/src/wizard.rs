//! Wizard state machine: navigation, session steps, and the status view.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;
use swiftkyc_capture::{MediaDevice, MediaSlot, StillImageDevice, UnavailableDevice};
use swiftkyc_core::{
    DocumentType, SessionId, SessionProfile, validate_customer, validate_document_number,
};
use swiftkyc_remote::api::KycApi;
use swiftkyc_remote::{RemoteClient, RemoteError, UreqTransport};
use swiftkyc_ui::{Notice, SelfieView, UiState, UploadView, View};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::retry::RetryPolicy;
use crate::store::{FileSessionStore, SessionStore};
use crate::timers::{TimerId, TimerQueue};
use crate::upload::Submission;
use crate::{AppError, app_version, redact_sensitive};

/// Which kind of submission a worker is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmissionKind {
    Document,
    Selfie,
}

/// Outstanding worker result, owned by the view that started it.
pub(crate) struct PendingSubmission {
    pub(crate) view: View,
    pub(crate) kind: SubmissionKind,
    pub(crate) rx: Receiver<Submission>,
}

/// Headless onboarding client.
///
/// Each public operation corresponds to one user action. Time is passed in
/// explicitly so deferred work is deterministic under test.
pub struct KycApp {
    pub(crate) api: KycApi,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) media: MediaSlot,
    pub(crate) timers: TimerQueue,
    pub(crate) retry: RetryPolicy,
    pub(crate) rng: StdRng,
    pub(crate) ui: UiState,
    pub(crate) profile: Option<SessionProfile>,
    pub(crate) pending: Option<PendingSubmission>,
    pub(crate) failed_uploads: u32,
    pub(crate) progress_timer: Option<TimerId>,
}

impl KycApp {
    /// Assembles an app from its collaborators.
    pub fn new(
        api: KycApi,
        store: Arc<dyn SessionStore>,
        device: Arc<dyn MediaDevice>,
        retry: RetryPolicy,
        seed: u64,
    ) -> Self {
        Self {
            api,
            store,
            media: MediaSlot::new(device),
            timers: TimerQueue::new(),
            retry,
            rng: StdRng::seed_from_u64(seed),
            ui: UiState::new(app_version()),
            profile: None,
            pending: None,
            failed_uploads: 0,
            progress_timer: None,
        }
    }

    /// Builds the production app: `ureq` transport, file storage, and the
    /// still-image camera when one is configured.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the API base is unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        let transport = Arc::new(UreqTransport::new(config.http_timeout_ms, seed));
        let client = RemoteClient::new(&config.api_base, transport)
            .map_err(|error| AppError::Config(error.to_string()))?;
        let api = KycApi::new(client, config.routes.clone());

        let device: Arc<dyn MediaDevice> = match &config.camera_image {
            Some(path) => Arc::new(StillImageDevice::new(path)),
            None => Arc::new(UnavailableDevice),
        };

        Ok(Self::new(
            api,
            Arc::new(FileSessionStore::new(&config.session_file)),
            device,
            config.retry,
            seed,
        ))
    }

    /// Restores the stored session id, if any, and shows Home.
    pub fn boot(&mut self) {
        match self.store.load() {
            Ok(Some(session_id)) => {
                info!(
                    stage = "wizard",
                    action = "session_restored",
                    session_id = session_id.as_str()
                );
                self.profile = Some(SessionProfile::restored(session_id));
            }
            Ok(None) => debug!(stage = "wizard", action = "no_stored_session"),
            Err(error) => warn!(stage = "wizard", action = "restore_failed", "{error}"),
        }
        self.ui.view = View::Home;
    }

    /// Current UI state.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// View currently rendered.
    pub fn view(&self) -> View {
        self.ui.view
    }

    /// Transient message of the current view.
    pub fn notice(&self) -> Option<&Notice> {
        self.ui.notice.as_ref()
    }

    /// Accumulated session data.
    pub fn profile(&self) -> Option<&SessionProfile> {
        self.profile.as_ref()
    }

    /// Active session id.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.profile.as_ref().map(|profile| &profile.session_id)
    }

    /// Returns `true` while a submission worker is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    /// Consecutive failed document submissions.
    pub fn failed_uploads(&self) -> u32 {
        self.failed_uploads
    }

    /// Pending deferred work.
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Media slot, for inspecting stream ownership.
    pub fn media(&self) -> &MediaSlot {
        &self.media
    }

    /// Switches view after tearing down the current one.
    ///
    /// Teardown releases any open stream, cancels the view's timers, and
    /// discards interest in its outstanding submission. Entering Status loads
    /// the session; entering Admin loads the list under the active filters.
    ///
    /// # Errors
    /// [`AppError::MissingSession`] for session-bound views without a session,
    /// plus load failures of the entered view (the view is still shown).
    pub fn navigate(&mut self, view: View, now_ms: u64) -> Result<(), AppError> {
        if view.route().requires_session && self.profile.is_none() {
            return Err(self.report("navigate", AppError::MissingSession));
        }

        let from = self.ui.view;
        self.teardown_view("navigation");
        self.ui.view = view;
        self.ui.clear_notice();
        info!(
            stage = "wizard",
            action = "navigate",
            from = from.name(),
            to = view.name(),
            now_ms
        );
        self.enter_view(view)
    }

    fn teardown_view(&mut self, reason: &str) {
        let view = self.ui.view;
        self.media.release_all(reason);
        self.ui.upload.camera_live = false;
        self.ui.selfie.camera_live = false;

        let cancelled = self.timers.cancel_owned_by(view);
        if cancelled > 0 {
            debug!(
                stage = "wizard",
                action = "timers_cancelled",
                view = view.name(),
                cancelled
            );
        }
        if view == View::UploadDocument {
            self.progress_timer = None;
        }

        if self.pending.as_ref().is_some_and(|pending| pending.view == view) {
            self.pending = None;
            info!(
                stage = "wizard",
                action = "submission_discarded",
                view = view.name()
            );
        }
    }

    fn enter_view(&mut self, view: View) -> Result<(), AppError> {
        match view {
            View::UploadDocument => {
                self.ui.upload = UploadView::default();
                Ok(())
            }
            View::SelfieUpload => {
                self.ui.selfie = SelfieView::default();
                Ok(())
            }
            View::Status => self.load_status(),
            View::Admin => self.load_sessions(),
            View::Home | View::CreateSession | View::SelectDocument | View::EnterDocNumber => {
                Ok(())
            }
        }
    }

    /// Goes one step back without touching stored session fields.
    ///
    /// # Errors
    /// Same as [`KycApp::navigate`].
    pub fn back(&mut self, now_ms: u64) -> Result<(), AppError> {
        let target = match self.ui.view {
            View::EnterDocNumber => View::SelectDocument,
            View::UploadDocument => View::EnterDocNumber,
            View::SelfieUpload => View::UploadDocument,
            View::Home
            | View::CreateSession
            | View::SelectDocument
            | View::Status
            | View::Admin => View::Home,
        };
        self.navigate(target, now_ms)
    }

    /// Releases media when the host hides the window.
    pub fn on_tab_hidden(&mut self) {
        if self.media.release_all("tab_hidden") {
            self.ui.upload.camera_live = false;
            self.ui.selfie.camera_live = false;
        }
    }

    /// Releases everything when the host is closing.
    pub fn on_tab_closed(&mut self) {
        self.media.release_all("tab_closed");
        self.ui.upload.camera_live = false;
        self.ui.selfie.camera_live = false;
        self.timers.clear();
        self.progress_timer = None;
        self.pending = None;
    }

    /// Opens the customer form.
    ///
    /// # Errors
    /// Never fails; kept fallible for a uniform driver surface.
    pub fn begin_verification(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.navigate(View::CreateSession, now_ms)
    }

    /// Validates the form locally, creates a session, persists its id, and
    /// moves to document selection.
    ///
    /// # Errors
    /// [`AppError::Input`] without any request for invalid input;
    /// [`AppError::Remote`] when creation fails.
    pub fn create_session(
        &mut self,
        name: &str,
        mobile: &str,
        age: &str,
        now_ms: u64,
    ) -> Result<SessionId, AppError> {
        let customer = validate_customer(name, mobile, age)
            .map_err(|error| self.report("create_session", error.into()))?;

        let created = self
            .api
            .create_session(&customer)
            .map_err(|error| self.report("create_session", error.into()))?;

        if let Err(error) = self.store.save(&created.session_id) {
            warn!(stage = "wizard", action = "persist_failed", "{error}");
        }
        info!(
            stage = "wizard",
            action = "session_created",
            session_id = created.session_id.as_str()
        );
        self.profile = Some(SessionProfile::created(
            created.session_id.clone(),
            customer,
        ));
        self.failed_uploads = 0;

        self.navigate(View::SelectDocument, now_ms)?;
        self.ui.notify(Notice::success("Session created."));
        Ok(created.session_id)
    }

    /// Records the chosen document type and moves to number entry.
    ///
    /// # Errors
    /// [`AppError::MissingSession`] or [`AppError::Remote`].
    pub fn select_document(&mut self, doc_type: DocumentType, now_ms: u64) -> Result<(), AppError> {
        let session_id = self.require_session("select_document")?;
        let selection = self
            .api
            .select_document(&session_id, doc_type)
            .map_err(|error| self.report("select_document", error.into()))?;

        if let Some(profile) = self.profile.as_mut() {
            profile.document_type = Some(selection.doc_type);
        }
        self.navigate(View::EnterDocNumber, now_ms)
    }

    /// Records the document number and moves to upload.
    ///
    /// # Errors
    /// [`AppError::Input`] for a blank number, [`AppError::MissingSession`],
    /// or [`AppError::Remote`].
    pub fn enter_document_number(&mut self, raw: &str, now_ms: u64) -> Result<(), AppError> {
        let doc_number = validate_document_number(raw)
            .map_err(|error| self.report("enter_document_number", error.into()))?;
        let session_id = self.require_session("enter_document_number")?;
        let ack = self
            .api
            .enter_document_number(&session_id, &doc_number)
            .map_err(|error| self.report("enter_document_number", error.into()))?;

        if let Some(profile) = self.profile.as_mut() {
            profile.document_number = Some(ack.doc_number);
        }
        self.navigate(View::UploadDocument, now_ms)
    }

    /// Reloads the Status view from the server.
    ///
    /// # Errors
    /// [`AppError::MissingSession`] or [`AppError::Remote`].
    pub fn load_status(&mut self) -> Result<(), AppError> {
        let session_id = self.require_session("load_status")?;
        let status = self
            .api
            .session_status(&session_id)
            .map_err(|error| self.report("load_status", error.into()))?;

        info!(
            stage = "wizard",
            action = "status_loaded",
            status = status.status.as_str(),
            current_step = status.current_step.as_str()
        );
        self.ui.status = Some(status);
        Ok(())
    }

    /// Jumps to Status for the restored or current session.
    ///
    /// # Errors
    /// Same as [`KycApp::navigate`].
    pub fn resume(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.navigate(View::Status, now_ms)
    }

    /// Forgets the in-memory session and returns Home. The stored id stays
    /// until the next session creation replaces it.
    pub fn restart(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.profile = None;
        self.ui.status = None;
        self.failed_uploads = 0;
        self.navigate(View::Home, now_ms)
    }

    pub(crate) fn require_session(&mut self, action: &'static str) -> Result<SessionId, AppError> {
        if let Some(session_id) = self.session_id().cloned() {
            return Ok(session_id);
        }
        Err(self.report(action, AppError::MissingSession))
    }

    /// Shows `error` as a notice in the current view and hands it back.
    pub(crate) fn report(&mut self, action: &'static str, error: AppError) -> AppError {
        let text = user_message(&error);
        self.report_with(action, error, text)
    }

    pub(crate) fn report_with(
        &mut self,
        action: &'static str,
        error: AppError,
        text: String,
    ) -> AppError {
        warn!(
            stage = "wizard",
            action,
            view = self.ui.view.name(),
            error = %redact_sensitive(&error.to_string())
        );
        self.ui.notify(Notice::error(text));
        error
    }
}

/// User-facing text for a failure.
pub(crate) fn user_message(error: &AppError) -> String {
    match error {
        AppError::Remote(remote) => remote_message(remote, "Request failed. Please try again."),
        other => other.to_string(),
    }
}

/// Server reason for status failures, `fallback` otherwise.
pub(crate) fn remote_message(error: &RemoteError, fallback: &str) -> String {
    match error {
        RemoteError::Status(request) => request.message.clone(),
        RemoteError::Transport(_) => "Could not reach the server. Please try again.".to_string(),
        RemoteError::Decode(_) | RemoteError::InvalidEndpoint(_) => fallback.to_string(),
    }
}

/// Reason from the failed response body, `fallback` when it carried none.
pub(crate) fn submission_message(error: &RemoteError, fallback: &str) -> String {
    match error {
        RemoteError::Status(request) => request.reason().unwrap_or_else(|| fallback.to_string()),
        other => remote_message(other, fallback),
    }
}
