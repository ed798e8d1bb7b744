#![warn(missing_docs)]
//! # swiftkyc-ui
//!
//! ## Purpose
//! Defines the view-facing state model for the `swiftkyc` onboarding wizard and
//! moderation console.
//!
//! ## Responsibilities
//! - Name every view and map names to views through one route table.
//! - Hold transient notices, the upload progress indicator, and per-view
//!   capture state.
//! - Compute the moderation action set as a pure function of record status.
//! - Track detail-modal dismissal listeners so repeated opens never stack.
//!
//! ## Data flow
//! App orchestration events mutate [`UiState`]; the terminal driver renders it
//! through the `render_*` helpers.
//!
//! ## Ownership and lifetimes
//! `UiState` owns every value it shows, including decoded server records, so
//! rendering never borrows from in-flight requests.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Invalid
//! combinations are prevented by guard methods.
//!
//! ## Security and privacy notes
//! Image artifacts are held in memory only; rendering prints fingerprints and
//! sizes, never bytes.

use rand::Rng;
use swiftkyc_core::{CaptureSource, FilterCriteria, ImageBlob, KycStatus};
use swiftkyc_remote::api::{ModerationRecord, SessionStatus, SessionSummary};

/// Highest percentage the progress bar reaches before the response settles.
pub const PROGRESS_CEILING: u8 = 95;

/// Every renderable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Landing page.
    Home,
    /// Name/mobile/age form.
    CreateSession,
    /// Document type picker.
    SelectDocument,
    /// Document number form.
    EnterDocNumber,
    /// Document capture and validation.
    UploadDocument,
    /// Selfie capture.
    SelfieUpload,
    /// Session status summary.
    Status,
    /// Moderation console.
    Admin,
}

/// One row of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// View this row describes.
    pub view: View,
    /// Stable name used by drivers and logs.
    pub name: &'static str,
    /// Whether entering the view requires a session id.
    pub requires_session: bool,
}

/// Declarative route table; the only place view names are defined.
pub static ROUTES: [Route; 8] = [
    Route {
        view: View::Home,
        name: "home",
        requires_session: false,
    },
    Route {
        view: View::CreateSession,
        name: "create-session",
        requires_session: false,
    },
    Route {
        view: View::SelectDocument,
        name: "select-document",
        requires_session: true,
    },
    Route {
        view: View::EnterDocNumber,
        name: "enter-doc-number",
        requires_session: true,
    },
    Route {
        view: View::UploadDocument,
        name: "upload-document",
        requires_session: true,
    },
    Route {
        view: View::SelfieUpload,
        name: "selfie-upload",
        requires_session: true,
    },
    Route {
        view: View::Status,
        name: "status",
        requires_session: true,
    },
    Route {
        view: View::Admin,
        name: "admin",
        requires_session: false,
    },
];

impl View {
    /// Route table row for this view.
    pub fn route(self) -> &'static Route {
        ROUTES
            .iter()
            .find(|route| route.view == self)
            .unwrap_or(&ROUTES[0])
    }

    /// Stable view name.
    pub fn name(self) -> &'static str {
        self.route().name
    }

    /// Looks a view up by name.
    pub fn from_name(name: &str) -> Option<View> {
        ROUTES
            .iter()
            .find(|route| route.name == name.trim())
            .map(|route| route.view)
    }
}

/// Severity of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Neutral information.
    Info,
    /// Completed action.
    Success,
    /// Failed action or rejected input.
    Error,
}

/// Transient message shown within the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub text: String,
}

impl Notice {
    /// Informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    /// Success notice.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// Error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Cosmetic progress bar shown while a submission is outstanding.
///
/// Advances by random steps that stop at [`PROGRESS_CEILING`]; only
/// [`ProgressIndicator::complete`] reaches 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    percent: u8,
    running: bool,
}

impl ProgressIndicator {
    /// Resets to zero and starts animating.
    pub fn start(&mut self) {
        self.percent = 0;
        self.running = true;
    }

    /// Moves forward by a random step without reaching completion.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.running {
            return;
        }
        let step = rng.random_range(3..=12_u8);
        self.percent = self.percent.saturating_add(step).min(PROGRESS_CEILING);
    }

    /// Forces completion and stops animating.
    pub fn complete(&mut self) {
        self.percent = 100;
        self.running = false;
    }

    /// Stops animating and hides the bar.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current percentage.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Returns `true` while animating.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Lifecycle of the document upload view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStage {
    /// Waiting for an artifact or a submit.
    Idle,
    /// Request outstanding.
    Submitting,
    /// Validator asked for the selfie step; "Proceed to Selfie" and
    /// "Retry Upload" are offered.
    Accepted,
    /// Submission failed or was not accepted; the view redisplays shortly.
    AwaitingRedisplay,
}

/// State of the document upload view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    /// Selected capture source.
    pub source: CaptureSource,
    /// Captured artifact, replaced on every reselect or recapture.
    pub artifact: Option<ImageBlob>,
    /// Whether a camera preview is live.
    pub camera_live: bool,
    /// Flow stage.
    pub stage: UploadStage,
    /// Progress bar.
    pub progress: ProgressIndicator,
}

impl Default for UploadView {
    fn default() -> Self {
        Self {
            source: CaptureSource::StoredFile,
            artifact: None,
            camera_live: false,
            stage: UploadStage::Idle,
            progress: ProgressIndicator::default(),
        }
    }
}

impl UploadView {
    /// Switches source and drops any previously captured artifact.
    pub fn select_source(&mut self, source: CaptureSource) {
        self.source = source;
        self.artifact = None;
        self.camera_live = false;
    }

    /// Returns `true` when the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.artifact.is_some() && matches!(self.stage, UploadStage::Idle | UploadStage::Accepted)
    }
}

/// State of the selfie view; camera is the only source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfieView {
    /// Captured frame.
    pub artifact: Option<ImageBlob>,
    /// Whether a camera preview is live.
    pub camera_live: bool,
    /// Whether a submission is outstanding.
    pub submitting: bool,
}

/// Reviewer action offered in the detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    /// Non-interactive "already approved" badge.
    AlreadyApprovedBadge,
    /// Approve the record.
    Approve,
    /// Reject the record.
    Reject,
}

/// Actions available for a record in `status`.
pub fn action_set(status: &KycStatus) -> &'static [ModerationAction] {
    match status {
        KycStatus::Approved => &[ModerationAction::AlreadyApprovedBadge, ModerationAction::Reject],
        KycStatus::Rejected => &[ModerationAction::Approve],
        _ => &[ModerationAction::Approve, ModerationAction::Reject],
    }
}

/// Admin list contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionTable {
    /// Nothing loaded yet.
    #[default]
    NotLoaded,
    /// Filter matched nothing; shown as an empty state, never an empty table.
    Empty,
    /// Matching rows.
    Rows(Vec<SessionSummary>),
}

impl SessionTable {
    /// Builds the table from a list response.
    pub fn from_rows(rows: Vec<SessionSummary>) -> Self {
        if rows.is_empty() {
            SessionTable::Empty
        } else {
            SessionTable::Rows(rows)
        }
    }

    /// Number of rows shown.
    pub fn len(&self) -> usize {
        match self {
            SessionTable::Rows(rows) => rows.len(),
            _ => 0,
        }
    }

    /// Returns `true` when no rows are shown.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ways the detail modal can be dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTrigger {
    /// Close button.
    CloseButton,
    /// Click outside the dialog.
    Backdrop,
    /// Escape key.
    EscapeKey,
}

const DISMISS_TRIGGERS: [DismissTrigger; 3] = [
    DismissTrigger::CloseButton,
    DismissTrigger::Backdrop,
    DismissTrigger::EscapeKey,
];

/// Detail modal for one moderation record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailModal {
    record: Option<ModerationRecord>,
    listeners: Vec<DismissTrigger>,
}

impl DetailModal {
    /// Opens the modal on `record`, registering each dismissal listener once.
    pub fn open(&mut self, record: ModerationRecord) {
        self.listeners.clear();
        self.listeners.extend(DISMISS_TRIGGERS);
        self.record = Some(record);
    }

    /// Swaps the shown record without touching listeners.
    ///
    /// Returns `false` when the modal is closed or shows another record.
    pub fn refresh(&mut self, record: ModerationRecord) -> bool {
        match &self.record {
            Some(current) if current.session_id == record.session_id => {
                self.record = Some(record);
                true
            }
            _ => false,
        }
    }

    /// Handles a dismissal; all listeners are removed together.
    pub fn dismiss(&mut self, trigger: DismissTrigger) -> bool {
        if !self.listeners.contains(&trigger) {
            return false;
        }
        self.close();
        true
    }

    /// Closes the modal and deregisters every listener.
    pub fn close(&mut self) {
        self.listeners.clear();
        self.record = None;
    }

    /// Record currently shown.
    pub fn record(&self) -> Option<&ModerationRecord> {
        self.record.as_ref()
    }

    /// Returns `true` while open.
    pub fn is_open(&self) -> bool {
        self.record.is_some()
    }

    /// Registered dismissal listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Actions for the shown record.
    pub fn actions(&self) -> &'static [ModerationAction] {
        self.record
            .as_ref()
            .map(|record| action_set(&record.status))
            .unwrap_or(&[])
    }
}

/// Moderation console state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleView {
    /// Filters applied to the last list load.
    pub filters: FilterCriteria,
    /// List contents.
    pub table: SessionTable,
    /// Detail modal.
    pub modal: DetailModal,
}

/// Aggregate UI runtime state.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// View currently rendered.
    pub view: View,
    /// Transient message for the current view.
    pub notice: Option<Notice>,
    /// Document upload view state.
    pub upload: UploadView,
    /// Selfie view state.
    pub selfie: SelfieView,
    /// Last status loaded for the Status view.
    pub status: Option<SessionStatus>,
    /// Moderation console state.
    pub console: ConsoleView,
}

impl UiState {
    /// Creates default UI state on the Home view.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            view: View::Home,
            notice: None,
            upload: UploadView::default(),
            selfie: SelfieView::default(),
            status: None,
            console: ConsoleView::default(),
        }
    }

    /// Replaces the current notice.
    pub fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Clears the current notice.
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}

/// Status view lines.
pub fn render_status(status: &SessionStatus) -> Vec<String> {
    let mut lines = vec![
        format!("Session: {}", status.session_id),
        format!("Status: {}", status.status),
        format!("Current step: {}", status.current_step.as_str()),
        format!("Customer: {}", status.customer_id),
    ];
    if let Some(reason) = &status.failure_reason {
        lines.push(format!("Last failure: {reason}"));
    }
    lines
}

/// Admin table lines, or the empty state.
pub fn render_table(table: &SessionTable) -> Vec<String> {
    match table {
        SessionTable::NotLoaded => vec!["Sessions not loaded.".to_string()],
        SessionTable::Empty => vec!["No sessions match the selected filters.".to_string()],
        SessionTable::Rows(rows) => rows
            .iter()
            .map(|row| {
                format!(
                    "{} | {} | {} | {} | {}",
                    row.session_id,
                    row.status,
                    row.current_step.as_str(),
                    row.primary_doc_type.as_deref().unwrap_or("-"),
                    row.created_at
                )
            })
            .collect(),
    }
}

/// Detail modal lines, including the action set.
pub fn render_detail(modal: &DetailModal) -> Vec<String> {
    let Some(record) = modal.record() else {
        return Vec::new();
    };
    let mut lines = vec![
        format!("Session: {}", record.session_id),
        format!("Customer: {}", record.customer_id),
        format!("Status: {}", record.status),
        format!("Current step: {}", record.current_step.as_str()),
        format!(
            "Retries: select={} scan={} upload={} selfie={}",
            record.retries.retries_select,
            record.retries.retries_scan,
            record.retries.retries_upload,
            record.retries.retries_selfie
        ),
    ];
    if let Some(reason) = &record.failure_reason {
        lines.push(format!("Failure: {reason}"));
    }
    if let Some(score) = record.face_match_score {
        lines.push(format!("Face match: {score:.2}"));
    }
    for document in &record.documents {
        let validity = match document.is_valid {
            Some(true) => "valid",
            Some(false) => "invalid",
            None => "pending",
        };
        lines.push(format!(
            "Document {}: {} ({validity}, quality {})",
            document.doc_type,
            document.doc_number.as_deref().unwrap_or("-"),
            document
                .quality_score
                .map(|score| format!("{score:.2}"))
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    lines.push(format!("Created: {} Updated: {}", record.created_at, record.updated_at));
    let actions: Vec<&str> = modal
        .actions()
        .iter()
        .map(|action| match action {
            ModerationAction::AlreadyApprovedBadge => "[already approved]",
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
        })
        .collect();
    lines.push(format!("Actions: {}", actions.join(" ")));
    lines
}

#[cfg(test)]
mod tests {
    //! Unit tests for view-state guards.

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn route_names_round_trip() {
        for route in ROUTES {
            assert_eq!(View::from_name(route.name), Some(route.view));
            assert_eq!(route.view.name(), route.name);
        }
        assert_eq!(View::from_name("nowhere"), None);
    }

    #[test]
    fn progress_never_completes_on_its_own() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = ProgressIndicator::default();
        progress.start();
        for _ in 0..200 {
            progress.advance(&mut rng);
            assert!(progress.percent() <= PROGRESS_CEILING);
        }
        assert_eq!(progress.percent(), PROGRESS_CEILING);

        progress.complete();
        assert_eq!(progress.percent(), 100);
        assert!(!progress.is_running());
    }

    #[test]
    fn source_switch_drops_artifact() {
        let mut view = UploadView::default();
        view.artifact = Some(
            ImageBlob::new(swiftkyc_core::ImageFormat::Jpeg, "a.jpg", vec![1]).expect("blob"),
        );
        assert!(view.can_submit());

        view.select_source(CaptureSource::LiveCamera);
        assert!(view.artifact.is_none());
        assert!(!view.can_submit());
    }
}
