//! Moderation console: filtered list, detail modal, approve/reject.

use swiftkyc_core::{FilterCriteria, KycStatus, SessionId};
use swiftkyc_remote::api::ModerationDecision;
use swiftkyc_ui::{DismissTrigger, ModerationAction, Notice, SessionTable, View};
use tracing::{info, warn};

use crate::AppError;
use crate::timers::{DETAIL_REFRESH_DELAY_MS, TimerEvent};
use crate::wizard::{KycApp, remote_message};

impl KycApp {
    /// Opens the console and loads the list under the active filters.
    ///
    /// # Errors
    /// [`AppError::Remote`] when the list cannot be loaded.
    pub fn open_admin(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.navigate(View::Admin, now_ms)
    }

    /// Parses raw filter inputs, stores them, and reloads the list.
    ///
    /// Returns the number of rows shown.
    ///
    /// # Errors
    /// [`AppError::Input`] for an unknown document type or malformed date;
    /// [`AppError::Remote`] when the list cannot be loaded.
    pub fn apply_filters(
        &mut self,
        status: &str,
        doc_type: &str,
        date: &str,
    ) -> Result<usize, AppError> {
        let criteria = FilterCriteria::from_form(status, doc_type, date)
            .map_err(|error| self.report("apply_filters", error.into()))?;
        self.ui.console.filters = criteria;
        self.load_sessions()?;
        Ok(self.ui.console.table.len())
    }

    /// Reloads the list under the active filters.
    ///
    /// # Errors
    /// [`AppError::Remote`] when the list cannot be loaded.
    pub fn load_sessions(&mut self) -> Result<(), AppError> {
        let rows = self
            .api
            .list_sessions(&self.ui.console.filters)
            .map_err(|error| {
                let text = format!(
                    "Failed to load sessions: {}",
                    remote_message(&error, "unexpected response")
                );
                self.report_with("load_sessions", error.into(), text)
            })?;

        info!(stage = "admin", action = "sessions_loaded", rows = rows.len());
        self.ui.console.table = SessionTable::from_rows(rows);
        Ok(())
    }

    /// Loads one record into the detail modal.
    ///
    /// # Errors
    /// [`AppError::Core`] for a blank id; [`AppError::Remote`] on failure.
    pub fn open_detail(&mut self, session_id: &str) -> Result<(), AppError> {
        let session_id = SessionId::new(session_id)
            .map_err(|error| self.report("open_detail", error.into()))?;
        let record = self
            .api
            .session_detail(&session_id)
            .map_err(|error| self.report("open_detail", error.into()))?;

        info!(
            stage = "admin",
            action = "detail_opened",
            session_id = session_id.as_str(),
            status = record.status.as_str()
        );
        self.ui.console.modal.open(record);
        Ok(())
    }

    /// Dismisses the detail modal; returns `false` if it was not open.
    pub fn dismiss_detail(&mut self, trigger: DismissTrigger) -> bool {
        self.ui.console.modal.dismiss(trigger)
    }

    /// Approves or rejects the record shown in the detail modal.
    ///
    /// On success the list reloads in the background and the detail view is
    /// reloaded after a short delay to show the new action set.
    ///
    /// # Errors
    /// [`AppError::ActionUnavailable`] when no record is open or the action is
    /// not offered for its status; [`AppError::Remote`] on failure.
    pub fn moderate(
        &mut self,
        decision: ModerationDecision,
        now_ms: u64,
    ) -> Result<KycStatus, AppError> {
        let wanted = match decision {
            ModerationDecision::Approve => ModerationAction::Approve,
            ModerationDecision::Reject => ModerationAction::Reject,
        };
        let shown = self
            .ui
            .console
            .modal
            .record()
            .map(|record| record.session_id.clone());
        let offered = self.ui.console.modal.actions().contains(&wanted);
        let session_id = match shown {
            Some(session_id) if offered => session_id,
            Some(_) => {
                let error = AppError::ActionUnavailable(
                    "That action is not available for this session.".to_string(),
                );
                return Err(self.report("moderate", error));
            }
            None => {
                let error =
                    AppError::ActionUnavailable("Open a session to review first.".to_string());
                return Err(self.report("moderate", error));
            }
        };

        let verb = match decision {
            ModerationDecision::Approve => "approve",
            ModerationDecision::Reject => "reject",
        };
        let update = self
            .api
            .moderate(&session_id, decision)
            .map_err(|error| {
                let text = format!(
                    "Failed to {verb} session: {}",
                    remote_message(&error, "unexpected response")
                );
                self.report_with("moderate", error.into(), text)
            })?;

        info!(
            stage = "admin",
            action = "moderated",
            session_id = session_id.as_str(),
            decision = verb,
            status = update.status.as_str()
        );
        self.ui.notify(Notice::success(match decision {
            ModerationDecision::Approve => "Session approved.",
            ModerationDecision::Reject => "Session rejected.",
        }));

        self.reload_sessions_quietly();
        self.timers.schedule(
            now_ms + DETAIL_REFRESH_DELAY_MS,
            View::Admin,
            TimerEvent::RefreshDetail(session_id),
        );
        Ok(update.status)
    }

    fn reload_sessions_quietly(&mut self) {
        match self.api.list_sessions(&self.ui.console.filters) {
            Ok(rows) => self.ui.console.table = SessionTable::from_rows(rows),
            Err(error) => warn!(stage = "admin", action = "background_reload_failed", "{error}"),
        }
    }

    pub(crate) fn refresh_detail(&mut self, session_id: &SessionId) {
        let still_open = self
            .ui
            .console
            .modal
            .record()
            .is_some_and(|record| &record.session_id == session_id);
        if !still_open {
            return;
        }

        match self.api.session_detail(session_id) {
            Ok(record) => {
                self.ui.console.modal.refresh(record);
            }
            Err(error) => {
                self.report("refresh_detail", error.into());
            }
        }
    }
}
