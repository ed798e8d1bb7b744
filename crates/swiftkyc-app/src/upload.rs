//! Upload/validate orchestration for document and selfie artifacts.
//!
//! Only the validator's next-step directive moves the flow forward; HTTP
//! success alone never does.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use swiftkyc_capture::{MediaConstraints, MediaError, StreamHandle};
use swiftkyc_core::{CaptureSource, ImageBlob, KycStep, ValidationOutcome};
use swiftkyc_remote::{FailureClass, RemoteError, classify_remote_error};
use swiftkyc_ui::{Notice, UploadStage, View};
use tracing::{info, warn};

use crate::timers::{PROGRESS_TICK_MS, TimerEvent};
use crate::wizard::{KycApp, PendingSubmission, SubmissionKind, submission_message};
use crate::{AppError, redact_sensitive};

const DOCUMENT_FILE_NAME: &str = "document.jpg";
const SELFIE_FILE_NAME: &str = "selfie.jpg";

const DOCUMENT_FAILED: &str = "Document validation failed. Please try again.";
const DOCUMENT_MISMATCH: &str = "Document details did not match. Please upload again.";
const SELFIE_FAILED: &str = "Selfie upload failed. Please try again.";

/// Result sent back by a submission worker.
#[derive(Debug)]
pub(crate) enum Submission {
    Document(Result<ValidationOutcome, RemoteError>),
    Selfie(Result<(), RemoteError>),
}

fn spawn_submission<F>(name: &str, job: F) -> Result<Receiver<Submission>, AppError>
where
    F: FnOnce() -> Submission + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Receiver is gone when the owning view was left.
            let _ = tx.send(job());
        })
        .map_err(|error| AppError::Worker(format!("failed to spawn {name}: {error}")))?;
    Ok(rx)
}

impl KycApp {
    /// Uses a stored image file as the document artifact.
    ///
    /// Switching to the file source releases any live camera first.
    ///
    /// # Errors
    /// [`AppError::Core`] for empty files or formats other than JPEG/PNG.
    pub fn choose_document_file(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        self.media.release_all("source_switch");
        self.ui.upload.select_source(CaptureSource::StoredFile);

        let blob = ImageBlob::from_file_bytes(file_name, bytes)
            .map_err(|error| self.report("choose_document_file", error.into()))?;
        info!(
            stage = "upload",
            action = "artifact_selected",
            source = "file",
            bytes = blob.len(),
            fingerprint = %blob.fingerprint()
        );
        self.ui.upload.artifact = Some(blob);
        Ok(())
    }

    /// Switches the upload view to the rear camera.
    ///
    /// # Errors
    /// [`AppError::Media`] when the camera cannot be opened; the view falls
    /// back to the file source and stays usable.
    pub fn open_document_camera(&mut self) -> Result<(), AppError> {
        self.ui.upload.select_source(CaptureSource::LiveCamera);
        match self
            .media
            .switch_to(View::UploadDocument.name(), MediaConstraints::DOCUMENT)
        {
            Ok(_) => {
                self.ui.upload.camera_live = true;
                Ok(())
            }
            Err(error) => {
                self.ui.upload.select_source(CaptureSource::StoredFile);
                let text = format!("Camera unavailable ({error}). You can upload a file instead.");
                Err(self.report_with("open_document_camera", error.into(), text))
            }
        }
    }

    /// Grabs the document frame and stops the camera.
    ///
    /// # Errors
    /// [`AppError::Media`] when no document camera is live or the frame
    /// cannot be encoded.
    pub fn capture_document(&mut self) -> Result<(), AppError> {
        let handle = self.stream_owned_by(View::UploadDocument, "capture_document")?;
        let blob = self
            .media
            .capture(handle, DOCUMENT_FILE_NAME)
            .map_err(|error| self.report("capture_document", error.into()))?;
        self.media.release(handle);

        info!(
            stage = "upload",
            action = "artifact_selected",
            source = "camera",
            bytes = blob.len(),
            fingerprint = %blob.fingerprint()
        );
        self.ui.upload.camera_live = false;
        self.ui.upload.artifact = Some(blob);
        Ok(())
    }

    /// Stops whichever camera preview the current view holds.
    pub fn cancel_camera(&mut self) {
        self.media.release_owned_by(self.ui.view.name());
        self.ui.upload.camera_live = false;
        self.ui.selfie.camera_live = false;
    }

    /// Submits the document artifact for validation on a worker thread.
    ///
    /// The progress bar starts immediately and advances on
    /// [`KycApp::tick`] until the response arrives.
    ///
    /// Refused until the previous attempt has settled, including the wait
    /// before a failed attempt is redisplayed.
    ///
    /// # Errors
    /// [`AppError::SubmissionPending`], [`AppError::MissingArtifact`],
    /// [`AppError::MissingSession`], or [`AppError::Worker`].
    pub fn submit_document(&mut self, now_ms: u64) -> Result<(), AppError> {
        let settled = matches!(
            self.ui.upload.stage,
            UploadStage::Idle | UploadStage::Accepted
        );
        if self.pending.is_some() || !settled {
            return Err(self.report("submit_document", AppError::SubmissionPending));
        }
        let Some(artifact) = self.ui.upload.artifact.clone() else {
            let text = "Please choose a file or capture the document first.".to_string();
            return Err(self.report_with("submit_document", AppError::MissingArtifact, text));
        };
        let session_id = self.require_session("submit_document")?;

        info!(
            stage = "upload",
            action = "document_submitted",
            session_id = session_id.as_str(),
            bytes = artifact.len(),
            fingerprint = %artifact.fingerprint()
        );
        let api = self.api.clone();
        let rx = spawn_submission("swiftkyc-document-upload", move || {
            Submission::Document(api.validate_document(&session_id, &artifact))
        })
        .map_err(|error| self.report("submit_document", error))?;

        self.ui.clear_notice();
        self.ui.upload.stage = UploadStage::Submitting;
        self.ui.upload.progress.start();
        self.progress_timer = Some(self.timers.schedule(
            now_ms + PROGRESS_TICK_MS,
            View::UploadDocument,
            TimerEvent::ProgressTick,
        ));
        self.pending = Some(PendingSubmission {
            view: View::UploadDocument,
            kind: SubmissionKind::Document,
            rx,
        });
        Ok(())
    }

    /// Leaves an accepted upload for the selfie step.
    ///
    /// # Errors
    /// [`AppError::ActionUnavailable`] unless the validator accepted the
    /// document.
    pub fn proceed_to_selfie(&mut self, now_ms: u64) -> Result<(), AppError> {
        if self.ui.view != View::UploadDocument || self.ui.upload.stage != UploadStage::Accepted {
            let error = AppError::ActionUnavailable(
                "Upload a document that passes validation first.".to_string(),
            );
            return Err(self.report("proceed_to_selfie", error));
        }
        self.navigate(View::SelfieUpload, now_ms)
    }

    /// Shows a fresh upload step, discarding the current artifact.
    ///
    /// # Errors
    /// Same as [`KycApp::navigate`].
    pub fn retry_upload(&mut self, now_ms: u64) -> Result<(), AppError> {
        self.navigate(View::UploadDocument, now_ms)
    }

    /// Opens the front camera for the selfie.
    ///
    /// # Errors
    /// [`AppError::Media`] when no camera can be opened.
    pub fn open_selfie_camera(&mut self) -> Result<(), AppError> {
        match self
            .media
            .switch_to(View::SelfieUpload.name(), MediaConstraints::SELFIE)
        {
            Ok(_) => {
                self.ui.selfie.camera_live = true;
                Ok(())
            }
            Err(error) => {
                let text = format!("Camera unavailable ({error}). A selfie needs a camera.");
                Err(self.report_with("open_selfie_camera", error.into(), text))
            }
        }
    }

    /// Grabs the selfie frame and stops the camera.
    ///
    /// # Errors
    /// [`AppError::Media`] when no selfie camera is live.
    pub fn capture_selfie(&mut self) -> Result<(), AppError> {
        let handle = self.stream_owned_by(View::SelfieUpload, "capture_selfie")?;
        let blob = self
            .media
            .capture(handle, SELFIE_FILE_NAME)
            .map_err(|error| self.report("capture_selfie", error.into()))?;
        self.media.release(handle);

        info!(
            stage = "selfie",
            action = "frame_captured",
            bytes = blob.len(),
            fingerprint = %blob.fingerprint()
        );
        self.ui.selfie.camera_live = false;
        self.ui.selfie.artifact = Some(blob);
        Ok(())
    }

    /// Submits the captured selfie on a worker thread.
    ///
    /// # Errors
    /// [`AppError::SubmissionPending`], [`AppError::MissingArtifact`],
    /// [`AppError::MissingSession`], or [`AppError::Worker`].
    pub fn submit_selfie(&mut self) -> Result<(), AppError> {
        if self.pending.is_some() {
            return Err(self.report("submit_selfie", AppError::SubmissionPending));
        }
        let Some(frame) = self.ui.selfie.artifact.clone() else {
            let text = "Please capture a selfie first.".to_string();
            return Err(self.report_with("submit_selfie", AppError::MissingArtifact, text));
        };
        let session_id = self.require_session("submit_selfie")?;

        info!(
            stage = "selfie",
            action = "selfie_submitted",
            session_id = session_id.as_str(),
            bytes = frame.len()
        );
        let api = self.api.clone();
        let rx = spawn_submission("swiftkyc-selfie-upload", move || {
            Submission::Selfie(api.upload_selfie(&session_id, &frame))
        })
        .map_err(|error| self.report("submit_selfie", error))?;

        self.ui.clear_notice();
        self.ui.selfie.submitting = true;
        self.pending = Some(PendingSubmission {
            view: View::SelfieUpload,
            kind: SubmissionKind::Selfie,
            rx,
        });
        Ok(())
    }

    /// Runs deferred work due at `now_ms` and applies any finished submission.
    pub fn tick(&mut self, now_ms: u64) {
        self.poll_submission(now_ms);
        while let Some((owner, event)) = self.timers.pop_due(now_ms) {
            self.fire(owner, event, now_ms);
        }
    }

    /// Blocks until the outstanding submission finishes and applies it.
    ///
    /// Returns `false` when nothing was outstanding.
    pub fn wait_for_submission(&mut self, now_ms: u64) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        match pending.rx.recv() {
            Ok(submission) => self.settle(submission, now_ms),
            Err(_) => self.settle(worker_lost(pending.kind), now_ms),
        }
        true
    }

    fn poll_submission(&mut self, now_ms: u64) {
        let Some(pending) = &self.pending else {
            return;
        };
        let submission = match pending.rx.try_recv() {
            Ok(submission) => submission,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => worker_lost(pending.kind),
        };
        self.pending = None;
        self.settle(submission, now_ms);
    }

    fn settle(&mut self, submission: Submission, now_ms: u64) {
        match submission {
            Submission::Document(result) => self.on_document_result(result, now_ms),
            Submission::Selfie(result) => self.on_selfie_result(result, now_ms),
        }
    }

    fn on_document_result(&mut self, result: Result<ValidationOutcome, RemoteError>, now_ms: u64) {
        if let Some(timer) = self.progress_timer.take() {
            self.timers.cancel(timer);
        }
        self.ui.upload.progress.complete();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                let text = submission_message(&error, DOCUMENT_FAILED);
                warn!(
                    stage = "upload",
                    action = "document_failed",
                    status = ?error.status(),
                    retriable = classify_remote_error(&error) == FailureClass::Retriable,
                    reason = %redact_sensitive(&text)
                );
                self.ui.notify(Notice::error(text));
                self.schedule_redisplay(now_ms);
                return;
            }
        };

        if let Some(profile) = self.profile.as_mut() {
            profile.last_validation = Some(outcome.clone());
        }

        match &outcome.next_step {
            KycStep::Selfie => {
                info!(stage = "upload", action = "document_accepted");
                self.failed_uploads = 0;
                self.ui.upload.stage = UploadStage::Accepted;
                self.ui
                    .notify(Notice::success("Document verified. Proceed to Selfie."));
            }
            KycStep::SelectDoc
            | KycStep::ScanDoc
            | KycStep::ValidateDoc
            | KycStep::KycCheck
            | KycStep::Complete
            | KycStep::Unknown(_) => {
                let text = outcome
                    .reason
                    .clone()
                    .unwrap_or_else(|| DOCUMENT_MISMATCH.to_string());
                info!(
                    stage = "upload",
                    action = "document_not_accepted",
                    next_step = outcome.next_step.as_str(),
                    reason = %redact_sensitive(&text)
                );
                self.ui.notify(Notice::error(text));
                self.schedule_redisplay(now_ms);
            }
        }
    }

    fn schedule_redisplay(&mut self, now_ms: u64) {
        self.failed_uploads += 1;
        if self.retry.allows_redisplay(self.failed_uploads) {
            self.ui.upload.stage = UploadStage::AwaitingRedisplay;
            let delay_ms = self.retry.delay_for(self.failed_uploads);
            self.timers.schedule(
                now_ms + delay_ms,
                View::UploadDocument,
                TimerEvent::RedisplayUpload,
            );
            return;
        }

        let attempts = self.failed_uploads;
        self.failed_uploads = 0;
        warn!(stage = "upload", action = "attempts_exhausted", attempts);
        if let Err(error) = self.navigate(View::Home, now_ms) {
            warn!(stage = "upload", action = "navigate_failed", "{error}");
        }
        self.ui
            .notify(Notice::error(AppError::RetriesExhausted { attempts }.to_string()));
    }

    fn on_selfie_result(&mut self, result: Result<(), RemoteError>, now_ms: u64) {
        self.ui.selfie.submitting = false;
        match result {
            Ok(()) => {
                info!(stage = "selfie", action = "selfie_accepted");
                if self.navigate(View::Status, now_ms).is_ok() {
                    self.ui.notify(Notice::success("Selfie uploaded."));
                }
            }
            Err(error) => {
                let text = submission_message(&error, SELFIE_FAILED);
                warn!(
                    stage = "selfie",
                    action = "selfie_failed",
                    status = ?error.status(),
                    reason = %redact_sensitive(&text)
                );
                self.ui.notify(Notice::error(text));
            }
        }
    }

    fn fire(&mut self, owner: View, event: TimerEvent, now_ms: u64) {
        match event {
            TimerEvent::ProgressTick => {
                let uploading = self
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.kind == SubmissionKind::Document);
                if uploading && self.ui.view == View::UploadDocument {
                    self.ui.upload.progress.advance(&mut self.rng);
                    self.progress_timer = Some(self.timers.schedule(
                        now_ms + PROGRESS_TICK_MS,
                        owner,
                        TimerEvent::ProgressTick,
                    ));
                }
            }
            TimerEvent::RedisplayUpload => {
                if let Err(error) = self.navigate(View::UploadDocument, now_ms) {
                    warn!(stage = "upload", action = "redisplay_failed", "{error}");
                }
            }
            TimerEvent::RefreshDetail(session_id) => self.refresh_detail(&session_id),
        }
    }

    fn stream_owned_by(
        &mut self,
        view: View,
        action: &'static str,
    ) -> Result<StreamHandle, AppError> {
        match self.media.active() {
            Some(handle) if self.media.active_owner() == Some(view.name()) => Ok(handle),
            _ => {
                let text = "Start the camera before capturing.".to_string();
                Err(self.report_with(action, MediaError::StreamClosed.into(), text))
            }
        }
    }
}

fn worker_lost(kind: SubmissionKind) -> Submission {
    let error = RemoteError::Transport("submission worker stopped".to_string());
    match kind {
        SubmissionKind::Document => Submission::Document(Err(error)),
        SubmissionKind::Selfie => Submission::Selfie(Err(error)),
    }
}
