//! Typed wrapper over the KYC wizard and admin endpoints.
//!
//! Every response is decoded exactly once here into a strict struct; missing
//! required fields surface as [`RemoteError::Decode`] instead of silently
//! falling back to alternative field names.

use serde::{Deserialize, Serialize};
use serde_json::json;
use swiftkyc_core::{
    DocumentType, FilterCriteria, ImageBlob, KycStatus, KycStep, SessionId, ValidatedCustomer,
    ValidationOutcome,
};

use crate::{CallOptions, MultipartForm, RemoteClient, RemoteError};

/// Multipart field carrying image uploads.
pub const UPLOAD_FIELD: &str = "file";

/// Route prefixes under the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    /// Prefix for `/session...` wizard routes.
    pub wizard_prefix: String,
    /// Prefix for `/sessions...` admin routes.
    pub admin_prefix: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            wizard_prefix: "/kyc".to_string(),
            admin_prefix: "/admin/kyc".to_string(),
        }
    }
}

/// `POST /session` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSessionRequest<'a> {
    /// Customer name.
    pub name: &'a str,
    /// Ten-digit mobile.
    pub mobile: &'a str,
}

/// `POST /session` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSession {
    /// New session id.
    pub session_id: SessionId,
    /// Customer the session belongs to.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: Option<KycStatus>,
    /// Initial step.
    #[serde(default)]
    pub current_step: Option<KycStep>,
}

/// `POST /session/{id}/select-document` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentSelection {
    /// Echo of the chosen type.
    pub doc_type: DocumentType,
    /// Step the server moved to.
    #[serde(default)]
    pub next_step: Option<KycStep>,
}

/// `POST /session/{id}/enter-doc-number` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentNumberAck {
    /// Normalized echo of the entered number.
    pub doc_number: String,
    /// Step the server is at.
    #[serde(default)]
    pub next_step: Option<KycStep>,
}

/// Per-stage retry counters kept by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    /// Document selection retries.
    #[serde(default)]
    pub retries_select: u32,
    /// Document scan retries.
    #[serde(default)]
    pub retries_scan: u32,
    /// Upload retries.
    #[serde(default)]
    pub retries_upload: u32,
    /// Selfie retries.
    #[serde(default)]
    pub retries_selfie: u32,
}

/// `GET /session/{id}` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionStatus {
    /// Session id.
    pub session_id: SessionId,
    /// Moderation status.
    pub status: KycStatus,
    /// Current wizard step.
    pub current_step: KycStep,
    /// Owning customer.
    pub customer_id: String,
    /// Last failure recorded by the server.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Retry counters.
    #[serde(flatten)]
    pub retries: RetryCounters,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Row of the admin list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: SessionId,
    /// Owning customer.
    pub customer_id: String,
    /// Moderation status.
    pub status: KycStatus,
    /// Current wizard step.
    pub current_step: KycStep,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Type of the latest document, when one exists.
    #[serde(default)]
    pub primary_doc_type: Option<String>,
}

/// Document attached to a moderation record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordDocument {
    /// Document id.
    pub document_id: String,
    /// Document type as stored.
    pub doc_type: String,
    /// Entered number.
    #[serde(default)]
    pub doc_number: Option<String>,
    /// Stored image location.
    #[serde(default)]
    pub storage_url: Option<String>,
    /// Validation verdict; `None` until validated.
    #[serde(default)]
    pub is_valid: Option<bool>,
    /// OCR quality score.
    #[serde(default)]
    pub quality_score: Option<f64>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `GET /admin/sessions/{id}` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModerationRecord {
    /// Session id.
    pub session_id: SessionId,
    /// Owning customer.
    pub customer_id: String,
    /// Moderation status.
    pub status: KycStatus,
    /// Current wizard step.
    pub current_step: KycStep,
    /// Last failure recorded by the server.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Retry counters.
    #[serde(flatten)]
    pub retries: RetryCounters,
    /// Stored selfie location.
    #[serde(default)]
    pub selfie_url: Option<String>,
    /// Face match score from the background check.
    #[serde(default)]
    pub face_match_score: Option<f64>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Documents, latest first.
    #[serde(default)]
    pub documents: Vec<RecordDocument>,
}

/// Approve/reject response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModerationUpdate {
    /// Session id.
    pub session_id: SessionId,
    /// Status after the action.
    pub status: KycStatus,
    /// Step after the action, when reported.
    #[serde(default)]
    pub current_step: Option<KycStep>,
}

/// Reviewer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    /// Approve the record.
    Approve,
    /// Reject the record.
    Reject,
}

impl ModerationDecision {
    fn route(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "approve",
            ModerationDecision::Reject => "reject",
        }
    }
}

/// Typed KYC API.
#[derive(Clone)]
pub struct KycApi {
    client: RemoteClient,
    routes: ApiRoutes,
}

impl KycApi {
    /// Wraps a client with route prefixes.
    pub fn new(client: RemoteClient, routes: ApiRoutes) -> Self {
        Self { client, routes }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    fn session_path(&self, session_id: &SessionId, action: &str) -> String {
        format!(
            "{}/session/{}/{action}",
            self.routes.wizard_prefix,
            session_id.as_str()
        )
    }

    fn admin_path(&self, tail: &str) -> String {
        format!("{}/sessions{tail}", self.routes.admin_prefix)
    }

    /// `POST /session`.
    pub fn create_session(&self, customer: &ValidatedCustomer) -> Result<CreatedSession, RemoteError> {
        let body = serde_json::to_value(CreateSessionRequest {
            name: &customer.name,
            mobile: &customer.mobile,
        })
        .map_err(|error| RemoteError::Decode(error.to_string()))?;
        self.client.call_json(
            &format!("{}/session", self.routes.wizard_prefix),
            CallOptions::post_json(body),
        )
    }

    /// `POST /session/{id}/select-document`.
    pub fn select_document(
        &self,
        session_id: &SessionId,
        doc_type: DocumentType,
    ) -> Result<DocumentSelection, RemoteError> {
        self.client.call_json(
            &self.session_path(session_id, "select-document"),
            CallOptions::post_json(json!({ "doc_type": doc_type.as_str() })),
        )
    }

    /// `POST /session/{id}/enter-doc-number`.
    pub fn enter_document_number(
        &self,
        session_id: &SessionId,
        doc_number: &str,
    ) -> Result<DocumentNumberAck, RemoteError> {
        self.client.call_json(
            &self.session_path(session_id, "enter-doc-number"),
            CallOptions::post_json(json!({ "doc_number": doc_number })),
        )
    }

    /// `POST /session/{id}/validate-document` with the artifact as `file`.
    pub fn validate_document(
        &self,
        session_id: &SessionId,
        artifact: &ImageBlob,
    ) -> Result<ValidationOutcome, RemoteError> {
        self.client.call_json(
            &self.session_path(session_id, "validate-document"),
            CallOptions::post_form(MultipartForm::new().with_image(UPLOAD_FIELD, artifact)),
        )
    }

    /// `POST /session/{id}/selfie`.
    ///
    /// Only request success matters; the returned record is not inspected.
    pub fn upload_selfie(&self, session_id: &SessionId, frame: &ImageBlob) -> Result<(), RemoteError> {
        self.client
            .call(
                &self.session_path(session_id, "selfie"),
                CallOptions::post_form(MultipartForm::new().with_image(UPLOAD_FIELD, frame)),
            )
            .map(|_| ())
    }

    /// `GET /session/{id}`.
    pub fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, RemoteError> {
        self.client.call_json(
            &format!(
                "{}/session/{}",
                self.routes.wizard_prefix,
                session_id.as_str()
            ),
            CallOptions::get(),
        )
    }

    /// `GET /admin/sessions` with filter query.
    pub fn list_sessions(&self, criteria: &FilterCriteria) -> Result<Vec<SessionSummary>, RemoteError> {
        let pairs = criteria
            .query_pairs()
            .map_err(|error| RemoteError::Decode(error.to_string()))?;
        self.client
            .call_json(&self.admin_path(""), CallOptions::get().with_query(pairs))
    }

    /// `GET /admin/sessions/{id}`.
    pub fn session_detail(&self, session_id: &SessionId) -> Result<ModerationRecord, RemoteError> {
        self.client.call_json(
            &self.admin_path(&format!("/{}", session_id.as_str())),
            CallOptions::get(),
        )
    }

    /// `POST /admin/sessions/{id}/approve` or `/reject`.
    pub fn moderate(
        &self,
        session_id: &SessionId,
        decision: ModerationDecision,
    ) -> Result<ModerationUpdate, RemoteError> {
        self.client.call_json(
            &self.admin_path(&format!("/{}/{}", session_id.as_str(), decision.route())),
            CallOptions::post(),
        )
    }
}
