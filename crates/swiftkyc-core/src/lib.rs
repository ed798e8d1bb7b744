#![warn(missing_docs)]
//! # swiftkyc-core
//!
//! ## Purpose
//! Defines the pure data model used across the `swiftkyc` workspace.
//!
//! ## Responsibilities
//! - Represent the onboarding session profile and the values it accumulates.
//! - Decode server-declared status and step directives into closed enums with
//!   an explicit `Unknown` variant.
//! - Validate wizard input locally before any network call is made.
//! - Represent captured image artifacts and admin filter criteria.
//!
//! ## Data flow
//! The wizard validates raw form input into [`ValidatedCustomer`], stores the
//! server-issued [`SessionId`] in a [`SessionProfile`], and attaches
//! [`ImageBlob`] artifacts to document/selfie submissions. The admin console
//! turns [`FilterCriteria`] into query pairs with a UTC [`DayRange`].
//!
//! ## Ownership and lifetimes
//! Artifacts own their byte buffers (`Vec<u8>`) so a captured image can outlive
//! the device stream that produced it.
//!
//! ## Error model
//! Local validation failures return [`InputError`]; malformed artifacts and
//! date conversions return [`CoreError`].
//!
//! ## Security and privacy notes
//! Artifacts are identified in logs by [`ImageBlob::fingerprint`], never by
//! their bytes. Session identifiers are opaque and never transformed.
//!
//! ## Example
//! ```rust
//! use swiftkyc_core::{KycStep, validate_customer};
//!
//! let customer = validate_customer("A", "9876543210", "25").unwrap();
//! assert_eq!(customer.age, 25);
//! assert_eq!(KycStep::from("SELFIE".to_string()), KycStep::Selfie);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::Date;
use time::macros::format_description;

/// Client storage key holding the current session identifier.
pub const SESSION_STORAGE_KEY: &str = "swiftkyc_session_id";

/// Minimum customer age accepted by the wizard.
pub const MIN_CUSTOMER_AGE: u32 = 18;

/// Exact digit count of a mobile number.
pub const MOBILE_DIGITS: usize = 10;

/// Opaque server-issued session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a server-issued identifier.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidSessionId`] when the value is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidSessionId);
        }
        Ok(Self(raw))
    }

    /// Returns the identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity documents accepted by the onboarding flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Aadhaar card.
    Aadhaar,
    /// PAN card.
    Pan,
    /// Passport.
    Passport,
    /// Voter identity card.
    VoterId,
}

impl DocumentType {
    /// Every selectable document type, in menu order.
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Aadhaar,
        DocumentType::Pan,
        DocumentType::Passport,
        DocumentType::VoterId,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Aadhaar => "AADHAAR",
            DocumentType::Pan => "PAN",
            DocumentType::Passport => "PASSPORT",
            DocumentType::VoterId => "VOTER_ID",
        }
    }
}

impl FromStr for DocumentType {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        DocumentType::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == normalized)
            .ok_or_else(|| InputError::UnknownDocumentType(raw.to_string()))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-declared next-step directive.
///
/// Unrecognized values are preserved in [`KycStep::Unknown`] so a newer server
/// never breaks the client; callers treat them as "stay and retry".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KycStep {
    /// Choose a document type.
    SelectDoc,
    /// Enter the number and upload the document image.
    ScanDoc,
    /// Server-side document validation in progress.
    ValidateDoc,
    /// Capture a selfie.
    Selfie,
    /// Background face match and review.
    KycCheck,
    /// Flow finished.
    Complete,
    /// Directive not known to this client.
    Unknown(String),
}

impl KycStep {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            KycStep::SelectDoc => "SELECT_DOC",
            KycStep::ScanDoc => "SCAN_DOC",
            KycStep::ValidateDoc => "VALIDATE_DOC",
            KycStep::Selfie => "SELFIE",
            KycStep::KycCheck => "KYC_CHECK",
            KycStep::Complete => "COMPLETE",
            KycStep::Unknown(raw) => raw,
        }
    }
}

impl From<String> for KycStep {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SELECT_DOC" => KycStep::SelectDoc,
            "SCAN_DOC" => KycStep::ScanDoc,
            "VALIDATE_DOC" => KycStep::ValidateDoc,
            "SELFIE" => KycStep::Selfie,
            "KYC_CHECK" => KycStep::KycCheck,
            "COMPLETE" => KycStep::Complete,
            _ => KycStep::Unknown(raw),
        }
    }
}

impl From<KycStep> for String {
    fn from(step: KycStep) -> Self {
        step.as_str().to_string()
    }
}

/// Moderation status of a session record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KycStatus {
    /// Customer is still moving through the wizard.
    InProgress,
    /// Awaiting background checks or review.
    KycCheck,
    /// Approved by a reviewer.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
    /// Customer left the flow.
    Abandoned,
    /// Status not known to this client.
    Unknown(String),
}

impl KycStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            KycStatus::InProgress => "IN_PROGRESS",
            KycStatus::KycCheck => "KYC_CHECK",
            KycStatus::Approved => "APPROVED",
            KycStatus::Rejected => "REJECTED",
            KycStatus::Abandoned => "ABANDONED",
            KycStatus::Unknown(raw) => raw,
        }
    }
}

impl From<String> for KycStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "IN_PROGRESS" => KycStatus::InProgress,
            "KYC_CHECK" => KycStatus::KycCheck,
            "APPROVED" => KycStatus::Approved,
            "REJECTED" => KycStatus::Rejected,
            "ABANDONED" => KycStatus::Abandoned,
            _ => KycStatus::Unknown(raw),
        }
    }
}

impl From<KycStatus> for String {
    fn from(status: KycStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validator verdict returned after a document submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Authoritative next-step directive.
    pub next_step: KycStep,
    /// Human-readable reason for a non-advancing verdict.
    #[serde(default)]
    pub reason: Option<String>,
    /// Where the server stored the uploaded image.
    #[serde(default)]
    pub storage_url: Option<String>,
}

/// Customer details that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCustomer {
    /// Trimmed full name.
    pub name: String,
    /// Ten-digit mobile number.
    pub mobile: String,
    /// Age in years, at least [`MIN_CUSTOMER_AGE`].
    pub age: u32,
}

/// Values accumulated by the wizard for one onboarding session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    /// Server-issued identifier; required by every step after creation.
    pub session_id: SessionId,
    /// Customer details, absent when the profile was restored from storage.
    pub customer: Option<ValidatedCustomer>,
    /// Chosen document type.
    pub document_type: Option<DocumentType>,
    /// Entered document number.
    pub document_number: Option<String>,
    /// Most recent validator verdict.
    pub last_validation: Option<ValidationOutcome>,
}

impl SessionProfile {
    /// Creates a profile right after session creation.
    pub fn created(session_id: SessionId, customer: ValidatedCustomer) -> Self {
        Self {
            session_id,
            customer: Some(customer),
            document_type: None,
            document_number: None,
            last_validation: None,
        }
    }

    /// Creates a profile from an identifier restored out of client storage.
    pub fn restored(session_id: SessionId) -> Self {
        Self {
            session_id,
            customer: None,
            document_type: None,
            document_number: None,
            last_validation: None,
        }
    }
}

/// Returns `true` when `mobile` is exactly [`MOBILE_DIGITS`] ASCII digits.
pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == MOBILE_DIGITS && mobile.bytes().all(|byte| byte.is_ascii_digit())
}

/// Validates the session-creation form.
///
/// # Errors
/// - [`InputError::EmptyName`] for a blank name.
/// - [`InputError::InvalidMobile`] unless the mobile is exactly ten digits.
/// - [`InputError::InvalidAge`] for non-integer ages.
/// - [`InputError::Underage`] for ages below [`MIN_CUSTOMER_AGE`].
pub fn validate_customer(
    name: &str,
    mobile: &str,
    age: &str,
) -> Result<ValidatedCustomer, InputError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InputError::EmptyName);
    }

    if !is_valid_mobile(mobile) {
        return Err(InputError::InvalidMobile);
    }

    let age = age
        .trim()
        .parse::<u32>()
        .map_err(|_| InputError::InvalidAge)?;
    if age < MIN_CUSTOMER_AGE {
        return Err(InputError::Underage { age });
    }

    Ok(ValidatedCustomer {
        name: name.to_string(),
        mobile: mobile.to_string(),
        age,
    })
}

/// Validates an entered document number and returns it trimmed.
///
/// # Errors
/// Returns [`InputError::EmptyDocumentNumber`] for blank input.
pub fn validate_document_number(raw: &str) -> Result<String, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyDocumentNumber);
    }
    Ok(trimmed.to_string())
}

/// Where an image artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    /// A file chosen from storage.
    StoredFile,
    /// A frame grabbed from a live camera.
    LiveCamera,
}

/// Image encodings accepted by the remote validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG still.
    Jpeg,
    /// PNG still.
    Png,
}

impl ImageFormat {
    /// MIME type used for multipart parts.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    /// Detects the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

/// In-memory image payload ready to be sent as a form part.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    /// Encoding of `bytes`.
    pub format: ImageFormat,
    /// File name reported in the multipart part.
    pub file_name: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    /// Creates a blob with a known format.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyArtifact`] when `bytes` is empty.
    pub fn new(
        format: ImageFormat,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyArtifact);
        }
        Ok(Self {
            format,
            file_name: file_name.into(),
            bytes,
        })
    }

    /// Creates a blob from a user-chosen file, detecting its format.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyArtifact`] for empty files and
    /// [`CoreError::UnsupportedImage`] for anything other than JPEG or PNG.
    pub fn from_file_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let file_name = file_name.into();
        if bytes.is_empty() {
            return Err(CoreError::EmptyArtifact);
        }
        let format =
            ImageFormat::sniff(&bytes).ok_or_else(|| CoreError::UnsupportedImage(file_name.clone()))?;
        Self::new(format, file_name, bytes)
    }

    /// Hex SHA-256 of the payload, used to identify artifacts in logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Inclusive UTC timestamp bounds for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRange {
    /// `YYYY-MM-DDT00:00:00.000Z`.
    pub created_from: String,
    /// `YYYY-MM-DDT23:59:59.000Z`.
    pub created_to: String,
}

/// Converts a calendar date into the admin list's UTC day range.
///
/// # Errors
/// Returns [`CoreError::DateFormat`] if formatting fails.
pub fn day_range_utc(date: Date) -> Result<DayRange, CoreError> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    let start = date.midnight();
    let end = date
        .with_hms(23, 59, 59)
        .map_err(|error| CoreError::DateFormat(error.to_string()))?;

    Ok(DayRange {
        created_from: start
            .format(&format)
            .map_err(|error| CoreError::DateFormat(error.to_string()))?,
        created_to: end
            .format(&format)
            .map_err(|error| CoreError::DateFormat(error.to_string()))?,
    })
}

/// Parses a `YYYY-MM-DD` date as entered in the admin filter.
///
/// # Errors
/// Returns [`InputError::InvalidDate`] for anything else.
pub fn parse_filter_date(raw: &str) -> Result<Date, InputError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| InputError::InvalidDate(raw.to_string()))
}

/// Admin list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Restrict to one status.
    pub status: Option<KycStatus>,
    /// Restrict to sessions with this document type.
    pub doc_type: Option<DocumentType>,
    /// Restrict to sessions created on this UTC day.
    pub date: Option<Date>,
}

impl FilterCriteria {
    /// Builds criteria from raw form values; blank values mean "any".
    ///
    /// # Errors
    /// Returns [`InputError`] for an unknown document type or malformed date.
    pub fn from_form(status: &str, doc_type: &str, date: &str) -> Result<Self, InputError> {
        let status = match status.trim() {
            "" => None,
            raw => Some(KycStatus::from(raw.to_ascii_uppercase())),
        };
        let doc_type = match doc_type.trim() {
            "" => None,
            raw => Some(raw.parse()?),
        };
        let date = match date.trim() {
            "" => None,
            raw => Some(parse_filter_date(raw)?),
        };
        Ok(Self {
            status,
            doc_type,
            date,
        })
    }

    /// Query pairs sent to the admin list endpoint, in a stable order.
    ///
    /// # Errors
    /// Returns [`CoreError::DateFormat`] if the day range cannot be formatted.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>, CoreError> {
        let mut pairs = Vec::new();
        if let Some(status) = &self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(doc_type) = self.doc_type {
            pairs.push(("doc_type", doc_type.as_str().to_string()));
        }
        if let Some(date) = self.date {
            let range = day_range_utc(date)?;
            pairs.push(("created_from", range.created_from));
            pairs.push(("created_to", range.created_to));
        }
        Ok(pairs)
    }
}

/// Local form validation errors; these never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Name is blank.
    #[error("Please enter your name.")]
    EmptyName,
    /// Mobile is not exactly ten digits.
    #[error("Mobile number must be exactly 10 digits.")]
    InvalidMobile,
    /// Age is not an integer.
    #[error("Please enter a valid age.")]
    InvalidAge,
    /// Age is below the minimum.
    #[error("You must be at least 18 years old (entered {age}).")]
    Underage {
        /// Entered age.
        age: u32,
    },
    /// Document number is blank.
    #[error("Please enter your document number.")]
    EmptyDocumentNumber,
    /// Document type is not one of the supported values.
    #[error("Unknown document type '{0}'.")]
    UnknownDocumentType(String),
    /// Filter date is not `YYYY-MM-DD`.
    #[error("Invalid date '{0}', expected YYYY-MM-DD.")]
    InvalidDate(String),
}

/// Error type for core model invariants.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Session id cannot be blank.
    #[error("session id is empty")]
    InvalidSessionId,
    /// Artifact has no bytes.
    #[error("captured artifact is empty")]
    EmptyArtifact,
    /// Artifact is not a JPEG or PNG.
    #[error("unsupported image format for '{0}': only JPEG and PNG are accepted")]
    UnsupportedImage(String),
    /// Date/time formatting failure.
    #[error("date formatting failure: {0}")]
    DateFormat(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for directive decoding and local validation.

    use super::*;

    #[test]
    fn unknown_step_directive_is_preserved() {
        let outcome: ValidationOutcome =
            serde_json::from_str(r#"{"next_step":"FACE_LIVENESS"}"#).expect("should decode");
        assert_eq!(outcome.next_step, KycStep::Unknown("FACE_LIVENESS".to_string()));
        assert_eq!(outcome.reason, None);
    }

    #[test]
    fn missing_next_step_is_a_decode_error() {
        let decoded = serde_json::from_str::<ValidationOutcome>(r#"{"reason":"glare"}"#);
        assert!(decoded.is_err());
    }

    #[test]
    fn status_round_trips_through_wire_string() {
        let status: KycStatus = serde_json::from_str(r#""KYC_CHECK""#).expect("should decode");
        assert_eq!(status, KycStatus::KycCheck);
        assert_eq!(
            serde_json::to_string(&KycStatus::Unknown("ON_HOLD".to_string())).unwrap(),
            r#""ON_HOLD""#
        );
    }

    #[test]
    fn document_type_parses_case_insensitively() {
        assert_eq!("pan".parse::<DocumentType>().unwrap(), DocumentType::Pan);
        assert_eq!(" voter_id ".parse::<DocumentType>().unwrap(), DocumentType::VoterId);
        assert!("DRIVING_LICENCE".parse::<DocumentType>().is_err());
    }

    #[test]
    fn age_rules_are_enforced() {
        assert_eq!(
            validate_customer("A", "9876543210", "17"),
            Err(InputError::Underage { age: 17 })
        );
        assert_eq!(
            validate_customer("A", "9876543210", "abc"),
            Err(InputError::InvalidAge)
        );
        assert_eq!(
            validate_customer("A", "9876543210", "-20"),
            Err(InputError::InvalidAge)
        );
        assert!(validate_customer("A", "9876543210", "18").is_ok());
    }

    #[test]
    fn blank_name_is_rejected_before_mobile() {
        assert_eq!(validate_customer("   ", "123", "10"), Err(InputError::EmptyName));
    }

    #[test]
    fn image_format_is_sniffed_from_magic_bytes() {
        let jpeg = ImageBlob::from_file_bytes("doc.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1])
            .expect("jpeg should be accepted");
        assert_eq!(jpeg.format, ImageFormat::Jpeg);
        assert!(matches!(
            ImageBlob::from_file_bytes("doc.gif", b"GIF89a".to_vec()),
            Err(CoreError::UnsupportedImage(_))
        ));
        assert_eq!(jpeg.fingerprint().len(), 64);
    }
}
