#![warn(missing_docs)]
//! # swiftkyc-capture
//!
//! ## Purpose
//! Owns camera-backed media streams and turns live frames into uploadable
//! still images.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`MediaDevice`] trait.
//! - Keep at most one open stream process-wide through [`MediaSlot`].
//! - Encode grabbed frames into JPEG [`ImageBlob`]s.
//! - Provide a deterministic synthetic device for tests and a still-image
//!   device for headless runs.
//!
//! ## Data flow
//! A view calls [`MediaSlot::switch_to`] -> the slot closes the previous stream
//! and opens a new one -> [`MediaSlot::capture`] grabs a [`Frame`] and encodes
//! it -> the blob becomes the view's captured artifact.
//!
//! ## Ownership and lifetimes
//! The slot is the single owner of the device handle. Views only hold copyable
//! [`StreamHandle`] tokens; a stale token can never close a newer stream.
//!
//! ## Error model
//! Denied permission and missing devices are [`MediaError`] values the caller
//! shows as non-fatal messages. Releasing is infallible and idempotent.
//!
//! ## Security and privacy notes
//! Frames are kept in memory only; nothing is written to disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use swiftkyc_core::{ImageBlob, ImageFormat};
use thiserror::Error;
use tracing::{debug, info};

/// JPEG quality used for captured stills (0-100).
pub const JPEG_QUALITY: u8 = 90;

/// Camera direction requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// Stream constraints passed to [`MediaDevice::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Preferred camera direction.
    pub facing: FacingMode,
    /// Preferred frame width.
    pub ideal_width: u32,
    /// Preferred frame height.
    pub ideal_height: u32,
}

impl MediaConstraints {
    /// Rear camera for document capture.
    pub const DOCUMENT: MediaConstraints = MediaConstraints {
        facing: FacingMode::Environment,
        ideal_width: 1280,
        ideal_height: 720,
    };

    /// Front camera for selfie capture.
    pub const SELFIE: MediaConstraints = MediaConstraints {
        facing: FacingMode::User,
        ideal_width: 640,
        ideal_height: 480,
    };
}

/// Device-level stream identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(pub u64);

/// One RGBA frame grabbed from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes (`width * height * 4`).
    pub rgba: Vec<u8>,
}

impl Frame {
    /// Constructs a validated frame.
    ///
    /// # Errors
    /// Returns [`MediaError::Backend`] when the buffer length does not match
    /// the declared geometry.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, MediaError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| MediaError::Backend("frame dimensions overflow".to_string()))?;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(MediaError::Backend(format!(
                "invalid frame shape: expected {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }
}

/// Trait implemented by concrete camera providers.
pub trait MediaDevice: Send + Sync {
    /// Opens a stream.
    ///
    /// # Errors
    /// [`MediaError::PermissionDenied`] or [`MediaError::NoDevice`] when no
    /// stream can be opened.
    fn open(&self, constraints: &MediaConstraints) -> Result<StreamId, MediaError>;

    /// Closes a stream. Closing an unknown stream is a no-op.
    fn close(&self, stream: StreamId);

    /// Grabs the current frame of an open stream.
    ///
    /// # Errors
    /// [`MediaError::StreamClosed`] for streams that are not open.
    fn grab_frame(&self, stream: StreamId) -> Result<Frame, MediaError>;
}

/// Copyable token naming one acquisition of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle {
    stream: StreamId,
    generation: u64,
}

impl StreamHandle {
    /// Device-level stream id.
    pub fn stream_id(&self) -> StreamId {
        self.stream
    }
}

#[derive(Debug)]
struct ActiveStream {
    handle: StreamHandle,
    owner: String,
    constraints: MediaConstraints,
}

/// Single-owner arena holding the one process-wide media stream.
pub struct MediaSlot {
    device: Arc<dyn MediaDevice>,
    active: Option<ActiveStream>,
    generation: u64,
}

impl MediaSlot {
    /// Creates an empty slot over `device`.
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self {
            device,
            active: None,
            generation: 0,
        }
    }

    /// Releases whatever stream is open, then opens a new one for `owner`.
    ///
    /// The slot is empty if opening fails, so a denied camera never leaves a
    /// previous stream running.
    ///
    /// # Errors
    /// Propagates the device's acquisition error.
    pub fn switch_to(
        &mut self,
        owner: &str,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, MediaError> {
        self.release_all("switch");

        let stream = self.device.open(&constraints)?;
        self.generation += 1;
        let handle = StreamHandle {
            stream,
            generation: self.generation,
        };
        self.active = Some(ActiveStream {
            handle,
            owner: owner.to_string(),
            constraints,
        });
        info!(
            stage = "media",
            action = "acquired",
            owner,
            stream = stream.0,
            facing = ?constraints.facing
        );
        Ok(handle)
    }

    /// Releases `handle` if it is still the active stream.
    ///
    /// Returns `true` when a stream was closed. Stale or repeated releases are
    /// no-ops.
    pub fn release(&mut self, handle: StreamHandle) -> bool {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.handle == handle);
        is_active && self.release_all("explicit")
    }

    /// Releases the active stream if `owner` holds it.
    pub fn release_owned_by(&mut self, owner: &str) -> bool {
        let is_owner = self
            .active
            .as_ref()
            .is_some_and(|active| active.owner == owner);
        is_owner && self.release_all("owner_teardown")
    }

    /// Releases the active stream, whoever holds it.
    ///
    /// Returns `true` when a stream was closed.
    pub fn release_all(&mut self, reason: &str) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        self.device.close(active.handle.stream);
        info!(
            stage = "media",
            action = "released",
            owner = active.owner.as_str(),
            stream = active.handle.stream.0,
            reason
        );
        true
    }

    /// Grabs a frame from `handle` and encodes it as a JPEG still.
    ///
    /// # Errors
    /// [`MediaError::StreamClosed`] for stale handles, plus device and
    /// encoder failures.
    pub fn capture(&self, handle: StreamHandle, file_name: &str) -> Result<ImageBlob, MediaError> {
        let active = self
            .active
            .as_ref()
            .filter(|active| active.handle == handle)
            .ok_or(MediaError::StreamClosed)?;

        let frame = self.device.grab_frame(active.handle.stream)?;
        let bytes = encode_jpeg(&frame, JPEG_QUALITY)?;
        debug!(
            stage = "media",
            action = "captured",
            width = frame.width,
            height = frame.height,
            jpeg_bytes = bytes.len()
        );
        ImageBlob::new(ImageFormat::Jpeg, file_name, bytes)
            .map_err(|error| MediaError::Encode(error.to_string()))
    }

    /// Active handle, if any.
    pub fn active(&self) -> Option<StreamHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    /// Owner of the active stream, if any.
    pub fn active_owner(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.owner.as_str())
    }

    /// Constraints of the active stream, if any.
    pub fn active_constraints(&self) -> Option<MediaConstraints> {
        self.active.as_ref().map(|active| active.constraints)
    }

    /// Returns `true` when `handle` is the open stream.
    pub fn is_open(&self, handle: StreamHandle) -> bool {
        self.active() == Some(handle)
    }
}

impl Drop for MediaSlot {
    fn drop(&mut self) {
        self.release_all("shutdown");
    }
}

/// Encodes an RGBA frame as JPEG at `quality`.
///
/// # Errors
/// Returns [`MediaError::Encode`] on encoder failure.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, MediaError> {
    let rgb = rgba_to_rgb(&frame.rgba)?;
    let mut jpeg_bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, quality)
        .encode(&rgb, frame.width, frame.height, image::ColorType::Rgb8.into())
        .map_err(|error| MediaError::Encode(format!("jpeg encoding failed: {error}")))?;
    Ok(jpeg_bytes)
}

fn rgba_to_rgb(rgba: &[u8]) -> Result<Vec<u8>, MediaError> {
    if rgba.len() % 4 != 0 {
        return Err(MediaError::Encode(format!(
            "invalid RGBA buffer length {}; expected multiple of 4",
            rgba.len()
        )));
    }

    let mut rgb = Vec::with_capacity((rgba.len() / 4) * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    Ok(rgb)
}

#[derive(Debug, Default)]
struct SyntheticState {
    open: BTreeSet<StreamId>,
    next_id: u64,
    opened_total: u64,
    peak_open: usize,
    denied: bool,
    frame_sequence: u8,
}

/// Deterministic in-memory camera for tests and CI.
///
/// Records how many streams are open at once so the single-stream invariant
/// can be asserted from the outside.
#[derive(Debug, Default)]
pub struct SyntheticMediaDevice {
    state: Mutex<SyntheticState>,
}

impl SyntheticMediaDevice {
    /// Creates a device that grants every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device whose permission prompt is always denied.
    pub fn denied() -> Self {
        let device = Self::default();
        device.set_denied(true);
        device
    }

    /// Toggles permission denial for subsequent opens.
    pub fn set_denied(&self, denied: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.denied = denied;
        }
    }

    /// Streams currently open.
    pub fn open_count(&self) -> usize {
        self.state.lock().map(|state| state.open.len()).unwrap_or(0)
    }

    /// Highest number of simultaneously open streams ever observed.
    pub fn peak_open(&self) -> usize {
        self.state.lock().map(|state| state.peak_open).unwrap_or(0)
    }

    /// Total successful opens.
    pub fn opened_total(&self) -> u64 {
        self.state.lock().map(|state| state.opened_total).unwrap_or(0)
    }
}

impl MediaDevice for SyntheticMediaDevice {
    fn open(&self, _constraints: &MediaConstraints) -> Result<StreamId, MediaError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MediaError::Backend("synthetic device lock poisoned".to_string()))?;
        if state.denied {
            return Err(MediaError::PermissionDenied);
        }
        state.next_id += 1;
        let id = StreamId(state.next_id);
        state.open.insert(id);
        state.opened_total += 1;
        state.peak_open = state.peak_open.max(state.open.len());
        Ok(id)
    }

    fn close(&self, stream: StreamId) {
        if let Ok(mut state) = self.state.lock() {
            state.open.remove(&stream);
        }
    }

    fn grab_frame(&self, stream: StreamId) -> Result<Frame, MediaError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MediaError::Backend("synthetic device lock poisoned".to_string()))?;
        if !state.open.contains(&stream) {
            return Err(MediaError::StreamClosed);
        }
        state.frame_sequence = state.frame_sequence.wrapping_add(1);
        Frame::new(4, 4, vec![state.frame_sequence; 4 * 4 * 4])
    }
}

/// Camera stand-in that serves one image file as every frame.
#[derive(Debug)]
pub struct StillImageDevice {
    path: PathBuf,
    open: Mutex<BTreeSet<StreamId>>,
    next_id: Mutex<u64>,
}

impl StillImageDevice {
    /// Creates a device serving the image at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            open: Mutex::new(BTreeSet::new()),
            next_id: Mutex::new(0),
        }
    }
}

impl MediaDevice for StillImageDevice {
    fn open(&self, _constraints: &MediaConstraints) -> Result<StreamId, MediaError> {
        if !self.path.is_file() {
            return Err(MediaError::NoDevice);
        }
        let mut next_id = self
            .next_id
            .lock()
            .map_err(|_| MediaError::Backend("still device lock poisoned".to_string()))?;
        *next_id += 1;
        let id = StreamId(*next_id);
        self.open
            .lock()
            .map_err(|_| MediaError::Backend("still device lock poisoned".to_string()))?
            .insert(id);
        Ok(id)
    }

    fn close(&self, stream: StreamId) {
        if let Ok(mut open) = self.open.lock() {
            open.remove(&stream);
        }
    }

    fn grab_frame(&self, stream: StreamId) -> Result<Frame, MediaError> {
        let is_open = self
            .open
            .lock()
            .map_err(|_| MediaError::Backend("still device lock poisoned".to_string()))?
            .contains(&stream);
        if !is_open {
            return Err(MediaError::StreamClosed);
        }

        let decoded = image::open(&self.path)
            .map_err(|error| MediaError::Backend(format!("still image decode failed: {error}")))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Frame::new(width, height, decoded.into_raw())
    }
}

/// Device for hosts without any camera; every open fails with
/// [`MediaError::NoDevice`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDevice;

impl MediaDevice for UnavailableDevice {
    fn open(&self, _constraints: &MediaConstraints) -> Result<StreamId, MediaError> {
        Err(MediaError::NoDevice)
    }

    fn close(&self, _stream: StreamId) {}

    fn grab_frame(&self, _stream: StreamId) -> Result<Frame, MediaError> {
        Err(MediaError::StreamClosed)
    }
}

/// Media layer error type.
#[derive(Debug, Error)]
pub enum MediaError {
    /// User or platform denied camera access.
    #[error("camera permission denied")]
    PermissionDenied,
    /// No camera is available.
    #[error("no camera device found")]
    NoDevice,
    /// Handle does not refer to the open stream.
    #[error("media stream is not open")]
    StreamClosed,
    /// Frame encoding failure.
    #[error("frame encoding failure: {0}")]
    Encode(String),
    /// Backend runtime failure.
    #[error("media backend failure: {0}")]
    Backend(String),
}
