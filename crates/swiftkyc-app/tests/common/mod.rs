//! Shared fixtures for app integration tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

use serde_json::{Value, json};
use swiftkyc_app::{KycApp, MemorySessionStore, RetryPolicy, SessionStore};
use swiftkyc_capture::SyntheticMediaDevice;
use swiftkyc_remote::api::{ApiRoutes, KycApi};
use swiftkyc_remote::{
    HttpRequest, HttpResponse, HttpTransport, Method, RemoteClient, RemoteError,
};
use swiftkyc_ui::View;

/// API base every test client uses.
pub const BASE: &str = "http://api.test/api/v1";

/// Transport answering from per-route scripts and recording every request.
///
/// Each route keeps a queue; the last queued response repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<(&'static str, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    held: Mutex<HashSet<String>>,
    gate: (Mutex<bool>, Condvar),
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Queues `response` for `method path` (path relative to [`BASE`]).
    pub fn respond(&self, method: Method, path: &str, response: HttpResponse) {
        self.scripts
            .lock()
            .expect("script lock should work")
            .entry((method.as_str(), path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Queues a JSON response.
    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond(method, path, HttpResponse::json(status, &body));
    }

    /// Drops anything queued for `method path` and answers with `status`/`body`.
    pub fn replace_json(&self, method: Method, path: &str, status: u16, body: Value) {
        let mut queue = VecDeque::new();
        queue.push_back(HttpResponse::json(status, &body));
        self.scripts
            .lock()
            .expect("script lock should work")
            .insert((method.as_str(), path.to_string()), queue);
    }

    /// Makes requests to `path` block until [`ScriptedTransport::release`].
    pub fn hold(&self, path: &str) {
        self.held
            .lock()
            .expect("hold lock should work")
            .insert(path.to_string());
    }

    /// Unblocks held requests.
    pub fn release(&self) {
        let (open, signal) = &self.gate;
        *open.lock().expect("gate lock should work") = true;
        signal.notify_all();
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log lock should work").clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request log lock should work").len()
    }

    /// `METHOD path?query` of every request, relative to [`BASE`].
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| {
                format!(
                    "{} {}",
                    request.method.as_str(),
                    request.url.trim_start_matches(BASE)
                )
            })
            .collect()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.requests
            .lock()
            .expect("request log lock should work")
            .push(request.clone());

        let relative = request.url.trim_start_matches(BASE);
        let path = relative.split('?').next().unwrap_or_default().to_string();

        if self.held.lock().expect("hold lock should work").contains(&path) {
            let (open, signal) = &self.gate;
            let mut released = open.lock().expect("gate lock should work");
            while !*released {
                released = signal.wait(released).expect("gate wait should work");
            }
        }

        let mut scripts = self.scripts.lock().expect("script lock should work");
        let Some(queue) = scripts.get_mut(&(request.method.as_str(), path.clone())) else {
            return Ok(HttpResponse::json(
                404,
                &json!({ "detail": format!("no script for {path}") }),
            ));
        };
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(response.unwrap_or_else(|| HttpResponse::text(500, "empty script")))
    }
}

/// App wired to in-memory collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub app: KycApp,
    pub transport: Arc<ScriptedTransport>,
    pub device: Arc<SyntheticMediaDevice>,
    pub store: Arc<MemorySessionStore>,
}

/// Harness with the default unbounded redisplay policy.
#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(RetryPolicy::default(), MemorySessionStore::new())
}

/// Harness with a custom policy and store.
#[allow(dead_code)]
pub fn harness_with(retry: RetryPolicy, store: MemorySessionStore) -> Harness {
    let transport = Arc::new(ScriptedTransport::default());
    let device = Arc::new(SyntheticMediaDevice::new());
    let store = Arc::new(store);
    let client = RemoteClient::new(BASE, transport.clone()).expect("client should build");
    let api = KycApi::new(client, ApiRoutes::default());
    let session_store: Arc<dyn SessionStore> = store.clone();
    let mut app = KycApp::new(api, session_store, device.clone(), retry, 42);
    app.boot();
    Harness {
        app,
        transport,
        device,
        store,
    }
}

/// Minimal PNG-signed payload accepted as a stored file.
#[allow(dead_code)]
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"fixture-image-body");
    bytes
}

/// Session status body for `session_id`.
#[allow(dead_code)]
pub fn status_body(session_id: &str, status: &str, step: &str) -> Value {
    json!({
        "session_id": session_id,
        "customer_id": "C1",
        "status": status,
        "current_step": step,
        "retries_select": 0,
        "retries_scan": 0,
        "retries_upload": 0,
        "retries_selfie": 0,
        "failure_reason": null
    })
}

/// Scripts the creation, selection, and number steps for session `S1`.
#[allow(dead_code)]
pub fn script_wizard_prefix(transport: &ScriptedTransport) {
    transport.respond_json(
        Method::Post,
        "/kyc/session",
        200,
        json!({
            "session_id": "S1",
            "customer_id": "C1",
            "status": "IN_PROGRESS",
            "current_step": "SELECT_DOC"
        }),
    );
    transport.respond_json(
        Method::Post,
        "/kyc/session/S1/select-document",
        200,
        json!({ "session_id": "S1", "doc_type": "PAN", "next_step": "SCAN_DOC" }),
    );
    transport.respond_json(
        Method::Post,
        "/kyc/session/S1/enter-doc-number",
        200,
        json!({ "session_id": "S1", "doc_number": "ABCDE1234F", "next_step": "SCAN_DOC" }),
    );
}

/// Drives a fresh harness to the upload view with a file artifact attached.
#[allow(dead_code)]
pub fn drive_to_upload(harness: &mut Harness) {
    script_wizard_prefix(&harness.transport);
    let app = &mut harness.app;
    app.begin_verification(0).expect("form should open");
    app.create_session("A", "9876543210", "25", 0)
        .expect("session should be created");
    app.select_document(swiftkyc_core::DocumentType::Pan, 0)
        .expect("document should be selected");
    app.enter_document_number("ABCDE1234F", 0)
        .expect("number should be accepted");
    assert_eq!(app.view(), View::UploadDocument);
    app.choose_document_file("pan.png", png_bytes())
        .expect("file should be accepted");
}
