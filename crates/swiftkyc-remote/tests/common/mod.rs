//! Shared fixtures for remote integration tests.

use std::sync::{Arc, Mutex};

use swiftkyc_remote::api::{ApiRoutes, KycApi};
use swiftkyc_remote::{HttpRequest, HttpResponse, HttpTransport, RemoteClient, RemoteError};

/// Transport that records requests and replays one canned response.
pub struct RecordingTransport {
    pub response: HttpResponse,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl HttpTransport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.requests
            .lock()
            .expect("request log lock should work")
            .push(request.clone());
        Ok(self.response.clone())
    }
}

/// Builds an API over a recording transport answering with `response`.
#[allow(dead_code)]
pub fn api_answering(response: HttpResponse) -> (KycApi, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport {
        response,
        requests: Mutex::new(Vec::new()),
    });
    let client = RemoteClient::new("http://api.test/api/v1", transport.clone())
        .expect("client should build");
    (KycApi::new(client, ApiRoutes::default()), transport)
}

/// Returns the single recorded request.
#[allow(dead_code)]
pub fn only_request(transport: &RecordingTransport) -> HttpRequest {
    let requests = transport.requests.lock().expect("request log lock should work");
    assert_eq!(requests.len(), 1, "exactly one request expected");
    requests[0].clone()
}
